use std::fmt;

/// Which of the child's standard streams a byte or pipe belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Stdout,
    Stderr,
}

impl Origin {
    /// The file descriptor the child expects this stream on.
    #[cfg(unix)]
    pub fn target_fd(self) -> std::os::fd::RawFd {
        match self {
            Origin::Stdout => libc::STDOUT_FILENO,
            Origin::Stderr => libc::STDERR_FILENO,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Stdout => "stdout",
            Origin::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
