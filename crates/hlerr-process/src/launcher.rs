use std::ffi::{CStr, CString, OsStr};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use hlerr_transport::{pipe, Channel, Origin};
use libc::c_char;
use tracing::debug;

use crate::error::{ProcessError, Result};

/// Exit status of a child that could not be set up or could not exec.
pub const CHILD_SETUP_FAILURE: i32 = 1;

/// The single child process of a run. Must be handed to [`crate::reap`].
#[derive(Debug)]
#[must_use = "the child must be reaped"]
pub struct ChildHandle {
    pid: libc::pid_t,
}

impl ChildHandle {
    /// Process id of the child.
    pub fn pid(&self) -> u32 {
        self.pid as u32
    }

    pub(crate) fn raw_pid(&self) -> libc::pid_t {
        self.pid
    }

    #[cfg(test)]
    pub(crate) fn from_raw_pid(pid: libc::pid_t) -> Self {
        Self { pid }
    }
}

/// A running child together with the parent's ends of its output pipes.
#[derive(Debug)]
pub struct Launched {
    pub child: ChildHandle,
    pub stdout: Channel,
    pub stderr: Channel,
}

/// Descriptors the child rebinds between `fork` and `exec`.
struct ChildFds {
    stdout_read: RawFd,
    stderr_read: RawFd,
    stdout_write: RawFd,
    stderr_write: RawFd,
}

/// Start `program` with `args`, its stdout and stderr redirected into two
/// fresh pipes.
///
/// `program` is resolved through `PATH` like a shell would. If it cannot be
/// executed, the child prints the reason on its (redirected) stderr and exits
/// with [`CHILD_SETUP_FAILURE`]; the caller sees that through the returned
/// channels and the reaped status rather than through an error here.
pub fn launch<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<Launched>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();

    // Everything the child needs is allocated up front; it must not allocate
    // between fork and exec.
    let mut argv_owned = vec![to_cstring(program)?];
    for arg in args {
        argv_owned.push(to_cstring(arg.as_ref())?);
    }
    let argv: Vec<*const c_char> = argv_owned
        .iter()
        .map(|arg| arg.as_ptr())
        .chain(std::iter::once(ptr::null()))
        .collect();
    let exec_failure = format!("hlerr: failed to execute {}", program.to_string_lossy());

    let (stdout, stdout_writer) = pipe(Origin::Stdout)?;
    let (stderr, stderr_writer) = pipe(Origin::Stderr)?;
    let fds = ChildFds {
        stdout_read: stdout.as_raw_fd(),
        stderr_read: stderr.as_raw_fd(),
        stdout_write: stdout_writer.as_raw_fd(),
        stderr_write: stderr_writer.as_raw_fd(),
    };

    // SAFETY: the child branch below only calls async-signal-safe functions
    // (close, dup2, fcntl, signal, execvp, write, strerror_r, _exit) on memory
    // prepared before the fork, and never returns.
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(ProcessError::Fork(io::Error::last_os_error())),
        0 => {
            // SAFETY: we are the freshly forked child; see above.
            unsafe { exec_child(&fds, &argv, exec_failure.as_bytes()) }
        }
        pid => {
            // The write ends stay open only in the child.
            drop(stdout_writer);
            drop(stderr_writer);
            debug!(pid, program = %program.to_string_lossy(), "spawned child");

            Ok(Launched {
                child: ChildHandle { pid },
                stdout,
                stderr,
            })
        }
    }
}

fn to_cstring(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes())
        .map_err(|_| ProcessError::InvalidArgument(value.to_os_string()))
}

/// Rebind the pipes onto fds 1 and 2 and replace the process image.
///
/// # Safety
///
/// Must only be called in a child right after `fork`. `argv` must be a
/// NULL-terminated array of pointers to valid C strings.
unsafe fn exec_child(fds: &ChildFds, argv: &[*const c_char], exec_failure: &[u8]) -> ! {
    if libc::close(fds.stdout_read) == -1 {
        child_fail(b"hlerr: close stdout read end");
    }
    if libc::close(fds.stderr_read) == -1 {
        child_fail(b"hlerr: close stderr read end");
    }

    rebind(fds.stdout_write, Origin::Stdout.target_fd(), b"hlerr: dup2 for stdout");
    rebind(fds.stderr_write, Origin::Stderr.target_fd(), b"hlerr: dup2 for stderr");

    // The parent ignores SIGPIPE; the command should get the default.
    libc::signal(libc::SIGPIPE, libc::SIG_DFL);

    libc::execvp(argv[0], argv.as_ptr());
    child_fail(exec_failure)
}

/// Make `target` refer to the pipe behind `fd` and keep it open across exec.
unsafe fn rebind(fd: RawFd, target: RawFd, what: &[u8]) {
    if fd == target {
        // The pipe already sits on the target descriptor; only clear CLOEXEC.
        if libc::fcntl(target, libc::F_SETFD, 0) == -1 {
            child_fail(what);
        }
        return;
    }
    loop {
        if libc::dup2(fd, target) != -1 {
            break;
        }
        if io::Error::last_os_error().kind() != io::ErrorKind::Interrupted {
            child_fail(what);
        }
    }
    if libc::close(fd) == -1 {
        child_fail(what);
    }
}

/// Report `what: <strerror(errno)>` on fd 2 and exit.
unsafe fn child_fail(what: &[u8]) -> ! {
    let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);

    write_stderr(what);
    let mut reason = [0 as c_char; 128];
    if libc::strerror_r(errno, reason.as_mut_ptr(), reason.len()) == 0 {
        write_stderr(b": ");
        write_stderr(CStr::from_ptr(reason.as_ptr()).to_bytes());
    }
    write_stderr(b"\n");

    libc::_exit(CHILD_SETUP_FAILURE)
}

unsafe fn write_stderr(mut buf: &[u8]) {
    while !buf.is_empty() {
        let rc = libc::write(libc::STDERR_FILENO, buf.as_ptr().cast(), buf.len());
        if rc > 0 {
            buf = &buf[rc as usize..];
        } else if rc == -1 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
            continue;
        } else {
            return;
        }
    }
}
