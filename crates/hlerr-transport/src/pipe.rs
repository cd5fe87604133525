use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::origin::Origin;

/// The parent's readable end of a pipe, tagged with the stream it carries.
///
/// The descriptor is closed when the channel is dropped.
#[derive(Debug)]
pub struct Channel {
    origin: Origin,
    file: File,
}

impl Channel {
    /// The stream this channel carries.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Read a single byte (blocking).
    ///
    /// Returns `Ok(None)` at end-of-stream. Interrupted reads are retried.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.file.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(TransportError::Read {
                        origin: self.origin,
                        source,
                    })
                }
            }
        }
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl AsRawFd for Channel {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for Channel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// The writable end of a pipe, destined for the child.
#[derive(Debug)]
pub struct PipeWriter {
    origin: Origin,
    file: File,
}

impl PipeWriter {
    /// The stream this pipe carries.
    pub fn origin(&self) -> Origin {
        self.origin
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl AsRawFd for PipeWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for PipeWriter {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl IntoRawFd for PipeWriter {
    fn into_raw_fd(self) -> RawFd {
        self.file.into_raw_fd()
    }
}

impl From<PipeWriter> for OwnedFd {
    fn from(writer: PipeWriter) -> Self {
        writer.file.into()
    }
}

/// Create a pipe for one of the child's streams.
///
/// Both ends are close-on-exec; the launcher rebinds the write end onto the
/// child's standard descriptor explicitly.
pub fn pipe(origin: Origin) -> Result<(Channel, PipeWriter)> {
    let (read, write) = create_pipe().map_err(|source| TransportError::Pipe { origin, source })?;
    debug!(
        %origin,
        read_fd = read.as_raw_fd(),
        write_fd = write.as_raw_fd(),
        "created pipe"
    );

    Ok((
        Channel {
            origin,
            file: File::from(read),
        },
        PipeWriter {
            origin,
            file: File::from(write),
        },
    ))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn create_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [-1 as libc::c_int; 2];

    // SAFETY: `fds` is a valid writable array of two descriptors.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: pipe2 succeeded, so both descriptors are open and owned by nobody else.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn create_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [-1 as libc::c_int; 2];

    // SAFETY: `fds` is a valid writable array of two descriptors.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: pipe succeeded, so both descriptors are open and owned by nobody else.
    let ends = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(&ends.0)?;
    set_cloexec(&ends.1)?;
    Ok(ends)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: `fd` is an open descriptor for the lifetime of this call.
    let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
