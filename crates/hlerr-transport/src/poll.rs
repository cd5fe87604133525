use std::io::{self, ErrorKind};
use std::os::fd::AsRawFd;

use crate::error::{Result, TransportError};
use crate::pipe::Channel;

/// Events that make a channel worth reading.
const READ_EVENTS: libc::c_short = libc::POLLIN | libc::POLLPRI;

/// State of one channel after [`wait_readable`] returns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Nothing to read yet.
    Idle,
    /// A read will not block. It may still report end-of-stream.
    Readable,
    /// The kernel flagged the descriptor (`POLLERR`/`POLLNVAL`).
    Failed,
}

/// Block until at least one channel is readable or in an error state.
///
/// Results are returned in the same order as `channels`. A hung-up pipe is
/// reported as readable so the caller observes end-of-stream through a read.
/// There is no timeout; interrupted waits are retried.
pub fn wait_readable(channels: &[&Channel]) -> Result<Vec<Readiness>> {
    if channels.is_empty() {
        return Ok(Vec::new());
    }

    let mut fds: Vec<libc::pollfd> = channels
        .iter()
        .map(|channel| libc::pollfd {
            fd: channel.as_raw_fd(),
            events: READ_EVENTS,
            revents: 0,
        })
        .collect();

    loop {
        // SAFETY: `fds` points to `fds.len()` initialized pollfd entries, each
        // referring to a descriptor borrowed from a live channel.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if rc != -1 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != ErrorKind::Interrupted {
            return Err(TransportError::Poll(err));
        }
    }

    Ok(fds.iter().map(|fd| readiness(fd.revents)).collect())
}

fn readiness(revents: libc::c_short) -> Readiness {
    if revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        Readiness::Failed
    } else if revents & (READ_EVENTS | libc::POLLHUP) != 0 {
        Readiness::Readable
    } else {
        Readiness::Idle
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::origin::Origin;
    use crate::pipe::pipe;

    #[test]
    fn ready_channel_is_reported_in_order() {
        let (out, _out_writer) = pipe(Origin::Stdout).unwrap();
        let (err, mut err_writer) = pipe(Origin::Stderr).unwrap();
        err_writer.write_all(b"x").unwrap();

        let ready = wait_readable(&[&out, &err]).unwrap();
        assert_eq!(ready, vec![Readiness::Idle, Readiness::Readable]);
    }

    #[test]
    fn hangup_counts_as_readable() {
        let (mut out, out_writer) = pipe(Origin::Stdout).unwrap();
        drop(out_writer);

        let ready = wait_readable(&[&out]).unwrap();
        assert_eq!(ready, vec![Readiness::Readable]);
        assert_eq!(out.read_byte().unwrap(), None);
    }

    #[test]
    fn wait_blocks_until_a_writer_shows_up() {
        let (out, mut out_writer) = pipe(Origin::Stdout).unwrap();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            out_writer.write_all(b"late").unwrap();
            out_writer
        });

        let ready = wait_readable(&[&out]).unwrap();
        assert_eq!(ready, vec![Readiness::Readable]);
        drop(writer.join().unwrap());
    }

    #[test]
    fn empty_set_does_not_block() {
        assert!(wait_readable(&[]).unwrap().is_empty());
    }

    #[test]
    fn revents_mapping() {
        assert_eq!(readiness(0), Readiness::Idle);
        assert_eq!(readiness(libc::POLLIN), Readiness::Readable);
        assert_eq!(readiness(libc::POLLPRI), Readiness::Readable);
        assert_eq!(readiness(libc::POLLHUP), Readiness::Readable);
        assert_eq!(readiness(libc::POLLIN | libc::POLLERR), Readiness::Failed);
        assert_eq!(readiness(libc::POLLNVAL), Readiness::Failed);
    }
}
