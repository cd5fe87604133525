use std::io::Write;

use hlerr_transport::{wait_readable, Channel, Origin, Readiness, TransportError};
use tracing::{debug, warn};

use crate::error::Result;
use crate::renderer::OutputRenderer;

const STDOUT_SLOT: usize = 0;
const STDERR_SLOT: usize = 1;

/// Byte counts forwarded by a completed multiplexer run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MuxStats {
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
}

impl MuxStats {
    fn record(&mut self, origin: Origin) {
        match origin {
            Origin::Stdout => self.stdout_bytes += 1,
            Origin::Stderr => self.stderr_bytes += 1,
        }
    }
}

/// Drains the child's stdout and stderr pipes into one renderer.
///
/// Each iteration waits until a channel is ready, then reads exactly one byte
/// from every ready channel, stdout first. A channel is closed as soon as it
/// reports end-of-stream; the run ends once both are closed.
#[derive(Debug)]
pub struct Multiplexer {
    channels: [Option<Channel>; 2],
}

impl Multiplexer {
    pub fn new(stdout: Channel, stderr: Channel) -> Self {
        debug_assert_eq!(stdout.origin(), Origin::Stdout);
        debug_assert_eq!(stderr.origin(), Origin::Stderr);
        let mut channels = [None, None];
        channels[STDOUT_SLOT] = Some(stdout);
        channels[STDERR_SLOT] = Some(stderr);
        Self { channels }
    }

    /// True once both channels have reached end-of-stream.
    pub fn is_exhausted(&self) -> bool {
        self.channels.iter().all(Option::is_none)
    }

    /// Forward every byte from both channels to `renderer`, then flush it.
    ///
    /// The renderer is flushed even when the loop fails, so the output never
    /// ends inside a highlighted span. Channels still open when the loop fails
    /// are closed before returning.
    pub fn run<W: Write>(mut self, renderer: &mut OutputRenderer<W>) -> Result<MuxStats> {
        let pumped = self.pump(renderer);
        debug_assert!(pumped.is_err() || self.is_exhausted());
        drop(self);

        let flushed = renderer.flush();
        match (pumped, flushed) {
            (Ok(stats), Ok(())) => {
                debug!(
                    stdout_bytes = stats.stdout_bytes,
                    stderr_bytes = stats.stderr_bytes,
                    "child streams drained"
                );
                Ok(stats)
            }
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(flush_err)) => {
                warn!(error = %flush_err, "final flush failed after multiplexer error");
                Err(err)
            }
        }
    }

    fn pump<W: Write>(&mut self, renderer: &mut OutputRenderer<W>) -> Result<MuxStats> {
        let mut stats = MuxStats::default();

        loop {
            let mut open = [STDOUT_SLOT; 2];
            let mut count = 0;
            for (slot, channel) in self.channels.iter().enumerate() {
                if channel.is_some() {
                    open[count] = slot;
                    count += 1;
                }
            }

            let readiness = match &self.channels {
                [Some(out), Some(err)] => wait_readable(&[out, err])?,
                [Some(one), None] | [None, Some(one)] => wait_readable(&[one])?,
                [None, None] => return Ok(stats),
            };

            for (&slot, state) in open[..count].iter().zip(readiness) {
                let Some(channel) = self.channels[slot].as_mut() else {
                    continue;
                };
                let origin = channel.origin();

                match state {
                    Readiness::Idle => {}
                    Readiness::Failed => {
                        return Err(TransportError::StreamFailed { origin }.into());
                    }
                    Readiness::Readable => match channel.read_byte()? {
                        Some(byte) => {
                            renderer.emit(origin, byte)?;
                            stats.record(origin);
                        }
                        None => {
                            debug!(%origin, "end of stream");
                            self.channels[slot] = None;
                        }
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, ErrorKind};
    use std::thread;
    use std::time::Duration;

    use hlerr_transport::{pipe, PipeWriter};

    use super::*;
    use crate::error::MuxError;
    use crate::renderer::{STDERR_BEGIN, STDERR_END};

    fn pipes() -> (Multiplexer, PipeWriter, PipeWriter) {
        let (out, out_writer) = pipe(Origin::Stdout).unwrap();
        let (err, err_writer) = pipe(Origin::Stderr).unwrap();
        (Multiplexer::new(out, err), out_writer, err_writer)
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn simultaneously_ready_channels_alternate_stdout_first() {
        let (mux, mut out, mut err) = pipes();
        out.write_all(b"ab\n").unwrap();
        err.write_all(b"XY").unwrap();
        drop((out, err));

        let mut renderer = OutputRenderer::new(Vec::new());
        let stats = mux.run(&mut renderer).unwrap();

        assert_eq!(renderer.get_ref().as_slice(), b"\x1b[31mXY\x1b[mab\n");
        assert_eq!(
            stats,
            MuxStats {
                stdout_bytes: 3,
                stderr_bytes: 2
            }
        );
    }

    #[test]
    fn keeps_reading_after_one_stream_closes() {
        let (mux, mut out, err) = pipes();
        drop(err);

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            out.write_all(b"late\n").unwrap();
        });

        let mut renderer = OutputRenderer::new(Vec::new());
        mux.run(&mut renderer).unwrap();
        writer.join().unwrap();

        assert_eq!(renderer.get_ref().as_slice(), b"late\n");
    }

    #[test]
    fn sequential_writes_render_in_order() {
        let (mux, mut out, mut err) = pipes();

        let writer = thread::spawn(move || {
            out.write_all(b"1\n").unwrap();
            thread::sleep(Duration::from_millis(30));
            err.write_all(b"2").unwrap();
            thread::sleep(Duration::from_millis(30));
            out.write_all(b"3\n").unwrap();
        });

        let mut renderer = OutputRenderer::new(Vec::new());
        mux.run(&mut renderer).unwrap();
        writer.join().unwrap();

        assert_eq!(renderer.get_ref().as_slice(), b"1\n\x1b[31m2\x1b[m3\n");
    }

    #[test]
    fn trailing_stderr_is_closed_by_final_flush() {
        let (mux, out, mut err) = pipes();
        err.write_all(b"oops").unwrap();
        drop((out, err));

        let mut renderer = OutputRenderer::new(Vec::new());
        mux.run(&mut renderer).unwrap();

        let mut expected = STDERR_BEGIN.to_vec();
        expected.extend_from_slice(b"oops");
        expected.extend_from_slice(STDERR_END);
        assert_eq!(renderer.get_ref(), &expected);
    }

    #[test]
    fn partial_stdout_line_is_written_at_end() {
        let (mux, mut out, err) = pipes();
        out.write_all(b"partial").unwrap();
        drop((out, err));

        let mut renderer = OutputRenderer::new(Vec::new());
        mux.run(&mut renderer).unwrap();

        assert_eq!(renderer.get_ref().as_slice(), b"partial");
    }

    #[test]
    fn nul_bytes_are_forwarded_but_end_of_stream_is_not() {
        let (mux, mut out, err) = pipes();
        out.write_all(&[0, b'\n']).unwrap();
        drop((out, err));

        let mut renderer = OutputRenderer::new(Vec::new());
        let stats = mux.run(&mut renderer).unwrap();

        assert_eq!(renderer.get_ref().as_slice(), &[0, b'\n']);
        assert_eq!(stats.stdout_bytes, 2);
        assert_eq!(stats.stderr_bytes, 0);
    }

    #[test]
    fn output_failure_aborts_and_closes_channels() {
        let (mux, mut out, mut err) = pipes();
        err.write_all(b"e").unwrap();

        let mut renderer = OutputRenderer::new(BrokenSink);
        let result = mux.run(&mut renderer);
        assert!(matches!(result, Err(MuxError::Output(_))));

        let write_err = out.write_all(b"more").unwrap_err();
        assert_eq!(write_err.kind(), ErrorKind::BrokenPipe);
        let write_err = err.write_all(b"more").unwrap_err();
        assert_eq!(write_err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn exhausted_only_after_both_streams_end() {
        let (mux, _out, _err) = pipes();
        assert!(!mux.is_exhausted());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn flagged_descriptor_fails_the_run() {
        use std::os::fd::AsRawFd;

        let (out, _out_writer) = pipe(Origin::Stdout).unwrap();
        let (err, _err_writer) = pipe(Origin::Stderr).unwrap();

        // A pipe write end with no reader polls as POLLERR on Linux.
        let (orphan_reader, orphan_writer) = pipe(Origin::Stdout).unwrap();
        drop(orphan_reader);
        // SAFETY: both descriptors are open; dup2 replaces the channel's
        // descriptor in place, so `out` still owns exactly one open fd.
        let rc = unsafe { libc::dup2(orphan_writer.as_raw_fd(), out.as_raw_fd()) };
        assert_ne!(rc, -1, "dup2 should succeed");

        let mut renderer = OutputRenderer::new(Vec::new());
        let result = Multiplexer::new(out, err).run(&mut renderer);

        assert!(matches!(
            result,
            Err(MuxError::Transport(TransportError::StreamFailed {
                origin: Origin::Stdout
            }))
        ));
        assert!(renderer.get_ref().is_empty());
    }
}
