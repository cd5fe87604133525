use std::fmt;
use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use hlerr_transport::Origin;

use crate::error::{MuxError, Result};

/// Stdout bytes held back until a newline arrives or this many are pending.
pub const LINE_CAPACITY: usize = 1024;

/// Switches the terminal foreground to red.
pub const STDERR_BEGIN: &[u8] = b"\x1b[31m";
/// Resets all terminal attributes.
pub const STDERR_END: &[u8] = b"\x1b[m";
/// Switches the terminal foreground to blue for the termination summary.
pub const SUMMARY_BEGIN: &[u8] = b"\x1b[34m";

/// Whether the combined stream is currently inside a highlighted stderr span.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Plain,
    Highlighted,
}

/// Renders tagged bytes from both child streams into one output stream.
///
/// Stderr bytes are written immediately, wrapped in [`STDERR_BEGIN`] /
/// [`STDERR_END`]. Stdout bytes are line-buffered and written unmarked. Every
/// write the renderer issues is a complete unit: either one stderr byte
/// (possibly preceded by the begin marker) or one stdout block (possibly
/// preceded by the end marker).
pub struct OutputRenderer<W> {
    inner: W,
    mode: OutputMode,
    line: BytesMut,
    capacity: usize,
}

impl<W: Write> OutputRenderer<W> {
    /// Create a renderer with the default line capacity.
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, LINE_CAPACITY)
    }

    /// Create a renderer that flushes stdout after `capacity` pending bytes.
    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            mode: OutputMode::Plain,
            line: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Render one byte read from the child's `origin` stream.
    pub fn emit(&mut self, origin: Origin, byte: u8) -> Result<()> {
        match origin {
            Origin::Stdout => self.emit_stdout(byte),
            Origin::Stderr => self.emit_stderr(byte),
        }
    }

    /// Write a stderr byte right away, entering highlighted mode if needed.
    pub fn emit_stderr(&mut self, byte: u8) -> Result<()> {
        if self.mode == OutputMode::Plain {
            self.write(STDERR_BEGIN)?;
            self.mode = OutputMode::Highlighted;
        }
        self.write(&[byte])?;
        self.flush_sink()
    }

    /// Buffer a stdout byte, flushing the line on newline or when full.
    pub fn emit_stdout(&mut self, byte: u8) -> Result<()> {
        self.line.put_u8(byte);
        if byte == b'\n' || self.line.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Leave highlighted mode and write out any pending stdout bytes.
    ///
    /// Safe to call with an empty buffer; this is how the end of a run makes
    /// sure no highlighted state leaks into whatever is written next.
    pub fn flush(&mut self) -> Result<()> {
        if self.mode == OutputMode::Highlighted {
            self.write(STDERR_END)?;
            self.mode = OutputMode::Plain;
        }
        if !self.line.is_empty() {
            write_all(&mut self.inner, &self.line)?;
            self.line.clear();
        }
        self.flush_sink()
    }

    /// Flush, then write `summary` as one blue line.
    pub fn render_summary(&mut self, summary: impl fmt::Display) -> Result<()> {
        self.flush()?;

        let text = summary.to_string();
        let mut line =
            BytesMut::with_capacity(SUMMARY_BEGIN.len() + text.len() + STDERR_END.len() + 1);
        line.put_slice(SUMMARY_BEGIN);
        line.put_slice(text.as_bytes());
        line.put_slice(STDERR_END);
        line.put_u8(b'\n');

        self.write(&line)?;
        self.flush_sink()
    }

    /// Current highlighting mode.
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Stdout bytes not yet written.
    pub fn buffered(&self) -> &[u8] {
        &self.line
    }

    /// Number of stdout bytes that forces a flush.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the renderer and return the sink. Pending bytes are discarded.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        write_all(&mut self.inner, buf)
    }

    fn flush_sink(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(MuxError::Output(err)),
            }
        }
    }
}

fn write_all<W: Write>(inner: &mut W, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match inner.write(&buf[offset..]) {
            Ok(0) => return Err(MuxError::Output(ErrorKind::WriteZero.into())),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(MuxError::Output(err)),
        }
    }
    Ok(())
}
