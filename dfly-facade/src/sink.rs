//! Byte sink abstraction consumed by reply builders.
//!
//! A sink accepts scatter-gather writes and either transfers every byte or reports an I/O
//! error. Reply builders never talk to sockets directly; the connection layer hands them a sink.

use std::io::{self, IoSlice, Write};

/// Destination for encoded reply bytes.
pub trait Sink {
    /// Writes all bytes of `bufs` in order.
    ///
    /// Returns the number of bytes transferred, which equals the summed slice length on success.
    ///
    /// # Errors
    ///
    /// Returns the transport error that prevented the full write.
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize>;
}

impl Sink for Vec<u8> {
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let total = bufs.iter().map(|buf| buf.len()).sum();
        self.reserve(total);
        for buf in bufs {
            self.extend_from_slice(buf);
        }
        Ok(total)
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        (**self).write_vectored(bufs)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        (**self).write_vectored(bufs)
    }
}

/// Adapter turning any blocking [`Write`] (a `TcpStream`, a file, ...) into a [`Sink`].
///
/// Short vectored writes are continued until every slice is drained; `Interrupted` is retried
/// and a zero-length write is reported as `WriteZero`.
#[derive(Debug)]
pub struct WriteSink<W> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    /// Wraps a writer.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped writer.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the adapter.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_once(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        loop {
            match self.inner.write_vectored(bufs) {
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                result => return result,
            }
        }
    }
}

impl<W: Write> Sink for WriteSink<W> {
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let total: usize = bufs.iter().map(|buf| buf.len()).sum();
        if total == 0 {
            return Ok(0);
        }

        let written = self.write_once(bufs)?;
        if written == total {
            return Ok(total);
        }
        if written == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero));
        }

        // Partial write: continue on an owned copy of the slice table.
        let mut storage = bufs.to_vec();
        let mut remaining = storage.as_mut_slice();
        IoSlice::advance_slices(&mut remaining, written);
        while !remaining.is_empty() {
            match self.write_once(remaining)? {
                0 => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                written => IoSlice::advance_slices(&mut remaining, written),
            }
        }
        Ok(total)
    }
}
