//! Sink doubles shared by reply builder tests.

use std::io::{self, IoSlice};

use crate::sink::Sink;

/// Sink that keeps every vectored write as a separate record.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) writes: Vec<Vec<u8>>,
    pub(crate) attempts: usize,
    pub(crate) fail_with: Option<io::ErrorKind>,
}

impl RecordingSink {
    pub(crate) fn failing(kind: io::ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::default()
        }
    }

    /// All bytes written so far, in order.
    pub(crate) fn output(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Sink for RecordingSink {
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        self.attempts += 1;
        if let Some(kind) = self.fail_with {
            return Err(io::Error::from(kind));
        }
        let mut write = Vec::new();
        for buf in bufs {
            write.extend_from_slice(buf);
        }
        let written = write.len();
        self.writes.push(write);
        Ok(written)
    }
}
