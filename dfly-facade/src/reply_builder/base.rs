//! Protocol-independent reply builder state and contract.
//!
//! [`ReplyCore`] owns the sink, the batch buffer, the connection statistics and the
//! batch/aggregate state machine. Every encoder funnels its bytes through
//! [`ReplyCore::send_raw`] or [`ReplyCore::send_raw_vec`], so batching decisions and I/O
//! accounting live in one place.

use std::borrow::Cow;
use std::io::{self, IoSlice};
use std::ops::{Deref, DerefMut};

use dfly_common::config::ReplyConfig;
use dfly_common::error::{DflyError, DflyResult};
use tracing::{debug, trace};

use super::stats::{HotMap, ReplyStats};
use crate::op_status::{ErrorReply, INTERNAL_ERR, OpStatus};
use crate::sink::Sink;

/// Number of slices assembled on the stack before a write falls back to a heap slice table.
const INLINE_SLICES: usize = 8;

/// One item retrieved by a multi-get.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseValue {
    /// Item key.
    pub key: Vec<u8>,
    /// Item payload.
    pub value: Vec<u8>,
    /// Memcache CAS version; `0` means it was not requested and is not emitted.
    pub mc_ver: u64,
    /// Memcache client flags.
    pub mc_flag: u32,
}

/// Multi-get slot: `None` means the key was not found.
pub type OptResp = Option<ResponseValue>;

/// Connection-scoped reply mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    /// Set by the connection layer while pipelined requests are being served.
    pub should_batch: bool,
    /// Set while an operation-level [`ReplyAggregator`] is alive.
    pub should_aggregate: bool,
    /// Set by every send since the last [`ReplyCore::expect_reply`].
    pub has_replied: bool,
}

/// Sink-owning state shared by all reply encoders.
#[derive(Debug)]
pub struct ReplyCore<S> {
    sink: S,
    config: ReplyConfig,
    batch: Vec<u8>,
    error: Option<io::ErrorKind>,
    write_failed: bool,
    io_write_cnt: usize,
    io_write_bytes: usize,
    err_count: HotMap<String, u64>,
    flags: ModeFlags,
}

impl<S: Sink> ReplyCore<S> {
    /// Creates the state for one connection.
    #[must_use]
    pub fn new(sink: S, config: ReplyConfig) -> Self {
        Self {
            sink,
            config,
            batch: Vec::new(),
            error: None,
            write_failed: false,
            io_write_cnt: 0,
            io_write_bytes: 0,
            err_count: HotMap::new(),
            flags: ModeFlags::default(),
        }
    }

    /// Returns the underlying sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the underlying sink mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the state and returns the sink. Pending batched bytes are dropped.
    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Returns the reply settings this state was created with.
    #[must_use]
    pub fn config(&self) -> &ReplyConfig {
        &self.config
    }

    /// Returns a copy of the current mode flags.
    #[must_use]
    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    /// Bytes currently held back by batching or aggregation.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.batch.len()
    }

    /// Sends bytes without any formatting.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.send_raw_vec(&[bytes]);
    }

    /// Sends the concatenation of `parts` as one reply.
    ///
    /// While batching or aggregating, the parts are appended to the batch buffer as long as it
    /// stays under `max_batch_bytes`. Otherwise the pending buffer and the parts leave together
    /// in one vectored sink write.
    pub fn send_raw_vec(&mut self, parts: &[&[u8]]) {
        self.flags.has_replied = true;
        if self.write_failed {
            return;
        }

        let size: usize = parts.iter().map(|part| part.len()).sum();
        if (self.flags.should_batch || self.flags.should_aggregate)
            && self.batch.len().saturating_add(size) < self.config.max_batch_bytes
        {
            self.batch.reserve(size);
            for part in parts {
                self.batch.extend_from_slice(part);
            }
            trace!(bytes = size, pending = self.batch.len(), "batched reply");
            return;
        }

        self.write_with_pending(parts);
    }

    /// Sends `bytes` and keeps them buffered when `hold` is set, so they leave the process with
    /// the next reply instead of as a tiny packet of their own.
    pub(crate) fn send_raw_held(&mut self, bytes: &[u8], hold: bool) {
        let prev = self.flags.should_aggregate;
        self.flags.should_aggregate |= hold;
        self.send_raw(bytes);
        self.flags.should_aggregate = prev;
    }

    /// Toggles batch mode.
    ///
    /// Leaving batch mode flushes the buffer unless an aggregation still holds it.
    pub fn set_batch_mode(&mut self, batch: bool) {
        let leaving = self.flags.should_batch && !batch;
        self.flags.should_batch = batch;
        if leaving && !self.flags.should_aggregate {
            self.flush_batch();
        }
    }

    /// Writes and clears the batch buffer. Does nothing when the buffer is empty.
    pub fn flush_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if self.write_failed {
            self.batch.clear();
            return;
        }
        self.write_with_pending(&[]);
    }

    /// Returns `true` while a [`ReplyAggregator`] holds replies back.
    #[must_use]
    pub fn is_aggregating(&self) -> bool {
        self.flags.should_aggregate
    }

    pub(crate) fn start_aggregate(&mut self) {
        trace!("start aggregate");
        self.flags.should_aggregate = true;
    }

    pub(crate) fn stop_aggregate(&mut self) {
        trace!("stop aggregate");
        self.flags.should_aggregate = false;
        if self.flags.should_batch {
            return;
        }
        self.flush_batch();
    }

    /// Marks the start of a command whose reply is expected.
    pub fn expect_reply(&mut self) {
        self.flags.has_replied = false;
    }

    /// Returns `true` once any reply was produced since the last [`ReplyCore::expect_reply`].
    #[must_use]
    pub fn has_replied(&self) -> bool {
        self.flags.has_replied
    }

    /// Records a reply that was produced but intentionally not written.
    pub(crate) fn mark_replied(&mut self) {
        self.flags.has_replied = true;
    }

    pub(crate) fn record_error(&mut self, kind: &str) {
        if let Some(count) = self.err_count.get_mut(kind) {
            *count += 1;
        } else {
            self.err_count.insert(kind.to_owned(), 1);
        }
    }

    /// Asks the connection layer to terminate once current writes are flushed.
    pub fn close_connection(&mut self) {
        if self.error.is_none() {
            self.error = Some(io::ErrorKind::ConnectionAborted);
        }
    }

    /// Sticky connection error, if any.
    #[must_use]
    pub fn error(&self) -> Option<io::ErrorKind> {
        self.error
    }

    /// Converts the sticky error into a `DflyResult`.
    ///
    /// # Errors
    ///
    /// Returns `DflyError::SinkWrite` once a sink write failed or the connection was closed.
    pub fn check_error(&self) -> DflyResult<()> {
        match self.error {
            Some(kind) => Err(DflyError::SinkWrite(kind)),
            None => Ok(()),
        }
    }

    /// Number of successful sink writes.
    #[must_use]
    pub fn io_write_cnt(&self) -> usize {
        self.io_write_cnt
    }

    /// Bytes transferred by successful sink writes.
    #[must_use]
    pub fn io_write_bytes(&self) -> usize {
        self.io_write_bytes
    }

    /// Error replies grouped by error-type label.
    #[must_use]
    pub fn err_count(&self) -> &HotMap<String, u64> {
        &self.err_count
    }

    /// Resets I/O counters. Error counters are kept.
    pub fn reset_io_stats(&mut self) {
        self.io_write_cnt = 0;
        self.io_write_bytes = 0;
    }

    /// Clears the error counters. I/O counters are kept.
    pub fn reset_err_count(&mut self) {
        self.err_count.clear();
    }

    /// Snapshot of the I/O and error counters.
    #[must_use]
    pub fn stats(&self) -> ReplyStats {
        ReplyStats {
            io_write_cnt: self.io_write_cnt,
            io_write_bytes: self.io_write_bytes,
            err_count: self.err_count.clone(),
        }
    }

    fn write_with_pending(&mut self, parts: &[&[u8]]) {
        let mut pending = std::mem::take(&mut self.batch);
        let head = (!pending.is_empty()).then_some(pending.as_slice());
        let result = write_slices(&mut self.sink, head, parts);
        pending.clear();
        self.batch = pending;

        match result {
            Ok(written) => {
                self.io_write_cnt += 1;
                self.io_write_bytes += written;
            }
            Err(error) => {
                debug!(%error, "error writing to reply sink");
                self.write_failed = true;
                self.error = Some(error.kind());
            }
        }
    }
}

fn write_slices<S: Sink>(sink: &mut S, head: Option<&[u8]>, parts: &[&[u8]]) -> io::Result<usize> {
    let count = parts.len() + usize::from(head.is_some());
    let all = head.into_iter().chain(parts.iter().copied());
    if count <= INLINE_SLICES {
        let mut inline = [IoSlice::new(&[]); INLINE_SLICES];
        for (slot, part) in inline.iter_mut().zip(all) {
            *slot = IoSlice::new(part);
        }
        return sink.write_vectored(&inline[..count]);
    }
    let slices: Vec<IoSlice<'_>> = all.map(IoSlice::new).collect();
    sink.write_vectored(&slices)
}

/// Makes an error message safe to embed in a single reply line.
///
/// Empty messages degrade to a generic error.
pub(crate) fn sanitize_error_message(message: &str) -> Cow<'_, str> {
    if message.is_empty() {
        return Cow::Borrowed(INTERNAL_ERR);
    }
    if message.contains(['\r', '\n']) {
        return Cow::Owned(message.replace(['\r', '\n'], " "));
    }
    Cow::Borrowed(message)
}

/// Replaces CR and LF with spaces so `text` cannot terminate its line early.
pub(crate) fn single_line(text: &[u8]) -> Cow<'_, [u8]> {
    if !text.iter().any(|byte| matches!(byte, b'\r' | b'\n')) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.iter()
            .map(|&byte| if matches!(byte, b'\r' | b'\n') { b' ' } else { byte })
            .collect(),
    )
}

/// Reply contract implemented by every client protocol encoder.
///
/// The required methods format one reply in the encoder's grammar. The provided methods cover
/// the batching, aggregation and statistics surface the connection layer drives.
pub trait SinkReplyBuilder {
    /// Byte sink the encoder writes to.
    type Sink: Sink;

    /// Shared builder state.
    fn core(&self) -> &ReplyCore<Self::Sink>;

    /// Shared builder state, mutably.
    fn core_mut(&mut self) -> &mut ReplyCore<Self::Sink>;

    /// Sends an execution error; `kind` labels the error for statistics.
    fn send_error(&mut self, message: &str, kind: &str);

    /// Sends a prepared error, translating its status when one is attached.
    fn send_error_reply(&mut self, error: ErrorReply) {
        if let Some(status) = error.status {
            self.send_status(status);
            return;
        }
        self.send_error(&error.message, &error.kind);
    }

    /// `OpStatus::Ok` becomes [`SinkReplyBuilder::send_ok`]; anything else an error reply.
    fn send_status(&mut self, status: OpStatus) {
        if status == OpStatus::Ok {
            self.send_ok();
        } else {
            self.send_error(status.message(), "");
        }
    }

    /// Reply for a successful store command.
    fn send_stored(&mut self);

    /// Reply for a store command that was not performed.
    fn send_set_skipped(&mut self);

    /// Multi-get reply; `None` slots are keys that were not found.
    fn send_mget_response(&mut self, values: &[OptResp]);

    /// Integer reply.
    fn send_long(&mut self, value: i64);

    /// One-line status reply. CR and LF inside `text` are sent as spaces.
    fn send_simple_string(&mut self, text: &str);

    /// Success status reply.
    fn send_ok(&mut self) {
        self.send_simple_string("OK");
    }

    /// Reports a malformed request. Unlike [`SinkReplyBuilder::send_error`], the connection is
    /// usually closed afterwards.
    fn send_protocol_error(&mut self, text: &str);

    /// See [`ReplyCore::set_batch_mode`].
    fn set_batch_mode(&mut self, batch: bool) {
        self.core_mut().set_batch_mode(batch);
    }

    /// See [`ReplyCore::flush_batch`].
    fn flush_batch(&mut self) {
        self.core_mut().flush_batch();
    }

    /// See [`ReplyCore::close_connection`].
    fn close_connection(&mut self) {
        self.core_mut().close_connection();
    }

    /// See [`ReplyCore::expect_reply`].
    fn expect_reply(&mut self) {
        self.core_mut().expect_reply();
    }

    /// See [`ReplyCore::has_replied`].
    fn has_replied(&self) -> bool {
        self.core().has_replied()
    }

    /// See [`ReplyCore::error`].
    fn error(&self) -> Option<io::ErrorKind> {
        self.core().error()
    }

    /// # Errors
    ///
    /// Returns `DflyError::SinkWrite` when the sticky connection error is set.
    fn check_error(&self) -> DflyResult<()> {
        self.core().check_error()
    }
}

/// Scoped aggregation over a reply builder.
///
/// Replies sent through the guard are held in the batch buffer and leave together when the
/// guard is dropped. A guard created while another aggregation is active is a pass-through, so
/// only the outermost guard flushes (e.g. a command running inside `MULTI/EXEC`).
pub struct ReplyAggregator<'a, B: SinkReplyBuilder + ?Sized> {
    builder: &'a mut B,
    is_nested: bool,
}

impl<'a, B: SinkReplyBuilder + ?Sized> ReplyAggregator<'a, B> {
    /// Starts aggregating on `builder` unless an outer guard already does.
    pub fn new(builder: &'a mut B) -> Self {
        let is_nested = builder.core().is_aggregating();
        if !is_nested {
            builder.core_mut().start_aggregate();
        }
        Self { builder, is_nested }
    }

    /// Returns `true` when an outer aggregation owns the flush.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.is_nested
    }
}

impl<B: SinkReplyBuilder + ?Sized> Deref for ReplyAggregator<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.builder
    }
}

impl<B: SinkReplyBuilder + ?Sized> DerefMut for ReplyAggregator<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.builder
    }
}

impl<B: SinkReplyBuilder + ?Sized> Drop for ReplyAggregator<'_, B> {
    fn drop(&mut self) {
        if !self.is_nested {
            self.builder.core_mut().stop_aggregate();
        }
    }
}
