//! Memcache text protocol reply encoder.

use dfly_common::config::ReplyConfig;

use super::base::{OptResp, ReplyCore, SinkReplyBuilder, sanitize_error_message, single_line};
use super::reply_vec::{CRLF, ReplyVec};
use crate::op_status::{PROTOCOL_ERR_TYPE, error_kind_label};
use crate::sink::Sink;

/// Error-type label used for `CLIENT_ERROR` replies.
pub const CLIENT_ERR_TYPE: &str = "client_error";

/// Reply builder speaking the memcache text protocol.
///
/// Honors the per-request `noreply` modifier: while set, replies are produced for bookkeeping
/// (error counters, `has_replied`) but no bytes reach the sink.
#[derive(Debug)]
pub struct McReplyBuilder<S> {
    core: ReplyCore<S>,
    noreply: bool,
}

impl<S: Sink> McReplyBuilder<S> {
    /// Creates a builder with `noreply` cleared.
    #[must_use]
    pub fn new(sink: S, config: ReplyConfig) -> Self {
        Self {
            core: ReplyCore::new(sink, config),
            noreply: false,
        }
    }

    /// Suppresses (or re-enables) output for the next reply.
    pub fn set_noreply(&mut self, noreply: bool) {
        self.noreply = noreply;
    }

    /// Returns `true` while output is suppressed.
    #[must_use]
    pub fn noreply(&self) -> bool {
        self.noreply
    }

    /// `CLIENT_ERROR <text>`: the request line itself is malformed.
    pub fn send_client_error(&mut self, text: &str) {
        let text = sanitize_error_message(text);
        self.core.record_error(CLIENT_ERR_TYPE);
        self.send_line(b"CLIENT_ERROR ", text.as_bytes());
    }

    /// `NOT_FOUND`: the item addressed by the command does not exist.
    pub fn send_not_found(&mut self) {
        self.send_line(b"", b"NOT_FOUND");
    }

    /// Sends preformatted bytes, subject to `noreply`.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        if self.noreply {
            self.core.mark_replied();
            return;
        }
        self.core.send_raw(bytes);
    }

    fn send_line(&mut self, prefix: &[u8], text: &[u8]) {
        if self.noreply {
            self.core.mark_replied();
            return;
        }
        if prefix.is_empty() {
            self.core.send_raw_vec(&[text, CRLF]);
        } else {
            self.core.send_raw_vec(&[prefix, text, CRLF]);
        }
    }
}

impl<S: Sink> SinkReplyBuilder for McReplyBuilder<S> {
    type Sink = S;

    fn core(&self) -> &ReplyCore<S> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ReplyCore<S> {
        &mut self.core
    }

    fn send_error(&mut self, message: &str, kind: &str) {
        let message = sanitize_error_message(message);
        self.core.record_error(error_kind_label(&message, kind));
        self.send_line(b"SERVER_ERROR ", message.as_bytes());
    }

    fn send_stored(&mut self) {
        self.send_line(b"", b"STORED");
    }

    fn send_set_skipped(&mut self) {
        self.send_line(b"", b"NOT_STORED");
    }

    fn send_mget_response(&mut self, values: &[OptResp]) {
        if self.noreply {
            self.core.mark_replied();
            return;
        }

        let mut reply = ReplyVec::new(self.core.config().inline_payload_limit);
        for value in values.iter().flatten() {
            reply.push_meta(b"VALUE ");
            reply.push_meta(&value.key);
            reply.push_meta(b" ");
            reply.push_decimal(value.mc_flag);
            reply.push_meta(b" ");
            reply.push_decimal(value.value.len());
            if value.mc_ver != 0 {
                reply.push_meta(b" ");
                reply.push_decimal(value.mc_ver);
            }
            reply.push_meta(CRLF);
            reply.push_payload(&value.value);
            reply.push_meta(CRLF);
        }
        reply.push_meta(b"END\r\n");
        self.core.send_raw_vec(&reply.parts());
    }

    fn send_long(&mut self, value: i64) {
        let mut digits = itoa::Buffer::new();
        let text = digits.format(value);
        self.send_line(b"", text.as_bytes());
    }

    fn send_simple_string(&mut self, text: &str) {
        let line = single_line(text.as_bytes());
        self.send_line(b"", &line);
    }

    fn send_protocol_error(&mut self, text: &str) {
        let text = sanitize_error_message(text);
        self.core.record_error(PROTOCOL_ERR_TYPE);
        self.send_line(b"CLIENT_ERROR ", text.as_bytes());
    }
}
