//! RESP2/RESP3 reply encoder.

use dfly_common::config::ReplyConfig;
use tracing::debug;

use super::base::{
    OptResp, ReplyAggregator, ReplyCore, SinkReplyBuilder, sanitize_error_message, single_line,
};
use super::double::{DOUBLE_BUF_LEN, format_double};
use super::reply_vec::{CRLF, Header, ReplyVec};
use crate::op_status::{PROTOCOL_ERR_TYPE, error_kind_label};
use crate::sink::Sink;

const ERR_PREFIX: &[u8] = b"-ERR ";
const RESP2_NULL: &[u8] = b"$-1\r\n";
const RESP3_NULL: &[u8] = b"_\r\n";

/// Framing of a multi-element reply.
///
/// Only RESP3 distinguishes the variants on the wire; RESP2 sends all of them as arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    /// Ordered list (`*`).
    Array,
    /// Unordered unique members (`~`).
    Set,
    /// Key/value pairs (`%`).
    Map,
    /// Out-of-band message such as a pub/sub delivery (`>`).
    Push,
}

impl CollectionType {
    const fn resp3_symbol(self) -> u8 {
        match self {
            Self::Array => b'*',
            Self::Set => b'~',
            Self::Map => b'%',
            Self::Push => b'>',
        }
    }
}

/// Reply builder speaking RESP2 or RESP3, switchable per connection (`HELLO 3`).
#[derive(Debug)]
pub struct RedisReplyBuilder<S> {
    core: ReplyCore<S>,
    is_resp3: bool,
}

impl<S: Sink> RedisReplyBuilder<S> {
    /// Creates a RESP2 builder; `HELLO 3` switches it with [`RedisReplyBuilder::set_resp3`].
    #[must_use]
    pub fn new(sink: S, config: ReplyConfig) -> Self {
        Self {
            core: ReplyCore::new(sink, config),
            is_resp3: false,
        }
    }

    /// Selects RESP3 (`true`) or RESP2 (`false`) framing for later replies.
    pub fn set_resp3(&mut self, is_resp3: bool) {
        self.is_resp3 = is_resp3;
    }

    /// Returns `true` when RESP3 framing is active.
    #[must_use]
    pub fn is_resp3(&self) -> bool {
        self.is_resp3
    }

    /// Formats a double exactly like [`RedisReplyBuilder::send_double`] does.
    #[must_use]
    pub fn format_double(value: f64, dest: &mut [u8; DOUBLE_BUF_LEN]) -> &str {
        format_double(value, dest)
    }

    fn null_string(&self) -> &'static [u8] {
        if self.is_resp3 { RESP3_NULL } else { RESP2_NULL }
    }

    /// Sends the version-specific null value.
    pub fn send_null(&mut self) {
        let null = self.null_string();
        self.core.send_raw(null);
    }

    /// `*-1`
    pub fn send_null_array(&mut self) {
        self.core.send_raw(b"*-1\r\n");
    }

    /// `*0`
    pub fn send_empty_array(&mut self) {
        self.start_array(0);
    }

    /// Binary-safe bulk string.
    pub fn send_bulk_string(&mut self, payload: &[u8]) {
        let header = Header::new(b'$', payload.len());
        self.core.send_raw_vec(&[header.as_bytes(), payload, CRLF]);
    }

    /// RESP3 double, or a bulk string holding the same text under RESP2.
    pub fn send_double(&mut self, value: f64) {
        let mut buf = [0_u8; DOUBLE_BUF_LEN];
        let text = format_double(value, &mut buf);
        if self.is_resp3 {
            self.core.send_raw_vec(&[b",", text.as_bytes(), CRLF]);
        } else {
            self.send_bulk_string(text.as_bytes());
        }
    }

    /// Shorthand for [`RedisReplyBuilder::start_collection`] with [`CollectionType::Array`].
    pub fn start_array(&mut self, len: usize) {
        self.start_collection(len, CollectionType::Array);
    }

    /// Sends a collection header; the caller sends the elements next.
    ///
    /// For [`CollectionType::Map`], `len` counts pairs. RESP2 flattens maps into arrays of
    /// `2 * len` elements. A non-empty header stays buffered until the first element is sent.
    pub fn start_collection(&mut self, len: usize, collection: CollectionType) {
        let (symbol, len) = if self.is_resp3 {
            (collection.resp3_symbol(), len)
        } else if collection == CollectionType::Map {
            (b'*', len * 2)
        } else {
            (b'*', len)
        };
        let header = Header::new(symbol, len);
        self.core.send_raw_held(header.as_bytes(), len > 0);
    }

    /// Array of simple strings (`+item`). CR and LF inside an item are sent as spaces.
    pub fn send_simple_str_arr<T: AsRef<[u8]>>(&mut self, items: &[T]) {
        let lines: Vec<_> = items.iter().map(|item| single_line(item.as_ref())).collect();
        let mut reply = ReplyVec::new(self.core.config().inline_payload_limit);
        reply.push_header(b'*', lines.len());
        for line in &lines {
            reply.push_meta(b"+");
            reply.push_payload(line);
            reply.push_meta(CRLF);
        }
        self.core.send_raw_vec(&reply.parts());
    }

    /// Collection of bulk strings.
    ///
    /// For [`CollectionType::Map`], `items` alternates keys and values.
    pub fn send_string_arr<T: AsRef<[u8]>>(&mut self, items: &[T], collection: CollectionType) {
        debug_assert!(
            collection != CollectionType::Map || items.len() % 2 == 0,
            "map replies need key/value pairs"
        );
        let (symbol, header_len) = if !self.is_resp3 {
            (b'*', items.len())
        } else if collection == CollectionType::Map {
            (b'%', items.len() / 2)
        } else {
            (collection.resp3_symbol(), items.len())
        };

        let mut reply = ReplyVec::new(self.core.config().inline_payload_limit);
        reply.push_header(symbol, header_len);
        for item in items {
            reply.push_bulk(item.as_ref());
        }
        self.core.send_raw_vec(&reply.parts());
    }

    /// Sorted-set style `(member, score)` reply.
    ///
    /// Without scores the reply is a flat array of members. With scores RESP2 sends a flat
    /// `member, score, ...` array and RESP3 an array of `[member, score]` pairs.
    pub fn send_scored_array(&mut self, pairs: &[(String, f64)], with_scores: bool) {
        let mut agg = ReplyAggregator::new(self);
        if !with_scores {
            agg.send_string_arr(
                &pairs.iter().map(|(member, _)| member.as_str()).collect::<Vec<_>>(),
                CollectionType::Array,
            );
            return;
        }

        if !agg.is_resp3 {
            let mut reply = ReplyVec::new(agg.core.config().inline_payload_limit);
            reply.push_header(b'*', pairs.len() * 2);
            let mut buf = [0_u8; DOUBLE_BUF_LEN];
            for (member, score) in pairs {
                reply.push_bulk(member.as_bytes());
                reply.push_bulk_copied(format_double(*score, &mut buf).as_bytes());
            }
            agg.core.send_raw_vec(&reply.parts());
            return;
        }

        agg.start_array(pairs.len());
        for (member, score) in pairs {
            agg.start_array(2);
            agg.send_bulk_string(member.as_bytes());
            agg.send_double(*score);
        }
    }
}

impl<S: Sink> SinkReplyBuilder for RedisReplyBuilder<S> {
    type Sink = S;

    fn core(&self) -> &ReplyCore<S> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ReplyCore<S> {
        &mut self.core
    }

    fn send_error(&mut self, message: &str, kind: &str) {
        let message = sanitize_error_message(message);
        debug!(error = %message, "sending error reply");
        self.core.record_error(error_kind_label(&message, kind));

        if message.starts_with('-') {
            self.core.send_raw_vec(&[message.as_bytes(), CRLF]);
        } else {
            self.core.send_raw_vec(&[ERR_PREFIX, message.as_bytes(), CRLF]);
        }
    }

    fn send_stored(&mut self) {
        self.send_simple_string("OK");
    }

    fn send_set_skipped(&mut self) {
        self.send_null();
    }

    fn send_mget_response(&mut self, values: &[OptResp]) {
        let null = self.null_string();
        let mut reply = ReplyVec::new(self.core.config().inline_payload_limit);
        reply.push_header(b'*', values.len());
        for value in values {
            match value {
                Some(value) => reply.push_bulk(&value.value),
                None => reply.push_meta(null),
            }
        }
        self.core.send_raw_vec(&reply.parts());
    }

    fn send_long(&mut self, value: i64) {
        let header = Header::new(b':', value);
        self.core.send_raw(header.as_bytes());
    }

    fn send_simple_string(&mut self, text: &str) {
        let line = single_line(text.as_bytes());
        self.core.send_raw_vec(&[b"+", line.as_ref(), CRLF]);
    }

    fn send_protocol_error(&mut self, text: &str) {
        self.send_error(&format!("-ERR Protocol error: {text}"), PROTOCOL_ERR_TYPE);
    }
}
