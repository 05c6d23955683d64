//! Client reply builders.
//!
//! Command handlers report results through the [`SinkReplyBuilder`] contract. Each connection
//! owns exactly one builder, chosen from its [`ClientProtocol`] when the connection is set up:
//! [`RedisReplyBuilder`] for RESP2/RESP3 clients and [`McReplyBuilder`] for memcache text
//! clients. The connection layer drives batching while pipelined requests are served and wraps
//! multi-command operations in a [`ReplyAggregator`].

#[path = "reply_builder/base.rs"]
mod base;
#[path = "reply_builder/double.rs"]
mod double;
#[path = "reply_builder/memcache.rs"]
mod memcache;
#[path = "reply_builder/redis.rs"]
mod redis;
#[path = "reply_builder/reply_vec.rs"]
pub(crate) mod reply_vec;
#[path = "reply_builder/stats.rs"]
mod stats;

use dfly_common::config::ReplyConfig;

pub use base::{ModeFlags, OptResp, ReplyAggregator, ReplyCore, ResponseValue, SinkReplyBuilder};
pub use double::{DOUBLE_BUF_LEN, format_double};
pub use memcache::{CLIENT_ERR_TYPE, McReplyBuilder};
pub use redis::{CollectionType, RedisReplyBuilder};
pub use stats::{HotMap, ReplyStats};

use crate::protocol::ClientProtocol;
use crate::sink::Sink;

/// Reply builder selected for one connection.
#[derive(Debug)]
pub enum ReplyBuilder<S> {
    /// Memcache text protocol.
    Memcache(McReplyBuilder<S>),
    /// RESP2/RESP3.
    Redis(RedisReplyBuilder<S>),
}

impl<S: Sink> ReplyBuilder<S> {
    /// Creates the builder matching the connection's wire protocol.
    #[must_use]
    pub fn new(protocol: ClientProtocol, sink: S, config: ReplyConfig) -> Self {
        match protocol {
            ClientProtocol::Resp => Self::Redis(RedisReplyBuilder::new(sink, config)),
            ClientProtocol::Memcache => Self::Memcache(McReplyBuilder::new(sink, config)),
        }
    }

    #[must_use]
    pub fn protocol(&self) -> ClientProtocol {
        match self {
            Self::Memcache(_) => ClientProtocol::Memcache,
            Self::Redis(_) => ClientProtocol::Resp,
        }
    }

    pub fn as_redis_mut(&mut self) -> Option<&mut RedisReplyBuilder<S>> {
        match self {
            Self::Redis(builder) => Some(builder),
            Self::Memcache(_) => None,
        }
    }

    pub fn as_memcache_mut(&mut self) -> Option<&mut McReplyBuilder<S>> {
        match self {
            Self::Memcache(builder) => Some(builder),
            Self::Redis(_) => None,
        }
    }
}

impl<S: Sink> SinkReplyBuilder for ReplyBuilder<S> {
    type Sink = S;

    fn core(&self) -> &ReplyCore<S> {
        match self {
            Self::Memcache(builder) => builder.core(),
            Self::Redis(builder) => builder.core(),
        }
    }

    fn core_mut(&mut self) -> &mut ReplyCore<S> {
        match self {
            Self::Memcache(builder) => builder.core_mut(),
            Self::Redis(builder) => builder.core_mut(),
        }
    }

    fn send_error(&mut self, message: &str, kind: &str) {
        match self {
            Self::Memcache(builder) => builder.send_error(message, kind),
            Self::Redis(builder) => builder.send_error(message, kind),
        }
    }

    fn send_stored(&mut self) {
        match self {
            Self::Memcache(builder) => builder.send_stored(),
            Self::Redis(builder) => builder.send_stored(),
        }
    }

    fn send_set_skipped(&mut self) {
        match self {
            Self::Memcache(builder) => builder.send_set_skipped(),
            Self::Redis(builder) => builder.send_set_skipped(),
        }
    }

    fn send_mget_response(&mut self, values: &[OptResp]) {
        match self {
            Self::Memcache(builder) => builder.send_mget_response(values),
            Self::Redis(builder) => builder.send_mget_response(values),
        }
    }

    fn send_long(&mut self, value: i64) {
        match self {
            Self::Memcache(builder) => builder.send_long(value),
            Self::Redis(builder) => builder.send_long(value),
        }
    }

    fn send_simple_string(&mut self, text: &str) {
        match self {
            Self::Memcache(builder) => builder.send_simple_string(text),
            Self::Redis(builder) => builder.send_simple_string(text),
        }
    }

    fn send_protocol_error(&mut self, text: &str) {
        match self {
            Self::Memcache(builder) => builder.send_protocol_error(text),
            Self::Redis(builder) => builder.send_protocol_error(text),
        }
    }
}

#[cfg(test)]
#[path = "reply_builder/testing.rs"]
pub(crate) mod testing;

#[cfg(test)]
#[path = "reply_builder/tests.rs"]
mod tests;
