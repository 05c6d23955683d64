//! Facade layer: reply encoding for client connections.
//!
//! Every connection owns one [`reply_builder::ReplyBuilder`] chosen from its
//! [`protocol::ClientProtocol`]. Outbound commands to peer instances go through
//! [`req_serializer::ReqSerializer`].

pub mod op_status;
pub mod protocol;
pub mod reply_builder;
pub mod req_serializer;
pub mod sink;

use dfly_common::config::ReplyConfig;
use dfly_common::error::DflyResult;
use tracing::debug;

use crate::protocol::ClientProtocol;
use crate::reply_builder::ReplyBuilder;
use crate::sink::Sink;

/// Facade subsystem bootstrap module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacadeModule {
    /// Reply settings shared by every connection.
    pub reply: ReplyConfig,
}

impl FacadeModule {
    /// Builds the facade bootstrap model from process config.
    ///
    /// # Errors
    ///
    /// Returns `DflyError::InvalidConfig` when the reply settings are unusable.
    pub fn from_config(config: &ReplyConfig) -> DflyResult<Self> {
        config.validate()?;
        Ok(Self { reply: *config })
    }

    /// Creates the reply builder for a freshly accepted connection.
    #[must_use]
    pub fn new_reply_builder<S: Sink>(&self, protocol: ClientProtocol, sink: S) -> ReplyBuilder<S> {
        debug!(protocol = protocol.name(), "creating reply builder");
        ReplyBuilder::new(protocol, sink, self.reply)
    }
}
