//! Reply-path configuration shared by facade bootstrap code.

use crate::error::{DflyError, DflyResult};

/// Default byte budget for coalesced replies: unbounded, so batched and aggregated replies only
/// leave on an explicit flush.
pub const DEFAULT_MAX_BATCH_BYTES: usize = usize::MAX;

/// Default size up to which bulk payloads are copied next to their length prefix.
pub const DEFAULT_INLINE_PAYLOAD_LIMIT: usize = 32;

/// Tunables for per-connection reply builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyConfig {
    /// Upper bound of bytes held in the batch buffer while batching or aggregating.
    ///
    /// A reply that would push the buffer past this bound is written together with the pending
    /// buffer in one vectored sink call. Set a finite bound (Dragonfly uses 1024) to trade the
    /// single-write guarantee for bounded memory per connection.
    pub max_batch_bytes: usize,
    /// Bulk payloads up to this length are copied into the header scratch buffer instead of
    /// being referenced as a separate I/O slice.
    pub inline_payload_limit: usize,
}

impl ReplyConfig {
    /// Checks that the configuration can drive a reply builder.
    ///
    /// # Errors
    ///
    /// Returns `DflyError::InvalidConfig` when `max_batch_bytes` is zero.
    pub fn validate(&self) -> DflyResult<()> {
        if self.max_batch_bytes == 0 {
            return Err(DflyError::InvalidConfig("max_batch_bytes must be non-zero"));
        }
        Ok(())
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            inline_payload_limit: DEFAULT_INLINE_PAYLOAD_LIMIT,
        }
    }
}
