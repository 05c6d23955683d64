//! Client wire protocols served by the facade.

/// Supported client wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProtocol {
    /// Redis RESP protocol family.
    Resp,
    /// Memcached text protocol.
    Memcache,
}

impl ClientProtocol {
    /// Label used in logs and per-protocol stats.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resp => "resp",
            Self::Memcache => "memcache",
        }
    }
}
