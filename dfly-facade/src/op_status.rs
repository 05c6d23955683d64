//! Operation status codes and error-reply values handed to reply builders.

use std::borrow::Cow;

/// Generic syntax error message.
pub const SYNTAX_ERR: &str = "syntax error";
/// Error-type label used for [`SYNTAX_ERR`].
pub const SYNTAX_ERR_TYPE: &str = "syntax_error";
/// Error-type label used for malformed requests.
pub const PROTOCOL_ERR_TYPE: &str = "protocol_error";
/// Fallback message for statuses without a client-facing text.
pub const INTERNAL_ERR: &str = "Internal error";

/// Outcome of executing one command against the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpStatus {
    /// Operation succeeded.
    Ok,
    /// Key already exists.
    KeyExists,
    /// Key does not exist.
    KeyNotFound,
    /// Operation was skipped (e.g. `SET NX` on an existing key).
    Skipped,
    /// Value has an unexpected shape.
    InvalidValue,
    /// Index or range outside of the value bounds.
    OutOfRange,
    /// Key holds a value of another type.
    WrongType,
    /// Operation did not finish in time.
    TimedOut,
    /// Memory limit reached.
    OutOfMemory,
    /// Argument is not a valid float.
    InvalidFloat,
    /// Argument is not a valid integer.
    InvalidInt,
    /// Command arguments are malformed.
    SyntaxErr,
    /// Stream consumer group already exists.
    BusyGroup,
    /// Stream id is not greater than the stream top item.
    StreamIdSmall,
    /// Arithmetic produced NaN or infinity.
    InvalidNumericResult,
    /// Operation was cancelled before completion.
    Cancelled,
}

impl OpStatus {
    /// Returns the client-facing error text for this status.
    ///
    /// Texts starting with `-` are already prefixed with their Redis error code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::KeyNotFound => "no such key",
            Self::WrongType => "-WRONGTYPE Operation against a key holding the wrong kind of value",
            Self::OutOfRange => "index out of range",
            Self::InvalidFloat => "value is not a valid float",
            Self::InvalidInt => "value is not an integer or out of range",
            Self::SyntaxErr => SYNTAX_ERR,
            Self::OutOfMemory => "Out of memory",
            Self::BusyGroup => "-BUSYGROUP Consumer Group name already exists",
            Self::StreamIdSmall => {
                "The ID specified in XADD is equal or smaller than the target stream top item"
            }
            Self::InvalidNumericResult => "increment would produce NaN or Infinity",
            Self::TimedOut => "timed out",
            Self::KeyExists
            | Self::Skipped
            | Self::InvalidValue
            | Self::Cancelled => INTERNAL_ERR,
        }
    }
}

/// Error reply produced by command execution.
///
/// Either carries an explicit message (with an optional error-type label used for statistics)
/// or defers to an [`OpStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReply {
    /// Client-facing message.
    pub message: Cow<'static, str>,
    /// Error-type label; empty means "derive from message".
    pub kind: Cow<'static, str>,
    /// Status that takes precedence over `message` when present.
    pub status: Option<OpStatus>,
}

impl ErrorReply {
    /// Creates an error reply with a message and no explicit label.
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            kind: Cow::Borrowed(""),
            status: None,
        }
    }

    /// Sets the error-type label.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<Cow<'static, str>>) -> Self {
        self.kind = kind.into();
        self
    }
}

impl From<OpStatus> for ErrorReply {
    fn from(status: OpStatus) -> Self {
        Self {
            message: Cow::Borrowed(""),
            kind: Cow::Borrowed(""),
            status: Some(status),
        }
    }
}

/// Resolves the error-type label under which an error reply is counted.
pub(crate) fn error_kind_label<'a>(message: &'a str, kind: &'a str) -> &'a str {
    if !kind.is_empty() {
        return kind;
    }
    if message == SYNTAX_ERR {
        return SYNTAX_ERR_TYPE;
    }
    message
}
