//! Request serializer used when this server talks to another instance as a client.
//!
//! Commands leave as RESP multi-bulk arrays, the same framing the server's own parser accepts,
//! so binary-safe arguments survive the hop (replication handshakes, script callbacks).

use std::io::{self, IoSlice};

use dfly_common::config::DEFAULT_INLINE_PAYLOAD_LIMIT;
use tracing::debug;

use crate::reply_builder::reply_vec::ReplyVec;
use crate::sink::Sink;

/// Writes outbound commands to one upstream connection.
#[derive(Debug)]
pub struct ReqSerializer<S> {
    sink: S,
    ec: Option<io::ErrorKind>,
}

impl<S: Sink> ReqSerializer<S> {
    /// Wraps the upstream connection's sink.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { sink, ec: None }
    }

    /// Sends a full command line such as `REPLCONF capa dragonfly`.
    ///
    /// Arguments are separated by ASCII whitespace. An empty line sends nothing. Only the
    /// command name is logged since arguments may carry credentials.
    pub fn send_command(&mut self, command: &str) {
        let args: Vec<&str> = command.split_ascii_whitespace().collect();
        debug!(
            name = args.first().copied().unwrap_or_default(),
            argc = args.len(),
            "sending command"
        );
        self.send_args(&args);
    }

    /// Sends a command given as separate, binary-safe arguments.
    pub fn send_args<T: AsRef<[u8]>>(&mut self, args: &[T]) {
        if args.is_empty() || self.ec.is_some() {
            return;
        }

        let mut request = ReplyVec::new(DEFAULT_INLINE_PAYLOAD_LIMIT);
        request.push_header(b'*', args.len());
        for arg in args {
            request.push_bulk(arg.as_ref());
        }
        let parts = request.parts();
        let slices: Vec<IoSlice<'_>> = parts.iter().map(|part| IoSlice::new(part)).collect();
        if let Err(error) = self.sink.write_vectored(&slices) {
            debug!(%error, "error writing request");
            self.ec = Some(error.kind());
        }
    }

    /// Sticky write error, if any.
    #[must_use]
    pub fn ec(&self) -> Option<io::ErrorKind> {
        self.ec
    }

    /// Returns the underlying sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
