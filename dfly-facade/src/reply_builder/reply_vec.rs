//! Scatter-gather assembly for multi-part replies.
//!
//! Length prefixes, separators and small payloads are copied into one scratch buffer while large
//! payloads stay borrowed, so a whole array reply leaves through a single vectored write.

use std::ops::Range;

/// CRLF terminator shared by every grammar in this crate.
pub(crate) const CRLF: &[u8] = b"\r\n";

/// Stack-formatted `<symbol><decimal>\r\n` header such as `$5\r\n` or `*3\r\n`.
pub(crate) struct Header {
    buf: [u8; 24],
    len: usize,
}

impl Header {
    pub(crate) fn new<I: itoa::Integer>(symbol: u8, value: I) -> Self {
        let mut buf = [0_u8; 24];
        buf[0] = symbol;
        let mut digits = itoa::Buffer::new();
        let digits = digits.format(value).as_bytes();
        let end = 1 + digits.len();
        buf[1..end].copy_from_slice(digits);
        buf[end..end + 2].copy_from_slice(CRLF);
        Self { buf, len: end + 2 }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

enum Piece<'a> {
    Scratch(Range<usize>),
    Borrowed(&'a [u8]),
}

/// Ordered list of reply fragments.
pub(crate) struct ReplyVec<'a> {
    scratch: Vec<u8>,
    pieces: Vec<Piece<'a>>,
    inline_limit: usize,
}

impl<'a> ReplyVec<'a> {
    pub(crate) fn new(inline_limit: usize) -> Self {
        Self {
            scratch: Vec::new(),
            pieces: Vec::new(),
            inline_limit,
        }
    }

    /// Appends protocol bytes (copied).
    pub(crate) fn push_meta(&mut self, bytes: &[u8]) {
        let start = self.scratch.len();
        self.scratch.extend_from_slice(bytes);
        let end = self.scratch.len();
        if let Some(Piece::Scratch(range)) = self.pieces.last_mut()
            && range.end == start
        {
            range.end = end;
            return;
        }
        self.pieces.push(Piece::Scratch(start..end));
    }

    pub(crate) fn push_decimal<I: itoa::Integer>(&mut self, value: I) {
        let mut digits = itoa::Buffer::new();
        self.push_meta(digits.format(value).as_bytes());
    }

    pub(crate) fn push_header<I: itoa::Integer>(&mut self, symbol: u8, value: I) {
        self.push_meta(Header::new(symbol, value).as_bytes());
    }

    /// Appends payload bytes, borrowing them when larger than the inline limit.
    pub(crate) fn push_payload(&mut self, bytes: &'a [u8]) {
        if bytes.len() <= self.inline_limit {
            self.push_meta(bytes);
        } else {
            self.pieces.push(Piece::Borrowed(bytes));
        }
    }

    /// Appends `$<len>\r\n<payload>\r\n`.
    pub(crate) fn push_bulk(&mut self, payload: &'a [u8]) {
        self.push_header(b'$', payload.len());
        self.push_payload(payload);
        self.push_meta(CRLF);
    }

    /// Appends a bulk string whose payload does not outlive this call.
    pub(crate) fn push_bulk_copied(&mut self, payload: &[u8]) {
        self.push_header(b'$', payload.len());
        self.push_meta(payload);
        self.push_meta(CRLF);
    }

    /// Resolves fragments into the slice list handed to the sink.
    pub(crate) fn parts(&self) -> Vec<&[u8]> {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Scratch(range) => &self.scratch[range.clone()],
                Piece::Borrowed(bytes) => *bytes,
            })
            .collect()
    }
}
