//! Scratch buffer for in-progress parser tokens.
//!
//! The streaming parser in [`crate::parser`] is fed arbitrarily sized byte
//! slices and must be able to resume a partially consumed token (a header
//! field, an SD name, an SD value) across `feed` calls. [`ByteAccumulator`]
//! is the small owned buffer that holds those in-progress bytes between
//! calls, mirroring the read/write position bookkeeping the teacher's
//! `parser::read_buffer::ReadBuffer` uses for its double-buffered socket
//! reads, but simplified to a single append-only scratch area since the
//! parser here consumes already-read slices rather than driving the socket
//! read itself.

use crate::parser::ParseError;

/// Maximum size of the in-progress token buffer: the largest header field
/// maximum (255, for `hostname`) plus headroom for SD value escape scratch.
pub const MAX_TOKEN_LEN: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct ByteAccumulator {
    buf: Vec<u8>,
}

impl ByteAccumulator {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends `bytes`, failing if the accumulated length would exceed
    /// [`MAX_TOKEN_LEN`].
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        if self.buf.len() + bytes.len() > MAX_TOKEN_LEN {
            return Err(ParseError::InternalBufferOverflow);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Takes ownership of the accumulated bytes, leaving the accumulator
    /// empty and ready for the next token.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}
