use std::fmt;
use std::fmt::{Debug, Display, Formatter};

use crate::exchange::error::{ExchangeError, Result};

/// Size of a greeting buffer in bytes, including the null terminator.
pub const MESSAGE_CAPACITY: usize = 100;

pub type Tag = i32;

/// Bounded text buffer which is sent over the wire as text followed by a single null byte.
///
/// All writes are checked against [`MESSAGE_CAPACITY`]. One byte is always reserved for the
/// terminator, so the longest text a buffer holds is `MESSAGE_CAPACITY - 1` bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct GreetingBuffer {
    bytes: [u8; MESSAGE_CAPACITY],
    len: usize,
}

impl GreetingBuffer {
    pub fn new() -> Self {
        GreetingBuffer {
            bytes: [0; MESSAGE_CAPACITY],
            len: 0,
        }
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut buffer = Self::new();
        buffer.push_str(text)?;
        Ok(buffer)
    }

    /// Appends `text`. Fails without modifying the buffer if the text and the terminator don't fit.
    pub fn push_str(&mut self, text: &str) -> Result<()> {
        let new_len = self.len + text.len();
        if new_len + 1 > MESSAGE_CAPACITY {
            return Err(ExchangeError::MessageTooLong {
                len: new_len + 1,
                capacity: MESSAGE_CAPACITY,
            });
        }
        self.bytes[self.len..new_len].copy_from_slice(text.as_bytes());
        self.bytes[new_len] = 0;
        self.len = new_len;
        Ok(())
    }

    /// Reads a payload received from process `from_rank`. The text ends at the first null byte or
    /// at the end of the payload, whichever comes first.
    pub fn from_wire(payload: &[u8], from_rank: u32) -> Result<Self> {
        if payload.len() > MESSAGE_CAPACITY {
            return Err(ExchangeError::Truncated {
                from_rank,
                len: payload.len(),
                capacity: MESSAGE_CAPACITY,
            });
        }

        let text_len = payload
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(payload.len());
        let text = std::str::from_utf8(&payload[..text_len])
            .map_err(|cause| ExchangeError::InvalidText { from_rank, cause })?;
        Self::from_text(text)
    }

    pub fn text(&self) -> &str {
        // only ever filled from &str, so this can't fail
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    /// Text bytes followed by the null terminator.
    pub fn to_wire(&self) -> &[u8] {
        &self.bytes[..self.wire_len()]
    }

    pub fn wire_len(&self) -> usize {
        self.len + 1
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for GreetingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for GreetingBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl Debug for GreetingBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreetingBuffer")
            .field("text", &self.text())
            .field("len", &self.len)
            .finish()
    }
}

/// What a receive operation reports about the message it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub source: u32,
    pub tag: Tag,
    pub len: usize,
}
