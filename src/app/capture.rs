//! Bounded capture log for the current session.
//!
//! A fixed region of `C` bytes allocated once at boot.  Reports are
//! appended in order; one byte is always kept back for the terminator, so
//! the used length never exceeds `C - 1`.  When a report does not fit, the
//! part that does is kept byte-for-byte and the rest is dropped.

use std::borrow::Cow;

/// Marker written by [`CaptureBuffer::clear`].
pub const CLEARED_MARKER: &str = "--- history cleared ---\n";

/// Result of one [`CaptureBuffer::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The whole text was stored.
    Accepted,
    /// Only the first `kept` bytes fit.
    Truncated { kept: usize, dropped: usize },
    /// The buffer was already full; nothing was stored.
    Rejected { dropped: usize },
}

impl AppendOutcome {
    /// `true` if any input byte was dropped.
    pub fn lost_data(self) -> bool {
        !matches!(self, Self::Accepted)
    }
}

pub struct CaptureBuffer {
    region: Box<[u8]>,
    len: usize,
    truncated: bool,
}

impl CaptureBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            region: vec![0u8; capacity.max(1)].into_boxed_slice(),
            len: 0,
            truncated: false,
        }
    }

    /// Total region size `C`, including the terminator byte.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Current length `L`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes still available before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity() - 1 - self.len
    }

    /// `true` if any append since the last reset lost data.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// The accepted bytes, without the terminator.
    pub fn contents(&self) -> &[u8] {
        &self.region[..self.len]
    }

    /// The accepted bytes as text.  A report cut inside a multi-byte
    /// character ends with a replacement character.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.contents())
    }

    pub fn append(&mut self, text: &str) -> AppendOutcome {
        self.append_bytes(text.as_bytes())
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> AppendOutcome {
        let cap = self.capacity();
        if self.len + bytes.len() < cap {
            self.region[self.len..self.len + bytes.len()].copy_from_slice(bytes);
            self.len += bytes.len();
            self.region[self.len] = 0;
            return AppendOutcome::Accepted;
        }

        self.truncated = true;
        let room = self.remaining();
        if room == 0 {
            return AppendOutcome::Rejected {
                dropped: bytes.len(),
            };
        }

        self.region[self.len..self.len + room].copy_from_slice(&bytes[..room]);
        self.len += room;
        self.region[self.len] = 0;
        AppendOutcome::Truncated {
            kept: room,
            dropped: bytes.len() - room,
        }
    }

    /// Zero the whole region and drop back to `L == 0`.
    pub fn reset(&mut self) {
        self.region.fill(0);
        self.len = 0;
        self.truncated = false;
    }

    /// Reset, then record [`CLEARED_MARKER`] so a later export of a
    /// cleared session is distinguishable from an empty one.
    pub fn clear(&mut self) {
        self.reset();
        let _ = self.append(CLEARED_MARKER);
    }
}
