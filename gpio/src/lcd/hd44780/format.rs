use std::fmt::{self, Write};

/// The most bytes a single formatted print puts on the display.
pub const MAX_FORMATTED_LEN: usize = 100;

/// A fixed-size buffer collecting formatted text.
///
/// Text that doesn't fit is dropped without an error. The cut never splits a UTF-8 character, and
/// once anything was dropped nothing else is appended, so the buffer always holds a prefix of the
/// complete output.
#[derive(Debug, Clone)]
pub struct FormatBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
    formatted: usize,
}

impl<const N: usize> FormatBuffer<N> {
    pub fn new() -> Self {
        FormatBuffer {
            buf: [0; N],
            len: 0,
            formatted: 0,
        }
    }

    /// Formats the arguments into a new buffer.
    pub fn format(args: fmt::Arguments<'_>) -> Result<Self, fmt::Error> {
        let mut buffer = Self::new();
        buffer.write_fmt(args)?;
        Ok(buffer)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the length the complete output would have had without the size limit.
    pub fn formatted_len(&self) -> usize {
        self.formatted
    }

    pub fn is_truncated(&self) -> bool {
        self.formatted > self.len
    }
}

impl<const N: usize> Default for FormatBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Write for FormatBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let truncated = self.is_truncated();
        self.formatted += s.len();
        if truncated {
            return Ok(());
        }

        let mut end = s.len().min(N - self.len);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf[self.len..self.len + end].copy_from_slice(&s.as_bytes()[..end]);
        self.len += end;
        Ok(())
    }
}

/// Outcome of a formatted print.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FormattedPrint {
    /// Length of the complete formatted text, including anything that didn't fit.
    pub formatted: usize,
    /// Bytes actually sent to the display.
    pub written: usize,
    /// Whether the formatted text was cut to [MAX_FORMATTED_LEN].
    pub truncated: bool,
}

impl FormattedPrint {
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}
