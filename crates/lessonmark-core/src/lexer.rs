//! Line splitting and the scan cursor used by the block parser.
//!
//! The lexer splits input into lines on `\n`, dropping a `\r` that directly
//! precedes it. It uses `memchr` for newline detection (SIMD on supported
//! platforms) and never copies: lines borrow from the input.

use crate::span::Span;
use memchr::memchr;

/// A single line from the input with its source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line text (without trailing newline).
    pub text: &'a str,
    /// Byte span in the original input.
    pub span: Span,
}

impl<'a> Line<'a> {
    /// Check if this line contains only whitespace.
    #[inline(always)]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Get the line text with leading/trailing whitespace removed.
    #[inline(always)]
    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }
}

/// Line-based lexer for the block parser.
pub struct Lexer<'a> {
    /// The complete input text.
    input: &'a str,
    /// Input as bytes for efficient scanning.
    bytes: &'a [u8],
    /// Current byte offset.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
        }
    }

    /// Split the whole input into lines.
    pub fn lines(mut self) -> Vec<Line<'a>> {
        let mut lines = Vec::with_capacity(self.bytes.len() / 32 + 1);
        while let Some(line) = self.read_line() {
            lines.push(line);
        }
        lines
    }

    /// Read the next line from input.
    #[inline(always)]
    fn read_line(&mut self) -> Option<Line<'a>> {
        if self.offset >= self.bytes.len() {
            return None;
        }

        let start = self.offset;

        let end = match memchr(b'\n', &self.bytes[start..]) {
            Some(pos) => start + pos,
            None => self.bytes.len(),
        };

        // CRLF: drop the CR directly before the newline
        let text_end = if end > start && end < self.bytes.len() && self.bytes[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };

        self.offset = if end < self.bytes.len() { end + 1 } else { end };

        Some(Line {
            // SAFETY: `start` is 0 or one past a `\n`, and `text_end` is at a `\r`, a `\n`
            // or the end of input. Both bytes are ASCII, so both offsets sit on UTF-8
            // char boundaries of `input`.
            text: unsafe { self.input.get_unchecked(start..text_end) },
            span: Span::from_offsets(start, text_end),
        })
    }
}

/// Explicit scan position over a slice of lines.
///
/// Block rules look at the line under the cursor (and ahead of it) without
/// moving; the parser advances by however many lines a rule consumed.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'s, 'a> {
    lines: &'s [Line<'a>],
    pos: usize,
}

impl<'s, 'a> Cursor<'s, 'a> {
    /// Create a cursor positioned at `pos`.
    #[inline]
    pub fn new(lines: &'s [Line<'a>], pos: usize) -> Self {
        Self { lines, pos }
    }

    /// Index of the line under the cursor.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once every line has been consumed.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// The line under the cursor.
    #[inline]
    pub fn peek(&self) -> Option<&'s Line<'a>> {
        self.lines.get(self.pos)
    }

    /// The line `offset` lines after the one under the cursor.
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<&'s Line<'a>> {
        self.lines.get(self.pos + offset)
    }

    /// Lines from the cursor to the end of input.
    #[inline]
    pub fn rest(&self) -> &'s [Line<'a>] {
        self.lines.get(self.pos..).unwrap_or(&[])
    }

    /// Move forward by `n` lines.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.lines.len());
    }
}
