//! Diagnostics for degraded input.
//!
//! Parsing never fails. When input is malformed the parser falls back to
//! literal text and records a recoverable `ParseError` describing what it did.

use serde::Serialize;
use thiserror::Error;

use crate::span::Span;

/// Error kinds for categorizing parse diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// Fenced code block without a closing fence; it runs to end of input.
    UnclosedFence,
    /// Opening `---` with no closing fence; treated as ordinary content.
    UnclosedFrontMatter,
}

/// A parse diagnostic with location.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}{}", span_suffix(.span))]
pub struct ParseError {
    /// Human-readable message
    pub message: String,
    /// Source location where the problem starts
    pub span: Option<Span>,
    /// Error categorization
    pub kind: ParseErrorKind,
}

fn span_suffix(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" at bytes {}..{}", span.start, span.end),
        None => String::new(),
    }
}

impl ParseError {
    /// Fenced code block opened with `fence` never closed.
    pub fn unclosed_fence(fence: &str, span: Option<Span>) -> Self {
        Self {
            message: format!("unclosed code fence `{}`", fence),
            span,
            kind: ParseErrorKind::UnclosedFence,
        }
    }

    /// Front matter opened but never closed.
    pub fn unclosed_front_matter(span: Option<Span>) -> Self {
        Self {
            message: "unclosed front matter".to_string(),
            span,
            kind: ParseErrorKind::UnclosedFrontMatter,
        }
    }
}

/// Diagnostics collected while parsing, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    /// Check whether any diagnostic has the given kind.
    pub fn contains_kind(&self, kind: ParseErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
