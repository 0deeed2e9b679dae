//! # Lessonmark Core
//!
//! Markdown to HTML for course theory, quiz prompts, assignment text and
//! tutor chat messages.
//!
//! Rendering is a two-pass compile: a line-oriented block parser produces
//! typed blocks plus a table of link reference definitions, then each block
//! is rendered to HTML, running its text through the inline renderer.
//! Rendering is total: any string renders, malformed markup degrades to
//! escaped literal text.
//!
//! ## Quick Start
//!
//! ```rust
//! use lessonmark_core::render_markdown_to_html;
//!
//! let html = render_markdown_to_html("# Hello\n\nSome **bold** text.");
//! assert_eq!(
//!     html,
//!     "<div class=\"markdown-body\"><h1>Hello</h1>\n<p>Some <strong>bold</strong> text.</p></div>"
//! );
//! ```
//!
//! ## Code blocks
//!
//! Code blocks carry `data-language` and `data-ace-mode` attributes that the
//! host page reads to upgrade them into editors:
//!
//! ```rust
//! use lessonmark_core::render_markdown_to_html;
//!
//! let html = render_markdown_to_html("```python\nprint(1)\n```");
//! assert!(html.contains(r#"data-ace-mode="ace/mode/python""#));
//! ```
//!
//! ## Diagnostics
//!
//! ```rust
//! use lessonmark_core::Parser;
//!
//! let result = Parser::new().parse_with_recovery("```\nnever closed");
//! assert_eq!(result.document.blocks.len(), 1);
//! assert_eq!(result.errors.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod escape;
pub mod inline;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod refs;
pub mod render;
pub mod span;

pub use ast::{Block, Document};
pub use error::{ParseError, ParseErrorKind, ParseErrors};
pub use options::RenderOptions;
pub use parser::{parse_blocks, ParseResult, Parser};
pub use refs::{RefDef, RefDefs};
pub use render::{render_blocks, render_markdown_inner, Renderer};

/// Render markdown to HTML wrapped in `<div class="markdown-body">`.
///
/// Never fails; empty input gives an empty wrapper.
pub fn render_markdown_to_html(markdown: &str) -> String {
    Renderer::default().render(markdown)
}
