//! Block-level syntax tree produced by the block parser.
//!
//! Blocks keep their text raw: inline markup is only interpreted when a block
//! is rendered, because the reference table needed to resolve links is only
//! complete once the whole document has been scanned.
//!
//! - **Zero-copy where possible**: text is `Cow<'a, str>`, borrowed from the
//!   input when a block is a single source slice
//! - **Span-tracked**: every block records the source lines it consumed

use serde::Serialize;

use crate::refs::RefDefs;
use crate::span::Span;

/// Borrowed or owned string type for zero-copy parsing.
pub type CowStr<'a> = std::borrow::Cow<'a, str>;

/// A parsed markdown document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document<'a> {
    /// Front matter skipped at the top of the document, if any.
    pub front_matter: Option<FrontMatter<'a>>,
    /// Content blocks in document order.
    pub blocks: Vec<Block<'a>>,
    /// Link and image reference definitions.
    pub ref_defs: RefDefs,
    /// Source span covering the entire document.
    pub span: Span,
}

/// The `---` delimited region at the very start of a document.
///
/// It never renders; the entries are kept for callers that want the
/// chapter's metadata (title, tags and so on).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontMatter<'a> {
    /// Key-value entries in declaration order.
    pub entries: Vec<(CowStr<'a>, AttrValue<'a>)>,
    /// Text between the two fences.
    pub raw: CowStr<'a>,
    /// Source span including both fences.
    pub span: Span,
}

impl<'a> FrontMatter<'a> {
    /// Look up the first entry with the given key.
    pub fn get(&self, key: &str) -> Option<&AttrValue<'a>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Typed front matter values.
///
/// - Quoted strings → `Str`
/// - `true`/`false` → `Bool`
/// - Integers → `Int`
/// - Decimals → `Float`
/// - `[a, b, c]` → `List`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue<'a> {
    /// String value (quotes stripped).
    Str(CowStr<'a>),
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Nested list of values.
    List(Vec<AttrValue<'a>>),
}

/// Block-level nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block<'a> {
    /// Run of contiguous text lines, joined with single spaces.
    Paragraph(Paragraph<'a>),
    /// ATX or Setext heading.
    Heading(Heading<'a>),
    /// Fenced or indented code.
    CodeBlock(CodeBlock<'a>),
    /// Horizontal rule.
    ThematicBreak(Span),
    /// Ordered or unordered list, possibly with task items.
    List(List<'a>),
    /// Block quotation; its text is parsed again when rendered.
    Quote(Quote<'a>),
}

impl<'a> Block<'a> {
    /// Source span of the block.
    pub fn span(&self) -> Span {
        match self {
            Block::Paragraph(p) => p.span,
            Block::Heading(h) => h.span,
            Block::CodeBlock(c) => c.span,
            Block::ThematicBreak(span) => *span,
            Block::List(l) => l.span,
            Block::Quote(q) => q.span,
        }
    }

    /// Short type tag: `paragraph`, `heading`, `code_fenced`,
    /// `code_indented`, `hr`, `list` or `blockquote`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading(_) => "heading",
            Block::CodeBlock(CodeBlock {
                kind: CodeBlockKind::Fenced { .. },
                ..
            }) => "code_fenced",
            Block::CodeBlock(_) => "code_indented",
            Block::ThematicBreak(_) => "hr",
            Block::List(_) => "list",
            Block::Quote(_) => "blockquote",
        }
    }
}

/// Text paragraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph<'a> {
    /// Trimmed lines joined with a single space.
    pub text: CowStr<'a>,
    /// Source span.
    pub span: Span,
}

/// Section heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading<'a> {
    /// Heading level (1-6).
    pub level: u8,
    /// Raw inline text.
    pub text: CowStr<'a>,
    /// Source span.
    pub span: Span,
}

/// How a code block was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum CodeBlockKind<'a> {
    /// Delimited by backtick or tilde fences.
    Fenced {
        /// First word of the info string, possibly empty.
        lang: CowStr<'a>,
    },
    /// Indented by four spaces or a tab.
    Indented,
}

/// Code block content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeBlock<'a> {
    /// Fenced (with its language hint) or indented.
    pub kind: CodeBlockKind<'a>,
    /// Raw code, lines joined with `\n`.
    pub text: CowStr<'a>,
    /// Source span.
    pub span: Span,
}

impl<'a> CodeBlock<'a> {
    /// Language hint; empty for indented blocks and bare fences.
    pub fn lang(&self) -> &str {
        match &self.kind {
            CodeBlockKind::Fenced { lang } => lang,
            CodeBlockKind::Indented => "",
        }
    }
}

/// A list block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct List<'a> {
    /// Numbered (`1.`) rather than bulleted (`-`, `*`, `+`).
    pub ordered: bool,
    /// Number of the first item of an ordered list.
    pub start: Option<u64>,
    /// List items.
    pub items: Vec<ListItem<'a>>,
    /// Source span.
    pub span: Span,
}

impl<'a> List<'a> {
    /// True if any item carries a task checkbox.
    pub fn is_task_list(&self) -> bool {
        self.items.iter().any(|item| item.checked.is_some())
    }
}

/// A single list item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem<'a> {
    /// Item text; continuation lines are joined with `\n`.
    pub text: CowStr<'a>,
    /// `Some` only for task items (`[ ]`, `[x]`, `[X]`).
    pub checked: Option<bool>,
}

/// Block quotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote<'a> {
    /// Inner markdown with quote markers stripped.
    pub text: CowStr<'a>,
    /// Source span.
    pub span: Span,
}
