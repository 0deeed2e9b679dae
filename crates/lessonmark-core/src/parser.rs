//! Line-oriented block parser.
//!
//! A single forward scan over the input lines. At each position the rules in
//! [`BLOCK_RULES`] are tried in order; the first one that matches says how
//! many lines it consumed and what it produced. Nothing here fails: input
//! that no rule recognizes ends up as paragraph text.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{
    AttrValue, Block, CodeBlock, CodeBlockKind, CowStr, Document, FrontMatter, Heading, List,
    ListItem, Paragraph, Quote,
};
use crate::error::{ParseError, ParseErrors};
use crate::lexer::{Cursor, Lexer, Line};
use crate::refs::{RefDef, RefDefs};
use crate::span::Span;

/// Result of a parse that also reports diagnostics.
#[derive(Debug)]
pub struct ParseResult<'a> {
    /// The parsed document.
    pub document: Document<'a>,
    /// Degraded constructs encountered while parsing.
    pub errors: ParseErrors,
}

impl<'a> ParseResult<'a> {
    /// Check if parsing completed without diagnostics.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse markdown into blocks and reference definitions.
///
/// ```rust
/// use lessonmark_core::parse_blocks;
///
/// let doc = parse_blocks("# Title\n\nSome text.\n\n[home]: /index.html");
/// assert_eq!(doc.blocks.len(), 2);
/// assert!(doc.ref_defs.get("HOME").is_some());
/// ```
pub fn parse_blocks(markdown: &str) -> Document<'_> {
    Parser::new().parse(markdown)
}

/// Block parser.
#[derive(Debug, Clone)]
pub struct Parser {
    front_matter: bool,
    errors: ParseErrors,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    #[inline]
    pub fn new() -> Self {
        Self {
            front_matter: true,
            errors: ParseErrors::new(),
        }
    }

    /// Enable or disable front matter detection (enabled by default).
    pub fn with_front_matter(mut self, enabled: bool) -> Self {
        self.front_matter = enabled;
        self
    }

    /// Parse the input. Never fails.
    pub fn parse<'a>(&mut self, input: &'a str) -> Document<'a> {
        self.parse_with_recovery(input).document
    }

    /// Parse the input, returning the document with any diagnostics.
    pub fn parse_with_recovery<'a>(&mut self, input: &'a str) -> ParseResult<'a> {
        self.errors = ParseErrors::new();
        let document = self.parse_internal(input);
        ParseResult {
            document,
            errors: std::mem::take(&mut self.errors),
        }
    }

    fn parse_internal<'a>(&mut self, input: &'a str) -> Document<'a> {
        let lines = Lexer::new(input).lines();

        let (front_matter, start) = if self.front_matter {
            self.parse_front_matter(&lines, input)
        } else {
            (None, 0)
        };

        let mut cursor = Cursor::new(&lines, start);
        let mut blocks = Vec::with_capacity(16);
        let mut ref_defs = RefDefs::new();
        let mut pending = PendingParagraph::default();

        while !cursor.is_eof() {
            let Some((name, matched)) = BLOCK_RULES
                .iter()
                .find_map(|(name, rule)| rule(&cursor).map(|m| (*name, m)))
            else {
                // the paragraph rule accepts any line
                break;
            };
            log::trace!("{} at line {}", name, cursor.position());

            if let Some(error) = matched.diagnostic {
                log::debug!("{}", error);
                self.errors.push(error);
            }

            match matched.step {
                Step::Emit(block) => {
                    pending.flush(&mut blocks);
                    blocks.push(block);
                }
                Step::Define { label, def } => ref_defs.insert(label, def),
                Step::Blank => pending.flush(&mut blocks),
                Step::Text(text, span) => pending.push(text, span),
            }

            cursor.advance(matched.consumed.max(1));
        }
        pending.flush(&mut blocks);

        log::debug!(
            "parsed {} blocks and {} reference definitions from {} lines",
            blocks.len(),
            ref_defs.len(),
            lines.len()
        );

        Document {
            front_matter,
            blocks,
            ref_defs,
            span: Span::from_offsets(0, input.len()),
        }
    }

    /// Detect `---` ... `---` at the very first line.
    ///
    /// Returns the front matter and the index of the first content line.
    fn parse_front_matter<'a>(
        &mut self,
        lines: &[Line<'a>],
        input: &'a str,
    ) -> (Option<FrontMatter<'a>>, usize) {
        let Some(first) = lines.first() else {
            return (None, 0);
        };
        if first.trimmed() != "---" {
            return (None, 0);
        }

        let Some(close) = lines.iter().skip(1).position(|l| l.trimmed() == "---") else {
            self.errors
                .push(ParseError::unclosed_front_matter(Some(first.span)));
            return (None, 0);
        };
        let close = close + 1;

        let body = &lines[1..close];
        let raw = match (body.first(), body.last()) {
            (Some(a), Some(b)) => input
                .get(a.span.start as usize..b.span.end as usize)
                .unwrap_or(""),
            _ => "",
        };

        let entries = body
            .iter()
            .filter_map(|line| {
                let (key, value) = line.text.split_once(':')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((Cow::Borrowed(key), parse_attr_value(value.trim())))
            })
            .collect();

        let front_matter = FrontMatter {
            entries,
            raw: Cow::Borrowed(raw),
            span: first.span.merge(lines[close].span),
        };
        (Some(front_matter), close + 1)
    }
}

fn parse_attr_value(s: &str) -> AttrValue<'_> {
    if s == "true" {
        return AttrValue::Bool(true);
    }
    if s == "false" {
        return AttrValue::Bool(false);
    }

    if s.len() >= 2 && s.starts_with('[') && s.ends_with(']') {
        return AttrValue::List(parse_list_values(&s[1..s.len() - 1]));
    }

    if let Ok(i) = s.parse::<i64>() {
        return AttrValue::Int(i);
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return AttrValue::Float(f);
        }
    }

    let unquoted = if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    };

    AttrValue::Str(Cow::Borrowed(unquoted))
}

fn parse_list_values(s: &str) -> Vec<AttrValue<'_>> {
    let mut items = Vec::with_capacity(4);
    let mut start = 0;
    // the quote character that opened the current value, if any
    let mut open_quote: Option<u8> = None;

    for (i, b) in s.bytes().enumerate() {
        match (b, open_quote) {
            (b'"' | b'\'', None) => open_quote = Some(b),
            (_, Some(q)) if b == q => open_quote = None,
            (b',', None) => {
                let item = s[start..i].trim();
                if !item.is_empty() {
                    items.push(parse_attr_value(item));
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    let item = s[start..].trim();
    if !item.is_empty() {
        items.push(parse_attr_value(item));
    }

    items
}

// =============================================================================
// Block rules
// =============================================================================

/// What a rule produced for the lines it consumed.
enum Step<'a> {
    /// A finished block; flushes any pending paragraph first.
    Emit(Block<'a>),
    /// A reference definition; leaves the pending paragraph open.
    Define { label: &'a str, def: RefDef },
    /// Blank line; ends the pending paragraph.
    Blank,
    /// Trimmed text to append to the pending paragraph.
    Text(&'a str, Span),
}

struct Matched<'a> {
    step: Step<'a>,
    consumed: usize,
    diagnostic: Option<ParseError>,
}

impl<'a> Matched<'a> {
    fn new(step: Step<'a>, consumed: usize) -> Self {
        Self {
            step,
            consumed,
            diagnostic: None,
        }
    }
}

type BlockRule = for<'c, 's, 'a> fn(&'c Cursor<'s, 'a>) -> Option<Matched<'a>>;

/// Rules in precedence order. The first match wins.
const BLOCK_RULES: &[(&str, BlockRule)] = &[
    ("reference_definition", match_reference_definition),
    ("fenced_code", match_fenced_code),
    ("thematic_break", match_thematic_break),
    ("setext_heading", match_setext_heading),
    ("atx_heading", match_atx_heading),
    ("blockquote", match_blockquote),
    ("list", match_list),
    ("indented_code", match_indented_code),
    ("blank", match_blank),
    ("paragraph", match_paragraph_text),
];

fn re_reference_definition() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^ {0,3}\[([^\]]+)\]:\s+(\S+)(?:\s+("([^"]*)"|'([^']*)'|\(([^)]*)\)))?\s*$"#,
        )
        .unwrap()
    })
}

fn re_fence_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})([^`]*)$").unwrap())
}

fn re_backtick_fence_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}`{3,}\s*$").unwrap())
}

fn re_tilde_fence_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}~{3,}\s*$").unwrap())
}

fn re_setext_underline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(=+|-+)\s*$").unwrap())
}

fn re_atx_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(#{1,6})\s+(.+?)\s*#*\s*$").unwrap())
}

fn re_unordered_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}[*+-] +(.+)$").unwrap())
}

fn re_ordered_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}([0-9]+)\. +(.+)$").unwrap())
}

fn re_list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(?:[*+-]|[0-9]+\.) +").unwrap())
}

fn re_task_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[( |x|X)\] +(.*)$").unwrap())
}

fn re_indented_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?: {4}|\t)(.*)$").unwrap())
}

fn capture<'a>(caps: &regex::Captures<'a>, i: usize) -> &'a str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn match_reference_definition<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let line = cursor.peek()?;
    let caps = re_reference_definition().captures(line.text)?;
    let title = [4, 5, 6]
        .into_iter()
        .map(|i| capture(&caps, i))
        .find(|t| !t.is_empty())
        .unwrap_or("");
    let def = RefDef::new(capture(&caps, 2), title);
    Some(Matched::new(
        Step::Define {
            label: capture(&caps, 1),
            def,
        },
        1,
    ))
}

fn match_fenced_code<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let open = cursor.peek()?;
    let caps = re_fence_open().captures(open.text)?;
    let fence = capture(&caps, 1);
    let lang = capture(&caps, 2).split_whitespace().next().unwrap_or("");
    let close = if fence.starts_with('`') {
        re_backtick_fence_close()
    } else {
        re_tilde_fence_close()
    };

    let rest = &cursor.rest()[1..];
    let body_len = rest
        .iter()
        .position(|l| close.is_match(l.text))
        .unwrap_or(rest.len());
    let body = &rest[..body_len];
    let closed = body_len < rest.len();

    let consumed = 1 + body_len + usize::from(closed);
    let last = if closed { &rest[body_len] } else { body.last().unwrap_or(open) };

    let block = Block::CodeBlock(CodeBlock {
        kind: CodeBlockKind::Fenced {
            lang: Cow::Borrowed(lang),
        },
        text: join_lines(body.iter().map(|l| l.text)),
        span: open.span.merge(last.span),
    });

    let mut matched = Matched::new(Step::Emit(block), consumed);
    if !closed {
        matched.diagnostic = Some(ParseError::unclosed_fence(fence, Some(open.span)));
    }
    Some(matched)
}

fn match_thematic_break<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let line = cursor.peek()?;
    is_thematic_break(line.text)
        .then(|| Matched::new(Step::Emit(Block::ThematicBreak(line.span)), 1))
}

/// Three or more of one of `*`, `_`, `-`, optionally separated by spaces,
/// after at most three spaces of indentation.
fn is_thematic_break(text: &str) -> bool {
    let body = strip_up_to_three_spaces(text).trim_end();
    let marker = match body.bytes().next() {
        Some(b @ (b'*' | b'_' | b'-')) => b,
        _ => return false,
    };

    let mut count = 0;
    for b in body.bytes() {
        match b {
            b' ' => {}
            _ if b == marker => count += 1,
            _ => return false,
        }
    }
    count >= 3
}

fn strip_up_to_three_spaces(line: &str) -> &str {
    let indent = line.bytes().take(3).take_while(|&b| b == b' ').count();
    &line[indent..]
}

fn match_setext_heading<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let line = cursor.peek()?;
    let underline = cursor.peek_at(1)?;
    if line.is_blank() || strip_up_to_three_spaces(line.text).starts_with('#') {
        return None;
    }
    let caps = re_setext_underline().captures(underline.text)?;
    let level = if capture(&caps, 1).starts_with('=') { 1 } else { 2 };

    let block = Block::Heading(Heading {
        level,
        text: Cow::Borrowed(line.trimmed()),
        span: line.span.merge(underline.span),
    });
    Some(Matched::new(Step::Emit(block), 2))
}

fn match_atx_heading<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let line = cursor.peek()?;
    let caps = re_atx_heading().captures(line.text)?;
    let block = Block::Heading(Heading {
        level: capture(&caps, 1).len() as u8,
        text: Cow::Borrowed(capture(&caps, 2)),
        span: line.span,
    });
    Some(Matched::new(Step::Emit(block), 1))
}

fn match_blockquote<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let rest = cursor.rest();
    let first = rest.first()?;
    let mut quoted = vec![strip_quote_marker(first.text)?];
    let mut last = first;
    for line in &rest[1..] {
        if let Some(text) = strip_quote_marker(line.text) {
            quoted.push(text);
        } else if line.is_blank() {
            quoted.push("");
        } else {
            break;
        }
        last = line;
    }

    let consumed = quoted.len();
    let block = Block::Quote(Quote {
        text: join_lines(quoted.into_iter()),
        span: first.span.merge(last.span),
    });
    Some(Matched::new(Step::Emit(block), consumed))
}

/// Strip a `>` marker, after at most three spaces, and one optional space.
fn strip_quote_marker(text: &str) -> Option<&str> {
    let rest = strip_up_to_three_spaces(text).strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn match_list<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let rest = cursor.rest();
    let first = rest.first()?;

    let ordered = if re_unordered_item().is_match(first.text) {
        false
    } else if re_ordered_item().is_match(first.text) {
        true
    } else {
        return None;
    };
    let item_re = if ordered {
        re_ordered_item()
    } else {
        re_unordered_item()
    };
    let text_group = if ordered { 2 } else { 1 };

    let start = if ordered {
        item_re
            .captures(first.text)
            .and_then(|caps| capture(&caps, 1).parse::<u64>().ok())
    } else {
        None
    };

    let mut items = Vec::with_capacity(4);
    let mut last = first;
    let mut j = 0;

    while let Some(line) = rest.get(j) {
        let Some(caps) = item_re.captures(line.text) else {
            break;
        };
        let (text, checked) = split_task(capture(&caps, text_group));
        let mut item_lines = vec![text];
        last = line;
        j += 1;

        while let Some(cont) = rest.get(j) {
            if !is_continuation(cont.text) {
                break;
            }
            item_lines.push(&cont.text[2..]);
            last = cont;
            j += 1;
        }

        items.push(ListItem {
            text: join_lines(item_lines.into_iter()),
            checked,
        });
    }

    let block = Block::List(List {
        ordered,
        start,
        items,
        span: first.span.merge(last.span),
    });
    Some(Matched::new(Step::Emit(block), j))
}

/// Indented by two or more spaces and not itself a list item.
fn is_continuation(text: &str) -> bool {
    text.starts_with("  ") && !re_list_marker().is_match(text)
}

/// Split a `[ ]` / `[x]` task prefix off an item's first line.
fn split_task(text: &str) -> (&str, Option<bool>) {
    match re_task_prefix().captures(text) {
        Some(caps) => {
            let checked = capture(&caps, 1).eq_ignore_ascii_case("x");
            (capture(&caps, 2), Some(checked))
        }
        None => (text, None),
    }
}

fn match_indented_code<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let rest = cursor.rest();
    let code: Vec<(&Line<'a>, &'a str)> = rest
        .iter()
        .map_while(|line| {
            re_indented_code()
                .captures(line.text)
                .map(|caps| (line, capture(&caps, 1)))
        })
        .collect();
    let (first, _) = code.first()?;
    let (last, _) = code.last()?;

    let block = Block::CodeBlock(CodeBlock {
        kind: CodeBlockKind::Indented,
        text: join_lines(code.iter().map(|(_, text)| *text)),
        span: first.span.merge(last.span),
    });
    Some(Matched::new(Step::Emit(block), code.len()))
}

fn match_blank<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let line = cursor.peek()?;
    line.is_blank().then(|| Matched::new(Step::Blank, 1))
}

fn match_paragraph_text<'a>(cursor: &Cursor<'_, 'a>) -> Option<Matched<'a>> {
    let line = cursor.peek()?;
    Some(Matched::new(Step::Text(line.trimmed(), line.span), 1))
}

/// Join lines with `\n`, borrowing when there is only one.
fn join_lines<'a>(mut lines: impl Iterator<Item = &'a str>) -> CowStr<'a> {
    let Some(first) = lines.next() else {
        return Cow::Borrowed("");
    };
    let mut joined: CowStr<'a> = Cow::Borrowed(first);
    for line in lines {
        let buf = joined.to_mut();
        buf.push('\n');
        buf.push_str(line);
    }
    joined
}

/// Paragraph text accumulated across lines until a blank line or block.
#[derive(Default)]
struct PendingParagraph<'a> {
    text: Option<CowStr<'a>>,
    span: Option<Span>,
}

impl<'a> PendingParagraph<'a> {
    fn push(&mut self, line: &'a str, span: Span) {
        match &mut self.text {
            Some(text) => {
                let buf = text.to_mut();
                buf.push(' ');
                buf.push_str(line);
            }
            None => self.text = Some(Cow::Borrowed(line)),
        }
        self.span = Some(self.span.map_or(span, |s| s.merge(span)));
    }

    fn flush(&mut self, blocks: &mut Vec<Block<'a>>) {
        let (Some(text), Some(span)) = (self.text.take(), self.span.take()) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        blocks.push(Block::Paragraph(Paragraph { text, span }));
    }
}
