//! Inline renderer: code spans, links, images and emphasis to HTML.
//!
//! Rendering runs in two phases. Code spans are found first by a left to
//! right scan over backtick runs, so nothing inside them is interpreted.
//! The text between code spans is escaped and pushed through
//! [`INLINE_RULES`], an ordered list of regex substitutions.
//!
//! Links and images produce markup with attributes. That markup is parked
//! behind a placeholder while the remaining rules run and put back at the end,
//! so emphasis rules only ever see text. `**[a](b)**` still becomes a strong
//! element around the link because the placeholder sits between the markers.

use std::sync::OnceLock;

use html_escape::decode_html_entities;
use memchr::memchr;
use regex::{Captures, Regex};

use crate::escape::{escape_html, escape_html_attr};
use crate::refs::{RefDef, RefDefs};

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// Render inline markdown, code spans included.
///
/// ```rust
/// use lessonmark_core::{inline::render_inline, RefDefs};
///
/// let html = render_inline("use `a < b` **here**", &RefDefs::new());
/// assert_eq!(html, "use <code>a &lt; b</code> <strong>here</strong>");
/// ```
pub fn render_inline(text: &str, refs: &RefDefs) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'`' {
            let end = memchr(b'`', &bytes[pos..]).map_or(bytes.len(), |off| pos + off);
            out.push_str(&render_inline_no_code(&text[pos..end], refs));
            pos = end;
            continue;
        }

        let run = backtick_run(bytes, pos);
        let body_start = pos + run;
        let Some(close) = find_closing_run(bytes, body_start, run) else {
            // unterminated: the rest is literal text
            out.push_str(&escape_html(&text[pos..]));
            break;
        };

        out.push_str("<code>");
        out.push_str(&escape_html(trim_one_space(&text[body_start..close])));
        out.push_str("</code>");
        pos = close + run;
    }

    out
}

/// Render inline markup other than code spans.
pub fn render_inline_no_code(text: &str, refs: &RefDefs) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut stage = Stage::new(refs);
    let html = stage.run(&neutralize_placeholders(&escape_html(text)));
    stage.restore(&html)
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|&&b| b == b'`').count()
}

/// Start of the next backtick run of exactly `len`, skipping runs of any
/// other length.
fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(off) = memchr(b'`', &bytes[pos..]) {
        let start = pos + off;
        let run = backtick_run(bytes, start);
        if run == len {
            return Some(start);
        }
        pos = start + run;
    }
    None
}

/// Drop at most one leading and one trailing space.
fn trim_one_space(code: &str) -> &str {
    let code = code.strip_prefix(' ').unwrap_or(code);
    code.strip_suffix(' ').unwrap_or(code)
}

/// Input that already contains placeholder characters is emitted as
/// character references so it cannot be mistaken for a parked fragment.
fn neutralize_placeholders(escaped: &str) -> String {
    if !escaped.contains(|c: char| c == PLACEHOLDER_OPEN || c == PLACEHOLDER_CLOSE) {
        return escaped.to_string();
    }
    escaped
        .replace(PLACEHOLDER_OPEN, "&#xE000;")
        .replace(PLACEHOLDER_CLOSE, "&#xE001;")
}

// =============================================================================
// Substitution pipeline
// =============================================================================

/// One stage of the inline substitution pipeline.
///
/// Every stage is global over the working string, which is already
/// HTML-escaped when the pipeline starts.
pub struct InlineRule {
    /// Stable stage name.
    pub name: &'static str,
    /// Regular expression the stage replaces.
    pub pattern: &'static str,
    replace: fn(&Captures<'_>, &mut Stage<'_>) -> String,
}

impl InlineRule {
    /// Apply only this stage to escaped text.
    pub fn apply(&self, escaped: &str, refs: &RefDefs) -> String {
        let mut stage = Stage::new(refs);
        let index = INLINE_RULES
            .iter()
            .position(|rule| rule.name == self.name)
            .unwrap_or(0);
        let html = stage.apply(self, &compiled_rules()[index], escaped);
        stage.restore(&html)
    }
}

/// The pipeline, in application order.
///
/// Reference forms run before inline forms, images before links, and strong
/// before emphasis so that `**` is never read as two single markers.
pub const INLINE_RULES: &[InlineRule] = &[
    InlineRule {
        name: "reference_image",
        // ![alt][label]; an empty label falls back to the alt text
        pattern: r"!\[([^\]]*)\]\[(.*?)\]",
        replace: reference_image,
    },
    InlineRule {
        name: "shortcut_reference_image",
        // ![alt][]
        pattern: r"!\[([^\]]*)\]\[\]",
        replace: reference_image,
    },
    InlineRule {
        name: "inline_image",
        // ![alt](src "title")
        pattern: r#"!\[([^\]]*)\]\(([^\s)]+)(?:\s+("([^"]*)"|'([^']*)'|\(([^)]*)\)))?\)"#,
        replace: inline_image,
    },
    InlineRule {
        name: "reference_link",
        // [text][label]; an empty label falls back to the text
        pattern: r"\[([^\]]+)\]\[(.*?)\]",
        replace: reference_link,
    },
    InlineRule {
        name: "shortcut_reference_link",
        // [text][]
        pattern: r"\[([^\]]+)\]\[\]",
        replace: reference_link,
    },
    InlineRule {
        name: "inline_link",
        // [text](href "title")
        pattern: r#"\[([^\]]+)\]\(([^\s)]+)(?:\s+("([^"]*)"|'([^']*)'|\(([^)]*)\)))?\)"#,
        replace: inline_link,
    },
    InlineRule {
        name: "strong_asterisk",
        pattern: r"\*\*([^*]+)\*\*",
        replace: strong,
    },
    InlineRule {
        name: "strong_underscore",
        pattern: r"__([^_]+)__",
        replace: strong,
    },
    InlineRule {
        name: "emphasis_asterisk",
        pattern: r"\*([^*]+)\*",
        replace: emphasis,
    },
    InlineRule {
        name: "emphasis_underscore",
        pattern: r"_([^_]+)_",
        replace: emphasis,
    },
];

fn compiled_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        INLINE_RULES
            .iter()
            .map(|rule| Regex::new(rule.pattern).unwrap())
            .collect()
    })
}

fn re_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap())
}

/// Working state of one pipeline run: the reference table and the fragments
/// parked so far.
pub struct Stage<'r> {
    refs: &'r RefDefs,
    parked: Vec<String>,
}

impl<'r> Stage<'r> {
    fn new(refs: &'r RefDefs) -> Self {
        Self {
            refs,
            parked: Vec::new(),
        }
    }

    /// Run every rule over escaped text. Parked fragments stay parked.
    fn run(&mut self, escaped: &str) -> String {
        let mut out = escaped.to_string();
        for (rule, re) in INLINE_RULES.iter().zip(compiled_rules()) {
            out = self.apply(rule, re, &out);
        }
        out
    }

    fn apply(&mut self, rule: &InlineRule, re: &Regex, text: &str) -> String {
        let replace = rule.replace;
        re.replace_all(text, |caps: &Captures<'_>| replace(caps, &mut *self))
            .into_owned()
    }

    /// Park generated markup and return its placeholder.
    fn park(&mut self, html: String) -> String {
        let index = self.parked.len();
        self.parked.push(html);
        format!("{PLACEHOLDER_OPEN}{index}{PLACEHOLDER_CLOSE}")
    }

    /// Put parked fragments back. A fragment only refers to fragments parked
    /// before it, so the recursion ends.
    fn restore(&self, text: &str) -> String {
        re_placeholder()
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.parked.get(i))
                    .map_or_else(|| caps[0].to_string(), |html| self.restore(html))
            })
            .into_owned()
    }
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

/// The source value of a captured fragment of escaped text, escaped for an
/// attribute.
fn attr_from_escaped(escaped: &str) -> String {
    escape_html_attr(&decode_html_entities(escaped))
}

/// First non-empty of the three title quoting styles.
fn captured_title<'t>(caps: &Captures<'t>) -> &'t str {
    [4, 5, 6]
        .into_iter()
        .map(|i| group(caps, i))
        .find(|t| !t.is_empty())
        .unwrap_or("")
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_html_attr(title))
    }
}

fn lookup<'r>(stage: &Stage<'r>, label: &str, fallback: &str) -> Option<&'r RefDef> {
    let label = if label.is_empty() { fallback } else { label };
    stage.refs.get(&decode_html_entities(label))
}

fn reference_image(caps: &Captures<'_>, stage: &mut Stage<'_>) -> String {
    let alt = group(caps, 1);
    let Some(def) = lookup(stage, group(caps, 2), alt) else {
        return caps[0].to_string();
    };
    let html = format!(
        r#"<img src="{}" alt="{}"{}>"#,
        escape_html_attr(&def.href),
        attr_from_escaped(alt),
        title_attr(&def.title)
    );
    stage.park(html)
}

fn inline_image(caps: &Captures<'_>, stage: &mut Stage<'_>) -> String {
    let html = format!(
        r#"<img src="{}" alt="{}"{}>"#,
        attr_from_escaped(group(caps, 2)),
        attr_from_escaped(group(caps, 1)),
        title_attr(&decode_html_entities(captured_title(caps)))
    );
    stage.park(html)
}

fn reference_link(caps: &Captures<'_>, stage: &mut Stage<'_>) -> String {
    let text = group(caps, 1);
    let Some(def) = lookup(stage, group(caps, 2), text) else {
        return caps[0].to_string();
    };
    let (href, title) = (escape_html_attr(&def.href), title_attr(&def.title));
    let inner = stage.run(text);
    stage.park(format!(r#"<a href="{href}"{title}>{inner}</a>"#))
}

fn inline_link(caps: &Captures<'_>, stage: &mut Stage<'_>) -> String {
    let href = attr_from_escaped(group(caps, 2));
    let title = title_attr(&decode_html_entities(captured_title(caps)));
    let inner = stage.run(group(caps, 1));
    stage.park(format!(r#"<a href="{href}"{title}>{inner}</a>"#))
}

fn strong(caps: &Captures<'_>, _: &mut Stage<'_>) -> String {
    format!("<strong>{}</strong>", &caps[1])
}

fn emphasis(caps: &Captures<'_>, _: &mut Stage<'_>) -> String {
    format!("<em>{}</em>", &caps[1])
}
