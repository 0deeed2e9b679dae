//! Block renderer: parsed blocks to an HTML fragment.
//!
//! Each block maps to a fixed template. Text-bearing blocks go through the
//! inline renderer; block quotes are parsed again from their inner markdown
//! and rendered with the outer reference table underneath their own.
//!
//! Nested quotes are walked with an explicit stack of [`QuoteFrame`]s rather
//! than by recursion, so nesting depth is limited by memory only.

use crate::ast::{Block, CodeBlock, List};
use crate::escape::{escape_html, escape_html_attr};
use crate::inline::render_inline;
use crate::options::RenderOptions;
use crate::parser::Parser;
use crate::refs::RefDefs;

/// Editor mode for Python, also used when a block has no language hint.
pub const ACE_MODE_PYTHON: &str = "ace/mode/python";
/// Editor mode for JavaScript.
pub const ACE_MODE_JAVASCRIPT: &str = "ace/mode/javascript";
/// Editor mode for everything else.
pub const ACE_MODE_TEXT: &str = "ace/mode/text";

/// The `data-language` label and `data-ace-mode` value for a code block's
/// language hint.
///
/// ```rust
/// use lessonmark_core::render::ace_mode_for_lang;
///
/// assert_eq!(ace_mode_for_lang(""), ("python".to_string(), "ace/mode/python"));
/// assert_eq!(ace_mode_for_lang("JS"), ("js".to_string(), "ace/mode/javascript"));
/// assert_eq!(ace_mode_for_lang("sql"), ("sql".to_string(), "ace/mode/text"));
/// ```
pub fn ace_mode_for_lang(lang: &str) -> (String, &'static str) {
    let lang = lang.to_lowercase();
    match lang.as_str() {
        "" => ("python".to_string(), ACE_MODE_PYTHON),
        "python" | "py" => (lang, ACE_MODE_PYTHON),
        "js" | "javascript" => (lang, ACE_MODE_JAVASCRIPT),
        _ => (lang, ACE_MODE_TEXT),
    }
}

/// Render blocks with default options.
pub fn render_blocks(blocks: &[Block<'_>], refs: &RefDefs) -> String {
    Renderer::default().render_blocks(blocks, refs)
}

/// Parse and render nested markdown, resolving references against
/// `outer_refs` overlaid with the nested text's own definitions.
pub fn render_markdown_inner(markdown: &str, outer_refs: &RefDefs) -> String {
    Renderer::default().render_inner(markdown, outer_refs)
}

/// Markdown to HTML renderer.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn parser(&self) -> Parser {
        Parser::new().with_front_matter(self.options.front_matter)
    }

    /// Render a whole document, wrapped in the container `div` unless
    /// wrapping is disabled.
    pub fn render(&self, markdown: &str) -> String {
        let document = self.parser().parse(markdown);
        let html = self.render_blocks(&document.blocks, &document.ref_defs);
        if !self.options.wrap {
            return html;
        }
        format!(
            r#"<div class="{}">{}</div>"#,
            escape_html_attr(&self.options.container_class),
            html
        )
    }

    /// Render nested markdown against an enclosing reference table.
    pub fn render_inner(&self, markdown: &str, outer_refs: &RefDefs) -> String {
        self.drain(self.parse_frame(markdown, outer_refs))
    }

    /// Render blocks, one HTML element per block, separated by newlines.
    pub fn render_blocks(&self, blocks: &[Block<'_>], refs: &RefDefs) -> String {
        self.drain(self.frame(blocks, refs.clone()))
    }

    fn parse_frame(&self, markdown: &str, outer_refs: &RefDefs) -> QuoteFrame {
        let document = self.parser().parse(markdown);
        let refs = RefDefs::overlay(outer_refs, &document.ref_defs);
        self.frame(&document.blocks, refs)
    }

    /// Render every block except quotes, whose bodies are kept for later.
    fn frame(&self, blocks: &[Block<'_>], refs: RefDefs) -> QuoteFrame {
        let pending: Vec<Pending> = blocks
            .iter()
            .map(|block| match block {
                Block::Quote(q) => Pending::Quote(q.text.to_string()),
                other => Pending::Html(self.render_block(other, &refs)),
            })
            .collect();
        QuoteFrame {
            refs,
            pending: pending.into_iter(),
            started: false,
        }
    }

    /// Write out a frame and every quote nested inside it.
    fn drain(&self, root: QuoteFrame) -> String {
        let mut html = String::new();
        let mut stack = vec![root];

        while let Some(frame) = stack.last_mut() {
            let Some(next) = frame.pending.next() else {
                stack.pop();
                if !stack.is_empty() {
                    html.push_str("</blockquote>");
                }
                continue;
            };

            if frame.started {
                html.push('\n');
            }
            frame.started = true;

            match next {
                Pending::Html(block) => html.push_str(&block),
                Pending::Quote(text) => {
                    let inner = self.parse_frame(&text, &frame.refs);
                    html.push_str("<blockquote>");
                    stack.push(inner);
                    log::trace!("entered quote at depth {}", stack.len() - 1);
                }
            }
        }
        html
    }

    fn render_block(&self, block: &Block<'_>, refs: &RefDefs) -> String {
        log::trace!("rendering {}", block.kind_name());
        match block {
            Block::Paragraph(p) => format!("<p>{}</p>", render_inline(&p.text, refs)),
            Block::Heading(h) => {
                let level = h.level.clamp(1, 6);
                format!("<h{level}>{}</h{level}>", render_inline(&h.text, refs))
            }
            Block::CodeBlock(code) => render_code_block(code),
            Block::ThematicBreak(_) => "<hr />".to_string(),
            Block::List(list) => self.render_list(list, refs),
            Block::Quote(q) => format!(
                "<blockquote>{}</blockquote>",
                self.render_inner(&q.text, refs)
            ),
        }
    }

    fn render_list(&self, list: &List<'_>, refs: &RefDefs) -> String {
        let tag = if list.ordered { "ol" } else { "ul" };
        let start = match list.start {
            Some(n) if list.ordered && n > 1 => format!(r#" start="{n}""#),
            _ => String::new(),
        };
        let class = if list.is_task_list() {
            r#" class="task-list""#
        } else {
            ""
        };

        let mut html = format!("<{tag}{start}{class}>");
        for (index, item) in list.items.iter().enumerate() {
            let inner = render_inline(&item.text, refs);
            let Some(source_checked) = item.checked else {
                html.push_str(&format!("<li>{inner}</li>"));
                continue;
            };

            let task_id = index.to_string();
            let checked = self
                .options
                .task_state
                .get(&task_id)
                .copied()
                .unwrap_or(source_checked);
            let (li_class, checked_attr) = if checked {
                ("task-list-item task-done", " checked")
            } else {
                ("task-list-item", "")
            };
            html.push_str(&format!(
                r#"<li class="{li_class}"><input type="checkbox" data-task-id="{}"{checked_attr}> {inner}</li>"#,
                escape_html_attr(&task_id)
            ));
        }
        html.push_str(&format!("</{tag}>"));
        html
    }
}

/// One level of quote nesting: its reference table and the blocks left to
/// write.
struct QuoteFrame {
    refs: RefDefs,
    pending: std::vec::IntoIter<Pending>,
    started: bool,
}

enum Pending {
    /// A rendered block.
    Html(String),
    /// The markdown body of a nested quote.
    Quote(String),
}

fn render_code_block(code: &CodeBlock<'_>) -> String {
    let (lang, mode) = ace_mode_for_lang(code.lang());
    format!(
        r#"<pre class="markdown-code-block" data-language="{}" data-ace-mode="{}"><code>{}</code></pre>"#,
        escape_html_attr(&lang),
        escape_html_attr(mode),
        escape_html(&code.text)
    )
}
