use lessonmark_core::{parse_blocks, render_markdown_to_html, Block, Parser, RenderOptions, Renderer};
use pulldown_cmark::{Event, Options, Parser as MdParser, Tag, TagEnd};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counts {
    headings: u32,
    paragraphs: u32,
    lists: u32,
    list_items: u32,
    code_blocks: u32,
    quotes: u32,
}

impl Counts {
    fn total(self) -> u32 {
        self.headings
            + self.paragraphs
            + self.lists
            + self.list_items
            + self.code_blocks
            + self.quotes
    }

    fn diff(self, other: Counts) -> u32 {
        self.headings.abs_diff(other.headings)
            + self.paragraphs.abs_diff(other.paragraphs)
            + self.lists.abs_diff(other.lists)
            + self.list_items.abs_diff(other.list_items)
            + self.code_blocks.abs_diff(other.code_blocks)
            + self.quotes.abs_diff(other.quotes)
    }
}

/// Count blocks, descending into quotes from a worklist of their bodies.
fn count_lessonmark(input: &str) -> Counts {
    let mut counts = Counts::default();
    let mut pending = vec![input.to_string()];
    while let Some(text) = pending.pop() {
        for block in parse_blocks(&text).blocks {
            match block {
                Block::Heading(_) => counts.headings += 1,
                Block::Paragraph(_) => counts.paragraphs += 1,
                Block::List(list) => {
                    counts.lists += 1;
                    counts.list_items += list.items.len() as u32;
                }
                Block::CodeBlock(_) => counts.code_blocks += 1,
                Block::Quote(quote) => {
                    counts.quotes += 1;
                    pending.push(quote.text.into_owned());
                }
                Block::ThematicBreak(_) => {}
            }
        }
    }
    counts
}

fn count_markdown(input: &str) -> Counts {
    let mut counts = Counts::default();
    let mut list_depth = 0u32;
    for event in MdParser::new_ext(input, Options::empty()) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } => counts.headings += 1,
                Tag::Paragraph => {
                    // list items hold their text directly
                    if list_depth == 0 {
                        counts.paragraphs += 1;
                    }
                }
                Tag::List(_) => {
                    counts.lists += 1;
                    list_depth += 1;
                }
                Tag::Item => counts.list_items += 1,
                Tag::CodeBlock(_) => counts.code_blocks += 1,
                Tag::BlockQuote => counts.quotes += 1,
                _ => {}
            },
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    counts
}

/// pulldown-cmark reads front matter as a rule and a setext heading.
fn without_front_matter(input: &str) -> &str {
    input
        .split_once("---\n\n")
        .map_or(input, |(_, body)| body)
}

fn accuracy(counts: Counts, expected: Counts) -> f64 {
    let total = expected.total();
    if total == 0 {
        return 1.0;
    }
    let diff = counts.diff(expected);
    let score = (total as f64 - diff as f64) / total as f64;
    score.max(0.0)
}

type MutationList = &'static [&'static str];

struct Lcg {
    state: u64,
}

const SEED: u64 = 0x5eed;
const MAX_VARIANT_LEN: usize = 32_000;
const MAX_MUTATION_STEPS: usize = 3;
const VARIANT_COUNT: usize = 16;

const REALISTIC_MUTATIONS: MutationList = &[
    "drop_code_fence_end",
    "drop_blank_line",
    "truncate_tail_small",
    "extra_blank_lines",
    "crlf_line_endings",
];

const STRESS_MUTATIONS: MutationList = &[
    "drop_code_fence_end",
    "drop_blank_line",
    "truncate_tail",
    "strip_list_dash",
    "strip_quote_marker",
    "unbalanced_backtick",
    "unbalanced_bracket",
    "inject_html",
    "inject_placeholder",
    "break_front_matter",
];

const LESSON: &str = r#"---
title: "Loops"
chapter: 3
---

# Loops

A `for` loop walks over **any** iterable. See [the docs][py] or
the [tutorial](https://example.com/tutorial "Tutorial").

- [ ] Read the example
- [x] Run it yourself

1. Write a loop
2. Print each value

> Remember: `range(n)` stops *before* `n`.

```python
for i in range(3):
    print(i)
```

    indented output

---

That's all for now.

[py]: https://docs.python.org "Python docs"
"#;

const LESSON_EXPECTED: Counts = Counts {
    headings: 1,
    paragraphs: 3,
    lists: 2,
    list_items: 4,
    code_blocks: 2,
    quotes: 1,
};

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn choose(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u32() as usize) % max
    }
}

fn truncate_at_char(input: &mut String, mut len: usize) {
    while !input.is_char_boundary(len) {
        len -= 1;
    }
    input.truncate(len);
}

fn apply_mutations(mut input: String, mutations: &[&str], rng: &mut Lcg) -> String {
    let steps = std::cmp::min(MAX_MUTATION_STEPS, mutations.len());
    for _ in 0..steps {
        let pick = rng.choose(mutations.len());
        match mutations[pick] {
            "drop_code_fence_end" => {
                if let Some(pos) = input.rfind("```\n") {
                    input.replace_range(pos..pos + 4, "");
                }
            }
            "drop_blank_line" => {
                if let Some(pos) = input.find("\n\n") {
                    input.replace_range(pos..pos + 2, "\n");
                }
            }
            "truncate_tail" => {
                let len = input.len();
                if len > 8 {
                    let cut = rng.choose(len / 4).max(1);
                    truncate_at_char(&mut input, len - cut);
                }
            }
            "truncate_tail_small" => {
                let len = input.len();
                if len > 16 {
                    let cut = rng.choose(len / 20).max(1);
                    truncate_at_char(&mut input, len - cut);
                }
            }
            "extra_blank_lines" => {
                input = input.replace("\n\n", "\n\n\n");
            }
            "crlf_line_endings" => {
                input = input.replace('\n', "\r\n");
            }
            "strip_list_dash" => {
                if let Some(pos) = input.find("- ") {
                    input.replace_range(pos..pos + 2, "");
                }
            }
            "strip_quote_marker" => {
                if let Some(pos) = input.find("> ") {
                    input.replace_range(pos..pos + 2, "");
                }
            }
            "unbalanced_backtick" => {
                if let Some(pos) = input.find('`') {
                    input.insert_str(pos, "``");
                }
            }
            "unbalanced_bracket" => {
                if let Some(pos) = input.find("](") {
                    input.replace_range(pos..pos + 2, "(");
                }
            }
            "inject_html" => {
                let at = input.find('\n').map_or(0, |p| p + 1);
                input.insert_str(at, "<script>alert(\"x\")</script> & [x](javascript:\"><b>)\n");
            }
            "inject_placeholder" => {
                let at = input.find('\n').map_or(0, |p| p + 1);
                input.insert_str(at, "\u{E000}0\u{E001} **\u{E000}9\u{E001}**\n");
            }
            "break_front_matter" => {
                if let Some(pos) = input.rfind("---\n\n#") {
                    input.replace_range(pos..pos + 3, "--");
                }
            }
            _ => {}
        }
        if input.len() > MAX_VARIANT_LEN {
            truncate_at_char(&mut input, MAX_VARIANT_LEN);
            break;
        }
    }
    input
}

fn generate_variants(input: &str, seed: u64, mutations: MutationList) -> Vec<String> {
    let mut rng = Lcg::new(seed);
    (0..VARIANT_COUNT)
        .map(|_| apply_mutations(input.to_string(), mutations, &mut rng))
        .collect()
}

#[test]
fn clean_lesson_matches_pulldown_structure() {
    assert_eq!(count_lessonmark(LESSON), LESSON_EXPECTED);
    assert_eq!(
        count_markdown(without_front_matter(LESSON)),
        LESSON_EXPECTED
    );
}

#[test]
fn clean_lesson_has_no_diagnostics() {
    let result = Parser::new().parse_with_recovery(LESSON);
    assert!(result.is_ok(), "{:?}", result.errors);
    assert!(result.document.front_matter.is_some());
    assert_eq!(result.document.ref_defs.len(), 1);
}

#[test]
fn mutated_input_always_renders() {
    let renderer = Renderer::new(RenderOptions::default());
    for mutations in [REALISTIC_MUTATIONS, STRESS_MUTATIONS] {
        for variant in generate_variants(LESSON, SEED, mutations) {
            let html = renderer.render(&variant);
            assert!(html.starts_with(r#"<div class="markdown-body">"#));
            assert!(html.ends_with("</div>"));
            assert!(!html.contains("<script"), "unescaped html in {html}");
            assert!(
                !html.contains(|c: char| c == '\u{E000}' || c == '\u{E001}'),
                "placeholder leaked in {html}"
            );
        }
    }
}

#[test]
fn mutated_input_block_spans_stay_ordered() {
    for variant in generate_variants(LESSON, SEED, STRESS_MUTATIONS) {
        let doc = parse_blocks(&variant);
        for pair in doc.blocks.windows(2) {
            assert!(pair[0].span().end <= pair[1].span().start);
        }
        for block in &doc.blocks {
            assert!(block.span().end as usize <= variant.len());
        }
    }
}

const DEEP_QUOTE_DEPTH: usize = 10_000;

#[test]
fn deeply_nested_quotes_render() {
    let input = format!("{} x", ">".repeat(DEEP_QUOTE_DEPTH));
    let html = Renderer::new(RenderOptions::default().with_wrap(false)).render(&input);

    let open = "<blockquote>".repeat(DEEP_QUOTE_DEPTH);
    let close = "</blockquote>".repeat(DEEP_QUOTE_DEPTH);
    assert_eq!(html, format!("{open}<p>x</p>{close}"));
}

#[test]
fn deeply_nested_quotes_resolve_refs_through_every_level() {
    let depth = 2_000;
    let input = format!(
        "{} [a][r] [b][s]\n> [s]: /inner\n\n[r]: /outer\n[s]: /outer",
        ">".repeat(depth)
    );
    let html = render_markdown_to_html(&input);
    assert!(html.contains(r#"<p><a href="/outer">a</a> <a href="/inner">b</a></p>"#));
    assert_eq!(html.matches("<blockquote>").count(), depth);
}

#[test]
fn deeply_nested_quotes_with_siblings() {
    // each level holds a paragraph followed by the next quote
    let depth = 1_500;
    let input: String = (0..=depth)
        .map(|level| format!("{}x\n", ">".repeat(level)))
        .collect();
    let counts = count_lessonmark(&input);
    assert_eq!(counts.quotes as usize, depth);
    assert_eq!(counts.paragraphs as usize, depth + 1);

    let html = render_markdown_to_html(&input);
    assert!(html.starts_with(r#"<div class="markdown-body"><p>x</p>"#));
    assert_eq!(html.matches("<blockquote><p>x</p>").count(), depth);
    assert_eq!(html.matches("</blockquote>").count(), depth);
}

#[test]
fn robustness_report() {
    println!("\nRobustness Report");
    println!("Seed\t0x{:x}", SEED);
    println!("suite\tformat\tavg\tmin\tmax\tdiagnostics");
    for (label, mutations) in [("realistic", REALISTIC_MUTATIONS), ("stress", STRESS_MUTATIONS)] {
        let variants = generate_variants(LESSON, SEED, mutations);
        let mut with_diagnostics = 0u32;
        let mut lessonmark = Vec::with_capacity(variants.len());
        let mut markdown = Vec::with_capacity(variants.len());
        for variant in &variants {
            lessonmark.push(accuracy(count_lessonmark(variant), LESSON_EXPECTED));
            markdown.push(accuracy(
                count_markdown(without_front_matter(variant)),
                LESSON_EXPECTED,
            ));
            if !Parser::new().parse_with_recovery(variant).is_ok() {
                with_diagnostics += 1;
            }
        }
        for (format, scores) in [("lessonmark", &lessonmark), ("pulldown", &markdown)] {
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            let min = scores.iter().copied().fold(1.0, f64::min);
            let max = scores.iter().copied().fold(0.0, f64::max);
            println!(
                "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{}/{}",
                label,
                format,
                avg,
                min,
                max,
                with_diagnostics,
                variants.len()
            );
        }
        let _ = io::stdout().flush();
    }
    println!();
}
