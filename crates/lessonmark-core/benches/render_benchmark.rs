//! Benchmarks comparing lessonmark rendering vs pulldown-cmark
//!
//! Run with: cargo bench -p lessonmark-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lessonmark_core::inline::render_inline;
use lessonmark_core::{parse_blocks, render_markdown_to_html, RefDefs};
use pulldown_cmark::{html, Options, Parser as MdParser};

/// A typical theory tab
const LESSON_SAMPLE: &str = r#"# Lists and Loops

A list holds values in order. Use `len(xs)` to count them and **indexing**
to read one. See the [reference][ref] for every method, or the
[tutorial](https://example.com/tutorial "Tutorial") for a gentler start.

## Checklist

- [ ] Create a list
- [x] Append to it
- [ ] Loop over it

## Steps

1. Make an empty list
2. Fill it in a loop
3. Print the result

> A `for` loop stops once the iterable is *exhausted*.
> It never reads past the end.

```python
xs = []
for i in range(10):
    xs.append(i * i)
print(xs)
```

    >>> xs[0]
    0

---

![diagram][img] Images use the same reference syntax as links.

[ref]: https://docs.python.org/3/tutorial/datastructures.html "Data structures"
[img]: /static/lists.png
"#;

fn pulldown_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3 / 2);
    html::push_html(&mut out, MdParser::new_ext(input, Options::empty()));
    out
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(LESSON_SAMPLE.len() as u64));

    group.bench_function("lessonmark", |b| {
        b.iter(|| {
            let html = render_markdown_to_html(black_box(LESSON_SAMPLE));
            black_box(html.len())
        })
    });

    group.bench_function("markdown_pulldown", |b| {
        b.iter(|| {
            let html = pulldown_html(black_box(LESSON_SAMPLE));
            black_box(html.len())
        })
    });

    group.finish();
}

fn bench_block_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(LESSON_SAMPLE.len() as u64));

    group.bench_function("lessonmark_blocks", |b| {
        b.iter(|| {
            let doc = parse_blocks(black_box(LESSON_SAMPLE));
            black_box(doc.blocks.len())
        })
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for size in [1, 5, 10, 20].iter() {
        let content: String = LESSON_SAMPLE.repeat(*size);
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("lessonmark", size), &content, |b, content| {
            b.iter(|| black_box(render_markdown_to_html(black_box(content))).len())
        });

        group.bench_with_input(
            BenchmarkId::new("markdown_pulldown", size),
            &content,
            |b, content| b.iter(|| black_box(pulldown_html(black_box(content))).len()),
        );
    }

    group.finish();
}

fn bench_inline(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline");

    let inline = "This has *emphasis*, **strong**, `code`, [link](https://example.com), \
                  ![img](/a.png \"Title\") and a [missing][ref] reference.";
    let refs = RefDefs::new();

    group.bench_function("lessonmark_inline", |b| {
        b.iter(|| black_box(render_inline(black_box(inline), &refs)).len())
    });

    group.bench_function("markdown_inline", |b| {
        b.iter(|| black_box(pulldown_html(black_box(inline))).len())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_render,
    bench_block_parse,
    bench_scaling,
    bench_inline
);
criterion_main!(benches);
