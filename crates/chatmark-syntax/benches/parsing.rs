use chatmark_syntax::lexer::tokenize;
use chatmark_syntax::parse;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pulldown_cmark::Parser;

fn generate_chat_log(messages: usize) -> String {
    let base = "hey <@80351110224678912> did you see **this**? <:pepe:123456789>\n\
                > quoting the ||spoiler|| from <t:1757847540:R>\n\
                - item one with `code`\n  - nested ~~old~~ item\n\
                ```rust\nfn main() {}\n```\n\
                links: https://example.com and [docs](https://docs.rs)\n\n";
    base.repeat(messages)
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    group.sample_size(10);

    for size in [10, 100] {
        let content = generate_chat_log(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &content, |b, content| {
            b.iter(|| tokenize(std::hint::black_box(content)).len());
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.sample_size(10);

    for size in [10, 100] {
        let content = generate_chat_log(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &content, |b, content| {
            b.iter(|| parse(std::hint::black_box(content)));
        });
    }

    group.finish();
}

fn bench_pathological(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathological");
    group.sample_size(10);

    let brackets = "[a](".repeat(1000);
    group.bench_function("unclosed_links", |b| {
        b.iter(|| parse(std::hint::black_box(&brackets)));
    });

    let stars = "*".repeat(5000);
    group.bench_function("delimiter_run", |b| {
        b.iter(|| parse(std::hint::black_box(&stars)));
    });

    group.finish();
}

fn bench_pulldown_cmark_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("baseline");
    group.sample_size(10);

    let content = generate_chat_log(100);
    group.bench_function("pulldown_cmark", |b| {
        b.iter(|| {
            let events: Vec<_> = Parser::new(std::hint::black_box(&content)).collect();
            std::hint::black_box(events);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_parse,
    bench_pathological,
    bench_pulldown_cmark_baseline
);
criterion_main!(benches);
