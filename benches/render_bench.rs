use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quotecard::assets::Assets;
use quotecard::rendering::glyph::BuiltinGlyphs;
use quotecard::rendering::text::TextRasterizer;
use quotecard::rendering::CardRenderer;
use quotecard::{CardConfig, Color, Record};

const QUOTE: &str = "每个人都有自己的时区，\n不要被别人的节奏打乱";

fn bench_text_block(c: &mut Criterion) {
    let config = CardConfig::default();
    let glyphs = BuiltinGlyphs;
    let rasterizer = TextRasterizer::new(&glyphs, &config.typography);

    c.bench_function("measure_quote_block", |b| {
        b.iter(|| rasterizer.measure(black_box(QUOTE), 136, 1.8))
    });
    c.bench_function("render_quote_block_x4", |b| {
        b.iter(|| rasterizer.render(black_box(QUOTE), 136, Color::rgb(60, 60, 60), 1.8))
    });
}

fn bench_layout(c: &mut Criterion) {
    let renderer = CardRenderer::new(CardConfig::default()).expect("valid config");
    let assets = Assets::builtin();
    let long: String = "完美主义是进步的敌人".chars().cycle().take(300).collect();
    let record = Record::new("bench", long.clone(), long);

    c.bench_function("plan_300_char_record", |b| {
        b.iter(|| renderer.plan(black_box(&record), &assets).expect("plan"))
    });
}

fn bench_compose_draft(c: &mut Criterion) {
    let renderer = CardRenderer::new(CardConfig::default().scaled(0.25)).expect("valid config");
    let assets = Assets::builtin();
    let record = Record::new("bench", QUOTE.replace('\n', ""), "完美主义是进步的敌人");

    c.bench_function("compose_quarter_scale_card", |b| {
        b.iter(|| renderer.compose(black_box(&record), &assets).expect("compose"))
    });
}

criterion_group!(benches, bench_text_block, bench_layout, bench_compose_draft);
criterion_main!(benches);
