use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use quotecard::assets::Assets;
use quotecard::rendering::layout::CardLayout;
use quotecard::rendering::CardRenderer;
use quotecard::{CardConfig, Record};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

fn draft_renderer() -> CardRenderer {
    CardRenderer::new(CardConfig::default().scaled(0.25)).expect("valid config")
}

/// One line per placed element, then the text block parameters.
fn fingerprint(layout: &CardLayout) -> String {
    let mut out = String::new();
    for node in &layout.nodes {
        let r = node.rect;
        writeln!(out, "{:?} {} {} {} {}", node.elem_type, r.x, r.y, r.width, r.height).unwrap();
    }
    writeln!(out, "quote {} {}", layout.quote.font_size, layout.quote.fitted_columns).unwrap();
    writeln!(
        out,
        "reflection {} {}",
        layout.reflection.font_size, layout.reflection.fitted_columns
    )
    .unwrap();
    writeln!(out, "fit_scale {:.3}", layout.fit_scale).unwrap();
    out
}

#[test]
fn golden_layout_matches_fixture() {
    let renderer = CardRenderer::new(CardConfig::default()).expect("valid config");
    let record = Record::new(
        "1",
        "每个人都有自己的时区，不要被别人的节奏打乱",
        "完美主义是进步的敌人",
    );
    let layout = renderer.plan(&record, &Assets::builtin()).expect("plan");
    let actual = fingerprint(&layout);

    let expected_path = golden_path("card_time.layout");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, &actual).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    let expected = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(actual.trim(), expected.trim());
}

#[test]
fn identical_input_renders_identical_pixels() {
    let renderer = draft_renderer();
    let assets = Assets::builtin();
    let record = Record::new("2", "接受自己的脆弱是力量的体现", "允许自己慢一点");
    let first = renderer.compose(&record, &assets).expect("compose");
    let second = renderer.compose(&record, &assets).expect("compose");
    assert_eq!(first.digest(), second.digest());
    assert_eq!(first.image, second.image);
}

#[test]
fn different_records_render_differently() {
    let renderer = draft_renderer();
    let assets = Assets::builtin();
    let a = renderer
        .compose(&Record::new("a", "完美主义是进步的敌人", "慢慢来"), &assets)
        .expect("compose");
    let b = renderer
        .compose(&Record::new("b", "真正的成长发生在舒适圈之外", "慢慢来"), &assets)
        .expect("compose");
    assert_ne!(a.digest(), b.digest());
}
