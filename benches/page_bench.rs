use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio::page::Page;
use folio::PageConfig;

const SITE: &str = include_str!("../site/index.html");

fn bench_load(c: &mut Criterion) {
    c.bench_function("page_load", |b| {
        b.iter(|| Page::load(black_box(SITE), PageConfig::default()).expect("site loads"))
    });
}

// One open/close cycle of the lightbox plus a menu toggle pair.
fn bench_dispatch(c: &mut Criterion) {
    let mut page = Page::load(SITE, PageConfig::default()).expect("site loads");
    let item = page
        .query(".artwork:last-child .artwork-image")
        .unwrap()
        .expect("last artwork");
    let hamburger = page.query("#hamburger").unwrap().expect("hamburger");

    c.bench_function("lightbox_and_menu_cycle", |b| {
        b.iter(|| {
            page.click(item);
            page.next_frame();
            page.press("Tab");
            page.press("Escape");
            page.click(hamburger);
            page.click(hamburger);
        })
    });
}

fn bench_accessibility_tree(c: &mut Criterion) {
    let page = Page::load(SITE, PageConfig::default()).expect("site loads");
    c.bench_function("accessibility_tree", |b| b.iter(|| black_box(page.accessibility_tree())));
}

criterion_group!(benches, bench_load, bench_dispatch, bench_accessibility_tree);
criterion_main!(benches);
