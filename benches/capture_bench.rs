use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use pledgecard::preview::PreviewRenderer;
use pledgecard::rendering::{template, DefaultLoader, SurfaceHandle, SurfaceHost};
use pledgecard::{CaptureEngine, PledgeConfig, UserData};

fn user() -> UserData {
    UserData {
        full_name: "Jane Doe".into(),
        phone: String::new(),
        custom_pledge: "I will wear my watch every single day and close all my rings".into(),
    }
}

fn bench_full_capture(c: &mut Criterion) {
    let host = Arc::new(SurfaceHost::new());
    host.mount(template::success_markup(&user(), None));
    let engine = CaptureEngine::new(host, &PledgeConfig::default());
    let handle = SurfaceHandle::capture_target();

    c.bench_function("capture_2160x2880_jpeg", |b| {
        b.iter(|| {
            let _ = engine.capture(&handle, "Jane Doe").unwrap();
        })
    });
}

fn bench_preview_thumbnail(c: &mut Criterion) {
    let config = PledgeConfig::default();
    let host = SurfaceHost::new();
    host.mount(template::success_markup(&user(), None));
    let surface = host.resolve(&SurfaceHandle::new("preview-poster")).unwrap();
    let loader = DefaultLoader::new(&config);

    c.bench_function("preview_thumbnail_384", |b| {
        b.iter(|| {
            let _ = PreviewRenderer::new().thumbnail(&surface, 384.0 / 1080.0, &loader).unwrap();
        })
    });
}

criterion_group!(benches, bench_full_capture, bench_preview_thumbnail);
criterion_main!(benches);
