//! Benchmarks for `StreamClassifier` dispatch.
//!
//! Measures the cost of matching stream links against the extraction
//! service table, both for hosting pages and for directly playable media.
//!
//! Run with: `cargo bench --bench classify_bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cinehub::{Stream, StreamClassifier};

// ---------------------------------------------------------------------------
// URL datasets
// ---------------------------------------------------------------------------

/// Hosting pages that need an extractor.
const HOSTING_URLS: &[&str] = &[
    "https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz/view?usp=sharing",
    "https://drive.google.com/uc?export=download&id=1AbCdEfGhIjK",
    "https://hubcloud.one/drive/abc123xyz",
    "https://new4.gdflix.dad/file/Xyz789AbC",
    "https://vcloud.lol/api/file/4f9a2c",
];

/// Directly playable media links.
const PLAYABLE_URLS: &[&str] = &[
    "https://cdn.example.com/movies/Dune.2021.1080p.mkv",
    "https://edge3.example.net/hls/master.m3u8?token=abc",
    "https://pixeldrain.example/api/file/abcd?download",
    "https://video.example.org/stream/episode-01.mp4",
];

/// Near misses that must not be routed to an extractor.
const EDGE_CASE_URLS: &[&str] = &[
    "https://drive.google.com/drive/folders/1AbC", // Folder, not file
    "https://example.com/hubcloud.one/drive/x",    // Host name in path
    "https://gdflix.dad/",                         // Landing page, no file id
    "https://not-hubcloud.example/abc",            // Similar name, wrong host
];

// ---------------------------------------------------------------------------
// Service lookup
// ---------------------------------------------------------------------------

fn bench_service_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("service_for");
    let classifier = StreamClassifier::new();

    group.bench_function("hosting", |b| {
        b.iter(|| {
            for url in HOSTING_URLS {
                black_box(classifier.service_for(black_box(url)));
            }
        });
    });

    group.bench_function("playable", |b| {
        b.iter(|| {
            for url in PLAYABLE_URLS {
                black_box(classifier.service_for(black_box(url)));
            }
        });
    });

    group.bench_function("edge_cases", |b| {
        b.iter(|| {
            for url in EDGE_CASE_URLS {
                black_box(classifier.service_for(black_box(url)));
            }
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Full classification of a provider's stream list
// ---------------------------------------------------------------------------

fn bench_classify_streams(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let classifier = StreamClassifier::new();
    let streams: Vec<Stream> = HOSTING_URLS
        .iter()
        .chain(PLAYABLE_URLS)
        .enumerate()
        .map(|(i, url)| Stream::new(format!("server-{i}"), *url))
        .collect();

    group.bench_function("mixed_list", |b| {
        b.iter(|| {
            for stream in &streams {
                black_box(classifier.classify(black_box(stream.clone())));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_service_for, bench_classify_streams);
criterion_main!(benches);
