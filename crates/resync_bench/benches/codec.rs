//! Sitemap codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use resync_bench::{generate_changes, generate_set};
use resync_codec::{parse_document, Sitemap};

/// Benchmark serializing inventories.
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    let sitemap = Sitemap::new();

    for size in [100usize, 1_000, 10_000] {
        let set = generate_set(size, 1);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("resourcelist", size), &set, |b, set| {
            b.iter(|| black_box(sitemap.resources_as_xml(black_box(set)).unwrap()));
        });
    }

    let list = generate_changes(1_000, 200, 2);
    group.bench_function("changelist_1000", |b| {
        b.iter(|| black_box(sitemap.changes_as_xml(black_box(&list)).unwrap()));
    });

    group.finish();
}

/// Benchmark parsing inventories.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let sitemap = Sitemap::new();

    for size in [100usize, 1_000, 10_000] {
        let xml = sitemap.resources_as_xml(&generate_set(size, 3)).unwrap();
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::new("resourcelist", size), &xml, |b, xml| {
            b.iter(|| black_box(parse_document("bench.xml", black_box(xml.as_bytes())).unwrap()));
        });
    }

    let xml = sitemap.changes_as_xml(&generate_changes(1_000, 200, 4)).unwrap();
    group.bench_function("changelist_1000", |b| {
        b.iter(|| {
            let doc = parse_document("bench.xml", black_box(xml.as_bytes())).unwrap();
            black_box(doc.into_change_list().unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_write, bench_parse);
criterion_main!(benches);
