//! Cache key and include expansion throughput.
//!
//! Run with `cargo bench --bench shader_cache_bench`.

use std::fs;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use shader_forge::pipeline::CacheKeyInputs;
use shader_forge::{CacheKey, CompilerFingerprint, DefinitionSet, IncludeExpander};

fn synthetic_source(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("float4 value{i} = float4({i}, {i}, {i}, 1);\n"))
        .collect()
}

fn bench_cache_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_key");
    let fingerprint = CompilerFingerprint::from_raw(0xDEC0DE);

    let mut definitions = DefinitionSet::new();
    for i in 0..16 {
        definitions.add(&format!("Option{i}_"), i).unwrap();
    }
    let serialized = definitions.serialize();

    for lines in [100, 1_000, 10_000] {
        let source = synthetic_source(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &source, |b, source| {
            b.iter(|| {
                CacheKey::compute(
                    black_box(&CacheKeyInputs {
                        source,
                        entry_point: Some("PSMain"),
                        profile: "ps_6_8",
                        definitions: &serialized,
                    }),
                    fingerprint,
                )
            });
        });
    }
    group.finish();
}

fn bench_definition_serialize(c: &mut Criterion) {
    let mut definitions = DefinitionSet::new();
    for i in 0..32 {
        definitions.add(&format!("Permutation{i}_"), i * 3).unwrap();
    }
    c.bench_function("definitions/serialize_32", |b| {
        b.iter(|| black_box(&definitions).serialize());
    });
}

fn bench_include_expansion(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let framework = dir.path().join("framework");
    fs::create_dir_all(&framework).unwrap();

    // Layered headers, each pulling in the shared framework header.
    fs::write(framework.join("Common.hlsl"), synthetic_source(200)).unwrap();
    let mut root = String::new();
    for i in 0..24 {
        let name = format!("Layer{i}.hlsl");
        let body = format!("#include <Common.hlsl>\n{}", synthetic_source(50));
        fs::write(dir.path().join(&name), body).unwrap();
        root.push_str(&format!("#include \"{name}\"\n"));
    }
    root.push_str("float4 PSMain() : SV_Target { return 0; }\n");
    let root_path = dir.path().join("Root.hlsl");
    fs::write(&root_path, root).unwrap();

    let expander = IncludeExpander::new(&framework);
    c.bench_function("include/expand_24_layers", |b| {
        b.iter(|| expander.expand_file(black_box(&root_path)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_cache_key,
    bench_definition_serialize,
    bench_include_expansion
);
criterion_main!(benches);
