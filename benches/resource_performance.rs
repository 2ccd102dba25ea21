//! Resource Performance Benchmarks
//!
//! Measures the performance characteristics of the PATCH path engine (C3)
//! and the filter parser (C2) against realistic SCIM payload sizes, carried
//! over in shape from the upstream library's resource-creation benchmarks
//! but re-targeted at this crate's actual hot paths: those two modules run
//! on every PATCH and every list/search request respectively.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scim_sandbox::filter;
use scim_sandbox::patch::{apply_op, parse_path, PatchOpKind};
use serde_json::{json, Value};

fn create_test_user_data(id: usize) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": format!("user-{}", id),
        "userName": format!("user{}@example.com", id),
        "externalId": format!("ext-{}", id),
        "name": {
            "givenName": format!("User{}", id),
            "familyName": "Test",
            "formatted": format!("User{} Test", id)
        },
        "emails": [
            {"value": format!("user{}@example.com", id), "type": "work", "primary": true},
            {"value": format!("user{}.personal@gmail.com", id), "type": "personal", "primary": false}
        ],
        "phoneNumbers": [
            {"value": format!("+1-555-{:04}", id % 10000), "type": "work"}
        ],
        "active": true,
        "title": "Software Engineer",
        "department": "Engineering"
    })
}

fn bench_patch_path_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_path_parsing");
    let paths = [
        "displayName",
        "name.givenName",
        r#"emails[type eq "work"].value"#,
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager",
    ];

    for path in paths {
        group.bench_with_input(BenchmarkId::new("parse_path", path), &path, |b, &path| {
            b.iter(|| black_box(parse_path(Some(black_box(path))).unwrap()));
        });
    }
    group.finish();
}

fn bench_patch_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_apply");

    for size in [1, 10, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("value_filter_add", size), &size, |b, &size| {
            let base: Vec<Value> = (0..size).map(create_test_user_data).collect();
            let path = parse_path(Some(r#"emails[type eq "home"].value"#)).unwrap();
            b.iter(|| {
                for payload in &base {
                    let mut payload = payload.clone();
                    apply_op(
                        black_box(&mut payload),
                        PatchOpKind::Add,
                        &path,
                        Some(json!("home@example.com")),
                    )
                    .unwrap();
                    black_box(&payload);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("simple_replace", size), &size, |b, &size| {
            let base: Vec<Value> = (0..size).map(create_test_user_data).collect();
            let path = parse_path(Some("name.givenName")).unwrap();
            b.iter(|| {
                for payload in &base {
                    let mut payload = payload.clone();
                    apply_op(black_box(&mut payload), PatchOpKind::Replace, &path, Some(json!("Updated")))
                        .unwrap();
                    black_box(&payload);
                }
            });
        });
    }
    group.finish();
}

fn bench_filter_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_parsing");

    group.bench_function("parse_eq_accepted", |b| {
        b.iter(|| black_box(filter::parse(r#"userName eq "alice@example.com""#).unwrap()));
    });

    group.bench_function("parse_unsupported_rejected", |b| {
        b.iter(|| {
            let _ = black_box(filter::parse(r#"userName eq "a" and active eq "true""#));
        });
    });

    group.finish();
}

fn bench_json_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_roundtrip");
    let resources: Vec<Value> = (0..100).map(create_test_user_data).collect();

    group.bench_function("clone_100", |b| {
        b.iter(|| {
            for r in &resources {
                black_box(r.clone());
            }
        });
    });

    group.bench_function("serialize_100", |b| {
        b.iter(|| {
            for r in &resources {
                black_box(serde_json::to_string(r).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(
    resource_performance_benches,
    bench_patch_path_parsing,
    bench_patch_apply,
    bench_filter_parsing,
    bench_json_roundtrip
);
criterion_main!(resource_performance_benches);
