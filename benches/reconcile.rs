//! Benchmarks for inventory reconciliation and hook unification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tenant_resolver::config::Inventory;
use tenant_resolver::package::{Category, PackageMap, VersionedPackage};
use tenant_resolver::phases::hooks;
use tenant_resolver::phases::reconcile::reconcile;
use tenant_resolver::phases::{HookBinding, SessionSnapshot};

fn tools(count: usize, minor: usize) -> PackageMap {
    (0..count)
        .map(|i| {
            let name = format!("tool-{i}");
            let version = format!("1.{minor}.{i}");
            let package = VersionedPackage::new(name.clone(), version, "https://x");
            (name, package)
        })
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for count in [10, 100, 1000] {
        let mut root = Inventory::default();
        root.tools = tools(count / 2, 0);
        let snapshot = SessionSnapshot::capture(&root);
        let discovered = tools(count, 1);

        group.bench_with_input(BenchmarkId::new("tools", count), &discovered, |b, discovered| {
            b.iter(|| {
                let mut running = root.tools.clone();
                reconcile(Category::Tools, black_box(discovered), &snapshot, &mut running)
            })
        });
    }

    group.finish();
}

fn bench_unify(c: &mut Criterion) {
    let mut group = c.benchmark_group("hook_unify");

    for tenants in [10, 100, 1000] {
        let bindings: Vec<HookBinding> = (0..tenants)
            .map(|i| {
                let tenant = format!("tenant{i:04}");
                if i % 3 == 0 {
                    HookBinding::absent(tenant)
                } else {
                    let package = VersionedPackage::new(
                        format!("{tenant}.hooks"),
                        format!("1.{}.0", i % 17),
                        "https://x",
                    );
                    HookBinding::own(tenant, package)
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("tenants", tenants), &bindings, |b, bindings| {
            b.iter(|| hooks::unify(black_box(bindings.clone())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile, bench_unify);
criterion_main!(benches);
