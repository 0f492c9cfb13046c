use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use sales_store::{
    Query,
    processor::{
        derive::derive_all,
        loader::{LoadOptions, load_csv},
        schema::Schema,
    },
};
use std::hint::black_box;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod common;

const ROWS: usize = 200_000;

fn load_derive_query(c: &mut Criterion) {
    let csv = common::generate_sales_csv(ROWS);
    let schema = Schema::sales_store();
    let options = LoadOptions::default();

    let mut group = c.benchmark_group("SalesStore");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function("load_csv", |b| {
        b.iter(|| black_box(load_csv(csv.path(), &schema, &options).unwrap()))
    });

    let (base, _) = load_csv(csv.path(), &schema, &options).unwrap();
    group.bench_function("derive_all", |b| {
        b.iter(|| black_box(derive_all(&base).unwrap()))
    });

    let enriched = derive_all(&base).unwrap();
    for query in Query::ALL {
        group.bench_function(query.name(), |b| {
            b.iter(|| black_box(query.run(&enriched).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, load_derive_query);
criterion_main!(benches);
