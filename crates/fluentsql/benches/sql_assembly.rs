use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fluentsql::prelude::*;
use fluentsql::{Params, bind_named};

#[derive(Debug, Clone, Entity, FromRow)]
#[orm(table = "orders")]
struct Order {
    #[orm(id, identity)]
    id: i64,
    customer: String,
    status: String,
    total: f64,
    items: i32,
}

/// A filtered, grouped, paged SELECT with `n` IN-list values.
fn build_select(n: usize) -> String {
    let statuses: Vec<String> = (0..n).map(|i| format!("s{i}")).collect();
    Query::<Order>::new()
        .and_where(Order::STATUS.in_list(statuses))
        .and_where(Order::TOTAL.ge(10.0) | Order::ITEMS.gt(3))
        .group_by(Order::CUSTOMER)
        .having(Order::TOTAL.sum().gt(100.0))
        .columns((Order::CUSTOMER, Order::TOTAL.sum().alias("spent")))
        .order_by_desc(Order::CUSTOMER)
        .skip(20, 10)
        .build_select()
        .unwrap_or_default()
}

fn bench_build_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_assembly/build_select");

    for n in [1, 5, 20, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(n)));
        });
    }

    group.finish();
}

fn bench_entity_statements(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_assembly/entity");

    group.bench_function("insert", |b| {
        b.iter(|| black_box(Query::<Order>::new().build_insert()));
    });
    group.bench_function("update", |b| {
        b.iter(|| black_box(Query::<Order>::new().build_update()));
    });
    group.bench_function("grouped_count", |b| {
        b.iter(|| {
            black_box(
                Query::<Order>::new()
                    .group_by(Order::CUSTOMER)
                    .build_count(),
            )
        });
    });

    group.finish();
}

fn bench_bind_named(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_assembly/bind_named");

    for n in [1, 10, 100] {
        let mut params = Params::with_capacity(n);
        let mut sql = String::from("SELECT id FROM orders WHERE 1=1");
        for i in 0..n {
            let key = format!("p{i}");
            sql.push_str(&format!(" AND (items = @{key} OR 'lit@{key}' = '')"));
            let _ = params.insert(key, i as i32);
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(bind_named(sql, &params).map(|bound| bound.params.len())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_select,
    bench_entity_statements,
    bench_bind_named
);
criterion_main!(benches);
