use chrono::{Days, NaiveDate, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{BatchReference, OrderLine, Product};

const SKU: &str = "SKU-BENCH";

fn eta(days: u64) -> Option<NaiveDate> {
    Utc::now().date_naive().checked_add_days(Days::new(days))
}

fn product_with_batches(count: u64, quantity: u32) -> Product {
    let mut product = Product::new(SKU);
    for n in 0..count {
        let eta = if n == 0 { None } else { eta(n) };
        product.add_batch(BatchReference::generate(), SKU, quantity, eta);
    }
    product.take_events();
    product
}

fn bench_allocate(c: &mut Criterion) {
    c.bench_function("domain/allocate_across_50_batches", |b| {
        b.iter_batched(
            || product_with_batches(50, 10),
            |mut product| {
                for n in 0..100 {
                    let line = OrderLine::new(format!("order-{n}"), SKU, 3);
                    let _ = product.allocate(line);
                }
                product
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_change_batch_quantity(c: &mut Criterion) {
    c.bench_function("domain/shrink_batch_with_100_lines", |b| {
        b.iter_batched(
            || {
                let mut product = Product::new(SKU);
                let reference = BatchReference::from("warehouse");
                product.add_batch(reference.clone(), SKU, 1_000, None);
                for n in 0..100 {
                    product
                        .allocate(OrderLine::new(format!("order-{n}"), SKU, 10))
                        .unwrap();
                }
                product.take_events();
                (product, reference)
            },
            |(mut product, reference)| {
                product.change_batch_quantity(&reference, 100).unwrap();
                product.take_events()
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_allocate, bench_change_batch_quantity);
criterion_main!(benches);
