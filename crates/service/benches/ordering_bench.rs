use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use uuid::Uuid;

use service::taxonomy::domain::{CategoryBulkSync, CategoryUpsert, NewCategory, NewCluster, TranslationEntry};
use service::taxonomy::ordering::{OrderedScope, Slot};
use service::taxonomy::repo::MemoryTaxonomyStore;
use service::taxonomy::{TaxonomyService, TranslationResolver};

fn en(name: &str) -> Vec<TranslationEntry> {
    vec![TranslationEntry { language_code: "en".into(), name: name.into(), description: None }]
}

fn bench_scope(c: &mut Criterion) {
    let ids: Vec<Uuid> = (0..500).map(|_| Uuid::new_v4()).collect();
    let mut reversed = ids.clone();
    reversed.reverse();

    c.bench_function("ordered_scope_reorder_500", |b| {
        b.iter_batched(
            || OrderedScope::from_ids(ids.clone()),
            |mut scope| scope.reorder(black_box(&reversed)).map(|_| scope.len()),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("ordered_scope_arrange_500", |b| {
        b.iter(|| {
            let slots = ids.iter().enumerate().map(|(i, id)| {
                let slot = match i % 3 {
                    0 => Slot::Requested((i / 2) as u32),
                    1 => Slot::Current(i as u32),
                    _ => Slot::Append,
                };
                (*id, slot)
            });
            black_box(OrderedScope::arrange(slots))
        })
    });
}

fn bench_bulk_sync(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let svc = TaxonomyService::new(Arc::new(MemoryTaxonomyStore::new()), TranslationResolver::default());
    let (cluster_id, ids) = rt.block_on(async {
        let cluster = svc
            .create_cluster(NewCluster { icon: String::new(), is_active: true, translations: en("Bench") })
            .await
            .expect("cluster");
        let mut ids = Vec::new();
        for i in 0..50 {
            let cat = svc
                .create_category(NewCategory {
                    icon: String::new(),
                    order_in_cluster: None,
                    cluster_id: Some(cluster.id),
                    translations: en(&format!("cat-{i}")),
                })
                .await
                .expect("category");
            ids.push(cat.id);
        }
        (cluster.id, ids)
    });

    let (svc, ids) = (&svc, &ids);
    c.bench_function("sync_categories_reverse_50", |b| {
        b.to_async(&rt).iter(|| async move {
            let categories = ids
                .iter()
                .rev()
                .enumerate()
                .map(|(i, id)| CategoryUpsert {
                    id: Some(*id),
                    icon: None,
                    order_in_cluster: Some(i as u32),
                    translations: en("renamed"),
                })
                .collect();
            let input = CategoryBulkSync { categories, remove_category_ids: vec![], expected_version: None };
            black_box(svc.sync_categories(cluster_id, input).await.expect("sync"))
        })
    });
}

criterion_group!(benches, bench_scope, bench_bulk_sync);
criterion_main!(benches);
