use criterion::{criterion_group, Criterion};
use commonware_utils::NZU64;
use tuplestore_table::{
    map::{mem::Map, Map as _},
    reader::{partitions, Reader},
    row::{self, Row},
    schema::{Column, Schema},
    value::Type,
};

const ENTRIES: u64 = 50_000;

fn bench_partitions(c: &mut Criterion) {
    let schema = Schema::new(vec![Column::new(0, "id", Type::Uint)]).unwrap();
    let map = Map::from_entries(
        Default::default(),
        (0..ENTRIES).map(|i| row::encode(&Row::new().with(0, i), 4, &schema).unwrap()),
    );
    for parts in [1, 4, 16, 64] {
        let parts = NZU64!(parts);
        c.bench_function(&format!("{}/parts={}", module_path!(), parts), |b| {
            b.iter(|| {
                partitions(map.len(), parts)
                    .into_iter()
                    .map(|(start, end)| {
                        Reader::open_partition(&map, &schema, start, end)
                            .unwrap()
                            .count()
                    })
                    .sum::<usize>()
            })
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_partitions
}
