use criterion::{black_box, criterion_group, criterion_main, Criterion};
use opforge::*;

fn mixed_batch() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::new(WRITE, "name").param("value", "ada"),
        OperationDescriptor::new(INCR, "visits").param("value", 1i64),
        OperationDescriptor::new(LIST_APPEND, "scores").param("value", 97i64),
        OperationDescriptor::new(LIST_GET_BY_RANK_RANGE, "scores")
            .param("rank", -3i64)
            .param("count", 3i64)
            .param("returnType", 7i64),
        OperationDescriptor::new(MAP_PUT, "attrs")
            .param("key", "city")
            .param("value", "oslo")
            .param(
                "policy",
                Value::Map(vec![(Value::Str("order".into()), Value::Int(1))]),
            ),
        OperationDescriptor::new(BIT_COUNT, "flags")
            .param("bitOffset", 0i64)
            .param("bitSize", 64i64),
        OperationDescriptor::new(HLL_ADD, "uniques")
            .param("values", Value::List(vec![Value::Str("u1".into())]))
            .param("indexBits", 12i64),
        OperationDescriptor::new(READ, "name"),
    ]
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_mixed_batch", |b| {
        b.iter(|| {
            let _ = OperationCompiler::compile(black_box(mixed_batch()));
        })
    });

    let entries = vec![
        ExpressionEntry {
            op: 1,
            string_val: Some("visits".into()),
            ..Default::default()
        },
        ExpressionEntry {
            op: 2,
            int_val: Some(10),
            ..Default::default()
        },
        ExpressionEntry {
            op: 3,
            count: Some(2),
            ..Default::default()
        },
    ];
    c.bench_function("compile_expression", |b| {
        b.iter(|| {
            let _ = ExpressionCompiler::compile(black_box(entries.clone()));
        })
    });

    let path = CdtContextPath::from_steps(vec![
        CdtContextStep::MapKey {
            key: Value::Str("inner".into()),
            create: CdtModifier::CreateUnordered,
        },
        CdtContextStep::ListIndex {
            index: -1,
            create: CdtModifier::None,
        },
    ]);
    let encoded = path.to_base64();
    c.bench_function("context_base64_decode", |b| {
        b.iter(|| {
            let _ = CdtContextPath::from_base64(black_box(&encoded), 16);
        })
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
