use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use marksync::{
    AnnotationId, AnnotationSession, Document, DocumentEngine, IdIndex, NodeKey, NodeMutation,
    Point, SequentialIdGenerator, SyncConfig, apply_mutations,
};

fn large_document(paragraphs: usize) -> Document {
    let lines: Vec<String> = (0..paragraphs)
        .map(|i| format!("{i:06} the quick brown fox jumps over the lazy dog (marksync benchmark)"))
        .collect();
    Document::from_text(&lines.join("\n"))
}

fn bench_index_sync(c: &mut Criterion) {
    let ids: Vec<AnnotationId> = (0..64)
        .map(|i| AnnotationId::new(format!("c{i}")))
        .collect();
    c.bench_function("index/sync_10k_keys", |b| {
        b.iter(|| {
            let mut index = IdIndex::new();
            for key in 0..10_000u64 {
                let slot = (key % 64) as usize;
                let end = (slot + 3).min(ids.len());
                index.sync_key(NodeKey(key), &ids[slot..end]);
            }
            black_box(index.annotation_count());
        })
    });
}

fn wrapped_document(paragraphs: usize) -> (Document, Vec<NodeMutation>) {
    let mut doc = large_document(paragraphs);
    let leaves = doc.text_leaves();
    let (_, mutations) = doc
        .update(|d| {
            for (i, leaf) in leaves.iter().enumerate() {
                d.wrap_node(*leaf, vec![AnnotationId::new(format!("c{}", i % 50))])?;
            }
            Ok(())
        })
        .expect("wrap");
    (doc, mutations)
}

fn bench_bridge_batch(c: &mut Criterion) {
    let (wrapped, created) = wrapped_document(2_000);
    // Same keys as `wrapped`, with every marker unwrapped again.
    let (mut unwrapped, _) = wrapped_document(2_000);
    let markers = unwrapped.marker_keys();
    let (_, destroyed) = unwrapped
        .update(|d| {
            for marker in &markers {
                d.unwrap_marker(*marker)?;
            }
            Ok(())
        })
        .expect("unwrap");

    c.bench_function("bridge/create_then_destroy_2k_markers", |b| {
        b.iter(|| {
            let mut index = IdIndex::new();
            apply_mutations(&mut index, &wrapped, black_box(&created));
            apply_mutations(&mut index, &unwrapped, black_box(&destroyed));
            black_box(index.is_empty());
        })
    });
}

fn bench_commit_selection(c: &mut Criterion) {
    let template = large_document(2_000);
    c.bench_function("session/100_commits", |b| {
        b.iter_batched(
            || {
                let mut doc = Document::from_text(&template.text_content());
                let mut session = AnnotationSession::new(SyncConfig::default())
                    .with_id_generator(SequentialIdGenerator::new("c"));
                session.attach(&mut doc);
                (doc, session)
            },
            |(mut doc, mut session)| {
                let leaves = doc.text_leaves();
                for leaf in leaves.iter().step_by(20).take(100) {
                    session
                        .edit(&mut doc, |d| d.select(Point::new(*leaf, 7), Point::new(*leaf, 16)))
                        .expect("select");
                    session.commit_selection(&mut doc).expect("commit");
                }
                black_box(session.index().annotation_count());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_index_sync,
    bench_bridge_batch,
    bench_commit_selection
);
criterion_main!(benches);
