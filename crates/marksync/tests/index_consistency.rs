use marksync::{
    AnnotationId, AnnotationSession, Document, DocumentEngine, NodeKey, NodeKind, Point,
    SequentialIdGenerator, SyncConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

const WORDS: &[&str] = &["lorem ", "ipsum ", "dolor ", "sit ", "amet", "", "x"];

fn random_point(rng: &mut StdRng, doc: &Document, leaves: &[NodeKey]) -> Point {
    let key = leaves[rng.gen_range(0..leaves.len())];
    let len = doc.text(key).map(|t| t.chars().count()).unwrap_or(0);
    Point::new(key, rng.gen_range(0..=len))
}

fn adjacent_markers(doc: &Document) -> Vec<(NodeKey, NodeKey)> {
    doc.marker_keys()
        .into_iter()
        .filter_map(|m| {
            let next = doc.next_sibling(m)?;
            doc.marker_ids(next).map(|_| (m, next))
        })
        .collect()
}

fn paragraphs(doc: &Document) -> Vec<NodeKey> {
    doc.children(doc.root())
        .iter()
        .copied()
        .filter(|k| matches!(doc.kind(*k), Some(NodeKind::Paragraph)))
        .collect()
}

/// Every element carrying the highlight class belongs to an active annotation, and every node
/// of an active annotation carries it.
fn assert_activation_symmetry(session: &AnnotationSession, doc: &Document) {
    let mut expected = BTreeSet::new();
    for id in session.active_ids() {
        if let Some(keys) = session.index().keys_for_id(id) {
            expected.extend(keys.iter().copied());
        }
    }
    assert_eq!(doc.elements_with_class("selected"), expected);
}

fn run(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut doc = Document::from_paragraphs(&[
        &["The quick ", "brown fox"],
        &["jumps over ", "the lazy ", "dog"],
        &["and runs away"],
    ]);
    let mut session = AnnotationSession::new(SyncConfig::default())
        .with_id_generator(SequentialIdGenerator::new("c"));
    session.attach(&mut doc);

    for step in 0..steps {
        let leaves = doc.text_leaves();
        match rng.gen_range(0..8) {
            // Select a range and commit it.
            0..=2 if !leaves.is_empty() => {
                let anchor = random_point(&mut rng, &doc, &leaves);
                let focus = random_point(&mut rng, &doc, &leaves);
                session
                    .edit(&mut doc, |d| d.select(anchor, focus))
                    .unwrap();
                session.commit_selection(&mut doc).unwrap();
            }
            // Move the caret.
            3 if !leaves.is_empty() => {
                let caret = random_point(&mut rng, &doc, &leaves);
                session
                    .edit(&mut doc, |d| d.select_collapsed(caret))
                    .unwrap();
            }
            // Resolve a known annotation.
            4 => {
                let known: Vec<AnnotationId> =
                    session.index().annotation_ids().cloned().collect();
                if !known.is_empty() {
                    let id = known[rng.gen_range(0..known.len())].clone();
                    assert_eq!(session.resolve(&mut doc, &id), Ok(true));
                    assert!(!session.index().contains(&id));
                }
            }
            // Delete a text node.
            5 if leaves.len() > 2 => {
                let key = leaves[rng.gen_range(0..leaves.len())];
                session.edit(&mut doc, |d| d.remove_node(key)).unwrap();
            }
            // Rewrite or append text.
            6 => {
                let word = WORDS[rng.gen_range(0..WORDS.len())];
                if !leaves.is_empty() && rng.gen_bool(0.5) {
                    let key = leaves[rng.gen_range(0..leaves.len())];
                    session.edit(&mut doc, |d| d.set_text(key, word)).unwrap();
                } else {
                    let targets = paragraphs(&doc);
                    let parent = targets[rng.gen_range(0..targets.len())];
                    session
                        .edit(&mut doc, |d| d.append_text(parent, word))
                        .unwrap();
                }
            }
            // Explicitly coalesce two neighbouring markers.
            7 => {
                let pairs = adjacent_markers(&doc);
                if !pairs.is_empty() {
                    let (to, from) = pairs[rng.gen_range(0..pairs.len())];
                    session
                        .edit(&mut doc, |d| d.coalesce_markers(to, from))
                        .unwrap();
                }
            }
            _ => {}
        }

        if let Err(err) = session.verify(&doc) {
            panic!("seed {seed}, step {step}: {err}");
        }
        assert!(session.index().validate().is_ok());
        assert_activation_symmetry(&session, &doc);
    }

    let text_before = doc.text_content();
    let known: Vec<AnnotationId> = session.index().annotation_ids().cloned().collect();
    for id in &known {
        session.resolve(&mut doc, id).unwrap();
    }
    assert!(session.index().is_empty());
    assert!(doc.marker_keys().is_empty());
    assert_eq!(doc.text_content(), text_before);

    let index = session.detach(&mut doc);
    assert!(index.is_empty());
    assert_eq!(doc.total_listeners(), 0);
}

#[test]
fn test_random_edit_sequences_keep_index_consistent() {
    for seed in [1, 7, 42, 1337] {
        run(seed, 250);
    }
}

#[test]
fn test_repeated_destroy_is_noop() {
    let mut doc = Document::from_paragraphs(&[&["ab", "cd"]]);
    let leaves = doc.text_leaves();
    let mut session = AnnotationSession::new(SyncConfig::default());
    session.attach(&mut doc);

    let marker = session
        .edit(&mut doc, |d| d.wrap_node(leaves[0], vec![AnnotationId::from("a")]))
        .unwrap();
    session.edit(&mut doc, |d| d.unwrap_marker(marker)).unwrap();
    assert!(session.index().is_empty());

    let destroyed = [marksync::NodeMutation::new(marker, marksync::MutationKind::Destroyed)];
    let first = session.reconcile(&mut doc, &destroyed);
    let second = session.reconcile(&mut doc, &destroyed);
    assert!(!first.index_changed());
    assert!(!second.index_changed());
    assert!(session.index().is_empty());
}
