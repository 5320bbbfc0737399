use marksync::{
    AnnotationSession, Document, DocumentEngine, ListenerKind, Point, SequentialIdGenerator,
    SyncConfig, UiEvent,
};

fn attached(doc: &mut Document) -> AnnotationSession {
    let mut session = AnnotationSession::new(SyncConfig::default())
        .with_id_generator(SequentialIdGenerator::new("c"));
    session.attach(doc);
    session
}

#[test]
fn test_attach_binds_three_listeners() {
    let mut doc = Document::new();
    let session = attached(&mut doc);
    let root = doc.root_element().unwrap();

    assert_eq!(session.bound_root(), Some(root));
    for kind in ListenerKind::ALL {
        assert_eq!(doc.listener_count(root, kind), 1);
    }
    assert_eq!(doc.total_listeners(), 3);
}

#[test]
fn test_root_replacement_moves_all_listeners() {
    let mut doc = Document::new();
    let mut session = attached(&mut doc);
    let first = doc.root_element().unwrap();

    for _ in 0..3 {
        doc.replace_root_element();
        session.on_root_changed(&mut doc);
    }
    let current = doc.root_element().unwrap();

    assert_eq!(session.bound_root(), Some(current));
    assert_eq!(doc.total_listeners(), 3);
    for kind in ListenerKind::ALL {
        assert_eq!(doc.listener_count(first, kind), 0);
        assert_eq!(doc.listener_count(current, kind), 1);
    }

    // Repeated notifications for the same root never duplicate bindings.
    session.on_root_changed(&mut doc);
    session.on_root_changed(&mut doc);
    assert_eq!(doc.total_listeners(), 3);
}

#[test]
fn test_events_from_previous_root_are_ignored() {
    let mut doc = Document::from_text("Hello world");
    let leaf = doc.text_leaves()[0];
    let mut session = attached(&mut doc);
    let old_root = doc.root_element().unwrap();
    let (new_root, _) = doc.replace_root_element();
    session.on_root_changed(&mut doc);

    session
        .edit(&mut doc, |d| d.select(Point::new(leaf, 0), Point::new(leaf, 5)))
        .unwrap();
    session.dispatch(&mut doc, UiEvent::blur(old_root)).unwrap();
    assert!(session.index().is_empty());

    session.dispatch(&mut doc, UiEvent::blur(new_root)).unwrap();
    assert_eq!(session.index().annotation_count(), 1);
}

#[test]
fn test_unmount_and_teardown_leave_nothing_bound() {
    let mut doc = Document::new();
    let mut session = attached(&mut doc);

    doc.unmount_root_element();
    session.on_root_changed(&mut doc);
    assert_eq!(session.bound_root(), None);
    assert_eq!(doc.total_listeners(), 0);

    doc.replace_root_element();
    session.on_root_changed(&mut doc);
    assert_eq!(doc.total_listeners(), 3);

    session.detach(&mut doc);
    assert_eq!(doc.total_listeners(), 0);
}
