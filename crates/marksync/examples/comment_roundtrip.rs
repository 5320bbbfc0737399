//! Walks one comment through its lifecycle on the in-memory document.
//!
//! Run with `RUST_LOG=marksync=debug cargo run -p marksync --example comment_roundtrip`.

use marksync::{
    AnnotationSession, Document, Point, SequentialIdGenerator, SyncConfig, UiEvent,
};
use tracing_subscriber::EnvFilter;

const SETTINGS: &str = r#"
highlight_class = "comment-active"
id_prefix = "comment-"
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SyncConfig::from_toml_str(SETTINGS)?;
    let prefix = config.id_prefix.clone().unwrap_or_default();
    let mut doc = Document::from_paragraphs(&[&["Annotations live ", "inside the document."]]);
    let mut session =
        AnnotationSession::new(config).with_id_generator(SequentialIdGenerator::new(prefix));
    session.subscribe(|change| {
        println!(
            "v{} -> v{}: {:?}",
            change.old_version, change.new_version, change.change_type
        );
    });
    session.attach(&mut doc);
    let root = session.bound_root().ok_or("document has no root element")?;

    // Select "inside" and leave the editor.
    let leaf = doc.text_leaves()[1];
    session.edit(&mut doc, |d| d.select(Point::new(leaf, 0), Point::new(leaf, 6)))?;
    session.dispatch(&mut doc, UiEvent::blur(root))?;
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);

    // Click the comment to resolve it.
    let id = session.active_ids().first().cloned();
    session.dispatch(&mut doc, UiEvent::click(root, id))?;
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);

    let index = session.detach(&mut doc);
    assert!(index.is_empty());
    println!("{}", doc.text_content());
    Ok(())
}
