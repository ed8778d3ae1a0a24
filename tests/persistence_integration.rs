use std::sync::Arc;

use hexpatch::core::{Address, Patch};
use hexpatch::persist::{DirectoryStore, FilePersistence, KeyValueStore, LayoutConfig, MemoryStore};
use hexpatch::Session;

fn memory_persistence(file: &str) -> (Arc<MemoryStore>, FilePersistence) {
    let store = Arc::new(MemoryStore::new());
    let persistence = FilePersistence::new(store.clone(), file);
    (store, persistence)
}

#[test]
fn test_session_state_survives_reopen() {
    let (store, persistence) = memory_persistence("demo.bin");

    {
        let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
        session.apply_patch(0, 0xff).unwrap();
        session.set_label(Address::new("0x1000"), "entry");
        session.add_bookmark(2).unwrap();
        session.set_layout(LayoutConfig {
            columns: 32,
            word: 2,
        });
    }

    let persistence = FilePersistence::new(store, "demo.bin");
    let session = Session::open("demo.bin", "554889e5", Some(persistence));
    assert_eq!(session.effective_byte(0).unwrap(), 0xff);
    assert_eq!(
        session.annotations().label(&Address::new("0x1000")),
        Some("entry")
    );
    assert!(session.bookmarks().contains(2));
    assert_eq!(session.layout().columns, 32);
    assert_eq!(session.layout().word, 2);
}

#[test]
fn test_reopen_does_not_resurrect_undo_history() {
    let (store, persistence) = memory_persistence("demo.bin");
    {
        let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
        session.apply_patch(0, 0xff).unwrap();
        assert!(session.overlay().can_undo());
    }

    let persistence = FilePersistence::new(store, "demo.bin");
    let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
    assert_eq!(session.effective_byte(0).unwrap(), 0xff);
    assert!(!session.overlay().can_undo());
    assert!(!session.undo_patch());
}

#[test]
fn test_persisted_key_layout() {
    let (store, persistence) = memory_persistence("demo.bin");
    let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
    session.apply_patch(1, 0x90).unwrap();
    session.set_comment(Address::new("0x4"), "note");
    session.add_bookmark(0).unwrap();
    session.set_layout(LayoutConfig {
        columns: 24,
        word: 4,
    });

    assert_eq!(
        store.get("r2-patches-demo.bin").unwrap().as_deref(),
        Some(r#"[{"offset":1,"value":"90"}]"#)
    );
    assert_eq!(
        store.get("r2-annotations-demo.bin").unwrap().as_deref(),
        Some(r#"{"0x4":{"comment":"note"}}"#)
    );
    assert_eq!(
        store.get("r2-bookmarks-demo.bin").unwrap().as_deref(),
        Some("[0]")
    );
    assert_eq!(
        store
            .get("r2-hex-layout-demo.bin-columns")
            .unwrap()
            .as_deref(),
        Some("24")
    );
    assert_eq!(
        store.get("r2-hex-layout-demo.bin-word").unwrap().as_deref(),
        Some("4")
    );
}

#[test]
fn test_corrupt_persisted_state_falls_back_to_empty() {
    let (store, persistence) = memory_persistence("demo.bin");
    store.set("r2-patches-demo.bin", "{{{{").unwrap();
    store.set("r2-annotations-demo.bin", "[1,2,3]").unwrap();
    store.set("r2-bookmarks-demo.bin", "nope").unwrap();

    let session = Session::open("demo.bin", "554889e5", Some(persistence));
    assert_eq!(session.overlay().patch_count(), 0);
    assert!(session.annotations().is_empty());
    assert!(session.bookmarks().is_empty());
}

#[test]
fn test_persisted_patches_for_a_shrunken_file_are_dropped() {
    let (store, persistence) = memory_persistence("demo.bin");
    {
        let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
        session.apply_patch(3, 0xff).unwrap();
        session.apply_patch(0, 0x11).unwrap();
    }

    // Reopen with a shorter source: only the in-range patch survives
    let persistence = FilePersistence::new(store, "demo.bin");
    let session = Session::open("demo.bin", "5548", Some(persistence));
    assert_eq!(session.overlay().serialize(), vec![Patch::new(0, 0x11)]);
}

#[test]
fn test_sessions_on_different_files_do_not_collide() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let mut first = Session::open(
        "a.bin",
        "5548",
        Some(FilePersistence::new(store.clone(), "a.bin")),
    );
    let mut second = Session::open(
        "b.bin",
        "5548",
        Some(FilePersistence::new(store.clone(), "b.bin")),
    );

    first.apply_patch(0, 0xaa).unwrap();
    second.apply_patch(0, 0xbb).unwrap();

    let reopened_first = Session::open(
        "a.bin",
        "5548",
        Some(FilePersistence::new(store.clone(), "a.bin")),
    );
    let reopened_second = Session::open("b.bin", "5548", Some(FilePersistence::new(store, "b.bin")));
    assert_eq!(reopened_first.effective_byte(0).unwrap(), 0xaa);
    assert_eq!(reopened_second.effective_byte(0).unwrap(), 0xbb);
}

#[test]
fn test_directory_store_round_trip_on_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(DirectoryStore::open(dir.path())?);

    {
        let persistence = FilePersistence::new(store.clone(), "demo.bin");
        let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
        session.apply_patch(0, 0xff)?;
        session.set_label(Address::new("0x0"), "start");
    }

    let persistence = FilePersistence::new(store, "demo.bin");
    let session = Session::open("demo.bin", "554889e5", Some(persistence));
    assert_eq!(session.effective_byte(0)?, 0xff);
    assert_eq!(
        session.annotations().label(&Address::new("0x0")),
        Some("start")
    );
    Ok(())
}

#[test]
fn test_snapshots_persist_per_file() {
    let (store, persistence) = memory_persistence("demo.bin");
    let snapshot_id = {
        let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
        session.apply_patch(0, 0xff).unwrap();
        session.save_snapshot("strategy-a").id
    };

    let persistence = FilePersistence::new(store, "demo.bin");
    let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
    assert_eq!(session.snapshots().len(), 1);
    let snapshot = session.snapshots()[0].clone();
    assert_eq!(snapshot.id, snapshot_id);
    assert_eq!(snapshot.name, "strategy-a");

    session.clear_patches();
    session.apply_snapshot(&snapshot);
    assert_eq!(session.effective_byte(0).unwrap(), 0xff);
}

#[test]
fn test_reload_invalidates_history_but_keeps_persisted_patches() {
    let (_, persistence) = memory_persistence("demo.bin");
    let mut session = Session::open("demo.bin", "554889e5", Some(persistence));
    session.apply_patch(0, 0xff).unwrap();
    assert!(session.overlay().can_undo());

    session.reload("554889e5");
    assert!(!session.overlay().can_undo());
    assert_eq!(session.effective_byte(0).unwrap(), 0xff);
}
