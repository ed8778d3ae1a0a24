use hexpatch::core::{Address, Patch};
use hexpatch::editor::annotations::AnnotationField;
use hexpatch::{ImportError, Session};

#[test]
fn test_patch_export_mirrors_persisted_format() {
    let mut session = Session::open("demo.bin", "554889e5", None);
    session.apply_patch(2, 0x90).unwrap();
    session.apply_patch(0, 0xff).unwrap();

    let exported = session.export_patches().unwrap();
    let patches: Vec<Patch> = serde_json::from_str(&exported).unwrap();
    assert_eq!(patches, vec![Patch::new(0, 0xff), Patch::new(2, 0x90)]);
    assert!(exported.contains(r#""value": "FF""#));
}

#[test]
fn test_import_through_session_is_atomic_and_undoable() {
    let mut session = Session::open("demo.bin", "554889e5", None);
    session.apply_patch(0, 0x11).unwrap();

    let err = session
        .import_patches(r#"[{"offset":1,"value":"aa"},{"offset":9,"value":"bb"}]"#)
        .unwrap_err();
    assert!(matches!(err, ImportError::InvalidEntry { index: 1, .. }));
    assert_eq!(session.overlay().serialize(), vec![Patch::new(0, 0x11)]);

    let applied = session
        .import_patches(r#"[{"offset":1,"value":"aa"}]"#)
        .unwrap();
    assert_eq!(applied, 1);
    assert_eq!(session.overlay().serialize(), vec![Patch::new(1, 0xaa)]);

    assert!(session.undo_patch());
    assert_eq!(session.overlay().serialize(), vec![Patch::new(0, 0x11)]);
}

#[test]
fn test_annotation_flow_through_session() {
    let mut session = Session::open("demo.bin", "554889e5", None);

    session.stage_annotation(Address::new("0x1000"), AnnotationField::Label, "entry");
    assert!(session.commit_staged_annotation());
    session.set_comment(Address::new("0x1000"), "prologue");

    let export = session.export_annotations(|address| {
        (address.as_str() == "0x1000").then(|| "push rbp".to_string())
    });
    assert_eq!(export.annotations.len(), 1);
    assert_eq!(export.annotations[0].label, "entry");
    assert_eq!(export.annotations[0].comment, "prologue");
    assert_eq!(export.annotations[0].instruction, "push rbp");

    assert!(session.undo_annotation());
    let export = session.export_annotations(|_| None);
    assert_eq!(export.annotations[0].comment, "");
    assert_eq!(export.annotations[0].label, "entry");
}

#[test]
fn test_conflict_flow_through_session() {
    let mut session = Session::open("demo.bin", "554889e5", None);
    session.set_label(Address::new("0x1"), "dup");
    session.set_label(Address::new("0x2"), "dup");

    let conflicts = session.annotations().detect_conflicts();
    assert_eq!(conflicts.len(), 1);

    assert_eq!(session.resolve_label_conflict("dup"), 1);
    assert!(session.annotations().detect_conflicts().is_empty());

    assert!(session.undo_annotation());
    assert_eq!(session.annotations().detect_conflicts().len(), 1);
}

#[test]
fn test_open_file_through_hex_source() -> anyhow::Result<()> {
    use hexpatch::source::{FileHexSource, HexSource, SourceLimits};
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(&[0x55, 0x48, 0x89, 0xe5, 0x90, 0x90])?;
    file.flush()?;

    let source = FileHexSource::with_limits(SourceLimits {
        max_file_size: 1024,
        max_bytes: 4,
    });
    let loaded = source.load_hex(file.path())?;
    assert!(loaded.truncated);

    let mut session = hexpatch::Session::open_file(file.path(), &source, None)?;
    assert_eq!(session.len(), 4);
    assert_eq!(session.effective_byte(0)?, 0x55);

    session.apply_patch(0, 0xff)?;
    let report = session.export_diff_report();
    assert_eq!(report.original_size, 6);
    assert!(report.truncated);
    assert_eq!(report.byte_length, 4);
    Ok(())
}

#[test]
fn test_effective_view_reaches_the_rendering_boundary() {
    let mut session = Session::open("demo.bin", "554889e5", None);
    session.apply_patch(1, 0x90).unwrap();

    // The rendering layer reads effective bytes and the serialized ledger
    let visible: Vec<u8> = (0..session.len())
        .map(|offset| session.effective_byte(offset).unwrap())
        .collect();
    assert_eq!(visible, vec![0x55, 0x90, 0x89, 0xe5]);
    assert!(session.overlay().is_patched(1));
    assert!(!session.overlay().is_patched(0));
}
