//! No-mock integration tests for record resolution.
//!
//! Every test writes real database files (and hash stores) to a temporary
//! directory and resolves against them.

use capdb_config::MAX_DEPTH_LIMIT;
use capdb_core::{CapError, ResolveStatus, Resolver, ResolverOptions};
use capdb_store::{store_path_for, StoreWriter};
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Fixture Helpers
// ============================================================================

fn write_db(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write database");
    path
}

fn text_only() -> ResolverOptions {
    ResolverOptions::default().with_hash_store(false)
}

// ============================================================================
// Reference Expansion
// ============================================================================

#[test]
fn three_level_chain_resolves_in_one_source() {
    let dir = tempdir().unwrap();
    let db = write_db(
        &dir,
        "termcap",
        "r1|first:a#1:tc=r2:\n\
         r2:b=two:tc=r3:\n\
         r3:c:a#9:\n",
    );

    let resolution = Resolver::new([&db]).resolve("first").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"r1|first:a#1:b=two:c:a#9:");
    assert_eq!(resolution.status, ResolveStatus::Complete);
    // The nearest definition wins.
    assert_eq!(resolution.record.get_number("a"), Some(1));
    assert!(resolution.record.has_flag("c"));
}

#[test]
fn negation_cancels_inherited_field() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "term:co@:tc=base:\nbase:co#80:am:\n");

    let record = Resolver::new([&db]).resolve("term").unwrap().record;
    assert_eq!(record.as_bytes(), b"term:co@:co#80:am:");
    assert_eq!(record.get_number("co"), None);
    assert!(record.has_flag("am"));
}

#[test]
fn missing_ancestor_is_partial_not_error() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "a:x:tc=ghost:y:\n");

    let resolution = Resolver::new([&db]).resolve("a").unwrap();
    assert!(resolution.is_partial());
    assert_eq!(
        resolution.status,
        ResolveStatus::PartiallyUnresolved {
            missing: vec!["ghost".to_string()]
        }
    );
    // The unresolved reference stays in the record.
    assert_eq!(resolution.record.as_bytes(), b"a:x:tc=ghost:y:");
    assert!(resolution.record.has_flag("y"));
}

#[test]
fn mutual_references_exceed_depth() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "a:tc=b:\nb:tc=a:\n");

    let err = Resolver::new([&db]).resolve("a").unwrap_err();
    match err {
        CapError::CycleExceeded { depth, max, .. } => {
            assert_eq!(max, 32);
            assert_eq!(depth, 33);
        }
        other => panic!("expected CycleExceeded, got {other}"),
    }
}

#[test]
fn mutual_references_at_largest_ceiling_fail_cleanly() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "a:tc=b:\nb:tc=a:\n");

    let resolver =
        Resolver::new([&db]).with_options(text_only().with_max_depth(MAX_DEPTH_LIMIT));
    match resolver.resolve("a").unwrap_err() {
        CapError::CycleExceeded { depth, max, .. } => {
            assert_eq!(max, MAX_DEPTH_LIMIT);
            assert_eq!(depth, MAX_DEPTH_LIMIT + 1);
        }
        other => panic!("expected CycleExceeded, got {other}"),
    }
}

#[test]
fn depth_ceiling_is_configurable() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "a:tc=b:\nb:tc=c:\nc:x:\n");

    let shallow = Resolver::new([&db]).with_options(text_only().with_max_depth(1));
    assert!(matches!(
        shallow.resolve("a"),
        Err(CapError::CycleExceeded { .. })
    ));

    let enough = Resolver::new([&db]).with_options(text_only().with_max_depth(2));
    assert_eq!(enough.resolve("a").unwrap().record.as_bytes(), b"a:x:");
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn first_source_wins_and_references_search_forward() {
    let dir = tempdir().unwrap();
    let local = write_db(&dir, "local", "vt|mine:co#132:tc=base:\n");
    let system = write_db(&dir, "system", "vt:co#80:\nbase:am:\n");

    let resolver = Resolver::new([&local, &system]);
    let resolution = resolver.resolve("vt").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"vt|mine:co#132:am:");
}

#[test]
fn references_never_search_earlier_sources() {
    let dir = tempdir().unwrap();
    let first = write_db(&dir, "first", "b:early:\n");
    let second = write_db(&dir, "second", "a:tc=b:\n");

    let resolution = Resolver::new([&first, &second]).resolve("a").unwrap();
    assert!(resolution.is_partial());
    assert_eq!(resolution.record.as_bytes(), b"a:tc=b:");
}

#[test]
fn unopenable_sources_are_skipped() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let db = write_db(&dir, "termcap", "x:ok:\n");

    let resolution = Resolver::new([&missing, &db]).resolve("x").unwrap();
    assert!(resolution.record.has_flag("ok"));
}

#[test]
fn not_found_after_every_source() {
    let dir = tempdir().unwrap();
    let one = write_db(&dir, "one", "a:x:\n");
    let two = write_db(&dir, "two", "b:y:\n");

    let err = Resolver::new([&one, &two]).resolve("c").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn empty_source_list_is_not_found() {
    let resolver = Resolver::new(Vec::<PathBuf>::new());
    assert!(resolver.resolve("anything").unwrap_err().is_not_found());
}

#[test]
fn read_failure_is_fatal() {
    let dir = tempdir().unwrap();
    // A directory opens but cannot be read as a file.
    let unreadable = dir.path().to_path_buf();
    let db = write_db(&dir, "termcap", "x:ok:\n");

    let err = Resolver::new([&unreadable, &db])
        .with_options(text_only())
        .resolve("x")
        .unwrap_err();
    assert!(err.is_system(), "unexpected error: {err}");
}

// ============================================================================
// Scanning
// ============================================================================

#[test]
fn continuation_lines_join_into_one_record() {
    let dir = tempdir().unwrap();
    let db = write_db(
        &dir,
        "termcap",
        "# terminals\n\
         vt|vt100|dec vt100:\\\n\
         \t:co#80:li#24:\\\n\
         \t:cl=\\E[H\\E[2J:\n",
    );

    let record = Resolver::new([&db]).resolve("dec vt100").unwrap().record;
    assert_eq!(record.as_bytes(), b"vt|vt100|dec vt100:co#80:li#24:cl=\\E[H\\E[2J:");
    assert_eq!(record.extract_string("cl").unwrap(), b"\\E[H\\E[2J");
    assert_eq!(record.get_string("cl").unwrap(), b"\x1b[H\x1b[2J");
}

#[test]
fn last_record_without_newline_is_found() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "a:x:\nlast:y:");

    let record = Resolver::new([&db]).resolve("last").unwrap().record;
    assert_eq!(record.as_bytes(), b"last:y:");
}

#[test]
fn long_records_cross_buffer_boundaries() {
    let dir = tempdir().unwrap();
    let value = "z".repeat(20_000);
    let db = write_db(&dir, "termcap", &format!("big:s={value}:tc=small:\nsmall:t:\n"));

    let record = Resolver::new([&db]).resolve("big").unwrap().record;
    assert_eq!(record.extract_string("s").unwrap().len(), 20_000);
    assert!(record.has_flag("t"));
}

// ============================================================================
// Hash Stores
// ============================================================================

#[test]
fn hash_store_answers_before_flat_text() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "x:from=text:\n");
    let mut writer = StoreWriter::new();
    writer.insert_record("x", b"x:from=store:", false).unwrap();
    writer.write(&store_path_for(&db)).unwrap();

    let from_store = Resolver::new([&db]).resolve("x").unwrap();
    assert_eq!(from_store.record.as_bytes(), b"x:from=store:");

    let from_text = Resolver::new([&db]).with_options(text_only()).resolve("x").unwrap();
    assert_eq!(from_text.record.as_bytes(), b"x:from=text:");
}

#[test]
fn hash_store_error_marker_makes_result_partial() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "");
    let mut writer = StoreWriter::new();
    writer.insert_record("y", b"y:a:", true).unwrap();
    writer.insert_shadow("why", "y").unwrap();
    writer.write(&store_path_for(&db)).unwrap();

    let resolution = Resolver::new([&db]).resolve("why").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"y:a:");
    assert_eq!(
        resolution.status,
        ResolveStatus::PartiallyUnresolved { missing: vec![] }
    );
}

#[test]
fn hash_store_miss_moves_to_next_source() {
    let dir = tempdir().unwrap();
    let first = write_db(&dir, "first", "q:in=text:\n");
    let second = write_db(&dir, "second", "q:in=second:\n");
    let mut writer = StoreWriter::new();
    writer.insert_record("other", b"other:", false).unwrap();
    writer.write(&store_path_for(&first)).unwrap();

    let resolution = Resolver::new([&first, &second]).resolve("q").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"q:in=second:");
}

#[test]
fn unexpanded_store_records_resolve_within_the_store() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "b:from=text:\n");
    let mut writer = StoreWriter::new();
    writer.insert_record("a", b"a:x:tc=b:", false).unwrap();
    writer.insert_record("b", b"b:y:tc=c:", false).unwrap();
    writer.insert_record("c", b"c:z:", false).unwrap();
    writer.write(&store_path_for(&db)).unwrap();

    let resolution = Resolver::new([&db]).resolve("a").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"a:x:y:z:");
}

#[test]
fn corrupt_hash_store_falls_back_to_text() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "x:from=text:\n");
    fs::write(store_path_for(&db), b"definitely not a store").unwrap();

    let resolution = Resolver::new([&db]).resolve("x").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"x:from=text:");
}

#[test]
fn mkdb_output_resolves_like_text() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "t|term:co#80:tc=b:\nb:am:bs:\n");
    capdb_core::build_store(&db, None, 32).unwrap();

    let text = Resolver::new([&db]).with_options(text_only()).resolve("term").unwrap();
    let store = Resolver::new([&db]).resolve("term").unwrap();
    assert_eq!(text.record, store.record);
    assert_eq!(store.status, ResolveStatus::Complete);
}

// ============================================================================
// Override Record and Listing
// ============================================================================

#[test]
fn override_record_expands_against_sources() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "mine:co#80:\nbase:am:\n");

    let options = text_only().with_top_record("mine:co#100:tc=base:");
    let resolution = Resolver::new([&db]).with_options(options).resolve("mine").unwrap();
    assert_eq!(resolution.record.as_bytes(), b"mine:co#100:am:");
}

#[test]
fn names_lists_first_alias_per_record() {
    let dir = tempdir().unwrap();
    let one = write_db(&dir, "one", "# c\na|alpha:x:\nb|beta:y:\n");
    let two = write_db(&dir, "two", "b:z:\nc:w:\n");

    let names = Resolver::new([&one, &two]).names().unwrap();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn one_resolver_serves_many_threads() {
    let dir = tempdir().unwrap();
    let db = write_db(&dir, "termcap", "a:x:tc=b:\nb:y:tc=c:\nc:z:\n");
    let resolver = Resolver::new([&db]);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| resolver.resolve("a").unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().record.as_bytes(), b"a:x:y:z:");
        }
    });
}
