use hashkeep::storage::{Database, FileRecord};

fn make_record(fingerprint: &str, path: &str, size: i64, modified_at: i64) -> FileRecord {
    FileRecord {
        fingerprint: fingerprint.to_string(),
        path: path.to_string(),
        file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
        file_size: size,
        modified_at,
        seen_flag: true,
    }
}

#[test]
fn test_upsert_and_lookup() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 5, 1000)).unwrap();

    let record = db.get_by_fingerprint("aaa").unwrap().unwrap();
    assert_eq!(record.path, "/data/a.txt");
    assert_eq!(record.file_name, "a.txt");
    assert_eq!(record.file_size, 5);
    assert_eq!(record.modified_at, 1000);
    assert!(record.seen_flag);

    let by_path = db.get_by_path("/data/a.txt").unwrap().unwrap();
    assert_eq!(by_path.fingerprint, "aaa");

    assert!(db.get_by_fingerprint("zzz").unwrap().is_none());
}

#[test]
fn test_upsert_same_fingerprint_moves_path() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 5, 1000)).unwrap();
    db.upsert_file(&make_record("aaa", "/data/b.txt", 5, 2000)).unwrap();

    assert_eq!(db.count_files().unwrap(), 1);
    let record = db.get_by_fingerprint("aaa").unwrap().unwrap();
    assert_eq!(record.path, "/data/b.txt");
    assert!(db.get_by_path("/data/a.txt").unwrap().is_none());
}

#[test]
fn test_upsert_new_fingerprint_replaces_record_for_path() {
    // A file whose content changed gets a new fingerprint; the old record
    // for that path must not survive alongside it.
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("old", "/data/a.txt", 5, 1000)).unwrap();
    db.upsert_file(&make_record("new", "/data/a.txt", 7, 2000)).unwrap();

    assert_eq!(db.count_files().unwrap(), 1);
    assert!(db.get_by_fingerprint("old").unwrap().is_none());
    let record = db.get_by_path("/data/a.txt").unwrap().unwrap();
    assert_eq!(record.fingerprint, "new");
}

#[test]
fn test_stale_mark_and_sweep() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 1, 1)).unwrap();
    db.upsert_file(&make_record("bbb", "/data/b.txt", 2, 2)).unwrap();
    db.upsert_file(&make_record("ccc", "/data/c.txt", 3, 3)).unwrap();

    let marked = db.mark_all_stale().unwrap();
    assert_eq!(marked, 3);
    assert!(!db.get_by_fingerprint("aaa").unwrap().unwrap().seen_flag);

    db.mark_file_seen("/data/b.txt").unwrap();

    let deleted = db.delete_stale().unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(db.count_files().unwrap(), 1);
    assert!(db.get_by_fingerprint("bbb").unwrap().is_some());
}

#[test]
fn test_upsert_resets_seen_flag() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 5, 1000)).unwrap();
    db.mark_all_stale().unwrap();

    db.upsert_file(&make_record("aaa", "/data/a.txt", 6, 2000)).unwrap();
    assert!(db.get_by_fingerprint("aaa").unwrap().unwrap().seen_flag);
    assert_eq!(db.delete_stale().unwrap(), 0);
}

#[test]
fn test_fetch_records_by_paths() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 1, 1)).unwrap();
    db.upsert_file(&make_record("bbb", "/data/b.txt", 2, 2)).unwrap();
    db.upsert_file(&make_record("ccc", "/other/c.txt", 3, 3)).unwrap();

    let records = db
        .fetch_records_by_paths(&[
            "/data/a.txt".to_string(),
            "/other/c.txt".to_string(),
            "/data/missing.txt".to_string(),
        ])
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records["/data/a.txt"].fingerprint, "aaa");
    assert_eq!(records["/other/c.txt"].fingerprint, "ccc");

    assert!(db.fetch_records_by_paths(&[]).unwrap().is_empty());
}

#[test]
fn test_delete_by_path() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 1, 1)).unwrap();

    assert_eq!(db.delete_by_path("/data/a.txt").unwrap(), 1);
    assert_eq!(db.delete_by_path("/data/a.txt").unwrap(), 0);
    assert_eq!(db.count_files().unwrap(), 0);
}

#[test]
fn test_add_monitored_directory_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.add_monitored_directory("/data").unwrap());
    assert!(!db.add_monitored_directory("/data").unwrap());
    assert_eq!(db.list_monitored_directories().unwrap(), vec!["/data"]);
}

#[test]
fn test_remove_monitored_directory_cascades() {
    let db = Database::open_in_memory().unwrap();
    db.add_monitored_directory("/data").unwrap();
    db.add_monitored_directory("/data2").unwrap();
    db.upsert_file(&make_record("aaa", "/data/a.txt", 1, 1)).unwrap();
    db.upsert_file(&make_record("bbb", "/data/sub/b.txt", 2, 2)).unwrap();
    db.upsert_file(&make_record("ccc", "/data2/c.txt", 3, 3)).unwrap();

    let removed = db.remove_monitored_directory("/data").unwrap();
    assert_eq!(removed, 2);

    // Sibling with a shared string prefix is untouched.
    assert!(db.get_by_fingerprint("ccc").unwrap().is_some());
    assert_eq!(db.list_monitored_directories().unwrap(), vec!["/data2"]);

    // Second removal is a no-op, not an error.
    assert_eq!(db.remove_monitored_directory("/data").unwrap(), 0);
}

#[test]
fn test_ignore_patterns_replace_wholesale() {
    let db = Database::open_in_memory().unwrap();
    db.set_ignore_patterns(&["*.log".to_string(), "node_modules".to_string()])
        .unwrap();
    assert_eq!(db.ignore_patterns().unwrap(), vec!["*.log", "node_modules"]);

    db.set_ignore_patterns(&[
        "*.tmp".to_string(),
        "  ".to_string(),
        "*.tmp".to_string(),
    ])
    .unwrap();
    assert_eq!(db.ignore_patterns().unwrap(), vec!["*.tmp"]);

    db.set_ignore_patterns(&[]).unwrap();
    assert!(db.ignore_patterns().unwrap().is_empty());
}

#[test]
fn test_list_files_paging_and_search() {
    let db = Database::open_in_memory().unwrap();
    for i in 0..5 {
        db.upsert_file(&make_record(
            &format!("fp{i}"),
            &format!("/data/report_{i}.txt"),
            10,
            1000 + i,
        ))
        .unwrap();
    }
    db.upsert_file(&make_record("fpx", "/data/notes.md", 10, 2000)).unwrap();

    // Newest first.
    let (page, total) = db.list_files(None, 0, 3).unwrap();
    assert_eq!(total, 6);
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].path, "/data/notes.md");

    let (page2, _) = db.list_files(None, 3, 3).unwrap();
    assert_eq!(page2.len(), 3);

    let (hits, hit_total) = db.list_files(Some("report"), 0, 10).unwrap();
    assert_eq!(hit_total, 5);
    assert_eq!(hits.len(), 5);

    let (none, none_total) = db.list_files(Some("zzz"), 0, 10).unwrap();
    assert!(none.is_empty());
    assert_eq!(none_total, 0);
}
