use chrono::{Duration, Utc};
use media_library::storage::models::{EntryFilter, LibraryEntry, UploadSession};
use media_library::storage::{Database, DatabaseError};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_session(id: &str) -> UploadSession {
    UploadSession {
        id: id.to_string(),
        name: "Spiral".to_string(),
        filename: "spiral.gif".to_string(),
        declared_size: 10,
        tags: vec!["x".to_string()],
        mime: Some("image/gif".to_string()),
        temp_key: format!("{id}.part"),
        completed: false,
        final_path: None,
        created_at: Utc::now(),
    }
}

fn sample_entry(id: &str, name: &str, tags: &[&str], age_secs: i64) -> LibraryEntry {
    let filename = format!("{id}.gif");
    LibraryEntry {
        id: id.to_string(),
        name: name.to_string(),
        url: format!("/api/media/animations/{filename}"),
        filename,
        size: 1024,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        mime: Some("image/gif".to_string()),
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

/// Store an entry the way a finished upload does
fn seed_entry(db: &Database, entry: &LibraryEntry) {
    let session = sample_session(&format!("s-{}", entry.id));
    db.put_session(&session).unwrap();
    let final_path = format!("/srv/media/{}", entry.filename);
    assert!(db.complete_session(&session.id, &final_path, entry).unwrap());
}

// ============================================================================
// Session tests
// ============================================================================

#[test]
fn test_put_and_get_session() {
    let (_dir, db) = test_db();
    let session = sample_session("s-1");
    db.put_session(&session).unwrap();

    let retrieved = db.get_session("s-1").unwrap().expect("session should exist");
    assert_eq!(retrieved, session);
}

#[test]
fn test_get_session_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_session("nonexistent").unwrap().is_none());
}

#[test]
fn test_delete_session() {
    let (_dir, db) = test_db();
    db.put_session(&sample_session("s-2")).unwrap();

    assert!(db.delete_session("s-2").unwrap());
    assert!(!db.delete_session("s-2").unwrap());
    assert!(db.get_session("s-2").unwrap().is_none());
}

#[test]
fn test_complete_session_writes_entry_and_marks_session() {
    let (_dir, db) = test_db();
    db.put_session(&sample_session("s-3")).unwrap();
    let entry = sample_entry("e-3", "Spiral", &["x"], 0);

    assert!(db
        .complete_session("s-3", "/srv/media/e-3.gif", &entry)
        .unwrap());

    let session = db.get_session("s-3").unwrap().unwrap();
    assert!(session.completed);
    assert_eq!(session.final_path.as_deref(), Some("/srv/media/e-3.gif"));

    assert_eq!(db.get_entry("e-3").unwrap(), Some(entry.clone()));
    assert_eq!(db.get_entry_by_filename("e-3.gif").unwrap(), Some(entry));
}

#[test]
fn test_complete_missing_session_writes_nothing() {
    let (_dir, db) = test_db();
    let entry = sample_entry("e-4", "Ghost", &[], 0);

    assert!(!db.complete_session("nope", "/srv/media/e-4.gif", &entry).unwrap());
    assert!(db.get_entry("e-4").unwrap().is_none());
}

#[test]
fn test_complete_session_rejects_duplicate_filename() {
    let (_dir, db) = test_db();
    seed_entry(&db, &sample_entry("taken", "First", &[], 0));
    db.put_session(&sample_session("s-5")).unwrap();

    let mut clash = sample_entry("e-5", "Second", &[], 0);
    clash.filename = "taken.gif".to_string();

    let err = db.complete_session("s-5", "/srv/media/taken.gif", &clash);
    assert!(matches!(err, Err(DatabaseError::Conflict(_))));
    assert!(db.get_entry("e-5").unwrap().is_none());
    assert!(!db.get_session("s-5").unwrap().unwrap().completed);
}

// ============================================================================
// Entry tests
// ============================================================================

#[test]
fn test_delete_entry_cleans_filename_index() {
    let (_dir, db) = test_db();
    let entry = sample_entry("e-6", "Gone", &[], 0);
    seed_entry(&db, &entry);

    assert_eq!(db.delete_entry("e-6").unwrap(), Some(entry));
    assert!(db.get_entry("e-6").unwrap().is_none());
    assert!(db.get_entry_by_filename("e-6.gif").unwrap().is_none());
    assert!(db.delete_entry("e-6").unwrap().is_none());
}

#[test]
fn test_query_orders_newest_first() {
    let (_dir, db) = test_db();
    seed_entry(&db, &sample_entry("old", "Old", &[], 300));
    seed_entry(&db, &sample_entry("new", "New", &[], 0));
    seed_entry(&db, &sample_entry("mid", "Mid", &[], 100));

    let page = db.query_entries(&EntryFilter::default(), 50, 0).unwrap();
    let ids: Vec<&str> = page.items.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
    assert_eq!(page.total, 3);
}

#[test]
fn test_query_total_counts_before_pagination() {
    let (_dir, db) = test_db();
    for i in 0..5 {
        seed_entry(&db, &sample_entry(&format!("e{i}"), "Clip", &["loop"], i));
    }
    seed_entry(&db, &sample_entry("other", "Clip", &[], 0));

    let filter = EntryFilter {
        search: None,
        tags: vec!["loop".to_string()],
    };
    let page = db.query_entries(&filter, 2, 1).unwrap();
    assert_eq!(page.total, 5);
    let ids: Vec<&str> = page.items.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2"]);

    let everything = db.query_entries(&EntryFilter::default(), 50, 0).unwrap();
    assert_eq!(everything.total, 6);
}

#[test]
fn test_filter_tags_are_superset_match() {
    let entry = sample_entry("t", "Tagged", &["a", "b", "c"], 0);

    let filter = |tags: &[&str]| EntryFilter {
        search: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    };

    assert!(filter(&[]).matches(&entry));
    assert!(filter(&["a"]).matches(&entry));
    assert!(filter(&["a", "b"]).matches(&entry));
    assert!(!filter(&["a", "d"]).matches(&entry));
}

#[test]
fn test_filter_search_case_insensitive() {
    let entry = sample_entry("s", "Rainbow Spiral", &[], 0);

    let filter = |q: &str| EntryFilter {
        search: Some(q.to_string()),
        tags: Vec::new(),
    };

    assert!(filter("rainbow").matches(&entry));
    assert!(filter("SPIRAL").matches(&entry));
    assert!(filter("w s").matches(&entry));
    assert!(!filter("fire").matches(&entry));
}
