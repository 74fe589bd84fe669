//! Integration tests for the mailindex crate
//!
//! These tests drive the public API end to end against real files in a
//! temporary mail root.

use std::fs;
use std::path::{Path, PathBuf};

use mailindex::ffi::{FfiSort, FfiStatus, IndexService, init_library, teardown_library};
use mailindex::{
    Database, IndexConfig, Mode, Query, ScanOptions, Sort, Status, TAG_MAX, scan, status_to_string,
};
use tempfile::TempDir;

/// Builder for test mail files
struct Mail {
    id: String,
    from: String,
    subject: String,
    date: String,
    refs: Vec<String>,
    in_reply_to: Option<String>,
    body: String,
}

impl Mail {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            from: "Alice Example <alice@example.com>".to_string(),
            subject: format!("Subject of {}", id),
            date: "Tue, 12 Mar 2024 12:00:00 +0000".to_string(),
            refs: Vec::new(),
            in_reply_to: None,
            body: format!("Body of {}", id),
        }
    }

    fn from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    fn reply_to(mut self, parent: &str) -> Self {
        self.in_reply_to = Some(parent.to_string());
        self.refs.push(parent.to_string());
        self
    }

    /// Reply that names its parent in In-Reply-To alone
    fn in_reply_to(mut self, parent: &str) -> Self {
        self.in_reply_to = Some(parent.to_string());
        self
    }

    /// Reply that names its parent in References alone
    fn references(mut self, parent: &str) -> Self {
        self.refs.push(parent.to_string());
        self
    }

    fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    fn write(&self, root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut raw = format!(
            "From: {}\r\nTo: bob@example.com\r\nSubject: {}\r\nDate: {}\r\nMessage-ID: <{}>\r\n",
            self.from, self.subject, self.date, self.id
        );
        if !self.refs.is_empty() {
            let refs: Vec<String> = self.refs.iter().map(|r| format!("<{}>", r)).collect();
            raw.push_str(&format!("References: {}\r\n", refs.join(" ")));
        }
        if let Some(parent) = &self.in_reply_to {
            raw.push_str(&format!("In-Reply-To: <{}>\r\n", parent));
        }
        raw.push_str("\r\n");
        raw.push_str(&self.body);
        raw.push_str("\r\n");
        fs::write(&path, raw).unwrap();
        path
    }
}

fn create_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::create(dir.path()).unwrap();
    (dir, db)
}

fn ids(db: &Database, query: &str) -> Vec<String> {
    db.search_messages(&Query::new(query).unwrap())
        .unwrap()
        .map(|m| m.id.0)
        .collect()
}

// ============================================================================
// Status contract
// ============================================================================

#[test]
fn test_status_strings_are_stable() {
    for (code, status) in Status::ALL.iter().enumerate() {
        assert_eq!(status.code(), code as i32);
        assert!(!status_to_string(code as i32).is_empty());
    }
    assert_eq!(
        status_to_string(Status::NotInitialized.code()),
        "Operation on uninitialized object impossible."
    );
    assert_eq!(status_to_string(99), "Unknown error status value");
}

// ============================================================================
// Messages
// ============================================================================

#[test]
fn test_duplicate_files_share_a_message() {
    let (dir, db) = create_db();
    let mail = Mail::new("dup@example.com");
    let first = mail.write(dir.path(), "cur/a");
    let second = mail.write(dir.path(), "new/b");

    assert_eq!(db.add_message(&first).unwrap().status, Status::Success);
    let outcome = db.add_message(&second).unwrap();
    assert_eq!(outcome.status, Status::DuplicateMessageId);
    assert_eq!(outcome.message.filenames, vec![first.clone(), second.clone()]);

    assert_eq!(db.remove_message(&first).unwrap(), Status::DuplicateMessageId);
    let remaining = db.find_message("dup@example.com").unwrap().unwrap();
    assert_eq!(remaining.filenames, vec![second.clone()]);

    assert_eq!(db.remove_message(&second).unwrap(), Status::Success);
    assert!(db.find_message("dup@example.com").unwrap().is_none());
}

#[test]
fn test_message_id_round_trip() {
    let (dir, db) = create_db();
    let path = Mail::new("round@trip").write(dir.path(), "m");
    db.add_message(&path).unwrap();

    assert_eq!(ids(&db, "id:round@trip"), vec!["round@trip"]);
    assert_eq!(ids(&db, "id:<round@trip>"), vec!["round@trip"]);

    db.remove_message(&path).unwrap();
    assert!(ids(&db, "id:round@trip").is_empty());
}

#[test]
fn test_unreadable_and_non_mail_files() {
    let (dir, db) = create_db();
    let err = db.add_message(dir.path().join("missing")).unwrap_err();
    assert_eq!(err.status(), Status::FileError);

    let junk = dir.path().join("junk");
    fs::write(&junk, "hello there\n").unwrap();
    let err = db.add_message(&junk).unwrap_err();
    assert_eq!(err.status(), Status::FileNotEmail);
    assert_eq!(db.message_count().unwrap(), 0);
}

#[test]
fn test_missing_message_id_uses_content_hash() {
    let (dir, db) = create_db();
    let path = dir.path().join("noid");
    fs::write(&path, "From: a@example.com\r\nSubject: no id\r\n\r\nbody\r\n").unwrap();
    let message = db.add_message(&path).unwrap().message;
    assert!(message.id.as_str().starts_with("sha256-"));
    assert_eq!(&message.id.as_str()[7..], message.content_hash);
}

// ============================================================================
// Tags
// ============================================================================

#[test]
fn test_tags_are_idempotent() {
    let (dir, db) = create_db();
    let path = Mail::new("t@x").write(dir.path(), "m");
    let mut msg = db.add_message(&path).unwrap().message;

    db.add_tag(&mut msg, "inbox").unwrap();
    db.add_tag(&mut msg, "inbox").unwrap();
    db.remove_tag(&mut msg, "absent").unwrap();
    assert_eq!(msg.tags.iter().collect::<Vec<_>>(), vec!["inbox"]);

    let stored = db.find_message("t@x").unwrap().unwrap();
    assert_eq!(stored.tags, msg.tags);
    assert_eq!(db.all_tags().unwrap(), vec!["inbox"]);
}

#[test]
fn test_tag_validation() {
    let (dir, db) = create_db();
    let path = Mail::new("t@x").write(dir.path(), "m");
    let mut msg = db.add_message(&path).unwrap().message;

    assert_eq!(db.add_tag(&mut msg, "").unwrap_err().status(), Status::NullPointer);
    let long = "a".repeat(TAG_MAX + 1);
    assert_eq!(db.add_tag(&mut msg, &long).unwrap_err().status(), Status::TagTooLong);
    db.add_tag(&mut msg, &"a".repeat(TAG_MAX)).unwrap();
}

#[test]
fn test_tags_sorted() {
    let (dir, db) = create_db();
    let path = Mail::new("t@x").write(dir.path(), "m");
    let mut msg = db.add_message(&path).unwrap().message;
    for tag in ["zeta", "alpha", "mid"] {
        db.add_tag(&mut msg, tag).unwrap();
    }
    let stored = db.find_message("t@x").unwrap().unwrap();
    assert_eq!(stored.tags.into_iter().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
}

// ============================================================================
// Freeze / transactions / readers
// ============================================================================

#[test]
fn test_thaw_without_freeze() {
    let (_dir, db) = create_db();
    assert_eq!(db.thaw().unwrap_err().status(), Status::UnbalancedFreezeThaw);
}

#[test]
fn test_frozen_tags_invisible_to_reader_until_thaw() {
    let (dir, db) = create_db();
    let path = Mail::new("m@x").write(dir.path(), "m");
    let mut msg = db.add_message(&path).unwrap().message;
    let reader = Database::open(dir.path(), Mode::ReadOnly).unwrap();
    let both = Query::new("tag:a and tag:b").unwrap();

    db.freeze().unwrap();
    db.add_tag(&mut msg, "a").unwrap();
    db.add_tag(&mut msg, "b").unwrap();
    assert_eq!(reader.count_messages(&both).unwrap(), 0);
    assert_eq!(reader.count_messages(&Query::new("tag:a").unwrap()).unwrap(), 0);
    assert_eq!(db.count_messages(&both).unwrap(), 1);

    db.thaw().unwrap();
    let found: Vec<String> = reader
        .search_messages(&both)
        .unwrap()
        .map(|m| m.id.0)
        .collect();
    assert_eq!(found, vec!["m@x"]);
}

#[test]
fn test_nested_freezes_need_matching_thaws() {
    let (dir, db) = create_db();
    let reader = Database::open(dir.path(), Mode::ReadOnly).unwrap();
    let path = Mail::new("n@x").write(dir.path(), "m");

    db.freeze().unwrap();
    db.freeze().unwrap();
    db.add_message(&path).unwrap();
    db.thaw().unwrap();
    assert_eq!(reader.message_count().unwrap(), 0);
    db.thaw().unwrap();
    assert_eq!(reader.message_count().unwrap(), 1);
    assert_eq!(db.thaw().unwrap_err().status(), Status::UnbalancedFreezeThaw);
}

#[test]
fn test_transaction_rollback_and_commit() {
    let (dir, db) = create_db();
    let a = Mail::new("a@x").write(dir.path(), "a");
    let b = Mail::new("b@x").write(dir.path(), "b");

    db.begin().unwrap();
    assert_eq!(db.begin().unwrap_err().status(), Status::UnbalancedFreezeThaw);
    db.add_message(&a).unwrap();
    db.rollback().unwrap();
    assert!(db.find_message("a@x").unwrap().is_none());

    db.begin().unwrap();
    db.add_message(&b).unwrap();
    db.commit().unwrap();
    assert!(db.find_message("b@x").unwrap().is_some());
    assert_eq!(db.commit().unwrap_err().status(), Status::UnbalancedFreezeThaw);
}

#[test]
fn test_read_only_handle_rejects_mutation() {
    let (dir, db) = create_db();
    let path = Mail::new("ro@x").write(dir.path(), "m");
    db.add_message(&path).unwrap();
    db.close().unwrap();

    let reader = Database::open(dir.path(), Mode::ReadOnly).unwrap();
    let mut msg = reader.find_message("ro@x").unwrap().unwrap();
    let other = Mail::new("other@x").write(dir.path(), "other");

    assert_eq!(reader.add_tag(&mut msg, "x").unwrap_err().status(), Status::ReadOnlyDatabase);
    assert_eq!(reader.remove_all_tags(&mut msg).unwrap_err().status(), Status::ReadOnlyDatabase);
    assert_eq!(reader.add_message(&other).unwrap_err().status(), Status::ReadOnlyDatabase);
    assert_eq!(reader.remove_message(&path).unwrap_err().status(), Status::ReadOnlyDatabase);
    assert_eq!(reader.freeze().unwrap_err().status(), Status::ReadOnlyDatabase);
    assert_eq!(reader.begin().unwrap_err().status(), Status::ReadOnlyDatabase);
    assert_eq!(reader.message_count().unwrap(), 1);
}

#[test]
fn test_second_writer_rejected() {
    let (dir, db) = create_db();
    let err = Database::open(dir.path(), Mode::ReadWrite).unwrap_err();
    assert_eq!(err.status(), Status::ReadOnlyDatabase);
    assert!(err.message().is_some());

    db.close().unwrap();
    Database::open(dir.path(), Mode::ReadWrite).unwrap();
}

#[test]
fn test_open_missing_database() {
    let dir = TempDir::new().unwrap();
    let err = Database::open(dir.path(), Mode::ReadOnly).unwrap_err();
    assert_eq!(err.status(), Status::FileError);
}

#[test]
fn test_version_and_upgrade() {
    let (_dir, db) = create_db();
    assert!(db.version().unwrap() > 0);
    assert!(!db.needs_upgrade().unwrap());
    db.upgrade().unwrap();
}

// ============================================================================
// Threads
// ============================================================================

#[test]
fn test_thread_merge_when_parent_arrives_late() {
    let (dir, db) = create_db();
    let reply = Mail::new("reply@x")
        .reply_to("root@x")
        .date("Wed, 13 Mar 2024 12:00:00 +0000")
        .write(dir.path(), "reply");
    let sibling = Mail::new("sibling@x")
        .reply_to("root@x")
        .date("Thu, 14 Mar 2024 12:00:00 +0000")
        .write(dir.path(), "sibling");
    let root = Mail::new("root@x").write(dir.path(), "root");

    let reply_thread = db.add_message(&reply).unwrap().message.thread_id;
    let sibling_thread = db.add_message(&sibling).unwrap().message.thread_id;
    assert_eq!(reply_thread, sibling_thread);

    let root_thread = db.add_message(&root).unwrap().message.thread_id;
    assert_eq!(root_thread, reply_thread);
    assert_eq!(db.count_threads(&Query::all()).unwrap(), 1);

    let thread = db.search_threads(&Query::all()).unwrap().next().unwrap();
    assert_eq!(thread.root.as_str(), "root@x");
    assert_eq!(thread.total_messages, 3);
    let order: Vec<&str> = thread.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(order, vec!["root@x", "reply@x", "sibling@x"]);
    assert_eq!(thread.toplevel.len(), 1);
}

#[test]
fn test_single_parent_header_links_in_either_order() {
    type Link = fn(Mail, &str) -> Mail;
    let links: [(&str, Link); 3] = [
        ("in-reply-to", Mail::in_reply_to),
        ("references", Mail::references),
        ("both", Mail::reply_to),
    ];

    for (header, link) in links {
        for child_first in [true, false] {
            let (dir, db) = create_db();
            let parent = Mail::new("parent@x").write(dir.path(), "parent");
            let child = link(Mail::new("child@x"), "parent@x")
                .date("Wed, 13 Mar 2024 12:00:00 +0000")
                .write(dir.path(), "child");

            let order = if child_first { [&child, &parent] } else { [&parent, &child] };
            for path in order {
                db.add_message(path).unwrap();
            }

            let child_thread = db.find_message("child@x").unwrap().unwrap().thread_id;
            let parent_thread = db.find_message("parent@x").unwrap().unwrap().thread_id;
            assert_eq!(
                child_thread, parent_thread,
                "{} header, child first: {}",
                header, child_first
            );
            assert_eq!(db.count_threads(&Query::all()).unwrap(), 1);
        }
    }
}

#[test]
fn test_in_reply_to_siblings_share_a_thread() {
    let (dir, db) = create_db();
    let first = Mail::new("first@x").in_reply_to("gone@x").write(dir.path(), "first");
    let second = Mail::new("second@x").in_reply_to("gone@x").write(dir.path(), "second");

    let t1 = db.add_message(&first).unwrap().message.thread_id;
    let t2 = db.add_message(&second).unwrap().message.thread_id;
    assert_eq!(t1, t2);

    let stored = db.find_message("second@x").unwrap().unwrap();
    assert!(stored.references.is_empty());
    assert_eq!(stored.in_reply_to.unwrap().as_str(), "gone@x");
}

#[test]
fn test_thread_split_on_removal() {
    let (dir, db) = create_db();
    let a = Mail::new("a@x").write(dir.path(), "a");
    let b = Mail::new("b@x")
        .reply_to("a@x")
        .date("Wed, 13 Mar 2024 12:00:00 +0000")
        .write(dir.path(), "b");
    let c = Mail::new("c@x")
        .reply_to("b@x")
        .date("Thu, 14 Mar 2024 12:00:00 +0000")
        .write(dir.path(), "c");
    let ta = db.add_message(&a).unwrap().message.thread_id;
    db.add_message(&b).unwrap();
    db.add_message(&c).unwrap();
    assert_eq!(db.count_threads(&Query::all()).unwrap(), 1);

    db.remove_message(&b).unwrap();
    assert_eq!(db.count_threads(&Query::all()).unwrap(), 2);
    assert_eq!(db.find_message("a@x").unwrap().unwrap().thread_id, ta);
    assert_ne!(db.find_message("c@x").unwrap().unwrap().thread_id, ta);
}

#[test]
fn test_forged_references_make_singletons() {
    let (dir, db) = create_db();
    let orphan = Mail::new("orphan@x").reply_to("never-seen@x").write(dir.path(), "o");
    let other = Mail::new("other@x").write(dir.path(), "p");
    db.add_message(&orphan).unwrap();
    db.add_message(&other).unwrap();
    assert_eq!(db.count_threads(&Query::all()).unwrap(), 2);
}

#[test]
fn test_thread_summary() {
    let (dir, db) = create_db();
    Mail::new("root@x")
        .from("\"Smith, Jane\" <jane.smith@example.com>")
        .subject("Plans")
        .write(dir.path(), "1");
    Mail::new("re@x")
        .from("Bob <bob@example.com>")
        .subject("Re: Plans")
        .reply_to("root@x")
        .date("Wed, 13 Mar 2024 12:00:00 +0000")
        .body("lunch tomorrow")
        .write(dir.path(), "2");
    db.add_message("1").unwrap();
    db.add_message("2").unwrap();

    let thread = db
        .search_threads(&Query::new("lunch").unwrap())
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(thread.subject, "Plans");
    assert_eq!(thread.matched_messages, 1);
    assert_eq!(thread.total_messages, 2);
    assert_eq!(thread.authors, "Bob| Jane Smith");
}

// ============================================================================
// Queries
// ============================================================================

fn query_fixture() -> (TempDir, Database) {
    let (dir, db) = create_db();
    let mails = [
        Mail::new("old@x")
            .from("Carol <carol@example.com>")
            .subject("Quarterly report")
            .date("Mon, 01 Jan 2024 12:00:00 +0000")
            .body("The quick brown fox"),
        Mail::new("mid@x")
            .subject("Lunch")
            .date("Fri, 15 Mar 2024 12:00:00 +0000")
            .body("brown bread and fox stew"),
        Mail::new("new@x")
            .subject("Weekly report")
            .date("Mon, 15 Apr 2024 12:00:00 +0000")
            .body("quick notes"),
    ];
    for (i, mail) in mails.iter().enumerate() {
        let path = mail.write(dir.path(), &format!("cur/{}", i));
        db.add_message(&path).unwrap();
    }
    (dir, db)
}

#[test]
fn test_boolean_queries() {
    let (_dir, db) = query_fixture();
    assert_eq!(ids(&db, "report"), vec!["new@x", "old@x"]);
    assert_eq!(ids(&db, "report and not quick"), Vec::<String>::new());
    assert_eq!(ids(&db, "report not from:carol"), vec!["new@x"]);
    assert_eq!(ids(&db, "lunch OR from:carol"), vec!["mid@x", "old@x"]);
    assert_eq!(ids(&db, "subject:report"), vec!["new@x", "old@x"]);
    assert_eq!(ids(&db, "*").len(), 3);
    assert_eq!(ids(&db, "").len(), 3);
}

#[test]
fn test_phrase_and_prefix_queries() {
    let (_dir, db) = query_fixture();
    assert_eq!(ids(&db, "\"quick brown\""), vec!["old@x"]);
    assert_eq!(ids(&db, "\"brown quick\""), Vec::<String>::new());
    assert_eq!(ids(&db, "repo*"), vec!["new@x", "old@x"]);
}

#[test]
fn test_phrase_spanning_an_over_long_word() {
    let (dir, db) = create_db();
    let long = "x".repeat(60);
    let path = Mail::new("long@x")
        .body(&format!("build {} failed again", long))
        .write(dir.path(), "long");
    db.add_message(&path).unwrap();

    assert_eq!(ids(&db, &format!("\"build {} failed\"", long)), vec!["long@x"]);
    assert_eq!(ids(&db, &format!("\"{} failed again\"", long)), vec!["long@x"]);
    assert_eq!(ids(&db, "\"build failed\""), Vec::<String>::new());
}

#[test]
fn test_date_queries() {
    let (_dir, db) = query_fixture();
    assert_eq!(ids(&db, "date:2024-03"), vec!["mid@x"]);
    assert_eq!(ids(&db, "date:2024-03..2024-04"), vec!["new@x", "mid@x"]);
    assert_eq!(ids(&db, "date:..2024-02"), vec!["old@x"]);
    let err = Query::new("date:whenever")
        .and_then(|q| db.count_messages(&q))
        .unwrap_err();
    assert_eq!(err.status(), Status::XapianException);
}

#[test]
fn test_query_syntax_error() {
    let err = Query::new("(unbalanced").unwrap_err();
    assert_eq!(err.status(), Status::XapianException);
}

#[test]
fn test_sort_orders() {
    let (_dir, db) = query_fixture();
    let run = |sort| -> Vec<String> {
        db.search_messages(&Query::all().with_sort(sort))
            .unwrap()
            .map(|m| m.id.0)
            .collect()
    };
    assert_eq!(run(Sort::NewestFirst), vec!["new@x", "mid@x", "old@x"]);
    assert_eq!(run(Sort::OldestFirst), vec!["old@x", "mid@x", "new@x"]);
    assert_eq!(run(Sort::MessageId), vec!["mid@x", "new@x", "old@x"]);
    assert_eq!(run(Sort::Unsorted), vec!["old@x", "mid@x", "new@x"]);
}

#[test]
fn test_exclude_tags() {
    let (_dir, db) = query_fixture();
    let mut spam = db.find_message("mid@x").unwrap().unwrap();
    db.add_tag(&mut spam, "spam").unwrap();

    let hide_spam = |text: &str| {
        Query::new(text)
            .unwrap()
            .with_exclude_tags(["spam"])
            .unwrap()
    };
    assert_eq!(db.count_messages(&hide_spam("*")).unwrap(), 2);
    assert_eq!(db.count_messages(&hide_spam("fox")).unwrap(), 1);
    // naming the tag lifts the exclusion
    assert_eq!(db.count_messages(&hide_spam("tag:spam")).unwrap(), 1);
}

#[test]
fn test_iterators_restart_and_invalidate_on_close() {
    let (_dir, db) = query_fixture();
    let mut messages = db.search_messages(&Query::all()).unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.is_valid());
    assert!(messages.next().is_some());
    messages.restart();
    assert_eq!(messages.by_ref().count(), 3);
    assert!(!messages.is_valid());

    messages.restart();
    let mut threads = db.search_threads(&Query::all()).unwrap();
    db.close().unwrap();
    assert!(!messages.is_valid());
    assert!(messages.next().is_none());
    assert!(!threads.is_valid());
    assert!(threads.next().is_none());
    assert_eq!(db.count_messages(&Query::all()).unwrap_err().status(), Status::NotInitialized);
}

#[test]
fn test_iterator_skips_removed_messages() {
    let (dir, db) = query_fixture();
    let messages = db.search_messages(&Query::all()).unwrap();
    db.remove_message(dir.path().join("cur/1")).unwrap();
    let left: Vec<String> = messages.map(|m| m.id.0).collect();
    assert_eq!(left, vec!["new@x", "old@x"]);
}

// ============================================================================
// Scanner
// ============================================================================

#[test]
fn test_scan_then_search() {
    let dir = TempDir::new().unwrap();
    let db = Database::create(dir.path()).unwrap();
    Mail::new("s1@x").write(dir.path(), "inbox/cur/1");
    Mail::new("s2@x").reply_to("s1@x").write(dir.path(), "inbox/cur/2");
    Mail::new("s3@x").write(dir.path(), "archive/3");

    let stats = scan(&db, &ScanOptions::with_new_tags(["inbox", "unread"])).unwrap();
    assert_eq!(stats.added, 3);
    assert_eq!(stats.errors, 0);
    assert_eq!(db.count_messages(&Query::new("tag:unread").unwrap()).unwrap(), 3);
    assert_eq!(db.count_threads(&Query::all()).unwrap(), 2);
}

#[test]
fn test_scan_cancelled_by_close() {
    let dir = TempDir::new().unwrap();
    let db = Database::create(dir.path()).unwrap();
    Mail::new("s1@x").write(dir.path(), "cur/1");
    db.close().unwrap();
    let err = scan(&db, &ScanOptions::default()).unwrap_err();
    assert_eq!(err.status(), Status::NotInitialized);
}

// ============================================================================
// Library context and bindings
// ============================================================================

#[test]
fn test_library_lifecycle_through_bindings() {
    let dir = TempDir::new().unwrap();
    Mail::new("ffi@x").write(dir.path(), "cur/1");
    let config = IndexConfig {
        database_path: dir.path().to_path_buf(),
        exclude_tags: vec!["deleted".to_string()],
        ..IndexConfig::default()
    };

    // nothing works before init
    let err = IndexService::create(dir.path().to_string_lossy().into_owned())
        .err()
        .unwrap();
    assert_eq!(err.status(), FfiStatus::NotInitialized);

    init_library(Some(serde_json::to_string(&config).unwrap())).unwrap();
    let service = IndexService::create(dir.path().to_string_lossy().into_owned()).unwrap();
    let stats = service.scan().unwrap();
    assert_eq!(stats.added, 1);

    let msg = service.add_tag("ffi@x".to_string(), "deleted".to_string()).unwrap();
    assert!(msg.tags.contains(&"deleted".to_string()));
    assert!(msg.tags.contains(&"inbox".to_string()));
    assert_eq!(service.count_messages(String::new()).unwrap(), 0);
    assert_eq!(service.count_messages("tag:deleted".to_string()).unwrap(), 1);
    let found = service
        .search_messages("tag:inbox or tag:deleted".to_string(), FfiSort::NewestFirst, Some(10))
        .unwrap();
    assert_eq!(found.len(), 1);

    let missing = service.add_tag("nope@x".to_string(), "a".to_string()).unwrap_err();
    assert_eq!(missing.status(), FfiStatus::NullPointer);

    teardown_library();
    let err = service.all_tags().unwrap_err();
    assert_eq!(err.status(), FfiStatus::NotInitialized);
    assert!(!service.is_open());
}
