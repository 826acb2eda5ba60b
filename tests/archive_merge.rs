// tests/archive_merge.rs
use cls_telegraph::archive::{ArchiveStore, FLAGGED_HEADER, NORMAL_HEADER};
use cls_telegraph::timeutil;
use cls_telegraph::Telegram;

fn item(id: &str, ts: i64, content: &str, flagged: bool) -> Telegram {
    Telegram {
        id: id.to_string(),
        content: content.to_string(),
        time_of_day: timeutil::hhmm(ts),
        timestamp: Some(ts),
        url: format!("https://www.cls.cn/detail/{id}"),
        is_flagged: flagged,
    }
}

#[test]
fn repeat_run_with_same_batch_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();
    let batch = vec![
        item("1", 1_700_000_000, "利好 A", true),
        item("2", 1_700_000_100, "plain", false),
    ];

    let first = store.merge_and_persist(&batch);
    assert!(first.wrote_any);
    assert_eq!(first.new_items.len(), 2);

    let date = timeutil::civil_date(1_700_000_000).unwrap();
    let md_path = store.markdown_path(date);
    let content_after_first = std::fs::read_to_string(&md_path).unwrap();
    let mtime_after_first = std::fs::metadata(&md_path).unwrap().modified().unwrap();

    let second = store.merge_and_persist(&batch);
    assert!(!second.wrote_any);
    assert!(second.new_items.is_empty());
    assert_eq!(std::fs::read_to_string(&md_path).unwrap(), content_after_first);
    assert_eq!(
        std::fs::metadata(&md_path).unwrap().modified().unwrap(),
        mtime_after_first
    );
}

#[test]
fn notifier_scope_is_exactly_the_items_absent_before_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();

    store.merge_and_persist(&[
        item("1", 1_700_000_000, "A", false),
        item("2", 1_700_000_100, "B", false),
    ]);

    let outcome = store.merge_and_persist(&[
        item("1", 1_700_000_000, "A", false),
        item("2", 1_700_000_100, "B", false),
        item("3", 1_700_000_200, "C", false),
    ]);
    assert_eq!(outcome.new_items.len(), 1);
    assert_eq!(outcome.new_items[0].id, "3");
}

#[test]
fn duplicate_id_keeps_a_single_entry_with_last_record_winning() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();

    let outcome = store.merge_and_persist(&[
        item("1", 1_700_000_000, "first draft", false),
        item("1", 1_700_000_000, "corrected", false),
    ]);
    assert_eq!(outcome.new_items.len(), 1);
    assert_eq!(outcome.new_items[0].content, "corrected");

    let date = timeutil::civil_date(1_700_000_000).unwrap();
    let loaded = store.load_existing(date);
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].content, "corrected");
}

#[test]
fn items_partition_into_their_own_civil_dates_across_midnight() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();

    // 23:58 and 00:02 around the Beijing midnight of 2023-11-15/16.
    let late = 1_700_063_880;
    let early_next = late + 240;
    assert_eq!(timeutil::hhmm(late), "23:58");
    assert_eq!(timeutil::hhmm(early_next), "00:02");

    store.merge_and_persist(&[
        item("1", late, "late item", false),
        item("2", early_next, "early item", false),
    ]);

    let d1 = timeutil::civil_date(late).unwrap();
    let d2 = timeutil::civil_date(early_next).unwrap();
    assert_ne!(d1, d2);

    let day1 = std::fs::read_to_string(store.markdown_path(d1)).unwrap();
    let day2 = std::fs::read_to_string(store.markdown_path(d2)).unwrap();
    assert!(day1.contains("late item") && !day1.contains("early item"));
    assert!(day2.contains("early item") && !day2.contains("late item"));
}

#[test]
fn sections_are_ordered_flagged_first_then_descending_time() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();

    store.merge_and_persist(&[
        item("1", 1_700_000_000, "old normal", false),
        item("2", 1_700_000_300, "new normal", false),
        item("3", 1_700_000_100, "old flagged", true),
        item("4", 1_700_000_200, "new flagged", true),
    ]);

    let date = timeutil::civil_date(1_700_000_000).unwrap();
    let doc = std::fs::read_to_string(store.markdown_path(date)).unwrap();

    let pos = |needle: &str| doc.find(needle).unwrap();
    assert!(pos(FLAGGED_HEADER) < pos(NORMAL_HEADER));
    assert!(pos("new flagged") < pos("old flagged"));
    assert!(pos("new normal") < pos("old normal"));
    // Flagged section sits entirely above the normal one.
    assert!(pos("old flagged") < pos(NORMAL_HEADER));
}

// The worked example from the feed: keyword 利好 flags item 1, item 2 stays
// general, both land in the file for 1700000000's civil date.
#[test]
fn sample_batch_lands_flagged_and_general_in_one_dated_file() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();

    let keywords = vec!["利好".to_string()];
    let title1 = "利好 A";
    let flagged1 = keywords.iter().any(|k| title1.contains(k.as_str()));
    assert!(flagged1);

    store.merge_and_persist(&[
        item("1", 1_700_000_000, title1, flagged1),
        item("2", 1_700_000_100, "plain", false),
    ]);

    let date = timeutil::civil_date(1_700_000_000).unwrap();
    assert_eq!(timeutil::date_str(date), "2023-11-15");
    let doc = std::fs::read_to_string(store.markdown_path(date)).unwrap();

    let flagged_start = doc.find(FLAGGED_HEADER).unwrap();
    let normal_start = doc.find(NORMAL_HEADER).unwrap();
    let item1 = doc.find("利好 A").unwrap();
    let item2 = doc.find("plain").unwrap();
    assert!(flagged_start < item1 && item1 < normal_start);
    assert!(normal_start < item2);
}

#[test]
fn legacy_markdown_only_day_still_dedups_by_id() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path()).unwrap();
    let date = timeutil::civil_date(1_700_000_000).unwrap();

    // A day written by an older revision: Markdown, no sidecar.
    let legacy = format!(
        "{NORMAL_HEADER}\n\n  - [06:13] [old entry](https://www.cls.cn/detail/1)\n\n"
    );
    std::fs::write(store.markdown_path(date), &legacy).unwrap();

    let outcome = store.merge_and_persist(&[
        item("1", 1_700_000_000, "old entry refetched", false),
        item("2", 1_700_000_100, "brand new", false),
    ]);
    // id 1 was already on disk; only id 2 is new.
    assert_eq!(outcome.new_items.len(), 1);
    assert_eq!(outcome.new_items[0].id, "2");

    let loaded = store.load_existing(date);
    assert_eq!(loaded.len(), 2);
}
