//! End-to-end indexing tests against archive files on disk.

use datscope::index::cache;
use datscope::progress::{NoProgress, progress_fn};
use datscope::{Browser, CacheKey, Error, IndexStore, WriteOutcome};

mod common;

use common::{Workspace, mixed_entries, set_mtime, write_archive};

const MTIME: i64 = 1_700_000_000;

/// Runs every pending task and returns the largest progress maximum seen.
fn run_and_measure(browser: &mut Browser) -> u64 {
    let mut largest = 0;
    let mut progress = progress_fn(|_, max| {
        largest = largest.max(max);
        true
    });
    browser.run_until_idle(&mut progress);
    drop(progress);
    largest
}

// =============================================================================
// Open and Scan
// =============================================================================

#[test]
fn test_grow_and_resume() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(100), MTIME);

    // No cache: the whole archive is scanned
    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    assert_eq!(run_and_measure(&mut browser), 100);
    assert_eq!(browser.store().highest_seen(), 100);
    assert!(browser.store().is_dirty());
    assert!(browser.last_write().is_none());

    // An explicit reindex persists on completion
    assert!(browser.reindex().unwrap());
    browser.run_until_idle(&mut NoProgress);
    assert!(!browser.store().is_dirty());
    assert!(matches!(
        browser.last_write(),
        Some(WriteOutcome::Written { entries: 100, .. })
    ));
    let indexed = browser.store().len();
    drop(browser);

    // The archive grows; entry ids 0..100 keep their contents
    write_archive(&ws.archive, &mixed_entries(150), MTIME + 60);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    assert!(browser.pump(&mut NoProgress));
    assert_eq!(browser.store().len(), indexed);
    assert_eq!(browser.store().highest_seen(), 100);
    assert_eq!(browser.store().source_timestamp(), (MTIME + 60) as u64);
    assert_eq!(browser.status().as_deref(), Some("Scanning entry 100 of 150"));

    assert_eq!(run_and_measure(&mut browser), 50);
    assert_eq!(browser.store().highest_seen(), 150);
    assert_eq!(browser.store().len(), 150);
}

#[test]
fn test_complete_cache_needs_no_work() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(12), MTIME);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    browser.run_until_idle(&mut NoProgress);
    assert!(browser.close(&mut NoProgress));
    let first: IndexStore = browser.store().clone();

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    // Reading the cache is the only step
    assert!(!browser.pump(&mut NoProgress));
    assert!(!browser.is_busy());
    assert!(!browser.store().is_dirty());
    assert!(browser.store().same_contents(&first));

    // Closing a clean index writes nothing
    assert!(browser.close(&mut NoProgress));
    assert!(browser.last_write().is_none());
}

#[test]
fn test_interrupted_scan_resumes_after_reopen() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(10), MTIME);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    for _ in 0..4 {
        browser.pump(&mut NoProgress);
    }
    browser.close(&mut NoProgress);
    assert!(browser.is_closed());
    assert!(browser.last_write().unwrap().is_success());

    let cached = cache::load(browser.cache_path().unwrap()).unwrap();
    assert_eq!(cached.highest_seen(), 4);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    assert_eq!(run_and_measure(&mut browser), 6);
    assert_eq!(browser.store().highest_seen(), 10);
    assert_eq!(browser.store().len(), 10);
}

#[test]
fn test_cancel_from_reporter_keeps_partial_index() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(20), MTIME);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    let mut progress = progress_fn(|current, _| current < 5);
    browser.run_until_idle(&mut progress);

    assert!(!browser.is_busy());
    assert_eq!(browser.store().highest_seen(), 5);
    assert_eq!(browser.store().len(), 5);
}

#[test]
fn test_tiny_sniff_len_is_raised() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(12), MTIME);

    let mut config = ws.config();
    config.sniff_len = 0;
    let mut browser = Browser::new(config);
    browser.open(&ws.archive).unwrap();
    browser.run_until_idle(&mut NoProgress);
    assert_eq!(browser.store().highest_seen(), 12);
    assert_eq!(browser.store().len(), 12);
}

// =============================================================================
// Cache Recovery
// =============================================================================

#[test]
fn test_corrupt_cache_triggers_full_rescan() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(8), MTIME);

    let mut browser = Browser::new(ws.config());
    let cache_path = ws.config().cache_path_for(&ws.archive).unwrap();
    std::fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    std::fs::write(&cache_path, b"DSIX garbage").unwrap();

    browser.open(&ws.archive).unwrap();
    assert_eq!(run_and_measure(&mut browser), 8);
    assert_eq!(browser.store().len(), 8);
    assert_eq!(browser.store().source_timestamp(), MTIME as u64);
}

#[test]
fn test_cache_newer_than_archive_is_discarded() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(6), MTIME);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    browser.run_until_idle(&mut NoProgress);
    browser.close(&mut NoProgress);

    // The archive is replaced by an older copy
    set_mtime(&ws.archive, MTIME - 3600);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    assert_eq!(run_and_measure(&mut browser), 6);
    assert_eq!(browser.store().source_timestamp(), (MTIME - 3600) as u64);
}

#[test]
fn test_cache_covering_more_entries_is_discarded() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(9), MTIME);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    browser.run_until_idle(&mut NoProgress);
    browser.close(&mut NoProgress);

    write_archive(&ws.archive, &mixed_entries(3), MTIME);

    let mut browser = Browser::new(ws.config());
    browser.open(&ws.archive).unwrap();
    browser.run_until_idle(&mut NoProgress);
    assert_eq!(browser.store().highest_seen(), 3);
    assert_eq!(browser.store().len(), 3);
}

// =============================================================================
// Open Failures and Paths
// =============================================================================

#[test]
fn test_open_failure_changes_nothing() {
    let ws = Workspace::new();
    std::fs::write(&ws.archive, b"this is not an archive at all, not even close").unwrap();

    let mut browser = Browser::new(ws.config());
    let err = browser.open(&ws.archive).unwrap_err();
    assert!(err.is_open_failure());
    assert!(matches!(err, Error::InvalidArchive(_)));
    assert_eq!(browser.entry_count(), 0);
    assert!(browser.cache_path().is_none());
    assert!(!browser.is_busy());

    let err = browser.open(ws.dir.path().join("missing.dat")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!ws.cache_dir.exists());
}

#[test]
fn test_cache_file_naming() {
    let ws = Workspace::new();
    write_archive(&ws.archive, &mixed_entries(1), MTIME);

    let narrow = ws.config().cache_path_for(&ws.archive).unwrap();
    let wide = ws
        .config()
        .cache_key(CacheKey::Crc64)
        .cache_path_for(&ws.archive)
        .unwrap();

    let narrow_name = narrow.file_name().unwrap().to_str().unwrap();
    let wide_name = wide.file_name().unwrap().to_str().unwrap();
    assert_eq!(narrow_name.len(), 8 + ".idx".len());
    assert_eq!(wide_name.len(), 16 + ".idx".len());
    assert!(narrow_name.ends_with(".idx"));
    assert_eq!(narrow.parent().unwrap(), ws.cache_dir);

    let mut browser = Browser::new(ws.config().cache_key(CacheKey::Crc64));
    browser.open(&ws.archive).unwrap();
    browser.run_until_idle(&mut NoProgress);
    browser.close(&mut NoProgress);
    assert!(wide.exists());
    assert!(!narrow.exists());
}
