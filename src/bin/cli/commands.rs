//! Command implementations for the CLI tool.

use std::path::Path;
use std::sync::Arc;

use datscope::dat::{DatArchive, EntrySource, modification_time};
use datscope::index::{ROOT, cache};
use datscope::progress::{AtomicProgress, NoProgress, ThrottledProgress};
use datscope::{Browser, Error, IndexStore, IndexerConfig};
use glob::Pattern;

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{
    ArchiveSummary, EntryReport, Freshness, IndexReport, ListedEntry, create_formatter,
};
use crate::progress::CliProgress;

/// Leading bytes shown by `show`.
const HEAD_LEN: usize = 16;

/// Options shared by every command.
pub struct GlobalOptions {
    pub config: IndexerConfig,
    pub format: OutputFormat,
    pub quiet: bool,
    pub cancel: Arc<AtomicProgress>,
}

/// Index command implementation
pub fn index(archive_path: &Path, full: bool, opts: &GlobalOptions) -> ExitCode {
    let formatter = create_formatter(opts.format);

    let mut browser = match open_browser(archive_path, opts) {
        Ok(b) => b,
        Err(code) => return code,
    };
    if full {
        if let Err(e) = browser.reindex() {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    }

    let mut progress = cli_progress(opts);
    let outcome = build_index(&mut browser, &mut progress);
    progress.get_ref().finish();

    let report = IndexReport {
        entry_count: browser.entry_count(),
        indexed: browser.store().len(),
        highest_seen: browser.store().highest_seen(),
        interrupted: outcome.is_err(),
        elapsed: opts.cancel.elapsed(),
        write: browser.last_write().cloned(),
    };
    print!("{}", formatter.format_index_result(&report));

    if let Err(e) = outcome {
        error_to_exit_code(&e)
    } else if report.write.as_ref().is_some_and(|w| !w.is_success()) {
        ExitCode::IoError
    } else {
        ExitCode::Success
    }
}

/// List command implementation
pub fn list(
    archive_path: &Path,
    category: Option<&str>,
    file_type: Option<&str>,
    opts: &GlobalOptions,
) -> ExitCode {
    let formatter = create_formatter(opts.format);

    let pattern = match category.map(Pattern::new).transpose() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: invalid category pattern: {}", e);
            return ExitCode::BadArgs;
        }
    };

    let mut browser = match open_browser(archive_path, opts) {
        Ok(b) => b,
        Err(code) => return code,
    };
    let mut progress = cli_progress(opts);
    let outcome = build_index(&mut browser, &mut progress);
    progress.get_ref().finish();
    if let Err(e) = outcome {
        eprintln!("Interrupted; listing skipped");
        return error_to_exit_code(&e);
    }

    let store = browser.store();
    let entries: Vec<ListedEntry> = store
        .entries()
        .iter()
        .map(|e| ListedEntry {
            entry_id: e.entry_id,
            file_type: e.file_type,
            kind: e.kind,
            category: store.category_path(e.category).join("/"),
        })
        .filter(|e| pattern.as_ref().is_none_or(|p| p.matches(&e.category)))
        .filter(|e| file_type.is_none_or(|t| matches_type(e, t)))
        .collect();

    print!("{}", formatter.format_list(&entries));
    ExitCode::Success
}

/// Info command implementation
///
/// Reads the cache without modifying it.
pub fn info(archive_path: &Path, opts: &GlobalOptions) -> ExitCode {
    let formatter = create_formatter(opts.format);

    let archive = match DatArchive::open_path(archive_path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error opening archive: {}", e);
            return error_to_exit_code(&e);
        }
    };
    let result = modification_time(archive_path)
        .and_then(|ts| Ok((ts, opts.config.cache_path_for(archive_path)?)));
    let (archive_timestamp, cache_path) = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    let entry_count = archive.entry_count();
    let (freshness, store) = match cache::load(&cache_path) {
        Ok(store) => (
            freshness(&store, entry_count, archive_timestamp),
            Some(store),
        ),
        Err(Error::CacheMiss { .. }) => (Freshness::Missing, None),
        Err(e) => {
            log::warn!("{}", e);
            (Freshness::Corrupt, None)
        }
    };

    let categories: Vec<(String, usize)> = store
        .as_ref()
        .and_then(|s| Some((s, s.category(ROOT)?)))
        .map(|(s, root)| {
            root.children()
                .iter()
                .filter_map(|&id| {
                    let name = s.category(id)?.name().to_string();
                    Some((name, s.entries_under(id).len()))
                })
                .collect()
        })
        .unwrap_or_default();

    let summary = ArchiveSummary {
        archive: archive_path.to_path_buf(),
        archive_size: std::fs::metadata(archive_path).map_or(0, |m| m.len()),
        entry_count,
        archive_timestamp,
        cache_path,
        freshness,
        indexed: store.as_ref().map_or(0, IndexStore::len),
        highest_seen: store.as_ref().map_or(0, IndexStore::highest_seen),
        categories,
    };
    print!("{}", formatter.format_info(&summary));
    ExitCode::Success
}

/// Show command implementation
pub fn show(archive_path: &Path, entry_id: u32, opts: &GlobalOptions) -> ExitCode {
    let formatter = create_formatter(opts.format);

    let mut browser = match open_browser(archive_path, opts) {
        Ok(b) => b,
        Err(code) => return code,
    };
    // One step loads an existing cache; nothing is scanned or written
    if browser.cache_path().is_some_and(Path::exists) {
        browser.pump(&mut NoProgress);
    }

    let reader = match browser.view_entry(entry_id) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };
    let store = browser.store();
    let category = store
        .entry_by_id(entry_id)
        .map(|e| store.category_path(e.category).join("/"));

    let data = reader.raw_data();
    let report = EntryReport {
        entry_id,
        size: data.len(),
        file_type: reader.file_type(),
        kind: reader.kind(),
        category,
        image: reader.image_header(),
        head: data[..data.len().min(HEAD_LEN)].to_vec(),
    };
    print!("{}", formatter.format_entry(&report));
    ExitCode::Success
}

/// Cache path command implementation
pub fn cache_path(archive_path: &Path, opts: &GlobalOptions) -> ExitCode {
    match opts.config.cache_path_for(archive_path) {
        Ok(path) => {
            match opts.format {
                OutputFormat::Human => println!("{}", path.display()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({
                        "archive": archive_path.display().to_string(),
                        "cache_path": path.display().to_string(),
                    })
                ),
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        }
    }
}

/// Helper to open an archive in a fresh browser
fn open_browser(path: &Path, opts: &GlobalOptions) -> Result<Browser, ExitCode> {
    let mut browser = Browser::new(opts.config.clone());
    browser.open(path).map_err(|e| {
        eprintln!("Error opening archive: {}", e);
        error_to_exit_code(&e)
    })?;
    Ok(browser)
}

/// A progress bar redrawn at most every 100ms; scans report every entry
fn cli_progress(opts: &GlobalOptions) -> ThrottledProgress<CliProgress> {
    ThrottledProgress::default_interval(CliProgress::new(opts.cancel.clone(), opts.quiet))
}

/// Runs every pending task, then closes the browser so a dirty index is
/// written.
///
/// Returns [`Error::Cancelled`] if Ctrl+C interrupted the scan. The partial
/// index is written all the same.
fn build_index(
    browser: &mut Browser,
    progress: &mut ThrottledProgress<CliProgress>,
) -> datscope::Result<()> {
    browser.run_until_idle(progress);
    let interrupted = progress.get_ref().is_cancelled();
    if interrupted {
        progress
            .get_ref()
            .finish_with_message("Interrupted; saving partial index");
    }
    browser.close(progress);
    if interrupted {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

fn freshness(store: &IndexStore, entry_count: u32, archive_timestamp: u64) -> Freshness {
    let cached = store.source_timestamp();
    if store.highest_seen() > entry_count || cached > archive_timestamp {
        Freshness::Invalid
    } else if cached < archive_timestamp {
        Freshness::Stale
    } else if store.highest_seen() == entry_count {
        Freshness::Complete
    } else {
        Freshness::Partial
    }
}

/// Matches a declared type or decoder name, ignoring case
fn matches_type(entry: &ListedEntry, wanted: &str) -> bool {
    entry.file_type.name().eq_ignore_ascii_case(wanted)
        || entry.kind.name().eq_ignore_ascii_case(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datscope::dat::MemoryArchive;
    use datscope::{DecoderKind, FileType};

    fn store(timestamp: u64, highest: u32) -> IndexStore {
        let mut store = IndexStore::new();
        store.insert(0, FileType::Unknown, DecoderKind::GenericRaw, ROOT, "0");
        store.set_source_timestamp(timestamp);
        store.advance_highest_seen(highest);
        store
    }

    #[test]
    fn test_freshness() {
        assert_eq!(freshness(&store(10, 5), 5, 10), Freshness::Complete);
        assert_eq!(freshness(&store(10, 3), 5, 10), Freshness::Partial);
        assert_eq!(freshness(&store(9, 3), 5, 10), Freshness::Stale);
        assert_eq!(freshness(&store(11, 3), 5, 10), Freshness::Invalid);
        assert_eq!(freshness(&store(10, 6), 5, 10), Freshness::Invalid);
    }

    #[test]
    fn test_matches_type() {
        let entry = ListedEntry {
            entry_id: 1,
            file_type: FileType::Atex,
            kind: DecoderKind::Image,
            category: "Textures/ATEX/256x256".to_string(),
        };
        assert!(matches_type(&entry, "atex"));
        assert!(matches_type(&entry, "IMAGE"));
        assert!(!matches_type(&entry, "model"));
    }

    #[test]
    fn test_build_index_reports_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let opts = GlobalOptions {
            config: IndexerConfig::new().cache_dir(dir.path()),
            format: OutputFormat::Human,
            quiet: true,
            cancel: AtomicProgress::shared(),
        };
        let mut browser = Browser::new(opts.config.clone());
        let archive = MemoryArchive::new(vec![b"entry".to_vec(); 8]);
        browser.open_source(Box::new(archive), "/a.dat", 1).unwrap();

        opts.cancel.cancel();
        let mut progress = cli_progress(&opts);
        let outcome = build_index(&mut browser, &mut progress);
        assert!(matches!(outcome, Err(Error::Cancelled)));
        assert!(browser.is_closed());
        assert!(browser.store().highest_seen() < 8);
    }

    #[test]
    fn test_build_index_completes() {
        let dir = tempfile::tempdir().unwrap();
        let opts = GlobalOptions {
            config: IndexerConfig::new().cache_dir(dir.path()),
            format: OutputFormat::Json,
            quiet: true,
            cancel: AtomicProgress::shared(),
        };
        let mut browser = Browser::new(opts.config.clone());
        let archive = MemoryArchive::new(vec![b"entry".to_vec(); 8]);
        browser.open_source(Box::new(archive), "/a.dat", 1).unwrap();

        let mut progress = cli_progress(&opts);
        assert!(build_index(&mut browser, &mut progress).is_ok());
        assert_eq!(browser.store().highest_seen(), 8);
        assert!(browser.last_write().unwrap().is_success());
    }
}
