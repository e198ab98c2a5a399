//! Output formatting for CLI operations.

use std::path::PathBuf;
use std::time::Duration;

use datscope::format::ImageHeader;
use datscope::progress::{format_bytes_iec, format_duration};
use datscope::{DecoderKind, FileType, WriteOutcome};
use serde_json::json;

/// One indexed entry as listed
pub struct ListedEntry {
    pub entry_id: u32,
    pub file_type: FileType,
    pub kind: DecoderKind,
    pub category: String,
}

/// Freshness of an index cache relative to its archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No cache file exists
    Missing,
    /// The cache could not be parsed
    Corrupt,
    /// The cache covers every entry and matches the archive timestamp
    Complete,
    /// The cache matches the archive timestamp but not every entry
    Partial,
    /// The archive changed since the cache was written
    Stale,
    /// The cache does not belong to this archive
    Invalid,
}

impl Freshness {
    pub fn as_str(self) -> &'static str {
        match self {
            Freshness::Missing => "missing",
            Freshness::Corrupt => "corrupt",
            Freshness::Complete => "complete",
            Freshness::Partial => "partial",
            Freshness::Stale => "stale",
            Freshness::Invalid => "invalid",
        }
    }
}

/// Summary of an archive and its cached index
pub struct ArchiveSummary {
    pub archive: PathBuf,
    pub archive_size: u64,
    pub entry_count: u32,
    pub archive_timestamp: u64,
    pub cache_path: PathBuf,
    pub freshness: Freshness,
    pub indexed: usize,
    pub highest_seen: u32,
    /// Entry count per top-level category
    pub categories: Vec<(String, usize)>,
}

/// Classification of a single entry
pub struct EntryReport {
    pub entry_id: u32,
    pub size: usize,
    pub file_type: FileType,
    pub kind: DecoderKind,
    pub category: Option<String>,
    pub image: Option<ImageHeader>,
    pub head: Vec<u8>,
}

/// Result of an index run
pub struct IndexReport {
    pub entry_count: u32,
    pub indexed: usize,
    pub highest_seen: u32,
    pub interrupted: bool,
    pub elapsed: Duration,
    pub write: Option<WriteOutcome>,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a list of entries
    fn format_list(&self, entries: &[ListedEntry]) -> String;

    /// Formats archive information
    fn format_info(&self, summary: &ArchiveSummary) -> String;

    /// Formats a single entry
    fn format_entry(&self, report: &EntryReport) -> String;

    /// Formats indexing results
    fn format_index_result(&self, report: &IndexReport) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, entries: &[ListedEntry]) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{:>10} {:<12} {:<18} {}\n",
            "Entry", "Type", "Decoder", "Category"
        ));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        for entry in entries {
            output.push_str(&format!(
                "{:>10} {:<12} {:<18} {}\n",
                entry.entry_id,
                entry.file_type.name(),
                entry.kind.name(),
                entry.category
            ));
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!("{} entries\n", entries.len()));

        output
    }

    fn format_info(&self, summary: &ArchiveSummary) -> String {
        let mut output = String::new();

        output.push_str("Archive Information:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Archive:        {}\n", summary.archive.display()));
        output.push_str(&format!(
            "  Size:           {}\n",
            format_bytes_iec(summary.archive_size)
        ));
        output.push_str(&format!("  Entries:        {}\n", summary.entry_count));
        output.push_str(&format!("  Modified:       {}\n", summary.archive_timestamp));
        output.push_str(&format!(
            "  Cache:          {}\n",
            summary.cache_path.display()
        ));
        output.push_str(&format!(
            "  Freshness:      {}\n",
            summary.freshness.as_str()
        ));
        output.push_str(&format!(
            "  Indexed:        {} ({} of {} entries scanned)\n",
            summary.indexed, summary.highest_seen, summary.entry_count
        ));

        if !summary.categories.is_empty() {
            output.push_str("\nCategories:\n");
            for (name, count) in &summary.categories {
                output.push_str(&format!("  {:<20} {:>10}\n", name, count));
            }
        }

        output
    }

    fn format_entry(&self, report: &EntryReport) -> String {
        let mut output = String::new();

        output.push_str(&format!("Entry {}:\n", report.entry_id));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Size:           {} bytes\n", report.size));
        output.push_str(&format!("  Declared type:  {}\n", report.file_type));
        output.push_str(&format!("  Decoder:        {}\n", report.kind));
        if let Some(category) = &report.category {
            output.push_str(&format!("  Category:       {}\n", category));
        } else {
            output.push_str("  Category:       (not indexed)\n");
        }
        if let Some(image) = &report.image {
            output.push_str(&format!(
                "  Image:          {} {}x{}\n",
                image.format, image.width, image.height
            ));
        }
        output.push_str(&format!("  Head:           {}\n", hex(&report.head)));

        output
    }

    fn format_index_result(&self, report: &IndexReport) -> String {
        let mut output = String::new();

        if report.interrupted {
            output.push_str(&format!(
                "Interrupted after {} of {} entries\n",
                report.highest_seen, report.entry_count
            ));
        }
        output.push_str(&format!(
            "Indexed {} entries ({} of {} scanned)\n",
            report.indexed, report.highest_seen, report.entry_count
        ));
        output.push_str(&format!("Elapsed: {}\n", format_duration(report.elapsed)));
        match &report.write {
            Some(WriteOutcome::Written { path, .. }) => {
                output.push_str(&format!("Index written to {}\n", path.display()));
            }
            Some(WriteOutcome::Failed { path, reason }) => {
                output.push_str(&format!(
                    "Index NOT written to {}: {}\n",
                    path.display(),
                    reason
                ));
            }
            None => output.push_str("Index unchanged\n"),
        }

        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, entries: &[ListedEntry]) -> String {
        let items: Vec<_> = entries
            .iter()
            .map(|e| {
                json!({
                    "entry_id": e.entry_id,
                    "type": e.file_type.name(),
                    "decoder": e.kind.name(),
                    "category": e.category,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_info(&self, summary: &ArchiveSummary) -> String {
        let categories: serde_json::Map<String, serde_json::Value> = summary
            .categories
            .iter()
            .map(|(name, count)| (name.clone(), json!(count)))
            .collect();
        let obj = json!({
            "archive": summary.archive.display().to_string(),
            "archive_size": summary.archive_size,
            "entry_count": summary.entry_count,
            "archive_timestamp": summary.archive_timestamp,
            "cache_path": summary.cache_path.display().to_string(),
            "freshness": summary.freshness.as_str(),
            "indexed": summary.indexed,
            "highest_seen": summary.highest_seen,
            "categories": categories,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_entry(&self, report: &EntryReport) -> String {
        let obj = json!({
            "entry_id": report.entry_id,
            "size": report.size,
            "type": report.file_type.name(),
            "decoder": report.kind.name(),
            "category": report.category,
            "image": report.image.as_ref().map(|i| json!({
                "format": i.format.to_string(),
                "width": i.width,
                "height": i.height,
            })),
            "head": hex(&report.head),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_index_result(&self, report: &IndexReport) -> String {
        let write = report.write.as_ref().map(|w| match w {
            WriteOutcome::Written { path, entries } => json!({
                "success": true,
                "path": path.display().to_string(),
                "entries": entries,
            }),
            WriteOutcome::Failed { path, reason } => json!({
                "success": false,
                "path": path.display().to_string(),
                "error": reason,
            }),
        });
        let obj = json!({
            "entry_count": report.entry_count,
            "indexed": report.indexed,
            "highest_seen": report.highest_seen,
            "interrupted": report.interrupted,
            "elapsed_secs": report.elapsed.as_secs_f64(),
            "write": write,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Space-separated lowercase hex
fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(b"PF\x01"), "50 46 01");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_json_list() {
        let entries = [ListedEntry {
            entry_id: 7,
            file_type: FileType::Model,
            kind: DecoderKind::Model,
            category: "Models".to_string(),
        }];
        let value: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_list(&entries)).unwrap();
        assert_eq!(value[0]["entry_id"], 7);
        assert_eq!(value[0]["category"], "Models");
    }

    #[test]
    fn test_human_index_result() {
        let report = IndexReport {
            entry_count: 20,
            indexed: 4,
            highest_seen: 5,
            interrupted: true,
            elapsed: Duration::from_secs(90),
            write: None,
        };
        let text = HumanFormatter.format_index_result(&report);
        assert!(text.starts_with("Interrupted after 5 of 20 entries\n"));
        assert!(text.contains("Indexed 4 entries (5 of 20 scanned)\n"));
        assert!(text.contains("Elapsed: 1m 30s\n"));
        assert!(text.ends_with("Index unchanged\n"));
    }
}
