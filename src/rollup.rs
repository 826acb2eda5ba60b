// src/rollup.rs
// Five-day rollup: one regenerable document combining the per-date archives.
// Safe to run on its own schedule; the `rollup` subcommand exists for that.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;

use crate::archive::{parse_markdown, ArchiveStore, FLAGGED_HEADER, NORMAL_HEADER, SEPARATOR};
use crate::timeutil;

pub const ROLLUP_DAYS: u64 = 5;
const NO_DATA_LINE: &str = "- 本日无数据\n\n";

static ROLLUP_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^rollup_\d{8}_\d{6}\.md$").unwrap());

pub fn build_rollup(store: &ArchiveStore) -> Result<PathBuf> {
    build_rollup_for(store, timeutil::now_beijing().date_naive())
}

/// Build the rollup treating `today` as the newest scanned date. Split out so
/// tests can pin the window.
pub fn build_rollup_for(store: &ArchiveStore, today: NaiveDate) -> Result<PathBuf> {
    let dates: Vec<NaiveDate> = (0..ROLLUP_DAYS)
        .filter_map(|i| today.checked_sub_days(Days::new(i)))
        .collect();
    let oldest = *dates.last().unwrap_or(&today);

    let mut doc = String::new();
    doc.push_str("# 财联社电报5日汇总\n\n");
    doc.push_str(&format!(
        "生成时间: {}\n",
        timeutil::format_datetime(&timeutil::now_beijing())
    ));
    doc.push_str(&format!(
        "统计范围: {} 至 {}\n\n",
        timeutil::date_str(oldest),
        timeutil::date_str(today)
    ));

    let mut total_items = 0usize;
    for date in &dates {
        doc.push_str(&format!("## {}\n\n", timeutil::date_str(*date)));

        let md_path = store.markdown_path(*date);
        let content = match fs::read_to_string(&md_path) {
            Ok(c) => c,
            Err(e) => {
                if md_path.exists() {
                    tracing::warn!(error = ?e, path = %md_path.display(), "rollup cannot read archive");
                }
                doc.push_str(NO_DATA_LINE);
                continue;
            }
        };

        let mut wrote_section = false;
        for header in [FLAGGED_HEADER, NORMAL_HEADER] {
            if let Some(section) = extract_section(&content, header) {
                total_items += parse_markdown(&section).len();
                doc.push_str(header);
                doc.push_str("\n\n");
                doc.push_str(&section);
                wrote_section = true;
            }
        }
        if !wrote_section {
            doc.push_str(NO_DATA_LINE);
        }
    }

    doc.push_str(&format!("---\n\n共计 {total_items} 条电报\n"));

    let filename = format!(
        "rollup_{}.md",
        timeutil::now_beijing().format("%Y%m%d_%H%M%S")
    );
    let path = store.output_dir().join(&filename);
    fs::write(&path, &doc).with_context(|| format!("writing rollup {}", path.display()))?;
    tracing::info!(path = %path.display(), items = total_items, "rollup written");

    remove_stale_rollups(store, &filename);
    Ok(path)
}

/// Lines belonging to `header`, verbatim, up to the next section header or
/// the separator line.
fn extract_section(content: &str, header: &str) -> Option<String> {
    let mut in_section = false;
    let mut out = String::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(header) {
            in_section = true;
            continue;
        }
        if in_section {
            if trimmed.starts_with(FLAGGED_HEADER)
                || trimmed.starts_with(NORMAL_HEADER)
                || trimmed.starts_with(SEPARATOR)
            {
                break;
            }
            out.push_str(line);
            out.push('\n');
        }
    }
    in_section.then_some(out)
}

/// Keep exactly one live rollup: delete every other generated document.
fn remove_stale_rollups(store: &ArchiveStore, keep_name: &str) {
    let entries = match fs::read_dir(store.output_dir()) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = ?e, "cannot list output dir for stale rollups");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == keep_name || !ROLLUP_FILE_RE.is_match(name) {
            continue;
        }
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(error = ?e, path = %path.display(), "stale rollup delete failed");
        }
    }
}
