// src/archive/mod.rs
// Per-civil-date persistence. The JSON-lines sidecar is the source of truth;
// the Markdown file next to it is a projection for humans. Legacy days that
// only have the Markdown file are still readable, at the cost of losing the
// original timestamps.

pub mod render;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::feed::types::Telegram;
use crate::timeutil;

pub use render::{parse_markdown, render_markdown, FLAGGED_HEADER, NORMAL_HEADER, SEPARATOR};

static ARCHIVE_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cls_\d{4}-\d{2}-\d{2}\.md$").unwrap());

/// What a merge run actually did: the records persisted for the first time
/// this run (exactly what the notifier should send) and whether any file
/// changed on disk.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub new_items: Vec<Telegram>,
    pub wrote_any: bool,
}

impl MergeOutcome {
    pub fn any_new(&self) -> bool {
        !self.new_items.is_empty()
    }
}

pub struct ArchiveStore {
    output_dir: PathBuf,
}

impl ArchiveStore {
    /// Failing to create the output directory is the one fatal error in the
    /// whole pipeline.
    pub fn new(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output dir {}", output_dir.display()))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn markdown_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(format!("cls_{}.md", timeutil::date_str(date)))
    }

    pub fn sidecar_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(format!("cls_{}.jsonl", timeutil::date_str(date)))
    }

    /// Load everything already recorded for `date`. Read or parse problems
    /// degrade to an empty day, they never abort the caller.
    pub fn load_existing(&self, date: NaiveDate) -> Vec<Telegram> {
        let sidecar = self.sidecar_path(date);
        if sidecar.exists() {
            match fs::read_to_string(&sidecar) {
                Ok(content) => return parse_sidecar(&content),
                Err(e) => {
                    tracing::warn!(error = ?e, path = %sidecar.display(), "sidecar unreadable");
                }
            }
        }
        let md = self.markdown_path(date);
        if md.exists() {
            match fs::read_to_string(&md) {
                Ok(content) => return parse_markdown(&content),
                Err(e) => {
                    tracing::warn!(error = ?e, path = %md.display(), "archive unreadable");
                }
            }
        }
        Vec::new()
    }

    /// Merge a fetched batch into the dated archives. Items without a
    /// timestamp cannot be dated and are dropped here (and therefore also
    /// from the notification, which is fed from the returned outcome).
    pub fn merge_and_persist(&self, fetched: &[Telegram]) -> MergeOutcome {
        let mut by_date: BTreeMap<NaiveDate, Vec<Telegram>> = BTreeMap::new();
        for t in fetched {
            match t.timestamp.and_then(timeutil::civil_date) {
                Some(d) => by_date.entry(d).or_default().push(t.clone()),
                None => {
                    tracing::warn!(id = %t.id, "telegram has no usable timestamp, not archivable");
                }
            }
        }

        let mut outcome = MergeOutcome::default();
        for (date, batch) in by_date {
            match self.merge_one_date(date, batch) {
                Ok((new_items, wrote)) => {
                    outcome.wrote_any |= wrote;
                    outcome.new_items.extend(new_items);
                }
                Err(e) => {
                    // One bad day must not poison the others.
                    tracing::warn!(error = ?e, date = %timeutil::date_str(date), "archive merge failed for date");
                }
            }
        }
        outcome
            .new_items
            .sort_by_key(|t| std::cmp::Reverse(t.timestamp.unwrap_or(0)));
        outcome
    }

    fn merge_one_date(
        &self,
        date: NaiveDate,
        batch: Vec<Telegram>,
    ) -> Result<(Vec<Telegram>, bool)> {
        let existing = self.load_existing(date);
        let existing_ids: HashSet<&str> = existing.iter().map(|t| t.id.as_str()).collect();

        let mut truly_new: Vec<Telegram> = Vec::new();
        for t in batch {
            if existing_ids.contains(t.id.as_str()) {
                continue;
            }
            // A batch can repeat an id; the later record wins.
            match truly_new.iter_mut().find(|n| n.id == t.id) {
                Some(slot) => *slot = t,
                None => truly_new.push(t),
            }
        }
        if truly_new.is_empty() {
            tracing::debug!(date = %timeutil::date_str(date), "no new telegrams for date");
            return Ok((Vec::new(), false));
        }

        let mut merged = existing;
        merged.extend(truly_new.iter().cloned());
        // Descending by time; records without a timestamp (legacy Markdown
        // parses) sink to the bottom as if they were oldest.
        merged.sort_by_key(|t| std::cmp::Reverse(t.timestamp.unwrap_or(0)));

        let rendered = render_markdown(&merged);
        let md_path = self.markdown_path(date);
        let current = if md_path.exists() {
            fs::read_to_string(&md_path).unwrap_or_default()
        } else {
            String::new()
        };

        let mut wrote = false;
        if rendered != current {
            fs::write(&md_path, &rendered)
                .with_context(|| format!("writing {}", md_path.display()))?;
            tracing::info!(
                date = %timeutil::date_str(date),
                added = truly_new.len(),
                total = merged.len(),
                "archive updated"
            );
            wrote = true;
        } else {
            tracing::info!(date = %timeutil::date_str(date), "archive content unchanged");
        }

        let sidecar = self.sidecar_path(date);
        write_sidecar(&sidecar, &merged)
            .with_context(|| format!("writing {}", sidecar.display()))?;

        Ok((truly_new, wrote))
    }

    /// Retention sweep: keep the `keep` most recently modified dated archive
    /// files, delete the rest (sidecars go with their Markdown file).
    pub fn prune_old(&self, keep: usize) {
        let entries = match fs::read_dir(&self.output_dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = ?e, "retention sweep cannot list output dir");
                return;
            }
        };

        let mut dated: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !ARCHIVE_FILE_RE.is_match(name) {
                continue;
            }
            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            dated.push((path, mtime));
        }

        dated.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in dated.into_iter().skip(keep) {
            match fs::remove_file(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "retention removed archive"),
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "retention delete failed");
                    continue;
                }
            }
            let sidecar = path.with_extension("jsonl");
            if sidecar.exists() {
                if let Err(e) = fs::remove_file(&sidecar) {
                    tracing::warn!(error = ?e, path = %sidecar.display(), "sidecar delete failed");
                }
            }
        }
    }
}

fn parse_sidecar(content: &str) -> Vec<Telegram> {
    let mut items = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Telegram>(line) {
            Ok(t) => items.push(t),
            Err(e) => tracing::warn!(error = ?e, line = %line, "bad sidecar line, skipping"),
        }
    }
    items
}

fn write_sidecar(path: &Path, items: &[Telegram]) -> Result<()> {
    let mut out = String::new();
    for t in items {
        out.push_str(&serde_json::to_string(t)?);
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}
