// src/export.rs
// JSON export for the desktop viewer: a flat news list plus derived
// keyword-sentiment and stock-mention statistics over the last five days.
// Independent of the fetch/notify pipeline; runs from its own subcommand.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::archive::ArchiveStore;
use crate::timeutil;

pub const TOPIC_KEYWORDS: &[&str] = &[
    "机器人", "无人机", "军工", "算力", "芯片", "新能源", "人工智能", "半导体",
];

pub const STOCK_NAMES: &[&str] = &[
    "华为", "腾讯", "药明康德", "理想汽车", "京东", "宁德时代", "山河智能",
    "小米", "长城军工", "胜通能源", "东杰智能", "中际旭创", "中马传动",
    "上纬新材", "阿里巴巴", "福元医药", "利德曼", "航天电子", "思特奇",
    "网易", "比亚迪", "TCL", "英伟达", "谷歌",
];

const POSITIVE_WORDS: &[&str] = &["利好", "上涨", "突破", "增长", "涨停"];
const NEGATIVE_WORDS: &[&str] = &["利空", "下跌", "暴跌", "风险", "警告"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsEntry {
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotEntry {
    pub date: String,
    pub keyword: String,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDoc {
    pub last_update: String,
    pub news_data: Vec<NewsEntry>,
    pub hotspot_data: Vec<HotspotEntry>,
    /// `[name, mention count]` pairs, most mentioned first.
    pub stock_data: Vec<(String, u64)>,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDoc {
    pub last_update: String,
    pub news_count: usize,
    pub date_range: DateRange,
    pub top_keywords: Vec<HotspotEntry>,
    pub top_stocks: Vec<(String, u64)>,
}

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip control characters and collapse whitespace so the exported strings
/// can never break a JSON consumer.
pub fn clean_text(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    RE_WS.replace_all(&replaced, " ").trim().to_string()
}

pub fn generate_exports(store: &ArchiveStore) -> Result<()> {
    generate_exports_for(store, timeutil::now_beijing().date_naive())
}

pub fn generate_exports_for(store: &ArchiveStore, today: NaiveDate) -> Result<()> {
    let json_dir = store.output_dir().join("json");
    fs::create_dir_all(&json_dir)
        .with_context(|| format!("creating {}", json_dir.display()))?;

    let news_data = collect_news(store, today);
    let hotspot_data = build_hotspots(&news_data);
    let stock_data = build_stock_counts(&news_data);

    let oldest = today
        .checked_sub_days(Days::new(4))
        .unwrap_or(today);
    let date_range = DateRange {
        start: timeutil::date_str(oldest),
        end: timeutil::date_str(today),
    };
    let last_update = timeutil::now_beijing().to_rfc3339();

    let summary = SummaryDoc {
        last_update: last_update.clone(),
        news_count: news_data.len(),
        date_range: DateRange {
            start: date_range.start.clone(),
            end: date_range.end.clone(),
        },
        top_keywords: hotspot_data.iter().take(10).cloned().collect(),
        top_stocks: stock_data.iter().take(15).cloned().collect(),
    };
    let doc = ExportDoc {
        last_update,
        news_data,
        hotspot_data,
        stock_data,
        date_range,
    };

    write_validated(&json_dir.join("cls_data.json"), &doc)?;
    write_validated(&json_dir.join("cls_summary.json"), &summary)?;
    tracing::info!(
        news = doc.news_data.len(),
        hotspots = doc.hotspot_data.len(),
        stocks = doc.stock_data.len(),
        "json export written"
    );
    Ok(())
}

fn collect_news(store: &ArchiveStore, today: NaiveDate) -> Vec<NewsEntry> {
    let mut news = Vec::new();
    for offset in 0..5u64 {
        let Some(date) = today.checked_sub_days(Days::new(offset)) else {
            continue;
        };
        for item in store.load_existing(date) {
            let content = clean_text(&item.content);
            if content.is_empty() {
                continue;
            }
            news.push(NewsEntry {
                date: timeutil::date_str(date),
                time: if item.time_of_day.is_empty() {
                    "00:00".to_string()
                } else {
                    item.time_of_day.clone()
                },
                kind: (if item.is_flagged { "important" } else { "general" }).to_string(),
                content,
            });
        }
    }
    news.sort_by(|a, b| {
        format!("{} {}", b.date, b.time).cmp(&format!("{} {}", a.date, a.time))
    });
    news
}

fn build_hotspots(news: &[NewsEntry]) -> Vec<HotspotEntry> {
    let mut stats: BTreeMap<(String, String), (u64, u64, u64)> = BTreeMap::new();
    for entry in news {
        for keyword in TOPIC_KEYWORDS {
            if !entry.content.contains(keyword) {
                continue;
            }
            let slot = stats
                .entry((entry.date.clone(), keyword.to_string()))
                .or_default();
            if entry.kind == "important" {
                if POSITIVE_WORDS.iter().any(|w| entry.content.contains(w)) {
                    slot.0 += 1;
                } else if NEGATIVE_WORDS.iter().any(|w| entry.content.contains(w)) {
                    slot.1 += 1;
                } else {
                    slot.2 += 1;
                }
            } else {
                slot.2 += 1;
            }
        }
    }

    let mut out: Vec<HotspotEntry> = stats
        .into_iter()
        .map(|((date, keyword), (positive, negative, neutral))| HotspotEntry {
            date,
            keyword,
            positive,
            negative,
            neutral,
        })
        .collect();
    // Newest dates first, keywords alphabetical within a date.
    out.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.keyword.cmp(&b.keyword)));
    out
}

fn build_stock_counts(news: &[NewsEntry]) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in news {
        for stock in STOCK_NAMES {
            if entry.content.contains(stock) {
                *counts.entry(stock).or_default() += 1;
            }
        }
    }
    let mut out: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Write pretty-printed JSON, then re-read and re-parse it. The export only
/// counts as written if the round-trip succeeds.
fn write_validated<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(doc)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, &rendered).with_context(|| format!("writing {}", path.display()))?;

    let read_back =
        fs::read_to_string(path).with_context(|| format!("re-reading {}", path.display()))?;
    serde_json::from_str::<serde_json::Value>(&read_back)
        .with_context(|| format!("{} failed json validation", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, kind: &str, content: &str) -> NewsEntry {
        NewsEntry {
            date: date.to_string(),
            time: "10:00".to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn clean_text_strips_control_chars() {
        assert_eq!(clean_text("a\r\nb\tc   d"), "a b c d");
        assert_eq!(clean_text("  \n "), "");
    }

    #[test]
    fn important_news_with_positive_word_counts_positive() {
        let news = vec![
            entry("2024-01-02", "important", "芯片行业利好"),
            entry("2024-01-02", "important", "芯片需求下跌风险"),
            entry("2024-01-02", "general", "芯片产线投产"),
        ];
        let hs = build_hotspots(&news);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs[0].keyword, "芯片");
        assert_eq!((hs[0].positive, hs[0].negative, hs[0].neutral), (1, 1, 1));
    }

    #[test]
    fn stock_counts_sort_by_mentions() {
        let news = vec![
            entry("2024-01-02", "general", "华为与比亚迪合作"),
            entry("2024-01-02", "general", "华为发布新品"),
        ];
        let stocks = build_stock_counts(&news);
        assert_eq!(stocks[0], ("华为".to_string(), 2));
        assert_eq!(stocks[1], ("比亚迪".to_string(), 1));
    }
}
