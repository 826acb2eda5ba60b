// src/feed/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::timeutil;

/// One telegraph item, normalized from the vendor feed. This is the record
/// that flows through the whole pipeline and the sidecar on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub id: String,
    pub content: String,
    /// `HH:MM` in the feed's civil zone; empty when the timestamp was missing.
    #[serde(default)]
    pub time_of_day: String,
    /// Unix seconds. Items without one cannot be date-archived.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub url: String,
    /// True when any configured keyword occurs in title + content.
    #[serde(default)]
    pub is_flagged: bool,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Telegram>>;
    fn name(&self) -> &'static str;
}

// ---- Raw wire shape ----

#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    pub error: Option<i64>,
    pub data: Option<FeedData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedData {
    pub roll_data: Option<Vec<RawItem>>,
}

/// The vendor is loose with types (numeric ids, 0/1 booleans), so the raw
/// item keeps `serde_json::Value` where needed and normalization sorts it out.
#[derive(Debug, Deserialize)]
pub(crate) struct RawItem {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub ctime: Option<serde_json::Value>,
    #[serde(default)]
    pub is_ad: Option<serde_json::Value>,
}

impl RawItem {
    pub(crate) fn is_advertisement(&self) -> bool {
        match &self.is_ad {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            _ => false,
        }
    }

    fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn ctime_i64(&self) -> Option<i64> {
        match &self.ctime {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Normalize into a `Telegram`. Returns `None` for ads and id-less
    /// entries, which are useless to every downstream step.
    pub(crate) fn normalize(&self, keywords: &[String], detail_base: &str) -> Option<Telegram> {
        if self.is_advertisement() {
            return None;
        }
        let id = self.id_string()?;

        let title = self.title.clone().unwrap_or_default();
        let brief = self.brief.clone().unwrap_or_default();
        let content = if brief.is_empty() { title.clone() } else { brief };

        let timestamp = self.ctime_i64();
        let time_of_day = match timestamp {
            Some(ts) => {
                let hm = timeutil::hhmm(ts);
                if hm.is_empty() {
                    tracing::warn!(id = %id, ctime = ?self.ctime, "unparsable timestamp");
                }
                hm
            }
            None => String::new(),
        };
        // Out-of-range ctime is treated the same as a missing one.
        let timestamp = timestamp.filter(|_| !time_of_day.is_empty());

        let haystack = format!("{title}{content}");
        let is_flagged = keywords.iter().any(|k| haystack.contains(k.as_str()));

        Some(Telegram {
            url: format!("{detail_base}/{id}"),
            id,
            content,
            time_of_day,
            timestamp,
            is_flagged,
        })
    }
}
