// src/config.rs
// Immutable runtime configuration, built once in main and passed by
// reference into each component. Values come from the process environment
// (after an optional .env load) plus an optional keyword file.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_OUTPUT_DIR: &str = "CLS_OUTPUT_DIR";
pub const ENV_WEBHOOK_URL: &str = "CLS_WEBHOOK_URL";
pub const ENV_USE_PROXY: &str = "CLS_USE_PROXY";
pub const ENV_PROXY_URL: &str = "CLS_PROXY_URL";
pub const ENV_KEYWORDS_PATH: &str = "CLS_KEYWORDS_PATH";
pub const ENV_RETENTION: &str = "CLS_RETENTION";

pub const FEED_URL: &str = "https://www.cls.cn/nodeapi/updateTelegraphList";
pub const DETAIL_BASE_URL: &str = "https://www.cls.cn/detail";

/// Words that mark a telegram as "red" (important). Case-sensitive substring
/// match against title + content, matching the vendor site's behavior.
pub const DEFAULT_RED_KEYWORDS: &[&str] = &[
    "利好", "利空", "重要", "突发", "紧急", "关注", "提醒", "涨停", "大跌", "突破",
];

/// Bounded retry: `attempts` tries total, `delay` plus up to `jitter` of
/// random extra sleep between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
            jitter: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    /// Fixed query parameters sent with every feed request; the signature is
    /// derived from these.
    pub app_params: Vec<(String, String)>,
    pub red_keywords: Vec<String>,
    pub output_dir: PathBuf,
    pub webhook_url: Option<String>,
    pub proxy_url: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// How many dated archive files the retention sweep keeps.
    pub retention: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let output_dir = std::env::var(ENV_OUTPUT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("output/cls"));

        let webhook_url = std::env::var(ENV_WEBHOOK_URL)
            .ok()
            .filter(|s| !s.trim().is_empty());

        let use_proxy = std::env::var(ENV_USE_PROXY)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        let proxy_url = if use_proxy {
            Some(
                std::env::var(ENV_PROXY_URL)
                    .unwrap_or_else(|_| "http://127.0.0.1:10086".to_string()),
            )
        } else {
            None
        };

        let retention = match std::env::var(ENV_RETENTION) {
            Ok(v) => v
                .parse::<usize>()
                .with_context(|| format!("{ENV_RETENTION}={v} is not a count"))?,
            Err(_) => 30,
        };

        Ok(Self {
            feed_url: FEED_URL.to_string(),
            app_params: vec![
                ("app_name".to_string(), "CailianpressWeb".to_string()),
                ("os".to_string(), "web".to_string()),
                ("sv".to_string(), "7.7.5".to_string()),
            ],
            red_keywords: load_keywords_default()?,
            output_dir,
            webhook_url,
            proxy_url,
            request_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            retention,
        })
    }
}

/// Load the red-keyword list from an explicit path. TOML or JSON.
pub fn load_keywords_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading keywords from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_keywords(&content, ext.as_str())
}

/// Resolution order:
/// 1) $CLS_KEYWORDS_PATH
/// 2) config/keywords.toml
/// 3) config/keywords.json
/// 4) built-in DEFAULT_RED_KEYWORDS
pub fn load_keywords_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_keywords_from(&pb);
        }
        return Err(anyhow!("{ENV_KEYWORDS_PATH} points to a non-existent path"));
    }
    let toml_p = PathBuf::from("config/keywords.toml");
    if toml_p.exists() {
        return load_keywords_from(&toml_p);
    }
    let json_p = PathBuf::from("config/keywords.json");
    if json_p.exists() {
        return load_keywords_from(&json_p);
    }
    Ok(DEFAULT_RED_KEYWORDS.iter().map(|s| s.to_string()).collect())
}

fn parse_keywords(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("keywords");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported keyword file format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct KeywordFile {
        keywords: Vec<String>,
    }
    let v: KeywordFile = toml::from_str(s)?;
    Ok(clean_list(v.keywords))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o: &String| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
