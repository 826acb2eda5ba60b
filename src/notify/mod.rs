// src/notify/mod.rs
pub mod webhook;

pub use webhook::WebhookNotifier;

use crate::feed::types::Telegram;

/// One `[time] content - url` line per item, double-newline separated.
/// Items are expected in the archive's display order (newest first).
pub fn format_digest(items: &[Telegram]) -> String {
    items
        .iter()
        .map(|t| {
            format!(
                "[{}] {} - {}",
                if t.time_of_day.is_empty() { "未知时间" } else { t.time_of_day.as_str() },
                if t.content.is_empty() { "无内容" } else { t.content.as_str() },
                if t.url.is_empty() { "无链接" } else { t.url.as_str() },
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_joins_with_blank_lines_and_fills_blanks() {
        let items = vec![
            Telegram {
                id: "1".into(),
                content: "A".into(),
                time_of_day: "10:00".into(),
                timestamp: Some(1),
                url: "https://x/detail/1".into(),
                is_flagged: false,
            },
            Telegram {
                id: "2".into(),
                content: String::new(),
                time_of_day: String::new(),
                timestamp: Some(2),
                url: String::new(),
                is_flagged: false,
            },
        ];
        let digest = format_digest(&items);
        assert_eq!(
            digest,
            "[10:00] A - https://x/detail/1\n\n[未知时间] 无内容 - 无链接"
        );
    }
}
