// src/archive/render.rs
// The human-readable projection of a day's telegrams, and the lossy parser
// for legacy files that predate the JSON-lines sidecar.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::feed::types::Telegram;

pub const FLAGGED_HEADER: &str = "**🔴 重要电报**";
pub const NORMAL_HEADER: &str = "**📰 一般电报**";
pub const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━";

/// `  - [HH:MM] **[content](url)**` with the bold marks only on flagged items.
static ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*-\s*\[(\d{2}:\d{2})\]\s*(?:\*\*)?\[(.*?)\]\((\S+?/detail/(\d+))\)(?:\*\*)?\s*$")
        .unwrap()
});

fn render_line(t: &Telegram) -> String {
    match (t.is_flagged, t.url.is_empty()) {
        (true, false) => format!("  - [{}] **[{}]({})**\n\n", t.time_of_day, t.content, t.url),
        (true, true) => format!("  - [{}] **{}**\n\n", t.time_of_day, t.content),
        (false, false) => format!("  - [{}] [{}]({})\n\n", t.time_of_day, t.content, t.url),
        (false, true) => format!("  - [{}] {}\n\n", t.time_of_day, t.content),
    }
}

/// Render one day's items, already sorted, into the two-section document.
/// Empty input renders to an empty string (callers skip the write).
pub fn render_markdown(items: &[Telegram]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let flagged: Vec<&Telegram> = items.iter().filter(|t| t.is_flagged).collect();
    let normal: Vec<&Telegram> = items.iter().filter(|t| !t.is_flagged).collect();

    let mut out = String::new();
    if !flagged.is_empty() {
        out.push_str(FLAGGED_HEADER);
        out.push_str("\n\n");
        for t in &flagged {
            out.push_str(&render_line(t));
        }
        if !normal.is_empty() {
            out.push_str(SEPARATOR);
            out.push_str("\n\n");
        }
    }
    if !normal.is_empty() {
        out.push_str(NORMAL_HEADER);
        out.push_str("\n\n");
        for t in &normal {
            out.push_str(&render_line(t));
        }
    }
    out
}

/// Parse a rendered document back into records. The rendered form does not
/// carry the unix timestamp, so parsed items come back with `timestamp: None`
/// (they sort as oldest on the next merge). Unparsable lines are logged and
/// skipped.
pub fn parse_markdown(content: &str) -> Vec<Telegram> {
    let mut items = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with(FLAGGED_HEADER)
            || trimmed.starts_with(NORMAL_HEADER)
            || trimmed.starts_with(SEPARATOR)
        {
            continue;
        }
        match ITEM_RE.captures(line) {
            Some(caps) => {
                let is_flagged = line.matches("**").count() >= 2;
                items.push(Telegram {
                    id: caps[4].to_string(),
                    content: caps[2].to_string(),
                    time_of_day: caps[1].to_string(),
                    timestamp: None,
                    url: caps[3].to_string(),
                    is_flagged,
                });
            }
            None => tracing::warn!(line = %trimmed, "unparsable archive line, skipping"),
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, time: &str, content: &str, flagged: bool) -> Telegram {
        Telegram {
            id: id.to_string(),
            content: content.to_string(),
            time_of_day: time.to_string(),
            timestamp: None,
            url: format!("https://www.cls.cn/detail/{id}"),
            is_flagged: flagged,
        }
    }

    #[test]
    fn flagged_section_comes_first_with_separator() {
        let doc = render_markdown(&[
            item("1", "10:00", "利好 A", true),
            item("2", "09:00", "B", false),
        ]);
        let flagged_pos = doc.find(FLAGGED_HEADER).unwrap();
        let sep_pos = doc.find(SEPARATOR).unwrap();
        let normal_pos = doc.find(NORMAL_HEADER).unwrap();
        assert!(flagged_pos < sep_pos && sep_pos < normal_pos);
        assert!(doc.contains("  - [10:00] **[利好 A](https://www.cls.cn/detail/1)**"));
        assert!(doc.contains("  - [09:00] [B](https://www.cls.cn/detail/2)"));
    }

    #[test]
    fn single_section_has_no_separator() {
        let doc = render_markdown(&[item("2", "09:00", "B", false)]);
        assert!(!doc.contains(SEPARATOR));
        assert!(!doc.contains(FLAGGED_HEADER));
    }

    #[test]
    fn roundtrip_recovers_ids_and_flags() {
        let doc = render_markdown(&[
            item("11", "10:00", "利好 A", true),
            item("22", "09:00", "B", false),
        ]);
        let parsed = parse_markdown(&doc);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, "11");
        assert!(parsed[0].is_flagged);
        assert_eq!(parsed[1].id, "22");
        assert!(!parsed[1].is_flagged);
        assert_eq!(parsed[1].time_of_day, "09:00");
        assert_eq!(parsed[1].timestamp, None);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let doc = format!(
            "{NORMAL_HEADER}\n\n  - [09:00] [ok](https://www.cls.cn/detail/7)\n\ngarbage line here\n"
        );
        let parsed = parse_markdown(&doc);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "7");
    }
}
