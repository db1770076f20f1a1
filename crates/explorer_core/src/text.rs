//! crates/explorer_core/src/text.rs
//!
//! Small text helpers: report previews, heading cleanup and topic lists.

use once_cell::sync::Lazy;
use regex::Regex;

static SECTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(section|chapter)\s+\d+\s*[:.)-]?\s*").expect("valid regex"));
static NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\s*[:.)-]?\s*").expect("valid regex"));
static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(introduction|background)\s*[:.)-]?\s*").expect("valid regex")
});
static BULLET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-\x{2022}*]\s*").expect("valid regex"));

/// Thresholds used when deriving a report preview.
///
/// All lengths are counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    /// Text at or under this length is returned unchanged.
    pub max_length: usize,
    /// Sentence boundaries are only searched from this offset on.
    pub min_search: usize,
    /// A boundary at or past this offset is ignored.
    pub max_cutoff: usize,
    /// Hard cut used when no usable boundary exists.
    pub fallback_length: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_length: 120,
            min_search: 80,
            max_cutoff: 160,
            fallback_length: 140,
        }
    }
}

/// Derives a short preview of a report using the default limits.
pub fn summarize_report(text: &str) -> String {
    summarize_with(text, &SummaryLimits::default())
}

pub fn summarize_with(text: &str, limits: &SummaryLimits) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = clean.chars().collect();
    if chars.len() <= limits.max_length {
        return clean;
    }

    let boundary = (limits.min_search..chars.len().saturating_sub(1))
        .find(|&index| chars[index] == '.' && chars[index + 1] == ' ');
    if let Some(cutoff) = boundary.filter(|&cutoff| cutoff > 0 && cutoff < limits.max_cutoff) {
        let mut preview: String = chars[..=cutoff].iter().collect();
        preview.push('…');
        return preview;
    }

    let mut preview: String = chars[..limits.fallback_length.min(chars.len())]
        .iter()
        .collect();
    preview.push('…');
    preview
}

/// Turns an outline heading ("Section 2: Trade routes") into a topic ("Trade routes").
///
/// Falls back to the trimmed heading when stripping would leave nothing.
pub fn clean_heading_for_topic(heading: &str) -> String {
    let original = heading.trim();
    if original.is_empty() {
        return String::new();
    }
    let cleaned = SECTION_PREFIX.replace(original, "");
    let cleaned = NUMBER_PREFIX.replace(&cleaned, "");
    let cleaned = LABEL_PREFIX.replace(&cleaned, "");
    let cleaned = BULLET_PREFIX.replace(&cleaned, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        original.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Splits a comma separated list, trimming entries and dropping empty ones.
pub fn parse_topics_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_text_is_only_whitespace_collapsed() {
        assert_eq!(summarize_report("  A   short\n\nreport. "), "A short report.");
        assert_eq!(summarize_report(""), "");
    }

    #[test]
    fn long_text_is_cut_at_a_sentence_boundary() {
        let first = "x".repeat(99) + ".";
        let text = format!("{} {}", first, "y".repeat(200));
        let preview = summarize_report(&text);
        assert_eq!(preview, format!("{}…", first));
        assert_eq!(preview.chars().count(), 101);
    }

    #[test]
    fn long_text_without_boundary_is_hard_cut() {
        let text = "z".repeat(400);
        let preview = summarize_report(&text);
        assert_eq!(preview.chars().count(), 141);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn boundary_past_the_cutoff_is_ignored() {
        let text = format!("{}. tail {}", "w".repeat(170), "v".repeat(50));
        let preview = summarize_report(&text);
        assert_eq!(preview, format!("{}…", "w".repeat(140)));
    }

    #[test]
    fn custom_limits_are_honored() {
        let limits = SummaryLimits {
            max_length: 10,
            min_search: 2,
            max_cutoff: 20,
            fallback_length: 8,
        };
        assert_eq!(summarize_with("Hi there. More words here", &limits), "Hi there.…");
        assert_eq!(summarize_with("abcdefghijklmnop", &limits), "abcdefgh…");
    }

    #[test]
    fn heading_prefixes_are_removed() {
        assert_eq!(clean_heading_for_topic("Section 2: Trade routes"), "Trade routes");
        assert_eq!(clean_heading_for_topic("chapter 10. The fall"), "The fall");
        assert_eq!(clean_heading_for_topic("3) Harbors"), "Harbors");
        assert_eq!(clean_heading_for_topic("Introduction: Why ports matter"), "Why ports matter");
        assert_eq!(clean_heading_for_topic("• Lighthouses"), "Lighthouses");
    }

    #[test]
    fn heading_that_is_only_a_prefix_is_kept() {
        assert_eq!(clean_heading_for_topic("  Introduction  "), "Introduction");
        assert_eq!(clean_heading_for_topic("   "), "");
    }

    #[test]
    fn topic_lists_drop_empty_entries() {
        assert_eq!(
            parse_topics_list(" war, , trade ,politics,"),
            vec!["war".to_string(), "trade".to_string(), "politics".to_string()]
        );
        assert!(parse_topics_list("").is_empty());
    }
}
