//! Projects raw WordPress posts into flat [`NormalizedRecord`]s.
//!
//! Markup removal is a regex pass over `<...>` spans, not an HTML parser:
//! unbalanced or malformed markup comes out however the pattern happens to
//! cut it. Entities are left as-is.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::contract::{NormalizedRecord, RawPost};

/// Hard cap on body length, in characters. No ellipsis is appended.
pub const MAX_BODY_CHARS: usize = 8000;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn whitespace_pattern() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Remove every `<...>` span.
pub fn strip_tags(html: &str) -> String {
    tag_pattern().replace_all(html, "").into_owned()
}

/// Collapse whitespace runs (newlines included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_pattern().replace_all(text, " ").trim().to_string()
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

pub fn clean_body(html: &str, max_chars: usize) -> String {
    truncate_chars(&collapse_whitespace(&strip_tags(html)), max_chars)
}

/// Normalize one post using the default body cap.
pub fn normalize(post: &RawPost) -> NormalizedRecord {
    normalize_with_limit(post, MAX_BODY_CHARS)
}

pub fn normalize_with_limit(post: &RawPost, max_body_chars: usize) -> NormalizedRecord {
    NormalizedRecord {
        title: post.title.rendered.clone(),
        link: post.link.clone(),
        body: clean_body(&post.content.rendered, max_body_chars),
        publish_date: post.publish_date.clone(),
    }
}

/// Normalize a page of raw JSON posts, skipping entries that do not have the
/// expected shape. Output order follows input order.
pub fn normalize_page(page: u32, posts: Vec<serde_json::Value>, max_body_chars: usize) -> Vec<NormalizedRecord> {
    let total = posts.len();
    let records: Vec<NormalizedRecord> = posts
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<RawPost>(value) {
            Ok(post) => Some(normalize_with_limit(&post, max_body_chars)),
            Err(e) => {
                warn!(page, index = idx, error = %e, "Skipping malformed post");
                None
            }
        })
        .collect();
    debug!(page, total, kept = records.len(), "Normalized page");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(content: &str) -> RawPost {
        serde_json::from_value(json!({
            "title": {"rendered": "Title"},
            "link": "https://example.org/a",
            "content": {"rendered": content},
            "date": "2024-03-01T10:00:00"
        }))
        .unwrap()
    }

    #[test]
    fn nested_tags_are_removed() {
        let record = normalize(&post("<p>A<b>B</b>C</p>"));
        assert_eq!(record.body, "ABC");
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        let record = normalize(&post("<p>Hello\n\n   world</p>\n<p>\tagain </p>"));
        assert_eq!(record.body, "Hello world again");
    }

    #[test]
    fn long_bodies_are_cut_to_exactly_the_cap() {
        let body = "x".repeat(MAX_BODY_CHARS + 500);
        let record = normalize(&post(&body));
        assert_eq!(record.body.chars().count(), MAX_BODY_CHARS);
        assert!(!record.body.ends_with("..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let body = "é".repeat(10);
        assert_eq!(truncate_chars(&body, 4), "éééé");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn stray_angle_bracket_eats_until_next_close() {
        // Regex approximation: "a < b" opens a span that runs to the next '>'.
        assert_eq!(strip_tags("a < b <i>c</i> d"), "a c d");
        // An unclosed '<' is left alone.
        assert_eq!(strip_tags("1 < 2"), "1 < 2");
    }

    #[test]
    fn fields_are_projected_verbatim() {
        let record = normalize(&post("<p>x</p>"));
        assert_eq!(record.title, "Title");
        assert_eq!(record.link, "https://example.org/a");
        assert_eq!(record.publish_date, "2024-03-01T10:00:00");
    }

    #[test]
    fn malformed_posts_are_skipped_and_order_kept() {
        let posts = vec![
            json!({"title": {"rendered": "one"}, "link": "l1", "content": {"rendered": "a"}, "date": "d1"}),
            json!({"title": "no rendered wrapper", "link": "l2"}),
            json!({"title": {"rendered": "three"}, "link": "l3", "content": {"rendered": "c"}, "date": "d3"}),
        ];
        let records = normalize_page(1, posts, MAX_BODY_CHARS);
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "three"]);
    }

    #[test]
    fn embedded_metadata_is_accepted_but_not_projected() {
        let value = json!({
            "title": {"rendered": "t"},
            "link": "l",
            "content": {"rendered": "<p>b</p>"},
            "date": "d",
            "_embedded": {"author": [{"name": "Ann"}]}
        });
        let post: RawPost = serde_json::from_value(value).unwrap();
        assert!(post.embedded.is_some());
        assert_eq!(normalize(&post).body, "b");
    }
}
