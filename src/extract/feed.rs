// src/extract/feed.rs
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::debug;

use super::{clean_block, TextRules};
use crate::normalize::normalize_text;
use crate::types::{Fragment, Origin};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
}

/// RSS items → "title. description" fragments. Unparseable feeds yield nothing.
///
/// Descriptions often carry escaped HTML (links, `<font>` bylines); it is
/// stripped here so the fragment length matches what the normalizer keeps.
pub fn extract_items(document: &str, rules: &TextRules, origin: Origin) -> Vec<Fragment> {
    let xml = scrub_html_entities_for_xml(document);
    let rss: Rss = match from_str(&xml) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "feed did not parse as rss");
            return Vec::new();
        }
    };

    rss.channel
        .item
        .into_iter()
        .take(rules.max_elements)
        .filter_map(|it| {
            let title = it.title.unwrap_or_default();
            let description = it.description.unwrap_or_default();
            let text = match (title.trim().is_empty(), description.trim().is_empty()) {
                (true, true) => return None,
                (false, true) => title,
                (true, false) => description,
                (false, false) => format!("{}. {}", title.trim_end_matches('.'), description),
            };
            let text = normalize_text(&clean_block(&text));
            rules.accepts(&text).then(|| Fragment::new(text, origin))
        })
        .collect()
}

/// XML only knows five named entities; feeds routinely use HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
