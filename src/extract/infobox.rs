// src/extract/infobox.rs
//! Keyed extraction for label/value info-boxes.
//!
//! Values are only taken when the label preceding them classifies as a known
//! field; everything else in the box (image captions, signatures, ...) is skipped.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{clean_block, TextRules};
use crate::types::{Fragment, Origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    BirthDate,
    Social,
    PhysicalStat,
    Agency,
    Debut,
    Members,
    Position,
    Origin,
    Genre,
}

impl FieldKind {
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::BirthDate => "Birth date",
            FieldKind::Social => "Social media",
            FieldKind::PhysicalStat => "Physical stats",
            FieldKind::Agency => "Agency",
            FieldKind::Debut => "Debut",
            FieldKind::Members => "Members",
            FieldKind::Position => "Position",
            FieldKind::Origin => "Origin",
            FieldKind::Genre => "Genres",
        }
    }

    /// Classify a label cell; `None` for labels we don't keep.
    pub fn classify(label: &str) -> Option<Self> {
        let l = label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| l.contains(n));

        if has(&["born", "birth"]) {
            Some(FieldKind::BirthDate)
        } else if has(&["instagram", "twitter", "tiktok", "weverse", "youtube", "website", "social"]) {
            Some(FieldKind::Social)
        } else if has(&["height", "weight", "blood"]) {
            Some(FieldKind::PhysicalStat)
        } else if has(&["label", "agency", "agent", "compan"]) {
            Some(FieldKind::Agency)
        } else if has(&["debut", "years active"]) {
            Some(FieldKind::Debut)
        } else if has(&["member"]) {
            Some(FieldKind::Members)
        } else if has(&["position"]) {
            Some(FieldKind::Position)
        } else if has(&["origin", "nationality"]) {
            Some(FieldKind::Origin)
        } else if has(&["genre"]) {
            Some(FieldKind::Genre)
        } else {
            None
        }
    }
}

static LABEL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, .pi-data-label").expect("label selector"));
static VALUE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td, .pi-data-value").expect("value selector"));

pub fn extract_fields(html: &Html, sel: &Selector, rules: &TextRules, origin: Origin) -> Vec<Fragment> {
    html.select(sel)
        .take(rules.max_elements)
        .filter_map(|row| field_of(row, rules))
        .map(|(kind, value)| Fragment::new(format!("{}: {}", kind.label(), value), origin))
        .collect()
}

fn field_of(row: ElementRef<'_>, rules: &TextRules) -> Option<(FieldKind, String)> {
    let label = row.select(&LABEL_SEL).next()?;
    let kind = FieldKind::classify(&label.text().collect::<String>())?;
    let value = row.select(&VALUE_SEL).next()?;
    // List values (<br>, <li>) keep their separation.
    let text = clean_block(&value.text().collect::<Vec<_>>().join(" "));
    rules.accepts(&text).then_some((kind, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceType;

    fn extract(doc: &str, sel: &str) -> Vec<String> {
        let html = Html::parse_document(doc);
        let sel = Selector::parse(sel).unwrap();
        let origin = Origin::Scraped {
            source_type: SourceType::Infobox,
            primary: true,
        };
        extract_fields(&html, &sel, &TextRules::for_type(SourceType::Infobox), origin)
            .into_iter()
            .map(|f| f.text)
            .collect()
    }

    #[test]
    fn wikipedia_rows_are_keyed_by_label() {
        let doc = r#"<table class="infobox">
<tr><th colspan="2">Jisoo</th></tr>
<tr><td colspan="2">Jisoo in 2023</td></tr>
<tr><th>Born</th><td>Kim Ji-soo<br>3 January 1995 (age 29)[1]</td></tr>
<tr><th>Labels</th><td>YG<br>Blissoo</td></tr>
<tr><th>Signature</th><td>(image)</td></tr>
</table>"#;
        let out = extract(doc, "table.infobox tr");
        assert_eq!(
            out,
            vec![
                "Birth date: Kim Ji-soo 3 January 1995 (age 29)".to_string(),
                "Agency: YG Blissoo".to_string(),
            ]
        );
    }

    #[test]
    fn fandom_portable_infobox_rows() {
        let doc = r#"<aside class="portable-infobox">
<div class="pi-item pi-data"><h3 class="pi-data-label">Birth Date</h3><div class="pi-data-value">January 3, 1995</div></div>
<div class="pi-item pi-data"><h3 class="pi-data-label">Height</h3><div class="pi-data-value">162 cm</div></div>
<div class="pi-item pi-data"><h3 class="pi-data-label">Instagram</h3><div class="pi-data-value">@sooyaaa__</div></div>
<div class="pi-item pi-data"><h3 class="pi-data-label">Favorite food</h3><div class="pi-data-value">Tteokbokki</div></div>
</aside>"#;
        let out = extract(doc, "aside.portable-infobox .pi-data");
        assert_eq!(
            out,
            vec![
                "Birth date: January 3, 1995".to_string(),
                "Physical stats: 162 cm".to_string(),
                "Social media: @sooyaaa__".to_string(),
            ]
        );
    }

    #[test]
    fn classify_labels() {
        assert_eq!(FieldKind::classify("Years active"), Some(FieldKind::Debut));
        assert_eq!(FieldKind::classify("Current members"), Some(FieldKind::Members));
        assert_eq!(FieldKind::classify("Website"), Some(FieldKind::Social));
        assert_eq!(FieldKind::classify("Spouse"), None);
    }
}
