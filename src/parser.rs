//! HTML document parsing: metadata fallback chain, link extraction and
//! keyword zone text extraction.
//!
//! Everything is pulled into owned strings here because the DOM itself is
//! not `Send`; downstream linking tasks only ever see the extracted text.

use scraper::{Html, Selector};
use thiserror::Error;

use crate::linker::{Zone, BODY_ZONES, PLAIN_TEXT_WEIGHT};
use crate::models::Metadata;

/// Minimum text length for a paragraph to stand in as a description.
const DESCRIPTION_FALLBACK_MIN_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document body is empty")]
    EmptyBody,
}

/// Everything the rest of the pipeline needs from one fetched document.
#[derive(Debug)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub links: Vec<String>,
    pub zones: Vec<Zone>,
}

/// Parses a fetched body into metadata, raw link hrefs and weighted zone
/// texts. Script and style subtrees are removed before any text is read.
pub fn parse_document(body: &str) -> Result<ParsedDocument, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::EmptyBody);
    }

    let mut html = Html::parse_document(body);
    detach_all(&mut html, "script, style");

    Ok(ParsedDocument {
        metadata: extract_metadata(&html),
        links: extract_links(&html),
        zones: extract_zones(&html),
    })
}

fn detach_all(html: &mut Html, selector: &str) {
    let selector = Selector::parse(selector).expect("Invalid CSS selector");
    let ids: Vec<_> = html.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn select_text(html: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("Invalid CSS selector");
    html.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
}

fn select_content_attr(html: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("Invalid CSS selector");
    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string())
}

fn extract_metadata(html: &Html) -> Metadata {
    let title = select_text(html, "title")
        .filter(|t| !t.trim().is_empty())
        .or_else(|| select_content_attr(html, r#"meta[name="title"]"#))
        .or_else(|| select_content_attr(html, r#"meta[property="og:site_name"]"#));

    let description = select_content_attr(html, r#"meta[name="description"]"#)
        .or_else(|| select_content_attr(html, r#"meta[property="og:description"]"#))
        .or_else(|| first_long_paragraph(html));

    Metadata::new(title.as_deref(), description.as_deref())
}

fn first_long_paragraph(html: &Html) -> Option<String> {
    let selector = Selector::parse("p").expect("Invalid CSS selector");
    html.select(&selector)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.chars().count() > DESCRIPTION_FALLBACK_MIN_LEN)
}

fn extract_links(html: &Html) -> Vec<String> {
    let selector = Selector::parse("a[href]").expect("Invalid CSS selector");
    html.select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| {
            !href.starts_with("javascript:")
                && !href.starts_with("mailto:")
                && !href.starts_with("tel:")
                && !href.starts_with("data:")
                && !href.starts_with("file:")
        })
        .map(|href| href.to_string())
        .collect()
}

fn extract_zones(html: &Html) -> Vec<Zone> {
    let mut zones = Vec::new();

    for &(tag, weight) in BODY_ZONES.iter() {
        let selector = Selector::parse(tag).expect("Invalid CSS selector");
        let text = html
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.trim().is_empty() {
            zones.push(Zone::new(tag, weight, text));
        }
    }

    let body_text = select_text(html, "body").unwrap_or_default();
    if !body_text.trim().is_empty() {
        zones.push(Zone::new("plainText", PLAIN_TEXT_WEIGHT, body_text));
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head>
            <title>Rust Tips</title>
            <meta name="description" content="A page about Rust.">
            <script>var tracking = "ignore me";</script>
          </head>
          <body>
            <h1>Welcome</h1>
            <p>Rust makes systems programming approachable.</p>
            <a href="/about">About</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="https://other.test/x">Other</a>
            <style>.hidden { display: none; }</style>
          </body>
        </html>"#;

    #[test]
    fn test_empty_body_is_an_error() {
        assert!(matches!(parse_document("   \n"), Err(ParseError::EmptyBody)));
    }

    #[test]
    fn test_metadata_from_title_and_meta() {
        let doc = parse_document(PAGE).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Rust Tips"));
        assert_eq!(doc.metadata.description.as_deref(), Some("A page about Rust."));
    }

    #[test]
    fn test_title_falls_back_to_meta_then_og() {
        let html = r#"<html><head>
            <meta property="og:site_name" content="Fallback Site">
            </head><body><p>text</p></body></html>"#;
        let doc = parse_document(html).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Fallback Site"));

        let html = r#"<html><head>
            <meta name="title" content="Meta Title">
            <meta property="og:site_name" content="Fallback Site">
            </head><body></body></html>"#;
        let doc = parse_document(html).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Meta Title"));
    }

    #[test]
    fn test_description_falls_back_to_long_paragraph() {
        let html = r#"<html><body>
            <p>short one</p>
            <p>This paragraph is clearly long enough to describe the page.</p>
            </body></html>"#;
        let doc = parse_document(html).unwrap();
        assert_eq!(
            doc.metadata.description.as_deref(),
            Some("This paragraph is clearly long enough to describe the page.")
        );
    }

    #[test]
    fn test_links_skip_non_navigational_schemes() {
        let doc = parse_document(PAGE).unwrap();
        assert_eq!(doc.links, vec!["/about", "https://other.test/x"]);
    }

    #[test]
    fn test_script_and_style_text_is_removed() {
        let doc = parse_document(PAGE).unwrap();
        let plain = doc
            .zones
            .iter()
            .find(|z| z.name == "plainText")
            .unwrap();
        assert!(plain.text.contains("Welcome"));
        assert!(!plain.text.contains("ignore me"));
        assert!(!plain.text.contains("display: none"));
    }

    #[test]
    fn test_zone_extraction_with_weights() {
        let doc = parse_document(PAGE).unwrap();
        let h1 = doc.zones.iter().find(|z| z.name == "h1").unwrap();
        assert_eq!(h1.weight, 14);
        assert_eq!(h1.text, "Welcome");

        let p = doc.zones.iter().find(|z| z.name == "p").unwrap();
        assert_eq!(p.weight, 3);
        assert!(p.text.contains("approachable"));

        // empty zones are not emitted
        assert!(doc.zones.iter().all(|z| z.name != "h2"));
    }
}
