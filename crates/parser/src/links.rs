use scraper::{Html, Selector};
use tracing::trace;
use url::Url;

/// Parses HTML, walks anchor elements, and yields every outbound href
/// that is non-empty, not `mailto:`, resolves to an absolute URL
/// against `base_url`, and has its fragment stripped (spec.md §4.3).
/// Scope filtering is applied by the caller via `ScopeFilter::is_in_scope`.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    let mut links = std::collections::HashSet::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with("mailto:") {
            continue;
        }
        let Ok(mut absolute) = base_url.join(href) else {
            trace!(href, "unresolvable href, skipping");
            continue;
        };
        absolute.set_fragment(None);
        links.insert(absolute.to_string());
    }
    links.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_absolute_defragmented_links() {
        let html = r#"<html><body>
            <a href="/page">a</a>
            <a href="https://other.example.com/x#frag">b</a>
            <a href="mailto:me@example.com">c</a>
            <a href="">d</a>
        </body></html>"#;
        let base = Url::parse("https://example.com/dir/").unwrap();
        let mut links = extract_links(html, &base);
        links.sort();
        assert_eq!(
            links,
            vec![
                "https://example.com/page".to_string(),
                "https://other.example.com/x".to_string(),
            ]
        );
    }
}
