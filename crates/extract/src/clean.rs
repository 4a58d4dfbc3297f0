use lol_html::{element, HtmlRewriter, Settings};

/// Strips `<script>`, `<style>`, and the kill-tags `noscript, footer,
/// header, nav, button, form` before rule evaluation (spec.md §4.7
/// step 1).
pub fn clean_html(html: &str) -> String {
    let mut output = Vec::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!(
                "script, style, noscript, footer, header, nav, button, form",
                |el| {
                    el.remove();
                    Ok(())
                }
            )],
            ..Settings::new()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }
    String::from_utf8_lossy(&output).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_kill_tags() {
        let html = "<html><body><script>evil()</script><nav>menu</nav><p>keep</p></body></html>";
        let cleaned = clean_html(html);
        assert!(!cleaned.contains("evil()"));
        assert!(!cleaned.contains("menu"));
        assert!(cleaned.contains("keep"));
    }
}
