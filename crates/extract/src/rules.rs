use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use sitecrawler_core::types::{ExtractionRule, ExtractionRules};

use crate::clean::clean_html;

fn extract_content(node: ElementRef, rule: &ExtractionRule) -> String {
    if let Some(attr) = &rule.attribute {
        node.value().attr(attr).unwrap_or_default().trim().to_string()
    } else {
        node.text().collect::<String>().trim().to_string()
    }
}

/// `do_extract` — evaluates every rule against `content`, cleaning the
/// HTML once for CSS-selector rules (spec.md §4.7 steps 1-2). Regex
/// rules match against the raw, uncleaned content.
pub fn do_extract(content: &str, rules: &ExtractionRules) -> Map<String, Value> {
    let cleaned = clean_html(content);
    let document = Html::parse_document(&cleaned);
    let mut result = Map::new();

    for rule in &rules.0 {
        if let Some(css) = &rule.css {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            let matches: Vec<ElementRef> = document.select(&selector).collect();
            if matches.is_empty() {
                if let Some(default) = &rule.default_value {
                    result.insert(rule.field_name.clone(), Value::String(default.clone()));
                }
            } else if matches.len() == 1 {
                result.insert(
                    rule.field_name.clone(),
                    Value::String(extract_content(matches[0], rule)),
                );
            } else {
                let values: Vec<Value> = matches
                    .into_iter()
                    .map(|n| Value::String(extract_content(n, rule)))
                    .collect();
                result.insert(rule.field_name.clone(), Value::Array(values));
            }
        } else if let Some(pattern) = &rule.regex {
            if let Ok(re) = Regex::new(pattern) {
                if let Some(captures) = re.captures(content) {
                    if let Some(group) = captures.get(1).or_else(|| captures.get(0)) {
                        result.insert(
                            rule.field_name.clone(),
                            Value::String(group.as_str().trim().to_string()),
                        );
                    }
                }
            }
        } else if let Some(fixed) = &rule.fixed_value {
            result.insert(rule.field_name.clone(), Value::String(fixed.clone()));
        }

        result
            .entry(rule.field_name.clone())
            .or_insert_with(|| Value::String(String::new()));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(field_name: &str, css: Option<&str>) -> ExtractionRule {
        ExtractionRule {
            field_name: field_name.to_string(),
            css: css.map(str::to_string),
            regex: None,
            fixed_value: None,
            attribute: None,
            default_value: None,
        }
    }

    #[test]
    fn zero_matches_yields_empty_string() {
        let rules = ExtractionRules(vec![
            rule("title", Some("title")),
            rule("desc", Some("bar")),
        ]);
        let result = do_extract("<html><title>foo</title></html>", &rules);
        assert_eq!(result["title"], json!("foo"));
        assert_eq!(result["desc"], json!(""));
    }

    #[test]
    fn multiple_matches_yields_list() {
        let rules = ExtractionRules(vec![rule("title", Some("title"))]);
        let result = do_extract(
            "<html><title>foo</title><title>bar</title></html>",
            &rules,
        );
        assert_eq!(result["title"], json!(["foo", "bar"]));
    }

    #[test]
    fn regex_rule_with_capture_group() {
        let rules = ExtractionRules(vec![ExtractionRule {
            field_name: "animal".to_string(),
            css: None,
            regex: Some("<animal>(.*?)</animal>".to_string()),
            fixed_value: None,
            attribute: None,
            default_value: None,
        }]);
        let result = do_extract("<animal>cat</animal>", &rules);
        assert_eq!(result["animal"], json!("cat"));

        let result_absent = do_extract("<html></html>", &rules);
        assert_eq!(result_absent["animal"], json!(""));
    }
}
