pub mod article;
pub mod binary_text;
pub mod clean;
pub mod derive;
pub mod rules;

pub use article::{ArticleFields, ArticleParser, HttpArticleParser};
pub use binary_text::{BinaryTextExtractor, HttpBinaryTextExtractor};
pub use derive::{create_id, get_path, get_type_from_url};
pub use rules::do_extract;

use serde_json::Value;
use sitecrawler_core::types::ExtractionRules;
use sitecrawler_core::StoreError;
use sitecrawler_store::DocumentStore;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct ExtractionSummary {
    pub extracted: usize,
    pub skipped: usize,
    pub enrichment_failures: usize,
}

/// Runs a full extraction pass over the store (spec.md §4.7): for every
/// `content` record whose `parsed_hash` doesn't match the rule-set
/// fingerprint, evaluates the rules, derives `id`/`path_s`/`typeUrl_s`,
/// optionally enriches via the binary-text/article-parser clients, and
/// writes the merged record back with the new `parsed_hash`.
pub async fn run_extraction_pass(
    store: &DocumentStore,
    extraction_rules: &ExtractionRules,
    ai_parsing: bool,
    binary_extractor: Option<&dyn BinaryTextExtractor>,
    article_parser: Option<&dyn ArticleParser>,
) -> Result<ExtractionSummary, StoreError> {
    let mut summary = ExtractionSummary::default();
    if extraction_rules.0.is_empty() {
        return Ok(summary);
    }
    let fingerprint = extraction_rules.fingerprint();

    let mut html_urls_pending_ai: Vec<String> = Vec::new();

    for (key, mut record) in store.iterate()? {
        let is_content = record.get("type").and_then(Value::as_str) == Some("content");
        let already_parsed = record.get("parsed_hash").and_then(Value::as_str) == Some(fingerprint.as_str());
        if !is_content || already_parsed {
            summary.skipped += 1;
            continue;
        }

        let content = record
            .get("_content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let content_type = record
            .get("content_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut result = do_extract(&content, extraction_rules);
        result.insert("uri".to_string(), Value::String(key.clone()));
        result.insert("path_s".to_string(), Value::String(get_path(&key)));
        result.insert("typeUrl_s".to_string(), Value::String(get_type_from_url(&key)));
        result.insert("id".to_string(), Value::String(create_id(&key)));

        if content_type != "text/html" {
            if let Some(extractor) = binary_extractor {
                match store.get_blob(&key) {
                    Ok(Some(bytes)) => {
                        let filename = key.rsplit('/').next().unwrap_or(&key).to_string();
                        match extractor.extract(&filename, &bytes).await {
                            Ok((text, title)) => {
                                result.insert("content".to_string(), Value::String(text));
                                result.insert("title".to_string(), Value::String(title));
                            }
                            Err(e) => {
                                warn!(url = %key, error = %e, "binary-text extraction failed");
                                summary.enrichment_failures += 1;
                            }
                        }
                    }
                    Ok(None) => warn!(url = %key, "content record has no blob sibling"),
                    Err(e) => warn!(url = %key, error = %e, "failed reading blob"),
                }
            }
        } else if ai_parsing {
            html_urls_pending_ai.push(key.clone());
        }

        let obj = record.as_object_mut().expect("record must be a JSON object");
        for (field, value) in result {
            obj.insert(field, value);
        }
        obj.insert("parsed_hash".to_string(), Value::String(fingerprint.clone()));

        store.put_record(&key, &record)?;
        summary.extracted += 1;
    }

    if ai_parsing && !html_urls_pending_ai.is_empty() {
        if let Some(parser) = article_parser {
            match parser.parse_batch(&html_urls_pending_ai).await {
                Ok(fields) => {
                    for article in fields {
                        if let Some(mut record) = store.get_record(&article.url)? {
                            let obj = record.as_object_mut().expect("record must be a JSON object");
                            if let Some(title) = article.title {
                                obj.insert("title".to_string(), Value::String(title));
                            }
                            if let Some(content) = article.content {
                                obj.insert("content".to_string(), Value::String(content));
                            }
                            if let Some(description) = article.description {
                                obj.insert("description".to_string(), Value::String(description));
                            }
                            if let Some(image) = article.image {
                                obj.insert("image".to_string(), Value::String(image));
                            }
                            if let Some(dp) = article.date_published_raw {
                                obj.insert("datePublishedRaw".to_string(), Value::String(dp));
                            }
                            if let Some(dm) = article.date_modified_raw {
                                obj.insert("dateModifiedRaw".to_string(), Value::String(dm));
                            }
                            store.put_record(&article.url, &record)?;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "article-parser batch failed");
                    summary.enrichment_failures += html_urls_pending_ai.len();
                }
            }
        }
    }

    info!(extracted = summary.extracted, skipped = summary.skipped, "extraction pass complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitecrawler_core::types::ExtractionRule;

    #[tokio::test]
    async fn extraction_pass_sets_parsed_hash_and_derived_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path(), "test").unwrap();
        store
            .put_html(
                "http://example.com/my-page",
                "<html><title>hi</title></html>",
                serde_json::json!({ "parsed_hash": "" }),
            )
            .unwrap();

        let rules = ExtractionRules(vec![ExtractionRule {
            field_name: "title".to_string(),
            css: Some("title".to_string()),
            regex: None,
            fixed_value: None,
            attribute: None,
            default_value: None,
        }]);

        let summary = run_extraction_pass(&store, &rules, false, None, None)
            .await
            .unwrap();
        assert_eq!(summary.extracted, 1);

        let record = store.get_record("http://example.com/my-page").unwrap().unwrap();
        assert_eq!(record["title"], serde_json::json!("hi"));
        assert_eq!(record["parsed_hash"], serde_json::json!(rules.fingerprint()));
        assert_eq!(record["typeUrl_s"], serde_json::json!("My Page"));
    }

    #[tokio::test]
    async fn already_parsed_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path(), "test").unwrap();
        let rules = ExtractionRules(vec![ExtractionRule {
            field_name: "title".to_string(),
            css: Some("title".to_string()),
            regex: None,
            fixed_value: None,
            attribute: None,
            default_value: None,
        }]);
        store
            .put_html(
                "http://example.com",
                "<html></html>",
                serde_json::json!({ "parsed_hash": rules.fingerprint() }),
            )
            .unwrap();

        let summary = run_extraction_pass(&store, &rules, false, None, None)
            .await
            .unwrap();
        assert_eq!(summary.extracted, 0);
        assert_eq!(summary.skipped, 1);
    }
}
