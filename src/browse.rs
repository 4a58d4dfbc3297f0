//! `GET /browse/{name}` projection (spec.md §6.2): paginated `content`
//! records with optional full-content stripping.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use sitecrawler_store::DocumentStore;

const DEFAULT_ROWS: usize = 20;
const MAX_ROWS: usize = 49;

#[derive(Debug, Serialize)]
pub struct BrowsePage {
    pub name: String,
    pub items: Vec<Value>,
    pub page: usize,
    pub total_pages: usize,
    pub num_records: usize,
}

/// Projects a page of `content` records. `fullcontent=false` strips
/// `_content`; `parsed_hash`, `crawled`, and `type` are always stripped.
pub fn browse(
    store: &DocumentStore,
    name: &str,
    page: usize,
    rows: Option<usize>,
    fullcontent: bool,
) -> Result<BrowsePage> {
    let per_page = rows.unwrap_or(DEFAULT_ROWS).min(MAX_ROWS).max(1);

    let mut keys = store.filter_records_by_field("type", &Value::String("content".to_string()))?;
    keys.sort();

    let num_records = keys.len();
    let total_pages = num_records / per_page + usize::from(num_records % per_page != 0);

    let start = page * per_page;
    let end = (start + per_page).min(num_records);

    let mut items = Vec::new();
    for key in keys.get(start..end).unwrap_or_default() {
        if let Some(mut record) = store.get_record(key)? {
            if let Some(obj) = record.as_object_mut() {
                obj.remove("parsed_hash");
                obj.remove("crawled");
                obj.remove("type");
                if !fullcontent {
                    obj.remove("_content");
                }
                obj.insert("uri".to_string(), Value::String(key.clone()));
            }
            items.push(record);
        }
    }

    Ok(BrowsePage {
        name: name.to_string(),
        items,
        page,
        total_pages,
        num_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_content_unless_requested_and_paginates() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path(), "test").unwrap();
        for i in 0..3 {
            store
                .put_html(
                    &format!("http://example.com/{i}"),
                    "<html>body</html>",
                    json!({ "crawled": 1.0, "parsed_hash": "abc" }),
                )
                .unwrap();
        }

        let page = browse(&store, "test", 0, Some(2), false).unwrap();
        assert_eq!(page.num_records, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].get("_content").is_none());
        assert!(page.items[0].get("parsed_hash").is_none());

        let full = browse(&store, "test", 0, Some(2), true).unwrap();
        assert!(full.items[0].get("_content").is_some());
    }

    #[test]
    fn rows_are_capped_below_fifty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path(), "test").unwrap();
        let page = browse(&store, "test", 0, Some(1000), false).unwrap();
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }
}
