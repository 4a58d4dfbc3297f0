use async_trait::async_trait;
use serde::Deserialize;
use sitecrawler_core::CrawlError;

/// Fields returned per URL by the external article parser (spec.md §6.4).
#[derive(Debug, Clone, Default)]
pub struct ArticleFields {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub date_published_raw: Option<String>,
    pub date_modified_raw: Option<String>,
}

/// External article parser client. Batches a set of URLs and returns
/// whatever subset the service could parse; failed items are dropped,
/// not surfaced as an error for the batch.
#[async_trait]
pub trait ArticleParser: Send + Sync {
    async fn parse_batch(&self, urls: &[String]) -> Result<Vec<ArticleFields>, CrawlError>;
}

#[derive(Debug, Deserialize)]
struct ArticleResponseItem {
    url: String,
    article: ArticleBody,
}

#[derive(Debug, Deserialize, Default)]
struct ArticleBody {
    headline: Option<String>,
    #[serde(rename = "articleBody")]
    article_body: Option<String>,
    description: Option<String>,
    #[serde(rename = "mainImage")]
    main_image: Option<MainImage>,
    #[serde(rename = "datePublishedRaw")]
    date_published_raw: Option<String>,
    #[serde(rename = "dateModifiedRaw")]
    date_modified_raw: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainImage {
    url: String,
}

pub struct HttpArticleParser {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpArticleParser {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpArticleParser {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ArticleParser for HttpArticleParser {
    async fn parse_batch(&self, urls: &[String]) -> Result<Vec<ArticleFields>, CrawlError> {
        let requests: Vec<_> = urls
            .iter()
            .map(|u| {
                let client = &self.client;
                let endpoint = &self.endpoint;
                let api_key = &self.api_key;
                let url = u.clone();
                async move {
                    let body = serde_json::json!({
                        "url": url,
                        "httpResponseBody": false,
                        "article": true,
                        "articleOptions": {"extractFrom": "httpResponseBody"},
                    });
                    client
                        .post(endpoint)
                        .basic_auth(api_key, Some(""))
                        .json(&body)
                        .send()
                        .await
                        .ok()?
                        .json::<ArticleResponseItem>()
                        .await
                        .ok()
                }
            })
            .collect();

        let results = futures::future::join_all(requests).await;
        Ok(results
            .into_iter()
            .flatten()
            .map(|item| ArticleFields {
                url: item.url,
                title: item.article.headline,
                content: item.article.article_body,
                description: item.article.description,
                image: item.article.main_image.map(|i| i.url),
                date_published_raw: item.article.date_published_raw,
                date_modified_raw: item.article.date_modified_raw,
            })
            .collect())
    }
}
