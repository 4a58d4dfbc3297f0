use async_trait::async_trait;
use serde::Deserialize;
use sitecrawler_core::CrawlError;

/// External binary-text extractor client (spec.md §6.3). Given a
/// blob's bytes, returns `(content, title)`.
#[async_trait]
pub trait BinaryTextExtractor: Send + Sync {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<(String, String), CrawlError>;
}

#[derive(Debug, Deserialize)]
struct ExtractedChunk {
    text: String,
    metadata: ChunkMetadata,
}

#[derive(Debug, Deserialize)]
struct ChunkMetadata {
    filename: String,
}

pub struct HttpBinaryTextExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBinaryTextExtractor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpBinaryTextExtractor {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl BinaryTextExtractor for HttpBinaryTextExtractor {
    async fn extract(&self, filename: &str, bytes: &[u8]) -> Result<(String, String), CrawlError> {
        let form = reqwest::multipart::Form::new()
            .part(
                "files",
                reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name(filename.to_string()),
            )
            .text("strategy", "auto");

        let resp = self
            .client
            .post(format!("{}/general/v0/general", self.endpoint))
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| CrawlError::Exception(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CrawlError::HttpStatus(resp.status().as_u16()));
        }

        let chunks: Vec<ExtractedChunk> = resp
            .json()
            .await
            .map_err(|e| CrawlError::Exception(e.to_string()))?;

        if chunks.is_empty() {
            return Err(CrawlError::Exception(
                "binary-text extractor returned no chunks".to_string(),
            ));
        }

        let title = chunks[0].metadata.filename.clone();
        let text = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok((text, title))
    }
}
