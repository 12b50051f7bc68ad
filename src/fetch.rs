//! Dataset descriptor fetching from the Tilebox catalog.
//!
//! The catalog speaks the Connect protocol; unary calls are plain HTTP `POST`s
//! with a binary protobuf body.

use std::time::Duration;

use prost::Message;
use prost_types::FileDescriptorSet;
use reqwest::Client;
use serde::Deserialize;

/// Default catalog endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.tilebox.com";

const GET_DATASET_PATH: &str = "/datasets.v1.DatasetService/GetDataset";

/// Something that can resolve a dataset slug to its type descriptor.
///
/// On success the returned set holds the dataset's single file descriptor.
#[allow(async_fn_in_trait)]
pub trait DatasetFetcher {
    async fn fetch(&self, slug: &str) -> Result<FileDescriptorSet, FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status} ({code}): {message}")]
    Api {
        endpoint: String,
        status: u16,
        code: String,
        message: String,
    },

    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("dataset {slug} has no type descriptor")]
    MissingType { slug: String },

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Clone, PartialEq, Message)]
pub struct GetDatasetRequest {
    #[prost(string, tag = "1")]
    pub slug: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Id {
    #[prost(bytes = "vec", tag = "1")]
    pub uuid: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnnotatedType {
    #[prost(message, optional, tag = "1")]
    pub descriptor_set: Option<FileDescriptorSet>,
    #[prost(string, tag = "2")]
    pub type_url: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Dataset {
    #[prost(message, optional, tag = "1")]
    pub id: Option<Id>,
    #[prost(message, optional, tag = "2")]
    pub group_id: Option<Id>,
    #[prost(message, optional, tag = "3")]
    pub r#type: Option<AnnotatedType>,
    #[prost(string, tag = "4")]
    pub code_name: String,
    #[prost(string, tag = "5")]
    pub name: String,
}

/// Error body of a failed Connect call.
#[derive(Debug, Default, Deserialize)]
struct ConnectError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Catalog client authenticated with an API key.
pub struct TileboxClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl TileboxClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Look up a dataset by slug, e.g. `open_data.copernicus.sentinel1_sar`.
    pub async fn dataset(&self, slug: &str) -> Result<Dataset, FetchError> {
        let endpoint = format!("{}{GET_DATASET_PATH}", self.endpoint);
        let request = GetDatasetRequest { slug: slug.to_string() };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/proto")
            .header("Connect-Protocol-Version", "1")
            .body(request.encode_to_vec())
            .send()
            .await
            .map_err(|source| FetchError::Http { endpoint: endpoint.clone(), source })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Http { endpoint: endpoint.clone(), source })?;

        if !status.is_success() {
            let error: ConnectError = serde_json::from_slice(&body).unwrap_or_else(|_| ConnectError {
                code: status.canonical_reason().unwrap_or("unknown").to_lowercase(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
            return Err(FetchError::Api {
                endpoint,
                status: status.as_u16(),
                code: error.code,
                message: error.message,
            });
        }

        Dataset::decode(body).map_err(|source| FetchError::Decode { endpoint, source })
    }
}

impl DatasetFetcher for TileboxClient {
    async fn fetch(&self, slug: &str) -> Result<FileDescriptorSet, FetchError> {
        let dataset = self.dataset(slug).await?;
        tracing::debug!(name = %dataset.name, code_name = %dataset.code_name, "dataset found");
        dataset
            .r#type
            .and_then(|t| t.descriptor_set)
            .ok_or_else(|| FetchError::MissingType { slug: slug.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash() {
        let client = TileboxClient::new("http://localhost:8080/", "key").unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_connect_error_body() {
        let error: ConnectError =
            serde_json::from_str(r#"{"code":"not_found","message":"dataset not found"}"#).unwrap();
        assert_eq!(error.code, "not_found");
        assert_eq!(error.message, "dataset not found");
    }

    #[test]
    fn test_dataset_wire_format() {
        let dataset = Dataset {
            r#type: Some(AnnotatedType {
                descriptor_set: Some(FileDescriptorSet::default()),
                type_url: "type.googleapis.com/datasets.v1.Sentinel1Sar".to_string(),
            }),
            name: "Sentinel-1 SAR".to_string(),
            ..Default::default()
        };
        let decoded = Dataset::decode(dataset.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, dataset);
    }
}
