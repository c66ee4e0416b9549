//! HTTP client for a remote provisioning engine.
//!
//! Each declaration is posted as JSON to `{url}/v1/declarations`; the
//! engine answers with `{"id": "..."}`. Any failure is reported against
//! the declaration's name. Retries and backoff are the engine's job.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::error::{ProvisioningError, Result, StackError};
use crate::topology::{Declaration, ResourceId, Secret};

use super::ProvisioningEngine;

/// Path of the declaration endpoint, relative to the engine URL.
const DECLARATIONS_PATH: &str = "/v1/declarations";

/// Remote provisioning engine.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    /// HTTP client.
    client: Client,
    /// Engine base URL without trailing slash.
    base_url: String,
    /// Bearer token.
    token: Option<Secret>,
}

/// Successful submission response.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

impl HttpEngine {
    /// Creates an engine client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StackError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(Secret::new),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{DECLARATIONS_PATH}", self.base_url)
    }
}

#[async_trait]
impl ProvisioningEngine for HttpEngine {
    async fn submit(&self, declaration: &Declaration) -> std::result::Result<ResourceId, ProvisioningError> {
        let fail = |cause: String| ProvisioningError::new(&declaration.name, cause);
        trace!("Posting {} '{}' to {}", declaration.kind(), declaration.name, self.endpoint());

        let mut request = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .json(declaration);

        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token.expose()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| fail(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Engine rejected '{}': {status}", declaration.name);
            return Err(fail(format!("Engine returned {status}: {}", body.trim())));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| fail(format!("Invalid engine response: {e}")))?;

        if body.id.is_empty() {
            return Err(fail(String::from("Engine returned an empty identifier")));
        }

        info!("Engine accepted '{}' as {}", declaration.name, body.id);
        Ok(ResourceId::new(body.id))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::ResourceSpec;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn igw() -> Declaration {
        Declaration::new(
            "igw",
            ResourceSpec::InternetGateway {
                vpc_id: ResourceId::new("vpc-123"),
                tags: crate::topology::tags([("Name", "Aurora Cluster Internet Gateway")]),
            },
        )
    }

    #[tokio::test]
    async fn test_submit_returns_engine_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/declarations"))
            .and(header("authorization", "Bearer t0ken"))
            .and(body_partial_json(serde_json::json!({
                "name": "igw",
                "kind": "internet_gateway",
                "properties": { "vpc_id": "vpc-123" }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "igw-0abc" })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = HttpEngine::new(&format!("{}/", server.uri()), Some(String::from("t0ken")), 5).unwrap();
        let id = engine.submit(&igw()).await.unwrap();
        assert_eq!(id, ResourceId::new("igw-0abc"));
    }

    #[tokio::test]
    async fn test_rejection_names_resource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/declarations"))
            .respond_with(ResponseTemplate::new(422).set_body_string("vpc-123 does not exist"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = HttpEngine::new(&server.uri(), None, 5).unwrap();
        let err = engine.submit(&igw()).await.unwrap_err();
        assert_eq!(err.resource, "igw");
        assert!(err.cause.contains("422"));
        assert!(err.cause.contains("vpc-123 does not exist"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let engine = HttpEngine::new(&server.uri(), None, 5).unwrap();
        assert!(engine.submit(&igw()).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let engine = HttpEngine::new(&server.uri(), None, 5).unwrap();
        let err = engine.submit(&igw()).await.unwrap_err();
        assert!(err.cause.contains("Invalid engine response"));
    }

    #[tokio::test]
    async fn test_empty_identifier_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "" })))
            .mount(&server)
            .await;

        let engine = HttpEngine::new(&server.uri(), None, 5).unwrap();
        assert!(engine.submit(&igw()).await.is_err());
    }
}
