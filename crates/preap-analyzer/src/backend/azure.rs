//! Azure Document Intelligence backend.
//!
//! Analysis is asynchronous on the service side: the file is submitted to
//! `:analyze`, which answers `202 Accepted` with an `Operation-Location`
//! header. That URL is polled until the operation reports `succeeded` or
//! `failed`.

use std::time::Duration;

use preap_core::models::config::{AnalyzerConfig, Credentials};
use preap_core::RawAnalysisResult;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AnalyzerError;
use crate::{DocumentAnalyzer, Result};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Backend calling the Document Intelligence REST API.
pub struct AzureAnalyzer {
    client: Client,
    endpoint: String,
    api_key: String,
    model_id: String,
    api_version: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl std::fmt::Debug for AzureAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAnalyzer")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AzureAnalyzer {
    /// Create a client from resolved credentials and analyzer settings.
    pub fn new(credentials: Credentials, config: &AnalyzerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: credentials.endpoint.trim_end_matches('/').to_string(),
            api_key: credentials.api_key,
            model_id: config.model_id.clone(),
            api_version: config.api_version.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    /// URL the document is submitted to.
    pub fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.endpoint, self.model_id, self.api_version
        )
    }

    async fn submit(&self, content: Vec<u8>, content_type: &str) -> Result<String> {
        let url = self.analyze_url();
        info!(url = %url, bytes = content.len(), "submitting document for analysis");

        let resp = self
            .client
            .post(&url)
            .header(KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalyzerError::from_status(status.as_u16(), body));
        }

        resp.headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(AnalyzerError::MissingOperationLocation)
    }

    async fn poll(&self, operation_url: &str) -> Result<RawAnalysisResult> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let resp = self
                .client
                .get(operation_url)
                .header(KEY_HEADER, &self.api_key)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(AnalyzerError::from_status(status.as_u16(), body));
            }

            let body: Value = resp.json().await?;
            match body.get("status").and_then(Value::as_str).unwrap_or("") {
                "succeeded" => {
                    info!(attempts = attempt, "analysis succeeded");
                    return Ok(RawAnalysisResult::from_operation(body)?);
                }
                "failed" => return Err(operation_failure(&body)),
                other => debug!(attempt, status = other, "analysis still running"),
            }
        }

        warn!(attempts = self.max_polls, "analysis polling budget exhausted");
        Err(AnalyzerError::Timeout {
            attempts: self.max_polls,
        })
    }
}

fn operation_failure(body: &Value) -> AnalyzerError {
    let error = body.get("error");
    let text = |key: &str, default: &str| {
        error
            .and_then(|e| e.get(key))
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    AnalyzerError::AnalysisFailed {
        code: text("code", "Unknown"),
        message: text("message", "Unknown error"),
    }
}

impl DocumentAnalyzer for AzureAnalyzer {
    async fn analyze(&self, content: Vec<u8>, content_type: &str) -> Result<RawAnalysisResult> {
        let operation_url = self.submit(content, content_type).await?;
        debug!(operation = %operation_url, "analysis accepted");
        self.poll(&operation_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            poll_interval_ms: 1,
            max_polls: 3,
            ..Default::default()
        }
    }

    fn analyzer(endpoint: &str) -> AzureAnalyzer {
        let credentials = Credentials {
            endpoint: endpoint.to_string(),
            api_key: "test-key".to_string(),
        };
        AzureAnalyzer::new(credentials, &config()).unwrap()
    }

    #[derive(Clone)]
    struct Fake {
        base: String,
        polls: Arc<AtomicU32>,
        finish_after: u32,
        outcome: Value,
    }

    async fn submit(State(fake): State<Fake>, headers: HeaderMap) -> Response {
        if headers.get(KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("test-key") {
            return (StatusCode::UNAUTHORIZED, "bad key").into_response();
        }
        let location = format!("{}/operations/1", fake.base);
        (StatusCode::ACCEPTED, [("Operation-Location", location)]).into_response()
    }

    async fn operation(State(fake): State<Fake>) -> Json<Value> {
        let n = fake.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n < fake.finish_after {
            Json(json!({ "status": "running" }))
        } else {
            Json(fake.outcome.clone())
        }
    }

    /// Serve a fake service on a random local port and return its base URL.
    async fn spawn_fake(finish_after: u32, outcome: Value) -> (String, Arc<AtomicU32>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let polls = Arc::new(AtomicU32::new(0));

        let fake = Fake {
            base: base.clone(),
            polls: polls.clone(),
            finish_after,
            outcome,
        };
        let app = Router::new()
            .route(
                "/documentintelligence/documentModels/{model}",
                post(submit),
            )
            .route("/operations/1", get(operation))
            .with_state(fake);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (base, polls)
    }

    #[test]
    fn test_analyze_url() {
        let analyzer = analyzer("https://example.cognitiveservices.azure.com/");
        assert_eq!(
            analyzer.analyze_url(),
            "https://example.cognitiveservices.azure.com/documentintelligence/documentModels/prebuilt-invoice:analyze?api-version=2024-11-30"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let analyzer = analyzer("https://example.test");
        assert!(!format!("{analyzer:?}").contains("test-key"));
    }

    #[tokio::test]
    async fn test_polls_until_succeeded() {
        let outcome = json!({
            "status": "succeeded",
            "analyzeResult": { "modelId": "prebuilt-invoice", "documents": [] }
        });
        let (base, polls) = spawn_fake(2, outcome).await;

        let result = analyzer(&base)
            .analyze(b"%PDF-1.5".to_vec(), "application/pdf")
            .await
            .unwrap();

        assert_eq!(result.as_value()["modelId"], "prebuilt-invoice");
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_operation() {
        let outcome = json!({
            "status": "failed",
            "error": { "code": "InvalidContent", "message": "The file is corrupted." }
        });
        let (base, _) = spawn_fake(1, outcome).await;

        let err = analyzer(&base)
            .analyze(b"junk".to_vec(), "application/pdf")
            .await
            .unwrap_err();

        match err {
            AnalyzerError::AnalysisFailed { code, message } => {
                assert_eq!(code, "InvalidContent");
                assert_eq!(message, "The file is corrupted.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_max_polls() {
        let (base, polls) = spawn_fake(u32::MAX, json!({})).await;

        let err = analyzer(&base)
            .analyze(b"%PDF-1.5".to_vec(), "application/pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyzerError::Timeout { attempts: 3 }));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bad_key_is_unauthorized() {
        let (base, _) = spawn_fake(1, json!({})).await;
        let credentials = Credentials {
            endpoint: base,
            api_key: "wrong".to_string(),
        };
        let analyzer = AzureAnalyzer::new(credentials, &config()).unwrap();

        let err = analyzer
            .analyze(b"%PDF-1.5".to_vec(), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Unauthorized { status: 401, .. }));
    }
}
