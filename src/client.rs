//! # Decision service client
//!
//! The two calls the orchestrator makes to the remote decision service:
//!
//! - `POST {base}{evaluate_path}` with `{configId, variables}`
//! - `GET {base}{decision_flow_path}?{cache_buster}=...` for the decision-flow document
//!
//! Both carry the per-session anti-forgery token. Failures are classified into
//! [`FailureKind`]s; the remote service's own error text is logged, never surfaced.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Response, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{EndpointConfig, FORM_ID_PLACEHOLDER},
    types::{ConfigId, EvaluationVariables, FormId},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub config_id: ConfigId,
    pub variables: EvaluationVariables,
}

/// Successful evaluation payload.
///
/// Results are keyed by output name; each entry is either an object carrying
/// a `value` member or a bare scalar.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "result")]
    pub results: Map<String, Value>,
    #[serde(default)]
    pub process_instance_id: Option<String>,
}

impl EvaluateResponse {
    pub fn value_of(&self, result_name: &str) -> Option<&Value> {
        match self.results.get(result_name)? {
            Value::Object(entry) => entry.get("value"),
            scalar => Some(scalar),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DecisionFlowResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub html: Option<String>,
}

impl DecisionFlowResponse {
    /// The document, or `None` when the service has nothing to show.
    pub fn into_document(self) -> Option<String> {
        if !self.success {
            return None;
        }
        self.html.filter(|html| !html.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Coarse classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FailureKind {
    ValidationRejected,
    NotFound,
    ServerError,
    ConnectivityError,
    Timeout,
}

impl FailureKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::ValidationRejected => {
                "The decision service rejected the request. Please check your answers."
            }
            FailureKind::NotFound => "The decision configuration for this form could not be found.",
            FailureKind::ServerError => {
                "The decision service ran into a problem. Please try again later."
            }
            FailureKind::ConnectivityError => {
                "Could not reach the decision service. Please check your connection and try again."
            }
            FailureKind::Timeout => "The decision service took too long to answer. Please try again.",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::ServerError | FailureKind::ConnectivityError | FailureKind::Timeout
        )
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("Resource not found")]
    NotFound { message: Option<String> },
    #[error("Server error with status {status}")]
    Server { status: u16, message: Option<String> },
    #[error("Connection failed: {0}")]
    Connectivity(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Invalid client setup: {0}")]
    Setup(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound { message },
            s if s.is_server_error() => ClientError::Server {
                status: s.as_u16(),
                message,
            },
            s => ClientError::Rejected {
                status: s.as_u16(),
                message,
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Rejected { .. } | ClientError::Setup(_) => FailureKind::ValidationRejected,
            ClientError::NotFound { .. } => FailureKind::NotFound,
            ClientError::Server { .. } | ClientError::Decode(_) => FailureKind::ServerError,
            ClientError::Connectivity(_) => FailureKind::ConnectivityError,
            ClientError::Timeout => FailureKind::Timeout,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::from_status(status, None)
        } else {
            ClientError::Connectivity(e.to_string())
        }
    }
}

#[mockall::automock]
#[async_trait]
pub trait DecisionClient: Send + Sync {
    async fn evaluate(&self, request: &EvaluateRequest) -> ClientResult<EvaluateResponse>;

    async fn fetch_decision_flow(&self, form_id: FormId) -> ClientResult<DecisionFlowResponse>;
}

/// [`DecisionClient`] over HTTP.
pub struct HttpDecisionClient {
    client: Client,
    endpoint: EndpointConfig,
    token: SecretString,
}

impl HttpDecisionClient {
    pub fn new(endpoint: &EndpointConfig, token: SecretString) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(endpoint.request_timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.clone(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> ClientResult<HeaderMap> {
        let name = HeaderName::from_bytes(self.endpoint.anti_forgery_header.as_bytes())
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        let value = HeaderValue::from_str(self.token.expose_secret())
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        Ok(headers)
    }

    /// Turns a non-2xx response into a classified error, logging the body.
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        warn!(%status, message = ?message, "decision service returned an error");
        Err(ClientError::from_status(status, message))
    }
}

#[async_trait]
impl DecisionClient for HttpDecisionClient {
    #[tracing::instrument(skip(self, request), fields(config_id = %request.config_id))]
    async fn evaluate(&self, request: &EvaluateRequest) -> ClientResult<EvaluateResponse> {
        let response = self
            .client
            .post(self.url(&self.endpoint.evaluate_path))
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;
        let response: EvaluateResponse = Self::check(response).await?.json().await?;

        if !response.success {
            debug!("evaluation answered without success flag");
            return Err(ClientError::Rejected {
                status: StatusCode::OK.as_u16(),
                message: None,
            });
        }
        Ok(response)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_decision_flow(&self, form_id: FormId) -> ClientResult<DecisionFlowResponse> {
        let path = self
            .endpoint
            .decision_flow_path
            .replace(FORM_ID_PLACEHOLDER, &form_id.to_string());
        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();

        let response = self
            .client
            .get(self.url(&path))
            .headers(self.headers()?)
            .query(&[(self.endpoint.cache_buster_param.as_str(), cache_buster.as_str())])
            .send()
            .await?;
        Ok(Self::check(response)
            .await?
            .json::<DecisionFlowResponse>()
            .await?)
    }
}
