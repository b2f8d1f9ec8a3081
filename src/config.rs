use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings of one orchestrator instance (one page load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub decision_flow: DecisionFlowConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub control: ControlConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
            endpoint: EndpointConfig::default(),
            decision_flow: DecisionFlowConfig::default(),
            navigation: NavigationConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoint.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint.base_url is empty".into()));
        }
        if !self.endpoint.decision_flow_path.contains(FORM_ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "endpoint.decision_flow_path must contain {}",
                FORM_ID_PLACEHOLDER
            )));
        }
        if self.decision_flow.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "decision_flow.max_attempts must be at least 1".into(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "event_buffer_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

pub const FORM_ID_PLACEHOLDER: &str = "{form_id}";

/// Where and how the decision service is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_evaluate_path")]
    pub evaluate_path: String,

    /// Path of the decision-flow document, `{form_id}` is substituted.
    #[serde(default = "default_decision_flow_path")]
    pub decision_flow_path: String,

    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub request_timeout: Duration,

    #[serde(default = "default_anti_forgery_header")]
    pub anti_forgery_header: String,

    #[serde(default = "default_cache_buster_param")]
    pub cache_buster_param: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            evaluate_path: default_evaluate_path(),
            decision_flow_path: default_decision_flow_path(),
            request_timeout: default_request_timeout(),
            anti_forgery_header: default_anti_forgery_header(),
            cache_buster_param: default_cache_buster_param(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionFlowConfig {
    /// How long a fetched document is served without asking the service again.
    #[serde(default = "default_cache_timeout", with = "duration_ms")]
    pub cache_timeout: Duration,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_base_delay", with = "duration_ms")]
    pub retry_base_delay: Duration,

    /// Delay between arriving on the summary page and loading the document.
    #[serde(default = "default_load_delay", with = "duration_ms")]
    pub load_delay: Duration,
}

impl Default for DecisionFlowConfig {
    fn default() -> Self {
        Self {
            cache_timeout: default_cache_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_delay: default_retry_base_delay(),
            load_delay: default_load_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_debounce_window", with = "duration_ms")]
    pub debounce_window: Duration,

    /// Query parameter carrying the page number.
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Hidden field the host wizard keeps the current page in.
    #[serde(default = "default_page_field")]
    pub page_field: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            debounce_window: default_debounce_window(),
            page_param: default_page_param(),
            page_field: default_page_field(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_busy_label")]
    pub busy_label: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            busy_label: default_busy_label(),
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    let config = serde_json::from_str(s)?;
    Ok(config)
}

fn default_event_buffer_size() -> usize {
    64
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_evaluate_path() -> String {
    "/evaluate".to_string()
}

fn default_decision_flow_path() -> String {
    format!("/decision-flow/{}", FORM_ID_PLACEHOLDER)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_anti_forgery_header() -> String {
    "X-CSRF-Token".to_string()
}

fn default_cache_buster_param() -> String {
    "_".to_string()
}

fn default_cache_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_load_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_debounce_window() -> Duration {
    Duration::from_millis(100)
}

fn default_page_param() -> String {
    "form_page".to_string()
}

fn default_page_field() -> String {
    "source_page_number".to_string()
}

fn default_busy_label() -> String {
    "Evaluating...".to_string()
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
