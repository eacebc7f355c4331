//! `reqwest`-backed implementation of [`CheckService`].

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use checkgrid_core::{
    CheckGridConfig, CheckGroup, CheckHistory, CheckResult, Kwargs, RunAck, Worker,
};

use crate::error::{ClientError, ClientResult};
use crate::service::CheckService;

/// HTTP client for one environment of the check-execution service.
#[derive(Debug, Clone)]
pub struct HttpCheckService {
    client: Client,
    base_url: Url,
    environment: String,
    token: Option<String>,
}

impl HttpCheckService {
    /// Creates a client scoped to `environment`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid base URL or the HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, environment: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "{base_url} cannot be used as a base url"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("checkgrid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            environment: environment.to_string(),
            token: None,
        })
    }

    /// Creates a client from a loaded configuration.
    pub fn from_config(config: &CheckGridConfig) -> ClientResult<Self> {
        let timeout = config
            .request_timeout()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let service = Self::new(&config.service.base_url, &config.service.environment, timeout)?;
        Ok(match &config.service.token {
            Some(token) => service.with_token(token),
            None => service,
        })
    }

    /// Attach a session credential to every request.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// `{base_url}/{environment}/{segments...}`
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`, so the segments are mutable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.environment).extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        let mut req = self.client.get(url.clone());
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        debug!(%url, "GET");
        let response = req.send().await.map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Serialize kwargs the way the run endpoint expects: JSON, then base64.
pub fn encode_args(kwargs: &Kwargs) -> ClientResult<String> {
    let json = serde_json::to_vec(kwargs)?;
    Ok(STANDARD.encode(json))
}

impl CheckService for HttpCheckService {
    async fn grouped_checks(&self) -> ClientResult<Vec<CheckGroup>> {
        self.get_json(self.endpoint(&["checks", "grouped"]), &[]).await
    }

    async fn workers(&self) -> ClientResult<Vec<Worker>> {
        self.get_json(self.endpoint(&["lambdas"]), &[]).await
    }

    async fn check_result(&self, name: &str) -> ClientResult<CheckResult> {
        self.get_json(self.endpoint(&["checks", name]), &[]).await
    }

    async fn check_history(&self, name: &str) -> ClientResult<CheckHistory> {
        self.get_json(self.endpoint(&["checks", name, "history"]), &[])
            .await
    }

    async fn run_check(&self, name: &str, kwargs: &Kwargs) -> ClientResult<RunAck> {
        let args = encode_args(kwargs)?;
        self.get_json(self.endpoint(&["checks", name, "run"]), &[("args", &args)])
            .await
    }
}
