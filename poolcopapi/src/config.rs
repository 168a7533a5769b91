use std::time::Duration;

use url::Url;

use crate::error::{PoolCopilotError, Result};

pub const DEFAULT_BASE_URL: &str = "https://poolcopilot.com/api/v1/";

/// The credential handed out by PoolCopilot. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl ToString) -> Result<Self> {
        let key = key.to_string();
        if key.trim().is_empty() {
            return Err(PoolCopilotError::EmptyApiKey);
        }
        // sent as a header, so it has to be a valid header value
        if reqwest::header::HeaderValue::from_str(&key).is_err() {
            return Err(PoolCopilotError::MalformedApiKey);
        }
        Ok(ApiKey(key))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

impl std::str::FromStr for ApiKey {
    type Err = PoolCopilotError;

    fn from_str(input: &str) -> Result<Self> {
        ApiKey::new(input)
    }
}

/// How requests are authenticated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    /// The API key travels in the `APIKEY` header of every request.
    #[default]
    ApiKeyHeader,
    /// The API key is exchanged for a short lived token which is then sent
    /// as `PoolCop-Token`.
    Token,
}

#[derive(Debug, Clone)]
pub struct Config {
    base_url: Url,
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
    pub auth: Authentication,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            request_timeout: None,
            user_agent: format!("poolcopapi/{}", env!("CARGO_PKG_VERSION")),
            auth: Authentication::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API root. Endpoint paths are resolved relative to it, so
    /// a missing trailing slash is added.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        let url = if url.ends_with('/') {
            Url::parse(url)?
        } else {
            Url::parse(&format!("{url}/"))?
        };
        self.base_url = url;
        Ok(self)
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl ToString) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn auth(mut self, auth: Authentication) -> Self {
        self.auth = auth;
        self
    }

    pub fn get_base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}
