use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::api::{self, Commands, TokenInfo, API_KEY_HEADER, TOKEN_HEADER};
use crate::config::{ApiKey, Authentication, Config};
use crate::error::{PoolCopilotError, Result};
use crate::transport::{HttpTransport, Transport};

type Connector<T> = Box<dyn Fn(&Config) -> Result<T> + Send + Sync>;

/// The main interface to the PoolCopilot API.
///
/// The underlying session (see [`Transport`]) is opened on the first request
/// or by [`PoolCopilot::open`] and released by [`PoolCopilot::close`], when
/// the [`Session`] guard goes out of scope or when the client is dropped.
pub struct PoolCopilot<T: Transport = HttpTransport> {
    api_key: ApiKey,
    config: Config,
    connector: Connector<T>,
    session: OnceCell<T>,
    token: Mutex<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    limit: Option<i64>,
    poolcop_id: Option<i64>,
}

impl TokenState {
    fn valid_token(&self, now: DateTime<Utc>) -> Option<String> {
        match (&self.token, self.expires_at) {
            (Some(token), Some(expires_at)) if expires_at > now => Some(token.clone()),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.token = None;
        self.expires_at = None;
        self.limit = None;
    }

    fn update(&mut self, info: &TokenInfo) {
        if let Some(limit) = info.max_limit {
            self.limit = Some(limit);
        }
        if let Some(expires_at) = info.expires_at() {
            self.expires_at = Some(expires_at);
        }
        if let Some(id) = info.poolcop_id {
            self.poolcop_id = Some(id);
        }
    }
}

impl PoolCopilot<HttpTransport> {
    pub fn new(api_key: impl ToString) -> Result<Self> {
        Self::with_config(api_key, Config::default())
    }

    pub fn with_config(api_key: impl ToString, config: Config) -> Result<Self> {
        Self::with_connector(api_key, config, HttpTransport::connect)
    }

    /// Uses the connection pool of an existing [`reqwest::Client`]. Timeout
    /// and user agent of that client apply instead of the ones in `config`.
    pub fn with_client(
        api_key: impl ToString,
        config: Config,
        client: reqwest::Client,
    ) -> Result<Self> {
        Self::with_connector(api_key, config, move |_| {
            Ok(HttpTransport::from_client(client.clone()))
        })
    }
}

impl<T: Transport> PoolCopilot<T> {
    /// `connector` is called whenever a new session needs to be opened.
    pub fn with_connector(
        api_key: impl ToString,
        config: Config,
        connector: impl Fn(&Config) -> Result<T> + Send + Sync + 'static,
    ) -> Result<Self> {
        Ok(PoolCopilot {
            api_key: ApiKey::new(api_key)?,
            config,
            connector: Box::new(connector),
            session: OnceCell::new(),
            token: Mutex::new(TokenState::default()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Primary PoolCop identifier, known once the API reported it.
    pub async fn poolcop_id(&self) -> Option<i64> {
        self.token.lock().await.poolcop_id
    }

    pub fn is_open(&self) -> bool {
        self.session.initialized()
    }

    /// Opens the session now and returns a guard that closes it when dropped.
    pub fn open(&mut self) -> Result<Session<'_, T>> {
        if !self.session.initialized() {
            debug!("[poolcopilot] opening session");
            let transport = (self.connector)(&self.config)?;
            self.session = OnceCell::new_with(Some(transport));
        }
        Ok(Session { client: self })
    }

    /// Releases the session. Returns `false` if there was none to release.
    pub fn close(&mut self) -> bool {
        let released = self.session.take().is_some();
        if released {
            debug!("[poolcopilot] session closed");
        }
        released
    }

    // -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

    /// Current state of the PoolCop as reported by the API.
    pub async fn status(&self) -> Result<Value> {
        self.request(Commands::Status).await
    }

    pub async fn alarm_history(&self, offset: u32) -> Result<Value> {
        self.request(Commands::AlarmHistory { offset }).await
    }

    pub async fn command_history(&self, offset: u32) -> Result<Value> {
        self.request(Commands::CommandHistory { offset }).await
    }

    pub async fn toggle_pump(&self) -> Result<Value> {
        self.request(Commands::TogglePump).await
    }

    /// Speed must be 1, 2 or 3.
    pub async fn set_pump_speed(&self, speed: u8) -> Result<Value> {
        if !(1..=3).contains(&speed) {
            return Err(PoolCopilotError::InvalidArgument(format!(
                "pump speed must be 1, 2 or 3, got {speed}"
            )));
        }
        self.request(Commands::SetPumpSpeed { speed }).await
    }

    pub async fn toggle_aux(&self, aux_id: u32) -> Result<Value> {
        self.request(Commands::ToggleAux { aux_id }).await
    }

    pub async fn clear_alarm(&self) -> Result<Value> {
        self.request(Commands::ClearAlarm).await
    }

    pub async fn set_valve_position(&self, position: u32) -> Result<Value> {
        self.request(Commands::SetValvePosition { position }).await
    }

    // -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

    async fn transport(&self) -> Result<&T> {
        self.session
            .get_or_try_init(|| async {
                debug!("[poolcopilot] opening session");
                (self.connector)(&self.config)
            })
            .await
    }

    async fn token(&self, transport: &T) -> Result<String> {
        let mut state = self.token.lock().await;
        let token = match state.valid_token(Utc::now()) {
            Some(token) => token,
            None => {
                state.reset();
                debug!("[poolcopilot] fetching new token");
                let (token, info) =
                    api::fetch_token(transport, &self.config, &self.api_key).await?;
                state.token = Some(token.clone());
                if let Some(info) = info {
                    state.update(&info);
                }
                token
            }
        };
        if state.limit == Some(0) {
            return Err(PoolCopilotError::RateLimit);
        }
        Ok(token)
    }

    async fn request(&self, cmd: Commands) -> Result<Value> {
        let transport = self.transport().await?;
        let request = match self.config.auth {
            Authentication::ApiKeyHeader => api::build_request(
                &self.config,
                cmd,
                (API_KEY_HEADER, self.api_key.expose()),
            )?,
            Authentication::Token => {
                let token = self.token(transport).await?;
                api::build_request(&self.config, cmd, (TOKEN_HEADER, token.as_str()))?
            }
        };

        let data = api::request(transport, request).await?;
        if let Some(info) = TokenInfo::from_response(&data) {
            self.token.lock().await.update(&info);
        }
        Ok(data)
    }
}

impl<T: Transport> std::fmt::Debug for PoolCopilot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolCopilot")
            .field("api_key", &self.api_key)
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Scope guard returned by [`PoolCopilot::open`]. The session is released
/// when the guard is dropped, whether the calls made through it succeeded or
/// not.
#[derive(Debug)]
pub struct Session<'a, T: Transport = HttpTransport> {
    client: &'a mut PoolCopilot<T>,
}

impl<'a, T: Transport> Deref for Session<'a, T> {
    type Target = PoolCopilot<T>;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl<'a, T: Transport> Drop for Session<'a, T> {
    fn drop(&mut self) {
        self.client.close();
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
