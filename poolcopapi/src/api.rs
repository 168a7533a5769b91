use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ApiKey, Config};
use crate::error::{PoolCopilotError, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};

pub(crate) const API_KEY_HEADER: &str = "APIKEY";
pub(crate) const TOKEN_HEADER: &str = "PoolCop-Token";

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Commands {
    Status,
    AlarmHistory { offset: u32 },
    CommandHistory { offset: u32 },
    TogglePump,
    SetPumpSpeed { speed: u8 },
    ToggleAux { aux_id: u32 },
    ClearAlarm,
    SetValvePosition { position: u32 },
}

impl Commands {
    pub(crate) fn method(&self) -> Method {
        use Commands::*;
        match self {
            Status | AlarmHistory { .. } | CommandHistory { .. } => Method::GET,
            TogglePump
            | SetPumpSpeed { .. }
            | ToggleAux { .. }
            | ClearAlarm
            | SetValvePosition { .. } => Method::POST,
        }
    }

    /// Path relative to the API root.
    pub(crate) fn path(&self) -> String {
        use Commands::*;
        match self {
            Status => "status".to_string(),
            AlarmHistory { offset } => format!("history/alarms/{offset}"),
            CommandHistory { offset } => format!("history/commands/{offset}"),
            TogglePump => "command/pump".to_string(),
            SetPumpSpeed { speed } => format!("command/pump/{speed}"),
            ToggleAux { aux_id } => format!("command/aux/{aux_id}"),
            ClearAlarm => "command/clear_alarm".to_string(),
            SetValvePosition { position } => format!("command/valve/{position}"),
        }
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

// the api is not consistent about numbers, "10" and 10 both show up

fn deserialize_maybe_i64<'de, D>(d: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Number(num) => num
            .as_i64()
            .or_else(|| num.as_f64().map(|num| num as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Quota information the API attaches to its answers as `api_token`. Fields
/// that cannot be read as a number are left out, the others are kept.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct TokenInfo {
    #[serde(default, deserialize_with = "deserialize_maybe_i64")]
    pub(crate) max_limit: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_maybe_i64")]
    pub(crate) expire: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_maybe_i64")]
    pub(crate) poolcop_id: Option<i64>,
}

impl TokenInfo {
    pub(crate) fn from_response(data: &Value) -> Option<Self> {
        let raw = data.get("api_token")?;
        match serde_json::from_value(raw.clone()) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!("[poolcopilot api] cannot read api_token: {}", err);
                None
            }
        }
    }

    pub(crate) fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expire
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

fn base_request(config: &Config, method: Method, path: &str) -> Result<ApiRequest> {
    Ok(ApiRequest::new(method, config.endpoint(path)?).header("Accept", "application/json"))
}

/// Builds the raw request for `cmd`. `auth` is the header carrying either the
/// API key or the session token.
pub(crate) fn build_request(
    config: &Config,
    cmd: Commands,
    auth: (&'static str, &str),
) -> Result<ApiRequest> {
    let (name, value) = auth;
    Ok(base_request(config, cmd.method(), &cmd.path())?.header(name, value))
}

/// Exchanges the API key for a token. A 403 or an answer without a token
/// means the key was not accepted.
pub(crate) async fn fetch_token(
    transport: &dyn Transport,
    config: &Config,
    api_key: &ApiKey,
) -> Result<(String, Option<TokenInfo>)> {
    let request = base_request(config, Method::POST, "token")?.form("APIKEY", api_key.expose());
    debug!("[poolcopilot api] requesting token");
    let response = transport.send(request).await?;
    if response.status == StatusCode::FORBIDDEN {
        return Err(PoolCopilotError::InvalidKey);
    }
    let data = decode(response, "token")?;
    let token = data
        .get("token")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or(PoolCopilotError::InvalidKey)?;
    Ok((token, TokenInfo::from_response(&data)))
}

/// Sends a request and decodes the answer.
pub(crate) async fn request(transport: &dyn Transport, request: ApiRequest) -> Result<Value> {
    let path = request.url.path().to_string();
    debug!("[poolcopilot api] {} {}", request.method, path);
    let response = transport.send(request).await?;
    decode(response, &path)
}

/// Turns a raw answer into json. Non-2xx answers become [`PoolCopilotError::Api`].
pub(crate) fn decode(response: ApiResponse, what: &str) -> Result<Value> {
    let status = response.status;
    info!(
        "[poolcopilot api] {} status: {:?} {:?}",
        what,
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );

    if !status.is_success() {
        return Err(PoolCopilotError::Api {
            status,
            body: response.body,
        });
    }

    if !response.is_json() {
        warn!(
            "[poolcopilot api] unexpected content type {:?} for {}",
            response.content_type.as_deref().unwrap_or_default(),
            what
        );
    }

    Ok(serde_json::from_str(&response.body)?)
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
