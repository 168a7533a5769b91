use std::{io::Read, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use poolcopapi::{Authentication, Config};
use serde::{Deserialize, Deserializer};

fn deserialize_timeout<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(d)? {
        None => Ok(None),
        Some(s) => crate::parser::parse_timeout(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Settings for talking to PoolCopilot. Collected from an optional yaml file
/// and overridden by environment vars / command line flags.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// e.g. "10s"
    #[serde(deserialize_with = "deserialize_timeout")]
    pub timeout: Option<Duration>,
    pub token_auth: Option<bool>,
}

impl Settings {
    pub fn from_yaml_file(p: impl AsRef<Path>) -> anyhow::Result<Self> {
        let p = p.as_ref();
        let f = std::fs::File::open(p)
            .with_context(|| format!("unable to open config file {}", p.display()))?;
        Self::from_yaml(f).with_context(|| format!("unable to parse config file {}", p.display()))
    }

    pub fn from_yaml(yaml_reader: impl Read) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_reader(yaml_reader)?)
    }

    /// Values set in `other` win.
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            api_key: other.api_key.or(self.api_key),
            base_url: other.base_url.or(self.base_url),
            timeout: other.timeout.or(self.timeout),
            token_auth: other.token_auth.or(self.token_auth),
        }
    }

    /// The api key and the client configuration these settings describe.
    pub fn client_config(&self) -> anyhow::Result<(String, Config)> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("No API key given. Use --api-key or POOLCOPILOT_API_KEY"))?;

        let mut config = Config::new();
        if let Some(base_url) = &self.base_url {
            config = config.base_url(base_url)?;
        }
        if let Some(timeout) = self.timeout {
            config = config.request_timeout(timeout);
        }
        if self.token_auth.unwrap_or(false) {
            config = config.auth(Authentication::Token);
        }

        Ok((api_key, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_yaml() {
        let yaml = "
api_key: abc
base_url: http://localhost:8080/api/v1
timeout: 5s
token_auth: true
";
        let settings = Settings::from_yaml(yaml.as_bytes()).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("abc"));
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.token_auth, Some(true));

        let (key, config) = settings.client_config().unwrap();
        assert_eq!(key, "abc");
        assert_eq!(
            config.get_base_url().as_str(),
            "http://localhost:8080/api/v1/"
        );
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.auth, Authentication::Token);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::from_yaml("apikey: abc".as_bytes()).is_err());
    }

    #[test]
    fn flags_override_file() {
        let file = Settings {
            api_key: Some("from-file".to_string()),
            base_url: Some("http://file".to_string()),
            timeout: None,
            token_auth: Some(true),
        };
        let flags = Settings {
            api_key: Some("from-flag".to_string()),
            ..Default::default()
        };
        let merged = file.clone().merge(flags);
        assert_eq!(merged.api_key.as_deref(), Some("from-flag"));
        assert_eq!(merged.base_url.as_deref(), Some("http://file"));
        assert_eq!(merged.token_auth, Some(true));

        let flags = Settings {
            token_auth: Some(false),
            ..Default::default()
        };
        let (_, config) = file.merge(flags).client_config().unwrap();
        assert_eq!(config.auth, Authentication::ApiKeyHeader);
    }

    #[test]
    fn invalid_timeout_in_file() {
        assert!(Settings::from_yaml("timeout: soon".as_bytes()).is_err());
    }

    #[test]
    fn missing_api_key() {
        let err = Settings::default().client_config().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key: xyz").unwrap();
        let settings = Settings::from_yaml_file(file.path()).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("xyz"));
        assert!(Settings::from_yaml_file("/does/not/exist.yaml").is_err());
    }
}
