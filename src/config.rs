use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use url::Url;

use crate::balance::DEFAULT_FIAT_ASSETS;
use crate::credentials::{Credentials, StaticCredentialProvider};
use crate::exchange::binance::DEFAULT_BASE_URL;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    pub whatsapp: Option<WhatsAppConfig>,
    /// Per-sender exchange accounts, keyed by WhatsApp sender id.
    #[serde(default)]
    pub accounts: HashMap<String, AccountConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, `/balance` and `/buy` require a matching `x-api-key`.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    #[serde(default = "default_fiat_assets")]
    pub fiat_assets: Vec<String>,
    /// Base assets allowed against `quote_asset`. Empty = no restriction.
    #[serde(default)]
    pub supported_assets: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    pub recv_window_ms: Option<u64>,
    /// Operator account used by the REST endpoints.
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            quote_asset: default_quote_asset(),
            fiat_assets: default_fiat_assets(),
            supported_assets: Vec::new(),
            request_timeout_secs: default_timeout_secs(),
            recv_window_ms: None,
            api_key: None,
            secret_key: None,
        }
    }
}

impl ExchangeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WhatsAppConfig {
    /// Graph API root, e.g. `https://graph.facebook.com/v19.0`.
    pub api_url: String,
    pub phone_id: String,
    pub token: String,
    /// Token expected in the subscription handshake.
    pub verify_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl WhatsAppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Falls back to the bearer token, as the first deployments did.
    pub fn effective_verify_token(&self) -> &str {
        self.verify_token.as_deref().unwrap_or(&self.token)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub api_key: String,
    pub secret_key: String,
}

/// `CHAT_TRADE__SECTION__KEY` variables. List settings take comma-separated
/// values (`CHAT_TRADE__EXCHANGE__SUPPORTED_ASSETS=BTC,ETH`). `vars` replaces
/// the process environment when given.
fn environment(vars: Option<config::Map<String, String>>) -> Environment {
    Environment::with_prefix("CHAT_TRADE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("exchange.fiat_assets")
        .with_list_parse_key("exchange.supported_assets")
        .source(vars)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_quote_asset() -> String {
    "BRL".to_string()
}

fn default_fiat_assets() -> Vec<String> {
    DEFAULT_FIAT_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // 1. Project defaults from config/default.{toml,json}
            .add_source(File::with_name("config/default").required(false))
            // 2. Local overrides (not checked in)
            .add_source(File::with_name("config/local").required(false))
            // 3. Environment, e.g. CHAT_TRADE__EXCHANGE__QUOTE_ASSET=BRL
            .add_source(environment(None))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.apply_fallbacks(|key| env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Plain variable names used by older deployments
    /// (`BINANCE_API_KEY`, `WHATSAPP_TOKEN`, ...). Only fill gaps.
    pub fn apply_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.exchange.api_key.is_none() {
            self.exchange.api_key = lookup("BINANCE_API_KEY");
        }
        if self.exchange.secret_key.is_none() {
            self.exchange.secret_key = lookup("BINANCE_SECRET_KEY");
        }

        if self.whatsapp.is_none() {
            if let (Some(api_url), Some(phone_id), Some(token)) = (
                lookup("WHATSAPP_API_URL"),
                lookup("WHATSAPP_PHONE_ID"),
                lookup("WHATSAPP_TOKEN"),
            ) {
                self.whatsapp = Some(WhatsAppConfig {
                    api_url,
                    phone_id,
                    token,
                    verify_token: lookup("WHATSAPP_VERIFY_TOKEN"),
                    request_timeout_secs: default_timeout_secs(),
                });
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.exchange.base_url)
            .map_err(|e| ConfigError::Message(format!("exchange.base_url is invalid: {}", e)))?;

        if self.exchange.quote_asset.trim().is_empty() {
            return Err(ConfigError::Message("exchange.quote_asset must not be empty".into()));
        }
        if self.exchange.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "exchange.request_timeout_secs must be positive".into(),
            ));
        }
        if let Some(wa) = &self.whatsapp {
            Url::parse(&wa.api_url)
                .map_err(|e| ConfigError::Message(format!("whatsapp.api_url is invalid: {}", e)))?;
        }
        Ok(())
    }

    pub fn credential_provider(&self) -> StaticCredentialProvider {
        let default = match (&self.exchange.api_key, &self.exchange.secret_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(key.clone(), secret.clone()))
            }
            _ => None,
        };
        let accounts = self
            .accounts
            .iter()
            .map(|(id, acct)| {
                (
                    id.clone(),
                    Credentials::new(acct.api_key.clone(), acct.secret_key.clone()),
                )
            })
            .collect();

        StaticCredentialProvider::new(default, accounts)
    }
}
