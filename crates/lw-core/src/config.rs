use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Session-pool maintenance cadence.
pub const DEFAULT_RELOAD_INTERVAL_SECS: u64 = 6 * 3600;
pub const MAINTENANCE_TICK_SECS: u64 = 60;

/// Tariff checker cadence and de-duplication window.
pub const TARIFF_CHECK_INTERVAL_SECS: u64 = 30 * 60;
pub const TARIFF_DEDUP_WINDOW_SECS: i64 = 24 * 3600;

/// Processor caches and concurrency.
pub const PROJECT_CHAT_CACHE_TTL_SECS: i64 = 60;
pub const TARIFF_CACHE_TTL_SECS: i64 = 600;
pub const DELIVERY_CONCURRENCY: usize = 10;
pub const DELIVERY_MAX_RETRIES: u32 = 3;
pub const DELIVERY_BACKOFF_BASE_SECS: u64 = 1;
pub const KEYWORD_WORKER_COUNT: usize = 20;
pub const SNIPPET_WINDOW_CHARS: usize = 184;

/// History extractor concurrency.
pub const HISTORY_PAGE_SIZE: u32 = 100;
pub const HISTORY_PAGE_CONCURRENCY: usize = 3;
pub const HISTORY_MESSAGE_WORKERS: usize = 5;
pub const HISTORY_PROGRESS_STEP_PCT: u32 = 5;

/// Shutdown deadlines.
pub const SESSION_DISCONNECT_TIMEOUT_MS: u64 = 2_000;
pub const MAINTENANCE_CANCEL_TIMEOUT_MS: u64 = 2_000;

/// The authoritative set of hot-writable parameters.
///
/// This replaces the source's dynamically-synthesised `ParametersManager`
/// attributes with an explicit, typed, fail-closed struct (REDESIGN FLAG:
/// "Dynamic typed parameters").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    pub bot_token: String,
    pub shop_id: String,
    pub secret_word_1: String,
    pub secret_word_2: String,
    pub yookassa_provider_token: String,
    #[serde(default = "default_free_comments_limit")]
    pub free_comments_limit: i64,
    #[serde(default = "default_parse_comments_cost")]
    pub parse_comments_cost: i64,
    #[serde(default = "default_history_parse_cost")]
    pub history_parse_cost: i64,
    pub support_link: String,
    #[serde(default)]
    pub required_channels: String,
}

fn default_free_comments_limit() -> i64 {
    3
}
fn default_parse_comments_cost() -> i64 {
    10
}
fn default_history_parse_cost() -> i64 {
    50
}

impl Parameters {
    /// Comma-separated `required_channels`, trimmed, empty entries dropped.
    pub fn required_channel_list(&self) -> Vec<String> {
        self.required_channels
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Coerce `value` to the type of the named field and apply it.
    ///
    /// Type coercion uses the type of the *current* value, per spec §4.7.
    /// Unknown keys are rejected rather than silently accepted.
    pub fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        use serde_json::Value;
        macro_rules! set_string {
            ($field:ident) => {{
                let s = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.$field = s;
                return Ok(());
            }};
        }
        macro_rules! set_int {
            ($field:ident) => {{
                let n = value
                    .as_i64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                    .ok_or_else(|| {
                        CoreError::Config(format!("{key} expects an integer, got {value}"))
                    })?;
                self.$field = n;
                return Ok(());
            }};
        }
        match key {
            "bot_token" => set_string!(bot_token),
            "shop_id" => set_string!(shop_id),
            "secret_word_1" => set_string!(secret_word_1),
            "secret_word_2" => set_string!(secret_word_2),
            "yookassa_provider_token" => set_string!(yookassa_provider_token),
            "support_link" => set_string!(support_link),
            "required_channels" => set_string!(required_channels),
            "free_comments_limit" => set_int!(free_comments_limit),
            "parse_comments_cost" => set_int!(parse_comments_cost),
            "history_parse_cost" => set_int!(history_parse_cost),
            other => Err(CoreError::Config(format!("unrecognised parameter key: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "leadwatch.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPoolConfig {
    #[serde(default = "default_realtime_dir")]
    pub realtime_dir: String,
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
}

impl Default for SessionPoolConfig {
    fn default() -> Self {
        Self {
            realtime_dir: default_realtime_dir(),
            history_dir: default_history_dir(),
        }
    }
}

fn default_realtime_dir() -> String {
    "client/sessions/realtime".to_string()
}
fn default_history_dir() -> String {
    "client/sessions/history".to_string()
}

/// Top-level configuration loaded once at boot.
///
/// `parameters` is the hot-writable surface; the rest are
/// operational knobs with spec-mandated defaults, overridable only via
/// `LEADWATCH_`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadWatchConfig {
    pub parameters: Parameters,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub sessions: SessionPoolConfig,
}

impl LeadWatchConfig {
    /// Load from a YAML file with `LEADWATCH_*` environment overrides.
    ///
    /// `ConfigMissing` on any required field that the file does not supply —
    /// configuration failures are fatal at boot.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigMissing(path.display().to_string()));
        }
        let config: LeadWatchConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("LEADWATCH_").split("__"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Re-serialise the whole struct back to `path` (spec §4.7: writes update
    /// both memory and the file).
    pub fn save(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct OnDisk<'a> {
            parameters: &'a Parameters,
        }
        let doc = OnDisk {
            parameters: &self.parameters,
        };
        let yaml = serde_yaml::to_string(&doc)
            .map_err(|e| CoreError::Config(format!("failed to render yaml: {e}")))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("config/parameters.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Parameters {
        Parameters {
            bot_token: "t".into(),
            shop_id: "1".into(),
            secret_word_1: "s1".into(),
            secret_word_2: "s2".into(),
            yookassa_provider_token: "yk".into(),
            free_comments_limit: 3,
            parse_comments_cost: 10,
            history_parse_cost: 50,
            support_link: "https://support".into(),
            required_channels: " @a , @b ,,".into(),
        }
    }

    #[test]
    fn required_channel_list_trims_and_drops_empty() {
        let p = sample();
        assert_eq!(p.required_channel_list(), vec!["@a", "@b"]);
    }

    #[test]
    fn set_coerces_to_existing_field_type() {
        let mut p = sample();
        p.set("free_comments_limit", serde_json::json!(7)).unwrap();
        assert_eq!(p.free_comments_limit, 7);

        p.set("support_link", serde_json::json!("https://new")).unwrap();
        assert_eq!(p.support_link, "https://new");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut p = sample();
        assert!(p.set("not_a_real_key", serde_json::json!(1)).is_err());
    }

    #[test]
    fn set_rejects_wrong_type_for_int_field() {
        let mut p = sample();
        assert!(p
            .set("parse_comments_cost", serde_json::json!("not a number"))
            .is_err());
    }

    #[test]
    fn load_missing_file_is_config_missing() {
        let err = LeadWatchConfig::load(Path::new("/nonexistent/parameters.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigMissing(_)));
    }

    #[test]
    fn load_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parameters.yaml");
        std::fs::write(
            &path,
            "parameters:\n  bot_token: tok\n  shop_id: \"1\"\n  secret_word_1: a\n  secret_word_2: b\n  yookassa_provider_token: c\n  support_link: https://s\n  required_channels: \"@x\"\n",
        )
        .unwrap();

        let mut cfg = LeadWatchConfig::load(&path).unwrap();
        assert_eq!(cfg.parameters.bot_token, "tok");
        assert_eq!(cfg.parameters.free_comments_limit, 3);

        cfg.parameters.set("free_comments_limit", serde_json::json!(9)).unwrap();
        cfg.save(&path).unwrap();

        let reloaded = LeadWatchConfig::load(&path).unwrap();
        assert_eq!(reloaded.parameters.free_comments_limit, 9);
    }
}
