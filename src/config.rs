use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Default generative model used for tagging, categorization and search
const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";
/// Default API root for the generative model
const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default per-request timeout for AI calls in seconds
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;
/// Default prefix of document text sent for tagging (characters)
const DEFAULT_MAX_DOCUMENT_CHARS: usize = 4000;
/// Default daemon listen address
const DEFAULT_DAEMON_ADDR: &str = "0.0.0.0:8080";

/// Environment variable consulted when `ai.api_key` is not set
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const CONFIG_FILE: &str = "config.yaml";

/// Configuration for the external AI service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiConfig {
    /// Model identifier (e.g., "gemini-1.5-flash")
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// API root, without the trailing `/models/...` part
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,

    /// API credential. Falls back to the GEMINI_API_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout for a single AI call in seconds
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_AI_MODEL.to_string(),
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
        }
    }
}

impl AiConfig {
    /// Resolve the credential: config value first, then environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
            })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// How much extracted document text is sent to the model
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_daemon_addr")]
    pub addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_DAEMON_ADDR.to_string(),
        }
    }
}

fn default_ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

fn default_ai_base_url() -> String {
    DEFAULT_AI_BASE_URL.to_string()
}

fn default_ai_timeout_secs() -> u64 {
    DEFAULT_AI_TIMEOUT_SECS
}

fn default_max_document_chars() -> usize {
    DEFAULT_MAX_DOCUMENT_CHARS
}

fn default_daemon_addr() -> String {
    DEFAULT_DAEMON_ADDR.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.ai.model.trim().is_empty() {
            bail!("ai.model must not be empty");
        }

        if !self.ai.base_url.starts_with("http://") && !self.ai.base_url.starts_with("https://") {
            bail!(
                "ai.base_url must be an http(s) url, got '{}'",
                self.ai.base_url
            );
        }

        if self.ai.timeout_secs == 0 {
            bail!("ai.timeout_secs must be greater than 0");
        }

        if self.tagging.max_document_chars == 0 {
            bail!("tagging.max_document_chars must be greater than 0");
        }

        if self.daemon.addr.parse::<std::net::SocketAddr>().is_err() {
            bail!("daemon.addr is not a socket address: '{}'", self.daemon.addr);
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }
}
