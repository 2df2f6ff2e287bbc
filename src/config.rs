//! Environment-driven configuration.

use secrecy::SecretString;

use crate::error::ConfigError;

fn require(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub phone_number_id: String,
    pub access_token: SecretString,
    pub verify_token: String,
    pub graph_version: String,
}

impl WhatsAppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            phone_number_id: require("WHATSAPP_PHONE_NUMBER_ID")?,
            access_token: SecretString::from(require("META_WHATSAPP_TOKEN")?),
            verify_token: require("META_VERIFY_TOKEN")?,
            graph_version: optional("WHATSAPP_GRAPH_VERSION", "v21.0"),
        })
    }
}

/// Classifier backend settings. Both backends are configured; the fallback
/// wrapper decides which one actually answers.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
}

impl ClassifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: SecretString::from(require("OPENAI_API_KEY")?),
            openai_model: optional("OPENAI_MODEL", "gpt-4o-mini"),
            gemini_api_key: SecretString::from(require("GEMINI_API_KEY")?),
            gemini_model: optional("GEMINI_MODEL", "gemini-2.0-flash"),
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub whatsapp: WhatsAppConfig,
    pub classifier: ClassifierConfig,
    pub sarvam_api_key: SecretString,
    pub db_path: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_raw = optional("KHATA_PORT", "3000");
        let port = port_raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "KHATA_PORT".to_string(),
                message: format!("not a port number: {port_raw}"),
            })?;

        Ok(Self {
            whatsapp: WhatsAppConfig::from_env()?,
            classifier: ClassifierConfig::from_env()?,
            sarvam_api_key: SecretString::from(require("SARVAM_API_KEY")?),
            db_path: optional("KHATA_DB_PATH", "./data/khata.db"),
            port,
        })
    }
}
