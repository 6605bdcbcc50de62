use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub twilio: TwilioConfig,
    pub whatsapp: WhatsAppConfig,
    pub calendar: CalendarConfig,
    pub business: BusinessConfig,
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<SecretString>,
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub access_token: Option<SecretString>,
    pub phone_number_id: Option<String>,
    pub verify_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub calendar_id: Option<String>,
    pub access_token: Option<SecretString>,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct BusinessConfig {
    pub name: String,
    pub timezone: String,
    pub day_start_hour: u32,
    pub day_end_hour: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub classifier_timeout_secs: u64,
    pub scheduler_timeout_secs: u64,
    pub generator_timeout_secs: u64,
    pub send_timeout_secs: u64,
    pub delivery_failure_policy: DeliveryFailurePolicy,
    pub idempotency_cache_capacity: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// What happens to a completed interaction when reply delivery fails.
/// `BestEffort` keeps the record completed and only logs the failure;
/// `FailInteraction` re-marks the record failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailurePolicy {
    #[default]
    BestEffort,
    FailInteraction,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub business_name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://sara.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4".to_string(),
                timeout_secs: 15,
                max_tokens: 1000,
                temperature: 0.7,
            },
            twilio: TwilioConfig { account_sid: None, auth_token: None, phone_number: None },
            whatsapp: WhatsAppConfig {
                access_token: None,
                phone_number_id: None,
                verify_token: None,
            },
            calendar: CalendarConfig {
                calendar_id: None,
                access_token: None,
                base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            },
            business: BusinessConfig {
                name: "Sara AI Receptionist".to_string(),
                timezone: "UTC".to_string(),
                day_start_hour: 9,
                day_end_hour: 17,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8000 },
            pipeline: PipelineConfig {
                classifier_timeout_secs: 15,
                scheduler_timeout_secs: 30,
                generator_timeout_secs: 15,
                send_timeout_secs: 15,
                delivery_failure_policy: DeliveryFailurePolicy::BestEffort,
                idempotency_cache_capacity: 1024,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for DeliveryFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "fail_interaction" => Ok(Self::FailInteraction),
            other => Err(ConfigError::Validation(format!(
                "unsupported delivery failure policy `{other}` (expected best_effort|fail_interaction)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("sara.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(twilio) = patch.twilio {
            if let Some(account_sid) = twilio.account_sid {
                self.twilio.account_sid = Some(account_sid);
            }
            if let Some(twilio_auth_token_value) = twilio.auth_token {
                self.twilio.auth_token = Some(secret_value(twilio_auth_token_value));
            }
            if let Some(phone_number) = twilio.phone_number {
                self.twilio.phone_number = Some(phone_number);
            }
        }

        if let Some(whatsapp) = patch.whatsapp {
            if let Some(whatsapp_access_token_value) = whatsapp.access_token {
                self.whatsapp.access_token = Some(secret_value(whatsapp_access_token_value));
            }
            if let Some(phone_number_id) = whatsapp.phone_number_id {
                self.whatsapp.phone_number_id = Some(phone_number_id);
            }
            if let Some(verify_token) = whatsapp.verify_token {
                self.whatsapp.verify_token = Some(verify_token);
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(calendar_id) = calendar.calendar_id {
                self.calendar.calendar_id = Some(calendar_id);
            }
            if let Some(calendar_access_token_value) = calendar.access_token {
                self.calendar.access_token = Some(secret_value(calendar_access_token_value));
            }
            if let Some(base_url) = calendar.base_url {
                self.calendar.base_url = base_url;
            }
        }

        if let Some(business) = patch.business {
            if let Some(name) = business.name {
                self.business.name = name;
            }
            if let Some(timezone) = business.timezone {
                self.business.timezone = timezone;
            }
            if let Some(day_start_hour) = business.day_start_hour {
                self.business.day_start_hour = day_start_hour;
            }
            if let Some(day_end_hour) = business.day_end_hour {
                self.business.day_end_hour = day_end_hour;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(value) = pipeline.classifier_timeout_secs {
                self.pipeline.classifier_timeout_secs = value;
            }
            if let Some(value) = pipeline.scheduler_timeout_secs {
                self.pipeline.scheduler_timeout_secs = value;
            }
            if let Some(value) = pipeline.generator_timeout_secs {
                self.pipeline.generator_timeout_secs = value;
            }
            if let Some(value) = pipeline.send_timeout_secs {
                self.pipeline.send_timeout_secs = value;
            }
            if let Some(value) = pipeline.delivery_failure_policy {
                self.pipeline.delivery_failure_policy = value;
            }
            if let Some(value) = pipeline.idempotency_cache_capacity {
                self.pipeline.idempotency_cache_capacity = value;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SARA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SARA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SARA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SARA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SARA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SARA_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SARA_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SARA_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SARA_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SARA_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SARA_TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = Some(value);
        }
        if let Some(value) = read_env("SARA_TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SARA_TWILIO_PHONE_NUMBER") {
            self.twilio.phone_number = Some(value);
        }

        if let Some(value) = read_env("SARA_WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SARA_WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = Some(value);
        }
        if let Some(value) = read_env("SARA_WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = Some(value);
        }

        if let Some(value) = read_env("SARA_CALENDAR_ID") {
            self.calendar.calendar_id = Some(value);
        }
        if let Some(value) = read_env("SARA_CALENDAR_ACCESS_TOKEN") {
            self.calendar.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SARA_CALENDAR_BASE_URL") {
            self.calendar.base_url = value;
        }

        if let Some(value) = read_env("SARA_BUSINESS_NAME") {
            self.business.name = value;
        }
        if let Some(value) = read_env("SARA_BUSINESS_TIMEZONE") {
            self.business.timezone = value;
        }

        if let Some(value) = read_env("SARA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SARA_SERVER_PORT") {
            self.server.port = parse_u16("SARA_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("SARA_PIPELINE_DELIVERY_FAILURE_POLICY") {
            self.pipeline.delivery_failure_policy = value.parse()?;
        }

        let log_level = read_env("SARA_LOGGING_LEVEL").or_else(|| read_env("SARA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("SARA_LOGGING_FORMAT").or_else(|| read_env("SARA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(business_name) = overrides.business_name {
            self.business.name = business_name;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_business(&self.business)?;
        validate_server(&self.server)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("sara.toml"), PathBuf::from("config/sara.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if llm.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be within [0.0, 2.0]".to_string(),
        ));
    }
    Ok(())
}

fn validate_business(business: &BusinessConfig) -> Result<(), ConfigError> {
    if business.name.trim().is_empty() {
        return Err(ConfigError::Validation("business.name must not be empty".to_string()));
    }
    if business.day_start_hour >= business.day_end_hour || business.day_end_hour > 24 {
        return Err(ConfigError::Validation(
            "business day window must satisfy day_start_hour < day_end_hour <= 24".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("pipeline.classifier_timeout_secs", pipeline.classifier_timeout_secs),
        ("pipeline.scheduler_timeout_secs", pipeline.scheduler_timeout_secs),
        ("pipeline.generator_timeout_secs", pipeline.generator_timeout_secs),
        ("pipeline.send_timeout_secs", pipeline.send_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{name} must be greater than zero")));
        }
    }
    if pipeline.idempotency_cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "pipeline.idempotency_cache_capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    let level = logging.level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.level must be one of trace|debug|info|warn|error, got `{}`",
            logging.level
        )));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.into() })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.into() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.into() })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    twilio: Option<TwilioPatch>,
    whatsapp: Option<WhatsAppPatch>,
    calendar: Option<CalendarPatch>,
    business: Option<BusinessPatch>,
    server: Option<ServerPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TwilioPatch {
    account_sid: Option<String>,
    auth_token: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppPatch {
    access_token: Option<String>,
    phone_number_id: Option<String>,
    verify_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarPatch {
    calendar_id: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BusinessPatch {
    name: Option<String>,
    timezone: Option<String>,
    day_start_hour: Option<u32>,
    day_end_hour: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PipelinePatch {
    classifier_timeout_secs: Option<u64>,
    scheduler_timeout_secs: Option<u64>,
    generator_timeout_secs: Option<u64>,
    send_timeout_secs: Option<u64>,
    delivery_failure_policy: Option<DeliveryFailurePolicy>,
    idempotency_cache_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{AppConfig, ConfigError, ConfigOverrides, DeliveryFailurePolicy, LoadOptions};

    fn load_defaults() -> AppConfig {
        AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/sara.toml")),
            ..LoadOptions::default()
        })
        .expect("defaults should validate")
    }

    #[test]
    fn defaults_validate_and_carry_best_effort_delivery() {
        let config = load_defaults();
        assert_eq!(config.database.url, "sqlite://sara.db");
        assert_eq!(config.pipeline.delivery_failure_policy, DeliveryFailurePolicy::BestEffort);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn overrides_take_precedence() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                business_name: Some("Test Desk".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load with overrides");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.business.name, "Test Desk");
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/sara".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/sara.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn delivery_failure_policy_parses_both_variants() {
        assert_eq!(
            "best_effort".parse::<DeliveryFailurePolicy>().expect("parse"),
            DeliveryFailurePolicy::BestEffort
        );
        assert_eq!(
            "fail_interaction".parse::<DeliveryFailurePolicy>().expect("parse"),
            DeliveryFailurePolicy::FailInteraction
        );
        assert!("retry_forever".parse::<DeliveryFailurePolicy>().is_err());
    }

    #[test]
    fn invalid_business_day_window_is_rejected() {
        let mut config = load_defaults();
        config.business.day_start_hour = 18;
        config.business.day_end_hour = 9;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
