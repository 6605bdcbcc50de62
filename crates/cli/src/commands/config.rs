use sara_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config),
        Err(error) => serde_json::json!({
            "command": "config",
            "status": "error",
            "message": format!("configuration issue: {error}"),
        })
        .to_string(),
    }
}

fn redact_secret(present: bool) -> &'static str {
    if present {
        "<set>"
    } else {
        "<unset>"
    }
}

fn redact_value(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "<unset>".to_owned())
}

pub fn render(config: &AppConfig) -> String {
    serde_json::json!({
        "command": "config",
        "status": "ok",
        "effective": {
            "database": {
                "url": &config.database.url,
                "max_connections": config.database.max_connections,
                "timeout_secs": config.database.timeout_secs,
            },
            "llm": {
                "api_key": redact_secret(config.llm.api_key.is_some()),
                "base_url": &config.llm.base_url,
                "model": &config.llm.model,
                "timeout_secs": config.llm.timeout_secs,
            },
            "twilio": {
                "account_sid": redact_value(&config.twilio.account_sid),
                "auth_token": redact_secret(config.twilio.auth_token.is_some()),
                "phone_number": redact_value(&config.twilio.phone_number),
            },
            "whatsapp": {
                "access_token": redact_secret(config.whatsapp.access_token.is_some()),
                "phone_number_id": redact_value(&config.whatsapp.phone_number_id),
                "verify_token": redact_secret(config.whatsapp.verify_token.is_some()),
            },
            "calendar": {
                "calendar_id": redact_value(&config.calendar.calendar_id),
                "access_token": redact_secret(config.calendar.access_token.is_some()),
                "base_url": &config.calendar.base_url,
            },
            "business": {
                "name": &config.business.name,
                "timezone": &config.business.timezone,
                "day_start_hour": config.business.day_start_hour,
                "day_end_hour": config.business.day_end_hour,
            },
            "server": {
                "bind_address": &config.server.bind_address,
                "port": config.server.port,
            },
            "pipeline": {
                "classifier_timeout_secs": config.pipeline.classifier_timeout_secs,
                "scheduler_timeout_secs": config.pipeline.scheduler_timeout_secs,
                "generator_timeout_secs": config.pipeline.generator_timeout_secs,
                "send_timeout_secs": config.pipeline.send_timeout_secs,
                "delivery_failure_policy": config.pipeline.delivery_failure_policy,
                "idempotency_cache_capacity": config.pipeline.idempotency_cache_capacity,
            },
            "logging": {
                "level": &config.logging.level,
                "format": config.logging.format,
            },
        },
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use sara_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::render;

    #[test]
    fn secrets_never_appear_in_the_rendered_output() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                llm_api_key: Some("sk-super-secret".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config");

        let rendered = render(&config);
        assert!(!rendered.contains("sk-super-secret"));

        let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("json");
        assert_eq!(parsed["effective"]["llm"]["api_key"], "<set>");
        assert_eq!(parsed["effective"]["twilio"]["auth_token"], "<unset>");
    }
}
