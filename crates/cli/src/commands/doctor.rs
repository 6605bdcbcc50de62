use sara_core::config::{AppConfig, LoadOptions};
use sara_db::connect_with_settings;

use crate::commands::{block_on, CommandResult};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

pub fn run(json: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "doctor",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    run_with_config(&config, json)
}

pub fn run_with_config(config: &AppConfig, json: bool) -> CommandResult {
    let mut checks = vec![Check {
        name: "config",
        ok: true,
        detail: "configuration loaded and validated".to_owned(),
    }];

    let database = match block_on("doctor", database_check(config)) {
        Ok(check) => check,
        Err(failure) => return failure,
    };
    checks.push(database);

    checks.push(Check {
        name: "llm",
        ok: true,
        detail: if config.llm.api_key.is_some() {
            "llm api key configured".to_owned()
        } else {
            "no llm api key; static replies and unknown-intent classification".to_owned()
        },
    });
    checks.push(Check {
        name: "sms_transport",
        ok: true,
        detail: if config.twilio.account_sid.is_some() {
            "twilio configured".to_owned()
        } else {
            "twilio not configured; sms replies are logged only".to_owned()
        },
    });
    checks.push(Check {
        name: "whatsapp_transport",
        ok: true,
        detail: if config.whatsapp.access_token.is_some() {
            "meta graph api configured".to_owned()
        } else {
            "whatsapp not configured; replies are logged only".to_owned()
        },
    });
    checks.push(Check {
        name: "calendar",
        ok: true,
        detail: if config.calendar.calendar_id.is_some() {
            "google calendar configured".to_owned()
        } else {
            "calendar not configured; using in-memory scheduler".to_owned()
        },
    });

    let all_ok = checks.iter().all(|check| check.ok);
    let exit_code = if all_ok { 0 } else { 4 };
    let output = if json { render_json(&checks, all_ok) } else { render_text(&checks, all_ok) };

    CommandResult { exit_code, output }
}

async fn database_check(config: &AppConfig) -> Check {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await;

    match pool {
        Ok(pool) => {
            let probe = pool.acquire().await.map(drop);
            pool.close().await;
            match probe {
                Ok(()) => Check {
                    name: "database",
                    ok: true,
                    detail: "connected and acquired a probe connection".to_owned(),
                },
                Err(error) => Check {
                    name: "database",
                    ok: false,
                    detail: format!("probe connection failed: {error}"),
                },
            }
        }
        Err(error) => {
            Check { name: "database", ok: false, detail: format!("connection failed: {error}") }
        }
    }
}

fn render_json(checks: &[Check], all_ok: bool) -> String {
    serde_json::json!({
        "command": "doctor",
        "status": if all_ok { "ok" } else { "error" },
        "checks": checks
            .iter()
            .map(|check| {
                serde_json::json!({
                    "name": check.name,
                    "ok": check.ok,
                    "detail": &check.detail,
                })
            })
            .collect::<Vec<_>>(),
    })
    .to_string()
}

fn render_text(checks: &[Check], all_ok: bool) -> String {
    let mut lines = Vec::with_capacity(checks.len() + 1);
    for check in checks {
        let marker = if check.ok { "ok " } else { "FAIL" };
        lines.push(format!("[{marker}] {name}: {detail}", name = check.name, detail = check.detail));
    }
    lines.push(if all_ok {
        "doctor: all checks passed".to_owned()
    } else {
        "doctor: one or more checks failed".to_owned()
    });
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use sara_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::run_with_config;

    fn memory_config() -> AppConfig {
        AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config")
    }

    #[test]
    fn doctor_passes_with_an_in_memory_database() {
        let result = run_with_config(&memory_config(), false);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);
        assert!(result.output.contains("all checks passed"));
    }

    #[test]
    fn doctor_json_output_is_machine_readable() {
        let result = run_with_config(&memory_config(), true);
        let parsed: serde_json::Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(parsed["status"], "ok");
        let checks = parsed["checks"].as_array().expect("checks");
        assert!(checks.iter().any(|check| check["name"] == "database"));
    }
}
