use sara_core::config::{AppConfig, LoadOptions};
use sara_db::{connect_with_settings, migrations};

use crate::commands::{block_on, CommandResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    run_with_config(&config)
}

pub fn run_with_config(config: &AppConfig) -> CommandResult {
    let result = match block_on("migrate", apply(config)) {
        Ok(result) => result,
        Err(failure) => return failure,
    };

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

async fn apply(config: &AppConfig) -> Result<(), (&'static str, String, u8)> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sara_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::run_with_config;

    #[test]
    fn migrate_succeeds_against_an_in_memory_database() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config");

        let result = run_with_config(&config);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);
    }
}
