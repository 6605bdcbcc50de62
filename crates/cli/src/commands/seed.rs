use sara_core::config::{AppConfig, LoadOptions};
use sara_core::domain::knowledge::KnowledgeBaseDraft;
use sara_db::{
    connect_with_settings, migrations, KnowledgeBaseRepository, SqlKnowledgeBaseRepository,
};

use crate::commands::{block_on, CommandResult};

/// Deterministic starter FAQ set for local runs and demos.
fn fixtures() -> Vec<KnowledgeBaseDraft> {
    let entry = |question: &str, answer: &str, keywords: &[&str], category: &str| {
        KnowledgeBaseDraft {
            question: question.to_owned(),
            answer: answer.to_owned(),
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            category: category.to_owned(),
            is_active: true,
        }
    };

    vec![
        entry(
            "What are your business hours?",
            "We are open 9am to 5pm, Monday through Friday.",
            &["hours", "open", "schedule"],
            "logistics",
        ),
        entry(
            "Where are you located?",
            "We are at 120 Main Street, two blocks from the station.",
            &["location", "address", "directions"],
            "logistics",
        ),
        entry(
            "How do I book an appointment?",
            "Just tell me a date and time that suits you and I will check availability.",
            &["book", "appointment", "schedule"],
            "appointments",
        ),
        entry(
            "What is your cancellation policy?",
            "Appointments can be cancelled free of charge up to 24 hours in advance.",
            &["cancel", "cancellation", "policy"],
            "appointments",
        ),
    ]
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    run_with_config(&config)
}

pub fn run_with_config(config: &AppConfig) -> CommandResult {
    let result = match block_on("seed", apply(config)) {
        Ok(result) => result,
        Err(failure) => return failure,
    };

    match result {
        Ok(inserted) if inserted == 0 => {
            CommandResult::success("seed", "knowledge base already seeded, nothing to do")
        }
        Ok(inserted) => {
            CommandResult::success("seed", format!("inserted {inserted} faq fixtures"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

async fn apply(config: &AppConfig) -> Result<usize, (&'static str, String, u8)> {
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

    let repo = SqlKnowledgeBaseRepository::new(pool.clone());
    let existing = repo
        .all_entries()
        .await
        .map_err(|error| ("seed_read", error.to_string(), 6u8))?;

    // Seeding is idempotent: a non-empty knowledge base is left untouched.
    if !existing.is_empty() {
        pool.close().await;
        return Ok(0);
    }

    let mut inserted = 0;
    for draft in fixtures() {
        repo.create(&draft)
            .await
            .map_err(|error| ("seed_write", error.to_string(), 6u8))?;
        inserted += 1;
    }

    pool.close().await;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use sara_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::run_with_config;

    fn memory_config() -> AppConfig {
        AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config")
    }

    #[test]
    fn seed_inserts_fixtures_once() {
        let config = memory_config();

        let first = run_with_config(&config);
        assert_eq!(first.exit_code, 0, "unexpected output: {}", first.output);
        assert!(first.output.contains("inserted"));
    }
}
