use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use sara_calendar::{GoogleCalendarScheduler, InMemoryScheduler};
use sara_channels::{
    ChannelRegistry, MetaWhatsAppSender, NoopSender, SmsChannel, TwilioSender, VoiceChannel,
    WhatsAppChannel,
};
use sara_core::config::{AppConfig, ConfigError, LoadOptions};
use sara_core::contracts::{IntentClassifier, ReplySender, ResponseGenerator, SchedulerAdapter};
use sara_db::{
    connect_with_settings, migrations, DbPool, InteractionRepository, KnowledgeBaseRepository,
    SqlInteractionRepository, SqlKnowledgeBaseRepository,
};
use sara_nlu::{
    OpenAiClient, OpenAiIntentClassifier, OpenAiResponseGenerator, StaticResponseGenerator,
    UnconfiguredClassifier,
};
use sara_pipeline::{Dispatcher, DispatcherConfig, TracingAuditSink};

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("integration setup failed: {0}")]
    Integration(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let interactions: Arc<dyn InteractionRepository> =
        Arc::new(SqlInteractionRepository::new(db_pool.clone()));
    let knowledge = Arc::new(SqlKnowledgeBaseRepository::new(db_pool.clone()));

    let (classifier, generator) = build_nlu(&config, knowledge.clone())?;
    let scheduler = build_scheduler(&config)?;
    let registry = Arc::new(build_channels(&config)?);

    let dispatcher = Arc::new(Dispatcher::new(
        interactions.clone(),
        classifier,
        generator,
        scheduler,
        registry.clone() as Arc<dyn ReplySender>,
        Arc::new(TracingAuditSink),
        DispatcherConfig::from(&config.pipeline),
    ));

    let state = AppState {
        dispatcher,
        registry,
        interactions,
        knowledge: knowledge as Arc<dyn KnowledgeBaseRepository>,
        db_pool: db_pool.clone(),
        whatsapp_verify_token: config.whatsapp.verify_token.clone(),
    };

    Ok(Application { config, db_pool, state })
}

fn build_nlu(
    config: &AppConfig,
    knowledge: Arc<SqlKnowledgeBaseRepository>,
) -> Result<(Arc<dyn IntentClassifier>, Arc<dyn ResponseGenerator>), BootstrapError> {
    let Some(api_key) = &config.llm.api_key else {
        info!(
            event_name = "system.bootstrap.nlu_mode",
            mode = "static",
            "no llm api key configured; using static replies and unknown-intent classification"
        );
        return Ok((
            Arc::new(UnconfiguredClassifier),
            Arc::new(StaticResponseGenerator::new(knowledge)),
        ));
    };

    let client = Arc::new(
        OpenAiClient::new(
            config.llm.base_url.clone(),
            api_key.expose_secret().to_owned().into(),
            config.llm.model.clone(),
            config.llm.timeout_secs,
            config.llm.max_tokens,
            config.llm.temperature,
        )
        .map_err(|error| BootstrapError::Integration(error.to_string()))?,
    );
    info!(event_name = "system.bootstrap.nlu_mode", mode = "openai", "llm-backed nlu configured");

    Ok((
        Arc::new(OpenAiIntentClassifier::new(client.clone(), config.business.name.clone())),
        Arc::new(OpenAiResponseGenerator::new(
            client,
            knowledge,
            config.business.name.clone(),
        )),
    ))
}

fn build_scheduler(config: &AppConfig) -> Result<Arc<dyn SchedulerAdapter>, BootstrapError> {
    match (&config.calendar.calendar_id, &config.calendar.access_token) {
        (Some(calendar_id), Some(access_token)) => {
            info!(
                event_name = "system.bootstrap.scheduler_mode",
                mode = "google",
                "google calendar scheduler configured"
            );
            let scheduler = GoogleCalendarScheduler::new(
                config.calendar.base_url.clone(),
                calendar_id.clone(),
                access_token.expose_secret().to_owned().into(),
                config.pipeline.scheduler_timeout_secs,
            )
            .map_err(|error| BootstrapError::Integration(error.to_string()))?;
            Ok(Arc::new(scheduler))
        }
        _ => {
            info!(
                event_name = "system.bootstrap.scheduler_mode",
                mode = "in_memory",
                "calendar credentials absent; using in-memory scheduler"
            );
            Ok(Arc::new(InMemoryScheduler::new()))
        }
    }
}

fn build_channels(config: &AppConfig) -> Result<ChannelRegistry, BootstrapError> {
    let mut registry = ChannelRegistry::new();
    registry.register(Arc::new(VoiceChannel::new()));

    let sms_sender: Arc<dyn ReplySender> = match (
        &config.twilio.account_sid,
        &config.twilio.auth_token,
        &config.twilio.phone_number,
    ) {
        (Some(account_sid), Some(auth_token), Some(phone_number)) => Arc::new(
            TwilioSender::new(
                "https://api.twilio.com",
                account_sid.clone(),
                auth_token.expose_secret().to_owned().into(),
                phone_number.clone(),
                config.pipeline.send_timeout_secs,
            )
            .map_err(|error| BootstrapError::Integration(error.to_string()))?,
        ),
        _ => Arc::new(NoopSender::new("sms")),
    };
    registry.register(Arc::new(SmsChannel::new(sms_sender)));

    let whatsapp_sender: Arc<dyn ReplySender> =
        match (&config.whatsapp.access_token, &config.whatsapp.phone_number_id) {
            (Some(access_token), Some(phone_number_id)) => Arc::new(
                MetaWhatsAppSender::new(
                    "https://graph.facebook.com/v18.0",
                    phone_number_id.clone(),
                    access_token.expose_secret().to_owned().into(),
                    config.pipeline.send_timeout_secs,
                )
                .map_err(|error| BootstrapError::Integration(error.to_string()))?,
            ),
            _ => Arc::new(NoopSender::new("whatsapp")),
        };
    registry.register(Arc::new(WhatsAppChannel::new(whatsapp_sender)));

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use sara_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_runs_migrations_and_wires_all_channels() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('interaction', 'knowledge_base')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count baseline tables");
        assert_eq!(table_count, 2, "bootstrap should create the baseline tables");

        assert_eq!(app.state.registry.adapter_count(), 3);
        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_database_urls() {
        let options = LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/sara.toml")),
            overrides: ConfigOverrides {
                database_url: Some("mysql://nope".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };

        let result = bootstrap(options).await;
        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }
}
