use std::sync::Arc;

use forkidea_core::config::{AppConfig, ConfigError, LoadOptions};
use forkidea_db::repositories::SqlIdeaRepository;
use forkidea_db::{connect_with_settings, migrations, DbPool};
use forkidea_slack::api::HttpChatApi;
use forkidea_slack::commands::CommandRouter;
use forkidea_slack::events::{
    EventDispatcher, MessageHandler, ReactionHandler, SlashCommandHandler,
};
use forkidea_slack::socket::{NoopSocketTransport, SocketModeRunner};
use forkidea_slack::submission::SubmissionService;
use forkidea_slack::votes::ReactionVoteService;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the full object graph: one pool, one repository handle, one Web API
/// client, injected into every handler. Nothing initializes lazily at call
/// time.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store = Arc::new(SqlIdeaRepository::new(db_pool.clone()));
    let api = Arc::new(HttpChatApi::new(config.slack.bot_token.clone()));

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(CommandRouter::new(store.clone()), api.clone()));
    dispatcher.register(MessageHandler::new(
        SubmissionService::new(store.clone(), api.clone(), config.bot.announce_submissions),
        api.clone(),
    ));
    dispatcher.register(ReactionHandler::new(ReactionVoteService::new(store, api)));

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        Default::default(),
    );

    Ok(Application { config, db_pool, slack_runner })
}

#[cfg(test)]
mod tests {
    use forkidea_core::config::{ConfigOverrides, LoadOptions};
    use forkidea_core::domain::idea::NewIdea;
    use forkidea_db::repositories::{IdeaRepository, SqlIdeaRepository};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_prepares_the_idea_store_end_to_end() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'ideas'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("ideas table should be available after bootstrap");
        assert_eq!(table_count, 1, "bootstrap should create the ideas table");

        let repo = SqlIdeaRepository::new(app.db_pool.clone());
        let id = repo
            .create(NewIdea {
                user_id: "U-boot".to_string(),
                user_name: "Bootstrap".to_string(),
                title: "Smoke test".to_string(),
                description: "Idea written through the bootstrapped pool".to_string(),
                submitted_at: 42,
            })
            .await
            .expect("create through bootstrapped pool");

        let found = repo.find_by_id(&id).await.expect("find").expect("idea exists");
        assert_eq!(found.title, "Smoke test");

        app.db_pool.close().await;
    }
}
