use anyhow::Context;
use std::sync::Arc;

use quizdesk_server::auth::StaticTokenResolver;
use quizdesk_server::config::Config;
use quizdesk_server::store::{PgStudentStore, StudentStore};
use quizdesk_server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env().context("failed to load configuration")?;

    let store = PgStudentStore::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(store.pool())
            .await
            .context("failed to run migrations")?;
    }

    if config.api_tokens.is_empty() {
        log::warn!("QUIZDESK_API_TOKENS is empty, every request will be rejected");
    }
    let store: Arc<dyn StudentStore> = Arc::new(store);
    let resolver = Arc::new(StaticTokenResolver::new(config.api_tokens.clone()));
    let state = Arc::new(AppState::new(
        store,
        resolver,
        config.renewal_trigger,
        config.request_timeout,
    ));
    log::info!(
        "Renewals are {:?}-driven, request deadline {:?}",
        config.renewal_trigger,
        config.request_timeout
    );

    let app = quizdesk_server::app(state);
    log::info!("Starting QuizDesk HTTP Server on http://{}", config.bind);
    axum::Server::bind(&config.bind)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
