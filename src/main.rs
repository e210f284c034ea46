use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::migrate::Migrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pesagate_core::adapters::postgres::{
    PostgresAccountStore, PostgresDraftStore, PostgresTransactionStore,
};
use pesagate_core::cli::{Cli, Commands, TxCommands, DbCommands};
use pesagate_core::config::Config;
use pesagate_core::daraja::DarajaClient;
use pesagate_core::domain::TxStatus;
use pesagate_core::ports::{AccountStore, DraftStore, TransactionStore};
use pesagate_core::services::payments::PaymentInitiator;
use pesagate_core::services::registration::RegistrationCoordinator;
use pesagate_core::services::sweeper::run_sweeper;
use pesagate_core::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Tx(TxCommands::Complete { tx_id }) => {
            pesagate_core::cli::handle_tx_resolve(&config, tx_id, TxStatus::Completed).await
        }
        Commands::Tx(TxCommands::Fail { tx_id }) => {
            pesagate_core::cli::handle_tx_resolve(&config, tx_id, TxStatus::Failed).await
        }
        Commands::Db(DbCommands::Migrate) => pesagate_core::cli::handle_db_migrate(&config).await,
        Commands::Poll {
            tx_id,
            interval_ms,
            max_attempts,
        } => pesagate_core::cli::handle_poll(&config, tx_id, interval_ms, max_attempts).await,
        Commands::Config => pesagate_core::cli::handle_config_validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Database pool + migrations
    let pool = pesagate_core::db::create_pool(&config).await?;
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("database migrations completed");

    // Stores
    let transactions: Arc<dyn TransactionStore> =
        Arc::new(PostgresTransactionStore::new(pool.clone()));
    let drafts: Arc<dyn DraftStore> = Arc::new(PostgresDraftStore::new(pool.clone()));
    let accounts: Arc<dyn AccountStore> = Arc::new(PostgresAccountStore::new(pool.clone()));

    // Gateway client
    let gateway = Arc::new(DarajaClient::new(
        config.daraja_base_url.clone(),
        config.daraja_api_key.clone(),
    ));
    tracing::info!("gateway client initialized for {}", config.daraja_base_url);

    // Services
    let payments = Arc::new(PaymentInitiator::new(
        transactions.clone(),
        gateway,
        config.country_code.clone(),
    ));
    let registration = Arc::new(RegistrationCoordinator::new(
        payments.clone(),
        transactions.clone(),
        drafts.clone(),
        accounts,
        config.session_secret.clone(),
        config.registration_fee.clone(),
        config.draft_retention_hours,
    ));

    // Background draft retention sweep
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    tokio::spawn(run_sweeper(drafts, sweep_interval));

    let state = AppState {
        config: config.clone(),
        pool: Some(pool),
        transactions,
        payments,
        registration,
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
