use lending_library::{
    adapters::logging::LoggingNotificationService,
    adapters::memory::{InMemoryBookRepository, InMemoryLoanRepository},
    adapters::postgres::{PostgresBookRepository, PostgresLoanRepository},
    api::{handlers::AppState, router::create_router},
    application::ServiceDependencies,
    config::{AppConfig, StorageBackend},
    ports::{BookRepository, LoanRepository},
    scheduler::spawn_overdue_notifier,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lending_library=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Initialize adapters
    let (book_repository, loan_repository) = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to PostgreSQL");

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let books: Arc<dyn BookRepository> =
                Arc::new(PostgresBookRepository::new(pool.clone()));
            let loans: Arc<dyn LoanRepository> = Arc::new(PostgresLoanRepository::new(pool));
            (books, loans)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");

            let books: Arc<dyn BookRepository> = Arc::new(InMemoryBookRepository::new());
            let loans: Arc<dyn LoanRepository> = Arc::new(InMemoryLoanRepository::new());
            (books, loans)
        }
    };

    let notification_service = Arc::new(LoggingNotificationService::new(
        config.mail_from.clone(),
        config.mail_subject.clone(),
    ));

    // Create service dependencies
    let service_deps = ServiceDependencies {
        book_repository,
        loan_repository,
        notification_service,
        settings: config.service_settings(),
    };

    // Daily overdue notification
    let notifier = spawn_overdue_notifier(service_deps.clone(), config.notify_hour);

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    notifier.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
