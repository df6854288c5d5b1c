use crate::entities::videos;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://videos.db?mode=rwc";

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Creates the schema from the entity definitions if it is missing.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🔄 Running SeaORM auto-migrations...");
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let table = schema
        .create_table_from_entity(videos::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&table)).await?;

    db.execute(sea_orm::Statement::from_string(
        builder,
        "CREATE INDEX IF NOT EXISTS idx_videos_user_id ON videos(user_id);".to_string(),
    ))
    .await?;

    Ok(())
}
