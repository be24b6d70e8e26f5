use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Connect to the catalog database and bring its schema up to date with the entities.
///
/// Accepts both `sqlite://` and `postgres://` URLs.
pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // SQLite serializes writers; a large pool only adds lock contention.
    let max_connections = if db_url.starts_with("sqlite:") { 4 } else { 20 };
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;
    info!(backend = ?db.get_database_backend(), "Catalog schema in sync");

    Ok(db)
}
