pub mod models;
pub mod test_utils;

use common::config::AppConfig;
use sea_orm::{Database, DatabaseConnection};

/// Connects to the application database.
///
/// `DATABASE_PATH` may be a full DSN (anything containing `://`) or a plain
/// filesystem path, in which case it is wrapped in a `sqlite://...?mode=rwc`
/// URL so the file is created on first use.
pub async fn connect() -> DatabaseConnection {
    let path = &AppConfig::global().database_path;
    let url = if path.contains("://") {
        path.clone()
    } else {
        format!("sqlite://{}?mode=rwc", path)
    };

    match Database::connect(&url).await {
        Ok(conn) => {
            log::info!("Connected to database at {}", url);
            conn
        }
        Err(e) => {
            log::error!("Failed to connect to {}: {}", url, e);
            panic!("Database connection failed");
        }
    }
}
