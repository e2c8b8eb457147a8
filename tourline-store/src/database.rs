use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use tourline_core::CoreError;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Adapter boundary: driver errors surface as persistence failures.
pub(crate) fn persistence(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::PersistenceFailure(err.to_string())
}

/// Column values that do not fit the domain model.
pub(crate) fn corrupt(column: &str, detail: impl std::fmt::Display) -> CoreError {
    CoreError::PersistenceFailure(format!("Invalid value in column {}: {}", column, detail))
}

pub(crate) fn to_u32(column: &str, value: i32) -> Result<u32, CoreError> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}
