#[cfg(feature = "pg")]
pub mod pg;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt::Debug;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::error::Result;

/// A connected storage backend.
#[async_trait]
pub trait DatabaseDriver: Debug + Sync + Send + 'static {
    fn name(&self) -> &'static str;
    fn connection(&self) -> DatabaseConnection;
    /// Backend-specific session tuning. Run once before the schema is touched.
    async fn configure(&self) -> Result<()>;
    /// Flush whatever the backend keeps outside of the main storage.
    async fn checkpoint(&self) -> Result<()>;
}
