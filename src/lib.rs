pub mod config;
pub mod console;
pub mod db;
pub mod errors;
pub mod filters;
pub mod models;
pub mod optimistic;
pub mod pagination;
pub mod seed;
pub mod service;
pub mod state;
pub mod store;
pub mod validation;

pub use crate::config::{ConsoleConfig, LatencyProfile};
pub use crate::console::Console;
pub use crate::db::SqliteStore;
pub use crate::errors::{to_client_error, AppError, AppResult};
pub use crate::filters::{filter_leads, FilterKey, LeadFilters, SortField, SortOrder};
pub use crate::models::{
    ConvertLeadRequest, Lead, LeadPatch, LeadStatus, Opportunity, OpportunityPatch, OpportunityStage,
};
pub use crate::pagination::{paginate, Page, Paginator};
pub use crate::service::{DataService, IntegrityViolation};
pub use crate::store::{KeyValueStore, MemoryStore};

use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub async fn open_console(config: &ConsoleConfig) -> AppResult<Console> {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(&config.database_path())?);
    let console = Console::open(store, config)?;
    console.load_all().await?;
    Ok(console)
}

pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "console.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
