use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::assessments::store::{AssessmentStore, PgAssessmentStore, PostgrestAssessmentStore};
use crate::config::SuggestionConfig;

/// Creates a PostgreSQL pool that connects on first use, so startup never blocks on the store.
pub fn create_pool(database_url: &str, password: &str) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)
        .context("STORE_URL is not a valid PostgreSQL connection string")?
        .password(password);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy_with(options);

    info!("PostgreSQL connection pool configured (lazy)");
    Ok(pool)
}

/// Picks the assessment store backend from the shape of `STORE_URL`.
///
/// `postgres://` goes straight to the database; anything else is treated as a
/// PostgREST base URL. Without a URL the PostgREST store is built empty and every
/// caller is refused by the configuration check before reaching it.
pub fn create_store(
    config: &SuggestionConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn AssessmentStore>> {
    let url = config.store_url.as_deref().unwrap_or_default();
    let key = config.store_key.as_deref().unwrap_or_default();

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let pool = create_pool(url, key)?;
        return Ok(Arc::new(PgAssessmentStore::new(pool)));
    }

    if url.is_empty() {
        warn!("STORE_URL is not set; assessment requests will be refused");
    } else {
        info!("Using PostgREST assessment store at {url}");
    }
    Ok(Arc::new(PostgrestAssessmentStore::new(http, url, key)))
}
