//! Shared handler state.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tasktime_core::Clock;
use tasktime_db::{Database, DbError};

use crate::auth::TokenKeys;
use crate::error::AppError;

/// State shared by every handler.
///
/// The database sits behind a mutex, so store operations run one at a time.
/// Handlers reach it through [`AppState::db`], which moves the work onto the
/// blocking pool.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    clock: Arc<dyn Clock>,
    tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(db: Database, clock: Arc<dyn Clock>, tokens: TokenKeys) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            clock,
            tokens: Arc::new(tokens),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }

    /// Runs `f` against the database on the blocking pool.
    pub async fn db<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Database) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || {
            // An aborted transaction rolls back on drop, so a poisoned
            // connection is still consistent.
            let mut db = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut db)
        })
        .await
        .map_err(|e| AppError::internal(format!("database task failed: {e}")))?;
        Ok(result?)
    }
}
