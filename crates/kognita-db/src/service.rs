//! Service layer orchestrating session, assignment, and result operations.
//!
//! `KognitaService` wraps `KognitaDb` (raw database access), the session
//! tuning knobs from `kognita-config`, and the RNG that drives the
//! assignment lotteries. All repo methods are implemented as
//! `impl KognitaService` blocks in `repos/`.
//!
//! The RNG is held behind a mutex and injected at construction so tests can
//! seed it: assignment decisions become reproducible by substituting a
//! deterministic source of randomness instead of reaching for a global one.

use std::sync::{Mutex, MutexGuard, PoisonError};

use kognita_config::SessionConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::KognitaDb;
use crate::error::DatabaseError;

/// Orchestrates all Kognita state operations.
pub struct KognitaService {
    db: KognitaDb,
    config: SessionConfig,
    rng: Mutex<StdRng>,
}

impl KognitaService {
    /// Create a new service wrapping a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` — Path to the libSQL database file, or `":memory:"` for
    ///   tests.
    /// * `config` — Session tuning knobs (assignment bias, extend step,
    ///   goal caps).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, config: SessionConfig) -> Result<Self, DatabaseError> {
        let db = KognitaDb::open_local(db_path).await?;
        Ok(Self::from_db(db, config))
    }

    /// Create from an existing `KognitaDb`, seeding the RNG from entropy.
    #[must_use]
    pub fn from_db(db: KognitaDb, config: SessionConfig) -> Self {
        Self {
            db,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create with a fixed RNG seed, for deterministic assignment in tests.
    #[must_use]
    pub fn with_rng_seed(db: KognitaDb, config: SessionConfig, seed: u64) -> Self {
        Self {
            db,
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &KognitaDb {
        &self.db
    }

    /// The session tuning configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Lock the assignment RNG. Never held across an await point.
    pub(crate) fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
