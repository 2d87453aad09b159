use std::sync::Arc;

use storage::repository::Storage;
use storage::seed::{SeedReport, seed_demo};

use crate::Clock;
use crate::error::AppServicesError;
use crate::hierarchy_service::HierarchyService;
use crate::practice::{PracticeConfig, PracticeSessionService};

/// Assembles the services the HTTP layer hands to its handlers.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    practice: Arc<PracticeSessionService>,
    hierarchy: Arc<HierarchyService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: PracticeConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, config))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, config: PracticeConfig) -> Self {
        let practice = Arc::new(
            PracticeSessionService::new(
                clock,
                Arc::clone(&storage.questions),
                Arc::clone(&storage.sessions),
            )
            .with_config(config),
        );
        let hierarchy = Arc::new(HierarchyService::new(Arc::clone(&storage.hierarchy)));

        Self {
            storage,
            practice,
            hierarchy,
        }
    }

    /// Load the demo question bank into the backing store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if any write fails.
    pub async fn seed_demo(&self, per_format: usize) -> Result<SeedReport, AppServicesError> {
        Ok(seed_demo(&self.storage, per_format).await?)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeSessionService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn hierarchy(&self) -> Arc<HierarchyService> {
        Arc::clone(&self.hierarchy)
    }
}
