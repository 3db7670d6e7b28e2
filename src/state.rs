// State management for plaud-mirror

use anyhow::{Context, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::database::{DatabaseManager, SyncSettings};
use crate::notify::{AutoTranscribeListener, LoggingNotifier};
use crate::plaud::{CatalogConnector, HttpCatalogConnector, RemoteCatalog, RetryPolicy};
use crate::providers::{HttpProviderFactory, ProviderFactory, ProviderGateway};
use crate::sync::{
    Clock, ReconciliationEngine, SchedulerHandle, SyncDispatch, SyncScheduler, SyncTrigger, SystemClock,
};
use crate::transcription::{BackfillSweeper, JobManager};

/// Everything the pipeline shares across users
pub struct AppState {
    db: Arc<DatabaseManager>,
    connector: Arc<dyn CatalogConnector>,
    gateway: Arc<ProviderGateway>,
    engine: Arc<ReconciliationEngine>,
    jobs: JobManager,
    sweeper: Arc<BackfillSweeper>,
    clock: Arc<dyn Clock>,
    /// Running scheduler per user id
    schedulers: DashMap<String, SchedulerHandle>,
}

impl AppState {
    /// Production wiring: HTTP catalog, HTTP providers, wall clock
    pub fn new(db: DatabaseManager, audio_dir: Option<PathBuf>) -> Self {
        Self::with_parts(
            Arc::new(db),
            Arc::new(HttpCatalogConnector::new(RetryPolicy::default())),
            Arc::new(HttpProviderFactory),
            Arc::new(SystemClock),
            audio_dir,
        )
    }

    pub fn with_parts(
        db: Arc<DatabaseManager>,
        connector: Arc<dyn CatalogConnector>,
        factory: Arc<dyn ProviderFactory>,
        clock: Arc<dyn Clock>,
        audio_dir: Option<PathBuf>,
    ) -> Self {
        let gateway = Arc::new(ProviderGateway::new(db.clone(), factory));
        let jobs = JobManager::new(db.clone(), gateway.clone(), connector.clone()).with_audio_dir(audio_dir);
        let sweeper = Arc::new(BackfillSweeper::new(db.clone(), jobs.clone()));
        let engine = Arc::new(ReconciliationEngine::new(db.clone()));

        Self {
            db,
            connector,
            gateway,
            engine,
            jobs,
            sweeper,
            clock,
            schedulers: DashMap::new(),
        }
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn db_arc(&self) -> Arc<DatabaseManager> {
        self.db.clone()
    }

    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    pub fn sweeper(&self) -> Arc<BackfillSweeper> {
        self.sweeper.clone()
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Remote catalog for a user's stored Plaud connection
    pub fn catalog_for(&self, user_id: &str) -> Result<Arc<dyn RemoteCatalog>> {
        let connection = self
            .db
            .get_plaud_connection(user_id)?
            .context("No Plaud account connected for this user")?;
        let catalog = self.connector.connect(&connection)?;
        Ok(catalog)
    }

    /// The user's scheduler, started on first use and restarted if its loop died
    pub fn scheduler(&self, user_id: &str) -> Result<SchedulerHandle> {
        let entry = match self.schedulers.entry(user_id.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_stopped() => return Ok(entry.get().clone()),
            entry => entry,
        };
        if matches!(entry, Entry::Occupied(_)) {
            log::warn!("Scheduler for user {} had stopped, starting a new one", user_id);
        }

        let connection = self
            .db
            .get_plaud_connection(user_id)?
            .context("No Plaud account connected for this user")?;
        let catalog = self.connector.connect(&connection)?;
        let settings = self.db.load_sync_settings(user_id)?;

        let (scheduler, handle) = SyncScheduler::new(
            user_id,
            self.engine.clone(),
            catalog,
            settings,
            self.clock.clone(),
        );
        let mut scheduler = scheduler.with_device(connection.device_sn.clone());
        scheduler.add_listener(Arc::new(LoggingNotifier));
        scheduler.add_listener(Arc::new(AutoTranscribeListener::new(self.sweeper.clone())));

        tokio::spawn(scheduler.run());
        entry.insert(handle.clone());
        log::info!("Scheduler registered for user {}", user_id);
        Ok(handle)
    }

    /// Run a manual sync through the user's scheduler
    pub async fn sync_now(&self, user_id: &str) -> Result<SyncDispatch> {
        let handle = self.scheduler(user_id)?;
        Ok(handle.request_sync(SyncTrigger::Manual).await)
    }

    /// Persist new settings and hand them to a running scheduler
    pub async fn update_sync_settings(&self, user_id: &str, settings: SyncSettings) -> Result<()> {
        self.db.save_sync_settings(user_id, &settings)?;
        let handle = self.schedulers.get(user_id).map(|h| h.clone());
        if let Some(handle) = handle {
            handle.update_settings(settings).await;
        }
        Ok(())
    }

    /// Stop every scheduler and cancel running transcriptions
    pub fn shutdown(&self) {
        for entry in self.schedulers.iter() {
            entry.value().shutdown();
        }
        self.schedulers.clear();
        self.jobs.cancel_all();
        log::info!("Pipeline shut down");
    }
}
