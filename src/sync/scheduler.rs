//! Sync scheduler
//!
//! One loop task per user owns all scheduling state. Triggers arrive over an
//! mpsc channel from any number of [`SchedulerHandle`]s; at most one sync
//! runs at a time and triggers arriving meanwhile share its result.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use super::engine::{ReconciliationEngine, SyncResult};
use crate::database::SyncSettings;
use crate::notify::SyncListener;
use crate::plaud::RemoteCatalog;

const COMMAND_BUFFER: usize = 32;
/// The timer re-checks at least this often; a not-yet-due wake-up is a no-op
const MAX_TIMER_WAIT: Duration = Duration::from_secs(3600);

/// What asked for a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    /// A client attached (app opened, daemon started)
    Mount,
    /// A client became visible again
    Visibility,
    /// Periodic auto sync
    Timer,
    /// Explicit user request
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncTrigger::Mount => "mount",
            SyncTrigger::Visibility => "visibility",
            SyncTrigger::Timer => "timer",
            SyncTrigger::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Turned off in the sync settings
    Disabled,
    /// Too soon after the previous sync
    MinInterval,
    /// Timer fired before the next scheduled sync
    NotDue,
    ShuttingDown,
}

/// What a trigger led to
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDispatch {
    /// This trigger started the sync
    Ran(SyncResult),
    /// A sync was already running; this is its result
    Joined(SyncResult),
    /// No sync ran; `last` is the previous result, if any
    Skipped {
        reason: SkipReason,
        last: Option<SyncResult>,
    },
}

impl SyncDispatch {
    pub fn result(&self) -> Option<&SyncResult> {
        match self {
            SyncDispatch::Ran(result) | SyncDispatch::Joined(result) => Some(result),
            SyncDispatch::Skipped { last, .. } => last.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Syncing,
}

#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub next_sync_time: Option<DateTime<Utc>>,
    pub last_result: Option<SyncResult>,
}

enum Command {
    Sync {
        trigger: SyncTrigger,
        reply: Option<oneshot::Sender<SyncDispatch>>,
    },
    UpdateSettings(SyncSettings),
    Status(oneshot::Sender<SchedulerStatus>),
}

/// Cloneable front door to a running [`SyncScheduler`]
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Command>,
    shutdown: CancellationToken,
}

impl SchedulerHandle {
    /// Ask for a sync and wait for what came of it
    pub async fn request_sync(&self, trigger: SyncTrigger) -> SyncDispatch {
        let reply = self.submit(trigger).await;
        reply.await.unwrap_or(SyncDispatch::Skipped {
            reason: SkipReason::ShuttingDown,
            last: None,
        })
    }

    /// Queue a trigger and return the receiver for its outcome.
    /// Triggers are handled in the order they were submitted.
    pub async fn submit(&self, trigger: SyncTrigger) -> oneshot::Receiver<SyncDispatch> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Sync { trigger, reply: Some(tx) }).await.is_err() {
            log::debug!("Scheduler stopped, dropping {} trigger", trigger);
        }
        rx
    }

    /// Fire-and-forget trigger
    pub fn trigger(&self, trigger: SyncTrigger) {
        if let Err(e) = self.tx.try_send(Command::Sync { trigger, reply: None }) {
            log::warn!("Could not queue {} trigger: {}", trigger, e);
        }
    }

    pub async fn update_settings(&self, settings: SyncSettings) {
        if self.tx.send(Command::UpdateSettings(settings)).await.is_err() {
            log::debug!("Scheduler stopped, settings update dropped");
        }
    }

    /// Current scheduler state, or None once it has stopped
    pub async fn status(&self) -> Option<SchedulerStatus> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Command::Status(tx)).await.ok()?;
        rx.await.ok()
    }

    /// Stop the loop, cancelling an in-flight sync
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// True once the loop has exited or been told to
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled() || self.tx.is_closed()
    }
}

pub struct SyncScheduler {
    user_id: String,
    engine: Arc<ReconciliationEngine>,
    catalog: Arc<dyn RemoteCatalog>,
    device_sn: Option<String>,
    settings: SyncSettings,
    clock: Arc<dyn Clock>,
    listeners: Vec<Arc<dyn SyncListener>>,
    rx: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
    last_sync_time: Option<DateTime<Utc>>,
    next_sync_time: Option<DateTime<Utc>>,
    last_result: Option<SyncResult>,
    in_flight: Option<BoxFuture<'static, SyncResult>>,
    /// Callers waiting on the in-flight sync; `true` marks the one that started it
    waiters: Vec<(oneshot::Sender<SyncDispatch>, bool)>,
}

impl SyncScheduler {
    pub fn new(
        user_id: impl Into<String>,
        engine: Arc<ReconciliationEngine>,
        catalog: Arc<dyn RemoteCatalog>,
        settings: SyncSettings,
        clock: Arc<dyn Clock>,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let shutdown = CancellationToken::new();

        let scheduler = Self {
            user_id: user_id.into(),
            engine,
            catalog,
            device_sn: None,
            settings,
            clock,
            listeners: Vec::new(),
            rx,
            shutdown: shutdown.clone(),
            last_sync_time: None,
            next_sync_time: None,
            last_result: None,
            in_flight: None,
            waiters: Vec::new(),
        };

        (scheduler, SchedulerHandle { tx, shutdown })
    }

    /// Only reconcile recordings from this device
    pub fn with_device(mut self, device_sn: Option<String>) -> Self {
        self.device_sn = device_sn;
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn SyncListener>) {
        self.listeners.push(listener);
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        log::info!(
            "Sync scheduler started for user {} (interval {} ms, auto sync {})",
            self.user_id,
            self.settings.sync_interval_ms,
            self.settings.auto_sync_enabled
        );

        let shutdown = self.shutdown.clone();
        let mut inbox_open = true;
        self.next_sync_time = Some(after(self.clock.now(), self.settings.sync_interval_ms));

        loop {
            let syncing = self.in_flight.is_some();
            let timer_armed = self.settings.auto_sync_enabled && !syncing;
            let timer_wait = self.timer_wait();

            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = self.rx.recv(), if inbox_open => match command {
                    Some(command) => self.handle_command(command),
                    None => inbox_open = false,
                },
                result = next_completion(&mut self.in_flight), if syncing => self.finish(result),
                _ = sleep(timer_wait), if timer_armed => self.handle_trigger(SyncTrigger::Timer, None),
            }

            if !inbox_open && self.in_flight.is_none() {
                break;
            }
        }

        if let Some(in_flight) = self.in_flight.take() {
            let result = in_flight.await;
            self.finish(result);
        }

        self.rx.close();
        while let Ok(command) = self.rx.try_recv() {
            if let Command::Sync { reply: Some(reply), .. } = command {
                let _ = reply.send(SyncDispatch::Skipped {
                    reason: SkipReason::ShuttingDown,
                    last: self.last_result.clone(),
                });
            }
        }

        log::info!("Sync scheduler stopped for user {}", self.user_id);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Sync { trigger, reply } => self.handle_trigger(trigger, reply),
            Command::UpdateSettings(settings) => {
                log::info!("Sync settings updated for user {}", self.user_id);
                self.settings = settings;
                if let Some(last) = self.last_sync_time {
                    self.next_sync_time = Some(after(last, self.settings.sync_interval_ms));
                }
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: if self.in_flight.is_some() { SchedulerState::Syncing } else { SchedulerState::Idle },
            last_sync_time: self.last_sync_time,
            next_sync_time: self.next_sync_time,
            last_result: self.last_result.clone(),
        }
    }

    fn handle_trigger(&mut self, trigger: SyncTrigger, reply: Option<oneshot::Sender<SyncDispatch>>) {
        if let Some(reason) = self.disabled_by_settings(trigger).or_else(|| {
            if self.in_flight.is_some() {
                None
            } else {
                self.throttled(trigger, self.clock.now())
            }
        }) {
            log::debug!("Skipping {} sync for {}: {:?}", trigger, self.user_id, reason);
            if let Some(reply) = reply {
                let _ = reply.send(SyncDispatch::Skipped {
                    reason,
                    last: self.last_result.clone(),
                });
            }
            return;
        }

        if self.in_flight.is_some() {
            log::debug!("{} trigger joined the running sync for {}", trigger, self.user_id);
            if let Some(reply) = reply {
                self.waiters.push((reply, false));
            }
            return;
        }

        log::info!("Starting {} sync for user {}", trigger, self.user_id);
        let engine = self.engine.clone();
        let catalog = self.catalog.clone();
        let user_id = self.user_id.clone();
        let device_sn = self.device_sn.clone();
        let cancel = self.shutdown.child_token();

        self.in_flight = Some(Box::pin(async move {
            engine
                .sync(&user_id, catalog.as_ref(), device_sn.as_deref(), &cancel)
                .await
        }));
        if let Some(reply) = reply {
            self.waiters.push((reply, true));
        }
    }

    fn disabled_by_settings(&self, trigger: SyncTrigger) -> Option<SkipReason> {
        let settings = &self.settings;
        let enabled = match trigger {
            SyncTrigger::Manual => true,
            SyncTrigger::Timer => settings.auto_sync_enabled,
            SyncTrigger::Mount => settings.auto_sync_enabled && settings.sync_on_mount,
            SyncTrigger::Visibility => settings.auto_sync_enabled && settings.sync_on_visibility_change,
        };
        if enabled {
            None
        } else {
            Some(SkipReason::Disabled)
        }
    }

    fn throttled(&self, trigger: SyncTrigger, now: DateTime<Utc>) -> Option<SkipReason> {
        if let Some(last) = self.last_sync_time {
            if now < after(last, self.settings.min_interval_ms) {
                return Some(SkipReason::MinInterval);
            }
        }
        if trigger == SyncTrigger::Timer {
            if let Some(next) = self.next_sync_time {
                if now < next {
                    return Some(SkipReason::NotDue);
                }
            }
        }
        None
    }

    /// Time until a timer trigger would pass both the schedule and the min interval
    fn timer_wait(&self) -> Duration {
        let now = self.clock.now();
        let mut due = self.next_sync_time.unwrap_or(now);
        if let Some(last) = self.last_sync_time {
            due = due.max(after(last, self.settings.min_interval_ms));
        }
        (due - now).to_std().unwrap_or(Duration::ZERO).min(MAX_TIMER_WAIT)
    }

    fn finish(&mut self, result: SyncResult) {
        self.in_flight = None;

        let now = self.clock.now();
        self.last_sync_time = Some(now);
        self.next_sync_time = Some(after(now, self.settings.sync_interval_ms));
        self.last_result = Some(result.clone());

        for listener in &self.listeners {
            listener.on_sync_complete(&self.user_id, &result, &self.settings);
        }

        for (reply, started_it) in self.waiters.drain(..) {
            let dispatch = if started_it {
                SyncDispatch::Ran(result.clone())
            } else {
                SyncDispatch::Joined(result.clone())
            };
            let _ = reply.send(dispatch);
        }
    }
}

/// `from` plus `millis`, saturating at the last representable instant
fn after(from: DateTime<Utc>, millis: u64) -> DateTime<Utc> {
    chrono::Duration::from_std(Duration::from_millis(millis))
        .ok()
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

async fn next_completion(in_flight: &mut Option<BoxFuture<'static, SyncResult>>) -> SyncResult {
    match in_flight {
        Some(sync) => sync.await,
        None => std::future::pending().await,
    }
}
