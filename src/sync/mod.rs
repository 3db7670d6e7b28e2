//! Recording synchronisation
//!
//! [`ReconciliationEngine`] performs one pass against the remote catalog;
//! [`SyncScheduler`] decides when passes run and guarantees only one runs at a time.

pub mod clock;
pub mod engine;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ReconciliationEngine, SyncResult};
pub use scheduler::{
    SchedulerHandle, SchedulerState, SchedulerStatus, SkipReason, SyncDispatch, SyncScheduler, SyncTrigger,
};
