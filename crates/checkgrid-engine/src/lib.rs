//! checkgrid-engine — check orchestration for the monitoring dashboard.
//!
//! Lets an operator browse the check catalog, inspect latest results and
//! run history, edit invocation arguments, and start ad-hoc runs.
//!
//! # Architecture
//!
//! ```text
//! Engine (single owner, event-driven)
//!   ├── Catalog          grouped checks + workers, loaded independently
//!   ├── SelectionModel   expanded groups, visible histories
//!   ├── CheckArena       immutable per-check state, created on first reference
//!   │     └── cache      at most one in-flight fetch per check and kind
//!   └── RunTicket        Queueing → Queued → Settled, one open per check
//! ```
//!
//! Requests are spawned onto the tokio runtime and report back as
//! [`EngineEvent`]s. After a run is queued, a single cancellable timer
//! invalidates the check's history once `settle_delay` has passed. There
//! is no retry loop; a job still running at that point needs a manual
//! refresh.

pub mod cache;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod run;
pub mod selection;
pub mod state;

pub use cache::FetchKind;
pub use catalog::{Catalog, CatalogPart, LoadStatus};
pub use engine::{Engine, EngineEvent};
pub use error::{EngineError, EngineResult};
pub use run::{RunPhase, RunTicket};
pub use selection::SelectionModel;
pub use state::{CheckArena, CheckId, CheckRuntimeState};
