//! Run tickets — the client side of the fire-and-poll run protocol.
//!
//! ```text
//! Idle ──run──▶ Queueing ──response──▶ Queued ──delay──▶ Settled
//!                  │                                       ▲
//!                  └──────────── submission error ─────────┘
//! ```
//!
//! A ticket is never in `Idle`; a check without a ticket is idle. Tickets
//! are immutable values: every transition returns a new ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use checkgrid_core::Kwargs;

/// Phase of a check's run protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// No run is being tracked.
    Idle,
    /// Submission request sent, no response yet.
    Queueing,
    /// The submission request completed; waiting for the settle delay.
    Queued,
    /// Tracking finished. `error` is set when the submission itself failed.
    Settled { error: Option<String> },
}

impl RunPhase {
    /// Whether a new run may not be submitted in this phase.
    pub fn is_open(&self) -> bool {
        matches!(self, RunPhase::Queueing | RunPhase::Queued)
    }
}

/// One run submission.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTicket {
    /// Engine-wide submission sequence number. Responses carrying a
    /// different number belong to a dismissed ticket.
    pub seq: u64,
    pub submitted_at: DateTime<Utc>,
    /// Server-assigned run id, known once the submission responds.
    pub run_id: Option<String>,
    pub phase: RunPhase,
    /// Kwargs the run was submitted with.
    pub kwargs: Kwargs,
}

impl RunTicket {
    /// A freshly submitted ticket in `Queueing`.
    pub fn submit(seq: u64, kwargs: Kwargs) -> Self {
        Self {
            seq,
            submitted_at: Utc::now(),
            run_id: None,
            phase: RunPhase::Queueing,
            kwargs,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase.is_open()
    }

    /// `Queueing → Queued` once the server assigned an id.
    ///
    /// Returns `None` if the ticket is not queueing.
    pub fn queued(&self, run_id: &str) -> Option<Self> {
        if self.phase != RunPhase::Queueing {
            debug!(seq = self.seq, phase = ?self.phase, "ignoring queued transition");
            return None;
        }
        Some(Self {
            run_id: Some(run_id.to_string()),
            phase: RunPhase::Queued,
            ..self.clone()
        })
    }

    /// `Queued → Settled` after the delayed refresh.
    pub fn settled(&self) -> Option<Self> {
        if self.phase != RunPhase::Queued {
            debug!(seq = self.seq, phase = ?self.phase, "ignoring settle transition");
            return None;
        }
        Some(Self {
            phase: RunPhase::Settled { error: None },
            ..self.clone()
        })
    }

    /// `Queueing → Settled` with an error marker; no poll follows.
    pub fn failed(&self, reason: &str) -> Option<Self> {
        if self.phase != RunPhase::Queueing {
            debug!(seq = self.seq, phase = ?self.phase, "ignoring failure transition");
            return None;
        }
        Some(Self {
            phase: RunPhase::Settled {
                error: Some(reason.to_string()),
            },
            ..self.clone()
        })
    }
}
