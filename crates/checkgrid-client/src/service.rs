//! The seam between the engine and the check-execution service.

use std::future::Future;

use checkgrid_core::{CheckGroup, CheckHistory, CheckResult, Kwargs, RunAck, Worker};

use crate::error::ClientResult;

/// Environment-scoped operations the engine consumes.
///
/// Implementations are shared across spawned tasks, so every returned
/// future must be `Send`.
pub trait CheckService: Send + Sync + 'static {
    /// `GET /checks/grouped`
    fn grouped_checks(&self) -> impl Future<Output = ClientResult<Vec<CheckGroup>>> + Send;

    /// `GET /lambdas`
    fn workers(&self) -> impl Future<Output = ClientResult<Vec<Worker>>> + Send;

    /// `GET /checks/{name}`
    fn check_result(&self, name: &str) -> impl Future<Output = ClientResult<CheckResult>> + Send;

    /// `GET /checks/{name}/history`
    fn check_history(&self, name: &str)
    -> impl Future<Output = ClientResult<CheckHistory>> + Send;

    /// `GET /checks/{name}/run?args=<base64-json>`
    fn run_check(
        &self,
        name: &str,
        kwargs: &Kwargs,
    ) -> impl Future<Output = ClientResult<RunAck>> + Send;
}
