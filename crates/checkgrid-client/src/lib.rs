//! checkgrid-client — access to the check-execution service.
//!
//! The engine depends only on the [`CheckService`] trait. The production
//! implementation, [`HttpCheckService`], issues environment-scoped `GET`
//! requests with `reqwest`:
//!
//! ```text
//! GET {base}/{env}/checks/grouped
//! GET {base}/{env}/lambdas
//! GET {base}/{env}/checks/{name}
//! GET {base}/{env}/checks/{name}/history
//! GET {base}/{env}/checks/{name}/run?args=<base64-json>
//! ```

pub mod error;
pub mod http;
pub mod service;

pub use error::{ClientError, ClientResult};
pub use http::{HttpCheckService, encode_args};
pub use service::CheckService;
