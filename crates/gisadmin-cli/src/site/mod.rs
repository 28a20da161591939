//! Site administration over the REST admin API.
//!
//! - [`transport`] sends one form-encoded POST per call.
//! - [`call`] builds requests and folds every failure layer into an
//!   [`OperationResult`].
//! - [`session`] issues the short-lived tokens privileged calls need.
//! - [`restore`] interprets the import payload.
//! - [`controller`] sequences the calls into a backup or restore run.

mod call;
mod controller;
mod error;
mod restore;
mod session;
mod transport;

pub use call::{
    ApplicationFailure, FailureKind, FormParameters, OperationRequest, OperationResult, execute,
    is_application_success,
};
pub use controller::{RestoreOptions, RunRequest, RunSummary, SiteController, SiteMode, SiteState};
pub use error::{Phase, RequiredParameter, SiteError};
pub use restore::{COMPLETION_MARKER, report_from_import};
pub use session::{Credentials, Session, TOKEN_RESOURCE, acquire_token, with_fresh_session};
pub use transport::{
    HttpTransport, REFERER_TAG, RawResponse, Transport, TransportError, encode_path, request_url,
};
