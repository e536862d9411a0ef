//! HTTP clients for the remote inbox services
//!
//! Delivery, attachment storage and reply suggestion all sit behind one
//! gateway and share a bearer token. Uses synchronous HTTP (ureq) to be
//! executor-agnostic.

mod delivery;
mod storage;
mod suggest;

pub use delivery::DeliveryClient;
pub use storage::StorageClient;
pub use suggest::SuggestClient;

use std::time::Duration;

use crate::error::InboxError;

/// Build the shared HTTP agent
///
/// A global timeout keeps a hung service from stalling the caller; the
/// failure surfaces as [`InboxError::Timeout`] instead.
fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(30)))
        .build()
        .into()
}

/// Map a ureq transport failure onto the crate error type
///
/// Status-code errors are handled by each client; everything else is
/// either a timeout or a generic transport failure.
fn transport_error(e: ureq::Error) -> InboxError {
    match e {
        ureq::Error::Timeout(reason) => InboxError::Timeout(reason.to_string()),
        other => InboxError::Transport(other.to_string()),
    }
}
