//! Asynchronous request handling.
//!
//! - [`RequestController`]: single-flight lifecycle `idle → loading →
//!   success | failure`, observed through [`SettlementWatcher`]
//! - [`Transport`]: the HTTP boundary, with [`ReqwestTransport`] as the
//!   stock implementation

pub mod controller;
pub mod transport;
pub mod types;

pub use controller::{
    Dispatch, RejectReason, RequestController, RequestSnapshot, RequestState, Settlement,
    SettlementWatcher, UNEXPECTED_FAILURE_MESSAGE,
};
pub use transport::{ReqwestTransport, Transport};
pub use types::{ApiRequest, ApiResponse, HttpMethod};
