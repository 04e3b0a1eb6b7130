//! HTTP trigger API for the placement billing engine.
//!
//! This module exposes the engine's jobs (monthly calculation, forced
//! recalculation, merge, termination, adjustment settlement) as REST
//! endpoints over a shared in-memory store.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ActorRequest, AdjustmentRequest, AdjustmentStatusRequest, CalculateMonthRequest,
    GenerateCyclesRequest, MergeRequest, TerminateRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
