//! HTTP request handlers for the billing trigger API.
//!
//! Each handler parses its body, runs one engine job under the shared lock
//! and maps the outcome to a JSON response.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{AttendanceRecord, Contract, SubstituteRecord};
use crate::store::BillingStore;

use super::request::{
    ActorRequest, AdjustmentRequest, AdjustmentStatusRequest, CalculateMonthRequest,
    GenerateCyclesRequest, MergeRequest, TerminateRequest,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/contracts", post(save_contract_handler))
        .route("/contracts/:id", get(get_contract_handler))
        .route("/contracts/:id/bills", get(list_bills_handler))
        .route("/contracts/:id/activity", get(list_activity_handler))
        .route("/contracts/:id/calculate", post(calculate_contract_handler))
        .route("/contracts/:id/cycles", post(generate_cycles_handler))
        .route("/contracts/:id/terminate", post(terminate_handler))
        .route("/attendance", post(save_attendance_handler))
        .route("/substitutes", post(save_substitute_handler))
        .route("/substitutes/:id/calculate", post(calculate_substitute_handler))
        .route("/billing/calculate", post(calculate_all_handler))
        .route("/bills/:id", get(get_bill_handler))
        .route("/bills/:id/recalculate", post(recalculate_bill_handler))
        .route("/bills/:id/merge", post(merge_bill_handler))
        .route("/payrolls/:id", get(get_payroll_handler))
        .route("/adjustments", post(add_adjustment_handler))
        .route("/adjustments/:id", delete(delete_adjustment_handler))
        .route("/adjustments/:id/status", post(adjustment_status_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

/// Unwraps a JSON body, turning a rejection into a 400 response.
fn parse_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: Uuid,
) -> Result<T, Response> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    // The body text carries serde's detailed message
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            Err(json_response(StatusCode::BAD_REQUEST, error))
        }
    }
}

/// Logs the outcome of an engine job and builds its response.
fn respond<T: Serialize>(
    correlation_id: Uuid,
    operation: &'static str,
    started: Instant,
    success: StatusCode,
    result: EngineResult<T>,
) -> Response {
    match result {
        Ok(body) => {
            info!(
                correlation_id = %correlation_id,
                operation = operation,
                duration_us = started.elapsed().as_micros(),
                "Request completed successfully"
            );
            json_response(success, body)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                operation = operation,
                error = %err,
                "Request failed"
            );
            let api_error: ApiErrorResponse = err.into();
            json_response(api_error.status, api_error.error)
        }
    }
}

/// Handler for POST /contracts.
async fn save_contract_handler(
    State(state): State<AppState>,
    payload: Result<Json<Contract>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let contract = match parse_body(payload, correlation_id) {
        Ok(contract) => contract,
        Err(response) => return response,
    };
    info!(correlation_id = %correlation_id, contract_id = %contract.id, "Saving contract");

    let started = Instant::now();
    let result = state
        .engine()
        .save_contract(contract.clone())
        .map(|()| contract);
    respond(correlation_id, "save_contract", started, StatusCode::CREATED, result)
}

/// Handler for GET /contracts/:id.
async fn get_contract_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let started = Instant::now();
    let result = state.engine().store().contract(id);
    respond(Uuid::new_v4(), "get_contract", started, StatusCode::OK, result)
}

/// Handler for GET /contracts/:id/bills.
async fn list_bills_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let started = Instant::now();
    let engine = state.engine();
    let result = engine
        .store()
        .contract(id)
        .map(|_| engine.store().bills_for_contract(id));
    respond(Uuid::new_v4(), "list_bills", started, StatusCode::OK, result)
}

/// Handler for GET /contracts/:id/activity.
async fn list_activity_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let started = Instant::now();
    let engine = state.engine();
    let result = engine
        .store()
        .contract(id)
        .map(|_| engine.store().activity_for_contract(id));
    respond(Uuid::new_v4(), "list_activity", started, StatusCode::OK, result)
}

/// Handler for POST /contracts/:id/calculate.
///
/// Calculates every cycle of one contract settling in the requested month.
async fn calculate_contract_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<CalculateMonthRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        contract_id = %id,
        year = request.year,
        month = request.month,
        force = request.force,
        "Processing contract calculation"
    );

    let started = Instant::now();
    let result = state.engine().calculate_for_month(
        id,
        request.year,
        request.month,
        request.force,
        &request.actor,
    );
    respond(correlation_id, "calculate_for_month", started, StatusCode::OK, result)
}

/// Handler for POST /billing/calculate.
///
/// Runs the monthly batch over every billable contract.
async fn calculate_all_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculateMonthRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        year = request.year,
        month = request.month,
        "Processing batch calculation"
    );

    let started = Instant::now();
    let result = state.engine().calculate_all_for_month(
        request.year,
        request.month,
        request.force,
        &request.actor,
    );
    respond(correlation_id, "calculate_all_for_month", started, StatusCode::OK, result)
}

/// Handler for POST /contracts/:id/cycles.
async fn generate_cycles_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<GenerateCyclesRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let started = Instant::now();
    let result = state
        .engine()
        .generate_all_cycles(id, request.horizon, &request.actor);
    respond(correlation_id, "generate_all_cycles", started, StatusCode::OK, result)
}

/// Handler for POST /contracts/:id/terminate.
async fn terminate_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<TerminateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        contract_id = %id,
        termination_date = %request.termination.termination_date,
        "Processing contract termination"
    );

    let started = Instant::now();
    let result = state
        .engine()
        .terminate_contract(id, request.termination, &request.actor);
    respond(correlation_id, "terminate_contract", started, StatusCode::OK, result)
}

/// Handler for POST /attendance.
async fn save_attendance_handler(
    State(state): State<AppState>,
    payload: Result<Json<AttendanceRecord>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let record = match parse_body(payload, correlation_id) {
        Ok(record) => record,
        Err(response) => return response,
    };

    let started = Instant::now();
    let result = state
        .engine()
        .save_attendance(record.clone())
        .map(|()| record);
    respond(correlation_id, "save_attendance", started, StatusCode::CREATED, result)
}

/// Handler for POST /substitutes.
async fn save_substitute_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubstituteRecord>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let record = match parse_body(payload, correlation_id) {
        Ok(record) => record,
        Err(response) => return response,
    };

    let started = Instant::now();
    let result = state
        .engine()
        .save_substitute(record.clone())
        .map(|()| record);
    respond(correlation_id, "save_substitute", started, StatusCode::CREATED, result)
}

/// Handler for POST /substitutes/:id/calculate.
async fn calculate_substitute_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let started = Instant::now();
    let result = state.engine().calculate_substitute(id, &request.actor);
    respond(correlation_id, "calculate_substitute", started, StatusCode::OK, result)
}

/// Handler for GET /bills/:id.
async fn get_bill_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let started = Instant::now();
    let result = state.engine().store().bill(id);
    respond(Uuid::new_v4(), "get_bill", started, StatusCode::OK, result)
}

/// Handler for POST /bills/:id/recalculate.
async fn recalculate_bill_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let started = Instant::now();
    let result = state.engine().recalculate_bill(id, &request.actor);
    respond(correlation_id, "recalculate_bill", started, StatusCode::OK, result)
}

/// Handler for POST /bills/:id/merge.
async fn merge_bill_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        bill_id = %id,
        target_contract_id = %request.target_contract_id,
        "Processing bill merge"
    );

    let started = Instant::now();
    let result = state
        .engine()
        .merge_bill(id, request.target_contract_id, &request.actor);
    respond(correlation_id, "merge_bill", started, StatusCode::OK, result)
}

/// Handler for GET /payrolls/:id.
async fn get_payroll_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let started = Instant::now();
    let result = state.engine().store().payroll(id);
    respond(Uuid::new_v4(), "get_payroll", started, StatusCode::OK, result)
}

/// Handler for POST /adjustments.
async fn add_adjustment_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdjustmentRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let started = Instant::now();
    let today = Utc::now().date_naive();
    let result = state
        .engine()
        .add_adjustment(request.to_adjustment(), &request.actor, today);
    respond(correlation_id, "add_adjustment", started, StatusCode::CREATED, result)
}

/// Handler for POST /adjustments/:id/status.
async fn adjustment_status_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AdjustmentStatusRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let started = Instant::now();
    let today = Utc::now().date_naive();
    let result = state.engine().set_adjustment_status(
        id,
        request.status,
        request.settlement_date,
        &request.actor,
        today,
    );
    respond(correlation_id, "set_adjustment_status", started, StatusCode::OK, result)
}

/// Handler for DELETE /adjustments/:id.
async fn delete_adjustment_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorRequest>,
) -> Response {
    let started = Instant::now();
    let result = state.engine().delete_adjustment(id, &query.actor);
    respond(Uuid::new_v4(), "delete_adjustment", started, StatusCode::OK, result)
}
