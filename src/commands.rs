use crate::simulation::{
    ErrorBody, SimulationError, SimulationPayload, SimulationRequest, SimulationResult, Simulator,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

pub struct AppState {
    pub simulator: Arc<Simulator>,
    /// Held from load to write-back so only one pipeline touches the workbook file at a time.
    /// The guard moves into the blocking job, so a dropped request still holds it until
    /// its pipeline finishes.
    pub workbook_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(simulator: Simulator) -> Self {
        AppState {
            simulator: Arc::new(simulator),
            workbook_lock: Arc::new(Mutex::new(())),
        }
    }
}

impl IntoResponse for SimulationError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(self.to_body())).into_response()
    }
}

// ==================== Simulation Commands ====================

/// Run a simulation against the shared workbook
pub async fn simular(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulationPayload>, JsonRejection>,
) -> Result<Json<SimulationResult>, SimulationError> {
    let span = tracing::info_span!("simular", request_id = %Uuid::new_v4());

    let outcome = run_simulation(state, payload).instrument(span.clone()).await;

    if let Err(ref e) = outcome {
        let _entered = span.enter();
        if e.is_client_error() {
            tracing::info!(error = %e, "rejected request");
        } else {
            tracing::error!(error = %e, "simulation failed");
        }
    }

    outcome.map(Json)
}

async fn run_simulation(
    state: Arc<AppState>,
    payload: Result<Json<SimulationPayload>, JsonRejection>,
) -> Result<SimulationResult, SimulationError> {
    let Json(payload) = payload.map_err(|e| {
        SimulationError::InvalidParameters(format!("Invalid JSON body: {}", e.body_text()))
    })?;
    let request =
        SimulationRequest::from_payload(&payload).map_err(SimulationError::InvalidParameters)?;

    tracing::info!(
        uf = request.cost_per_unit,
        pallets = request.pallet_count,
        months = request.months,
        "simulation requested"
    );

    let guard = state.workbook_lock.clone().lock_owned().await;

    let simulator = state.simulator.clone();
    let span = tracing::Span::current();
    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let _entered = span.enter();
        simulator.run(&request)
    })
    .await
    .map_err(|e| SimulationError::Unexpected(format!("Task join error: {}", e)))??;

    tracing::info!(
        pallet_parking = result.pallet_parking_cost,
        traditional = result.traditional_cost,
        savings = result.savings,
        "simulation finished"
    );

    Ok(result)
}

/// Any route other than `POST /simular`
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found"))).into_response()
}
