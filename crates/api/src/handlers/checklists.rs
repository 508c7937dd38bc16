//! Handlers for the legacy-compatible checklist endpoints.
//!
//! Every handler validates the body and hands it to the
//! [`ChecklistApiRouter`](recon_core::migration::ChecklistApiRouter), which
//! decides between the aggregate and the legacy path.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use recon_core::checklist::api::{
    ChecklistApi, ChecklistDetails, InitChecklistRequest, InitChecklistResponse,
    LoadChecklistRequest, SaveAnomaliesRequest, SaveAnomaliesResponse, SubmitChecklistRequest,
    SubmitChecklistResponse,
};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::validation::validate;

/// POST /checklists/init
pub async fn init_checklist(
    State(state): State<AppState>,
    body: Result<Json<InitChecklistRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<InitChecklistResponse>>> {
    let Json(request) = body?;
    validate(&request)?;
    let response = state.checklists.init_checklist(request).await?;
    Ok(Json(DataResponse::new(response)))
}

/// POST /checklists/submit
pub async fn submit_checklist(
    State(state): State<AppState>,
    body: Result<Json<SubmitChecklistRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<SubmitChecklistResponse>>> {
    let Json(request) = body?;
    validate(&request)?;
    let response = state.checklists.submit_checklist(request).await?;
    Ok(Json(DataResponse::new(response)))
}

/// POST /checklists/anomalies
pub async fn save_anomalies(
    State(state): State<AppState>,
    body: Result<Json<SaveAnomaliesRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<SaveAnomaliesResponse>>> {
    let Json(request) = body?;
    validate(&request)?;
    let response = state.checklists.save_anomalies(request).await?;
    Ok(Json(DataResponse::new(response)))
}

/// POST /checklists/load
///
/// `data` is `null` when no checklist exists for the context and vehicle.
pub async fn load_checklist(
    State(state): State<AppState>,
    body: Result<Json<LoadChecklistRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<Option<ChecklistDetails>>>> {
    let Json(request) = body?;
    validate(&request)?;
    let details = state.checklists.load_checklist(request).await?;
    Ok(Json(DataResponse::new(details)))
}
