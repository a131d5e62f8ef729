//! Handlers for the study and transport listings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/studies` | All study codes |
//! | `GET`  | `/studies/{code}/plans` | Plans currently associated with the study |
//! | `GET`  | `/transports` | All transport codes |

use axum::{
  Json,
  extract::{Path, State},
};
use survey_core::{
  code::{StudyCode, TransportCode},
  plan::Plan,
  store::SurveyStore,
};

use crate::{AppState, error::ApiError};

/// `GET /studies`
pub async fn list<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<StudyCode>>, ApiError>
where
  S: SurveyStore + 'static,
{
  let studies = state.store.list_studies().await.map_err(ApiError::store)?;
  Ok(Json(studies))
}

/// `GET /studies/{code}/plans`
pub async fn plans<S>(
  State(state): State<AppState<S>>,
  Path(code): Path<String>,
) -> Result<Json<Vec<Plan>>, ApiError>
where
  S: SurveyStore + 'static,
{
  let study = StudyCode::new(&code)
    .ok_or_else(|| ApiError::BadRequest("study code must not be empty".into()))?;
  let plans = state
    .store
    .plans_for_study(study)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(plans))
}

/// `GET /transports`
pub async fn transports<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<TransportCode>>, ApiError>
where
  S: SurveyStore + 'static,
{
  let transports = state.store.list_transports().await.map_err(ApiError::store)?;
  Ok(Json(transports))
}
