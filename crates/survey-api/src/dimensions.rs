//! Handlers for link measurements.
//!
//! | Method | Path | Status |
//! |--------|------|--------|
//! | `POST` | `/dimensions` | `201` if the link was created, else `200`; body: [`DimensionRecord`] |
//! | `PUT`  | `/links/{id}/dimensions` | `200`, `404` if no such link; body: [`Measurements`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use survey_core::{
  Entity, SubmitError,
  dimension::{DimensionRecord, Dimensions, Measurements},
  link::LinkId,
  record_dimensions,
  store::SurveyStore,
  update_dimensions,
};

use crate::{AppState, error::ApiError};

/// `POST /dimensions`
pub async fn record<S>(
  State(state): State<AppState<S>>,
  Json(record): Json<DimensionRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SurveyStore + 'static,
{
  let outcome = record_dimensions(state.store.as_ref(), &record, state.policy).await?;
  let status = if outcome.link.created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(outcome)))
}

/// `PUT /links/{id}/dimensions`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<LinkId>,
  Json(measurements): Json<Measurements>,
) -> Result<Json<Dimensions>, ApiError>
where
  S: SurveyStore + 'static,
{
  match update_dimensions(state.store.as_ref(), id, &measurements).await {
    Ok(dimensions) => Ok(Json(dimensions)),
    Err(SubmitError::NotFound(Entity::Link)) => {
      Err(ApiError::NotFound(format!("link {id} not found")))
    }
    Err(e) => Err(e.into()),
  }
}
