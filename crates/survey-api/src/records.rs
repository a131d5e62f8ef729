//! Handler for `POST /records`, the form submission endpoint.
//!
//! | Outcome | Status | `association.outcome` |
//! |---------|--------|-----------------------|
//! | New association | `201` | `created` |
//! | Previous study replaced | `200` | `replaced` |
//! | Duplicate submission | `200` | `already_linked` |
//! | Validation failure | `422` | |
//! | Store failure | `500` | |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use survey_core::{
  Submission, plan::Reconciliation, record::SurveyRecord, store::SurveyStore, submit_record,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  #[serde(flatten)]
  pub submission: Submission,
  pub message:    &'static str,
}

fn message(outcome: &Reconciliation) -> &'static str {
  match outcome {
    Reconciliation::Created => "record saved",
    Reconciliation::Replaced { .. } => "record saved; previous study replaced",
    Reconciliation::AlreadyLinked => "this plan is already recorded with the given study",
  }
}

/// `POST /records`, body: [`SurveyRecord`]
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Json(record): Json<SurveyRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SurveyStore + 'static,
{
  let submission = submit_record(state.store.as_ref(), &record, state.policy).await?;

  let status = match submission.association {
    Reconciliation::Created => StatusCode::CREATED,
    _ => StatusCode::OK,
  };
  let message = message(&submission.association);
  Ok((status, Json(SubmitResponse { submission, message })))
}
