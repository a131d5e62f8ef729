//! JSON HTTP API for the road survey store.
//!
//! Exposes an axum [`Router`] backed by any [`SurveyStore`]. Survey records
//! are submitted to `POST /records` and link measurements to
//! `POST /dimensions`; the remaining routes look up and search what earlier
//! submissions recorded.

pub mod dimensions;
pub mod error;
pub mod links;
pub mod records;
pub mod studies;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use survey_core::{link::CategoryCodes, store::SurveyStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_busy_timeout_ms() -> u64 { 5_000 }

/// Runtime server configuration, deserialised from `survey.toml` and
/// `SURVEY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
  #[serde(default)]
  pub category_codes:  CategoryCodes,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub policy: CategoryCodes,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: self.policy }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SurveyStore + 'static,
{
  Router::new()
    .route("/records",               post(records::submit::<S>))
    .route("/dimensions",            post(dimensions::record::<S>))
    .route("/links",                 get(links::search::<S>))
    .route("/links/{id}",            get(links::get_link::<S>))
    .route("/links/{id}/dimensions", put(dimensions::update::<S>))
    .route("/plans/{id}",            get(links::get_plan::<S>))
    .route("/studies",               get(studies::list::<S>))
    .route("/studies/{code}/plans",  get(studies::plans::<S>))
    .route("/transports",            get(studies::transports::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
