//! Handlers for `/links` and `/plans` lookups.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/links` | Exact-match search; query: [`LinkSearch`] fields |
//! | `GET`  | `/links/{id}` | 404 if not found |
//! | `GET`  | `/plans/{id}` | Plan plus its current study; 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Serialize;
use survey_core::{
  dimension::LinkSearch,
  find_links,
  link::{Category, CategoryCodes, Link, LinkId},
  plan::{Association, Plan, PlanId},
  store::SurveyStore,
};

use crate::{AppState, error::ApiError};

/// A link with its category decoded from the stored code.
#[derive(Debug, Serialize)]
pub struct LinkView {
  #[serde(flatten)]
  pub link:     Link,
  /// `None` when the stored code is not one this server's policy produces.
  pub category: Option<Category>,
}

impl LinkView {
  pub fn new(link: Link, policy: CategoryCodes) -> Self {
    let category = Category::from_code(&link.category_code, policy);
    Self { link, category }
  }
}

/// `GET /links`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Query(search): Query<LinkSearch>,
) -> Result<Json<Vec<LinkView>>, ApiError>
where
  S: SurveyStore + 'static,
{
  let links = find_links(state.store.as_ref(), &search, state.policy).await?;
  Ok(Json(links.into_iter().map(|l| LinkView::new(l, state.policy)).collect()))
}

/// `GET /links/{id}`
pub async fn get_link<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<LinkId>,
) -> Result<Json<LinkView>, ApiError>
where
  S: SurveyStore + 'static,
{
  let link = state
    .store
    .get_link(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("link {id} not found")))?;
  Ok(Json(LinkView::new(link, state.policy)))
}

#[derive(Debug, Serialize)]
pub struct PlanView {
  #[serde(flatten)]
  pub plan:  Plan,
  pub study: Option<Association>,
}

/// `GET /plans/{id}`
pub async fn get_plan<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PlanId>,
) -> Result<Json<PlanView>, ApiError>
where
  S: SurveyStore + 'static,
{
  let plan = state
    .store
    .get_plan(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("plan {id} not found")))?;
  let study = state
    .store
    .association_for_plan(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(PlanView { plan, study }))
}
