//! The `SurveyTx` and `SurveyStore` traits.
//!
//! [`SurveyTx`] is the set of statements a single unit of work may issue. It
//! is synchronous: a backend hands the resolvers a transaction handle and
//! runs them to completion on its own thread. [`SurveyStore`] opens those
//! units of work and serves the read side.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  code::{StudyCode, TransportCode},
  dimension::{Dimensions, LinkQuery},
  link::{Link, LinkId, NormalizedLinkKey},
  plan::{Association, Plan, PlanId},
};

/// Result of an insert against a natural-key uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// A row with the same natural key already exists; nothing was written.
  Conflict,
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Statements available inside one unit of work.
///
/// Inserts of links and plans must never produce a second row for the same
/// natural key; a backend reports [`InsertOutcome::Conflict`] instead.
pub trait SurveyTx {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert a study unless one with this code exists. Returns `true` if a
  /// row was written.
  fn insert_study_if_absent(&mut self, code: &StudyCode) -> Result<bool, Self::Error>;

  /// Insert a transport unless one with this code exists. Returns `true` if
  /// a row was written.
  fn insert_transport_if_absent(
    &mut self,
    code: &TransportCode,
  ) -> Result<bool, Self::Error>;

  /// Newest link matching `key`: on destination when the key carries one,
  /// otherwise on milepost among links without a destination.
  fn find_link(&mut self, key: &NormalizedLinkKey) -> Result<Option<LinkId>, Self::Error>;

  fn insert_link(
    &mut self,
    key: &NormalizedLinkKey,
    coordinates: Option<&str>,
  ) -> Result<InsertOutcome, Self::Error>;

  /// Overwrite the measurements of `link_id`. Returns the number of rows
  /// updated.
  fn set_dimensions(
    &mut self,
    link_id: LinkId,
    dimensions: &Dimensions,
  ) -> Result<usize, Self::Error>;

  fn find_plan(
    &mut self,
    transport: &TransportCode,
    link_id: LinkId,
  ) -> Result<Option<PlanId>, Self::Error>;

  fn insert_plan(
    &mut self,
    transport: &TransportCode,
    link_id: LinkId,
    coordinates: &str,
  ) -> Result<InsertOutcome, Self::Error>;

  /// The study currently associated with `plan_id`, if any.
  fn study_for_plan(&mut self, plan_id: PlanId) -> Result<Option<StudyCode>, Self::Error>;

  fn insert_association(
    &mut self,
    plan_id: PlanId,
    study: &StudyCode,
    at: DateTime<Utc>,
  ) -> Result<(), Self::Error>;

  /// Remove the association of `plan_id`. Returns the number of rows removed.
  fn delete_association(&mut self, plan_id: PlanId) -> Result<usize, Self::Error>;
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over a survey store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SurveyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run `work` as one atomic unit.
  ///
  /// The backend commits when `work` returns `Ok` and rolls back when it
  /// returns `Err`. Concurrent units of work touching the same natural keys
  /// must behave as if run one after the other.
  fn transact<T, E, F>(&self, work: F) -> impl Future<Output = Result<T, E>> + Send + '_
  where
    T: Send + 'static,
    E: From<Self::Error> + Send + 'static,
    F: FnOnce(&mut dyn SurveyTx<Error = Self::Error>) -> Result<T, E> + Send + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a link by identity. Returns `None` if not found.
  fn get_link(
    &self,
    id: LinkId,
  ) -> impl Future<Output = Result<Option<Link>, Self::Error>> + Send + '_;

  /// Retrieve a plan by identity. Returns `None` if not found.
  fn get_plan(
    &self,
    id: PlanId,
  ) -> impl Future<Output = Result<Option<Plan>, Self::Error>> + Send + '_;

  /// The current association of a plan, if any.
  fn association_for_plan(
    &self,
    id: PlanId,
  ) -> impl Future<Output = Result<Option<Association>, Self::Error>> + Send + '_;

  /// All plans currently associated with `study`, by ascending identity.
  fn plans_for_study(
    &self,
    study: StudyCode,
  ) -> impl Future<Output = Result<Vec<Plan>, Self::Error>> + Send + '_;

  /// Links matching every criterion of `query` exactly, by ascending
  /// identity.
  fn search_links(
    &self,
    query: LinkQuery,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  fn list_studies(
    &self,
  ) -> impl Future<Output = Result<Vec<StudyCode>, Self::Error>> + Send + '_;

  fn list_transports(
    &self,
  ) -> impl Future<Output = Result<Vec<TransportCode>, Self::Error>> + Send + '_;
}
