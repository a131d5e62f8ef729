//! Error types for `survey-core`.
//!
//! Three failure kinds reach callers: a [`ValidationError`] (caught before any
//! store access), a missing row ([`ResolveError::NotFound`]), and a store error
//! wrapped unchanged. An already-recorded association is not an error; see
//! [`Reconciliation::AlreadyLinked`](crate::plan::Reconciliation).

use strum::Display;
use thiserror::Error;

use crate::link::Category;

/// A required form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Field {
  #[strum(serialize = "origin road")]
  OriginRoad,
  #[strum(serialize = "direction")]
  Direction,
  #[strum(serialize = "category")]
  Category,
  #[strum(serialize = "transport code")]
  TransportCode,
  #[strum(serialize = "study code")]
  StudyCode,
  #[strum(serialize = "coordinates")]
  Coordinates,
  #[strum(serialize = "length")]
  Length,
  #[strum(serialize = "width")]
  Width,
}

/// Malformed or missing input. Always recoverable by re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("all visible fields are required: {0} is missing")]
  MissingField(Field),

  #[error("destination road is required for category 'junction'")]
  DestinationRequired,

  #[error("milepost is not allowed for category 'junction'")]
  MilepostForbidden,

  #[error("milepost is required for category '{0}'")]
  MilepostRequired(Category),

  #[error("destination road is only allowed for category 'junction', not '{0}'")]
  DestinationForbidden(Category),

  #[error("milepost {0:?} is not a decimal number")]
  InvalidMilepost(String),

  #[error("{0} {1:?} is not a non-negative decimal number")]
  InvalidMeasure(Field, String),

  #[error("enter at least one search criterion")]
  NoSearchCriteria,
}

/// The kind of entity a resolver was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Entity {
  Link,
  Plan,
}

/// Failure of a single find-or-create step.
#[derive(Debug, Error)]
pub enum ResolveError<E> {
  /// The re-read after a successful insert found nothing (a store
  /// consistency problem), or the row an update targets does not exist.
  #[error("{0} not found")]
  NotFound(Entity),

  #[error("store error: {0}")]
  Store(#[source] E),
}

impl<E> From<E> for ResolveError<E> {
  fn from(e: E) -> Self { Self::Store(e) }
}

/// Failure of a store-backed operation on form input: a record submission,
/// a dimension record or update, or a link search.
#[derive(Debug, Error)]
pub enum SubmitError<E> {
  #[error("invalid record: {0}")]
  Rejected(ValidationError),

  /// After an insert this is a store consistency problem; for an update it
  /// means the target does not exist.
  #[error("{0} not found")]
  NotFound(Entity),

  #[error("store error: {0}")]
  Store(#[source] E),
}

impl<E> SubmitError<E> {
  /// `true` for failures the caller can fix by correcting the input.
  pub fn is_rejection(&self) -> bool { matches!(self, Self::Rejected(_)) }
}

impl<E> From<ResolveError<E>> for SubmitError<E> {
  fn from(e: ResolveError<E>) -> Self {
    match e {
      ResolveError::NotFound(entity) => Self::NotFound(entity),
      ResolveError::Store(e) => Self::Store(e),
    }
  }
}
