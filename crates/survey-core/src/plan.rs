//! Plans, studies and the plan↔study association.
//!
//! A plan ties a transport to a link and is identified by the pair
//! `(transport, link)`. Each plan is associated with at most one study at a
//! time; the association is the only row this crate ever deletes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  code::{StudyCode, TransportCode},
  link::LinkId,
};

/// Store-assigned identity of a plan.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlanId(pub i64);

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A physical drawing produced for a transport against a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
  pub plan_id:     PlanId,
  pub transport:   TransportCode,
  pub link_id:     LinkId,
  pub coordinates: Option<String>,
}

/// The current study of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
  pub plan_id:       PlanId,
  pub study:         StudyCode,
  pub associated_at: DateTime<Utc>,
}

/// What reconciling a plan with a study did to the association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciliation {
  /// The plan had no study; one was recorded.
  Created,
  /// The plan was already associated with the requested study. Nothing was
  /// written.
  AlreadyLinked,
  /// The plan was associated with a different study, which was discarded.
  Replaced { previous: StudyCode },
}

impl Reconciliation {
  /// `true` if the association table was written.
  pub fn is_mutation(&self) -> bool { !matches!(self, Self::AlreadyLinked) }
}
