//! Find-or-create steps of the submission protocol.
//!
//! Each function runs inside a single unit of work and issues statements only
//! through [`SurveyTx`]. Lost insert races are absorbed here: a
//! [`InsertOutcome::Conflict`] means another writer created the row first, so
//! the step re-reads and adopts that row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  code::{StudyCode, TransportCode},
  error::{Entity, ResolveError},
  link::{LinkId, NormalizedLinkKey},
  plan::{PlanId, Reconciliation},
  store::{InsertOutcome, SurveyTx},
};

/// The identity a find-or-create step settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution<I> {
  pub id:      I,
  /// `true` if this unit of work wrote the row.
  pub created: bool,
}

// ─── Registrar ───────────────────────────────────────────────────────────────

/// Make sure `code` exists in the study table. Returns `true` if it was added.
pub fn ensure_study<X>(tx: &mut X, code: &StudyCode) -> Result<bool, X::Error>
where
  X: SurveyTx + ?Sized,
{
  let added = tx.insert_study_if_absent(code)?;
  if added {
    debug!(study = %code, "registered study");
  }
  Ok(added)
}

/// Make sure `code` exists in the transport table. Returns `true` if it was
/// added.
pub fn ensure_transport<X>(tx: &mut X, code: &TransportCode) -> Result<bool, X::Error>
where
  X: SurveyTx + ?Sized,
{
  let added = tx.insert_transport_if_absent(code)?;
  if added {
    debug!(transport = %code, "registered transport");
  }
  Ok(added)
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Find the link for `key`, creating it with `coordinates` if absent.
///
/// An existing link keeps its coordinates.
pub fn resolve_link<X>(
  tx: &mut X,
  key: &NormalizedLinkKey,
  coordinates: Option<&str>,
) -> Result<Resolution<LinkId>, ResolveError<X::Error>>
where
  X: SurveyTx + ?Sized,
{
  if let Some(id) = tx.find_link(key)? {
    return Ok(Resolution { id, created: false });
  }

  let outcome = tx.insert_link(key, coordinates)?;
  if outcome == InsertOutcome::Conflict {
    debug!(origin = %key.origin, "link created concurrently; adopting existing row");
  }

  let id = tx.find_link(key)?.ok_or(ResolveError::NotFound(Entity::Link))?;
  Ok(Resolution { id, created: outcome == InsertOutcome::Inserted })
}

// ─── Plans ───────────────────────────────────────────────────────────────────

/// Find the plan for `(transport, link_id)`, creating it if absent.
pub fn resolve_plan<X>(
  tx: &mut X,
  transport: &TransportCode,
  link_id: LinkId,
  coordinates: &str,
) -> Result<Resolution<PlanId>, ResolveError<X::Error>>
where
  X: SurveyTx + ?Sized,
{
  if let Some(id) = tx.find_plan(transport, link_id)? {
    return Ok(Resolution { id, created: false });
  }

  let outcome = tx.insert_plan(transport, link_id, coordinates)?;
  if outcome == InsertOutcome::Conflict {
    debug!(%transport, %link_id, "plan created concurrently; adopting existing row");
  }

  let id = tx
    .find_plan(transport, link_id)?
    .ok_or(ResolveError::NotFound(Entity::Plan))?;
  Ok(Resolution { id, created: outcome == InsertOutcome::Inserted })
}

// ─── Associations ────────────────────────────────────────────────────────────

/// Make `study` the one study of `plan_id`.
///
/// A repeat of the current association writes nothing. A different current
/// study is deleted without archival.
pub fn reconcile<X>(
  tx: &mut X,
  plan_id: PlanId,
  study: &StudyCode,
  at: DateTime<Utc>,
) -> Result<Reconciliation, X::Error>
where
  X: SurveyTx + ?Sized,
{
  match tx.study_for_plan(plan_id)? {
    None => {
      tx.insert_association(plan_id, study, at)?;
      Ok(Reconciliation::Created)
    }
    Some(current) if &current == study => Ok(Reconciliation::AlreadyLinked),
    Some(previous) => {
      tx.delete_association(plan_id)?;
      tx.insert_association(plan_id, study, at)?;
      info!(%plan_id, %previous, %study, "replaced plan study");
      Ok(Reconciliation::Replaced { previous })
    }
  }
}
