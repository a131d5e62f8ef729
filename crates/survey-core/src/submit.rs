//! Record submission, the public entry point of the protocol.
//!
//! A submission moves through
//! `Received → Validated → LinkResolved → PlanResolved →
//! AssociationReconciled → Reported`, ending early in `Rejected` (bad input,
//! before any store access) or `Failed` (any store step). Everything after
//! validation runs in one unit of work, so a failed submission leaves the
//! store as it found it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, warn};

use crate::{
  error::{ResolveError, SubmitError},
  link::{CategoryCodes, LinkId},
  plan::{PlanId, Reconciliation},
  record::{SurveyRecord, ValidRecord},
  resolve::{Resolution, ensure_study, ensure_transport, reconcile, resolve_link, resolve_plan},
  store::{SurveyStore, SurveyTx},
};

/// Progress of a submission through the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
  Received,
  Validated,
  LinkResolved,
  PlanResolved,
  AssociationReconciled,
  Reported,
  Rejected,
  Failed,
}

/// What a successful submission found, created and changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
  pub link:              Resolution<LinkId>,
  pub plan:              Resolution<PlanId>,
  pub study_created:     bool,
  pub transport_created: bool,
  pub association:       Reconciliation,
}

impl Submission {
  /// `true` when the submission duplicated what was already recorded. Links,
  /// plans, studies and transports may still have been created.
  pub fn is_noop(&self) -> bool { !self.association.is_mutation() }
}

/// Validate `record` and run it through the protocol against `store`.
pub async fn submit_record<S: SurveyStore>(
  store: &S,
  record: &SurveyRecord,
  policy: CategoryCodes,
) -> Result<Submission, SubmitError<S::Error>> {
  debug!(stage = %Stage::Received, origin = %record.origin_road.trim());

  let valid = record.validate(policy).map_err(|e| {
    debug!(stage = %Stage::Rejected, reason = %e);
    SubmitError::Rejected(e)
  })?;
  debug!(stage = %Stage::Validated, origin = %valid.key.origin);

  let submission = store
    .transact(move |tx| run(tx, &valid))
    .await
    .map_err(SubmitError::from)?;

  debug!(
    stage = %Stage::Reported,
    link = %submission.link.id,
    plan = %submission.plan.id,
    noop = submission.is_noop(),
  );
  Ok(submission)
}

/// The store-side steps, in order. Each step's key depends on the identity
/// assigned by the previous one.
fn run<E>(
  tx: &mut dyn SurveyTx<Error = E>,
  record: &ValidRecord,
) -> Result<Submission, ResolveError<E>>
where
  E: std::error::Error + Send + Sync + 'static,
{
  let mut stage = Stage::Validated;
  let result = (|| -> Result<Submission, ResolveError<E>> {
    let study_created = ensure_study(tx, &record.study)?;
    let transport_created = ensure_transport(tx, &record.transport)?;

    let link = resolve_link(tx, &record.key, Some(record.coordinates.as_str()))?;
    stage = Stage::LinkResolved;
    debug!(%stage, link = %link.id, created = link.created);

    let plan = resolve_plan(tx, &record.transport, link.id, &record.coordinates)?;
    stage = Stage::PlanResolved;
    debug!(%stage, plan = %plan.id, created = plan.created);

    let association = reconcile(tx, plan.id, &record.study, Utc::now())?;
    stage = Stage::AssociationReconciled;
    debug!(%stage, ?association);

    Ok(Submission {
      link,
      plan,
      study_created,
      transport_created,
      association,
    })
  })();

  if let Err(e) = &result {
    warn!(stage = %Stage::Failed, after = %stage, error = %e, "submission failed");
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    code::StudyCode,
    error::{Entity, Field, ValidationError},
    link::{Category, Direction, Heading},
    memory::MemoryStore,
  };

  fn junction(study: &str) -> SurveyRecord {
    SurveyRecord {
      origin_road:      "A-7".into(),
      destination_road: Some("N-340".into()),
      milepost:         None,
      direction:        Some(Direction::new(Heading::North, Heading::South)),
      category:         Some(Category::Junction),
      transport_code:   "TR1".into(),
      study_code:       study.into(),
      coordinates:      "36.7,-4.4".into(),
    }
  }

  fn curve(milepost: &str, coordinates: &str) -> SurveyRecord {
    SurveyRecord {
      destination_road: None,
      milepost: Some(milepost.into()),
      category: Some(Category::Curve),
      coordinates: coordinates.into(),
      ..junction("E1")
    }
  }

  #[tokio::test]
  async fn first_submission_creates_everything() {
    let store = MemoryStore::default();
    let s = submit_record(&store, &junction("E1"), CategoryCodes::Truncated)
      .await
      .unwrap();

    assert!(s.link.created && s.plan.created && s.study_created && s.transport_created);
    assert_eq!(s.association, Reconciliation::Created);
    assert!(!s.is_noop());
  }

  #[tokio::test]
  async fn repeat_submission_is_a_noop() {
    let store = MemoryStore::default();
    let first = submit_record(&store, &junction("E1"), CategoryCodes::Truncated)
      .await
      .unwrap();
    let second = submit_record(&store, &junction("e1"), CategoryCodes::Truncated)
      .await
      .unwrap();

    assert!(second.is_noop());
    assert_eq!(first.link.id, second.link.id);
    assert_eq!(first.plan.id, second.plan.id);
    assert!(!second.link.created && !second.plan.created);
    assert_eq!(store.snapshot().associations.len(), 1);
  }

  #[tokio::test]
  async fn new_study_replaces_previous() {
    let store = MemoryStore::default();
    submit_record(&store, &junction("A"), CategoryCodes::Truncated).await.unwrap();
    let s = submit_record(&store, &junction("B"), CategoryCodes::Truncated)
      .await
      .unwrap();

    let previous = StudyCode::new("A").unwrap();
    assert_eq!(s.association, Reconciliation::Replaced { previous });
    let assoc = store.association_for_plan(s.plan.id).await.unwrap().unwrap();
    assert_eq!(assoc.study.as_str(), "B");
    assert_eq!(store.snapshot().associations.len(), 1);
  }

  #[tokio::test]
  async fn rejected_junction_writes_nothing() {
    let store = MemoryStore::default();
    let mut record = junction("E1");
    record.destination_road = Some("".into());

    let err = submit_record(&store, &record, CategoryCodes::Truncated)
      .await
      .unwrap_err();

    assert!(err.is_rejection());
    assert!(matches!(err, SubmitError::Rejected(ValidationError::DestinationRequired)));
    let state = store.snapshot();
    assert!(state.links.is_empty() && state.studies.is_empty() && state.transports.is_empty());
  }

  #[tokio::test]
  async fn missing_field_is_rejected() {
    let store = MemoryStore::default();
    let mut record = junction("E1");
    record.transport_code = " ".into();
    let err = submit_record(&store, &record, CategoryCodes::Truncated)
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      SubmitError::Rejected(ValidationError::MissingField(Field::TransportCode))
    ));
  }

  #[tokio::test]
  async fn coordinates_change_does_not_touch_existing_link() {
    let store = MemoryStore::default();
    let first = submit_record(&store, &curve("12,5", "first"), CategoryCodes::Truncated)
      .await
      .unwrap();
    submit_record(&store, &curve("12.5", "second"), CategoryCodes::Truncated)
      .await
      .unwrap();

    let link = store.get_link(first.link.id).await.unwrap().unwrap();
    assert_eq!(link.coordinates.as_deref(), Some("first"));
    assert_eq!(store.snapshot().links.len(), 1);
  }

  #[tokio::test]
  async fn store_failure_rolls_back_the_whole_submission() {
    let store = MemoryStore::default();
    store.state.lock().unwrap().fail_plan_inserts = true;

    let err = submit_record(&store, &junction("E1"), CategoryCodes::Truncated)
      .await
      .unwrap_err();

    assert!(matches!(err, SubmitError::Store(_)));
    let state = store.snapshot();
    assert!(state.links.is_empty(), "link step must be rolled back");
    assert!(state.studies.is_empty());
  }

  #[tokio::test]
  async fn missing_row_after_insert_is_not_found() {
    let store = MemoryStore::default();
    store.state.lock().unwrap().drop_link_inserts = true;

    let err = submit_record(&store, &junction("E1"), CategoryCodes::Truncated)
      .await
      .unwrap_err();
    assert!(matches!(err, SubmitError::NotFound(Entity::Link)));
  }

  #[tokio::test]
  async fn missing_plan_after_insert_is_not_found() {
    let store = MemoryStore::default();
    store.state.lock().unwrap().drop_plan_inserts = true;

    let err = submit_record(&store, &junction("E1"), CategoryCodes::Truncated)
      .await
      .unwrap_err();
    assert!(matches!(err, SubmitError::NotFound(Entity::Plan)));
    assert!(store.snapshot().links.is_empty(), "link step must be rolled back");
  }

  #[tokio::test]
  async fn plans_for_study_follow_reassignment() {
    let store = MemoryStore::default();
    let a = submit_record(&store, &junction("A"), CategoryCodes::Truncated).await.unwrap();
    submit_record(&store, &curve("4", "c"), CategoryCodes::Truncated).await.unwrap();
    submit_record(&store, &junction("B"), CategoryCodes::Truncated).await.unwrap();

    let for_a = store.plans_for_study(StudyCode::new("A").unwrap()).await.unwrap();
    let for_b = store.plans_for_study(StudyCode::new("B").unwrap()).await.unwrap();
    assert!(for_a.is_empty());
    assert_eq!(for_b.len(), 1);
    assert_eq!(for_b[0].plan_id, a.plan.id);
  }
}
