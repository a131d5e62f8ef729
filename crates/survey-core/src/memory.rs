//! In-memory store used by this crate's tests.
//!
//! `transact` runs the work against a scratch copy and swaps it in on
//! success, which gives all-or-nothing semantics without a database. A few
//! knobs let tests force the interleavings and failures a real backend only
//! shows under load.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::Mutex,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  code::{StudyCode, TransportCode},
  dimension::{Dimensions, LinkQuery},
  link::{Link, LinkId, NormalizedLinkKey},
  plan::{Association, Plan, PlanId},
  store::{InsertOutcome, SurveyStore, SurveyTx},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("injected failure: {0}")]
  Injected(&'static str),
  #[error("store mutex poisoned")]
  Poisoned,
}

#[derive(Debug, Clone)]
pub struct MemLink {
  pub id:          LinkId,
  pub key:         NormalizedLinkKey,
  pub coordinates: Option<String>,
  pub dimensions:  Option<Dimensions>,
}

#[derive(Debug, Clone)]
pub struct MemPlan {
  pub id:          PlanId,
  pub transport:   TransportCode,
  pub link_id:     LinkId,
  pub coordinates: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
  pub links:        Vec<MemLink>,
  pub plans:        Vec<MemPlan>,
  pub studies:      BTreeSet<StudyCode>,
  pub transports:   BTreeSet<TransportCode>,
  pub associations: BTreeMap<PlanId, (StudyCode, DateTime<Utc>)>,

  /// Number of upcoming `find_link` calls that miss regardless of contents.
  pub stale_link_reads:  usize,
  /// Report link inserts as successful without storing them.
  pub drop_link_inserts: bool,
  /// Report plan inserts as successful without storing them.
  pub drop_plan_inserts: bool,
  pub fail_plan_inserts: bool,
}

fn same_key(a: &NormalizedLinkKey, b: &NormalizedLinkKey) -> bool {
  a.origin == b.origin
    && a.category_code == b.category_code
    && a.direction == b.direction
    && a.target == b.target
}

impl SurveyTx for MemoryState {
  type Error = MemoryError;

  fn insert_study_if_absent(&mut self, code: &StudyCode) -> Result<bool, MemoryError> {
    Ok(self.studies.insert(code.clone()))
  }

  fn insert_transport_if_absent(
    &mut self,
    code: &TransportCode,
  ) -> Result<bool, MemoryError> {
    Ok(self.transports.insert(code.clone()))
  }

  fn find_link(&mut self, key: &NormalizedLinkKey) -> Result<Option<LinkId>, MemoryError> {
    if self.stale_link_reads > 0 {
      self.stale_link_reads -= 1;
      return Ok(None);
    }
    Ok(
      self
        .links
        .iter()
        .filter(|l| same_key(&l.key, key))
        .map(|l| l.id)
        .max(),
    )
  }

  fn insert_link(
    &mut self,
    key: &NormalizedLinkKey,
    coordinates: Option<&str>,
  ) -> Result<InsertOutcome, MemoryError> {
    if self.links.iter().any(|l| same_key(&l.key, key)) {
      return Ok(InsertOutcome::Conflict);
    }
    if !self.drop_link_inserts {
      let id = LinkId(self.links.len() as i64 + 1);
      self.links.push(MemLink {
        id,
        key: key.clone(),
        coordinates: coordinates.map(str::to_owned),
        dimensions: None,
      });
    }
    Ok(InsertOutcome::Inserted)
  }

  fn set_dimensions(
    &mut self,
    link_id: LinkId,
    dimensions: &Dimensions,
  ) -> Result<usize, MemoryError> {
    match self.links.iter_mut().find(|l| l.id == link_id) {
      Some(link) => {
        link.dimensions = Some(dimensions.clone());
        Ok(1)
      }
      None => Ok(0),
    }
  }

  fn find_plan(
    &mut self,
    transport: &TransportCode,
    link_id: LinkId,
  ) -> Result<Option<PlanId>, MemoryError> {
    Ok(
      self
        .plans
        .iter()
        .find(|p| &p.transport == transport && p.link_id == link_id)
        .map(|p| p.id),
    )
  }

  fn insert_plan(
    &mut self,
    transport: &TransportCode,
    link_id: LinkId,
    coordinates: &str,
  ) -> Result<InsertOutcome, MemoryError> {
    if self.fail_plan_inserts {
      return Err(MemoryError::Injected("plan insert"));
    }
    if self.find_plan(transport, link_id)?.is_some() {
      return Ok(InsertOutcome::Conflict);
    }
    if self.drop_plan_inserts {
      return Ok(InsertOutcome::Inserted);
    }
    let id = PlanId(self.plans.len() as i64 + 1);
    self.plans.push(MemPlan {
      id,
      transport: transport.clone(),
      link_id,
      coordinates: coordinates.to_owned(),
    });
    Ok(InsertOutcome::Inserted)
  }

  fn study_for_plan(&mut self, plan_id: PlanId) -> Result<Option<StudyCode>, MemoryError> {
    Ok(self.associations.get(&plan_id).map(|(s, _)| s.clone()))
  }

  fn insert_association(
    &mut self,
    plan_id: PlanId,
    study: &StudyCode,
    at: DateTime<Utc>,
  ) -> Result<(), MemoryError> {
    if self.associations.contains_key(&plan_id) {
      return Err(MemoryError::Injected("duplicate association"));
    }
    self.associations.insert(plan_id, (study.clone(), at));
    Ok(())
  }

  fn delete_association(&mut self, plan_id: PlanId) -> Result<usize, MemoryError> {
    Ok(usize::from(self.associations.remove(&plan_id).is_some()))
  }
}

/// A [`SurveyStore`] over a mutex-guarded [`MemoryState`].
#[derive(Default)]
pub struct MemoryStore {
  pub state: Mutex<MemoryState>,
}

impl MemoryStore {
  pub fn snapshot(&self) -> MemoryState {
    self.state.lock().map(|s| s.clone()).unwrap_or_default()
  }
}

impl SurveyStore for MemoryStore {
  type Error = MemoryError;

  async fn transact<T, E, F>(&self, work: F) -> Result<T, E>
  where
    T: Send + 'static,
    E: From<MemoryError> + Send + 'static,
    F: FnOnce(&mut dyn SurveyTx<Error = MemoryError>) -> Result<T, E> + Send + 'static,
  {
    let mut guard = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    let mut scratch = guard.clone();
    let out = work(&mut scratch)?;
    *guard = scratch;
    Ok(out)
  }

  async fn get_link(&self, id: LinkId) -> Result<Option<Link>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(state.links.iter().find(|l| l.id == id).map(mem_link))
  }

  async fn search_links(&self, query: LinkQuery) -> Result<Vec<Link>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(state.links.iter().filter(|l| matches(&query, &l.key)).map(mem_link).collect())
  }

  async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(state.plans.iter().find(|p| p.id == id).map(mem_plan))
  }

  async fn association_for_plan(
    &self,
    id: PlanId,
  ) -> Result<Option<Association>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(state.associations.get(&id).map(|(study, at)| Association {
      plan_id:       id,
      study:         study.clone(),
      associated_at: *at,
    }))
  }

  async fn plans_for_study(&self, study: StudyCode) -> Result<Vec<Plan>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(
      state
        .plans
        .iter()
        .filter(|p| state.associations.get(&p.id).is_some_and(|(s, _)| s == &study))
        .map(mem_plan)
        .collect(),
    )
  }

  async fn list_studies(&self) -> Result<Vec<StudyCode>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(state.studies.iter().cloned().collect())
  }

  async fn list_transports(&self) -> Result<Vec<TransportCode>, MemoryError> {
    let state = self.state.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(state.transports.iter().cloned().collect())
  }
}

fn matches(query: &LinkQuery, key: &NormalizedLinkKey) -> bool {
  query.origin.as_ref().is_none_or(|o| o == &key.origin)
    && query.direction.is_none_or(|d| d == key.direction)
    && query.category_code.as_ref().is_none_or(|c| c == &key.category_code)
    && query.target.as_ref().is_none_or(|t| t == &key.target)
}

fn mem_link(l: &MemLink) -> Link {
  Link {
    link_id:       l.id,
    category_code: l.key.category_code.clone(),
    direction:     l.key.direction,
    origin:        l.key.origin.clone(),
    target:        l.key.target.clone(),
    coordinates:   l.coordinates.clone(),
    dimensions:    l.dimensions.clone(),
  }
}

fn mem_plan(p: &MemPlan) -> Plan {
  Plan {
    plan_id:     p.id,
    transport:   p.transport.clone(),
    link_id:     p.link_id,
    coordinates: Some(p.coordinates.clone()),
  }
}
