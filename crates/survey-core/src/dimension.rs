//! Link measurements, and exact-match link search.
//!
//! A dimension record finds or creates the link for its key and stores a
//! length and width on it. Updating the measurements of a link re-stamps
//! `measured_at`. Both run as one unit of work, like a record submission.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  code::RoadCode,
  error::{Entity, Field, ResolveError, SubmitError, ValidationError},
  link::{
    Category, CategoryCodes, Direction, Link, LinkId, LinkTarget, Milepost, NormalizedLinkKey,
    canonical_decimal, normalize,
  },
  record::{check_target, present},
  resolve::{Resolution, resolve_link},
  store::SurveyStore,
};

// ─── Measurements ────────────────────────────────────────────────────────────

/// A non-negative decimal measurement in metres, in canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Measure(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0:?} is not a non-negative decimal number")]
pub struct ParseMeasureError(pub String);

impl Measure {
  pub fn parse(raw: &str) -> Result<Self, ParseMeasureError> {
    canonical_decimal(raw)
      .map(Self)
      .ok_or_else(|| ParseMeasureError(raw.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Measure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} m", self.0) }
}

impl TryFrom<String> for Measure {
  type Error = ParseMeasureError;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<Measure> for String {
  fn from(m: Measure) -> String { m.0 }
}

/// The latest measurements of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
  pub length:      Measure,
  pub width:       Measure,
  pub measured_at: DateTime<Utc>,
}

/// Length and width as typed into the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
  pub length: String,
  pub width:  String,
}

impl Measurements {
  /// Both values are required; presence is checked before either is parsed.
  pub fn validate(&self) -> Result<(Measure, Measure), ValidationError> {
    if self.length.trim().is_empty() {
      return Err(ValidationError::MissingField(Field::Length));
    }
    if self.width.trim().is_empty() {
      return Err(ValidationError::MissingField(Field::Width));
    }
    Ok((measure(Field::Length, &self.length)?, measure(Field::Width, &self.width)?))
  }

  fn stamp(&self, at: DateTime<Utc>) -> Result<Dimensions, ValidationError> {
    let (length, width) = self.validate()?;
    Ok(Dimensions { length, width, measured_at: at })
  }
}

fn measure(field: Field, raw: &str) -> Result<Measure, ValidationError> {
  Measure::parse(raw).map_err(|_| ValidationError::InvalidMeasure(field, raw.trim().to_owned()))
}

// ─── Dimension record ────────────────────────────────────────────────────────

/// Raw input of the dimension form: a link key plus its measurements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionRecord {
  pub origin_road:      String,
  pub destination_road: Option<String>,
  pub milepost:         Option<String>,
  pub direction:        Option<Direction>,
  pub category:         Option<Category>,
  pub length:           String,
  pub width:            String,
}

/// A dimension record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDimensionRecord {
  pub key:        NormalizedLinkKey,
  pub dimensions: Dimensions,
}

impl DimensionRecord {
  /// Check the record and normalise it, stamping the measurements with `at`.
  pub fn validate(
    &self,
    policy: CategoryCodes,
    at: DateTime<Utc>,
  ) -> Result<ValidDimensionRecord, ValidationError> {
    use ValidationError::MissingField;

    if self.origin_road.trim().is_empty() {
      return Err(MissingField(Field::OriginRoad));
    }
    let direction = self.direction.ok_or(MissingField(Field::Direction))?;
    let category = self.category.ok_or(MissingField(Field::Category))?;
    let measurements = Measurements { length: self.length.clone(), width: self.width.clone() };
    measurements.validate()?;

    let destination = present(self.destination_road.as_ref());
    let milepost = present(self.milepost.as_ref());
    check_target(category, destination, milepost)?;

    let key = normalize(category, direction, &self.origin_road, destination, milepost, policy)?;
    Ok(ValidDimensionRecord { key, dimensions: measurements.stamp(at)? })
  }
}

/// Where a dimension record landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionOutcome {
  pub link:       Resolution<LinkId>,
  pub dimensions: Dimensions,
}

/// Store the measurements of `record` on its link, creating the link if no
/// link has that key yet. A link created here has no coordinates.
pub async fn record_dimensions<S: SurveyStore>(
  store: &S,
  record: &DimensionRecord,
  policy: CategoryCodes,
) -> Result<DimensionOutcome, SubmitError<S::Error>> {
  let valid = record.validate(policy, Utc::now()).map_err(SubmitError::Rejected)?;

  let outcome = store
    .transact(move |tx| -> Result<DimensionOutcome, ResolveError<S::Error>> {
      let link = resolve_link(tx, &valid.key, None)?;
      tx.set_dimensions(link.id, &valid.dimensions)?;
      Ok(DimensionOutcome { link, dimensions: valid.dimensions })
    })
    .await?;

  debug!(
    link = %outcome.link.id,
    created = outcome.link.created,
    length = %outcome.dimensions.length,
    width = %outcome.dimensions.width,
    "recorded link dimensions"
  );
  Ok(outcome)
}

/// Overwrite the measurements of an existing link and re-stamp them.
pub async fn update_dimensions<S: SurveyStore>(
  store: &S,
  link_id: LinkId,
  measurements: &Measurements,
) -> Result<Dimensions, SubmitError<S::Error>> {
  let dimensions = measurements.stamp(Utc::now()).map_err(SubmitError::Rejected)?;

  let stored = dimensions.clone();
  store
    .transact(move |tx| -> Result<(), ResolveError<S::Error>> {
      match tx.set_dimensions(link_id, &stored)? {
        0 => Err(ResolveError::NotFound(Entity::Link)),
        _ => Ok(()),
      }
    })
    .await?;

  info!(%link_id, length = %dimensions.length, width = %dimensions.width, "updated link dimensions");
  Ok(dimensions)
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Search criteria as typed into the form. Blank fields match anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSearch {
  pub origin_road:      Option<String>,
  pub destination_road: Option<String>,
  pub milepost:         Option<String>,
  pub direction:        Option<Direction>,
  pub category:         Option<Category>,
}

/// Normalised exact-match criteria. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkQuery {
  pub origin:        Option<RoadCode>,
  pub direction:     Option<Direction>,
  pub category_code: Option<String>,
  pub target:        Option<LinkTarget>,
}

impl LinkQuery {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

impl LinkSearch {
  /// Normalise the criteria the way a record's key is normalised.
  ///
  /// The destination road only narrows a junction search; otherwise the
  /// milepost is used when given.
  pub fn to_query(&self, policy: CategoryCodes) -> Result<LinkQuery, ValidationError> {
    let destination = present(self.destination_road.as_ref()).and_then(RoadCode::new);
    let milepost = present(self.milepost.as_ref());

    let target = match (self.category, destination, milepost) {
      (Some(category), Some(road), _) if category.uses_destination() => {
        Some(LinkTarget::Destination(road))
      }
      (_, _, Some(raw)) => Some(LinkTarget::Milepost(
        Milepost::parse(raw).map_err(|e| ValidationError::InvalidMilepost(e.0))?,
      )),
      _ => None,
    };

    let query = LinkQuery {
      origin: present(self.origin_road.as_ref()).and_then(RoadCode::new),
      direction: self.direction,
      category_code: self.category.map(|c| c.code(policy)),
      target,
    };
    if query.is_empty() {
      return Err(ValidationError::NoSearchCriteria);
    }
    Ok(query)
  }
}

/// Validate `search` and return the links matching it exactly.
pub async fn find_links<S: SurveyStore>(
  store: &S,
  search: &LinkSearch,
  policy: CategoryCodes,
) -> Result<Vec<Link>, SubmitError<S::Error>> {
  let query = search.to_query(policy).map_err(SubmitError::Rejected)?;
  let links = store.search_links(query).await.map_err(SubmitError::Store)?;
  debug!(found = links.len(), "link search");
  Ok(links)
}
