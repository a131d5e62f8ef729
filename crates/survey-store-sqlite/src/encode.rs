//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Directions use their display
//! form (`NORTH -> SOUTH`). Mileposts are stored in canonical decimal text so
//! equal values compare equal in SQL.

use chrono::{DateTime, Utc};
use survey_core::{
  code::{RoadCode, StudyCode, TransportCode},
  dimension::{Dimensions, Measure},
  link::{Direction, Link, LinkId, LinkTarget, Milepost, NormalizedLinkKey},
  plan::{Association, Plan, PlanId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Codes ───────────────────────────────────────────────────────────────────

fn invalid(column: &'static str, value: &str) -> Error {
  Error::Decode { column, value: value.to_owned() }
}

pub fn decode_road(column: &'static str, s: &str) -> Result<RoadCode> {
  RoadCode::new(s).ok_or_else(|| invalid(column, s))
}

pub fn decode_study(s: &str) -> Result<StudyCode> {
  StudyCode::new(s).ok_or_else(|| invalid("study_code", s))
}

pub fn decode_transport(s: &str) -> Result<TransportCode> {
  TransportCode::new(s).ok_or_else(|| invalid("transport_code", s))
}

// ─── Direction ───────────────────────────────────────────────────────────────

pub fn encode_direction(d: Direction) -> String { d.to_string() }

pub fn decode_direction(s: &str) -> Result<Direction> {
  s.parse().map_err(|_| invalid("direction", s))
}

// ─── Link key ────────────────────────────────────────────────────────────────

/// Column values for a natural key, in `links` column order.
pub struct EncodedLinkKey {
  pub category:    String,
  pub direction:   String,
  pub origin_road: String,
  pub destination: Option<String>,
  pub milepost:    Option<String>,
}

pub fn encode_link_key(key: &NormalizedLinkKey) -> EncodedLinkKey {
  EncodedLinkKey {
    category:    key.category_code.clone(),
    direction:   encode_direction(key.direction),
    origin_road: key.origin.as_str().to_owned(),
    destination: key.destination().map(|r| r.as_str().to_owned()),
    milepost:    key.milepost().map(|m| m.as_str().to_owned()),
  }
}

fn decode_target(destination: Option<String>, milepost: Option<String>) -> Result<LinkTarget> {
  match (destination, milepost) {
    (Some(road), None) => Ok(LinkTarget::Destination(decode_road("destination_road", &road)?)),
    (None, Some(m)) => Milepost::parse(&m)
      .map(LinkTarget::Milepost)
      .map_err(|_| invalid("milepost", &m)),
    (d, m) => Err(invalid(
      "destination_road/milepost",
      &format!("{d:?}/{m:?}"),
    )),
  }
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

fn decode_measure(column: &'static str, s: &str) -> Result<Measure> {
  Measure::parse(s).map_err(|_| invalid(column, s))
}

fn decode_dimensions(
  length: Option<String>,
  width: Option<String>,
  measured_at: Option<String>,
) -> Result<Option<Dimensions>> {
  match (length, width, measured_at) {
    (None, None, None) => Ok(None),
    (Some(length), Some(width), Some(at)) => Ok(Some(Dimensions {
      length:      decode_measure("length", &length)?,
      width:       decode_measure("width", &width)?,
      measured_at: decode_dt(&at)?,
    })),
    (l, w, at) => Err(invalid("length/width/measured_at", &format!("{l:?}/{w:?}/{at:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `links` row.
pub struct RawLink {
  pub link_id:          i64,
  pub category:         String,
  pub direction:        String,
  pub origin_road:      String,
  pub destination_road: Option<String>,
  pub milepost:         Option<String>,
  pub coordinates:      Option<String>,
  pub length:           Option<String>,
  pub width:            Option<String>,
  pub measured_at:      Option<String>,
}

impl RawLink {
  pub const COLUMNS: &'static str = "link_id, category, direction, origin_road, \
                                     destination_road, milepost, coordinates, \
                                     length, width, measured_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:          row.get(0)?,
      category:         row.get(1)?,
      direction:        row.get(2)?,
      origin_road:      row.get(3)?,
      destination_road: row.get(4)?,
      milepost:         row.get(5)?,
      coordinates:      row.get(6)?,
      length:           row.get(7)?,
      width:            row.get(8)?,
      measured_at:      row.get(9)?,
    })
  }

  pub fn into_link(self) -> Result<Link> {
    Ok(Link {
      link_id:       LinkId(self.link_id),
      category_code: self.category,
      direction:     decode_direction(&self.direction)?,
      origin:        decode_road("origin_road", &self.origin_road)?,
      target:        decode_target(self.destination_road, self.milepost)?,
      coordinates:   self.coordinates,
      dimensions:    decode_dimensions(self.length, self.width, self.measured_at)?,
    })
  }
}

/// Raw values read directly from a `plans` row.
pub struct RawPlan {
  pub plan_id:        i64,
  pub transport_code: String,
  pub link_id:        i64,
  pub coordinates:    Option<String>,
}

impl RawPlan {
  pub const COLUMNS: &'static str = "p.plan_id, p.transport_code, p.link_id, p.coordinates";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:        row.get(0)?,
      transport_code: row.get(1)?,
      link_id:        row.get(2)?,
      coordinates:    row.get(3)?,
    })
  }

  pub fn into_plan(self) -> Result<Plan> {
    Ok(Plan {
      plan_id:     PlanId(self.plan_id),
      transport:   decode_transport(&self.transport_code)?,
      link_id:     LinkId(self.link_id),
      coordinates: self.coordinates,
    })
  }
}

/// Raw values read directly from a `plan_studies` row.
pub struct RawAssociation {
  pub plan_id:       i64,
  pub study_code:    String,
  pub associated_at: String,
}

impl RawAssociation {
  pub fn into_association(self) -> Result<Association> {
    Ok(Association {
      plan_id:       PlanId(self.plan_id),
      study:         decode_study(&self.study_code)?,
      associated_at: decode_dt(&self.associated_at)?,
    })
  }
}
