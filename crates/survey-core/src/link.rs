//! Links (canonical road-network elements) and the natural key that
//! deduplicates them.
//!
//! A link is identified by its origin road, category, direction, and either a
//! destination road (junctions) or a milepost (everything else). Raw form input
//! is turned into a [`NormalizedLinkKey`] by [`normalize`] before any store
//! access happens.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _};
use thiserror::Error;

use crate::{
  code::RoadCode,
  dimension::Dimensions,
  error::{Field, ValidationError},
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned identity of a link.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LinkId(pub i64);

impl fmt::Display for LinkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// The closed set of link categories offered by the survey form.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
  Junction,
  Roundabout,
  Clearance,
  Curve,
  Exit,
}

impl Category {
  /// Junctions are addressed by destination road; every other category by
  /// milepost.
  pub fn uses_destination(self) -> bool { matches!(self, Self::Junction) }

  /// The code stored in the `category` column under `policy`.
  pub fn code(self, policy: CategoryCodes) -> String {
    match policy {
      CategoryCodes::Truncated => {
        self.to_string().to_uppercase().chars().take(3).collect()
      }
      CategoryCodes::Explicit => self.explicit_code().to_owned(),
    }
  }

  fn explicit_code(self) -> &'static str {
    match self {
      Self::Junction => "JCT",
      Self::Roundabout => "RBT",
      Self::Clearance => "CLR",
      Self::Curve => "CRV",
      Self::Exit => "EXT",
    }
  }

  /// Reverse of [`Category::code`]. Under [`CategoryCodes::Truncated`] two
  /// categories sharing a prefix would be indistinguishable; the first in
  /// declaration order wins.
  pub fn from_code(code: &str, policy: CategoryCodes) -> Option<Self> {
    Self::iter().find(|c| c.code(policy) == code)
  }
}

/// How a [`Category`] is mapped to its three-character storage code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryCodes {
  /// Upper-case the category name and keep the first three characters.
  /// Compatible with existing data; collides for names sharing a prefix.
  #[default]
  Truncated,
  /// Fixed per-category mapping table with no shared codes.
  Explicit,
}

// ─── Direction ───────────────────────────────────────────────────────────────

/// One end of a [`Direction`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Heading {
  North,
  South,
  East,
  West,
}

/// Travel direction across a link: one of the sixteen ordered heading pairs.
/// Rendered and stored as `"NORTH -> SOUTH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Direction {
  pub from: Heading,
  pub to:   Heading,
}

impl Direction {
  pub fn new(from: Heading, to: Heading) -> Self { Self { from, to } }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.from, self.to)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised direction {0:?}; expected e.g. \"NORTH -> SOUTH\"")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
  type Err = ParseDirectionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || ParseDirectionError(s.to_owned());
    let (from, to) = s.split_once("->").ok_or_else(err)?;
    Ok(Direction {
      from: from.trim().parse().map_err(|_| err())?,
      to:   to.trim().parse().map_err(|_| err())?,
    })
  }
}

impl TryFrom<String> for Direction {
  type Error = ParseDirectionError;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Direction> for String {
  fn from(d: Direction) -> String { d.to_string() }
}

// ─── Milepost ────────────────────────────────────────────────────────────────

/// Canonical text of a non-negative decimal.
///
/// Either `.` or `,` is accepted as the decimal separator and a leading `+` is
/// allowed. Leading integer zeros and trailing fractional zeros are dropped.
/// Negative values and exponents are rejected.
pub(crate) fn canonical_decimal(raw: &str) -> Option<String> {
  let text = raw.trim().replace(',', ".");
  let text = text.strip_prefix('+').unwrap_or(&text);

  let (int, frac) = text.split_once('.').unwrap_or((text, ""));
  let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
  if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
    return None;
  }

  let int = int.trim_start_matches('0');
  let int = if int.is_empty() { "0" } else { int };
  let frac = frac.trim_end_matches('0');

  Some(if frac.is_empty() {
    int.to_owned()
  } else {
    format!("{int}.{frac}")
  })
}

/// A non-negative decimal milepost in canonical text form (see
/// [`canonical_decimal`]), so `"012,50"` and `"12.5"` are the same milepost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Milepost(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0:?} is not a decimal number")]
pub struct ParseMilepostError(pub String);

impl Milepost {
  pub fn parse(raw: &str) -> Result<Self, ParseMilepostError> {
    canonical_decimal(raw)
      .map(Self)
      .ok_or_else(|| ParseMilepostError(raw.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Milepost {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for Milepost {
  type Error = ParseMilepostError;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<Milepost> for String {
  fn from(m: Milepost) -> String { m.0 }
}

// ─── Natural key ─────────────────────────────────────────────────────────────

/// Where along the origin road a link sits. Exactly one of the two is ever
/// populated, chosen by the category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LinkTarget {
  Destination(RoadCode),
  Milepost(Milepost),
}

/// The deduplication key of a link, built by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedLinkKey {
  pub origin:        RoadCode,
  pub category:      Category,
  /// Three-character storage code for `category`.
  pub category_code: String,
  pub direction:     Direction,
  pub target:        LinkTarget,
}

impl NormalizedLinkKey {
  pub fn destination(&self) -> Option<&RoadCode> {
    match &self.target {
      LinkTarget::Destination(road) => Some(road),
      LinkTarget::Milepost(_) => None,
    }
  }

  pub fn milepost(&self) -> Option<&Milepost> {
    match &self.target {
      LinkTarget::Milepost(m) => Some(m),
      LinkTarget::Destination(_) => None,
    }
  }
}

/// Build the natural key for a link from raw form input.
///
/// The field that does not apply to `category` is ignored: a junction never
/// carries a milepost and other categories never carry a destination road.
pub fn normalize(
  category: Category,
  direction: Direction,
  origin: &str,
  destination: Option<&str>,
  milepost: Option<&str>,
  policy: CategoryCodes,
) -> Result<NormalizedLinkKey, ValidationError> {
  let origin =
    RoadCode::new(origin).ok_or(ValidationError::MissingField(Field::OriginRoad))?;

  let target = if category.uses_destination() {
    let road = destination
      .and_then(RoadCode::new)
      .ok_or(ValidationError::DestinationRequired)?;
    LinkTarget::Destination(road)
  } else {
    let raw = milepost
      .filter(|m| !m.trim().is_empty())
      .ok_or(ValidationError::MilepostRequired(category))?;
    let milepost = Milepost::parse(raw)
      .map_err(|e| ValidationError::InvalidMilepost(e.0))?;
    LinkTarget::Milepost(milepost)
  };

  Ok(NormalizedLinkKey {
    origin,
    category,
    category_code: category.code(policy),
    direction,
    target,
  })
}

// ─── Stored link ─────────────────────────────────────────────────────────────

/// A link as persisted. Coordinates are whatever the first submission for
/// the key supplied; links created by a dimension record carry none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
  pub link_id:       LinkId,
  pub category_code: String,
  pub direction:     Direction,
  pub origin:        RoadCode,
  pub target:        LinkTarget,
  pub coordinates:   Option<String>,
  /// Latest measurements, if the link has been measured.
  pub dimensions:    Option<Dimensions>,
}
