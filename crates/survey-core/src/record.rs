//! The survey record submitted by the form layer, and its validation.

use serde::{Deserialize, Serialize};

use crate::{
  code::{StudyCode, TransportCode},
  error::{Field, ValidationError},
  link::{Category, CategoryCodes, Direction, NormalizedLinkKey, normalize},
};

/// Raw input for one submission, exactly as the form captured it.
///
/// Text fields are untrimmed; blank optional fields may arrive as `None` or as
/// an empty string and are treated the same. Absent fields deserialise as
/// blank so that [`SurveyRecord::validate`] reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyRecord {
  pub origin_road:      String,
  pub destination_road: Option<String>,
  pub milepost:         Option<String>,
  pub direction:        Option<Direction>,
  pub category:         Option<Category>,
  pub transport_code:   String,
  pub study_code:       String,
  pub coordinates:      String,
}

/// A record that passed validation. Every field is normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecord {
  pub key:         NormalizedLinkKey,
  pub transport:   TransportCode,
  pub study:       StudyCode,
  pub coordinates: String,
}

pub(crate) fn present(value: Option<&String>) -> Option<&str> {
  value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Junctions need a destination road and no milepost; every other category
/// needs a milepost and no destination road.
pub(crate) fn check_target(
  category: Category,
  destination: Option<&str>,
  milepost: Option<&str>,
) -> Result<(), ValidationError> {
  if category.uses_destination() {
    if destination.is_none() {
      return Err(ValidationError::DestinationRequired);
    }
    if milepost.is_some() {
      return Err(ValidationError::MilepostForbidden);
    }
  } else {
    if milepost.is_none() {
      return Err(ValidationError::MilepostRequired(category));
    }
    if destination.is_some() {
      return Err(ValidationError::DestinationForbidden(category));
    }
  }
  Ok(())
}

impl SurveyRecord {
  /// Check the record and normalise it. Reports the first unmet rule.
  pub fn validate(&self, policy: CategoryCodes) -> Result<ValidRecord, ValidationError> {
    use ValidationError::MissingField;

    if self.origin_road.trim().is_empty() {
      return Err(MissingField(Field::OriginRoad));
    }
    let direction = self.direction.ok_or(MissingField(Field::Direction))?;
    let category = self.category.ok_or(MissingField(Field::Category))?;
    let transport =
      TransportCode::new(&self.transport_code).ok_or(MissingField(Field::TransportCode))?;
    let study = StudyCode::new(&self.study_code).ok_or(MissingField(Field::StudyCode))?;
    let coordinates = self.coordinates.trim();
    if coordinates.is_empty() {
      return Err(MissingField(Field::Coordinates));
    }

    let destination = present(self.destination_road.as_ref());
    let milepost = present(self.milepost.as_ref());
    check_target(category, destination, milepost)?;

    let key = normalize(
      category,
      direction,
      &self.origin_road,
      destination,
      milepost,
      policy,
    )?;

    Ok(ValidRecord {
      key,
      transport,
      study,
      coordinates: coordinates.to_owned(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::link::{Heading, LinkTarget, Milepost};

  fn junction() -> SurveyRecord {
    SurveyRecord {
      origin_road:      "a-7".into(),
      destination_road: Some("n-340".into()),
      milepost:         None,
      direction:        Some(Direction::new(Heading::North, Heading::East)),
      category:         Some(Category::Junction),
      transport_code:   "tr1".into(),
      study_code:       "est-01".into(),
      coordinates:      "36.72,-4.42".into(),
    }
  }

  fn curve(milepost: &str) -> SurveyRecord {
    SurveyRecord {
      destination_road: None,
      milepost: Some(milepost.into()),
      category: Some(Category::Curve),
      ..junction()
    }
  }

  #[test]
  fn valid_junction_is_normalised() {
    let valid = junction().validate(CategoryCodes::Truncated).unwrap();
    assert_eq!(valid.key.origin.as_str(), "A-7");
    assert_eq!(valid.transport.as_str(), "TR1");
    assert_eq!(valid.study.as_str(), "EST-01");
    assert!(matches!(valid.key.target, LinkTarget::Destination(ref r) if r.as_str() == "N-340"));
  }

  #[test]
  fn curve_milepost_with_comma_is_accepted() {
    let valid = curve("12,5").validate(CategoryCodes::Truncated).unwrap();
    assert_eq!(valid.key.milepost(), Some(&Milepost::parse("12.5").unwrap()));
  }

  #[test]
  fn missing_fields_are_reported_in_form_order() {
    let mut r = junction();
    r.origin_road = "  ".into();
    r.coordinates = String::new();
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MissingField(Field::OriginRoad)
    );

    let mut r = junction();
    r.direction = None;
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MissingField(Field::Direction)
    );

    let mut r = junction();
    r.coordinates = " ".into();
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MissingField(Field::Coordinates)
    );
  }

  #[test]
  fn junction_rules() {
    let mut r = junction();
    r.destination_road = Some(String::new());
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::DestinationRequired
    );

    let mut r = junction();
    r.milepost = Some("4".into());
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MilepostForbidden
    );
  }

  #[test]
  fn non_junction_rules() {
    let mut r = curve("  ");
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MilepostRequired(Category::Curve)
    );

    r = curve("3");
    r.destination_road = Some("N-1".into());
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::DestinationForbidden(Category::Curve)
    );

    assert_eq!(
      curve("3.x").validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::InvalidMilepost("3.x".into())
    );
  }

  #[test]
  fn record_deserialises_from_form_json() {
    let json = r#"{
      "origin_road": "A-7",
      "milepost": "10,25",
      "direction": "south -> west",
      "category": "exit",
      "transport_code": "TR1",
      "study_code": "E1",
      "coordinates": "1,2"
    }"#;
    let r: SurveyRecord = serde_json::from_str(json).unwrap();
    assert_eq!(r.direction, Some(Direction::new(Heading::South, Heading::West)));
    assert!(r.validate(CategoryCodes::Truncated).is_ok());
  }

  #[test]
  fn absent_json_fields_reach_validation() {
    let json = r#"{
      "origin_road": "A-7",
      "destination_road": "N-340",
      "direction": "NORTH -> SOUTH",
      "category": "junction",
      "transport_code": "TR1",
      "study_code": "E1"
    }"#;
    let r: SurveyRecord = serde_json::from_str(json).unwrap();
    assert_eq!(
      r.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MissingField(Field::Coordinates)
    );

    let empty: SurveyRecord = serde_json::from_str("{}").unwrap();
    assert_eq!(
      empty.validate(CategoryCodes::Truncated).unwrap_err(),
      ValidationError::MissingField(Field::OriginRoad)
    );
  }
}
