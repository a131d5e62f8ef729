//! User-supplied codes: road, transport and study identifiers.
//!
//! Every code is trimmed and upper-cased on construction, so equality between
//! two codes is case-insensitive with respect to the raw input.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a code is blank after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("code must not be empty")]
pub struct EmptyCode;

macro_rules! code_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct $name(String);

    impl $name {
      /// Normalise `raw`; `None` if nothing is left after trimming.
      pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
          None
        } else {
          Some(Self(trimmed.to_uppercase()))
        }
      }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl TryFrom<String> for $name {
      type Error = EmptyCode;

      fn try_from(raw: String) -> Result<Self, EmptyCode> {
        Self::new(&raw).ok_or(EmptyCode)
      }
    }

    impl From<$name> for String {
      fn from(code: $name) -> String { code.0 }
    }
  };
}

code_type! {
  /// A road code, e.g. `A-7` or `N-340`.
  RoadCode
}

code_type! {
  /// Identifies a transport mode. Primary key of the transport table.
  TransportCode
}

code_type! {
  /// Identifies a survey study. Primary key of the study table.
  StudyCode
}
