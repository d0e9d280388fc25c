//! Output dimension parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::PresetError;

/// Output frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse exactly one `"<width>x<height>"` token with positive integer
    /// components. Surrounding whitespace is tolerated; anything else is a
    /// configuration error.
    pub fn parse(raw: &str) -> Result<Self, PresetError> {
        let invalid = || PresetError::invalid(format!("Invalid output resolution {raw:?}"));

        let token = raw.trim();
        if token.is_empty() {
            return Err(PresetError::invalid("Missing output resolution in preset"));
        }

        let (w, h) = token.split_once('x').ok_or_else(invalid)?;
        let width = parse_dimension(w).ok_or_else(invalid)?;
        let height = parse_dimension(h).ok_or_else(invalid)?;
        Ok(Self { width, height })
    }
}

fn parse_dimension(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = part.parse::<u32>().ok()?;
    (value > 0).then_some(value)
}

impl FromStr for Resolution {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
