//! Print formats and their canonical pixel dimensions at 300 px/inch

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::geometry::GeometryError;

/// Print resolution every dimension in the table is expressed in
pub const PRINT_PPI: u32 = 300;

/// Supported paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintFormat {
    A4,
    A3,
}

impl PrintFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintFormat::A4 => "A4",
            PrintFormat::A3 => "A3",
        }
    }

    /// Short and long edge in pixels
    fn edges(&self) -> (u32, u32) {
        match self {
            PrintFormat::A4 => (2480, 3508),
            PrintFormat::A3 => (3508, 4961),
        }
    }

    pub fn all() -> [PrintFormat; 2] {
        [PrintFormat::A4, PrintFormat::A3]
    }
}

impl fmt::Display for PrintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrintFormat {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A4" => Ok(PrintFormat::A4),
            "A3" => Ok(PrintFormat::A3),
            _ => Err(GeometryError::InvalidInput(format!(
                "unsupported print format '{s}'"
            ))),
        }
    }
}

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(GeometryError::InvalidInput(format!(
                "unsupported orientation '{s}'"
            ))),
        }
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(PrintFormat);
serde_via_str!(Orientation);

/// Resolved print layout: format, orientation and the exact pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintLayout {
    pub format: PrintFormat,
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
}

impl PrintLayout {
    pub fn new(format: PrintFormat, orientation: Orientation) -> Self {
        let (short, long) = format.edges();
        let (width, height) = match orientation {
            Orientation::Portrait => (short, long),
            Orientation::Landscape => (long, short),
        };
        Self {
            format,
            orientation,
            width,
            height,
        }
    }
}

impl Default for PrintLayout {
    fn default() -> Self {
        Self::new(PrintFormat::A4, Orientation::Portrait)
    }
}

/// Strictly parse a format/orientation pair
pub fn try_print_dimensions(format: &str, orientation: &str) -> Result<PrintLayout, GeometryError> {
    Ok(PrintLayout::new(format.parse()?, orientation.parse()?))
}

/// Map a declared format/orientation pair to its canonical layout.
///
/// Unknown values fall back to A4 portrait so an order is never blocked on a
/// typo; the fallback is logged at warn level.
pub fn get_print_dimensions(format: &str, orientation: &str) -> PrintLayout {
    match try_print_dimensions(format, orientation) {
        Ok(layout) => layout,
        Err(e) => {
            tracing::warn!(
                format = %format,
                orientation = %orientation,
                error = %e,
                "Unrecognised print layout, falling back to A4 portrait"
            );
            PrintLayout::default()
        }
    }
}
