//! Coordinate Reference System handles
//!
//! A [`CRS`] is an opaque identifier. gridzone never resolves it to
//! projection parameters; that is the job of a
//! [`CoordinateTransform`](crate::transform::CoordinateTransform).
//! Two handles are interchangeable only when [`CRS::is_equivalent`] holds.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CRS {
    /// EPSG registry code
    Epsg(u32),
    /// WKT definition
    Wkt(String),
    /// PROJ string
    Proj(String),
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        CRS::Epsg(code)
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        CRS::Wkt(normalize(&wkt.into()))
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        CRS::Proj(normalize(&proj.into()))
    }

    /// Parse an identifier such as `EPSG:32633`, `+proj=longlat ...` or WKT.
    pub fn parse(identifier: &str) -> Self {
        let trimmed = identifier.trim();
        let upper = trimmed.to_ascii_uppercase();
        if let Some(code) = upper.strip_prefix("EPSG:") {
            if let Ok(code) = code.trim().parse::<u32>() {
                return CRS::Epsg(code);
            }
        }
        if trimmed.starts_with('+') {
            return Self::from_proj(trimmed);
        }
        Self::from_wkt(trimmed)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        match self {
            CRS::Epsg(code) => Some(*code),
            _ => None,
        }
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        match self {
            CRS::Wkt(wkt) => Some(wkt),
            _ => None,
        }
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        match self {
            CRS::Proj(proj) => Some(proj),
            _ => None,
        }
    }

    /// Check if two CRS are the same reference system.
    ///
    /// Handles of different kinds (EPSG vs WKT) are never equivalent:
    /// deciding that would need a CRS database.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self, other) {
            (CRS::Epsg(a), CRS::Epsg(b)) => a == b,
            (CRS::Wkt(a), CRS::Wkt(b)) => a == b,
            (CRS::Proj(a), CRS::Proj(b)) => a == b,
            _ => false,
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        match self {
            CRS::Epsg(code) => format!("EPSG:{}", code),
            CRS::Proj(proj) => proj.clone(),
            CRS::Wkt(wkt) => {
                let head: String = wkt.chars().take(50).collect();
                format!("WKT:{}", head)
            }
        }
    }
}

impl PartialEq for CRS {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent(other)
    }
}

impl Eq for CRS {}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Collapse runs of whitespace so that formatting differences don't matter
fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name a possibly missing CRS for error messages
pub fn describe(crs: Option<&CRS>) -> String {
    crs.map(CRS::identifier).unwrap_or_else(|| "undefined".to_string())
}

/// Require two CRS handles to be present and equivalent.
///
/// `what_a` / `what_b` name the operands in the `CrsUndefined` error.
pub fn ensure_same(
    a: Option<&CRS>,
    what_a: &'static str,
    b: Option<&CRS>,
    what_b: &'static str,
) -> Result<()> {
    let a = a.ok_or(Error::CrsUndefined(what_a))?;
    let b = b.ok_or(Error::CrsUndefined(what_b))?;
    if !a.is_equivalent(b) {
        return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
    }
    Ok(())
}
