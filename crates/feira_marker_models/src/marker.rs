use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
    /// NaN coordinates are kept as-is by the importer, they are simply not drawn.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
    /// Finite, latitude within ±90 and longitude within ±180.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.lat.abs() <= 90.0 && self.lng.abs() <= 180.0
    }
    /// Longitude wrapped back into [-180, 180), latitude clamped to ±90.
    pub fn normalized(self) -> Self {
        Self {
            lat: self.lat.clamp(-90.0, 90.0),
            lng: (self.lng + 180.0).rem_euclid(360.0) - 180.0,
        }
    }
}

impl std::fmt::Display for Coords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// buyer side, its quantity is a demand
    #[default]
    Mercado,
    /// supply side, its quantity is an offer
    Produtor,
}

impl MarkerKind {
    pub fn toggled(self) -> Self {
        match self {
            Self::Mercado => Self::Produtor,
            Self::Produtor => Self::Mercado,
        }
    }
    /// Same aliases the optimisation service accepts. Anything else is `None`.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "produtor" | "producer" => Some(Self::Produtor),
            "mercado" | "market" | "buyer" => Some(Self::Mercado),
            _ => None,
        }
    }
}

impl FromStr for MarkerKind {
    type Err = &'static str;
    /// Unknown tags fall back to a market, the way imported files are read.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s).unwrap_or_default())
    }
}

impl AsRef<str> for MarkerKind {
    fn as_ref(&self) -> &'static str {
        match self {
            Self::Mercado => "mercado",
            Self::Produtor => "produtor",
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A marker has no id: it is identified by its position in the marker list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    pub coords: Coords,
    pub frutas: Vec<String>,
    pub quantidade: i64,
}

impl Marker {
    pub fn new(kind: MarkerKind, coords: Coords) -> Self {
        Self {
            kind,
            coords,
            frutas: Vec::new(),
            quantidade: 0,
        }
    }
    pub fn products_label(&self) -> String {
        self.frutas.iter().join(", ")
    }
}
