use serde::{Deserialize, Deserializer, Serialize};

use crate::marker::Coords;

/// Answer of the optimisation service. It is only displayed, never edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimal_location_coord: Coords,
    /// the service formats the cost as a string with two decimals
    #[serde(deserialize_with = "number_or_string")]
    pub total_cost: f64,
    /// one polyline per marker that could reach the optimal location, points are `[lat, lng]`
    #[serde(default)]
    pub routes: Vec<Vec<[f64; 2]>>,
}

impl OptimizationResult {
    pub fn route_coords(&self) -> impl Iterator<Item = Vec<Coords>> + '_ {
        self.routes
            .iter()
            .map(|route| route.iter().map(|[lat, lng]| Coords::new(*lat, *lng)).collect())
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cost {
        Number(f64),
        Text(String),
    }
    match Cost::deserialize(deserializer)? {
        Cost::Number(n) => Ok(n),
        Cost::Text(s) => s.trim().parse().map_err(|e| {
            serde::de::Error::custom(format!("total_cost '{s}' is not a number: {e}"))
        }),
    }
}
