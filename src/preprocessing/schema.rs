//! Published feature schema
//!
//! The order of [`FEATURE_COLUMNS`] is part of the contract with every caller
//! of the inference service and with every persisted pipeline.

use serde::Serialize;

/// Canonical label column
pub const TARGET_COLUMN: &str = "Engine_Condition";

/// Canonical feature columns, in model order
pub const FEATURE_COLUMNS: [&str; 6] = [
    "Engine_RPM",
    "Lub_Oil_Pressure",
    "Fuel_Pressure",
    "Coolant_Pressure",
    "Lub_Oil_Temperature",
    "Coolant_Temperature",
];

/// Number of model features
pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

/// Raw CSV header → canonical name
pub const RAW_COLUMN_RENAME_MAP: [(&str, &str); 7] = [
    ("Engine rpm", "Engine_RPM"),
    ("Lub oil pressure", "Lub_Oil_Pressure"),
    ("Fuel pressure", "Fuel_Pressure"),
    ("Coolant pressure", "Coolant_Pressure"),
    ("lub oil temp", "Lub_Oil_Temperature"),
    ("Coolant temp", "Coolant_Temperature"),
    ("Engine Condition", TARGET_COLUMN),
];

/// Description of one sensor reading
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub description: &'static str,
}

impl FeatureSpec {
    /// Whether a value lies inside the documented range
    pub fn in_range(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Full feature schema with units and valid ranges
pub const FEATURE_SCHEMA: [FeatureSpec; 6] = [
    FeatureSpec { name: "Engine_RPM", unit: "rpm", min: 0.0, max: 4000.0, description: "Engine speed" },
    FeatureSpec { name: "Lub_Oil_Pressure", unit: "bar", min: 0.0, max: 10.0, description: "Lubricating oil pressure" },
    FeatureSpec { name: "Fuel_Pressure", unit: "bar", min: 0.0, max: 30.0, description: "Fuel supply pressure" },
    FeatureSpec { name: "Coolant_Pressure", unit: "bar", min: 0.0, max: 10.0, description: "Coolant system pressure" },
    FeatureSpec { name: "Lub_Oil_Temperature", unit: "°C", min: 0.0, max: 150.0, description: "Lubricating oil temperature" },
    FeatureSpec { name: "Coolant_Temperature", unit: "°C", min: 0.0, max: 150.0, description: "Coolant temperature" },
];

/// Map a raw header to its canonical name.
/// Canonical names map to themselves; anything else is unknown.
pub fn canonical_name(header: &str) -> Option<&'static str> {
    RAW_COLUMN_RENAME_MAP
        .iter()
        .find(|(raw, _)| *raw == header)
        .map(|(_, canonical)| *canonical)
        .or_else(|| {
            FEATURE_COLUMNS
                .iter()
                .chain(std::iter::once(&TARGET_COLUMN))
                .find(|c| **c == header)
                .copied()
        })
}

/// Position of a feature in model order
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == name)
}
