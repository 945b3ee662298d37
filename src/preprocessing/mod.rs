//! Data preparation module
//!
//! Turns the raw engine sensor table into clean, stratified train/test
//! partitions:
//! - Header renaming to the canonical feature schema
//! - Duplicate removal and median imputation
//! - Stratified splitting with a fixed seed
//! - Standard scaling for the model pipeline

pub mod schema;
mod prepare;
mod scaler;
mod split;
mod stage;

pub use prepare::{DataPreparer, PreparationReport, PreparedData};
pub use scaler::{ScalerParams, StandardScaler};
pub use schema::{
    canonical_name, feature_index, FeatureSpec, FEATURE_COLUMNS, FEATURE_SCHEMA, N_FEATURES,
    RAW_COLUMN_RENAME_MAP, TARGET_COLUMN,
};
pub use split::{SplitConfig, SplitIndices, StratifiedSplitter};
pub use stage::{run_preparation, PreparationOutcome};

use crate::error::Result;
use polars::prelude::DataFrame;

/// Clean and split a raw table with the default split (80/20, seed 42)
pub fn prepare(raw: &DataFrame) -> Result<(DataFrame, DataFrame)> {
    DataPreparer::default().prepare(raw)
}
