pub mod engine;
pub mod hardware;
pub mod markers;
pub mod report;
pub mod rules;
pub mod util;

use std::path::Path;

use anyhow::{Context, Result};

use crate::engine::verify;
use crate::markers::store::MarkerStore;
use crate::report::model::{GradeReport, ToolInfo};
use crate::rules::catalog::Catalog;

pub const TOOL_NAME: &str = "sonde";

/// JSON schema version of grade reports.
/// This must be bumped only when the report layout changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

pub const CHECK_CATALOG_VERSION: &str = "0.1.0";

/// Fixed submission path for the single-sensor exercise.
pub const SENSOR_SCRIPT: &str = "aht20_sensor.py";

/// Fixed submission path for the multi-sensor exercise.
pub const MULTI_SENSOR_SCRIPT: &str = "multi_capteurs.py";

/// Directory of attestation markers, relative to the grading root.
pub const MARKERS_DIR: &str = ".test_markers";

/// Run the full hardware-less grading pass over a submission tree.
///
/// Builds the standard check catalogue, opens the marker store under
/// `root`, and evaluates every milestone. A malformed catalogue is the
/// only error that aborts the run.
pub fn grade(root: &Path, tool: ToolInfo) -> Result<GradeReport> {
    let catalog = Catalog::standard().context("check catalogue is invalid")?;
    let store = MarkerStore::new(root.join(MARKERS_DIR));
    verify::run_all(root, &catalog, &store, tool)
}
