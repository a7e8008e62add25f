use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::pattern::Pattern;
use crate::rules::vocabulary as vocab;
use crate::{MULTI_SENSOR_SCRIPT, SENSOR_SCRIPT};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CheckId(pub String);

impl CheckId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MilestoneId {
    #[serde(rename = "M1")]
    Environment,
    #[serde(rename = "M2")]
    SensorReading,
    #[serde(rename = "M3")]
    RetryQuality,
    #[serde(rename = "M4")]
    MultiSensor,
}

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MilestoneId::Environment => "M1",
            MilestoneId::SensorReading => "M2",
            MilestoneId::RetryQuality => "M3",
            MilestoneId::MultiSensor => "M4",
        };
        f.write_str(s)
    }
}

/// How a check's failure affects the milestone decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckPolicy {
    /// Failure blocks the milestone pass regardless of accumulated points.
    Required,
    /// Failure only lowers the score.
    Scored,
    /// Failure degrades to a skipped result carrying the suggestion text.
    Advisory,
}

/// What a check inspects. Source patterns go through the pattern matcher;
/// the marker gate is the only predicate satisfied out-of-band, by the
/// trusted local run, never by text.
#[derive(Debug, Clone)]
pub enum Predicate {
    ArtifactExists,
    SyntaxValid,
    Source(Pattern),
    MarkerStorePopulated,
}

#[derive(Debug, Clone)]
pub struct Check {
    pub id: CheckId,
    pub title: String,
    pub weight: u32,
    pub policy: CheckPolicy,
    pub predicate: Predicate,
    pub remediation: String,
}

#[derive(Debug, Clone)]
pub struct Milestone {
    pub id: MilestoneId,
    pub title: String,
    /// Submission path, relative to the grading root.
    pub artifact: String,
    pub max_points: u32,
    pub pass_threshold: u32,
    pub checks: Vec<Check>,
}

impl Milestone {
    /// Sum of declared check weights.
    pub fn declared_weight(&self) -> u32 {
        self.checks.iter().map(|c| c.weight).sum()
    }
}

/// A malformed catalogue definition. The one error class that aborts the
/// whole run: it means the grading logic itself is broken, not the
/// submission.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid pattern in {check}: {source}")]
    InvalidPattern {
        check: String,
        #[source]
        source: regex::Error,
    },
    #[error("duplicate check id {id} in milestone {milestone}")]
    DuplicateCheckId { id: String, milestone: String },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub milestones: Vec<Milestone>,
}

impl Catalog {
    /// Build the standard four-milestone catalogue.
    ///
    /// All regular expressions compile here; duplicate check ids are
    /// rejected here. Nothing past this point can fail per-submission.
    pub fn standard() -> Result<Self, CatalogError> {
        let catalog = Catalog {
            milestones: vec![
                environment()?,
                sensor_reading()?,
                retry_quality()?,
                multi_sensor()?,
            ],
        };
        catalog.ensure_unique_ids()?;
        Ok(catalog)
    }

    pub fn milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn check(&self, id: &str) -> Option<&Check> {
        self.milestones
            .iter()
            .flat_map(|m| m.checks.iter())
            .find(|c| c.id.as_str() == id)
    }

    /// Weight-sum drift against the advertised milestone maximum.
    ///
    /// Drift is reported, not enforced: a mis-summed milestone is a grading
    /// content defect, but it does not make per-check results meaningless
    /// the way a malformed pattern would.
    pub fn weight_warnings(&self) -> Vec<String> {
        self.milestones
            .iter()
            .filter(|m| m.declared_weight() != m.max_points)
            .map(|m| {
                format!(
                    "milestone {} advertises {} points but its checks sum to {}",
                    m.id,
                    m.max_points,
                    m.declared_weight()
                )
            })
            .collect()
    }

    fn ensure_unique_ids(&self) -> Result<(), CatalogError> {
        for m in &self.milestones {
            let mut seen = HashSet::new();
            for c in &m.checks {
                if !seen.insert(c.id.as_str()) {
                    return Err(CatalogError::DuplicateCheckId {
                        id: c.id.as_str().to_string(),
                        milestone: m.id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn re(check: &str, pattern: &str) -> Result<Pattern, CatalogError> {
    Pattern::regex(pattern).map_err(|source| CatalogError::InvalidPattern {
        check: check.to_string(),
        source,
    })
}

fn check(
    id: &str,
    title: &str,
    weight: u32,
    policy: CheckPolicy,
    predicate: Predicate,
    remediation: &str,
) -> Check {
    Check {
        id: CheckId(id.to_string()),
        title: title.to_string(),
        weight,
        policy,
        predicate,
        remediation: remediation.to_string(),
    }
}

fn environment() -> Result<Milestone, CatalogError> {
    Ok(Milestone {
        id: MilestoneId::Environment,
        title: "Environment setup".to_string(),
        artifact: SENSOR_SCRIPT.to_string(),
        max_points: 25,
        pass_threshold: 25,
        checks: vec![
            check(
                "C-ENV-01",
                "sensor script present",
                5,
                CheckPolicy::Required,
                Predicate::ArtifactExists,
                "Create aht20_sensor.py at the repository root. It should read \
                 temperature and humidity from the AHT20 I2C sensor at address 0x38.",
            ),
            check(
                "C-ENV-02",
                "source is well-formed",
                5,
                CheckPolicy::Required,
                Predicate::SyntaxValid,
                "Fix the reported line: look for unbalanced parentheses, brackets \
                 or quotes.",
            ),
            check(
                "C-ENV-03",
                "required library references",
                5,
                CheckPolicy::Required,
                Predicate::Source(Pattern::all(vec![
                    Pattern::any_of(vocab::BOARD_IMPORT_FORMS),
                    Pattern::any_of(&[vocab::CLIMATE_LIB]),
                ])),
                "Add the required imports at the top of the script: \
                 `import board` and `import adafruit_ahtx0`.",
            ),
            check(
                "C-ENV-04",
                "inline dependency metadata",
                5,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any_of(vocab::INLINE_DEPS_FORMS)),
                "Declare dependencies in an inline script metadata block \
                 (`# /// script` ... `# ///`) so the script runs with `uv run`.",
            ),
            check(
                "C-ENV-05",
                "local validation executed",
                5,
                CheckPolicy::Required,
                Predicate::MarkerStorePopulated,
                "Run `sonde validate` on the device with the sensor attached, \
                 then commit and push the .test_markers/ directory.",
            ),
        ],
    })
}

fn sensor_reading() -> Result<Milestone, CatalogError> {
    Ok(Milestone {
        id: MilestoneId::SensorReading,
        title: "Sensor reading".to_string(),
        artifact: SENSOR_SCRIPT.to_string(),
        max_points: 35,
        pass_threshold: 35,
        checks: vec![
            check(
                "C-SENS-01",
                "bus initialization",
                10,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any_of(vocab::BUS_INIT_FORMS)),
                "Initialize the bus with `i2c = board.I2C()` (uses board.SCL \
                 and board.SDA).",
            ),
            check(
                "C-SENS-02",
                "sensor object creation",
                10,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any(vec![
                    Pattern::any_of(vocab::CLIMATE_SENSOR_FORMS),
                    Pattern::all(vec![
                        Pattern::any_of(&["adafruit_ahtx0."]),
                        Pattern::any_of_fold(&["i2c"]),
                    ]),
                ])),
                "Create the sensor object with \
                 `sensor = adafruit_ahtx0.AHTx0(i2c)`.",
            ),
            check(
                "C-SENS-03",
                "temperature reading",
                7,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any(vec![
                    Pattern::any_of(&[".temperature"]),
                    Pattern::all_of_fold(&["temperature", "sensor"]),
                ])),
                "Read the temperature with `temperature = sensor.temperature`.",
            ),
            check(
                "C-SENS-04",
                "humidity reading",
                8,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any(vec![
                    Pattern::any_of(&[".relative_humidity", ".humidity"]),
                    Pattern::all_of_fold(&["humidity", "sensor"]),
                ])),
                "Read the humidity with `humidity = sensor.relative_humidity`.",
            ),
            check(
                "C-SENS-05",
                "value rounding",
                0,
                CheckPolicy::Advisory,
                Predicate::Source(Pattern::any_of(vocab::ROUNDING_FORMS)),
                "Consider rounding readings for cleaner output: \
                 `round(sensor.temperature, 1)`.",
            ),
        ],
    })
}

fn retry_quality() -> Result<Milestone, CatalogError> {
    // One conjunctive check on purpose: a bare loop is not retry logic,
    // and neither is a bare exception handler.
    let retry_logic = Pattern::all(vec![
        Pattern::any(vec![
            Pattern::all(vec![
                Pattern::any_of(&["for "]),
                Pattern::any_of(&["range("]),
            ]),
            Pattern::any_of(&["while "]),
        ]),
        Pattern::all_of(&["try:", "except"]),
        Pattern::any(vec![
            Pattern::any_of_fold(vocab::RETRY_INDICATORS),
            Pattern::any_of(vocab::BOUNDED_ATTEMPTS),
        ]),
    ]);

    Ok(Milestone {
        id: MilestoneId::RetryQuality,
        title: "Retry logic and quality".to_string(),
        artifact: SENSOR_SCRIPT.to_string(),
        max_points: 40,
        pass_threshold: 35,
        checks: vec![
            check(
                "C-QUAL-01",
                "retry logic",
                15,
                CheckPolicy::Required,
                Predicate::Source(retry_logic),
                "Wrap the sensor read in a bounded retry: a loop over \
                 range(MAX_RETRIES) with a try/except around the read. Bus \
                 errors do happen (loose wiring, bus conflicts).",
            ),
            check(
                "C-QUAL-02",
                "bounded-retry constant",
                5,
                CheckPolicy::Required,
                Predicate::Source(re(
                    "C-QUAL-02",
                    r"(MAX_RETRIES|max_retries|NB_TENTATIVES|RETRY_COUNT)\s*=\s*\d+",
                )?),
                "Define the retry limit as a named constant, e.g. \
                 `MAX_RETRIES = 3`.",
            ),
            check(
                "C-QUAL-03",
                "specific exception handler",
                10,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any_of(vocab::SPECIFIC_HANDLER_FORMS)),
                "Catch a named exception type, e.g. `except RuntimeError as e:`.",
            ),
            check(
                "C-QUAL-04",
                "no catch-all handler",
                0,
                CheckPolicy::Required,
                Predicate::Source(Pattern::absent(re("C-QUAL-04", r"except\s*:")?)),
                "Remove the bare `except:`. It swallows everything, including \
                 KeyboardInterrupt; catch a named exception type instead.",
            ),
            check(
                "C-QUAL-05",
                "main guard",
                5,
                CheckPolicy::Required,
                Predicate::Source(Pattern::all_of(&["__name__", "__main__"])),
                "End the script with an `if __name__ == \"__main__\":` guard so \
                 it can be imported without running.",
            ),
            check(
                "C-QUAL-06",
                "documentation",
                5,
                CheckPolicy::Scored,
                Predicate::Source(Pattern::any(vec![
                    Pattern::any_of(&["\"\"\"", "'''"]),
                    Pattern::count_at_least("#", 3),
                ])),
                "Add a docstring or a few comments explaining the reading loop.",
            ),
        ],
    })
}

fn multi_sensor() -> Result<Milestone, CatalogError> {
    Ok(Milestone {
        id: MilestoneId::MultiSensor,
        title: "Multi-sensor integration".to_string(),
        artifact: MULTI_SENSOR_SCRIPT.to_string(),
        max_points: 25,
        pass_threshold: 25,
        checks: vec![
            check(
                "C-MULTI-01",
                "ambient-sensor library reference",
                7,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any_of(&[vocab::AMBIENT_LIB])),
                "Import the proximity/light driver: `import adafruit_vcnl4200`. \
                 The VCNL4200 sits at address 0x51.",
            ),
            check(
                "C-MULTI-02",
                "sensor object creation",
                7,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any(vec![
                    Pattern::any_of(vocab::AMBIENT_SENSOR_FORMS),
                    Pattern::all(vec![
                        Pattern::any_of(&["adafruit_vcnl4200."]),
                        Pattern::any_of_fold(&["i2c"]),
                    ]),
                ])),
                "Create the sensor object with \
                 `vcnl = adafruit_vcnl4200.Adafruit_VCNL4200(i2c)`.",
            ),
            check(
                "C-MULTI-03",
                "proximity reading",
                5,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any_of(&[".proximity"])),
                "Read proximity with `proximity = vcnl.proximity` (raw count; \
                 higher means closer).",
            ),
            check(
                "C-MULTI-04",
                "ambient-light reading",
                6,
                CheckPolicy::Required,
                Predicate::Source(Pattern::any_of(&[".lux"])),
                "Read ambient light with `lux = vcnl.lux`.",
            ),
            check(
                "C-MULTI-05",
                "shared bus",
                0,
                CheckPolicy::Advisory,
                Predicate::Source(Pattern::all_of(&[vocab::CLIMATE_LIB, vocab::AMBIENT_LIB])),
                "A multi-sensor script should drive both sensors on the one \
                 bus: import adafruit_ahtx0 and adafruit_vcnl4200 together.",
            ),
        ],
    })
}
