//! Trajectory data types.
//!
//! A [`Scenario`] is the validated, immutable form of one trajectory file. The
//! wire layout is kept private; the only way to obtain a `Scenario` is through
//! [`Scenario::from_json`], which enforces the sample and body-count invariants.

use glam::DVec3;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A named entry in the scenario catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioDescriptor {
    /// Stable identifier, unique within a catalog.
    pub id: &'static str,
    /// Human-readable name for selectors.
    pub name: &'static str,
    /// Trajectory file name, relative to the data root.
    pub file: &'static str,
}

impl ScenarioDescriptor {
    /// Create a new descriptor.
    #[must_use]
    pub const fn new(id: &'static str, name: &'static str, file: &'static str) -> Self {
        Self { id, name, file }
    }
}

/// Trajectory file layout as served under the data root.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioFile {
    scenario: String,
    masses: Vec<f64>,
    ejection_time: f64,
    placeholder: bool,
    time: Vec<f64>,
    positions: Vec<Vec<[f64; 3]>>,
}

/// A precomputed N-body trajectory.
///
/// Invariants, checked at construction:
/// - `time.len() == positions.len()`, and there is at least one sample
/// - every sample holds exactly one position per mass
/// - every number is finite
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Display name from the payload.
    pub name: String,
    /// Mass of each body.
    pub masses: Vec<f64>,
    /// Simulation time at which a body is considered ejected.
    pub ejection_time: f64,
    /// Whether the dataset is a stand-in for a full simulation run.
    pub placeholder: bool,
    time: Vec<f64>,
    positions: Vec<Vec<DVec3>>,
}

impl Scenario {
    /// Parse and validate a trajectory payload.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: ScenarioFile = serde_json::from_slice(bytes)?;
        Self::from_file(file)
    }

    fn from_file(file: ScenarioFile) -> Result<Self> {
        let ScenarioFile {
            scenario,
            masses,
            ejection_time,
            placeholder,
            time,
            positions,
        } = file;

        if masses.is_empty() {
            return Err(Error::parse("masses", "no bodies"));
        }
        if let Some(i) = masses.iter().position(|m| !m.is_finite()) {
            return Err(Error::parse("masses", format!("mass {i} is not finite")));
        }
        if !ejection_time.is_finite() {
            return Err(Error::parse("ejectionTime", "not finite"));
        }
        if time.is_empty() {
            return Err(Error::parse("time", "trajectory has no samples"));
        }
        if time.len() != positions.len() {
            return Err(Error::parse(
                "positions",
                format!(
                    "{} samples but {} time values",
                    positions.len(),
                    time.len()
                ),
            ));
        }
        if let Some(t) = time.iter().position(|t| !t.is_finite()) {
            return Err(Error::parse("time", format!("sample {t} is not finite")));
        }

        let body_count = masses.len();
        let positions = positions
            .into_iter()
            .enumerate()
            .map(|(t, sample)| {
                if sample.len() != body_count {
                    return Err(Error::parse(
                        "positions",
                        format!(
                            "sample {t} has {} bodies, expected {body_count}",
                            sample.len()
                        ),
                    ));
                }
                sample
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let p = DVec3::from_array(p);
                        if p.is_finite() {
                            Ok(p)
                        } else {
                            Err(Error::parse(
                                "positions",
                                format!("body {i} at sample {t} is not finite"),
                            ))
                        }
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: scenario,
            masses,
            ejection_time,
            placeholder,
            time,
            positions,
        })
    }

    /// Number of bodies tracked per sample.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.masses.len()
    }

    /// Number of time samples (`T`).
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    /// Index of the final sample (`T - 1`).
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.sample_count() - 1
    }

    /// Simulation time of every sample.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.time
    }

    /// Simulation time at a sample.
    #[must_use]
    pub fn time_at(&self, step: usize) -> Option<f64> {
        self.time.get(step).copied()
    }

    /// All body positions at a sample.
    #[must_use]
    pub fn positions_at(&self, step: usize) -> Option<&[DVec3]> {
        self.positions.get(step).map(Vec::as_slice)
    }

    /// Position of one body at a sample.
    pub fn position(&self, step: usize, body: usize) -> Result<DVec3> {
        let sample = self.positions_at(step).ok_or(Error::IndexOutOfRange {
            index: step,
            len: self.sample_count(),
        })?;
        sample.get(body).copied().ok_or(Error::IndexOutOfRange {
            index: body,
            len: sample.len(),
        })
    }

    /// Axis-aligned bounds of every position over the whole trajectory.
    #[must_use]
    pub fn bounds(&self) -> (DVec3, DVec3) {
        self.positions.iter().flatten().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        )
    }
}
