//! Assemble a `(time, value)` history by probing one point across timestep files.

use crate::{
    io::{points::read_point_table, timestep::TimestepFile},
    signal::{Sample, Series},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Field names tried for temperature, highest priority first.
pub const TEMPERATURE_FIELDS: [&str; 6] = ["T", "Temperature", "temperature", "TEMPERATURE", "temp", "Temp"];

/// A dataset that exposes named scalar arrays.
pub trait FieldSource {
    fn field_names(&self) -> &[String];
    fn field(&self, name: &str) -> Option<&[f64]>;
}

/// Point positions plus one column per named field.
#[derive(Debug, Clone, Default)]
pub struct PointTable {
    points: Vec<[f64; 3]>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl PointTable {
    pub fn new(names: Vec<String>) -> Self {
        let columns = vec![Vec::new(); names.len()];
        Self {
            points: Vec::new(),
            names,
            columns,
        }
    }

    /// Append a point; `values` follow the order of the field names.
    pub fn push(&mut self, point: [f64; 3], values: &[f64]) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.points.push(point);
        for (column, &v) in self.columns.iter_mut().zip(values) {
            column.push(v);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, idx: usize) -> Option<[f64; 3]> {
        self.points.get(idx).copied()
    }

    /// Index of the point nearest `target`; the lowest index wins ties.
    pub fn closest_point(&self, target: [f64; 3]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points.iter().enumerate() {
            let d2 = (p[0] - target[0]).powi(2) + (p[1] - target[1]).powi(2) + (p[2] - target[2]).powi(2);
            if best.map(|(_, b)| d2 < b).unwrap_or(true) {
                best = Some((i, d2));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl FieldSource for PointTable {
    fn field_names(&self) -> &[String] {
        &self.names
    }

    fn field(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldMatch {
    Exact { name: String },
    Partial { requested: String, name: String },
    FirstAvailable { name: String },
}

impl FieldMatch {
    pub fn name(&self) -> &str {
        match self {
            FieldMatch::Exact { name }
            | FieldMatch::Partial { name, .. }
            | FieldMatch::FirstAvailable { name } => name,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("no field matched {requested:?}; available: {available:?}")]
pub struct FieldNotFound {
    pub requested: Vec<String>,
    pub available: Vec<String>,
}

/// Ordered candidate names plus the opt-in fallbacks applied after them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSelector {
    pub candidates: Vec<String>,
    /// Case-insensitive substring match in either direction.
    #[serde(default)]
    pub partial_match: bool,
    /// Use the first field of the source as a last resort.
    #[serde(default)]
    pub first_available: bool,
}

impl FieldSelector {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            partial_match: false,
            first_available: false,
        }
    }

    pub fn temperature() -> Self {
        Self::new(TEMPERATURE_FIELDS)
    }

    pub fn with_partial_match(mut self, enabled: bool) -> Self {
        self.partial_match = enabled;
        self
    }

    pub fn with_first_available(mut self, enabled: bool) -> Self {
        self.first_available = enabled;
        self
    }

    pub fn resolve<S: FieldSource + ?Sized>(&self, source: &S) -> Result<FieldMatch, FieldNotFound> {
        let available = source.field_names();
        if let Some(name) = self
            .candidates
            .iter()
            .find(|c| available.iter().any(|a| a == *c))
        {
            return Ok(FieldMatch::Exact { name: name.clone() });
        }
        if self.partial_match {
            for requested in &self.candidates {
                let want = requested.to_lowercase();
                if let Some(name) = available.iter().find(|a| {
                    let have = a.to_lowercase();
                    have.contains(&want) || want.contains(&have)
                }) {
                    return Ok(FieldMatch::Partial {
                        requested: requested.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        if self.first_available {
            if let Some(name) = available.first() {
                return Ok(FieldMatch::FirstAvailable { name: name.clone() });
            }
        }
        Err(FieldNotFound {
            requested: self.candidates.clone(),
            available: available.to_vec(),
        })
    }
}

impl Default for FieldSelector {
    fn default() -> Self {
        Self::temperature()
    }
}

/// Where to probe and how to turn timesteps into times.
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    /// Probe location in the units of the point table.
    pub target: [f64; 3],
    pub selector: FieldSelector,
    /// Multiplier applied to the parsed timestep.
    pub time_scale: f64,
}

impl ProbeSpec {
    /// Build a probe from a location given in millimetres for tables stored in metres.
    pub fn from_millimetres(target_mm: [f64; 3], selector: FieldSelector, time_scale: f64) -> Self {
        Self {
            target: target_mm.map(|c| c / 1000.0),
            selector,
            time_scale,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFrame {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbedFrame {
    pub timestep: f64,
    pub path: PathBuf,
    pub point_index: usize,
    pub field: FieldMatch,
}

/// History assembled from a sequence of timestep files.
#[derive(Debug, Clone)]
pub struct ProbeHistory {
    pub series: Series,
    pub frames: Vec<ProbedFrame>,
    pub skipped: Vec<SkippedFrame>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    #[error("point table is empty")]
    EmptyTable,
    #[error(transparent)]
    Field(#[from] FieldNotFound),
    #[error("field {field} has no value at point {point}")]
    MissingValue { field: String, point: usize },
}

/// Value of the resolved field at the point nearest the probe target.
pub fn probe_table(table: &PointTable, spec: &ProbeSpec) -> Result<(usize, FieldMatch, f64), ProbeError> {
    let idx = table.closest_point(spec.target).ok_or(ProbeError::EmptyTable)?;
    let found = spec.selector.resolve(table)?;
    let value = table
        .field(found.name())
        .and_then(|col| col.get(idx).copied())
        .ok_or_else(|| ProbeError::MissingValue {
            field: found.name().to_string(),
            point: idx,
        })?;
    Ok((idx, found, value))
}

/// Probe every file; frames that cannot be read or resolved are reported, not fatal.
pub fn assemble_history(files: &[TimestepFile], spec: &ProbeSpec) -> ProbeHistory {
    let mut samples = Vec::with_capacity(files.len());
    let mut frames = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for file in files {
        let probed = read_point_table(&file.path)
            .map_err(|e| format!("{:#}", e))
            .and_then(|table| probe_table(&table, spec).map_err(|e| e.to_string()));
        match probed {
            Ok((point_index, field, value)) => {
                debug!(
                    "{}: {}={} at point {}",
                    file.path.display(),
                    field.name(),
                    value,
                    point_index
                );
                if !matches!(field, FieldMatch::Exact { .. }) {
                    warn!("{}: using fallback field {:?}", file.path.display(), field);
                }
                samples.push(Sample::new(file.timestep * spec.time_scale, value));
                frames.push(ProbedFrame {
                    timestep: file.timestep,
                    path: file.path.clone(),
                    point_index,
                    field,
                });
            }
            Err(reason) => {
                warn!("skipping {}: {}", file.path.display(), reason);
                skipped.push(SkippedFrame {
                    path: file.path.clone(),
                    reason,
                });
            }
        }
    }
    ProbeHistory {
        series: Series::new(samples),
        frames,
        skipped,
    }
}
