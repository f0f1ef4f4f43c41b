use crate::{
    detectors::crossing::{Resampling, DEFAULT_OVERSAMPLE_FACTOR},
    sampling::{FieldSelector, TEMPERATURE_FIELDS},
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Melting temperature of IN718 (K), the usual threshold for temperature histories.
pub const IN718_MELT_TEMPERATURE: f64 = 1571.15;

/// Default threshold for melt-history indicator fields.
pub const MELT_HISTORY_THRESHOLD: f64 = 1000.0;

/// Timestep index to milliseconds for the usual 1e-7 s solver step.
pub const DEFAULT_TIME_SCALE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResamplingMode {
    #[default]
    Oversampled,
    Segmentwise,
}

/// Optional settings file; anything left out falls back to the command line or built-in defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub resampling: Option<ResamplingMode>,
    #[serde(default)]
    pub oversample_factor: Option<usize>,
    #[serde(default)]
    pub time_scale: Option<f64>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub partial_match: Option<bool>,
    #[serde(default)]
    pub first_available: Option<bool>,
}

impl AnalysisConfig {
    pub fn resampling(&self) -> Resampling {
        match self.resampling.unwrap_or_default() {
            ResamplingMode::Oversampled => Resampling::Oversampled {
                factor: self.oversample_factor.unwrap_or(DEFAULT_OVERSAMPLE_FACTOR),
            },
            ResamplingMode::Segmentwise => Resampling::Segmentwise,
        }
    }

    pub fn field_selector(&self) -> FieldSelector {
        let candidates = self
            .fields
            .clone()
            .unwrap_or_else(|| TEMPERATURE_FIELDS.iter().map(|s| s.to_string()).collect());
        FieldSelector::new(candidates)
            .with_partial_match(self.partial_match.unwrap_or(false))
            .with_first_available(self.first_available.unwrap_or(false))
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale.unwrap_or(DEFAULT_TIME_SCALE)
    }

    /// Overlay command-line values on top of the file; `Some` on the right wins.
    pub fn merged(mut self, overrides: AnalysisConfig) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if overrides.$field.is_some() {
                    self.$field = overrides.$field;
                })*
            };
        }
        take!(
            threshold,
            resampling,
            oversample_factor,
            time_scale,
            fields,
            partial_match,
            first_available
        );
        self
    }
}

pub fn parse_config(text: &str) -> Result<AnalysisConfig> {
    toml::from_str(text).context("parsing analysis config")
}

pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("in {}", path.display()))
}
