//! Simulation outputs: per-variable hourly series and terminal points.

use std::io::{self, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};
use thy_core::{Compartment, ModelVariant};
use thy_model::FreeHormones;

use crate::integrator::StepStats;

/// Field name of the time axis.
pub const TIME_FIELD: &str = "t";
pub const FT4_FIELD: &str = "ft4";
pub const FT3_FIELD: &str = "ft3";

/// Hourly samples of every state component plus FT4/FT3.
///
/// Stored column-wise: one vector per field, all of the same length. Built
/// only by the driver and immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSeries {
    variant: ModelVariant,
    t: Vec<f64>,
    columns: Vec<Vec<f64>>,
    ft4: Vec<f64>,
    ft3: Vec<f64>,
    stats: StepStats,
}

impl OutputSeries {
    pub(crate) fn with_capacity(variant: ModelVariant, samples: usize) -> Self {
        Self {
            variant,
            t: Vec::with_capacity(samples),
            columns: (0..variant.dimension())
                .map(|_| Vec::with_capacity(samples))
                .collect(),
            ft4: Vec::with_capacity(samples),
            ft3: Vec::with_capacity(samples),
            stats: StepStats::default(),
        }
    }

    pub(crate) fn push(&mut self, t: f64, state: &[f64], free: FreeHormones) {
        self.t.push(t);
        for (column, v) in self.columns.iter_mut().zip(state) {
            column.push(*v);
        }
        self.ft4.push(free.ft4);
        self.ft3.push(free.ft3);
    }

    pub(crate) fn set_stats(&mut self, stats: StepStats) {
        self.stats = stats;
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.t
    }

    pub fn ft4(&self) -> &[f64] {
        &self.ft4
    }

    pub fn ft3(&self) -> &[f64] {
        &self.ft3
    }

    /// Integrator work summed over the run.
    pub fn stats(&self) -> StepStats {
        self.stats
    }

    /// Series of one compartment; `None` if the variant lacks it.
    pub fn compartment(&self, c: Compartment) -> Option<&[f64]> {
        self.columns.get(c.index()).map(Vec::as_slice)
    }

    /// Look up any field by its output name.
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        match name {
            TIME_FIELD => Some(&self.t),
            FT4_FIELD => Some(&self.ft4),
            FT3_FIELD => Some(&self.ft3),
            other => Compartment::from_name(other).and_then(|c| self.compartment(c)),
        }
    }

    /// Output field names in serialisation order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = vec![TIME_FIELD];
        names.extend(self.variant.compartments().iter().map(|c| c.name()));
        names.push(FT4_FIELD);
        names.push(FT3_FIELD);
        names
    }

    /// Full state vector at sample `i`.
    pub fn state_at(&self, i: usize) -> Option<Vec<f64>> {
        if i >= self.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[i]).collect())
    }

    /// State at the last sample (the terminal state of the run).
    pub fn final_state(&self) -> Option<Vec<f64>> {
        self.len().checked_sub(1).and_then(|i| self.state_at(i))
    }

    /// Write the series as CSV, one row per sample.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        let names = self.field_names();
        writeln!(out, "{}", names.join(","))?;
        let fields: Vec<&[f64]> = names.iter().filter_map(|n| self.field(n)).collect();
        for i in 0..self.len() {
            let row: Vec<String> = fields.iter().map(|f| format!("{:e}", f[i])).collect();
            writeln!(out, "{}", row.join(","))?;
        }
        Ok(())
    }
}

impl Serialize for OutputSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.field_names();
        let mut map = serializer.serialize_map(Some(names.len()))?;
        for name in names {
            if let Some(values) = self.field(name) {
                map.serialize_entry(name, values)?;
            }
        }
        map.end()
    }
}

/// Terminal state of a point-mode run.
#[derive(Clone, Debug, PartialEq)]
pub struct PointResult {
    pub t: f64,
    pub variant: ModelVariant,
    pub state: Vec<f64>,
    pub stats: StepStats,
}

impl PointResult {
    pub fn value(&self, c: Compartment) -> Option<f64> {
        self.state.get(c.index()).copied()
    }
}

impl Serialize for PointResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let compartments = self.variant.compartments();
        let mut map = serializer.serialize_map(Some(compartments.len() + 1))?;
        map.serialize_entry(TIME_FIELD, &self.t)?;
        for (c, v) in compartments.iter().zip(&self.state) {
            map.serialize_entry(c.name(), v)?;
        }
        map.end()
    }
}
