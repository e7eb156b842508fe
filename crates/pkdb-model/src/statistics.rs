//! Statistic columns shared by scalar and time-course records.
//!
//! A measurement carries eight statistic fields. Scalar records store each
//! as `Option<f64>`; time courses store each as an optional, positionally
//! aligned `Vec<Option<f64>>`. [`StatColumn`] gives both shapes the same
//! indexed view so that every algorithm over statistics is written once,
//! with the scalar case being a column of length one.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::enums::{CentralTendency, StatField};

/// Statistic column of a scalar record.
pub type Scalar = Option<f64>;

/// Statistic column of a time course. Null entries keep their position.
pub type Series = Option<Vec<Option<f64>>>;

/// Indexed access to a statistic column.
pub trait StatColumn: Clone + Default + PartialEq + Debug {
    /// Number of positions in the column.
    fn len(&self) -> usize;

    /// True when the column carries no value at any position.
    fn is_null(&self) -> bool;

    fn get(&self, index: usize) -> Option<f64>;

    /// Builds a column from positional values. A column whose entries are all
    /// null collapses to the null column.
    fn from_values(values: Vec<Option<f64>>) -> Self;

    /// Applies `f` to every present entry, keeping nulls where they are.
    fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self;

    fn values(&self) -> Vec<Option<f64>> {
        (0..self.len()).map(|index| self.get(index)).collect()
    }

    /// Replaces NaN and infinite entries with null.
    fn sanitized(&self) -> Self {
        Self::from_values(
            self.values()
                .into_iter()
                .map(|value| value.filter(|v| v.is_finite()))
                .collect(),
        )
    }
}

impl StatColumn for Scalar {
    fn len(&self) -> usize {
        1
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn get(&self, index: usize) -> Option<f64> {
        if index == 0 { *self } else { None }
    }

    fn from_values(values: Vec<Option<f64>>) -> Self {
        values.first().copied().flatten()
    }

    fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        self.map(f)
    }
}

impl StatColumn for Series {
    fn len(&self) -> usize {
        self.as_ref().map_or(0, Vec::len)
    }

    fn is_null(&self) -> bool {
        self.as_ref()
            .is_none_or(|values| values.iter().all(Option::is_none))
    }

    fn get(&self, index: usize) -> Option<f64> {
        self.as_ref()
            .and_then(|values| values.get(index).copied().flatten())
    }

    fn from_values(values: Vec<Option<f64>>) -> Self {
        if values.iter().all(Option::is_none) {
            None
        } else {
            Some(values)
        }
    }

    fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        self.as_ref()
            .map(|values| values.iter().map(|value| value.map(&f)).collect())
    }
}

/// The eight statistic fields of a measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: StatColumn + Serialize",
    deserialize = "C: StatColumn + Deserialize<'de>"
))]
pub struct Statistics<C> {
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub value: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub mean: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub median: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub min: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub max: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub sd: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub se: C,
    #[serde(default, skip_serializing_if = "StatColumn::is_null")]
    pub cv: C,
}

impl<C: StatColumn> Statistics<C> {
    pub fn get(&self, field: StatField) -> &C {
        match field {
            StatField::Value => &self.value,
            StatField::Mean => &self.mean,
            StatField::Median => &self.median,
            StatField::Min => &self.min,
            StatField::Max => &self.max,
            StatField::Sd => &self.sd,
            StatField::Se => &self.se,
            StatField::Cv => &self.cv,
        }
    }

    pub fn get_mut(&mut self, field: StatField) -> &mut C {
        match field {
            StatField::Value => &mut self.value,
            StatField::Mean => &mut self.mean,
            StatField::Median => &mut self.median,
            StatField::Min => &mut self.min,
            StatField::Max => &mut self.max,
            StatField::Sd => &mut self.sd,
            StatField::Se => &mut self.se,
            StatField::Cv => &mut self.cv,
        }
    }

    pub fn set(&mut self, field: StatField, column: C) {
        *self.get_mut(field) = column;
    }

    /// Fields that carry at least one value.
    pub fn populated(&self) -> impl Iterator<Item = StatField> + '_ {
        StatField::ALL
            .into_iter()
            .filter(|field| !self.get(*field).is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.populated().next().is_none()
    }

    /// First populated central statistic in `order`.
    pub fn central(&self, order: &[CentralTendency]) -> Option<(CentralTendency, &C)> {
        order
            .iter()
            .map(|tendency| (*tendency, self.get(tendency.field())))
            .find(|(_, column)| !column.is_null())
    }

    /// Returns a copy with every column passed through [`StatColumn::sanitized`].
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        for field in StatField::ALL {
            let column = self.get(field).sanitized();
            out.set(field, column);
        }
        out
    }
}
