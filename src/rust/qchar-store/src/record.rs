// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! In-memory form of one persisted experiment.
//!
//! A record mirrors the layout of the experiment files: a flat set of scalar
//! attributes (constructor parameters and derived scalars) and a set of named
//! n-dimensional datasets. Insertion order is preserved so that a saved file
//! lists parameters in the order the experiment declares them.

use indexmap::IndexMap;
use ndarray::{Array1, ArrayD};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Attribute {
    fn type_name(&self) -> &'static str {
        match self {
            Attribute::Float(_) => "a float",
            Attribute::Int(_) => "an integer",
            Attribute::Bool(_) => "a boolean",
            Attribute::Text(_) => "text",
        }
    }
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Attribute::Float(value)
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::Int(value)
    }
}

impl From<usize> for Attribute {
    fn from(value: usize) -> Self {
        Attribute::Int(value as i64)
    }
}

impl From<u16> for Attribute {
    fn from(value: u16) -> Self {
        Attribute::Int(value.into())
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::Text(value)
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Float64(ArrayD<f64>),
    Complex64(ArrayD<Complex64>),
}

impl Dataset {
    fn type_name(&self) -> &'static str {
        match self {
            Dataset::Float64(_) => "float64 samples",
            Dataset::Complex64(_) => "complex128 samples",
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Dataset::Float64(a) => a.shape(),
            Dataset::Complex64(a) => a.shape(),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Dataset::Float64(a) => a.iter().all(|x| x.is_finite()),
            Dataset::Complex64(a) => a.iter().all(|x| x.is_finite()),
        }
    }
}

impl From<ArrayD<f64>> for Dataset {
    fn from(value: ArrayD<f64>) -> Self {
        Dataset::Float64(value)
    }
}

impl From<ArrayD<Complex64>> for Dataset {
    fn from(value: ArrayD<Complex64>) -> Self {
        Dataset::Complex64(value)
    }
}

impl From<Array1<f64>> for Dataset {
    fn from(value: Array1<f64>) -> Self {
        Dataset::Float64(value.into_dyn())
    }
}

impl From<Vec<f64>> for Dataset {
    fn from(value: Vec<f64>) -> Self {
        Dataset::Float64(Array1::from(value).into_dyn())
    }
}

impl From<Array1<Complex64>> for Dataset {
    fn from(value: Array1<Complex64>) -> Self {
        Dataset::Complex64(value.into_dyn())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: String,
    attrs: IndexMap<String, Attribute>,
    datasets: IndexMap<String, Dataset>,
}

impl Record {
    pub fn new(kind: impl Into<String>) -> Self {
        Record {
            kind: kind.into(),
            attrs: IndexMap::new(),
            datasets: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Fail unless the record was written by an experiment of `kind`.
    pub fn expect_kind(&self, kind: &str) -> Result<()> {
        if self.kind != kind {
            return Err(Error::KindMismatch {
                expected: kind.to_string(),
                found: self.kind.clone(),
            });
        }
        Ok(())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<Attribute>) -> &mut Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn required_attr(&self, name: &str) -> Result<&Attribute> {
        self.attrs
            .get(name)
            .ok_or_else(|| Error::MissingAttribute(name.to_string()))
    }

    fn mismatch(name: &str, expected: &'static str, found: &'static str) -> Error {
        Error::TypeMismatch {
            name: name.to_string(),
            expected,
            found,
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.required_attr(name)? {
            Attribute::Float(v) => Ok(*v),
            other => Err(Self::mismatch(name, "a float", other.type_name())),
        }
    }

    /// Like [`Record::float`], but files written before `name` existed
    /// yield `default`.
    pub fn float_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.attrs.get(name) {
            None => Ok(default),
            Some(_) => self.float(name),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.required_attr(name)? {
            Attribute::Int(v) => Ok(*v),
            other => Err(Self::mismatch(name, "an integer", other.type_name())),
        }
    }

    /// Integer attribute converted to a narrower type, such as a port number.
    pub fn int_as<T: TryFrom<i64>>(&self, name: &str) -> Result<T> {
        let value = self.int(name)?;
        T::try_from(value).map_err(|_| {
            Error::new(format!(
                "Attribute '{name}' = {value} is out of range for {}",
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.required_attr(name)? {
            Attribute::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(name, "a boolean", other.type_name())),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.required_attr(name)? {
            Attribute::Text(v) => Ok(v),
            other => Err(Self::mismatch(name, "text", other.type_name())),
        }
    }

    pub fn set_dataset(&mut self, name: &str, value: impl Into<Dataset>) -> &mut Self {
        self.datasets.insert(name.to_string(), value.into());
        self
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.datasets.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn required_dataset(&self, name: &str) -> Result<&Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| Error::MissingDataset(name.to_string()))
    }

    pub fn float_dataset(&self, name: &str) -> Result<&ArrayD<f64>> {
        match self.required_dataset(name)? {
            Dataset::Float64(a) => Ok(a),
            other => Err(Self::mismatch(name, "float64 samples", other.type_name())),
        }
    }

    pub fn complex_dataset(&self, name: &str) -> Result<&ArrayD<Complex64>> {
        match self.required_dataset(name)? {
            Dataset::Complex64(a) => Ok(a),
            other => Err(Self::mismatch(name, "complex128 samples", other.type_name())),
        }
    }

    /// One-dimensional float dataset as a plain vector.
    pub fn float_vec(&self, name: &str) -> Result<Vec<f64>> {
        let array = self.float_dataset(name)?;
        if array.ndim() != 1 {
            return Err(Error::new(format!(
                "Dataset '{name}' has shape {:?}, expected one dimension",
                array.shape()
            )));
        }
        Ok(array.iter().copied().collect())
    }

    pub(crate) fn check_finite(&self) -> Result<()> {
        for (name, attr) in &self.attrs {
            if let Attribute::Float(v) = attr
                && !v.is_finite()
            {
                return Err(Error::NonFinite(name.clone()));
            }
        }
        for (name, dataset) in &self.datasets {
            if !dataset.is_finite() {
                return Err(Error::NonFinite(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut record = Record::new("sweep");
        record
            .set_attr("freq_center", 6.0e9)
            .set_attr("readout_port", 1u16)
            .set_attr("dither", true)
            .set_attr("jpa_params", "{}");
        assert_eq!(record.float("freq_center").unwrap(), 6.0e9);
        assert_eq!(record.int_as::<u16>("readout_port").unwrap(), 1);
        assert!(record.flag("dither").unwrap());
        assert_eq!(record.text("jpa_params").unwrap(), "{}");
        assert!(matches!(
            record.int("freq_center"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            record.float("missing"),
            Err(Error::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_float_or_default() {
        let mut record = Record::new("two_tone_pulsed");
        assert_eq!(record.float_or("drag", 0.0).unwrap(), 0.0);
        record.set_attr("drag", 0.25);
        assert_eq!(record.float_or("drag", 0.0).unwrap(), 0.25);
        record.set_attr("drag", 1i64);
        assert!(record.float_or("drag", 0.0).is_err());
    }

    #[test]
    fn test_int_out_of_range() {
        let mut record = Record::new("sweep");
        record.set_attr("output_port", 70_000i64);
        assert!(record.int_as::<u16>("output_port").is_err());
    }

    #[test]
    fn test_datasets() {
        let mut record = Record::new("sweep");
        record.set_dataset("freq_arr", vec![1.0, 2.0, 3.0]);
        record.set_dataset(
            "resp_arr",
            Array1::from(vec![Complex64::new(1.0, -1.0)]),
        );
        assert_eq!(record.float_vec("freq_arr").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(record.complex_dataset("resp_arr").unwrap().len(), 1);
        assert!(record.complex_dataset("freq_arr").is_err());
        assert!(matches!(
            record.float_dataset("t_arr"),
            Err(Error::MissingDataset(_))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut record = Record::new("sweep");
        record.set_attr("df", f64::NAN);
        assert!(matches!(record.check_finite(), Err(Error::NonFinite(_))));
    }
}
