//! Per-feature `[lower, upper]` limits.
//!
//! A cut is a closed interval: a value passes when `lower <= value <= upper`.
//! Unconstrained sides are stored as `-inf` / `+inf`, so the same comparison
//! applies to every feature regardless of its boundary type. `NaN` never passes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::{error::ConfigurationError, feature::FeatureTable};

/// Closed interval limits for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// The interval that accepts every finite value.
    pub const OPEN: Self = Self {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Returns whether every value lies inside its feature's interval.
#[must_use]
pub fn passes(bounds: &[Bounds], values: &[f64]) -> bool {
    debug_assert_eq!(bounds.len(), values.len());
    bounds.iter().zip(values).all(|(b, v)| b.contains(*v))
}

/// Limits for every feature of a [`FeatureTable`], in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsVector {
    bounds: Vec<Bounds>,
}

impl BoundsVector {
    #[must_use]
    pub fn new(bounds: Vec<Bounds>) -> Self {
        Self { bounds }
    }

    /// A vector of `len` fully open intervals.
    #[must_use]
    pub fn open(len: usize) -> Self {
        Self {
            bounds: vec![Bounds::OPEN; len],
        }
    }

    /// Zips separate lower/upper limit tables, checking both against the feature count.
    pub fn from_limits(
        features: &FeatureTable,
        lower: &[f64],
        upper: &[f64],
    ) -> Result<Self, ConfigurationError> {
        features.check_len("lower", lower.len())?;
        features.check_len("upper", upper.len())?;
        let bounds = lower
            .iter()
            .zip(upper)
            .map(|(&lower, &upper)| Bounds { lower, upper })
            .collect();
        Ok(Self { bounds })
    }

    /// Fails on the first feature whose `lower >= upper`.
    pub fn check_ordered(&self, features: &FeatureTable) -> Result<(), ConfigurationError> {
        features.check_len("bounds", self.len())?;
        for (feature, b) in features.iter().zip(&self.bounds) {
            if !(b.lower < b.upper) {
                return Err(ConfigurationError::InvertedBounds {
                    feature: feature.name().to_owned(),
                    lower: b.lower,
                    upper: b.upper,
                });
            }
        }
        Ok(())
    }

    /// Resets every side that the feature's boundary type leaves unconstrained to infinity.
    #[must_use]
    pub fn relax_unconstrained(mut self, features: &FeatureTable) -> Self {
        for (feature, b) in features.iter().zip(&mut self.bounds) {
            let boundary = feature.boundary_type();
            if !boundary.constrains_lower() {
                b.lower = f64::NEG_INFINITY;
            }
            if !boundary.constrains_upper() {
                b.upper = f64::INFINITY;
            }
        }
        self
    }

    #[must_use]
    pub fn contains(&self, values: &[f64]) -> bool {
        passes(&self.bounds, values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Bounds> {
        self.bounds.get(index).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Bounds] {
        &self.bounds
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Bounds> {
        self.bounds
    }

    #[must_use]
    pub fn lower_limits(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.lower).collect()
    }

    #[must_use]
    pub fn upper_limits(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.upper).collect()
    }
}

/// Encodes limits as a JSON array, writing non-finite values as `"-inf"`, `"+inf"` or `"nan"`.
#[must_use]
pub fn limits_to_json(limits: &[f64]) -> Value {
    Value::Array(
        limits
            .iter()
            .map(|&v| match Number::from_f64(v) {
                Some(n) => Value::Number(n),
                None if v.is_nan() => Value::String("nan".to_owned()),
                None if v > 0.0 => Value::String("+inf".to_owned()),
                None => Value::String("-inf".to_owned()),
            })
            .collect(),
    )
}

/// Decodes an array written by [`limits_to_json`].
pub fn limits_from_json(value: &Value) -> Result<Vec<f64>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("expected an array of limits, found {value}"))?;
    items
        .iter()
        .map(|item| match item {
            Value::Number(n) => n.as_f64().ok_or_else(|| format!("invalid number {n}")),
            Value::String(s) => match s.as_str() {
                "-inf" => Ok(f64::NEG_INFINITY),
                "+inf" | "inf" => Ok(f64::INFINITY),
                "nan" => Ok(f64::NAN),
                _ => Err(format!("invalid limit '{s}'")),
            },
            other => Err(format!("invalid limit {other}")),
        })
        .collect()
}

#[derive(Serialize, Deserialize)]
struct BoundsVectorRepr {
    lower: Value,
    upper: Value,
}

impl Serialize for BoundsVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BoundsVectorRepr {
            lower: limits_to_json(&self.lower_limits()),
            upper: limits_to_json(&self.upper_limits()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundsVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = BoundsVectorRepr::deserialize(deserializer)?;
        let lower = limits_from_json(&repr.lower).map_err(serde::de::Error::custom)?;
        let upper = limits_from_json(&repr.upper).map_err(serde::de::Error::custom)?;
        if lower.len() != upper.len() {
            return Err(serde::de::Error::custom(format!(
                "lower has {} limits but upper has {}",
                lower.len(),
                upper.len()
            )));
        }
        Ok(Self {
            bounds: lower
                .into_iter()
                .zip(upper)
                .map(|(lower, upper)| Bounds { lower, upper })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{BoundaryType, FeatureSpec};

    fn table(types: &[BoundaryType]) -> FeatureTable {
        FeatureTable::new(
            types
                .iter()
                .enumerate()
                .map(|(i, &t)| FeatureSpec::new(format!("f{i}"), t, 0.9).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_closed_interval() {
        let b = Bounds::new(-1.0, 2.0);
        assert!(b.contains(-1.0));
        assert!(b.contains(2.0));
        assert!(!b.contains(2.000_000_1));
        assert!(!b.contains(f64::NAN));
        assert!(Bounds::OPEN.contains(f64::MAX));
    }

    #[test]
    fn test_length_mismatch() {
        let features = table(&[BoundaryType::TwoSided; 3]);
        let err = BoundsVector::from_limits(&features, &[0.0, 0.0], &[1.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::LengthMismatch {
                table: "lower".to_owned(),
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_inverted_bounds_name_the_feature() {
        let features = table(&[BoundaryType::TwoSided]);
        let bounds = BoundsVector::from_limits(&features, &[5.0], &[1.0]).unwrap();
        let err = bounds.check_ordered(&features).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvertedBounds { ref feature, .. } if feature == "f0"
        ));
        let equal = BoundsVector::from_limits(&features, &[1.0], &[1.0]).unwrap();
        assert!(equal.check_ordered(&features).is_err());
    }

    #[test]
    fn test_relax_unconstrained() {
        let features = table(&[BoundaryType::UpperOnly, BoundaryType::LowerOnly]);
        let bounds = BoundsVector::new(vec![Bounds::new(0.0, 1.0), Bounds::new(2.0, 3.0)])
            .relax_unconstrained(&features);
        assert_eq!(bounds.lower_limits(), vec![f64::NEG_INFINITY, 2.0]);
        assert_eq!(bounds.upper_limits(), vec![1.0, f64::INFINITY]);
    }

    #[test]
    fn test_json_limits_keep_infinities() {
        let limits = [f64::NEG_INFINITY, 0.1 + 0.2, f64::INFINITY, -0.0];
        let decoded = limits_from_json(&limits_to_json(&limits)).unwrap();
        for (a, b) in limits.iter().zip(&decoded) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert!(limits_from_json(&serde_json::json!(["wide"])).is_err());
        assert!(limits_from_json(&serde_json::json!(1.0)).is_err());
    }

    #[test]
    fn test_bounds_vector_serde() {
        let bounds = BoundsVector::new(vec![Bounds::new(f64::NEG_INFINITY, 0.0607)]);
        let text = serde_json::to_string(&bounds).unwrap();
        assert_eq!(text, r#"{"lower":["-inf"],"upper":[0.0607]}"#);
        let back: BoundsVector = serde_json::from_str(&text).unwrap();
        assert_eq!(back, bounds);
    }
}
