//! Static description of the discriminating features.

use std::{collections::HashSet, fmt, str::FromStr};

use crate::error::ConfigurationError;

/// Which side(s) of a feature's range a cut constrains.
///
/// The numeric codes `0`, `1`, `2` are accepted for compatibility with older
/// configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryType {
    /// Only an upper cut is applied; the lower side is never tightened.
    UpperOnly,
    /// Only a lower cut is applied; the upper side is never tightened.
    LowerOnly,
    /// Both sides are cut.
    TwoSided,
}

impl BoundaryType {
    /// Maps a legacy numeric code to a boundary type.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::UpperOnly),
            1 => Some(Self::LowerOnly),
            2 => Some(Self::TwoSided),
            _ => None,
        }
    }

    #[must_use]
    pub fn constrains_lower(self) -> bool {
        matches!(self, Self::LowerOnly | Self::TwoSided)
    }

    #[must_use]
    pub fn constrains_upper(self) -> bool {
        matches!(self, Self::UpperOnly | Self::TwoSided)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpperOnly => "upper_only",
            Self::LowerOnly => "lower_only",
            Self::TwoSided => "two_sided",
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upper_only" => Ok(Self::UpperOnly),
            "lower_only" => Ok(Self::LowerOnly),
            "two_sided" => Ok(Self::TwoSided),
            _ => s
                .parse::<u64>()
                .ok()
                .and_then(Self::from_code)
                .ok_or(()),
        }
    }
}

/// One feature: its name, which sides are cut, and the outlier trim target.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    name: String,
    boundary_type: BoundaryType,
    trim_target: f64,
}

impl FeatureSpec {
    /// Creates a feature, rejecting trim targets outside the open interval `(0, 1)`.
    pub fn new(
        name: impl Into<String>,
        boundary_type: BoundaryType,
        trim_target: f64,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if !(trim_target > 0.0 && trim_target < 1.0) {
            return Err(ConfigurationError::TrimTargetOutOfRange {
                feature: name,
                trim_target,
            });
        }
        Ok(Self {
            name,
            boundary_type,
            trim_target,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    /// Fraction of the signal sample kept inside the outlier bounds.
    #[must_use]
    pub fn trim_target(&self) -> f64 {
        self.trim_target
    }
}

/// The ordered feature table. Every sample and bounds vector is aligned with it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    features: Vec<FeatureSpec>,
}

impl FeatureTable {
    pub fn new(features: Vec<FeatureSpec>) -> Result<Self, ConfigurationError> {
        if features.is_empty() {
            return Err(ConfigurationError::NoFeatures);
        }
        let mut seen = HashSet::new();
        for feature in &features {
            if !seen.insert(feature.name()) {
                return Err(ConfigurationError::Duplicate {
                    kind: "feature",
                    name: feature.name().to_owned(),
                });
            }
        }
        Ok(Self { features })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureSpec> + '_ {
        self.features.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FeatureSpec> {
        self.features.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Fails with [`ConfigurationError::LengthMismatch`] unless `actual` equals the
    /// number of features.
    pub fn check_len(&self, table: &str, actual: usize) -> Result<(), ConfigurationError> {
        if actual == self.len() {
            Ok(())
        } else {
            Err(ConfigurationError::LengthMismatch {
                table: table.to_owned(),
                expected: self.len(),
                actual,
            })
        }
    }
}
