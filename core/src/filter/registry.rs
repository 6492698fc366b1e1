use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::modifier::SliceThicknessModifier;
use super::sorter::{ImagePositionSorter, InstanceNumberSorter};
use super::validator::{OrientationValidator, SliceSpacingValidator};
use super::Filter;
use crate::error::{IngestError, Result};

/// Named filter plus its parameters
///
/// Parses from `name` or `name:key=value,key=value`.
///
/// # Example
///
/// ```
/// use seriesdb_core::FilterSpec;
///
/// let spec: FilterSpec = "slice-spacing-validator:tolerance=0.05".parse().unwrap();
/// assert_eq!(spec.name, "slice-spacing-validator");
/// assert_eq!(spec.param("tolerance"), Some("0.05"));
/// assert_eq!(spec.to_string(), "slice-spacing-validator:tolerance=0.05");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(try_from = "String", into = "String"))]
pub struct FilterSpec {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder: Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Numeric parameter, `default` when absent
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilterParameter` if the value is not a finite
    /// non-negative number
    pub fn param_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.param(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
                _ => Err(self.invalid(format!("'{}' is not a valid {}", raw, key))),
            },
        }
    }

    /// Fails on any parameter outside `known`
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilterParameter` naming the first unknown key
    pub fn expect_params(&self, known: &[&str]) -> Result<()> {
        match self.params.keys().find(|key| !known.contains(&key.as_str())) {
            Some(key) => Err(self.invalid(format!("unknown parameter '{}'", key))),
            None => Ok(()),
        }
    }

    fn invalid(&self, message: String) -> IngestError {
        IngestError::InvalidFilterParameter {
            filter: self.name.clone(),
            message,
        }
    }

    /// Filter chain used when the caller configures none
    pub fn default_chain() -> Vec<FilterSpec> {
        vec![
            FilterSpec::new(InstanceNumberSorter::NAME),
            FilterSpec::new(SliceThicknessModifier::NAME),
        ]
    }
}

impl FromStr for FilterSpec {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, params) = match s.split_once(':') {
            Some((name, params)) => (name.trim(), Some(params)),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(IngestError::UnknownFilter(s.to_string()));
        }

        let mut spec = FilterSpec::new(name);
        for pair in params.into_iter().flat_map(|p| p.split(',')) {
            if pair.trim().is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    spec.params
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => return Err(spec.invalid(format!("expected key=value, got '{}'", pair))),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            write!(f, ":{}", params.join(","))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for FilterSpec {
    type Error = IngestError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<FilterSpec> for String {
    fn from(spec: FilterSpec) -> Self {
        spec.to_string()
    }
}

type Constructor = Box<dyn Fn(&FilterSpec) -> Result<Box<dyn Filter>> + Send + Sync>;

/// Name to constructor table for filters
pub struct FilterRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl FilterRegistry {
    /// Registry without any filter
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in filters
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(InstanceNumberSorter::NAME, |spec| {
            spec.expect_params(&[])?;
            Ok(Box::new(InstanceNumberSorter))
        });
        registry.register(ImagePositionSorter::NAME, |spec| {
            spec.expect_params(&[])?;
            Ok(Box::new(ImagePositionSorter))
        });
        registry.register(SliceThicknessModifier::NAME, |spec| {
            spec.expect_params(&[])?;
            Ok(Box::new(SliceThicknessModifier))
        });
        registry.register(SliceSpacingValidator::NAME, |spec| {
            spec.expect_params(&["tolerance"])?;
            let tolerance = spec.param_f64("tolerance", SliceSpacingValidator::DEFAULT_TOLERANCE)?;
            Ok(Box::new(SliceSpacingValidator::new(tolerance)))
        });
        registry.register(OrientationValidator::NAME, |spec| {
            spec.expect_params(&["tolerance"])?;
            let tolerance = spec.param_f64("tolerance", OrientationValidator::DEFAULT_TOLERANCE)?;
            Ok(Box::new(OrientationValidator::new(tolerance)))
        });
        registry
    }

    /// Registers a constructor, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&FilterSpec) -> Result<Box<dyn Filter>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Instantiates one filter
    ///
    /// # Errors
    ///
    /// Returns `UnknownFilter` for unregistered names, or the constructor's
    /// parameter error
    pub fn build(&self, spec: &FilterSpec) -> Result<Box<dyn Filter>> {
        let constructor = self
            .constructors
            .get(&spec.name)
            .ok_or_else(|| IngestError::UnknownFilter(spec.name.clone()))?;
        constructor(spec)
    }

    /// Instantiates a chain, preserving order
    ///
    /// # Errors
    ///
    /// Fails on the first spec that cannot be built
    pub fn build_chain(&self, specs: &[FilterSpec]) -> Result<Vec<Box<dyn Filter>>> {
        specs.iter().map(|spec| self.build(spec)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;
    use rstest::rstest;

    #[rstest]
    #[case("instance-number-sorter", "instance-number-sorter", 0)]
    #[case(" orientation-validator ", "orientation-validator", 0)]
    #[case("slice-spacing-validator:tolerance=0.5", "slice-spacing-validator", 1)]
    #[case("custom:a=1, b=2,", "custom", 2)]
    fn test_parse_spec(#[case] input: &str, #[case] name: &str, #[case] params: usize) {
        let spec: FilterSpec = input.parse().unwrap();
        assert_eq!(spec.name, name);
        assert_eq!(spec.params.len(), params);
    }

    #[rstest]
    #[case("")]
    #[case(":tolerance=1")]
    #[case("slice-spacing-validator:tolerance")]
    #[case("slice-spacing-validator:=1")]
    fn test_parse_spec_errors(#[case] input: &str) {
        assert!(input.parse::<FilterSpec>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let spec = FilterSpec::new("orientation-validator").with_param("tolerance", "0.001");
        assert_eq!(spec.to_string().parse::<FilterSpec>().unwrap(), spec);
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = FilterRegistry::default();
        assert_eq!(
            registry.names(),
            vec![
                "image-position-sorter",
                "instance-number-sorter",
                "orientation-validator",
                "slice-spacing-validator",
                "slice-thickness-modifier",
            ]
        );
        let chain = registry.build_chain(&FilterSpec::default_chain()).unwrap();
        assert_eq!(chain[0].kind(), FilterKind::Sorter);
        assert_eq!(chain[1].kind(), FilterKind::Modifier);
    }

    #[test]
    fn test_unknown_filter() {
        let registry = FilterRegistry::default();
        let err = registry.build(&FilterSpec::new("median-denoiser")).err().unwrap();
        assert!(matches!(err, IngestError::UnknownFilter(name) if name == "median-denoiser"));
    }

    #[rstest]
    #[case("slice-spacing-validator:tolerance=abc")]
    #[case("slice-spacing-validator:tolerance=-1")]
    #[case("orientation-validator:epsilon=0.1")]
    #[case("instance-number-sorter:reverse=true")]
    fn test_invalid_parameters(#[case] input: &str) {
        let registry = FilterRegistry::default();
        let spec: FilterSpec = input.parse().unwrap();
        let err = registry.build(&spec).err().unwrap();
        assert!(matches!(err, IngestError::InvalidFilterParameter { .. }));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FilterRegistry::empty();
        assert!(!registry.contains(InstanceNumberSorter::NAME));
        registry.register("my-sorter", |_| Ok(Box::new(InstanceNumberSorter)));
        assert!(registry.build(&FilterSpec::new("my-sorter")).is_ok());
    }
}
