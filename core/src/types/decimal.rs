use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Multi-valued decimal string (DS) parsed into numbers
///
/// DICOM separates DS values with a backslash, but files in the wild also
/// carry spaces, commas or bracketed lists. All of those parse the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimalList(Vec<f64>);

impl DecimalList {
    pub fn new(values: Vec<f64>) -> Self {
        DecimalList(values)
    }

    /// Parses every decimal number found in the string
    ///
    /// Accepts formats like:
    /// - "0.5\\0.5\\1.25"
    /// - "0.5 0.5"
    /// - "[0.5, 0.5]"
    /// - Exponential notation: "1.5e-4\\1.5e-4"
    ///
    /// # Errors
    ///
    /// Returns an error if the string holds no number at all
    pub fn parse(s: &str) -> Result<Self, String> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("Failed to compile regex")
        });

        let values = re
            .find_iter(s)
            .map(|m| {
                m.as_str()
                    .parse::<f64>()
                    .map_err(|e| format!("Failed to parse decimal '{}': {}", m.as_str(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if values.is_empty() {
            return Err(format!("No decimal value in '{}'", s));
        }
        Ok(DecimalList(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl fmt::Display for DecimalList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("\\"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backslash_separator() {
        let list = DecimalList::parse("0.1\\0.1\\2.5").unwrap();
        assert_eq!(list.values(), &[0.1, 0.1, 2.5]);
    }

    #[test]
    fn test_parse_negative_and_exponent() {
        let list = DecimalList::parse("-120.5\\1.5e-1\\+3").unwrap();
        assert_eq!(list.values(), &[-120.5, 0.15, 3.0]);
    }

    #[test]
    fn test_parse_array_format() {
        let list = DecimalList::parse("[0.1, 0.2]").unwrap();
        assert_eq!(list.values(), &[0.1, 0.2]);
    }

    #[test]
    fn test_display_uses_backslash() {
        let list = DecimalList::parse("1 2.5").unwrap();
        assert_eq!(list.to_string(), "1\\2.5");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DecimalList::parse("invalid").is_err());
        assert!(DecimalList::parse("").is_err());
    }
}
