//! Domain types for canopy-io.

/// A sample (column) name from a GCT header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SampleName(String);

impl SampleName {
    pub(crate) fn new(name: String) -> Self {
        Self(name)
    }

    /// Return the sample name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SampleName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_name_as_str_returns_inner() {
        let name = SampleName::new("AML_12".to_string());
        assert_eq!(name.as_str(), "AML_12");
        assert_eq!(name.to_string(), "AML_12");
        assert_eq!(SampleName::from("AML_12"), name);
    }
}
