use std::fmt;

/// Stable identifier of a hazard feature within its source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        FeatureId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives a distinct id for the `n`-th duplicate of this one.
    pub fn with_suffix(&self, n: usize) -> Self {
        FeatureId(format!("{}#{n}", self.0))
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        FeatureId::new(s)
    }
}
