use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use foundation::{FeatureId, LatLng, centroid};
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryKind {
    Point,
    Polygon,
}

/// Risk bucket assigned by a hazard source's classifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Parses `low|medium|high|critical` in any case.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" | "moderate" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" | "severe" => Some(RiskLevel::Critical),
            _ => None,
        }
    }

    /// High and Critical features drive the initial viewport.
    pub fn is_elevated(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RiskClass {
    pub score: f64,
    pub level: RiskLevel,
}

impl RiskClass {
    pub const LOW: RiskClass = RiskClass {
        score: 0.0,
        level: RiskLevel::Low,
    };

    pub fn new(score: f64, level: RiskLevel) -> Self {
        Self { score, level }
    }
}

impl Default for RiskClass {
    fn default() -> Self {
        RiskClass::LOW
    }
}

/// Primitive attribute carried through to the detail popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A validated, renderable hazard feature.
///
/// `coordinates` holds one position for points and an open ring of at least
/// three positions for polygons. Every position is finite and in range.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardFeature {
    pub id: FeatureId,
    pub geometry_kind: GeometryKind,
    pub coordinates: Vec<LatLng>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub source_timestamp: Option<DateTime<Utc>>,
}

impl HazardFeature {
    /// Point position, or the vertex mean of a polygon ring.
    pub fn anchor(&self) -> LatLng {
        match self.geometry_kind {
            GeometryKind::Point => self.coordinates[0],
            GeometryKind::Polygon => {
                centroid(&self.coordinates).unwrap_or(self.coordinates[0])
            }
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.attributes.get(key) {
            Some(AttributeValue::Number(n)) => Some(*n),
            _ => None,
        }
    }
}
