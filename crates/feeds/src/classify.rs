use formats::{RawFeature, RiskClass, RiskLevel};
use serde_json::Value;

use crate::protocol::HazardKind;

const RISK_KEYS: &[&str] = &["risk_level", "riskLevel", "risk_score", "risk"];
const MAGNITUDE_KEYS: &[&str] = &["magnitude", "mag"];

pub const MEDIUM_RISK_THRESHOLD: f64 = 1.5;
pub const HIGH_RISK_THRESHOLD: f64 = 2.5;

pub const CRITICAL_MAGNITUDE: f64 = 7.0;
pub const HIGH_MAGNITUDE: f64 = 6.0;
pub const MEDIUM_MAGNITUDE: f64 = 4.5;
/// Felt but minor; still Low, drawn in a lighter colour than micro-quakes.
pub const LIGHT_MAGNITUDE: f64 = 3.0;

/// Turns a feed record's raw fields into a [`RiskClass`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Classifier {
    /// Numeric 0..3 risk level bucketed at 1.5 and 2.5, or a text label.
    RiskLevel,
    /// Earthquake magnitude bands. The score is the magnitude.
    Magnitude,
    /// Station readings: always Low.
    Unbucketed,
}

impl Classifier {
    pub fn for_kind(kind: HazardKind) -> Self {
        match kind {
            HazardKind::Flood | HazardKind::Landslide | HazardKind::Fire => Classifier::RiskLevel,
            HazardKind::Seismic => Classifier::Magnitude,
            HazardKind::Weather => Classifier::Unbucketed,
        }
    }

    pub fn classify(self, feature: &RawFeature) -> RiskClass {
        match self {
            Classifier::RiskLevel => match feature.first_property(RISK_KEYS) {
                Some(Value::String(label)) => classify_label(label),
                Some(value) => match number(value) {
                    Some(score) => RiskClass::new(score, bucket_risk(score)),
                    None => RiskClass::LOW,
                },
                None => RiskClass::LOW,
            },
            Classifier::Magnitude => match feature.first_property(MAGNITUDE_KEYS).and_then(number)
            {
                Some(magnitude) => RiskClass::new(magnitude, bucket_magnitude(magnitude)),
                None => RiskClass::LOW,
            },
            Classifier::Unbucketed => RiskClass::LOW,
        }
    }

    pub fn classify_all(self, features: &mut [RawFeature]) {
        for feature in features {
            feature.risk = self.classify(feature);
        }
    }
}

pub fn bucket_risk(score: f64) -> RiskLevel {
    if score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn bucket_magnitude(magnitude: f64) -> RiskLevel {
    if magnitude >= CRITICAL_MAGNITUDE {
        RiskLevel::Critical
    } else if magnitude >= HIGH_MAGNITUDE {
        RiskLevel::High
    } else if magnitude >= MEDIUM_MAGNITUDE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn classify_label(label: &str) -> RiskClass {
    if let Ok(score) = label.trim().parse::<f64>() {
        return RiskClass::new(score, bucket_risk(score));
    }
    match RiskLevel::from_label(label) {
        Some(level) => RiskClass::new(nominal_score(level), level),
        None => RiskClass::LOW,
    }
}

/// Representative score for a text label, on the same 0..3 scale.
fn nominal_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 1.0,
        RiskLevel::Medium => 2.0,
        RiskLevel::High => 2.5,
        RiskLevel::Critical => 3.0,
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::{Classifier, bucket_magnitude, bucket_risk};
    use crate::protocol::HazardKind;
    use formats::{RawFeature, RiskLevel};
    use serde_json::{Map, Value, json};

    fn record(value: Value) -> RawFeature {
        let Value::Object(props) = value else {
            panic!("record must be an object");
        };
        RawFeature::new(0, None, props)
    }

    #[test]
    fn risk_level_buckets() {
        assert_eq!(bucket_risk(0.0), RiskLevel::Low);
        assert_eq!(bucket_risk(1.49), RiskLevel::Low);
        assert_eq!(bucket_risk(1.5), RiskLevel::Medium);
        assert_eq!(bucket_risk(2.49), RiskLevel::Medium);
        assert_eq!(bucket_risk(2.5), RiskLevel::High);
        assert_eq!(bucket_risk(3.0), RiskLevel::High);
    }

    #[test]
    fn magnitude_buckets() {
        assert_eq!(bucket_magnitude(2.9), RiskLevel::Low);
        assert_eq!(bucket_magnitude(3.0), RiskLevel::Low);
        assert_eq!(bucket_magnitude(4.5), RiskLevel::Medium);
        assert_eq!(bucket_magnitude(6.0), RiskLevel::High);
        assert_eq!(bucket_magnitude(7.2), RiskLevel::Critical);
    }

    #[test]
    fn flood_reads_numeric_and_label_risk() {
        let c = Classifier::for_kind(HazardKind::Flood);
        let class = c.classify(&record(json!({ "risk_level": 2.7 })));
        assert_eq!(class.level, RiskLevel::High);
        assert_eq!(class.score, 2.7);

        let class = c.classify(&record(json!({ "riskLevel": "medium" })));
        assert_eq!(class.level, RiskLevel::Medium);

        let class = c.classify(&record(json!({ "risk": "1.7" })));
        assert_eq!(class.level, RiskLevel::Medium);

        let class = c.classify(&record(json!({ "risk_level": null, "risk_score": 2.6 })));
        assert_eq!(class.level, RiskLevel::High);

        let class = c.classify(&RawFeature::new(0, None, Map::new()));
        assert_eq!(class.level, RiskLevel::Low);
        assert_eq!(class.score, 0.0);
    }

    #[test]
    fn seismic_scores_by_magnitude() {
        let c = Classifier::for_kind(HazardKind::Seismic);
        let class = c.classify(&record(json!({ "mag": 6.3, "risk_level": 0.1 })));
        assert_eq!(class.level, RiskLevel::High);
        assert_eq!(class.score, 6.3);
    }

    #[test]
    fn weather_is_always_low() {
        let c = Classifier::for_kind(HazardKind::Weather);
        let class = c.classify(&record(json!({ "risk_level": 3.0 })));
        assert_eq!(class.level, RiskLevel::Low);
    }

    #[test]
    fn classify_all_tags_every_feature() {
        let mut features = vec![
            record(json!({ "risk_level": 0.5 })),
            record(json!({ "risk_level": 2.9 })),
        ];
        Classifier::RiskLevel.classify_all(&mut features);
        assert_eq!(features[0].risk.level, RiskLevel::Low);
        assert_eq!(features[1].risk.level, RiskLevel::High);
    }
}
