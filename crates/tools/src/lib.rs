//! Offline helpers behind the `hazards` CLI.

use feeds::{Classifier, HazardKind};
use formats::{FeaturePayload, GeometryKind, PayloadError, RiskLevel, normalize};
use layers::{RecordingBackend, style_for};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub id: String,
    pub geometry: GeometryKind,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    /// `[lat, lng]`
    pub anchor: [f64; 2],
    pub vertices: usize,
    pub fill_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub accepted: Vec<FeatureSummary>,
    pub rejected: Vec<RejectedRecord>,
}

/// Parses, classifies and normalizes one feed response the way a layer
/// selection would, without drawing anything.
pub fn normalize_report(input: &str, kind: HazardKind) -> Result<NormalizeReport, PayloadError> {
    let mut payload = FeaturePayload::from_json_str(input, kind.path())?;
    Classifier::for_kind(kind).classify_all(&mut payload.features);

    let mut report = NormalizeReport::default();
    for raw in &payload.features {
        match normalize(raw) {
            Ok(feature) => {
                let anchor = feature.anchor();
                report.accepted.push(FeatureSummary {
                    id: feature.id.to_string(),
                    geometry: feature.geometry_kind,
                    risk_level: feature.risk_level,
                    risk_score: feature.risk_score,
                    anchor: [anchor.lat, anchor.lng],
                    vertices: feature.coordinates.len(),
                    fill_color: style_for(kind, &feature).fill_color.to_string(),
                });
            }
            Err(reason) => report.rejected.push(RejectedRecord {
                index: raw.index,
                id: raw.id.clone(),
                reason: reason.to_string(),
            }),
        }
    }
    Ok(report)
}

/// One line per live overlay, in handle order.
pub fn describe_overlays(backend: &RecordingBackend) -> Vec<String> {
    backend
        .live_overlays()
        .map(|(handle, overlay)| {
            let first = overlay.vertices.first();
            format!(
                "#{} {} vertices={} fill={} opacity={:.2} at={}",
                handle.0,
                if overlay.vertices.len() == 1 { "point" } else { "polygon" },
                overlay.vertices.len(),
                overlay.style.fill_color,
                overlay.fill_opacity,
                first
                    .map(|p| format!("{:.4},{:.4}", p.lat, p.lng))
                    .unwrap_or_default(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reports_accepted_and_rejected_records() {
        let input = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[122.5, 10.7], [122.6, 10.7], [122.6, 10.8], [122.5, 10.7]]]
                    },
                    "properties": { "id": "zone-1", "risk_level": 2.7 }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Polygon", "coordinates": [[[122.5, 10.7], [122.6, 10.7]]] },
                    "properties": { "id": "zone-2", "risk_level": 1.0 }
                }
            ]
        }"#;
        let report = normalize_report(input, HazardKind::Flood).expect("valid payload");
        assert_eq!(report.accepted.len(), 1);
        let zone = &report.accepted[0];
        assert_eq!(zone.id, "zone-1");
        assert_eq!(zone.risk_level, RiskLevel::High);
        assert_eq!(zone.vertices, 3);
        assert_eq!(zone.fill_color, "#0D47A1");

        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].id.as_deref(), Some("zone-2"));
    }

    #[test]
    fn seismic_records_are_classified_by_magnitude() {
        let input = r#"[{ "id": "eq", "latitude": 10.7, "longitude": 122.5, "magnitude": 6.4 }]"#;
        let report = normalize_report(input, HazardKind::Seismic).expect("valid payload");
        assert_eq!(report.accepted[0].risk_level, RiskLevel::High);
        assert_eq!(report.accepted[0].anchor, [10.7, 122.5]);
    }

    #[test]
    fn non_json_input_is_an_error() {
        assert!(normalize_report("not json", HazardKind::Weather).is_err());
    }
}
