use feeds::HazardKind;
use formats::HazardFeature;
use foundation::LatLng;
use tracing::debug;

use crate::render::{OverlayHandle, PopupContent, PopupRef, RenderBackend};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ActivePopup {
    pub popup: PopupRef,
    pub overlay: OverlayHandle,
    pub anchor: LatLng,
}

/// Keeps at most one detail popup open: close before open.
#[derive(Debug, Default)]
pub struct InteractionBroker {
    active: Option<ActivePopup>,
}

impl InteractionBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActivePopup> {
        self.active.as_ref()
    }

    pub fn open<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        overlay: OverlayHandle,
        anchor: LatLng,
        content: &PopupContent,
    ) -> PopupRef {
        self.close(backend);
        let popup = backend.open_popup(anchor, content);
        debug!(popup = popup.0, overlay = overlay.0, "popup opened");
        self.active = Some(ActivePopup {
            popup,
            overlay,
            anchor,
        });
        popup
    }

    /// Closes the active popup, if any. Returns whether one was open.
    pub fn close<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        match self.active.take() {
            Some(active) => {
                backend.close_popup(active.popup);
                true
            }
            None => false,
        }
    }

    /// The popup's own close affordance was used.
    pub fn on_closed(&mut self, popup: PopupRef) -> bool {
        if self.active.is_some_and(|a| a.popup == popup) {
            self.active = None;
            true
        } else {
            false
        }
    }
}

/// Title, score, timestamp, then attributes in key order.
pub fn popup_content(kind: HazardKind, feature: &HazardFeature) -> PopupContent {
    let mut lines = Vec::with_capacity(feature.attributes.len() + 2);
    match kind {
        HazardKind::Seismic => lines.push(format!("Magnitude: {:.1}", feature.risk_score)),
        _ => lines.push(format!("Risk score: {:.1}", feature.risk_score)),
    }
    if let Some(ts) = feature.source_timestamp {
        lines.push(format!("Updated: {}", ts.format("%Y-%m-%d %H:%M UTC")));
    }
    for (key, value) in &feature.attributes {
        lines.push(format!("{key}: {value}"));
    }
    PopupContent {
        title: format!("{} Risk: {}", kind.title(), feature.risk_level.label()),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingBackend;
    use chrono::{TimeZone, Utc};
    use formats::{AttributeValue, GeometryKind, RiskLevel};
    use foundation::FeatureId;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn content(title: &str) -> PopupContent {
        PopupContent {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    #[test]
    fn opening_a_second_popup_closes_the_first() {
        let mut backend = RecordingBackend::new();
        let mut broker = InteractionBroker::new();

        let a = broker.open(&mut backend, OverlayHandle(1), LatLng::new(1.0, 1.0), &content("A"));
        let b = broker.open(&mut backend, OverlayHandle(2), LatLng::new(2.0, 2.0), &content("B"));

        assert_ne!(a, b);
        assert_eq!(backend.open_popup_count(), 1);
        assert_eq!(backend.open_popup_anchors(), vec![LatLng::new(2.0, 2.0)]);
        assert_eq!(broker.active().map(|p| p.overlay), Some(OverlayHandle(2)));
    }

    #[test]
    fn close_affordance_clears_only_the_active_popup() {
        let mut backend = RecordingBackend::new();
        let mut broker = InteractionBroker::new();
        let a = broker.open(&mut backend, OverlayHandle(1), LatLng::new(1.0, 1.0), &content("A"));
        let b = broker.open(&mut backend, OverlayHandle(2), LatLng::new(2.0, 2.0), &content("B"));

        assert!(!broker.on_closed(a));
        assert!(broker.active().is_some());
        assert!(broker.on_closed(b));
        assert!(broker.active().is_none());
        assert!(!broker.close(&mut backend));
    }

    #[test]
    fn content_lists_attributes_in_key_order() {
        let mut attributes = BTreeMap::new();
        attributes.insert("zone".to_string(), AttributeValue::Text("Jaro".to_string()));
        attributes.insert("area_km2".to_string(), AttributeValue::Number(1.5));
        let feature = HazardFeature {
            id: FeatureId::new("f"),
            geometry_kind: GeometryKind::Point,
            coordinates: vec![LatLng::new(10.0, 122.0)],
            risk_score: 2.7,
            risk_level: RiskLevel::High,
            attributes,
            source_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).single(),
        };

        let c = popup_content(HazardKind::Flood, &feature);
        assert_eq!(c.title, "Flood Risk: HIGH");
        assert_eq!(
            c.lines,
            vec![
                "Risk score: 2.7".to_string(),
                "Updated: 2024-03-01 08:30 UTC".to_string(),
                "area_km2: 1.5".to_string(),
                "zone: Jaro".to_string(),
            ]
        );
    }
}
