use std::collections::HashMap;

use feeds::HazardKind;
use formats::HazardFeature;
use foundation::{Arena, FeatureId, Handle};
use runtime::Generation;

use crate::layer::LayerId;
use crate::render::OverlayHandle;
use crate::symbology::OverlayStyle;

/// Ownership record for one overlay on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay {
    pub layer: LayerId,
    pub kind: HazardKind,
    pub feature: HazardFeature,
    pub handle: OverlayHandle,
    pub style: OverlayStyle,
    pub generation: Generation,
}

/// Every live overlay in one arena, indexed by `(kind, feature id)` and by
/// render handle.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    arena: Arena<RenderedOverlay>,
    by_key: HashMap<(HazardKind, FeatureId), Handle>,
    by_render: HashMap<OverlayHandle, Handle>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains_key(&self, kind: HazardKind, id: &FeatureId) -> bool {
        self.by_key.contains_key(&(kind, id.clone()))
    }

    /// `id` if unused for `kind`, else the first free `id#n`.
    pub fn unique_id(&self, kind: HazardKind, id: &FeatureId) -> FeatureId {
        if !self.contains_key(kind, id) {
            return id.clone();
        }
        let mut n = 1;
        loop {
            let candidate = id.with_suffix(n);
            if !self.contains_key(kind, &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Registers an overlay. The caller guarantees the key is unused.
    pub fn insert(&mut self, overlay: RenderedOverlay) -> Handle {
        let key = (overlay.kind, overlay.feature.id.clone());
        let render = overlay.handle;
        let slot = self.arena.insert(overlay);
        self.by_key.insert(key, slot);
        self.by_render.insert(render, slot);
        slot
    }

    pub fn get(&self, kind: HazardKind, id: &FeatureId) -> Option<&RenderedOverlay> {
        let slot = self.by_key.get(&(kind, id.clone()))?;
        self.arena.get(*slot)
    }

    pub fn by_render_handle(&self, handle: OverlayHandle) -> Option<&RenderedOverlay> {
        let slot = self.by_render.get(&handle)?;
        self.arena.get(*slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedOverlay> + '_ {
        self.arena.iter().map(|(_, o)| o)
    }

    pub fn count_kind(&self, kind: HazardKind) -> usize {
        self.iter().filter(|o| o.kind == kind).count()
    }

    /// Empties the registry, returning every record for release.
    pub fn drain(&mut self) -> Vec<RenderedOverlay> {
        self.by_key.clear();
        self.by_render.clear();
        self.arena.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbology::indicator_style;
    use formats::{GeometryKind, RiskLevel};
    use foundation::LatLng;
    use std::collections::BTreeMap;

    fn overlay(kind: HazardKind, id: &str, handle: u64) -> RenderedOverlay {
        RenderedOverlay {
            layer: LayerId::All,
            kind,
            feature: HazardFeature {
                id: FeatureId::new(id),
                geometry_kind: GeometryKind::Point,
                coordinates: vec![LatLng::new(10.0, 122.0)],
                risk_score: 0.0,
                risk_level: RiskLevel::Low,
                attributes: BTreeMap::new(),
                source_timestamp: None,
            },
            handle: OverlayHandle(handle),
            style: indicator_style(),
            generation: Generation(1),
        }
    }

    #[test]
    fn indexes_by_key_and_render_handle() {
        let mut registry = OverlayRegistry::new();
        registry.insert(overlay(HazardKind::Flood, "a", 1));
        registry.insert(overlay(HazardKind::Seismic, "a", 2));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains_key(HazardKind::Flood, &FeatureId::new("a")));
        assert_eq!(
            registry
                .by_render_handle(OverlayHandle(2))
                .map(|o| o.kind),
            Some(HazardKind::Seismic)
        );
        assert_eq!(registry.count_kind(HazardKind::Flood), 1);
    }

    #[test]
    fn unique_id_suffixes_duplicates() {
        let mut registry = OverlayRegistry::new();
        registry.insert(overlay(HazardKind::Flood, "a", 1));
        registry.insert(overlay(HazardKind::Flood, "a#1", 2));
        let id = registry.unique_id(HazardKind::Flood, &FeatureId::new("a"));
        assert_eq!(id.as_str(), "a#2");
        let id = registry.unique_id(HazardKind::Weather, &FeatureId::new("a"));
        assert_eq!(id.as_str(), "a");
    }

    #[test]
    fn drain_clears_indices() {
        let mut registry = OverlayRegistry::new();
        registry.insert(overlay(HazardKind::Flood, "a", 1));
        let drained = registry.drain();
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
        assert!(registry.by_render_handle(OverlayHandle(1)).is_none());
        assert!(!registry.contains_key(HazardKind::Flood, &FeatureId::new("a")));
    }
}
