//! Layer selection state machine.
//!
//! A selection runs `begin_selection` (release everything, new generation),
//! then `apply_source_result` once per source as results arrive, then
//! `finish_selection`. Results carrying an older generation are dropped
//! before they reach the render backend.

use feeds::{FetchError, HazardKind};
use formats::{HazardFeature, RawFeature, normalize};
use foundation::{LatLng, centroid};
use runtime::{AnimationPhase, Generation, GenerationCounter};
use tracing::{debug, info, warn};

use crate::interaction::{InteractionBroker, popup_content};
use crate::layer::LayerId;
use crate::registry::{OverlayRegistry, RenderedOverlay};
use crate::render::{OverlayHandle, PopupRef, RenderBackend};
use crate::symbology::{OverlayShape, indicator_style, shape_for, style_for};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Idle(LayerId),
    Switching {
        target: LayerId,
        generation: Generation,
    },
}

/// Identifies one in-flight selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    pub layer: LayerId,
    pub generation: Generation,
    /// Whether settling this selection moves the viewport.
    pub fit_bounds: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// A newer selection started; nothing was rendered.
    Stale,
    Rendered { created: usize, rejected: usize },
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSummary {
    pub layer: LayerId,
    pub rendered: usize,
    pub failed_sources: Vec<HazardKind>,
}

#[derive(Debug)]
pub struct LayerController {
    state: ControllerState,
    generations: GenerationCounter,
    registry: OverlayRegistry,
    broker: InteractionBroker,
    indicator: Option<OverlayHandle>,
    show_indicator: bool,
    failed: Vec<HazardKind>,
    /// The in-flight selection still owes the viewport a fit.
    fit_pending: bool,
}

impl LayerController {
    pub fn new(show_indicator: bool) -> Self {
        Self {
            state: ControllerState::Idle(LayerId::All),
            generations: GenerationCounter::new(),
            registry: OverlayRegistry::new(),
            broker: InteractionBroker::new(),
            indicator: None,
            show_indicator,
            failed: Vec::new(),
            fit_pending: false,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The layer the user asked for last, settled or not.
    pub fn selected(&self) -> LayerId {
        match self.state {
            ControllerState::Idle(layer) => layer,
            ControllerState::Switching { target, .. } => target,
        }
    }

    pub fn current_generation(&self) -> Generation {
        self.generations.current()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generations.is_current(generation)
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn broker(&self) -> &InteractionBroker {
        &self.broker
    }

    /// Feature overlays only; the center indicator is not counted.
    pub fn live_overlay_count(&self) -> usize {
        self.registry.len()
    }

    pub fn indicator(&self) -> Option<OverlayHandle> {
        self.indicator
    }

    /// Releases every handle of the previous selection, then starts a new
    /// generation. Nothing has been created for `layer` when this returns.
    ///
    /// Replacing an unsettled selection of the same layer inherits its
    /// pending fit, so a refresh cannot swallow a layer switch's fit.
    pub fn begin_selection<B: RenderBackend + ?Sized>(
        &mut self,
        layer: LayerId,
        fit_bounds: bool,
        backend: &mut B,
    ) -> SelectionTicket {
        let inherited = self.fit_pending
            && matches!(self.state, ControllerState::Switching { target, .. } if target == layer);
        let fit_bounds = fit_bounds || inherited;
        self.fit_pending = fit_bounds;
        let generation = self.generations.advance();
        let released = self.teardown(backend);
        self.failed.clear();
        self.state = ControllerState::Switching {
            target: layer,
            generation,
        };
        info!(%layer, %generation, released, "layer selection started");
        SelectionTicket {
            layer,
            generation,
            fit_bounds,
        }
    }

    pub fn apply_source_result<B: RenderBackend + ?Sized>(
        &mut self,
        ticket: &SelectionTicket,
        kind: HazardKind,
        result: Result<Vec<RawFeature>, FetchError>,
        backend: &mut B,
    ) -> ApplyOutcome {
        if !self.is_current(ticket.generation) {
            debug!(%kind, generation = %ticket.generation, "discarding stale source result");
            return ApplyOutcome::Stale;
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                self.failed.push(kind);
                return ApplyOutcome::Failed(err);
            }
        };

        let (mut created, mut rejected) = (0, 0);
        for item in &raw {
            match normalize(item) {
                Ok(feature) => {
                    self.render(ticket, kind, feature, backend);
                    created += 1;
                }
                Err(reason) => {
                    rejected += 1;
                    warn!(%kind, index = item.index, id = ?item.id, %reason, "feature rejected");
                }
            }
        }
        debug!(%kind, created, rejected, generation = %ticket.generation, "source rendered");
        ApplyOutcome::Rendered { created, rejected }
    }

    fn render<B: RenderBackend + ?Sized>(
        &mut self,
        ticket: &SelectionTicket,
        kind: HazardKind,
        mut feature: HazardFeature,
        backend: &mut B,
    ) {
        feature.id = self.registry.unique_id(kind, &feature.id);
        let style = style_for(kind, &feature);
        let handle = match shape_for(kind, &feature) {
            OverlayShape::Point(position) => backend.create_point_overlay(position, &style),
            OverlayShape::Polygon(ring) => backend.create_polygon_overlay(&ring, &style),
        };
        self.registry.insert(RenderedOverlay {
            layer: ticket.layer,
            kind,
            feature,
            handle,
            style,
            generation: ticket.generation,
        });
    }

    /// Settles the selection: fit-bounds (once, if requested and anything
    /// rendered), optional center indicator, then `Idle`. Returns `None`
    /// for a stale ticket.
    pub fn finish_selection<B: RenderBackend + ?Sized>(
        &mut self,
        ticket: &SelectionTicket,
        backend: &mut B,
    ) -> Option<SelectionSummary> {
        if !self.is_current(ticket.generation) {
            return None;
        }
        if let ControllerState::Idle(_) = self.state {
            return None;
        }

        let positions = self.fit_positions();
        if !positions.is_empty() {
            if ticket.fit_bounds {
                backend.fit_bounds(&positions);
            }
            if self.show_indicator {
                if let Some(center) = centroid(&positions) {
                    self.indicator = Some(backend.create_point_overlay(center, &indicator_style()));
                }
            }
        }

        self.state = ControllerState::Idle(ticket.layer);
        self.fit_pending = false;
        let summary = SelectionSummary {
            layer: ticket.layer,
            rendered: self.registry.len(),
            failed_sources: self.failed.clone(),
        };
        info!(
            layer = %summary.layer,
            rendered = summary.rendered,
            failed = summary.failed_sources.len(),
            "layer selection settled"
        );
        Some(summary)
    }

    /// Anchors of High/Critical overlays, or of every overlay if none are.
    pub fn fit_positions(&self) -> Vec<LatLng> {
        let elevated: Vec<LatLng> = self
            .registry
            .iter()
            .filter(|o| o.feature.risk_level.is_elevated())
            .map(|o| o.feature.anchor())
            .collect();
        if !elevated.is_empty() {
            return elevated;
        }
        self.registry.iter().map(|o| o.feature.anchor()).collect()
    }

    /// Closes the popup and destroys every overlay and the indicator.
    pub fn teardown<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        self.broker.close(backend);
        let overlays = self.registry.drain();
        let released = overlays.len();
        for overlay in overlays {
            backend.destroy(overlay.handle);
        }
        if let Some(indicator) = self.indicator.take() {
            backend.destroy(indicator);
        }
        released
    }

    /// Cancels any in-flight selection and releases everything, leaving
    /// `layer` as the idle selection.
    pub fn supersede<B: RenderBackend + ?Sized>(&mut self, layer: LayerId, backend: &mut B) {
        let generation = self.generations.advance();
        let released = self.teardown(backend);
        self.failed.clear();
        self.fit_pending = false;
        self.state = ControllerState::Idle(layer);
        debug!(%layer, %generation, released, "selection superseded");
    }

    /// Restyles pulsing overlays for `phase`. Returns how many were touched.
    pub fn apply_pulse<B: RenderBackend + ?Sized>(
        &self,
        phase: AnimationPhase,
        backend: &mut B,
    ) -> usize {
        let mut touched = 0;
        for overlay in self.registry.iter() {
            if let Some(pulse) = overlay.style.pulse {
                backend.set_fill_opacity(overlay.handle, pulse.opacity(phase));
                touched += 1;
            }
        }
        touched
    }

    /// Opens the detail popup for a click on a live overlay. Clicks on
    /// handles this controller does not own are ignored.
    pub fn on_overlay_click<B: RenderBackend + ?Sized>(
        &mut self,
        handle: OverlayHandle,
        position: LatLng,
        backend: &mut B,
    ) -> Option<PopupRef> {
        let Some(overlay) = self.registry.by_render_handle(handle) else {
            debug!(handle = handle.0, "click on unknown overlay ignored");
            return None;
        };
        let content = popup_content(overlay.kind, &overlay.feature);
        Some(self.broker.open(backend, handle, position, &content))
    }

    pub fn on_popup_closed(&mut self, popup: PopupRef) -> bool {
        self.broker.on_closed(popup)
    }
}
