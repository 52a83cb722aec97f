//! Capability interface to the map provider, plus a recording backend.

use std::collections::BTreeMap;

use foundation::{GeoBounds, LatLng};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::provider::{ProviderError, ProviderState};
use crate::symbology::OverlayStyle;

/// Opaque reference to a created overlay, issued by the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayHandle(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupRef(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub title: String,
    pub lines: Vec<String>,
}

/// What the overlay manager needs from a map provider.
///
/// Implementations own the provider objects; the manager only ever sees
/// handles. Errors are published asynchronously on the channel passed to
/// [`RenderBackend::subscribe_errors`].
pub trait RenderBackend {
    fn create_point_overlay(&mut self, position: LatLng, style: &OverlayStyle) -> OverlayHandle;

    fn create_polygon_overlay(&mut self, ring: &[LatLng], style: &OverlayStyle) -> OverlayHandle;

    fn set_fill_opacity(&mut self, handle: OverlayHandle, opacity: f64);

    fn destroy(&mut self, handle: OverlayHandle);

    fn open_popup(&mut self, anchor: LatLng, content: &PopupContent) -> PopupRef;

    fn close_popup(&mut self, popup: PopupRef);

    fn fit_bounds(&mut self, positions: &[LatLng]);

    /// Replace the live map with a static view explaining `reason`.
    fn show_fallback(&mut self, reason: ProviderState);

    fn subscribe_errors(&mut self, sink: UnboundedSender<ProviderError>);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreatePoint(OverlayHandle, LatLng),
    CreatePolygon(OverlayHandle, usize),
    SetFillOpacity(OverlayHandle, f64),
    Destroy(OverlayHandle),
    OpenPopup(PopupRef, LatLng, String),
    ClosePopup(PopupRef),
    FitBounds(Vec<LatLng>),
    ShowFallback(ProviderState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOverlay {
    pub vertices: Vec<LatLng>,
    pub style: OverlayStyle,
    pub fill_opacity: f64,
}

/// Backend that keeps every overlay in memory and logs each call.
///
/// Used headless (the CLI) and as the test double for the manager.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_handle: u64,
    next_popup: u64,
    live: BTreeMap<OverlayHandle, RecordedOverlay>,
    open_popups: BTreeMap<PopupRef, LatLng>,
    calls: Vec<RenderCall>,
    invalid_destroys: usize,
    fallback: Option<ProviderState>,
    viewport: Option<GeoBounds>,
    sinks: Vec<UnboundedSender<ProviderError>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&RecordedOverlay> {
        self.live.get(&handle)
    }

    pub fn live_overlays(&self) -> impl Iterator<Item = (OverlayHandle, &RecordedOverlay)> + '_ {
        self.live.iter().map(|(h, o)| (*h, o))
    }

    pub fn open_popup_count(&self) -> usize {
        self.open_popups.len()
    }

    pub fn open_popup_anchors(&self) -> Vec<LatLng> {
        self.open_popups.values().copied().collect()
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Box framed by the most recent fit. A single position yields a
    /// degenerate box; real maps zoom to a fixed level around it.
    pub fn viewport(&self) -> Option<GeoBounds> {
        self.viewport
    }

    pub fn fit_bounds_calls(&self) -> Vec<&[LatLng]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::FitBounds(p) => Some(p.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::CreatePoint(..) | RenderCall::CreatePolygon(..)))
            .count()
    }

    /// Destroy calls for handles that were not live.
    pub fn invalid_destroys(&self) -> usize {
        self.invalid_destroys
    }

    pub fn fallback(&self) -> Option<ProviderState> {
        self.fallback
    }

    /// Publishes an error to every subscriber, as a live provider would.
    pub fn emit_error(&mut self, error: ProviderError) {
        self.sinks.retain(|sink| sink.send(error.clone()).is_ok());
    }

    fn issue_handle(&mut self) -> OverlayHandle {
        self.next_handle += 1;
        OverlayHandle(self.next_handle)
    }
}

impl RenderBackend for RecordingBackend {
    fn create_point_overlay(&mut self, position: LatLng, style: &OverlayStyle) -> OverlayHandle {
        let handle = self.issue_handle();
        debug!(handle = handle.0, lat = position.lat, lng = position.lng, "create point overlay");
        self.live.insert(
            handle,
            RecordedOverlay {
                vertices: vec![position],
                style: style.clone(),
                fill_opacity: style.fill_opacity,
            },
        );
        self.calls.push(RenderCall::CreatePoint(handle, position));
        handle
    }

    fn create_polygon_overlay(&mut self, ring: &[LatLng], style: &OverlayStyle) -> OverlayHandle {
        let handle = self.issue_handle();
        debug!(handle = handle.0, vertices = ring.len(), "create polygon overlay");
        self.live.insert(
            handle,
            RecordedOverlay {
                vertices: ring.to_vec(),
                style: style.clone(),
                fill_opacity: style.fill_opacity,
            },
        );
        self.calls.push(RenderCall::CreatePolygon(handle, ring.len()));
        handle
    }

    fn set_fill_opacity(&mut self, handle: OverlayHandle, opacity: f64) {
        if let Some(overlay) = self.live.get_mut(&handle) {
            overlay.fill_opacity = opacity;
        }
        self.calls.push(RenderCall::SetFillOpacity(handle, opacity));
    }

    fn destroy(&mut self, handle: OverlayHandle) {
        if self.live.remove(&handle).is_none() {
            warn!(handle = handle.0, "destroy of unknown overlay");
            self.invalid_destroys += 1;
        }
        self.calls.push(RenderCall::Destroy(handle));
    }

    fn open_popup(&mut self, anchor: LatLng, content: &PopupContent) -> PopupRef {
        self.next_popup += 1;
        let popup = PopupRef(self.next_popup);
        debug!(popup = popup.0, title = %content.title, "open popup");
        self.open_popups.insert(popup, anchor);
        self.calls
            .push(RenderCall::OpenPopup(popup, anchor, content.title.clone()));
        popup
    }

    fn close_popup(&mut self, popup: PopupRef) {
        self.open_popups.remove(&popup);
        self.calls.push(RenderCall::ClosePopup(popup));
    }

    fn fit_bounds(&mut self, positions: &[LatLng]) {
        debug!(positions = positions.len(), "fit bounds");
        if let Some(bounds) = GeoBounds::from_points(positions) {
            self.viewport = Some(bounds);
        }
        self.calls.push(RenderCall::FitBounds(positions.to_vec()));
    }

    fn show_fallback(&mut self, reason: ProviderState) {
        debug!(%reason, "show fallback map");
        self.fallback = Some(reason);
        self.calls.push(RenderCall::ShowFallback(reason));
    }

    fn subscribe_errors(&mut self, sink: UnboundedSender<ProviderError>) {
        self.sinks.push(sink);
    }
}
