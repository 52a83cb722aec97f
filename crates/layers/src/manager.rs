//! The overlay manager: one map view's hazard layers.
//!
//! Everything runs on one thread. The manager is a cheap handle around
//! shared state; async operations never hold a borrow across an await, so
//! clicks, pulse ticks and overlapping selections interleave freely. Use it
//! from a current-thread runtime, inside a `LocalSet` when spawning the
//! pulse task.

use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::Arc;

use feeds::{FetchError, HazardKind, HazardScope, HazardSource, SourceSet};
use foundation::LatLng;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use runtime::{AnimationPhase, Notice, NoticeBus, NoticeKind};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::OverlayConfig;
use crate::controller::{ApplyOutcome, ControllerState, LayerController, SelectionTicket};
use crate::geolocation::{GeolocationError, Geolocator, locate};
use crate::layer::LayerId;
use crate::provider::{ProviderAvailability, ProviderError, ProviderState};
use crate::pulse::PulseAnimator;
use crate::render::{OverlayHandle, PopupRef, RenderBackend};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Live,
    /// Static map; the live renderer is not driven.
    Fallback(ProviderState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Settled {
        layer: LayerId,
        rendered: usize,
        failed_sources: Vec<HazardKind>,
    },
    /// A newer selection (or fallback, or unmount) took over.
    Superseded,
    Fallback(ProviderState),
}

struct ManagerState<B> {
    config: OverlayConfig,
    sources: SourceSet,
    backend: B,
    controller: LayerController,
    provider: ProviderAvailability,
    provider_errors: UnboundedReceiver<ProviderError>,
    notices: NoticeBus,
    view: ViewMode,
    scope_center: LatLng,
    phase: AnimationPhase,
    unmounted: bool,
}

impl<B: RenderBackend> ManagerState<B> {
    /// Applies queued provider errors. Returns the fallback reason if the
    /// view is (now) in fallback.
    fn pump_provider_errors(&mut self) -> Option<ProviderState> {
        let mut changed = false;
        while let Ok(error) = self.provider_errors.try_recv() {
            changed |= self.provider.report(&error);
        }
        if changed && self.provider.state().is_terminal() {
            self.enter_fallback();
        }
        match self.view {
            ViewMode::Fallback(reason) => Some(reason),
            ViewMode::Live => None,
        }
    }

    fn enter_fallback(&mut self) {
        let reason = self.provider.state();
        if self.view == ViewMode::Fallback(reason) {
            return;
        }
        let layer = self.controller.selected();
        self.controller.supersede(layer, &mut self.backend);
        self.backend.show_fallback(reason);
        self.view = ViewMode::Fallback(reason);
        info!(%reason, "overlay view switched to fallback");
        self.notices
            .emit(NoticeKind::ProviderUnavailable, "map provider", reason.user_message());
    }

    /// Pumps provider errors on behalf of an in-flight selection. A
    /// selection that was current when the provider failed reports the
    /// fallback; one already superseded reports that instead.
    fn fallback_outcome(&mut self, ticket: &SelectionTicket) -> Option<SelectionOutcome> {
        let was_current = self.controller.is_current(ticket.generation);
        let reason = self.pump_provider_errors()?;
        Some(if was_current {
            SelectionOutcome::Fallback(reason)
        } else {
            SelectionOutcome::Superseded
        })
    }

    fn scope(&self) -> HazardScope {
        self.config.scope_at(self.scope_center)
    }
}

/// Handle to one mounted map view. Clones share the same view.
pub struct OverlayManager<B: RenderBackend> {
    inner: Rc<RefCell<ManagerState<B>>>,
}

impl<B: RenderBackend> Clone for OverlayManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: RenderBackend> OverlayManager<B> {
    /// Subscribes to the backend's error channel and checks the credential.
    /// An unusable credential puts the view straight into fallback without
    /// touching the live renderer.
    pub fn mount(config: OverlayConfig, sources: SourceSet, mut backend: B) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        backend.subscribe_errors(tx);

        let mut provider = ProviderAvailability::new(config.credential_format.clone());
        provider.check_credential(config.provider_credential.as_deref());

        let mut state = ManagerState {
            controller: LayerController::new(config.show_center_indicator),
            scope_center: config.default_center,
            phase: AnimationPhase::new(config.pulse_modulus),
            config,
            sources,
            backend,
            provider,
            provider_errors: rx,
            notices: NoticeBus::new(),
            view: ViewMode::Live,
            unmounted: false,
        };
        if !state.provider.state().is_usable() {
            state.enter_fallback();
        }
        info!(sources = ?state.sources.kinds(), view = ?state.view, "overlay manager mounted");

        Self {
            inner: Rc::new(RefCell::new(state)),
        }
    }

    pub async fn select_layer(&self, layer: LayerId) -> SelectionOutcome {
        self.run_selection(layer, true).await
    }

    /// Re-fetches the current layer without moving the viewport.
    pub async fn refresh(&self) -> SelectionOutcome {
        let layer = self.selected_layer();
        self.run_selection(layer, false).await
    }

    pub async fn select_next(&self) -> SelectionOutcome {
        let layer = self.selected_layer().next();
        self.select_layer(layer).await
    }

    pub async fn select_previous(&self) -> SelectionOutcome {
        let layer = self.selected_layer().previous();
        self.select_layer(layer).await
    }

    async fn run_selection(&self, layer: LayerId, fit_bounds: bool) -> SelectionOutcome {
        let (ticket, sources, scope, timeout) = {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if state.unmounted {
                return SelectionOutcome::Superseded;
            }
            if let Some(reason) = state.pump_provider_errors() {
                state.controller.supersede(layer, &mut state.backend);
                return SelectionOutcome::Fallback(reason);
            }
            let ticket = state
                .controller
                .begin_selection(layer, fit_bounds, &mut state.backend);
            let sources: Vec<Arc<dyn HazardSource>> = layer
                .kinds()
                .iter()
                .filter_map(|kind| {
                    let source = state.sources.get(*kind);
                    if source.is_none() && layer == LayerId::for_kind(*kind) {
                        debug!(%kind, "no source registered for layer");
                    }
                    source
                })
                .collect();
            (ticket, sources, state.scope(), state.config.fetch_timeout)
        };

        let mut pending: FuturesUnordered<_> = sources
            .into_iter()
            .map(|source| async move {
                let kind = source.kind();
                let result = match tokio::time::timeout(timeout, source.fetch(Some(scope))).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                (kind, result)
            })
            .collect();

        while let Some((kind, result)) = pending.next().await {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if let Some(outcome) = state.fallback_outcome(&ticket) {
                return outcome;
            }
            match state
                .controller
                .apply_source_result(&ticket, kind, result, &mut state.backend)
            {
                ApplyOutcome::Stale => return SelectionOutcome::Superseded,
                ApplyOutcome::Failed(err) => {
                    state.notices.emit(
                        NoticeKind::SourceFetchFailed,
                        kind.path(),
                        format!("{} data is unavailable: {err}", kind.title()),
                    );
                }
                ApplyOutcome::Rendered { .. } => {}
            }
        }

        let mut guard = self.inner.borrow_mut();
        let state = &mut *guard;
        if let Some(outcome) = state.fallback_outcome(&ticket) {
            return outcome;
        }
        match state.controller.finish_selection(&ticket, &mut state.backend) {
            Some(summary) => SelectionOutcome::Settled {
                layer: summary.layer,
                rendered: summary.rendered,
                failed_sources: summary.failed_sources,
            },
            None => SelectionOutcome::Superseded,
        }
    }

    /// Applies any provider errors published so far.
    pub fn pump_provider_errors(&self) -> ViewMode {
        let mut state = self.inner.borrow_mut();
        state.pump_provider_errors();
        state.view
    }

    pub fn set_credential(&self, credential: Option<String>) {
        self.inner.borrow_mut().config.provider_credential = credential;
    }

    /// Manual retry: reset to `Checking`, re-check the credential and, if
    /// usable, re-apply the current selection.
    pub async fn retry_provider(&self) -> SelectionOutcome {
        let usable = {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            // Errors published before the retry belong to the old session.
            while state.provider_errors.try_recv().is_ok() {}
            state.provider.reset();
            let checked = state
                .provider
                .check_credential(state.config.provider_credential.as_deref());
            state.view = ViewMode::Live;
            if checked.is_usable() {
                true
            } else {
                state.enter_fallback();
                false
            }
        };
        if usable {
            self.select_layer(self.selected_layer()).await
        } else {
            SelectionOutcome::Fallback(self.provider_state())
        }
    }

    /// Looks up the device position; on success later fetches are scoped
    /// around it. Failure keeps the default center and raises a notice.
    pub async fn locate_user(&self, geolocator: &dyn Geolocator) -> Result<LatLng, GeolocationError> {
        let options = self.inner.borrow().config.geolocation.clone();
        let result = locate(geolocator, &options).await;
        let mut state = self.inner.borrow_mut();
        match result {
            Ok(position) => {
                state.scope_center = position;
            }
            Err(err) => {
                state
                    .notices
                    .emit(NoticeKind::GeolocationFailed, "geolocation", err.user_message());
            }
        }
        result
    }

    pub fn on_overlay_click(&self, handle: OverlayHandle, position: LatLng) -> Option<PopupRef> {
        let mut guard = self.inner.borrow_mut();
        let state = &mut *guard;
        if state.unmounted || state.pump_provider_errors().is_some() {
            return None;
        }
        state
            .controller
            .on_overlay_click(handle, position, &mut state.backend)
    }

    pub fn on_popup_closed(&self, popup: PopupRef) -> bool {
        self.inner.borrow_mut().controller.on_popup_closed(popup)
    }

    /// One animation step. Also picks up provider errors.
    pub fn pulse_tick(&self, phase: AnimationPhase) -> usize {
        let mut guard = self.inner.borrow_mut();
        let state = &mut *guard;
        state.phase = phase;
        if state.pump_provider_errors().is_some() {
            return 0;
        }
        state.controller.apply_pulse(phase, &mut state.backend)
    }

    /// Releases every overlay and the popup. The pulse task stops on its
    /// next tick.
    pub fn unmount(self) {
        let mut guard = self.inner.borrow_mut();
        let state = &mut *guard;
        let layer = state.controller.selected();
        state.controller.supersede(layer, &mut state.backend);
        state.unmounted = true;
        info!("overlay manager unmounted");
    }

    pub fn view_mode(&self) -> ViewMode {
        self.inner.borrow().view
    }

    pub fn provider_state(&self) -> ProviderState {
        self.inner.borrow().provider.state()
    }

    pub fn selected_layer(&self) -> LayerId {
        self.inner.borrow().controller.selected()
    }

    pub fn controller_state(&self) -> ControllerState {
        self.inner.borrow().controller.state()
    }

    pub fn live_overlay_count(&self) -> usize {
        self.inner.borrow().controller.live_overlay_count()
    }

    pub fn scope_center(&self) -> LatLng {
        self.inner.borrow().scope_center
    }

    pub fn phase(&self) -> AnimationPhase {
        self.inner.borrow().phase
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.inner.borrow().notices.notices().cloned().collect()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.inner.borrow_mut().notices.drain()
    }

    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.inner.borrow_mut().backend)
    }
}

impl<B: RenderBackend + 'static> OverlayManager<B> {
    /// Starts the pulse clock on the current `LocalSet`.
    pub fn spawn_pulse(&self) -> JoinHandle<()> {
        let (period, modulus) = {
            let state = self.inner.borrow();
            (state.config.pulse_period, state.config.pulse_modulus)
        };
        let weak = Rc::downgrade(&self.inner);
        let animator = PulseAnimator::new(period, modulus);
        tokio::task::spawn_local(animator.run(move |phase| {
            let Some(inner) = weak.upgrade() else {
                return ControlFlow::Break(());
            };
            if inner.borrow().unmounted {
                return ControlFlow::Break(());
            }
            OverlayManager { inner }.pulse_tick(phase);
            ControlFlow::Continue(())
        }))
    }
}
