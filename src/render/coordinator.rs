//! Render/hydration sequencing for a single request.
//!
//! # States
//! ```text
//! PreDiscovery → Discovering → Hydrating → FinalRender → Done
//!        (no store: straight to FinalRender)
//! any state → Failed
//! ```
//!
//! # Design Decisions
//! - Discovery output is discarded; only the subscriptions it leaves behind matter
//! - Final render never starts before hydration has fully resolved
//! - Hydration rejections are normalized before they leave this module

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::compiler::PageDependencies;
use crate::observability::metrics;
use crate::render::phase::RenderPhase;
use crate::render::result::{PageError, RenderOutcome, RenderResult};
use crate::store::{HydrationError, RenderMode, SegmentStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    PreDiscovery,
    Discovering,
    Hydrating,
    FinalRender,
    Done,
    Failed,
}

/// Errors surfaced by the coordinator.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{phase} render failed: {source}")]
    Page {
        phase: &'static str,
        #[source]
        source: PageError,
    },

    #[error(transparent)]
    Hydration(#[from] HydrationError),
}

impl RenderError {
    pub fn stage(&self) -> &'static str {
        match self {
            RenderError::Page { phase, .. } => phase,
            RenderError::Hydration(_) => "hydration",
        }
    }
}

/// Drives one request through discovery, hydration and the final render.
#[derive(Debug)]
pub struct RenderCoordinator {
    state: CoordinatorState,
    history: Vec<CoordinatorState>,
    hydration_timeout: Option<Duration>,
}

impl RenderCoordinator {
    pub fn new(hydration_timeout: Option<Duration>) -> Self {
        Self {
            state: CoordinatorState::PreDiscovery,
            history: Vec::new(),
            hydration_timeout,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// States entered so far, in order.
    pub fn history(&self) -> &[CoordinatorState] {
        &self.history
    }

    fn enter(&mut self, next: CoordinatorState) {
        tracing::trace!(from = ?self.state, to = ?next, "Coordinator transition");
        self.state = next;
        self.history.push(next);
    }

    /// Run the full sequence for `result`.
    pub async fn run(
        &mut self,
        result: RenderResult,
        store: Option<SegmentStore>,
        deps: &PageDependencies,
    ) -> Result<RenderOutcome, RenderError> {
        match self.run_phases(result, store, deps).await {
            Ok(outcome) => {
                self.enter(CoordinatorState::Done);
                Ok(outcome)
            }
            Err(err) => {
                metrics::record_render_failure(err.stage());
                self.enter(CoordinatorState::Failed);
                Err(err)
            }
        }
    }

    async fn run_phases(
        &mut self,
        result: RenderResult,
        mut store: Option<SegmentStore>,
        deps: &PageDependencies,
    ) -> Result<RenderOutcome, RenderError> {
        let RenderResult {
            status,
            status_message,
            headers,
            content,
        } = result;

        if let Some(store) = store.as_mut() {
            if store.needs_discovery() {
                self.enter(CoordinatorState::PreDiscovery);
                store.set_render_mode(RenderMode::Discovery);

                self.enter(CoordinatorState::Discovering);
                let mut phase = RenderPhase::Discovery { store: &mut *store };
                content
                    .render(deps, &mut phase)
                    .map_err(|source| RenderError::Page {
                        phase: "discovery",
                        source,
                    })?;
                tracing::debug!(
                    subscriptions = store.subscription_count(),
                    pending_loads = store.pending_loads(),
                    "Discovery pass complete"
                );
            }
        }

        let snapshot = match store.as_mut() {
            Some(store) => {
                self.enter(CoordinatorState::Hydrating);
                self.hydrate(store).await?;
                Some(store.get_state())
            }
            None => None,
        };

        self.enter(CoordinatorState::FinalRender);
        if let Some(store) = store.as_mut() {
            store.set_render_mode(RenderMode::ServerHydrate);
        }
        let mut phase = RenderPhase::Final {
            store: store.as_mut(),
            state: snapshot.as_ref(),
        };
        let body = content
            .render(deps, &mut phase)
            .map_err(|source| RenderError::Page {
                phase: "final",
                source,
            })?;

        Ok(RenderOutcome {
            status,
            status_message,
            headers,
            body,
            state: snapshot,
        })
    }

    async fn hydrate(&self, store: &mut SegmentStore) -> Result<(), HydrationError> {
        let started = Instant::now();

        let outcome = match self.hydration_timeout {
            Some(limit) => match tokio::time::timeout(limit, store.hydrate()).await {
                Ok(outcome) => outcome.map_err(HydrationError::from),
                Err(_) => Err(HydrationError::TimedOut(limit.as_millis() as u64)),
            },
            None => store.hydrate().await.map_err(HydrationError::from),
        };

        metrics::record_hydration(started, outcome.is_ok());
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "Hydration failed");
        }
        outcome
    }
}
