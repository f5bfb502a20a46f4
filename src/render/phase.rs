//! The two render phases.

use serde_json::Value;

use crate::store::SegmentStore;

/// Which pass a content renderer is executing.
///
/// The discovery pass exists only so consumers can subscribe; its output is
/// discarded. The final pass reads hydrated state and produces the response.
pub enum RenderPhase<'a> {
    Discovery {
        store: &'a mut SegmentStore,
    },
    Final {
        store: Option<&'a mut SegmentStore>,
        state: Option<&'a Value>,
    },
}

impl<'a> RenderPhase<'a> {
    pub fn is_discovery(&self) -> bool {
        matches!(self, RenderPhase::Discovery { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RenderPhase::Discovery { .. } => "discovery",
            RenderPhase::Final { .. } => "final",
        }
    }

    /// The request's store, if the page has one.
    pub fn store(&mut self) -> Option<&mut SegmentStore> {
        match self {
            RenderPhase::Discovery { store } => Some(&mut **store),
            RenderPhase::Final { store, .. } => store.as_deref_mut(),
        }
    }

    /// Hydrated state snapshot. Always `None` during discovery.
    pub fn state(&self) -> Option<&'a Value> {
        match self {
            RenderPhase::Discovery { .. } => None,
            RenderPhase::Final { state, .. } => *state,
        }
    }
}
