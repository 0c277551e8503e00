//! Host-side coordinator for the find and hide inputs.
//!
//! A [`Session`] holds what the user typed in each slot, the last valid
//! query per slot, the hide state needed to undo the current hide, and the
//! display options queries have asked for. Every mutation takes the graph
//! by `&mut`, so recomputations for one graph are serialized by the borrow.

use crate::apply::{HideApplier, HideState, apply_find};
use crate::config::AppConfig;
use crate::graph::GraphHandle;
use crate::query::{CompiledQuery, OptionRequest, ValidationError, compile};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    Find,
    Hide,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Find => f.write_str("Find"),
            Slot::Hide => f.write_str("Hide"),
        }
    }
}

/// Display options a query may turn on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayOptions {
    pub response_time_labels: bool,
    pub throughput_labels: bool,
    pub show_security: bool,
    pub show_unused: bool,
    pub show_rank: bool,
}

impl DisplayOptions {
    /// Turn on the option behind `request`; false if it was already on
    pub fn apply(&mut self, request: OptionRequest) -> bool {
        let flag = match request {
            OptionRequest::ResponseTimeLabels => &mut self.response_time_labels,
            OptionRequest::ThroughputLabels => &mut self.throughput_labels,
            OptionRequest::Security => &mut self.show_security,
            OptionRequest::UnusedNodes => &mut self.show_unused,
            OptionRequest::Rank => &mut self.show_rank,
        };
        !std::mem::replace(flag, true)
    }
}

#[derive(Debug, Default)]
struct SlotState {
    value: String,
    error: Option<String>,
    query: Option<CompiledQuery>,
}

#[derive(Debug)]
pub struct Session {
    find: SlotState,
    hide: SlotState,
    compress_on_hide: bool,
    honor_option_requests: bool,
    hide_state: Option<HideState>,
    display: DisplayOptions,
    applier: HideApplier,
}

impl Session {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            find: SlotState::default(),
            hide: SlotState::default(),
            compress_on_hide: config.compress_on_hide,
            honor_option_requests: config.honor_option_requests,
            hide_state: None,
            display: DisplayOptions::default(),
            applier: HideApplier::new(config.hide_options()),
        }
    }

    /// Compile `text` into `slot` and apply it.
    ///
    /// On error the message is recorded for the slot and nothing applied so
    /// far changes. Returns the option requests of the new query.
    pub fn submit<G: GraphHandle + ?Sized>(
        &mut self,
        slot: Slot,
        text: &str,
        graph: &mut G,
    ) -> Result<Vec<OptionRequest>, ValidationError> {
        let state = self.slot(slot);
        if state.value == text && state.error.is_none() {
            return Ok(Vec::new());
        }

        match compile(text) {
            Err(e) => {
                warn!(slot = %slot, expression = text, error = %e, "rejected expression");
                let state = self.slot_mut(slot);
                state.value = text.to_string();
                state.error = Some(format!("{slot}: {e}"));
                Err(e)
            }
            Ok(query) => {
                let requests = query.as_ref().map(|q| q.requests.clone()).unwrap_or_default();
                let state = self.slot_mut(slot);
                state.value = text.to_string();
                state.error = None;
                state.query = query;

                if self.honor_option_requests {
                    for &request in &requests {
                        if self.display.apply(request) {
                            info!("{}", request.message());
                        }
                    }
                }

                self.apply(slot, graph);
                Ok(requests)
            }
        }
    }

    /// Empty the slot and undo its effects
    pub fn clear<G: GraphHandle + ?Sized>(&mut self, slot: Slot, graph: &mut G) {
        let state = self.slot_mut(slot);
        *state = SlotState::default();
        self.apply(slot, graph);
    }

    /// Switch between removing and hiding; re-applies hide on a change
    pub fn set_compress_on_hide<G: GraphHandle + ?Sized>(&mut self, compress: bool, graph: &mut G) {
        if self.compress_on_hide == compress {
            return;
        }
        self.compress_on_hide = compress;
        if self.hide.query.is_some() || self.hide_state.is_some() {
            self.apply(Slot::Hide, graph);
        }
    }

    /// Re-apply both slots after the graph was reloaded.
    ///
    /// Queries are pure functions of their text, so the compiled forms are
    /// reused as they are.
    pub fn graph_replaced<G: GraphHandle + ?Sized>(&mut self, graph: &mut G) {
        if self.hide.query.is_some() || self.hide_state.is_some() {
            self.apply(Slot::Hide, graph);
        } else {
            self.apply(Slot::Find, graph);
        }
    }

    fn apply<G: GraphHandle + ?Sized>(&mut self, slot: Slot, graph: &mut G) {
        if slot == Slot::Hide {
            let prior = self.hide_state.take();
            let state = self
                .applier
                .apply(self.hide.query.as_ref(), self.compress_on_hide, graph, prior);
            self.hide_state = state.expression.is_some().then_some(state);
        }
        // elements restored by hide need their find marks back
        apply_find(self.find.query.as_ref(), graph);
    }

    fn slot(&self, slot: Slot) -> &SlotState {
        match slot {
            Slot::Find => &self.find,
            Slot::Hide => &self.hide,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotState {
        match slot {
            Slot::Find => &mut self.find,
            Slot::Hide => &mut self.hide,
        }
    }

    /// Text last submitted to the slot
    pub fn value(&self, slot: Slot) -> &str {
        &self.slot(slot).value
    }

    /// Message of the last rejected submission, prefixed with the slot name
    pub fn error(&self, slot: Slot) -> Option<&str> {
        self.slot(slot).error.as_deref()
    }

    /// Query currently applied to the slot
    pub fn query(&self, slot: Slot) -> Option<&CompiledQuery> {
        self.slot(slot).query.as_ref()
    }

    pub fn hide_state(&self) -> Option<&HideState> {
        self.hide_state.as_ref()
    }

    pub fn display_options(&self) -> &DisplayOptions {
        &self.display
    }

    pub fn compress_on_hide(&self) -> bool {
        self.compress_on_hide
    }
}
