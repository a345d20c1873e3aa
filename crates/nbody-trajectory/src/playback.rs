//! Playback state machine: which scenario is active and which time step is shown.
//!
//! Every load is tagged with the [`Generation`] returned by [`Playback::select`].
//! A completing load is applied only if its generation is the latest one issued,
//! so selecting a second scenario while the first is still in flight can never
//! bring the first one back on screen.
//!
//! ```text
//!            select                 load_succeeded
//!  (any) ───────────▶ Loading ─────────────────────▶ Ready { cursor: 0 }
//!                        │                              │ step: cursor = min(cursor + 1, T - 1)
//!                        │ load_failed                  ▼
//!                        └────────────────────────▶ Failed
//! ```

use std::sync::Arc;

use glam::DVec3;

use crate::error::Error;
use crate::types::{Scenario, ScenarioDescriptor};

/// Ticket identifying one issued load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The raw counter value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Current phase of playback.
#[derive(Debug, Clone, Default)]
pub enum PlaybackState {
    /// A scenario was selected and its data is in flight.
    #[default]
    Loading,
    /// A scenario is loaded and a time step is selected.
    Ready {
        /// The loaded trajectory.
        scenario: Arc<Scenario>,
        /// Selected time step, always in `[0, T - 1]`.
        cursor: usize,
    },
    /// The last load failed.
    Failed {
        /// Diagnostic description of the failure.
        reason: String,
    },
}

/// What the renderer should show this frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Load that produced this scenario; changes whenever the scenario is replaced.
    pub generation: Generation,
    /// The loaded trajectory.
    pub scenario: &'a Arc<Scenario>,
    /// Selected time step.
    pub cursor: usize,
}

impl<'a> Frame<'a> {
    /// Body positions at the cursor, or `None` if the cursor is out of range.
    #[must_use]
    pub fn positions(&self) -> Option<&'a [DVec3]> {
        self.scenario.positions_at(self.cursor)
    }

    /// Simulation time at the cursor.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.scenario.time_at(self.cursor)
    }
}

/// Owner of the active scenario, load status and time-step cursor.
///
/// Transitions are the only mutation points; everything else is a read.
#[derive(Debug, Clone, Default)]
pub struct Playback {
    state: PlaybackState,
    generation: Generation,
    active: Option<ScenarioDescriptor>,
}

impl Playback {
    /// Create a machine in `Loading` with nothing selected yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a scenario, discarding whatever was shown or failed before.
    ///
    /// Returns the generation the resulting load must report back with.
    pub fn select(&mut self, descriptor: &ScenarioDescriptor) -> Generation {
        self.generation = self.generation.next();
        self.active = Some(*descriptor);
        self.state = PlaybackState::Loading;

        tracing::debug!(
            scenario = descriptor.id,
            generation = self.generation.get(),
            "scenario selected"
        );

        self.generation
    }

    /// Apply a finished load. Returns `false` if the result was stale and ignored.
    pub fn load_succeeded(&mut self, generation: Generation, scenario: Arc<Scenario>) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        self.state = PlaybackState::Ready {
            scenario,
            cursor: 0,
        };
        true
    }

    /// Apply a failed load. Returns `false` if the result was stale and ignored.
    pub fn load_failed(&mut self, generation: Generation, error: &Error) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        self.state = PlaybackState::Failed {
            reason: error.to_string(),
        };
        true
    }

    /// Advance one time step, saturating at the last sample.
    ///
    /// Returns whether the cursor moved.
    pub fn step(&mut self) -> bool {
        let PlaybackState::Ready { scenario, cursor } = &mut self.state else {
            return false;
        };
        let next = (*cursor + 1).min(scenario.last_index());
        let moved = next != *cursor;
        *cursor = next;
        moved
    }

    fn accepts(&self, generation: Generation) -> bool {
        generation == self.generation && matches!(self.state, PlaybackState::Loading)
    }

    /// The current phase.
    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// The most recently issued load generation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The most recently selected scenario.
    #[must_use]
    pub fn active(&self) -> Option<&ScenarioDescriptor> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.state, PlaybackState::Loading)
    }

    /// The cursor, if a scenario is ready.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            PlaybackState::Ready { cursor, .. } => Some(cursor),
            _ => None,
        }
    }

    /// Whether `step` would move the cursor.
    #[must_use]
    pub fn can_step(&self) -> bool {
        match &self.state {
            PlaybackState::Ready { scenario, cursor } => *cursor < scenario.last_index(),
            _ => false,
        }
    }

    /// The scenario and cursor to render, if ready.
    #[must_use]
    pub fn frame(&self) -> Option<Frame<'_>> {
        match &self.state {
            PlaybackState::Ready { scenario, cursor } => Some(Frame {
                generation: self.generation,
                scenario,
                cursor: *cursor,
            }),
            _ => None,
        }
    }
}
