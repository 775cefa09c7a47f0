// Snowcap: Synthesizing Network-Wide Configuration Updates
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Module containing all error types

use crate::types::StateId;
use thiserror::Error;

/// Main error type returned by every public [`crate::tracer::Tracer`] operation.
#[derive(Debug, Error)]
pub enum Error<StepError: std::error::Error + 'static> {
    /// `max_states` was already reached; the trace step was refused and the graph is unchanged.
    #[error("graph is full: {0} states already attached")]
    GraphFull(usize),
    /// `state_id` does not refer to an attached state.
    #[error("unknown state id: {0}")]
    UnknownState(StateId),
    /// `trans_index` is not a valid index into the origin state's allowed transitions.
    #[error("unknown transition index {1} on state {0}")]
    UnknownTransition(StateId, usize),
    /// The external simulator's step failed; the underlying error is propagated verbatim.
    #[error("simulator step failed: {0}")]
    SimulatorStepFailed(#[source] StepError),
    /// Injecting a routing snapshot found a router/peer structure mismatch.
    #[error("routing snapshot is incompatible with the current network topology")]
    IncompatibleTopology,
}

/// Non-fatal outcomes surfaced alongside a successful trace step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// `max_final_states` was reached; the new state is still flagged FINAL, but was not added to
    /// the graph's fast-lookup final-state list.
    FinalListFull,
}
