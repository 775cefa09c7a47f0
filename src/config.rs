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

//! Runtime-tunable limits for a [`crate::tracer::Tracer`].

/// Hard cap on the total number of states ever attached to a graph.
pub const DEFAULT_MAX_STATES: usize = 1_000_000;
/// Hard cap on the size of a graph's fast-lookup final-state list.
pub const DEFAULT_MAX_FINAL_STATES: usize = 100;

/// Configuration for one [`crate::tracer::Tracer`] / [`crate::graph::Graph`] pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerConfig {
    /// Hard cap on the number of states a graph may hold.
    pub max_states: usize,
    /// Hard cap on the number of states tracked in the graph's final-state list. Exceeding it
    /// does not prevent a state from being created and flagged FINAL, only from being indexed
    /// there.
    pub max_final_states: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self { max_states: DEFAULT_MAX_STATES, max_final_states: DEFAULT_MAX_FINAL_STATES }
    }
}
