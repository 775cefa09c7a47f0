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

//! Shared identifiers used across the tracer.

use petgraph::prelude::NodeIndex;

type IndexType = u32;

/// Identifies a router within the network under trace. Reuses a graph node index so that router
/// order is naturally a total order (their creation order), matching the fixed router-id sort
/// order the routing snapshot relies on.
pub type RouterId = NodeIndex<IndexType>;

/// A dense, nonnegative id assigned to a [`crate::state::State`] when it is attached to the graph.
/// Never reused.
pub type StateId = usize;

/// An IP prefix, in the simplified representation the tracer needs: only identity and ordering
/// matter, never the bits.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, serde::Serialize)]
pub struct Prefix(pub u32);

/// A directed BGP transport session between two routers, the unit the queue branching rule groups
/// events by.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, serde::Serialize)]
pub struct DirectedSession {
    /// Sending router.
    pub source: RouterId,
    /// Receiving router.
    pub destination: RouterId,
}

impl DirectedSession {
    /// Build the directed session carried by an event.
    pub fn new(source: RouterId, destination: RouterId) -> Self {
        Self { source, destination }
    }
}
