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

//! One global configuration: pending queue plus every router's routing tables.

use crate::collab::{FwEntryValue, RouteValue, TracerEvent};
use crate::queue_snapshot::QueueSnapshot;
use crate::routing_snapshot::RoutingSnapshot;
use crate::types::StateId;

/// Bit flags describing a state's role in the graph. `ROOT` and `FINAL` are fixed at creation;
/// `CAN_LEAD_TO_FINAL` is set by [`crate::graph::Graph::mark_can_lead_to_final`];
/// `DEFINITELY_BLOCKED` is never set by any core algorithm, only by a caller that knows a state can
/// never usefully be expanded further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeFlags(u8);

impl TypeFlags {
    const ROOT: u8 = 0b0001;
    const FINAL: u8 = 0b0010;
    const CAN_LEAD_TO_FINAL: u8 = 0b0100;
    const DEFINITELY_BLOCKED: u8 = 0b1000;

    /// An empty flag set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Whether this is the graph's root state.
    pub fn is_root(&self) -> bool {
        self.0 & Self::ROOT != 0
    }
    /// Whether this state's allowed-transition set is empty.
    pub fn is_final(&self) -> bool {
        self.0 & Self::FINAL != 0
    }
    /// Whether a reachability sweep has found a path from this state to some final state.
    pub fn can_lead_to_final(&self) -> bool {
        self.0 & Self::CAN_LEAD_TO_FINAL != 0
    }
    /// Whether a caller has hinted that this state should not be expanded further by
    /// [`crate::graph::Graph::get_active_minimum_session`].
    pub fn is_definitely_blocked(&self) -> bool {
        self.0 & Self::DEFINITELY_BLOCKED != 0
    }

    pub(crate) fn set_root(&mut self) {
        self.0 |= Self::ROOT;
    }
    pub(crate) fn set_final(&mut self) {
        self.0 |= Self::FINAL;
    }
    pub(crate) fn set_can_lead_to_final(&mut self) {
        self.0 |= Self::CAN_LEAD_TO_FINAL;
    }
    /// Externally-settable hint consumed only by `get_active_minimum_session`; defaults to false.
    pub fn set_definitely_blocked(&mut self, blocked: bool) {
        if blocked {
            self.0 |= Self::DEFINITELY_BLOCKED;
        } else {
            self.0 &= !Self::DEFINITELY_BLOCKED;
        }
    }
}

/// One node of the state graph: a queue snapshot, a routing snapshot, and the bookkeeping the
/// graph needs to dedup and classify it. Incoming/outgoing transitions are not stored on the
/// state itself; they are the edges of the arena graph that owns it (see
/// [`crate::graph::Graph`]).
#[derive(Debug, Clone)]
pub struct State<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue> {
    id: StateId,
    queue: QueueSnapshot<E>,
    routing: RoutingSnapshot<Rt, Fw>,
    flags: TypeFlags,
    marking_seq: u64,
    depth: usize,
}

impl<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue> State<E, Rt, Fw> {
    pub(crate) fn new(id: StateId, queue: QueueSnapshot<E>, routing: RoutingSnapshot<Rt, Fw>, depth: usize) -> Self {
        let mut flags = TypeFlags::empty();
        if queue.allowed_transitions().is_empty() {
            flags.set_final();
        }
        Self { id, queue, routing, flags, marking_seq: 0, depth }
    }

    /// The id assigned to this state when it was attached to the graph.
    pub fn id(&self) -> StateId {
        self.id
    }

    /// The captured pending-event queue.
    pub fn queue(&self) -> &QueueSnapshot<E> {
        &self.queue
    }

    /// The captured per-router routing state.
    pub fn routing(&self) -> &RoutingSnapshot<Rt, Fw> {
        &self.routing
    }

    /// This state's flags.
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub(crate) fn flags_mut(&mut self) -> &mut TypeFlags {
        &mut self.flags
    }

    /// Length of a shortest path from the graph's root to this state.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn marking_seq(&self) -> u64 {
        self.marking_seq
    }

    pub(crate) fn set_marking_seq(&mut self, seq: u64) {
        self.marking_seq = seq;
    }

    /// `FINAL ⇔ allowed_transitions is empty`.
    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }

    /// Events eligible to be delivered next.
    pub fn allowed_transitions(&self) -> &[usize] {
        self.queue.allowed_transitions()
    }
}

/// One directed edge of the state graph: a simulator step that delivered the event at
/// `trans_index` inside the origin state's `allowed_transitions`.
#[derive(Debug, Clone)]
pub struct Transition<E: TracerEvent> {
    /// Position inside the origin state's `allowed_transitions` that this transition explores.
    trans_index: usize,
    /// A clone of the event that was delivered, kept for inspection/export; the graph is an
    /// index-based arena so transitions never borrow across states.
    event: E,
}

impl<E: TracerEvent> Transition<E> {
    pub(crate) fn new(trans_index: usize, event: E) -> Self {
        Self { trans_index, event }
    }

    /// Position inside the origin state's `allowed_transitions`.
    pub fn trans_index(&self) -> usize {
        self.trans_index
    }

    /// The event that was delivered along this transition.
    pub fn event(&self) -> &E {
        &self.event
    }
}
