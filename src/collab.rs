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

//! # Collaborator interfaces
//!
//! The tracer never reimplements the BGP decision process, the network topology, or the
//! discrete-event simulator. Instead it reaches those through the small set of capability traits
//! in this module. A binding layer supplies one concrete implementation of each; the tracer is
//! generic over them.

use crate::types::{Prefix, RouterId};
use std::fmt::Debug;

/// A single pending message, as the simulator represents it. The tracer reads only the two
/// addresses; everything else is opaque payload dispatched through [`TracerEvent::payload_equivalent`].
pub trait TracerEvent: Clone + Debug {
    /// Router that sent this event.
    fn source(&self) -> RouterId;
    /// Router that will receive this event.
    fn destination(&self) -> RouterId;
    /// Protocol-dispatched equality over whatever payload the event carries. Two events with
    /// different source/destination are never compared through this method.
    fn payload_equivalent(&self, other: &Self) -> bool;
}

/// A value kind stored as a routing table entry (forwarding-table entry or RIB route). The
/// equality used for structural identity is the collaborator's own, not a generic derive, since
/// some fields of a real BGP route (e.g. a receive timestamp) must not participate in identity.
pub trait RouteValue: Clone + Debug {
    /// Structural equality used for state deduplication.
    fn route_equivalent(&self, other: &Self) -> bool;
}

/// A forwarding-table entry (next-hop, outgoing interface, metric, type).
pub trait FwEntryValue: Clone + Debug {
    /// Structural equality used for state deduplication.
    fn fw_entry_equivalent(&self, other: &Self) -> bool;
}

/// The tunable FIFO of pending events, owned by the external simulator.
///
/// The tracer uses exactly three primitives on it: read the queue, reorder it so a chosen index
/// becomes the head, and step it by exactly one event. `fifo_replace` and `event_deep_copy` are
/// provided implicitly through [`Clone`] on the associated event type.
pub trait Simulator {
    /// Concrete pending-event type produced by this simulator.
    type Event: TracerEvent;
    /// Error returned when a step fails; propagated verbatim as
    /// [`crate::error::Error::SimulatorStepFailed`].
    type StepError: std::error::Error + 'static;

    /// Number of events currently pending.
    fn events_len(&self) -> usize;
    /// Read-only access to the event at FIFO position `i`.
    fn event_at(&self, i: usize) -> &Self::Event;
    /// Permute the FIFO so that the event currently at position `i` becomes position 0. Must be
    /// an exact positional reorder, not merely a swap with the head, or the deterministic mapping
    /// from `(state, trans_index)` to the resulting state breaks.
    fn set_first(&mut self, i: usize);
    /// Advance the simulation by exactly one event.
    fn step_one(&mut self) -> Result<(), Self::StepError>;
    /// Destroy the current FIFO and install a deep copy of `events`, preserving order.
    fn fifo_replace(&mut self, events: Vec<Self::Event>);
}

/// One BGP peer's session state as visible from the owning router: sequence counters plus the two
/// adjacency RIBs. Routes are deep-copied in and out.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PeerSessionSnapshot<R> {
    /// Address of the neighboring router.
    pub neighbor: RouterId,
    /// Number of update messages sent on this session so far.
    pub send_seq: u64,
    /// Number of update messages received on this session so far.
    pub recv_seq: u64,
    /// Next-hop address used when originating routes on this session.
    pub next_hop: RouterId,
    /// Local address used as the source of this session.
    pub src_addr: RouterId,
    /// Most recent session-level error, if any (e.g. a notification code).
    pub last_error: Option<String>,
    /// Routes received from this peer, keyed by prefix.
    pub adj_rib_in: Vec<(Prefix, R)>,
    /// Routes advertised to this peer, keyed by prefix.
    pub adj_rib_out: Vec<(Prefix, R)>,
}

impl<R: RouteValue> PeerSessionSnapshot<R> {
    /// Session identity: equal neighbor, and `adj_rib_in`/`adj_rib_out` equal as ordered lists of
    /// routes. Sequence counters and the error cell are not part of identity.
    pub fn session_equivalent(&self, other: &Self) -> bool {
        self.neighbor == other.neighbor
            && ribs_equivalent(&self.adj_rib_in, &other.adj_rib_in)
            && ribs_equivalent(&self.adj_rib_out, &other.adj_rib_out)
    }
}

fn ribs_equivalent<R: RouteValue>(a: &[(Prefix, R)], b: &[(Prefix, R)]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((pa, ra), (pb, rb))| pa == pb && ra.route_equivalent(rb))
}

/// The network of BGP routers, owned exclusively by the tracer for the scope of a trace call.
///
/// Router order returned by [`Network::router_ids`] must be stable (ascending by router-id) and
/// identical across `capture`/`inject` calls within one graph; that order is what makes structural
/// equality linear in network size.
pub trait Network {
    /// Concrete RIB/forwarding-table route type used by this network.
    type Route: RouteValue;
    /// Concrete forwarding-table entry type used by this network.
    type FwEntry: FwEntryValue;

    /// All routers, in the fixed order used for every snapshot comparison.
    fn router_ids(&self) -> Vec<RouterId>;
    /// The router's forwarding table: prefix to ordered list of entries.
    fn forwarding_table(&self, router: RouterId) -> Vec<(Prefix, Vec<Self::FwEntry>)>;
    /// The router's local RIB: prefix to the chosen route.
    fn local_rib(&self, router: RouterId) -> Vec<(Prefix, Self::Route)>;
    /// The router's BGP peers, in its configured order.
    fn peer_sessions(&self, router: RouterId) -> Vec<PeerSessionSnapshot<Self::Route>>;

    /// Replace `router`'s forwarding table, destroying whatever was there. Fails with
    /// [`crate::error::Error::IncompatibleTopology`] if `router` is unknown.
    fn set_forwarding_table(
        &mut self,
        router: RouterId,
        table: Vec<(Prefix, Vec<Self::FwEntry>)>,
    ) -> Result<(), TopologyMismatch>;
    /// Replace `router`'s local RIB, destroying whatever was there.
    fn set_local_rib(
        &mut self,
        router: RouterId,
        rib: Vec<(Prefix, Self::Route)>,
    ) -> Result<(), TopologyMismatch>;
    /// Replace `router`'s peer sessions (adjacency RIBs, sequence counters, error cell), in the
    /// same peer order as `sessions`. Fails if the router is unknown or the peer list does not
    /// match the router's configured peers in order.
    fn set_peer_sessions(
        &mut self,
        router: RouterId,
        sessions: Vec<PeerSessionSnapshot<Self::Route>>,
    ) -> Result<(), TopologyMismatch>;
}

/// Marker error returned by `Network::set_*` when the router/peer structure of the network no
/// longer matches what a [`crate::routing_snapshot::RoutingSnapshot`] expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("router or peer list does not match the snapshot being injected")]
pub struct TopologyMismatch;
