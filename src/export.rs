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

//! Read-only, in-memory rendering of a [`Graph`]/[`State`] into a plain `serde`-serializable form.
//!
//! Nothing here writes to a file or talks to a renderer; DOT/HTML/image export consumes the
//! structured value produced by [`graph_export`]/[`state_dump`] out of process.

use crate::collab::{FwEntryValue, RouteValue, TracerEvent};
use crate::graph::Graph;
use crate::state::State;
use crate::types::StateId;
use serde::Serialize;

/// Level of detail produced by [`graph_export`]/[`state_dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStyle {
    /// Ids and edges only, enough for a DOT skeleton.
    Simple,
    /// Adds each state's routing/queue summary, for an HTML/image renderer.
    Rich,
}

/// One directed transition, as rendered for export.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeDump {
    /// Id of the state the transition leaves.
    pub from: StateId,
    /// Id of the state the transition reaches, whether by attach or by merge.
    pub to: StateId,
    /// Position inside the origin state's `allowed_transitions`.
    pub trans_index: usize,
}

/// One router's routing state, rendered as debug-formatted summary strings so that the dump does
/// not require the collaborator's `Route`/`FwEntry` types to be `Serialize` themselves.
#[derive(Debug, Clone, Serialize)]
pub struct RouterSummary {
    /// Debug-formatted router identifier.
    pub router: String,
    /// One debug-formatted `prefix -> route` entry per local RIB entry.
    pub local_rib: Vec<String>,
    /// One debug-formatted `prefix -> entries` entry per forwarding table entry.
    pub forwarding_table: Vec<String>,
}

/// Everything about one state worth showing an external renderer.
#[derive(Debug, Clone, Serialize)]
pub struct StateDump {
    /// The state's id.
    pub id: StateId,
    /// Distance from the root along the transition that first attached this state.
    pub depth: usize,
    /// `true` for the graph's root state.
    pub is_root: bool,
    /// `true` if the state's pending-event queue is empty.
    pub is_final: bool,
    /// `true` if a backward walk from some final state has reached this one.
    pub can_lead_to_final: bool,
    /// `true` if this state was marked as never able to make further progress.
    pub is_definitely_blocked: bool,
    /// Number of events still in the state's pending-event queue.
    pub pending_events: usize,
    /// Number of transitions currently allowed to be generated from this state.
    pub allowed_transitions: usize,
    /// `None` under [`ExportStyle::Simple`]; populated under [`ExportStyle::Rich`].
    pub routers: Option<Vec<RouterSummary>>,
}

/// The whole graph, rendered as a flat list of state dumps plus the edge set.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDump {
    /// Id of the root state.
    pub root: StateId,
    /// Every attached state, in creation order.
    pub states: Vec<StateDump>,
    /// Every transition in the graph.
    pub edges: Vec<EdgeDump>,
    /// Ids of every state flagged FINAL and indexed in the fast-lookup list.
    pub final_states: Vec<StateId>,
}

fn router_summary<Rt: RouteValue, Fw: FwEntryValue>(
    snapshot: &crate::routing_snapshot::RouterSnapshot<Rt, Fw>,
) -> RouterSummary {
    RouterSummary {
        router: format!("{:?}", snapshot.router()),
        local_rib: snapshot.local_rib().iter().map(|(p, r)| format!("{:?} -> {:?}", p, r)).collect(),
        forwarding_table: snapshot
            .forwarding_table()
            .iter()
            .map(|(p, entries)| format!("{:?} -> {:?}", p, entries))
            .collect(),
    }
}

fn build_state_dump<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue>(
    state: &State<E, Rt, Fw>,
    style: ExportStyle,
) -> StateDump {
    let routers = match style {
        ExportStyle::Simple => None,
        ExportStyle::Rich => Some(state.routing().routers().iter().map(router_summary).collect()),
    };
    StateDump {
        id: state.id(),
        depth: state.depth(),
        is_root: state.flags().is_root(),
        is_final: state.is_final(),
        can_lead_to_final: state.flags().can_lead_to_final(),
        is_definitely_blocked: state.flags().is_definitely_blocked(),
        pending_events: state.queue().len(),
        allowed_transitions: state.allowed_transitions().len(),
        routers,
    }
}

/// Dump a single state, or `None` if `state_id` is not attached to `graph`.
pub fn state_dump<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue>(
    graph: &Graph<E, Rt, Fw>,
    state_id: StateId,
    style: ExportStyle,
) -> Option<StateDump> {
    graph.state(state_id).map(|s| build_state_dump(s, style))
}

/// Dump the whole graph: every attached state plus every transition between them.
pub fn graph_export<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue>(
    graph: &Graph<E, Rt, Fw>,
    style: ExportStyle,
) -> GraphDump {
    let states = graph
        .state_ids()
        .map(|id| build_state_dump(graph.state(id).expect("state_ids only yields attached ids"), style))
        .collect();
    let edges = graph.edges().map(|(from, to, trans_index)| EdgeDump { from, to, trans_index }).collect();
    GraphDump { root: graph.root(), states, edges, final_states: graph.final_states().to_vec() }
}
