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

//! The arena owning every state ever attached, plus the structural analyses over it.
//!
//! States never move and are never removed, so a state's dense [`StateId`] doubles as its
//! [`petgraph`] node index: there is no separate `states_by_id` lookup table to keep in sync.

use crate::collab::{FwEntryValue, RouteValue, TracerEvent};
use crate::config::TracerConfig;
use crate::queue_snapshot::QueueSnapshot;
use crate::routing_snapshot::RoutingSnapshot;
use crate::state::{State, Transition};
use crate::types::StateId;
use log::{trace, warn};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Direction, graph::NodeIndex};
use std::collections::HashSet;

fn node(id: StateId) -> NodeIndex {
    NodeIndex::new(id)
}

/// A cycle found in the state graph: `prefix` is a path of state ids from some ancestor into the
/// cycle, and `cycle` is the cycle itself in traversal order, starting and ending at the same
/// state id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CycleDescriptor {
    /// State ids from an ancestor of the cycle down to (but excluding) the cycle's entry point.
    pub prefix: Vec<StateId>,
    /// The cycle, in traversal order, with the entry point repeated at both ends.
    pub cycle: Vec<StateId>,
}

/// A transition that has been chosen but not yet wired into the graph: the simulator step it
/// corresponds to has not run yet (or its resulting state has not been reconciled yet).
#[derive(Debug, Clone)]
pub struct PendingTransition<E: TracerEvent> {
    pub(crate) from: StateId,
    pub(crate) trans_index: usize,
    pub(crate) event: E,
}

impl<E: TracerEvent> PendingTransition<E> {
    /// The origin state this transition was generated from.
    pub fn from(&self) -> StateId {
        self.from
    }
    /// Position inside the origin state's `allowed_transitions`.
    pub fn trans_index(&self) -> usize {
        self.trans_index
    }
    /// The event this transition will deliver.
    pub fn event(&self) -> &E {
        &self.event
    }
}

/// Owns every [`State`] ever attached and the [`Transition`] edges between them.
pub struct Graph<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue> {
    inner: StableDiGraph<State<E, Rt, Fw>, Transition<E>>,
    root: StateId,
    final_states: Vec<StateId>,
    marking_seq_counter: u64,
    cycles: Option<Vec<CycleDescriptor>>,
    config: TracerConfig,
}

impl<E: TracerEvent, Rt: RouteValue, Fw: FwEntryValue> Graph<E, Rt, Fw> {
    /// Create a new graph whose root is the given captured snapshot. The root is attached as
    /// state 0 with no incoming transition.
    pub fn new(config: TracerConfig, queue: QueueSnapshot<E>, routing: RoutingSnapshot<Rt, Fw>) -> Self {
        let mut inner = StableDiGraph::new();
        let mut root_state = State::new(0, queue, routing, 0);
        root_state.flags_mut().set_root();
        let is_final = root_state.is_final();
        inner.add_node(root_state);
        let mut final_states = Vec::new();
        if is_final && config.max_final_states > 0 {
            final_states.push(0);
        } else if is_final {
            warn!("final-state list is full (0 entries); state 0 is FINAL but not indexed");
        }
        Self { inner, root: 0, final_states, marking_seq_counter: 0, cycles: None, config }
    }

    /// The root state's id.
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Number of states currently attached.
    pub fn num_states(&self) -> usize {
        self.inner.node_count()
    }

    /// `true` once `max_states` has been reached; no further state may be attached.
    pub fn is_full(&self) -> bool {
        self.num_states() >= self.config.max_states
    }

    /// Read access to a state by id.
    pub fn state(&self, id: StateId) -> Option<&State<E, Rt, Fw>> {
        self.inner.node_weight(node(id))
    }

    /// Ids of every state flagged FINAL and indexed in the fast-lookup list (may be fewer than the
    /// true number of final states if `max_final_states` was exceeded).
    pub fn final_states(&self) -> &[StateId] {
        &self.final_states
    }

    /// Every attached state's id, in creation order.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.num_states()).filter(move |&id| self.inner.node_weight(node(id)).is_some())
    }

    /// `true` if an outgoing transition already exists from `from` for `trans_index` (the
    /// idempotence check `generate_transition` relies on).
    pub fn has_transition(&self, from: StateId, trans_index: usize) -> bool {
        self.inner
            .edges_directed(node(from), Direction::Outgoing)
            .any(|e| e.weight().trans_index() == trans_index)
    }

    /// Number of outgoing transitions generated from `from` so far.
    pub fn num_generated(&self, from: StateId) -> usize {
        self.inner.edges_directed(node(from), Direction::Outgoing).count()
    }

    /// `true` once every allowed transition of `from` has been generated.
    pub fn is_complete(&self, from: StateId) -> bool {
        match self.state(from) {
            Some(s) => self.num_generated(from) >= s.allowed_transitions().len(),
            None => false,
        }
    }

    /// Returns a fresh [`PendingTransition`] for the `k`-th allowed index of `from`, unless a
    /// transition with that `trans_index` already exists on `from` (idempotence: `None` signals
    /// `AlreadyTaken` to the caller, not an error).
    pub fn generate_transition(&self, from: StateId, k: usize) -> Option<PendingTransition<E>> {
        if self.has_transition(from, k) {
            return None;
        }
        let state = self.state(from)?;
        let event_idx = *state.allowed_transitions().get(k)?;
        let event = state.queue().event(event_idx).clone();
        Some(PendingTransition { from, trans_index: k, event })
    }

    /// Linear scan for a state structurally equivalent to `(queue, routing)`. See §4.5: an index
    /// keyed on `(event_count, max_msgs_per_directed_session, routing-hash)` could accelerate this
    /// with no change in observable behavior; the reference behavior performs a plain scan.
    pub fn search_equivalent(&self, queue: &QueueSnapshot<E>, routing: &RoutingSnapshot<Rt, Fw>) -> Option<StateId> {
        self.state_ids().find(|&id| {
            let s = self.state(id).expect("state_ids only yields attached ids");
            QueueSnapshot::equivalent(s.queue(), queue) && RoutingSnapshot::equivalent(s.routing(), routing)
        })
    }

    /// Attach a brand-new state reached from `pending`, capturing `queue`/`routing` as its
    /// snapshot. Returns the newly assigned id.
    pub fn attach_new_state(
        &mut self,
        pending: PendingTransition<E>,
        queue: QueueSnapshot<E>,
        routing: RoutingSnapshot<Rt, Fw>,
    ) -> StateId {
        let from_depth = self.state(pending.from).map(|s| s.depth()).unwrap_or(0);
        let new_id = self.num_states();
        let new_state = State::new(new_id, queue, routing, from_depth + 1);
        let is_final = new_state.is_final();
        let new_node = self.inner.add_node(new_state);
        debug_assert_eq!(new_node.index(), new_id);

        self.inner.add_edge(node(pending.from), new_node, Transition::new(pending.trans_index, pending.event));

        if is_final {
            if self.final_states.len() < self.config.max_final_states {
                self.final_states.push(new_id);
            } else {
                warn!("final-state list is full ({} entries); state {} is FINAL but not indexed", self.config.max_final_states, new_id);
            }
        }
        self.cycles = None;
        trace!("attached state {} from {} via index {}", new_id, pending.from, pending.trans_index);
        new_id
    }

    /// Wire `pending` as an additional incoming transition into the existing state `to`, instead
    /// of attaching a new one. The candidate snapshot that was captured to discover `to` is simply
    /// dropped by the caller.
    pub fn add_merge_edge(&mut self, pending: PendingTransition<E>, to: StateId) {
        self.inner.add_edge(node(pending.from), node(to), Transition::new(pending.trans_index, pending.event));
        self.cycles = None;
        trace!("merged transition from {} (index {}) into existing state {}", pending.from, pending.trans_index, to);
    }

    /// Increment the marking counter and walk backward from every final state along incoming
    /// transitions, setting `CAN_LEAD_TO_FINAL` on everything reached. A state whose
    /// `marking_seq` already equals the new counter is skipped (cycle guard), so this terminates
    /// even on a cyclic graph. Calling this again is a no-op on the resulting flag set, modulo the
    /// bumped counter.
    pub fn mark_can_lead_to_final(&mut self) {
        self.marking_seq_counter += 1;
        let seq = self.marking_seq_counter;
        let mut stack: Vec<StateId> = self.final_states.clone();
        while let Some(id) = stack.pop() {
            let already = self.state(id).map(|s| s.marking_seq() == seq).unwrap_or(true);
            if already {
                continue;
            }
            if let Some(s) = self.inner.node_weight_mut(node(id)) {
                s.set_marking_seq(seq);
                s.flags_mut().set_can_lead_to_final();
            }
            for edge in self.inner.edges_directed(node(id), Direction::Incoming) {
                stack.push(edge.source().index());
            }
        }
    }

    /// DFS with a visited set and an explicit stack from the root; returns the first back-edge
    /// encountered as a cycle descriptor, or `None` if the reachable graph is acyclic.
    pub fn detect_one_cycle(&self) -> Option<CycleDescriptor> {
        self.dfs_cycles(true).into_iter().next()
    }

    /// As [`Self::detect_one_cycle`], but collects every back-edge found during one DFS pass.
    /// The cached list is invalidated whenever the graph gains a new transition and recomputed
    /// here on demand.
    pub fn detect_all_cycles(&mut self) -> &[CycleDescriptor] {
        if self.cycles.is_none() {
            self.cycles = Some(self.dfs_cycles(false));
        }
        self.cycles.as_deref().unwrap()
    }

    fn dfs_cycles(&self, stop_at_first: bool) -> Vec<CycleDescriptor> {
        let mut found = Vec::new();
        let mut visited: HashSet<StateId> = HashSet::new();
        let mut on_stack: HashSet<StateId> = HashSet::new();
        let mut path: Vec<StateId> = Vec::new();
        // Each frame: the node, its children, and the next child index to visit.
        let mut frames: Vec<(StateId, Vec<StateId>, usize)> = Vec::new();

        let start = self.root;
        visited.insert(start);
        on_stack.insert(start);
        path.push(start);
        frames.push((start, self.children_of(start), 0));

        while let Some((node_id, children, idx)) = frames.last_mut() {
            if *idx >= children.len() {
                on_stack.remove(node_id);
                path.pop();
                frames.pop();
                continue;
            }
            let child = children[*idx];
            *idx += 1;

            if on_stack.contains(&child) {
                let cycle_start = path.iter().position(|&s| s == child).expect("on_stack implies present in path");
                let mut cycle: Vec<StateId> = path[cycle_start..].to_vec();
                cycle.push(child);
                let prefix: Vec<StateId> = path[..cycle_start].to_vec();
                found.push(CycleDescriptor { prefix, cycle });
                if stop_at_first {
                    return found;
                }
                continue;
            }
            if visited.insert(child) {
                on_stack.insert(child);
                path.push(child);
                let grandchildren = self.children_of(child);
                frames.push((child, grandchildren, 0));
            }
        }

        found
    }

    fn children_of(&self, id: StateId) -> Vec<StateId> {
        self.inner
            .edges_directed(node(id), Direction::Outgoing)
            .map(|e| e.target().index())
            .collect()
    }

    /// Every transition in the graph as `(from, to, trans_index)` triples, in no particular
    /// order; used by [`crate::export`] to render the graph's edge set.
    pub fn edges(&self) -> impl Iterator<Item = (StateId, StateId, usize)> + '_ {
        self.inner
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().trans_index()))
    }

    /// Among `candidates` that are active (`|outgoing| < |allowed|`) and not
    /// `DEFINITELY_BLOCKED`, returns the one minimizing `max_msgs_per_directed_session`, the
    /// fairness scheduler that expands the least congested session first.
    pub fn get_active_minimum_session<I>(&self, candidates: I) -> Option<StateId>
    where
        I: IntoIterator<Item = StateId>,
    {
        candidates
            .into_iter()
            .filter(|&id| {
                self.state(id)
                    .map(|s| !self.is_complete(id) && !s.flags().is_definitely_blocked())
                    .unwrap_or(false)
            })
            .min_by_key(|&id| self.state(id).unwrap().queue().max_msgs_per_directed_session())
    }
}
