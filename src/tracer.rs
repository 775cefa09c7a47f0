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

//! The driver: injects snapshots into the external simulator+network, steps exactly one event,
//! captures the result, and reconciles it with the [`Graph`].

use crate::collab::{FwEntryValue, Network, RouteValue, Simulator, TracerEvent};
use crate::config::TracerConfig;
use crate::error::{Error, Warning};
use crate::graph::Graph;
use crate::queue_snapshot::QueueSnapshot;
use crate::routing_snapshot::RoutingSnapshot;
use crate::types::StateId;
use log::{debug, error};
use std::collections::{HashSet, VecDeque};

/// Outcome of one [`Tracer::trace_step`] call that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    /// A structurally new state was attached with this id.
    NewState(StateId),
    /// The resulting snapshot was structurally equivalent to an existing state, which acquired a
    /// new incoming transition; no new id was assigned.
    MergedInto(StateId),
    /// The same `(state, trans_index)` pair was already explored; the graph is unchanged.
    AlreadyTaken,
}

/// Drives a [`Simulator`] and [`Network`] pair through a [`Graph`] of reachable configurations.
///
/// The tracer exclusively borrows `sim` and `net` for the scope of a trace call and is not
/// reentrant: every operation runs to completion before the next begins.
pub struct Tracer<S: Simulator, N: Network> {
    graph: Graph<S::Event, N::Route, N::FwEntry>,
    router_order: Vec<crate::types::RouterId>,
}

impl<S, N> Tracer<S, N>
where
    S: Simulator,
    N: Network,
{
    /// Freeze the router list (by router-id ascending) and initialize the graph with the root
    /// state captured from `sim`/`net`.
    pub fn start(sim: &S, net: &N, config: TracerConfig) -> Self {
        let mut router_order = net.router_ids();
        router_order.sort();
        let queue = QueueSnapshot::capture(sim);
        let routing = RoutingSnapshot::capture(net, &router_order);
        let graph = Graph::new(config, queue, routing);
        Self { graph, router_order }
    }

    /// Read-only access to the graph built so far.
    pub fn graph(&self) -> &Graph<S::Event, N::Route, N::FwEntry> {
        &self.graph
    }

    /// The router order fixed at `start`, used for every snapshot comparison.
    pub fn router_order(&self) -> &[crate::types::RouterId] {
        &self.router_order
    }

    /// Write `state_id`'s snapshots back into `sim`/`net`, preparing them to be stepped.
    pub fn inject_state(&self, sim: &mut S, net: &mut N, state_id: StateId) -> Result<(), Error<S::StepError>> {
        let state = self.graph.state(state_id).ok_or(Error::UnknownState(state_id))?;
        state.queue().inject(sim);
        state.routing().inject(net)
    }

    /// Perform one step of the core driving loop: inject `state_id`'s snapshots, deliver the event
    /// at allowed-transition position `trans_index`, capture the result, and reconcile it with the
    /// graph.
    ///
    /// Any sub-step failure aborts the step and leaves the graph exactly as it was.
    pub fn trace_step(
        &mut self,
        sim: &mut S,
        net: &mut N,
        state_id: StateId,
        trans_index: usize,
    ) -> Result<(TraceOutcome, Vec<Warning>), Error<S::StepError>> {
        if self.graph.is_full() {
            return Err(Error::GraphFull(self.graph.num_states()));
        }

        let num_allowed = self
            .graph
            .state(state_id)
            .ok_or(Error::UnknownState(state_id))?
            .allowed_transitions()
            .len();
        if trans_index >= num_allowed {
            return Err(Error::UnknownTransition(state_id, trans_index));
        }

        let pending = match self.graph.generate_transition(state_id, trans_index) {
            Some(p) => p,
            None => return Ok((TraceOutcome::AlreadyTaken, Vec::new())),
        };

        self.inject_state(sim, net, state_id)?;

        let fifo_index = self
            .graph
            .state(state_id)
            .expect("just resolved above")
            .allowed_transitions()[trans_index];
        sim.set_first(fifo_index);
        sim.step_one().map_err(Error::SimulatorStepFailed)?;

        let queue = QueueSnapshot::capture(sim);
        let routing = RoutingSnapshot::capture(net, &self.router_order);

        let outcome = match self.graph.search_equivalent(&queue, &routing) {
            Some(existing) => {
                self.graph.add_merge_edge(pending, existing);
                debug!("trace_step({}, {}) merged into {}", state_id, trans_index, existing);
                TraceOutcome::MergedInto(existing)
            }
            None => {
                let before = self.graph.final_states().len();
                let new_id = self.graph.attach_new_state(pending, queue, routing);
                let mut warnings = Vec::new();
                let state_is_final = self.graph.state(new_id).map(|s| s.is_final()).unwrap_or(false);
                if state_is_final && self.graph.final_states().len() == before {
                    warnings.push(Warning::FinalListFull);
                }
                debug!("trace_step({}, {}) attached new state {}", state_id, trans_index, new_id);
                return Ok((TraceOutcome::NewState(new_id), warnings));
            }
        };

        Ok((outcome, Vec::new()))
    }

    /// BFS over `(state_id, trans_index)` work items, starting with every allowed transition of
    /// the root. Whenever a state is discovered for the first time, whether by attach or by
    /// merge, its own allowed transitions are enqueued exactly once; a prior incoming transition
    /// on a merged-into state never suppresses exploring its outgoing transitions (see
    /// SPEC_FULL.md §9 on the `nb_input == 1` open question). Stops when the work queue empties or
    /// `max_states` is reached.
    pub fn trace_whole_graph(&mut self, sim: &mut S, net: &mut N) -> WholeGraphReport {
        let mut queue: VecDeque<(StateId, usize)> = VecDeque::new();
        let mut enqueued: HashSet<StateId> = HashSet::new();

        let mut enqueue_all = |queue: &mut VecDeque<(StateId, usize)>, enqueued: &mut HashSet<StateId>, id: StateId, graph: &Graph<S::Event, N::Route, N::FwEntry>| {
            if enqueued.insert(id) {
                if let Some(s) = graph.state(id) {
                    for k in 0..s.allowed_transitions().len() {
                        queue.push_back((id, k));
                    }
                }
            }
        };

        enqueue_all(&mut queue, &mut enqueued, self.graph.root(), &self.graph);

        let mut report = WholeGraphReport::default();

        while let Some((state_id, trans_index)) = queue.pop_front() {
            if self.graph.is_full() {
                report.hit_graph_full = true;
                break;
            }
            match self.trace_step(sim, net, state_id, trans_index) {
                Ok((TraceOutcome::NewState(id), warnings)) => {
                    report.states_created += 1;
                    report.warnings.extend(warnings);
                    enqueue_all(&mut queue, &mut enqueued, id, &self.graph);
                }
                Ok((TraceOutcome::MergedInto(id), warnings)) => {
                    report.warnings.extend(warnings);
                    enqueue_all(&mut queue, &mut enqueued, id, &self.graph);
                }
                Ok((TraceOutcome::AlreadyTaken, _)) => {}
                Err(Error::GraphFull(_)) => {
                    report.hit_graph_full = true;
                    break;
                }
                Err(err) => {
                    error!("trace_whole_graph: local failure on ({}, {}): {}", state_id, trans_index, err);
                    report.local_failures += 1;
                }
            }
        }

        report
    }
}

/// Summary of one [`Tracer::trace_whole_graph`] call.
#[derive(Debug, Clone, Default)]
pub struct WholeGraphReport {
    /// Number of structurally new states attached during this call.
    pub states_created: usize,
    /// Number of work items that locally failed (simulator error or incompatible topology) and
    /// were skipped rather than aborting the whole enumeration.
    pub local_failures: usize,
    /// `true` if `max_states` was reached before the work queue emptied.
    pub hit_graph_full: bool,
    /// Non-fatal warnings accumulated across every successful step.
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collab::{FwEntryValue, PeerSessionSnapshot, RouteValue, TopologyMismatch, TracerEvent};
    use crate::types::{Prefix, RouterId};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub struct BgpEvent {
        pub src: RouterId,
        pub dst: RouterId,
        pub kind: EventKind,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum EventKind {
        Update(Prefix),
        Withdraw(Prefix),
    }

    impl TracerEvent for BgpEvent {
        fn source(&self) -> RouterId {
            self.src
        }
        fn destination(&self) -> RouterId {
            self.dst
        }
        fn payload_equivalent(&self, other: &Self) -> bool {
            self.kind == other.kind
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Route(pub Prefix);
    impl RouteValue for Route {
        fn route_equivalent(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Fw(pub Prefix);
    impl FwEntryValue for Fw {
        fn fw_entry_equivalent(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    #[derive(Debug, Clone, thiserror::Error)]
    #[error("mock simulator step failed")]
    pub struct StepFailed;

    /// The routing-table half of the mock world: shared between the simulator and network views
    /// because in a real deployment `Simulator::step_one` is what runs the BGP decision process
    /// and mutates the routers the `Network` view reads back out.
    #[derive(Debug, Default)]
    pub struct Shared {
        pub routers: Vec<RouterId>,
        pub adj_rib_in: HashMap<RouterId, Vec<(Prefix, Route)>>,
        pub local_rib: HashMap<RouterId, Vec<(Prefix, Route)>>,
    }

    impl Shared {
        fn new(routers: Vec<RouterId>) -> Rc<RefCell<Self>> {
            let adj_rib_in = routers.iter().map(|&r| (r, Vec::new())).collect();
            let local_rib = routers.iter().map(|&r| (r, Vec::new())).collect();
            Rc::new(RefCell::new(Self { routers, adj_rib_in, local_rib }))
        }
    }

    /// The pending-event FIFO is owned outright by the simulator view; only the routing tables are
    /// shared with the network view.
    pub struct SimHandle {
        queue: Vec<BgpEvent>,
        shared: Rc<RefCell<Shared>>,
        pub fail_next_step: bool,
    }
    #[derive(Clone)]
    pub struct NetHandle(pub Rc<RefCell<Shared>>);

    pub fn mock_pair(routers: Vec<RouterId>, queue: Vec<BgpEvent>) -> (SimHandle, NetHandle) {
        let shared = Shared::new(routers);
        (SimHandle { queue, shared: shared.clone(), fail_next_step: false }, NetHandle(shared))
    }

    impl Simulator for SimHandle {
        type Event = BgpEvent;
        type StepError = StepFailed;

        fn events_len(&self) -> usize {
            self.queue.len()
        }
        fn event_at(&self, i: usize) -> &BgpEvent {
            &self.queue[i]
        }
        fn set_first(&mut self, i: usize) {
            let e = self.queue.remove(i);
            self.queue.insert(0, e);
        }
        fn step_one(&mut self) -> Result<(), StepFailed> {
            if self.fail_next_step {
                return Err(StepFailed);
            }
            let event = self.queue.remove(0);
            let mut s = self.shared.borrow_mut();
            match event.kind {
                EventKind::Update(p) => {
                    let rib = s.adj_rib_in.entry(event.dst).or_default();
                    rib.retain(|(rp, _)| *rp != p);
                    rib.push((p, Route(p)));
                    let local = s.local_rib.entry(event.dst).or_default();
                    local.retain(|(rp, _)| *rp != p);
                    local.push((p, Route(p)));
                }
                EventKind::Withdraw(p) => {
                    let rib = s.adj_rib_in.entry(event.dst).or_default();
                    rib.retain(|(rp, _)| *rp != p);
                    let local = s.local_rib.entry(event.dst).or_default();
                    local.retain(|(rp, _)| *rp != p);
                }
            }
            Ok(())
        }
        fn fifo_replace(&mut self, events: Vec<BgpEvent>) {
            self.queue = events;
        }
    }

    impl Network for NetHandle {
        type Route = Route;
        type FwEntry = Fw;

        fn router_ids(&self) -> Vec<RouterId> {
            self.0.borrow().routers.clone()
        }
        fn forwarding_table(&self, _router: RouterId) -> Vec<(Prefix, Vec<Fw>)> {
            Vec::new()
        }
        fn local_rib(&self, router: RouterId) -> Vec<(Prefix, Route)> {
            self.0.borrow().local_rib.get(&router).cloned().unwrap_or_default()
        }
        fn peer_sessions(&self, router: RouterId) -> Vec<PeerSessionSnapshot<Route>> {
            let rib = self.0.borrow().adj_rib_in.get(&router).cloned().unwrap_or_default();
            vec![PeerSessionSnapshot {
                neighbor: router,
                send_seq: 0,
                recv_seq: 0,
                next_hop: router,
                src_addr: router,
                last_error: None,
                adj_rib_in: rib,
                adj_rib_out: Vec::new(),
            }]
        }
        fn set_forwarding_table(&mut self, _: RouterId, _: Vec<(Prefix, Vec<Fw>)>) -> Result<(), TopologyMismatch> {
            Ok(())
        }
        fn set_local_rib(&mut self, router: RouterId, rib: Vec<(Prefix, Route)>) -> Result<(), TopologyMismatch> {
            let mut s = self.0.borrow_mut();
            if !s.routers.contains(&router) {
                return Err(TopologyMismatch);
            }
            s.local_rib.insert(router, rib);
            Ok(())
        }
        fn set_peer_sessions(&mut self, router: RouterId, sessions: Vec<PeerSessionSnapshot<Route>>) -> Result<(), TopologyMismatch> {
            let mut s = self.0.borrow_mut();
            if !s.routers.contains(&router) {
                return Err(TopologyMismatch);
            }
            if let Some(session) = sessions.into_iter().next() {
                s.adj_rib_in.insert(router, session.adj_rib_in);
            }
            Ok(())
        }
    }

    fn routers(n: u32) -> Vec<RouterId> {
        (0..n).map(RouterId::from).collect()
    }

    #[test]
    fn one_hop_propagation() {
        let r = routers(2);
        let (mut sim, mut net) =
            mock_pair(r.clone(), vec![BgpEvent { src: r[0], dst: r[1], kind: EventKind::Update(Prefix(10)) }]);
        let mut tracer = Tracer::start(&sim, &net, TracerConfig::default());

        let (outcome, _) = tracer.trace_step(&mut sim, &mut net, 0, 0).unwrap();
        assert_eq!(outcome, TraceOutcome::NewState(1));
        assert_eq!(tracer.graph().num_states(), 2);
        assert_eq!(tracer.graph().final_states(), &[1]);
        assert!(tracer.graph().state(1).unwrap().is_final());
        let adj = net.0.borrow().adj_rib_in.get(&r[1]).unwrap().clone();
        assert!(adj.iter().any(|(p, _)| *p == Prefix(10)));
    }

    #[test]
    fn root_with_empty_queue_is_final_and_alone() {
        let r = routers(1);
        let (sim, net) = mock_pair(r, vec![]);
        let tracer = Tracer::start(&sim, &net, TracerConfig::default());
        assert_eq!(tracer.graph().num_states(), 1);
        assert!(tracer.graph().state(0).unwrap().is_final());
        assert_eq!(tracer.graph().final_states(), &[0]);
    }

    #[test]
    fn non_commutative_delivery_forms_a_chain() {
        // Update then withdraw on the *same* directed session: only the update is allowed first.
        let r = routers(2);
        let events = vec![
            BgpEvent { src: r[0], dst: r[1], kind: EventKind::Update(Prefix(5)) },
            BgpEvent { src: r[0], dst: r[1], kind: EventKind::Withdraw(Prefix(5)) },
        ];
        let (mut sim, mut net) = mock_pair(r, events);
        let mut tracer = Tracer::start(&sim, &net, TracerConfig::default());
        assert_eq!(tracer.graph().state(0).unwrap().allowed_transitions(), &[0]);

        let (o1, _) = tracer.trace_step(&mut sim, &mut net, 0, 0).unwrap();
        let s1 = match o1 {
            TraceOutcome::NewState(id) => id,
            other => panic!("expected NewState, got {:?}", other),
        };
        assert_eq!(tracer.graph().state(s1).unwrap().allowed_transitions(), &[0]);

        let (o2, _) = tracer.trace_step(&mut sim, &mut net, s1, 0).unwrap();
        let s2 = match o2 {
            TraceOutcome::NewState(id) => id,
            other => panic!("expected NewState, got {:?}", other),
        };
        assert!(tracer.graph().state(s2).unwrap().is_final());
        assert_eq!(tracer.graph().num_states(), 3);
    }

    #[test]
    fn dedup_merges_independent_updates_of_the_same_prefix() {
        let r = routers(3);
        let events = vec![
            BgpEvent { src: r[0], dst: r[2], kind: EventKind::Update(Prefix(1)) },
            BgpEvent { src: r[1], dst: r[2], kind: EventKind::Update(Prefix(1)) },
        ];
        let (mut sim, mut net) = mock_pair(r, events);
        let mut tracer = Tracer::start(&sim, &net, TracerConfig::default());

        let report = tracer.trace_whole_graph(&mut sim, &mut net);
        // Each first hop lands on a distinct intermediate (one update still pending, from the
        // other session), and both intermediates' second hop converges on the same final state.
        assert_eq!(report.states_created, 3);
        assert_eq!(tracer.graph().final_states().len(), 1);
    }

    #[test]
    fn generate_transition_idempotence_surfaces_as_already_taken() {
        let r = routers(2);
        let (mut sim, mut net) = mock_pair(r.clone(), vec![BgpEvent { src: r[0], dst: r[1], kind: EventKind::Update(Prefix(1)) }]);
        let mut tracer = Tracer::start(&sim, &net, TracerConfig::default());
        let (first, _) = tracer.trace_step(&mut sim, &mut net, 0, 0).unwrap();
        assert!(matches!(first, TraceOutcome::NewState(_)));
        let before = tracer.graph().num_states();
        let (second, _) = tracer.trace_step(&mut sim, &mut net, 0, 0).unwrap();
        assert_eq!(second, TraceOutcome::AlreadyTaken);
        assert_eq!(tracer.graph().num_states(), before);
    }

    #[test]
    fn max_states_cap_halts_cleanly() {
        let r = routers(4);
        let events = vec![
            BgpEvent { src: r[0], dst: r[1], kind: EventKind::Update(Prefix(1)) },
            BgpEvent { src: r[0], dst: r[2], kind: EventKind::Update(Prefix(2)) },
            BgpEvent { src: r[0], dst: r[3], kind: EventKind::Update(Prefix(3)) },
        ];
        let (mut sim, mut net) = mock_pair(r, events);
        let config = TracerConfig { max_states: 2, ..TracerConfig::default() };
        let mut tracer = Tracer::start(&sim, &net, config);
        let report = tracer.trace_whole_graph(&mut sim, &mut net);
        assert!(report.hit_graph_full);
        assert_eq!(tracer.graph().num_states(), 2);
    }
}
