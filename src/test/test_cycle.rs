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

//! A router whose route flaps between two values on every delivered message closes a two-state
//! cycle back onto the root after one round trip.

use crate::collab::{FwEntryValue, Network, PeerSessionSnapshot, RouteValue, Simulator, TopologyMismatch, TracerEvent};
use crate::config::TracerConfig;
use crate::tracer::{TraceOutcome, Tracer};
use crate::types::{Prefix, RouterId};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
struct ToggleEvent {
    router: RouterId,
}
impl TracerEvent for ToggleEvent {
    fn source(&self) -> RouterId {
        self.router
    }
    fn destination(&self) -> RouterId {
        self.router
    }
    fn payload_equivalent(&self, _other: &Self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PhaseRoute(bool);
impl RouteValue for PhaseRoute {
    fn route_equivalent(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NoFw;
impl FwEntryValue for NoFw {
    fn fw_entry_equivalent(&self, _other: &Self) -> bool {
        true
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("toggle step failed")]
struct NeverFails;

#[derive(Default)]
struct Shared {
    phase: bool,
}

struct SimHandle {
    queue: Vec<ToggleEvent>,
    shared: Rc<RefCell<Shared>>,
}

#[derive(Clone)]
struct NetHandle {
    shared: Rc<RefCell<Shared>>,
    router: RouterId,
}

impl Simulator for SimHandle {
    type Event = ToggleEvent;
    type StepError = NeverFails;

    fn events_len(&self) -> usize {
        self.queue.len()
    }
    fn event_at(&self, i: usize) -> &ToggleEvent {
        &self.queue[i]
    }
    fn set_first(&mut self, i: usize) {
        let e = self.queue.remove(i);
        self.queue.insert(0, e);
    }
    fn step_one(&mut self) -> Result<(), NeverFails> {
        let event = self.queue.remove(0);
        self.shared.borrow_mut().phase ^= true;
        // The route flap always re-announces itself: the queue never runs dry.
        self.queue.push(event);
        Ok(())
    }
    fn fifo_replace(&mut self, events: Vec<ToggleEvent>) {
        self.queue = events;
    }
}

impl Network for NetHandle {
    type Route = PhaseRoute;
    type FwEntry = NoFw;

    fn router_ids(&self) -> Vec<RouterId> {
        vec![self.router]
    }
    fn forwarding_table(&self, _router: RouterId) -> Vec<(Prefix, Vec<NoFw>)> {
        Vec::new()
    }
    fn local_rib(&self, _router: RouterId) -> Vec<(Prefix, PhaseRoute)> {
        vec![(Prefix(0), PhaseRoute(self.shared.borrow().phase))]
    }
    fn peer_sessions(&self, _router: RouterId) -> Vec<PeerSessionSnapshot<PhaseRoute>> {
        Vec::new()
    }
    fn set_forwarding_table(&mut self, _: RouterId, _: Vec<(Prefix, Vec<NoFw>)>) -> Result<(), TopologyMismatch> {
        Ok(())
    }
    fn set_local_rib(&mut self, _: RouterId, rib: Vec<(Prefix, PhaseRoute)>) -> Result<(), TopologyMismatch> {
        if let Some((_, r)) = rib.into_iter().next() {
            self.shared.borrow_mut().phase = r.0;
        }
        Ok(())
    }
    fn set_peer_sessions(&mut self, _: RouterId, _: Vec<PeerSessionSnapshot<PhaseRoute>>) -> Result<(), TopologyMismatch> {
        Ok(())
    }
}

#[test]
fn oscillation_closes_a_two_state_cycle() {
    let router: RouterId = 0.into();
    let shared = Rc::new(RefCell::new(Shared::default()));
    let mut sim = SimHandle { queue: vec![ToggleEvent { router }], shared: shared.clone() };
    let mut net = NetHandle { shared, router };
    let mut tracer = Tracer::start(&sim, &net, TracerConfig::default());

    let (o1, _) = tracer.trace_step(&mut sim, &mut net, 0, 0).unwrap();
    let s1 = match o1 {
        TraceOutcome::NewState(id) => id,
        other => panic!("expected NewState, got {:?}", other),
    };
    assert_ne!(s1, 0);

    let (o2, _) = tracer.trace_step(&mut sim, &mut net, s1, 0).unwrap();
    assert_eq!(o2, TraceOutcome::MergedInto(0));

    let cycle = tracer.graph().detect_one_cycle().expect("cycle must be found");
    assert_eq!(cycle.cycle.first(), Some(&0));
    assert_eq!(cycle.cycle.last(), Some(&0));
    assert!(cycle.cycle.contains(&s1));
}
