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

//! Deep copy and canonical comparison of the pending-event FIFO.

use crate::collab::{Simulator, TracerEvent};
use crate::types::DirectedSession;
use std::collections::{HashMap, HashSet};

/// A deep-copied, FIFO-ordered snapshot of the simulator's pending events, plus the cached
/// attributes derived from it at capture time.
#[derive(Debug, Clone)]
pub struct QueueSnapshot<E: TracerEvent> {
    events: Vec<E>,
    max_msgs_per_directed_session: usize,
    allowed_transitions: Vec<usize>,
}

impl<E: TracerEvent> QueueSnapshot<E> {
    /// Deep-copy the simulator's FIFO in order and pre-compute the cached attributes.
    pub fn capture<S>(sim: &S) -> Self
    where
        S: Simulator<Event = E>,
    {
        let events: Vec<E> = (0..sim.events_len()).map(|i| sim.event_at(i).clone()).collect();
        Self::from_events(events)
    }

    /// Build directly from an already-owned, FIFO-ordered event list (used by tests and by
    /// [`Self::capture`]).
    pub fn from_events(events: Vec<E>) -> Self {
        let mut seen: HashSet<DirectedSession> = HashSet::new();
        let mut per_session: HashMap<DirectedSession, usize> = HashMap::new();
        let mut allowed_transitions = Vec::new();

        for (i, e) in events.iter().enumerate() {
            let session = DirectedSession::new(e.source(), e.destination());
            *per_session.entry(session).or_insert(0) += 1;
            if seen.insert(session) {
                allowed_transitions.push(i);
            }
        }

        let max_msgs_per_directed_session = per_session.values().copied().max().unwrap_or(0);

        Self { events, max_msgs_per_directed_session, allowed_transitions }
    }

    /// Replace the simulator's current FIFO with a deep copy of this snapshot's events, in order.
    pub fn inject<S>(&self, sim: &mut S)
    where
        S: Simulator<Event = E>,
    {
        sim.fifo_replace(self.events.clone());
    }

    /// Total number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if there are no pending events at all.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The maximum, over all ordered (src,dst) pairs present, of how many events belong to that
    /// pair.
    pub fn max_msgs_per_directed_session(&self) -> usize {
        self.max_msgs_per_directed_session
    }

    /// Number of distinct ordered (src,dst) pairs present.
    pub fn oriented_session_count(&self) -> usize {
        self.allowed_transitions.len()
    }

    /// Indices into the FIFO eligible to be delivered next: the first event of each distinct
    /// ordered (src,dst) session, in order of first appearance.
    pub fn allowed_transitions(&self) -> &[usize] {
        &self.allowed_transitions
    }

    /// The event at FIFO position `i`.
    pub fn event(&self, i: usize) -> &E {
        &self.events[i]
    }

    /// Two queue snapshots are equivalent iff they have the same event count, the same
    /// `max_msgs_per_directed_session`, and for every directed session the FIFO sub-sequence of
    /// its events (in order) is pairwise equivalent. Global interleaving between distinct
    /// sessions is not part of identity.
    pub fn equivalent(a: &Self, b: &Self) -> bool {
        if a.events.len() != b.events.len() {
            return false;
        }
        if a.max_msgs_per_directed_session != b.max_msgs_per_directed_session {
            return false;
        }

        let mut visited_a = vec![false; a.events.len()];
        let mut visited_b = vec![false; b.events.len()];

        for i in 0..a.events.len() {
            if visited_a[i] {
                continue;
            }
            let session = DirectedSession::new(a.events[i].source(), a.events[i].destination());

            // Find the first unvisited event in `b` belonging to the same session.
            let start_b = match b
                .events
                .iter()
                .enumerate()
                .find(|(j, e)| !visited_b[*j] && DirectedSession::new(e.source(), e.destination()) == session)
            {
                Some((j, _)) => j,
                None => return false,
            };

            // Walk both snapshots forward through the rest of this session in lockstep.
            let mut ai = i;
            let mut bi = start_b;
            loop {
                if !a.events[ai].payload_equivalent(&b.events[bi]) {
                    return false;
                }
                visited_a[ai] = true;
                visited_b[bi] = true;

                let next_a = ((ai + 1)..a.events.len())
                    .find(|&k| DirectedSession::new(a.events[k].source(), a.events[k].destination()) == session);
                let next_b = ((bi + 1)..b.events.len())
                    .find(|&k| DirectedSession::new(b.events[k].source(), b.events[k].destination()) == session);

                match (next_a, next_b) {
                    (Some(na), Some(nb)) => {
                        ai = na;
                        bi = nb;
                    }
                    (None, None) => break,
                    _ => return false,
                }
            }
        }

        visited_a.into_iter().all(|v| v) && visited_b.into_iter().all(|v| v)
    }
}
