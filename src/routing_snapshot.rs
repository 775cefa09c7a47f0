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

//! Deep copy and comparison of every router's forwarding table, local RIB, and adjacency RIBs.

use crate::collab::{FwEntryValue, Network, PeerSessionSnapshot, RouteValue};
use crate::error::Error;
use crate::types::{Prefix, RouterId};

/// Everything captured from one router: its forwarding table, its local RIB, and its peer
/// sessions, each peer kept in the router's configured order.
#[derive(Debug, Clone)]
pub struct RouterSnapshot<Rt: RouteValue, Fw: FwEntryValue> {
    router: RouterId,
    forwarding_table: Vec<(Prefix, Vec<Fw>)>,
    local_rib: Vec<(Prefix, Rt)>,
    peers: Vec<PeerSessionSnapshot<Rt>>,
}

impl<Rt: RouteValue, Fw: FwEntryValue> RouterSnapshot<Rt, Fw> {
    /// The router this snapshot was captured from.
    pub fn router(&self) -> RouterId {
        self.router
    }
    /// The router's captured forwarding table.
    pub fn forwarding_table(&self) -> &[(Prefix, Vec<Fw>)] {
        &self.forwarding_table
    }
    /// The router's captured local RIB.
    pub fn local_rib(&self) -> &[(Prefix, Rt)] {
        &self.local_rib
    }
    /// The router's captured peer sessions, in configured order.
    pub fn peers(&self) -> &[PeerSessionSnapshot<Rt>] {
        &self.peers
    }

    fn equivalent(a: &Self, b: &Self) -> bool {
        if a.router != b.router {
            return false;
        }
        if !fw_tables_equivalent(&a.forwarding_table, &b.forwarding_table) {
            return false;
        }
        if !ribs_equivalent(&a.local_rib, &b.local_rib) {
            return false;
        }
        if a.peers.len() != b.peers.len() {
            return false;
        }
        a.peers.iter().zip(b.peers.iter()).all(|(pa, pb)| pa.session_equivalent(pb))
    }
}

fn fw_tables_equivalent<Fw: FwEntryValue>(
    a: &[(Prefix, Vec<Fw>)],
    b: &[(Prefix, Vec<Fw>)],
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|((pa, ea), (pb, eb))| {
            pa == pb
                && ea.len() == eb.len()
                && ea.iter().zip(eb.iter()).all(|(x, y)| x.fw_entry_equivalent(y))
        })
}

fn ribs_equivalent<Rt: RouteValue>(a: &[(Prefix, Rt)], b: &[(Prefix, Rt)]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((pa, ra), (pb, rb))| pa == pb && ra.route_equivalent(rb))
}

/// A deep copy of the routing state of every router in the network, in the fixed router-id order
/// established when the owning graph was created.
#[derive(Debug, Clone)]
pub struct RoutingSnapshot<Rt: RouteValue, Fw: FwEntryValue> {
    routers: Vec<RouterSnapshot<Rt, Fw>>,
}

impl<Rt: RouteValue, Fw: FwEntryValue> RoutingSnapshot<Rt, Fw> {
    /// Every captured router snapshot, in the fixed router order.
    pub fn routers(&self) -> &[RouterSnapshot<Rt, Fw>] {
        &self.routers
    }

    /// Deep-copy every router's routing state from the network, in `router_order`.
    pub fn capture<N>(net: &N, router_order: &[RouterId]) -> Self
    where
        N: Network<Route = Rt, FwEntry = Fw>,
    {
        let routers = router_order
            .iter()
            .map(|&router| RouterSnapshot {
                router,
                forwarding_table: net.forwarding_table(router),
                local_rib: net.local_rib(router),
                peers: net.peer_sessions(router),
            })
            .collect();
        Self { routers }
    }

    /// Restore every router's forwarding table, local RIB, and peer sessions from this snapshot.
    /// Fails with [`Error::IncompatibleTopology`] if any router in the snapshot is no longer
    /// present in the network with a matching peer list.
    pub fn inject<N, StepError>(&self, net: &mut N) -> Result<(), Error<StepError>>
    where
        N: Network<Route = Rt, FwEntry = Fw>,
        StepError: std::error::Error + 'static,
    {
        for r in &self.routers {
            net.set_forwarding_table(r.router, r.forwarding_table.clone())
                .map_err(|_| Error::IncompatibleTopology)?;
            net.set_local_rib(r.router, r.local_rib.clone())
                .map_err(|_| Error::IncompatibleTopology)?;
            net.set_peer_sessions(r.router, r.peers.clone())
                .map_err(|_| Error::IncompatibleTopology)?;
        }
        Ok(())
    }

    /// Two routing snapshots are equivalent iff every router, compared in the fixed router order,
    /// has an equivalent forwarding table, local RIB, and peer session list. Session sequence
    /// counters never participate in this comparison.
    pub fn equivalent(a: &Self, b: &Self) -> bool {
        a.routers.len() == b.routers.len()
            && a.routers
                .iter()
                .zip(b.routers.iter())
                .all(|(ra, rb)| RouterSnapshot::equivalent(ra, rb))
    }
}
