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

#![deny(missing_docs)]

//! # bgp-tracer
//!
//! A deterministic state-space explorer for a simulated BGP routing system. Given an external
//! discrete-event simulator and the network it drives, this crate builds the graph of every
//! reachable global configuration reachable by delivering pending BGP messages in every distinct
//! order, deduplicating configurations that are structurally equivalent and exposing reachability
//! and cycle analyses over the resulting graph.
//!
//! This crate does not implement the BGP decision process, network topology, or the underlying
//! discrete-event simulator itself: those are supplied by a binding layer through the
//! [`Simulator`](collab::Simulator) and [`Network`](collab::Network) traits in [`collab`]. It also
//! has no CLI, no scripting surface, and no DOT/HTML/image exporter; [`export`] only produces
//! `serde`-serializable structured values for an external renderer to consume.
//!
//! ## Structure
//!
//! - **[`collab`]**: the collaborator interfaces (`Simulator`, `Network`, `TracerEvent`,
//!   `RouteValue`, `FwEntryValue`) through which the tracer reaches the BGP decision process, the
//!   network, and the simulator without reimplementing any of them.
//! - **[`types`]**: small shared identifiers (`RouterId`, `StateId`, `Prefix`, `DirectedSession`).
//! - **[`queue_snapshot`]**: deep copy and canonical comparison of the pending-event FIFO.
//! - **[`routing_snapshot`]**: deep copy and comparison of every router's routing tables.
//! - **[`state`]**: one graph node: a queue snapshot, a routing snapshot, and its flags.
//! - **[`graph`]**: the arena owning every state ever attached, plus reachability marking and
//!   cycle detection.
//! - **[`tracer`]**: the driver that injects a snapshot, steps the simulator by one event,
//!   captures the result, and reconciles it with the graph.
//! - **[`export`]**: read-only, serializable rendering of a graph or state for an external
//!   renderer.
//! - **[`config`]**: tunables governing how large a graph a [`Tracer`](tracer::Tracer) may build.
//! - **[`error`]**: the error and warning types surfaced by the core algorithms.
//!
//! ## Usage
//!
//! ```ignore
//! use bgp_tracer::config::TracerConfig;
//! use bgp_tracer::tracer::Tracer;
//!
//! // `sim` implements `Simulator`, `net` implements `Network`; both are supplied by the binding
//! // layer, not by this crate.
//! let mut tracer = Tracer::start(&sim, &net, TracerConfig::default());
//! let report = tracer.trace_whole_graph(&mut sim, &mut net);
//! println!("{:#?}", report);
//! ```

pub mod collab;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod queue_snapshot;
pub mod routing_snapshot;
pub mod state;
mod test;
pub mod tracer;
pub mod types;

pub use error::{Error, Warning};
pub use tracer::{TraceOutcome, Tracer, WholeGraphReport};
