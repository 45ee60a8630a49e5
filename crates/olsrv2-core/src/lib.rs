//! OLSRv2/NHDP mesh routing core for SONiC.
//!
//! This crate implements an IPv4/IPv6 mesh routing daemon combining NHDP
//! (RFC 6130) neighborhood discovery with OLSRv2 (RFC 7181) topology
//! dissemination and route computation, plus a DLEP-style link-layer
//! information base for metric-aware MPR selection. It owns protocol
//! state and decision-making only; wire encoding/decoding, netlink FIB
//! installation, and transport sockets are external collaborators this
//! crate talks to through narrow trait boundaries ([`wire`], [`fib`]).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   HELLO    ┌────────────┐          ┌────────────┐
//! │  Codec/I/O  │───────────▶│ NHDP Engine│─────────▶│  NHDP DB   │
//! │ (external)  │            └────────────┘          └─────┬──────┘
//! │             │  TC (via DupSet)  ┌────────────┐          │
//! │             │──────────────────▶│  TC Engine │──▶ TopologyDb
//! └──────┬──────┘                   └────────────┘          │
//!        │                                                   ▼
//!        │              ┌──────────┐   dirty bit        ┌─────────┐
//!        └─────ACKs─────│   Fib    │◀────────────────────│ Router  │
//!                       │Reconciler│                     │(Dijkstra)│
//!                        └────┬─────┘                     └─────────┘
//!                             ▼
//!                        FibDriver (external)
//! ```
//!
//! [`core::Core`] owns every subsystem and sequences this data flow per
//! the single-threaded cooperative event loop model; the binary target
//! drives it with `tokio::select!` over timers, never by spawning
//! mutating worker tasks.

pub mod addr;
pub mod config;
pub mod core;
pub mod domain;
pub mod dupset;
pub mod error;
pub mod fib;
pub mod iface;
pub mod l2ib;
pub mod metric;
pub mod mpr;
pub mod nhdp;
pub mod router;
pub mod serial;
pub mod snapshot;
pub mod topology;
pub mod wire;

pub use config::ConfigSet;
pub use core::Core;
pub use error::{CoreError, Result};
