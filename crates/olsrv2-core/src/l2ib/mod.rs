//! The L2 information base (spec §3.2, §4.1): a multi-origin,
//! priority-arbitrated store of per-interface and per-neighbor link-layer
//! data, shared by NHDP, the DLEP-style reporting subsystem, and static
//! configuration.

mod cell;
mod neigh;
mod net;
mod origin;
mod store;

pub use cell::{CellValue, DataCell};
pub use neigh::{Destination, NeighborKey, NeighborRecord};
pub use net::{NetRecord, NetType};
pub use origin::{Origin, OriginPriority};
pub use store::{L2ib, L2ibEvent};
