//! FIB driver contract and reconciler (spec §4.6, §6.2).

pub mod driver;
pub mod reconciler;

pub use driver::{FibAckResult, FibDriver, FibErrorCode, FibOp, FibRoute, Family, RouteType};
pub use reconciler::FibReconciler;
