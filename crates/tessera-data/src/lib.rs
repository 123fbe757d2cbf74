//! Tessera Data - replicated data types for proxy-managed entities
//!
//! Each variant records local changes as a pending delta. The runtime takes
//! that delta once per command turn and ships it to the proxy, and applies
//! the deltas the proxy sends back. Conflict resolution happens at the
//! proxy; [`merge`] holds the ordering it uses for registers.

pub mod counter;
pub mod data;
pub mod delta;
pub mod entity;
pub mod error;
pub mod flag;
pub mod lattice;
pub mod map;
pub mod merge;
pub mod register;
pub mod set;

pub use counter::ReplicatedCounter;
pub use data::{AnyReplicatedData, DataKind, ReplicatedData};
pub use delta::{
    Clock, CounterDelta, FlagDelta, MapDelta, MapEntryDelta, RegisterDelta, ReplicatedDelta, SetDelta,
};
pub use entity::EntityState;
pub use error::{DataError, Result};
pub use flag::ReplicatedFlag;
pub use lattice::Lattice;
pub use map::ReplicatedMap;
pub use merge::{resolve_clock, LwwStamp, ResolvedRegister};
pub use register::ReplicatedRegister;
pub use set::ReplicatedSet;
