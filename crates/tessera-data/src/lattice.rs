//! Join-semilattice used for the proxy's merge order
//!
//! `join` must be commutative, associative and idempotent, with `bottom`
//! as its identity. Any state with such a join converges no matter the
//! order in which replicas' writes reach the hub.

pub trait Lattice: Clone + PartialEq {
    /// Identity for `join`: the state before any write
    fn bottom() -> Self;

    fn join(&self, other: &Self) -> Self;

    fn join_assign(&mut self, other: &Self) {
        *self = self.join(other);
    }
}
