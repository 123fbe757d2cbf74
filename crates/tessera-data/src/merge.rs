//! Proxy-side ordering of register writes
//!
//! Replicas never resolve conflicts; the proxy does, and this module is the
//! proxy's half of the contract. A write is stamped with its resolved clock
//! and the address of the node that sent it, and the winner is the write
//! with the strictly greater clock, or on a tie, the lowest node address.

use crate::delta::{Clock, RegisterDelta, ReplicatedDelta};
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tessera_any::Envelope;

/// Resolve the clock the proxy stamps on a write.
///
/// `now` is the proxy's wall clock and `current` the clock of the write
/// currently held, if any. `custom` is only read for custom clocks.
pub fn resolve_clock(clock: Clock, custom: i64, now: i64, current: Option<i64>) -> i64 {
    match clock {
        Clock::Default => now,
        Clock::Reverse => now.saturating_neg(),
        Clock::Custom => custom,
        Clock::CustomAutoIncrement => match current {
            Some(current) if custom <= current => current.saturating_add(1),
            _ => custom,
        },
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LwwStamp {
    pub clock: i64,
    pub node: String,
}

impl LwwStamp {
    pub fn new(clock: i64, node: impl Into<String>) -> Self {
        Self {
            clock,
            node: node.into(),
        }
    }

    pub fn wins_over(&self, other: &Self) -> bool {
        match self.clock.cmp(&other.clock) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.node < other.node,
        }
    }
}

/// The write a proxy currently holds for one register.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRegister {
    write: Option<(LwwStamp, Envelope)>,
}

impl ResolvedRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_write(stamp: LwwStamp, value: Envelope) -> Self {
        Self {
            write: Some((stamp, value)),
        }
    }

    pub fn value(&self) -> Option<&Envelope> {
        self.write.as_ref().map(|(_, value)| value)
    }

    pub fn stamp(&self) -> Option<&LwwStamp> {
        self.write.as_ref().map(|(stamp, _)| stamp)
    }

    /// Stamp a replica's write and merge it in.
    ///
    /// Returns true when the write became the held value.
    pub fn accept(&mut self, node: &str, delta: &RegisterDelta, now: i64) -> bool {
        let current = self.stamp().map(|stamp| stamp.clock);
        let clock = resolve_clock(delta.clock, delta.custom_clock_value, now, current);
        let incoming = Self::from_write(LwwStamp::new(clock, node), delta.value.clone());

        self.join_assign(&incoming);
        self == &incoming
    }

    /// The delta replicas apply to adopt the held value
    pub fn to_delta(&self) -> Option<ReplicatedDelta> {
        self.value()
            .map(|value| ReplicatedDelta::Register(RegisterDelta::new(value.clone(), Clock::Default, 0)))
    }
}

impl Lattice for ResolvedRegister {
    fn bottom() -> Self {
        Self::default()
    }

    /// Keep the winning write; identical stamps fall back to the larger
    /// envelope so the result never depends on argument order.
    fn join(&self, other: &Self) -> Self {
        let winner = match (&self.write, &other.write) {
            (None, _) => other,
            (_, None) => self,
            (Some((a, a_value)), Some((b, b_value))) => {
                if a.wins_over(b) {
                    self
                } else if b.wins_over(a) {
                    other
                } else if a_value >= b_value {
                    self
                } else {
                    other
                }
            }
        };
        winner.clone()
    }
}
