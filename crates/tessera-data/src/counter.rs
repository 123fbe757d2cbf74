//! Replicated Counter
//!
//! A signed counter. The proxy keeps the per-node PN-Counter state; the SDK
//! only tracks the net local change since the last flush and adds the net
//! changes the proxy reports.

use crate::data::{malformed, DataKind, ReplicatedData};
use crate::delta::{CounterDelta, ReplicatedDelta};
use crate::error::Result;
use std::fmt;
use tessera_any::AnySupport;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicatedCounter {
    value: i64,
    /// Net local change not yet flushed
    delta: i64,
}

impl ReplicatedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn increment(&mut self, amount: i64) -> &mut Self {
        self.value = self.value.saturating_add(amount);
        self.delta = self.delta.saturating_add(amount);
        self
    }

    pub fn decrement(&mut self, amount: i64) -> &mut Self {
        self.increment(amount.saturating_neg())
    }

    pub(crate) fn state_delta(&self) -> CounterDelta {
        CounterDelta { change: self.value }
    }
}

impl ReplicatedData for ReplicatedCounter {
    fn kind(&self) -> DataKind {
        DataKind::Counter
    }

    fn has_delta(&self) -> bool {
        self.delta != 0
    }

    fn reset_delta(&mut self) {
        self.delta = 0;
    }

    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta> {
        match std::mem::take(&mut self.delta) {
            0 => None,
            change => Some(ReplicatedDelta::Counter(CounterDelta { change })),
        }
    }

    /// Add the remote change; an unflushed local change stays pending since
    /// counter deltas commute.
    fn apply_delta(&mut self, delta: &ReplicatedDelta, _codec: &AnySupport) -> Result<()> {
        let ReplicatedDelta::Counter(CounterDelta { change }) = delta else {
            return Err(malformed(DataKind::Counter, delta));
        };
        self.value = self.value.saturating_add(*change);
        Ok(())
    }
}

impl fmt::Display for ReplicatedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", DataKind::Counter, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::FlagDelta;
    use crate::error::DataError;

    #[test]
    fn test_counter_basic_operations() {
        let mut counter = ReplicatedCounter::new();

        counter.increment(5);
        assert_eq!(counter.value(), 5);

        counter.decrement(2);
        assert_eq!(counter.value(), 3);

        counter.increment(3).decrement(1);
        assert_eq!(counter.value(), 5);
    }

    #[test]
    fn test_counter_delta_is_net_change() {
        let mut counter = ReplicatedCounter::new();
        counter.increment(10).decrement(4);

        assert_eq!(
            counter.get_and_reset_delta(),
            Some(ReplicatedDelta::Counter(CounterDelta { change: 6 }))
        );
        assert_eq!(counter.get_and_reset_delta(), None);
        assert_eq!(counter.value(), 6);
    }

    #[test]
    fn test_counter_changes_that_cancel_send_nothing() {
        let mut counter = ReplicatedCounter::new();
        counter.increment(3).decrement(3);
        assert!(!counter.has_delta());
        assert_eq!(counter.get_and_reset_delta(), None);
    }

    #[test]
    fn test_counter_apply_keeps_local_change() {
        let codec = AnySupport::default();
        let mut counter = ReplicatedCounter::new();
        counter.increment(5);

        counter
            .apply_delta(&ReplicatedDelta::Counter(CounterDelta { change: 3 }), &codec)
            .unwrap();

        assert_eq!(counter.value(), 8);
        assert_eq!(
            counter.get_and_reset_delta(),
            Some(ReplicatedDelta::Counter(CounterDelta { change: 5 }))
        );
    }

    #[test]
    fn test_counter_saturates() {
        let mut counter = ReplicatedCounter::new();
        counter.increment(i64::MAX).increment(1);
        assert_eq!(counter.value(), i64::MAX);

        let mut counter = ReplicatedCounter::new();
        counter.decrement(i64::MIN);
        assert_eq!(counter.value(), i64::MAX);
    }

    #[test]
    fn test_counter_rejects_foreign_delta() {
        let codec = AnySupport::default();
        let mut counter = ReplicatedCounter::new();
        let result = counter.apply_delta(&ReplicatedDelta::Flag(FlagDelta { value: true }), &codec);

        assert!(matches!(result, Err(DataError::MalformedDelta { .. })));
        assert_eq!(counter.value(), 0);
    }
}
