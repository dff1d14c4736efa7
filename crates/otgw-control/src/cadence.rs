// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A small timer multiplexer for the three STEADY cadences (mandatory,
//! detail, write-back), generalized from `lib/multitimer`'s enum-keyed
//! timer table. The teacher's version drives Hubris `sys_get_timer`/
//! `sys_set_timer` syscalls under a notification bit; this one is driven by
//! an injected [`Clock`] instead, since nothing here runs under the Hubris
//! kernel. Timestamps compared to a monotonic clock, drift bounded but not
//! corrected — no catch-up bursts, per spec.md §4.E.

use enum_map::{Enum, EnumMap};

/// A point in time, milliseconds since some arbitrary epoch fixed at
/// startup. The control loop and its tests never care what the epoch is,
/// only that it's monotonic.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum CadenceKind {
    /// Mandatory status/TSet cycle, spec.md I5: no less often than 1/s.
    Mandatory,
    /// Detail sensor poll, ~10-60s.
    Detail,
    /// Settings write-back, ~10-60s.
    WriteBack,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    period_ms: u64,
    next_due_ms: u64,
}

/// Tracks when each cadence last fired and decides, on each poll, whether
/// it's due again. Cadences fire immediately on the first poll.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    slots: EnumMap<CadenceKind, Slot>,
}

impl Cadence {
    pub fn new(mandatory_ms: u64, detail_ms: u64, write_back_ms: u64) -> Self {
        let slot = |period_ms| Slot { period_ms, next_due_ms: 0 };
        Self {
            slots: EnumMap::from_array([
                slot(mandatory_ms),
                slot(detail_ms),
                slot(write_back_ms),
            ]),
        }
    }

    /// Returns `true` at most once per `period_ms` for `which`, advancing
    /// its next deadline from `now_ms` (not from the missed deadline) so a
    /// long stall doesn't trigger a catch-up burst.
    pub fn poll(&mut self, which: CadenceKind, now_ms: u64) -> bool {
        let slot = &mut self.slots[which];
        if now_ms >= slot.next_due_ms {
            slot.next_due_ms = now_ms + slot.period_ms;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_immediately_then_waits_a_full_period() {
        let mut c = Cadence::new(1000, 10_000, 10_000);
        assert!(c.poll(CadenceKind::Mandatory, 0));
        assert!(!c.poll(CadenceKind::Mandatory, 500));
        assert!(c.poll(CadenceKind::Mandatory, 1000));
    }

    #[test]
    fn cadences_are_independent() {
        let mut c = Cadence::new(1000, 10_000, 10_000);
        assert!(c.poll(CadenceKind::Mandatory, 0));
        assert!(c.poll(CadenceKind::Detail, 0));
        assert!(!c.poll(CadenceKind::Detail, 1000));
        assert!(c.poll(CadenceKind::Mandatory, 1000));
    }

    #[test]
    fn long_stall_does_not_cause_catch_up_burst() {
        let mut c = Cadence::new(1000, 10_000, 10_000);
        assert!(c.poll(CadenceKind::Mandatory, 0));
        // Clock jumps forward 10s without polling in between.
        assert!(c.poll(CadenceKind::Mandatory, 10_000));
        // Next due is 11_000, not a backlog of 10 missed ticks.
        assert!(!c.poll(CadenceKind::Mandatory, 10_500));
        assert!(c.poll(CadenceKind::Mandatory, 11_000));
    }
}
