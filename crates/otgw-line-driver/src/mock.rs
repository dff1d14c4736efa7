// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory `LineDriver` for host-side tests. Scripted responses are
//! pushed ahead of time; `transmit` just records what was sent and
//! `receive` pops the next scripted response.

use std::collections::VecDeque;

use crate::{LineDriver, RecvError};

/// What a scripted `receive()` call should produce.
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    /// Return this 64-bit line word, as if it arrived from the bus.
    Word(u64),
    /// Behave as if the deadline elapsed with no start edge.
    Timeout,
    /// The backend itself faulted.
    Fault,
}

/// `transmit` never fails on the mock backend; this is its infallible
/// (but still named, for parity with real backends) error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

impl core::fmt::Display for MockFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "mock line driver fault")
    }
}
impl std::error::Error for MockFault {}

#[derive(Debug, Default)]
pub struct MockLineDriver {
    responses: VecDeque<Scripted>,
    transmitted: Vec<u64>,
}

impl MockLineDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the response the next `receive()` call will return. Exchanges
    /// consume exactly one scripted response per call; an empty queue
    /// defaults to `Timeout`, matching "no start edge before the deadline".
    pub fn push_response(&mut self, response: Scripted) -> &mut Self {
        self.responses.push_back(response);
        self
    }

    /// All words handed to `transmit` so far, oldest first.
    pub fn transmitted(&self) -> &[u64] {
        &self.transmitted
    }
}

impl LineDriver for MockLineDriver {
    type Error = MockFault;

    fn transmit(&mut self, word: u64) -> Result<(), Self::Error> {
        self.transmitted.push(word);
        Ok(())
    }

    fn receive(&mut self, _deadline_ms: u32) -> Result<u64, RecvError<Self::Error>> {
        match self.responses.pop_front().unwrap_or(Scripted::Timeout) {
            Scripted::Word(word) => Ok(word),
            Scripted::Timeout => Err(RecvError::Timeout),
            Scripted::Fault => Err(RecvError::Driver(MockFault)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_transmitted_words() {
        let mut drv = MockLineDriver::new();
        drv.transmit(0xdead_beef).unwrap();
        drv.transmit(0x1234_5678).unwrap();
        assert_eq!(drv.transmitted(), &[0xdead_beef, 0x1234_5678]);
    }

    #[test]
    fn defaults_to_timeout_when_nothing_scripted() {
        let mut drv = MockLineDriver::new();
        assert!(matches!(drv.receive(100), Err(RecvError::Timeout)));
    }

    #[test]
    fn returns_scripted_responses_in_order() {
        let mut drv = MockLineDriver::new();
        drv.push_response(Scripted::Word(0xaa)).push_response(Scripted::Timeout);
        assert_eq!(drv.receive(100).unwrap(), 0xaa);
        assert!(matches!(drv.receive(100), Err(RecvError::Timeout)));
    }
}
