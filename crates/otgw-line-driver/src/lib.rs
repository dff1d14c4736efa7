// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The OpenTherm physical-layer capability: drive one GPIO for TX and
//! sample one for RX at OpenTherm bit timing, delivering 64-bit raw
//! Manchester words to and from the exchange engine.
//!
//! Following the teacher repository's "one typed API, several backends"
//! convention (e.g. `drv-i2c-api` fronting several `drv-*-i2c` server
//! implementations), this crate defines only the [`LineDriver`] contract.
//! Two backends implement it:
//!
//! - [`mock::MockLineDriver`] (feature `mock`, default-on): an in-memory
//!   loopback for host-side tests, per the design note that a pure
//!   in-memory backend should simply loop TX into RX while optionally
//!   injecting faults.
//! - [`rp2040::Rp2040LineDriver`] (feature `rp2040`): the real PIO-driven
//!   backend for the target microcontroller.

#![cfg_attr(not(any(test, feature = "mock")), no_std)]

/// Why a receive attempt failed to produce a 64-bit line word.
#[derive(Debug)]
pub enum RecvError<E> {
    /// No start edge arrived before the deadline.
    Timeout,
    /// The backend itself faulted (a stuck bus, a DMA error, ...).
    Driver(E),
}

/// The physical-layer capability the exchange engine drives. Transmission
/// always carries a pre-Manchester-encoded 64-bit word and blocks until the
/// full 34-bit line sequence (start bit, 32 data bits, stop bit) has been
/// emitted; receipt waits for a start edge and returns the 64-bit word
/// spanning the 32 data bits, or reports `TIMEOUT`.
///
/// Implementations own draining stale RX data and re-arming the RX state
/// machine between exchanges; callers never see that bookkeeping.
pub trait LineDriver {
    type Error;

    fn transmit(&mut self, word: u64) -> Result<(), Self::Error>;

    fn receive(&mut self, deadline_ms: u32) -> Result<u64, RecvError<Self::Error>>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "rp2040")]
pub mod rp2040;
