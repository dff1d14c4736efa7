// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The OpenTherm exchange engine: one request/response cycle, classified
//! into the eight outcomes spec.md §3 enumerates, plus a bounded retry
//! wrapper that only retries the transient ones.
//!
//! This crate owns the one invariant the rest of the stack leans on (I1: at
//! most one exchange on the bus at a time) structurally, by being the only
//! thing that ever calls [`LineDriver::transmit`]/[`LineDriver::receive`].
//! `otgw-catalog` never touches a `LineDriver` directly.

#![no_std]

use otgw_codec::{decode_frame, decode_manchester, encode_frame, encode_manchester, FrameParts, MsgType};
use otgw_line_driver::{LineDriver, RecvError};

/// The hardware stage inverts TX polarity but not RX; `otgw-line-driver`'s
/// backends read/drive raw pin state, so this is the one place that bakes
/// in the asymmetry spec.md §4.B calls out.
const TX_INVERT: bool = true;
const RX_INVERT: bool = false;

/// OpenTherm's minimum response window: the secondary may not reply for up
/// to this long after the primary's stop bit.
pub const MIN_RESPONSE_WINDOW_MS: u32 = 20;
/// Default per-exchange receive deadline. spec.md §4.C notes the OpenTherm
/// spec bounds this 20-800ms but tolerating up to 1s is pragmatic.
pub const DEFAULT_TIMEOUT_MS: u32 = 1_000;

/// Why an exchange failed to produce a usable response, covering every
/// failure mode in spec.md §3's outcome enumeration except ACK-OK (which is
/// the `Ok` value of [`exchange`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeError<E> {
    /// No start edge arrived before the deadline.
    Timeout,
    /// A 2-bit line group was neither `01` nor `10`.
    Manchester { bit_index: u8 },
    /// The 32-bit frame's popcount was odd.
    Parity,
    /// The response's Data-ID didn't match the request's (I2 violation).
    WrongAckId { expected: u8, got: u8 },
    /// The response's msg_type wasn't the ACK corresponding to the
    /// request's kind (and wasn't DATA-INVALID/UNKNOWN-DATAID either).
    UnexpectedMsgType { got: MsgType },
    /// Legitimate slave response: the secondary rejected the request.
    /// Terminal, never retried.
    DataInvalid,
    /// Legitimate slave response: the secondary doesn't recognize the
    /// Data-ID. Terminal, never retried.
    UnknownDataId,
    /// The line driver itself faulted (bus fault, DMA error, ...).
    Driver(E),
}

impl<E: core::fmt::Display> core::fmt::Display for ExchangeError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for a response"),
            Self::Manchester { bit_index } => {
                write!(f, "manchester decoding error at bit {bit_index}")
            }
            Self::Parity => write!(f, "parity bit error"),
            Self::WrongAckId { expected, got } => {
                write!(f, "response data-id {got} did not match request {expected}")
            }
            Self::UnexpectedMsgType { got } => {
                write!(f, "unexpected response msg_type {got:?}")
            }
            Self::DataInvalid => write!(f, "secondary reported DATA-INVALID"),
            Self::UnknownDataId => write!(f, "secondary reported UNKNOWN-DATAID"),
            Self::Driver(e) => write!(f, "line driver fault: {e}"),
        }
    }
}

impl<E: core::fmt::Display + core::fmt::Debug> core::error::Error for ExchangeError<E> {}

impl<E> From<RecvError<E>> for ExchangeError<E> {
    fn from(err: RecvError<E>) -> Self {
        match err {
            RecvError::Timeout => Self::Timeout,
            RecvError::Driver(e) => Self::Driver(e),
        }
    }
}

impl<E> ExchangeError<E> {
    /// Whether [`exchange_with_retry`] should try again after this failure.
    /// Only the transient/timing/framing faults qualify; the two legitimate
    /// slave responses (DATA-INVALID, UNKNOWN-DATAID) are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Manchester { .. }
                | Self::Parity
                | Self::WrongAckId { .. }
                | Self::UnexpectedMsgType { .. }
                | Self::Driver(_)
        )
    }
}

/// The ACK msg_type a request of the given kind expects back.
fn expected_ack(sent: MsgType) -> Option<MsgType> {
    match sent {
        MsgType::ReadData => Some(MsgType::ReadAck),
        MsgType::WriteData => Some(MsgType::WriteAck),
        _ => None,
    }
}

/// Runs one request/response exchange over `bus`: packs `(msg_type,
/// data_id, value)`, transmits it, waits up to `timeout_ms` for a reply,
/// and classifies the result per spec.md §4.C steps 5-7.
///
/// Callers are responsible for the 20ms minimum response window between
/// transmit completion and arming the receiver (step 3); `LineDriver`
/// implementations that can't distinguish "TX done" from "ready to listen"
/// should bake that wait into their own `transmit`.
pub fn exchange<D: LineDriver>(
    bus: &mut D,
    msg_type: MsgType,
    data_id: u8,
    value: u16,
    timeout_ms: u32,
) -> Result<FrameParts, ExchangeError<D::Error>> {
    let frame = encode_frame(msg_type, data_id, value);
    let word = encode_manchester(frame, TX_INVERT);

    bus.transmit(word).map_err(ExchangeError::Driver)?;

    let recv_word = bus.receive(timeout_ms)?;

    let recv_frame = decode_manchester(recv_word, RX_INVERT)
        .map_err(|e| ExchangeError::Manchester { bit_index: e.bit_index })?;
    let parts = decode_frame(recv_frame).map_err(|_| ExchangeError::Parity)?;

    if parts.data_id != data_id {
        return Err(ExchangeError::WrongAckId {
            expected: data_id,
            got: parts.data_id,
        });
    }

    match parts.msg_type {
        MsgType::DataInvalid => Err(ExchangeError::DataInvalid),
        MsgType::UnknownDataId => Err(ExchangeError::UnknownDataId),
        got if Some(got) == expected_ack(msg_type) => Ok(parts),
        got => Err(ExchangeError::UnexpectedMsgType { got }),
    }
}

/// Wraps [`exchange`] with bounded retry: only [`ExchangeError::is_retryable`]
/// failures are retried, up to `max_retries` additional attempts after the
/// first. DATA-INVALID and UNKNOWN-DATAID are returned immediately, per
/// spec.md §4.C ("these are legitimate slave responses ... MUST NOT be
/// retried").
pub fn exchange_with_retry<D: LineDriver>(
    bus: &mut D,
    msg_type: MsgType,
    data_id: u8,
    value: u16,
    timeout_ms: u32,
    max_retries: u32,
) -> Result<FrameParts, ExchangeError<D::Error>> {
    retry(max_retries, || exchange(bus, msg_type, data_id, value, timeout_ms))
}

/// The retry policy decoupled from the transport: calls `attempt` up to
/// `max_retries + 1` times, stopping early on success or on a terminal
/// (non-retryable) error. Generalized out of [`exchange_with_retry`] so it
/// can be exercised (P5) without a real or mock bus at all.
pub fn retry<T, E>(max_retries: u32, mut attempt: impl FnMut() -> Result<T, ExchangeError<E>>) -> Result<T, ExchangeError<E>> {
    let mut last_err = None;
    for _ in 0..=max_retries {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.expect("max_retries loop always runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otgw_line_driver::mock::{MockFault, MockLineDriver, Scripted};

    fn ack_word(msg_type: MsgType, data_id: u8, value: u16) -> u64 {
        let frame = encode_frame(msg_type, data_id, value);
        encode_manchester(frame, RX_INVERT)
    }

    #[test]
    fn successful_read_round_trips() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Word(ack_word(MsgType::ReadAck, 0, 0x00ff)));
        let parts = exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS).unwrap();
        assert_eq!(parts.data_id, 0);
        assert_eq!(parts.value, 0x00ff);
        assert_eq!(bus.transmitted().len(), 1);
    }

    #[test]
    fn timeout_is_surfaced() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Timeout);
        assert_eq!(
            exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS),
            Err(ExchangeError::Timeout)
        );
    }

    #[test]
    fn wrong_data_id_is_rejected() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Word(ack_word(MsgType::ReadAck, 5, 0)));
        assert_eq!(
            exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS),
            Err(ExchangeError::WrongAckId { expected: 0, got: 5 })
        );
    }

    #[test]
    fn data_invalid_is_not_retried() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Word(ack_word(MsgType::DataInvalid, 1, 0)));
        let mut calls = 0;
        let result = retry(5, || {
            calls += 1;
            exchange(&mut bus, MsgType::WriteData, 1, 0x3200, DEFAULT_TIMEOUT_MS)
        });
        assert_eq!(result, Err(ExchangeError::DataInvalid));
        assert_eq!(calls, 1);
    }

    #[test]
    fn unknown_data_id_is_not_retried() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Word(ack_word(MsgType::UnknownDataId, 35, 0)));
        let mut calls = 0;
        let result = retry(5, || {
            calls += 1;
            exchange(&mut bus, MsgType::ReadData, 35, 0, DEFAULT_TIMEOUT_MS)
        });
        assert_eq!(result, Err(ExchangeError::UnknownDataId));
        assert_eq!(calls, 1);
    }

    #[test]
    fn transient_failures_retry_up_to_bound() {
        let mut bus = MockLineDriver::new();
        for _ in 0..3 {
            bus.push_response(Scripted::Timeout);
        }
        let mut calls = 0;
        let result = retry(2, || {
            calls += 1;
            exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS)
        });
        assert_eq!(result, Err(ExchangeError::Timeout));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_stops_early_on_success() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Timeout);
        bus.push_response(Scripted::Word(ack_word(MsgType::ReadAck, 0, 7)));
        let mut calls = 0;
        let result = retry(5, || {
            calls += 1;
            exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS)
        });
        assert_eq!(result.unwrap().value, 7);
        assert_eq!(calls, 2);
    }

    #[test]
    fn driver_fault_is_retryable() {
        let mut bus = MockLineDriver::new();
        bus.push_response(Scripted::Fault);
        bus.push_response(Scripted::Word(ack_word(MsgType::ReadAck, 0, 1)));
        let result: Result<FrameParts, ExchangeError<MockFault>> = retry(1, || {
            exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS)
        });
        assert!(result.is_ok());
    }

    #[test]
    fn manchester_corruption_is_surfaced() {
        let mut bus = MockLineDriver::new();
        // Corrupt the first 2-bit group of an otherwise valid ack word.
        let word = ack_word(MsgType::ReadAck, 0, 0) & 0x3fff_ffff_ffff_ffff;
        bus.push_response(Scripted::Word(word));
        assert_eq!(
            exchange(&mut bus, MsgType::ReadData, 0, 0, DEFAULT_TIMEOUT_MS),
            Err(ExchangeError::Manchester { bit_index: 0 })
        );
    }
}
