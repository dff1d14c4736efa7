// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RP2040 PIO backend: two programmable-I/O state machines bit-bang the
//! OpenTherm line at the timings spec.md §4.B requires, translating
//! `examples/original_source/opentherm_rp2.py`'s two MicroPython `rp2.asm_pio`
//! programs into PIO assembly embedded via `pio_proc::pio_asm!` — the
//! idiomatic way rp-hal consumers write PIO programs.
//!
//! TX runs its state machine at 4 kHz (250 µs/tick): each Manchester
//! half-bit is `out pins, 1` followed by a `nop`, two ticks, 500 µs. RX runs
//! at 60 kHz (~16.7 µs/tick) so a ~14-iteration busy-wait between edges is
//! about 650 µs, the per-bit resynchronization window spec.md calls for.
//!
//! The hardware stage inverts TX polarity (HIGH = logical 0); RX reads the
//! raw pin state. `otgw-exchange` accounts for this by passing
//! `invert = true` to the Manchester encoder and `invert = false` to the
//! decoder — the asymmetry lives entirely in that choice, not here.

use fugit::HertzU32;
use otgw_diag::{ringbuf_entry, Ringbuf};
use rp2040_hal::gpio::{FunctionPio0, Pin, PinId};
use rp2040_hal::pac;
use rp2040_hal::pio::{PIOBuilder, PIOExt, Running, ShiftDirection, StateMachine, Tx, SM0, SM1};
use rp2040_hal::Timer;

use crate::{LineDriver, RecvError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TraceEvent {
    TxStalled,
    RxTimedOut,
}

const TX_FREQ_HZ: u32 = 4_000;
const RX_FREQ_HZ: u32 = 60_000;

fn tx_program() -> pio::Program<32> {
    pio_proc::pio_asm!(
        ".wrap_target",
        "set x, 31",
        // Start bit (hardware-inverted: LOW means logical 1 on the wire).
        "set pins, 0",
        "nop",
        "set pins, 1",
        "nop",
        "bitloop:",
        "out pins, 1",
        "nop",
        "out pins, 1",
        "jmp x--, bitloop",
        // Stop bit.
        "set pins, 0",
        "nop",
        "set pins, 1",
        "nop",
        // Signal completion to the caller via the RX fifo of this SM.
        "in x, 32",
        "push",
        "irq wait 0",
        ".wrap",
    )
    .program
}

fn rx_program() -> pio::Program<32> {
    pio_proc::pio_asm!(
        ".wrap_target",
        "wait 1 pin 0",
        "wait 0 pin 0",
        "set x, 14",
        "jmp wait_for_bit_currently_0",
        "read_next_bit:",
        "in pins, 1",
        "set x, 14",
        "jmp pin, wait_for_bit_currently_1",
        "wait_for_bit_currently_0:",
        "nop",
        "jmp pin, read_next_bit",
        "jmp x--, wait_for_bit_currently_0",
        "jmp read_next_bit",
        "wait_for_bit_currently_1:",
        "jmp pin, still_1",
        "jmp read_next_bit",
        "still_1:",
        "jmp x--, wait_for_bit_currently_1",
        "jmp read_next_bit",
        ".wrap",
    )
    .program
}

/// Errors from the RP2040 PIO backend. `Bug` covers internal invariant
/// violations (a FIFO word arrived where none was expected); it should
/// never actually occur outside of a driver bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rp2040Error {
    TxFifoStall,
    Bug,
}

impl core::fmt::Display for Rp2040Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TxFifoStall => write!(f, "PIO TX state machine did not drain its FIFO"),
            Self::Bug => write!(f, "PIO line driver internal invariant violated"),
        }
    }
}

/// Drives the OpenTherm bus using PIO0's two state machines: SM0 for TX,
/// SM1 for RX. Initialized once at boot and never torn down, per spec.md
/// §3's lifecycle note that the line driver owns its state machines for
/// the entire process lifetime.
pub struct Rp2040LineDriver<TxPin: PinId, RxPin: PinId> {
    tx_sm: StateMachine<(pac::PIO0, SM0), Running>,
    tx_fifo_tx: Tx<(pac::PIO0, SM0)>,
    rx_sm: StateMachine<(pac::PIO0, SM1), Running>,
    timer: Timer,
    trace: Ringbuf<TraceEvent, 16>,
    _tx_pin: Pin<TxPin, FunctionPio0>,
    _rx_pin: Pin<RxPin, FunctionPio0>,
}

impl<TxPin: PinId, RxPin: PinId> Rp2040LineDriver<TxPin, RxPin> {
    /// Installs both PIO programs and starts both state machines. `sys_clk`
    /// is the PIO peripheral's input clock (normally 125 MHz on a stock
    /// Pico board); it is only used to compute the two clock dividers.
    /// `timer` is the board's already-running `rp2040_hal::Timer` (backed
    /// by the always-on `TIMER` peripheral); this driver reads it to time
    /// out `receive`'s deadline, so the caller must construct it once at
    /// boot and share it here rather than handing over a fresh one per
    /// call.
    pub fn new(
        pio: pac::PIO0,
        resets: &mut pac::RESETS,
        tx_pin: Pin<TxPin, FunctionPio0>,
        rx_pin: Pin<RxPin, FunctionPio0>,
        sys_clk: HertzU32,
        timer: Timer,
    ) -> Self {
        let (mut pio, sm0, sm1, _, _) = pio.split(resets);

        let tx_installed = pio.install(&tx_program()).unwrap();
        let (mut tx, tx_rx_fifo, tx_fifo_tx) = PIOBuilder::from_program(tx_installed)
            .set_pins(TxPin::DYN.num, 1)
            .out_pins(TxPin::DYN.num, 1)
            .clock_divisor_fixed_point(
                (sys_clk.to_Hz() / TX_FREQ_HZ) as u16,
                0,
            )
            .autopush(true)
            .autopull(true)
            .out_shift_direction(ShiftDirection::Left)
            .build(sm0);
        tx.set_pindirs([(TxPin::DYN.num, rp2040_hal::pio::PinDir::Output)]);
        drop(tx_rx_fifo);

        let rx_installed = pio.install(&rx_program()).unwrap();
        let (mut rx, _rx_rx_fifo, _rx_tx_fifo) = PIOBuilder::from_program(rx_installed)
            .in_pin_base(RxPin::DYN.num)
            .jmp_pin(RxPin::DYN.num)
            .clock_divisor_fixed_point(
                (sys_clk.to_Hz() / RX_FREQ_HZ) as u16,
                0,
            )
            .autopush(true)
            .in_shift_direction(ShiftDirection::Left)
            .build(sm1);
        rx.set_pindirs([(RxPin::DYN.num, rp2040_hal::pio::PinDir::Input)]);

        Self {
            tx_sm: tx.start(),
            tx_fifo_tx,
            rx_sm: rx.start(),
            timer,
            trace: Ringbuf::new(),
            _tx_pin: tx_pin,
            _rx_pin: rx_pin,
        }
    }

    /// Milliseconds elapsed since `timer` started, read from the RP2040's
    /// always-on microsecond timer (`TIMERAWL`). Wraps every ~71 minutes;
    /// `receive`'s deadlines are millisecond-scale, so that wrap is never
    /// observed in practice.
    fn millis(&self) -> u32 {
        self.timer.get_counter_low() / 1_000
    }
}

impl<TxPin: PinId, RxPin: PinId> LineDriver for Rp2040LineDriver<TxPin, RxPin> {
    type Error = Rp2040Error;

    fn transmit(&mut self, word: u64) -> Result<(), Self::Error> {
        // Drain anything the RX SM captured while we weren't listening,
        // per spec.md §4.B: "the RX buffer is drained ... to discard noise
        // captured during TX".
        while self.rx_sm.rx_fifo().next().is_some() {}

        if !self.tx_fifo_tx.write((word >> 32) as u32) {
            ringbuf_entry!(self.trace, TraceEvent::TxStalled);
            return Err(Rp2040Error::TxFifoStall);
        }
        if !self.tx_fifo_tx.write(word as u32) {
            ringbuf_entry!(self.trace, TraceEvent::TxStalled);
            return Err(Rp2040Error::TxFifoStall);
        }

        // The program pushes its X register (32) once the stop bit has
        // been emitted; block (busy-spin) until that marker appears.
        loop {
            if self.tx_sm.rx_fifo().next().is_some() {
                break;
            }
        }
        Ok(())
    }

    fn receive(&mut self, deadline_ms: u32) -> Result<u64, RecvError<Self::Error>> {
        // RX runs continuously (`.wrap`), so there's nothing to re-arm
        // beyond draining whatever the FIFO already holds before we start
        // timing this exchange's response window.
        while self.rx_sm.rx_fifo().next().is_some() {}

        let deadline = self.millis() + deadline_ms;
        let mut words = [0u32; 2];
        let mut received = 0;
        while received < 2 {
            if let Some(word) = self.rx_sm.rx_fifo().next() {
                words[received] = word;
                received += 1;
            } else if self.millis() >= deadline {
                ringbuf_entry!(self.trace, TraceEvent::RxTimedOut);
                return Err(RecvError::Timeout);
            }
        }
        Ok(((words[0] as u64) << 32) | words[1] as u64)
    }
}
