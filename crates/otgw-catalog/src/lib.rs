// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed accessors for the ~40 OpenTherm Data-IDs this gateway understands,
//! per spec.md §4.D.
//!
//! Every reader/writer is a thin, individually fault-isolated wrapper around
//! [`otgw_exchange::exchange_with_retry`]: it builds the `(msg_type,
//! data_id, value)` triple, runs the exchange, and decodes or validates the
//! result into a named type. Dynamic dictionary-shaped responses (status,
//! secondary config, fault flags, RBP flags, remote override function)
//! become tagged structs of named fields, not keyed maps, matching how
//! `drv-i2c-api` exposes typed register structs instead of raw words.
//!
//! This crate is stateless: it never retains anything between calls. The
//! mutable [`shadow::BoilerShadow`] that accumulates what these accessors
//! return is owned and updated by `otgw-control`.

#![no_std]

pub mod ids;
pub mod shadow;

use otgw_codec::{f88, f88_to_u16, s16, RangeError};
use otgw_exchange::{exchange_with_retry, ExchangeError};
use otgw_line_driver::LineDriver;

/// Failure from a catalog writer: either the input never made it past the
/// range guard (no bus traffic, per spec.md invariant "every writer MUST
/// reject out-of-range inputs before issuing any bus traffic"), or the
/// exchange itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError<E> {
    Range(RangeError),
    Exchange(ExchangeError<E>),
}

impl<E> From<RangeError> for CatalogError<E> {
    fn from(err: RangeError) -> Self {
        Self::Range(err)
    }
}

impl<E> From<ExchangeError<E>> for CatalogError<E> {
    fn from(err: ExchangeError<E>) -> Self {
        Self::Exchange(err)
    }
}

impl<E: core::fmt::Display> core::fmt::Display for CatalogError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Range(e) => write!(f, "{e}"),
            Self::Exchange(e) => write!(f, "{e}"),
        }
    }
}

impl<E: core::fmt::Display + core::fmt::Debug> core::error::Error for CatalogError<E> {}

/// Default retry budget every accessor in this crate uses unless a caller
/// overrides it: one original attempt plus two retries.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

// ---------------------------------------------------------------------
// Shared read/write helpers. Every accessor below reduces to one of these
// four shapes; `original_source/opentherm_app.py` repeats the same
// exchange-then-assert pattern ~30 times, so this crate factors it into one
// place the way `drv-i2c-api`'s `write_read`/`read_reg` helpers do.
// ---------------------------------------------------------------------

fn read_raw<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    data_id: u8,
) -> Result<u16, ExchangeError<D::Error>> {
    let parts = exchange_with_retry(
        bus,
        otgw_codec::MsgType::ReadData,
        data_id,
        0,
        otgw_exchange::DEFAULT_TIMEOUT_MS,
        max_retries,
    )?;
    Ok(parts.value)
}

fn write_raw<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    data_id: u8,
    value: u16,
) -> Result<u16, ExchangeError<D::Error>> {
    let parts = exchange_with_retry(
        bus,
        otgw_codec::MsgType::WriteData,
        data_id,
        value,
        otgw_exchange::DEFAULT_TIMEOUT_MS,
        max_retries,
    )?;
    Ok(parts.value)
}

/// Reads an arbitrary Data-ID as a raw 16-bit value via READ-DATA, for
/// vendor-specific IDs this catalog doesn't otherwise name — e.g. a
/// manufacturer's power-cycle counter, used only for restart detection.
pub fn read_vendor_u16<D: LineDriver>(bus: &mut D, max_retries: u32, data_id: u8) -> Result<u16, ExchangeError<D::Error>> {
    read_raw(bus, max_retries, data_id)
}

fn read_f88<D: LineDriver>(bus: &mut D, max_retries: u32, data_id: u8) -> Result<f32, ExchangeError<D::Error>> {
    read_raw(bus, max_retries, data_id).map(f88)
}

fn write_f88<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    data_id: u8,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), CatalogError<D::Error>> {
    let encoded = f88_to_u16(value, min, max)?;
    write_raw(bus, max_retries, data_id, encoded)?;
    Ok(())
}

fn read_s16<D: LineDriver>(bus: &mut D, max_retries: u32, data_id: u8) -> Result<i16, ExchangeError<D::Error>> {
    read_raw(bus, max_retries, data_id).map(s16)
}

// ---------------------------------------------------------------------
// Status (ID 0) — both master and slave bits ride in one exchange.
// ---------------------------------------------------------------------

/// The master-originated control bits for a status exchange (hi byte of
/// the request value).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusRequest {
    pub ch_enabled: bool,
    pub dhw_enabled: bool,
    pub cooling_enabled: bool,
    pub otc_enabled: bool,
    pub ch2_enabled: bool,
}

impl StatusRequest {
    fn to_value(self) -> u16 {
        let mut v: u16 = 0;
        v |= if self.ch_enabled { 0x0100 } else { 0 };
        v |= if self.dhw_enabled { 0x0200 } else { 0 };
        v |= if self.cooling_enabled { 0x0400 } else { 0 };
        v |= if self.otc_enabled { 0x0800 } else { 0 };
        v |= if self.ch2_enabled { 0x1000 } else { 0 };
        v
    }
}

/// The slave-originated status bits (lo byte of the response value).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusResponse {
    pub fault: bool,
    pub ch_active: bool,
    pub dhw_active: bool,
    pub flame_active: bool,
    pub cooling_active: bool,
    pub ch2_active: bool,
    pub diagnostic_event: bool,
}

impl StatusResponse {
    fn from_value(v: u16) -> Self {
        Self {
            fault: v & 0x01 != 0,
            ch_active: v & 0x02 != 0,
            dhw_active: v & 0x04 != 0,
            flame_active: v & 0x08 != 0,
            cooling_active: v & 0x10 != 0,
            ch2_active: v & 0x20 != 0,
            diagnostic_event: v & 0x40 != 0,
        }
    }
}

/// The mandatory ~1 Hz status exchange (spec.md §3 I5, §4.E "mandatory
/// cycle"). Carries the current enable flags every call; the boiler has no
/// memory of previous exchanges.
pub fn status_exchange<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    request: StatusRequest,
) -> Result<StatusResponse, ExchangeError<D::Error>> {
    let parts = exchange_with_retry(
        bus,
        otgw_codec::MsgType::ReadData,
        ids::STATUS,
        request.to_value(),
        otgw_exchange::DEFAULT_TIMEOUT_MS,
        max_retries,
    )?;
    Ok(StatusResponse::from_value(parts.value))
}

// ---------------------------------------------------------------------
// Configuration (IDs 2–4)
// ---------------------------------------------------------------------

/// Writes the primary (master) configuration: MemberID in the low byte, no
/// master-specific config flags defined by OpenTherm. NEGOTIATE calls this
/// once with MemberID 0 ("non-specific"), per spec.md §4.E.
pub fn write_primary_configuration<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    member_id: u8,
) -> Result<(), ExchangeError<D::Error>> {
    write_raw(bus, max_retries, ids::PRIMARY_CONFIG, member_id as u16)?;
    Ok(())
}

/// Secondary (boiler) configuration, decoded from ID 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryConfig {
    pub dhw_present: bool,
    pub control_type: ControlType,
    pub cooling_supported: bool,
    pub dhw_config: DhwConfig,
    /// `true` unless the boiler reports "low-off & pump control" disabled.
    pub pump_control: bool,
    pub ch2_supported: bool,
    pub member_id_code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Modulating,
    OnOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhwConfig {
    Instantaneous,
    Storage,
}

pub fn read_secondary_configuration<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
) -> Result<SecondaryConfig, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::SECONDARY_CONFIG)?;
    Ok(SecondaryConfig {
        dhw_present: v & 0x0100 != 0,
        control_type: if v & 0x0200 != 0 { ControlType::OnOff } else { ControlType::Modulating },
        cooling_supported: v & 0x0400 != 0,
        dhw_config: if v & 0x0800 != 0 { DhwConfig::Storage } else { DhwConfig::Instantaneous },
        pump_control: v & 0x1000 == 0,
        ch2_supported: v & 0x2000 != 0,
        member_id_code: (v & 0xff) as u8,
    })
}

/// Writes a remote command (ID 4, hi byte) and returns the boiler's echo
/// (lo byte of the WRITE-ACK response).
pub fn write_remote_command<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    command: u8,
) -> Result<u8, ExchangeError<D::Error>> {
    let v = write_raw(bus, max_retries, ids::COMMAND, (command as u16) << 8)?;
    Ok((v & 0xff) as u8)
}

// ---------------------------------------------------------------------
// Application fault flags (ID 5) and RBP flags (ID 6)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationFaultFlags {
    pub service_required: bool,
    pub blor_enabled: bool,
    pub low_water_pressure: bool,
    pub flame_fault: bool,
    pub air_pressure_fault: bool,
    pub water_over_temp: bool,
    pub oem_fault_code: u8,
}

pub fn read_fault_flags<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
) -> Result<ApplicationFaultFlags, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::ASF_FAULT)?;
    Ok(ApplicationFaultFlags {
        service_required: v & 0x0100 != 0,
        blor_enabled: v & 0x0200 != 0,
        low_water_pressure: v & 0x0400 != 0,
        flame_fault: v & 0x0800 != 0,
        air_pressure_fault: v & 0x1000 != 0,
        water_over_temp: v & 0x2000 != 0,
        oem_fault_code: (v & 0xff) as u8,
    })
}

/// Whether a remote boiler parameter is unsupported, read-only, or
/// read/write, per the OpenTherm ID 6 layout: support flags in the high
/// byte, transfer-enable (read/write) flags in the low byte. This resolves
/// the open question in spec.md §9 — one copy of the source used `0x10`/
/// `0x20` for support, the other a mirrored high-nibble layout; neither
/// matches the OpenTherm specification's byte split, which is what this
/// follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbpAccess {
    Unsupported,
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbpFlags {
    pub dhw_setpoint: RbpAccess,
    pub max_ch_setpoint: RbpAccess,
}

pub fn read_rbp_flags<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<RbpFlags, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::RBP_FLAGS)?;
    let access = |supported: bool, writable: bool| {
        if !supported {
            RbpAccess::Unsupported
        } else if writable {
            RbpAccess::ReadWrite
        } else {
            RbpAccess::ReadOnly
        }
    };
    Ok(RbpFlags {
        dhw_setpoint: access(v & 0x0100 != 0, v & 0x0001 != 0),
        max_ch_setpoint: access(v & 0x0200 != 0, v & 0x0002 != 0),
    })
}

// ---------------------------------------------------------------------
// Setpoints and modulation controls (IDs 1, 7, 8, 14, 16, 23, 24, 56–58)
// ---------------------------------------------------------------------

pub fn write_ch_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::TSET, celsius, 0.0, 100.0)
}

pub fn write_ch2_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::TSET_CH2, celsius, 0.0, 100.0)
}

pub fn write_cooling_control<D: LineDriver>(bus: &mut D, max_retries: u32, percent: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::COOLING_CONTROL, percent, 0.0, 100.0)
}

pub fn write_max_relative_modulation<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    percent: f32,
) -> Result<(), CatalogError<D::Error>> {
    // See spec.md §9: the source used READ-DATA for this id; WRITE-DATA is
    // the conventional choice and the one this catalog issues.
    write_f88(bus, max_retries, ids::MAX_REL_MODULATION, percent, 0.0, 100.0)
}

pub fn write_room_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::TRSET, celsius, -40.0, 127.0)
}

pub fn write_room_setpoint_ch2<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::TRSET_CH2, celsius, -40.0, 127.0)
}

pub fn write_room_temperature<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::TR, celsius, -40.0, 127.0)
}

pub fn read_dhw_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TDHWSET)
}

pub fn write_dhw_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::TDHWSET, celsius, 0.0, 100.0)
}

pub fn read_maxch_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::MAXTSET)
}

pub fn write_maxch_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32, celsius: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::MAXTSET, celsius, 0.0, 100.0)
}

pub fn read_hc_ratio<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::HCRATIO)
}

pub fn write_hc_ratio<D: LineDriver>(bus: &mut D, max_retries: u32, ratio: f32) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::HCRATIO, ratio, 0.0, 25.5)
}

// ---------------------------------------------------------------------
// Remote override, TSP, FHB (IDs 9–13)
// ---------------------------------------------------------------------

pub fn read_remote_override_setpoint<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TROVERRIDE)
}

/// Number of vendor-specific (TSP) parameters the boiler exposes, in the hi
/// byte of the ID 10 response.
pub fn read_tsp_count<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<u8, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::TSP_COUNT)?;
    Ok((v >> 8) as u8)
}

pub fn read_tsp_entry<D: LineDriver>(bus: &mut D, max_retries: u32, index: u8) -> Result<u8, ExchangeError<D::Error>> {
    let v = read_raw_with_value(bus, max_retries, ids::TSP_DATA, (index as u16) << 8)?;
    Ok((v & 0xff) as u8)
}

pub fn write_tsp_entry<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    index: u8,
    value: u8,
) -> Result<(), ExchangeError<D::Error>> {
    write_raw(bus, max_retries, ids::TSP_DATA, ((index as u16) << 8) | value as u16)?;
    Ok(())
}

/// Number of entries in the fault history buffer, hi byte of ID 12.
pub fn read_fhb_count<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<u8, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::FHB_COUNT)?;
    Ok((v >> 8) as u8)
}

pub fn read_fhb_entry<D: LineDriver>(bus: &mut D, max_retries: u32, index: u8) -> Result<u16, ExchangeError<D::Error>> {
    read_raw_with_value(bus, max_retries, ids::FHB_DATA, (index as u16) << 8)
}

/// Like [`read_raw`] but the request carries a nonzero value (TSP/FHB
/// index selection rides in a READ-DATA request's hi byte).
fn read_raw_with_value<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    data_id: u8,
    value: u16,
) -> Result<u16, ExchangeError<D::Error>> {
    let parts = exchange_with_retry(
        bus,
        otgw_codec::MsgType::ReadData,
        data_id,
        value,
        otgw_exchange::DEFAULT_TIMEOUT_MS,
        max_retries,
    )?;
    Ok(parts.value)
}

// ---------------------------------------------------------------------
// Capacity, modulation, sensors (IDs 15, 17–19, 25–33, 35)
// ---------------------------------------------------------------------

/// `(max_capacity_kw, min_modulation_pct)`, ID 15.
pub fn read_capacity_and_min_modulation<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
) -> Result<(u8, u8), ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::MAX_CAPACITY_MIN_MODULATION)?;
    Ok(((v >> 8) as u8, (v & 0xff) as u8))
}

pub fn read_relative_modulation_level<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::REL_MOD_LEVEL)
}

pub fn read_ch_water_pressure<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::CH_PRESSURE)
}

pub fn read_dhw_flow_rate<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::DHW_FLOW_RATE)
}

pub fn read_boiler_flow_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TBOILER)
}

pub fn read_dhw_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TDHW)
}

pub fn read_outside_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TOUTSIDE)
}

pub fn read_return_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TRET)
}

pub fn read_solar_storage_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TSTORAGE)
}

pub fn read_solar_collector_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<i16, ExchangeError<D::Error>> {
    read_s16(bus, max_retries, ids::TCOLLECTOR)
}

pub fn read_ch2_flow_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TFLOWCH2)
}

pub fn read_dhw2_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::TDHW2)
}

pub fn read_exhaust_temperature<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<i16, ExchangeError<D::Error>> {
    read_s16(bus, max_retries, ids::TEXHAUST)
}

/// Fan speed in RPM, ID 35 (OpenTherm v4.2, not in the v2.2 ID table —
/// older boilers answer UNKNOWN-DATAID, which the control loop isolates).
pub fn read_fan_speed<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::FAN_SPEED)?;
    Ok(((v & 0xff) * 60) as f32)
}

// ---------------------------------------------------------------------
// Setpoint bounds (IDs 48–50)
// ---------------------------------------------------------------------

/// `(min, max)` in whole degrees C (both s8), low byte first per the
/// OpenTherm layout (matches `original_source`'s `(r_data & 0xFF, r_data >>
/// 8)` ordering).
fn read_bounds<D: LineDriver>(bus: &mut D, max_retries: u32, data_id: u8) -> Result<(i8, i8), ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, data_id)?;
    Ok((otgw_codec::s8((v & 0xff) as u8), otgw_codec::s8((v >> 8) as u8)))
}

pub fn read_dhw_setpoint_bounds<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<(i8, i8), ExchangeError<D::Error>> {
    read_bounds(bus, max_retries, ids::TDHWSET_BOUNDS)
}

pub fn read_maxch_setpoint_bounds<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<(i8, i8), ExchangeError<D::Error>> {
    read_bounds(bus, max_retries, ids::MAXTSET_BOUNDS)
}

pub fn read_hc_ratio_bounds<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<(i8, i8), ExchangeError<D::Error>> {
    read_bounds(bus, max_retries, ids::HCRATIO_BOUNDS)
}

// ---------------------------------------------------------------------
// Day/time, date, year (IDs 20–22) — bit-packed writes
// ---------------------------------------------------------------------

pub fn write_day_time<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    day_of_week: u8,
    hour: u8,
    minute: u8,
) -> Result<(), ExchangeError<D::Error>> {
    let value = ((day_of_week as u16 & 0x07) << 13) | ((hour as u16 & 0x1f) << 8) | (minute as u16 & 0x3f);
    write_raw(bus, max_retries, ids::DAY_TIME, value)?;
    Ok(())
}

pub fn write_date<D: LineDriver>(bus: &mut D, max_retries: u32, month: u8, day_of_month: u8) -> Result<(), ExchangeError<D::Error>> {
    write_raw(bus, max_retries, ids::DATE, ((month as u16) << 8) | day_of_month as u16)?;
    Ok(())
}

pub fn write_year<D: LineDriver>(bus: &mut D, max_retries: u32, year: u16) -> Result<(), ExchangeError<D::Error>> {
    write_raw(bus, max_retries, ids::YEAR, year)?;
    Ok(())
}

// ---------------------------------------------------------------------
// Remote override function (ID 100), diagnostics and counters (115–123)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteOverrideFunction {
    pub manual_change_priority: bool,
    pub program_change_priority: bool,
}

pub fn read_remote_override_function<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
) -> Result<RemoteOverrideFunction, ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::REMOTE_OVERRIDE_FUNCTION)?;
    Ok(RemoteOverrideFunction {
        manual_change_priority: v & 0x01 != 0,
        program_change_priority: v & 0x02 != 0,
    })
}

pub fn read_oem_diagnostic_code<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<u16, ExchangeError<D::Error>> {
    read_raw(bus, max_retries, ids::OEM_DIAGNOSTIC_CODE)
}

macro_rules! counter_reader {
    ($name:ident, $id:expr) => {
        pub fn $name<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<u16, ExchangeError<D::Error>> {
            read_raw(bus, max_retries, $id)
        }
    };
}

counter_reader!(read_burner_starts, ids::BURNER_STARTS);
counter_reader!(read_ch_pump_starts, ids::CH_PUMP_STARTS);
counter_reader!(read_dhw_pump_starts, ids::DHW_PUMP_STARTS);
counter_reader!(read_dhw_burner_starts, ids::DHW_BURNER_STARTS);
counter_reader!(read_burner_operation_hours, ids::BURNER_OPERATION_HOURS);
counter_reader!(read_ch_pump_operation_hours, ids::CH_PUMP_OPERATION_HOURS);
counter_reader!(read_dhw_pump_operation_hours, ids::DHW_PUMP_OPERATION_HOURS);
counter_reader!(read_dhw_burner_operation_hours, ids::DHW_BURNER_OPERATION_HOURS);

// ---------------------------------------------------------------------
// Version / product identification (IDs 124–127)
// ---------------------------------------------------------------------

pub fn write_primary_opentherm_version<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    version: f32,
) -> Result<(), CatalogError<D::Error>> {
    write_f88(bus, max_retries, ids::OPENTHERM_VERSION_PRIMARY, version, 0.0, 255.0)
}

pub fn read_secondary_opentherm_version<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<f32, ExchangeError<D::Error>> {
    read_f88(bus, max_retries, ids::OPENTHERM_VERSION_SECONDARY)
}

pub fn write_primary_product_version<D: LineDriver>(
    bus: &mut D,
    max_retries: u32,
    product_type: u8,
    product_version: u8,
) -> Result<(), ExchangeError<D::Error>> {
    write_raw(bus, max_retries, ids::PRIMARY_VERSION, ((product_type as u16) << 8) | product_version as u16)?;
    Ok(())
}

pub fn read_secondary_product_version<D: LineDriver>(bus: &mut D, max_retries: u32) -> Result<(u8, u8), ExchangeError<D::Error>> {
    let v = read_raw(bus, max_retries, ids::SECONDARY_VERSION)?;
    Ok(((v >> 8) as u8, (v & 0xff) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otgw_codec::{encode_frame, encode_manchester, MsgType};
    use otgw_line_driver::mock::{MockLineDriver, Scripted};

    fn ack(msg_type: MsgType, data_id: u8, value: u16) -> Scripted {
        let frame = encode_frame(msg_type, data_id, value);
        Scripted::Word(encode_manchester(frame, false))
    }

    #[test]
    fn status_exchange_decodes_all_slave_bits() {
        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::ReadAck, ids::STATUS, 0x00ff));
        let resp = status_exchange(
            &mut bus,
            DEFAULT_MAX_RETRIES,
            StatusRequest { ch_enabled: true, dhw_enabled: true, ..Default::default() },
        )
        .unwrap();
        assert_eq!(
            resp,
            StatusResponse {
                fault: true,
                ch_active: true,
                dhw_active: true,
                flame_active: true,
                cooling_active: true,
                ch2_active: true,
                diagnostic_event: true,
            }
        );
        assert_eq!(bus.transmitted().len(), 1);
    }

    #[test]
    fn status_request_sets_hi_byte() {
        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::ReadAck, ids::STATUS, 0));
        status_exchange(
            &mut bus,
            DEFAULT_MAX_RETRIES,
            StatusRequest { ch_enabled: true, dhw_enabled: true, ..Default::default() },
        )
        .unwrap();
        let sent = decode_sent(&bus);
        assert_eq!(sent.value, 0x0300);
    }

    fn decode_sent(bus: &MockLineDriver) -> otgw_codec::FrameParts {
        let word = bus.transmitted()[0];
        let frame = otgw_codec::decode_manchester(word, true).unwrap();
        otgw_codec::decode_frame(frame).unwrap()
    }

    #[test]
    fn read_dhw_setpoint_range_matches_spec_vector() {
        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::ReadAck, ids::TDHWSET_BOUNDS, 0x1F0A));
        let (min, max) = read_dhw_setpoint_bounds(&mut bus, DEFAULT_MAX_RETRIES).unwrap();
        assert_eq!((min, max), (10, 31));
    }

    #[test]
    fn control_ch_setpoint_issues_expected_write() {
        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::WriteAck, ids::TSET, 0x3200));
        write_ch_setpoint(&mut bus, DEFAULT_MAX_RETRIES, 50.0).unwrap();
        let sent = decode_sent(&bus);
        assert_eq!(sent.msg_type, MsgType::WriteData);
        assert_eq!(sent.data_id, ids::TSET);
        assert_eq!(sent.value, 0x3200);
    }

    #[test]
    fn write_ch_setpoint_rejects_out_of_range_without_bus_traffic() {
        let mut bus = MockLineDriver::new();
        let err = write_ch_setpoint(&mut bus, DEFAULT_MAX_RETRIES, 150.0);
        assert!(matches!(err, Err(CatalogError::Range(_))));
        assert!(bus.transmitted().is_empty());
    }

    #[test]
    fn rbp_flags_high_byte_is_support_low_byte_is_rw() {
        let mut bus = MockLineDriver::new();
        // DHW: supported + rw. MaxCH: supported, read-only.
        bus.push_response(ack(MsgType::ReadAck, ids::RBP_FLAGS, 0x0101));
        let flags = read_rbp_flags(&mut bus, DEFAULT_MAX_RETRIES).unwrap();
        assert_eq!(flags.dhw_setpoint, RbpAccess::ReadWrite);
        assert_eq!(flags.max_ch_setpoint, RbpAccess::Unsupported);

        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::ReadAck, ids::RBP_FLAGS, 0x0300));
        let flags = read_rbp_flags(&mut bus, DEFAULT_MAX_RETRIES).unwrap();
        assert_eq!(flags.dhw_setpoint, RbpAccess::ReadOnly);
        assert_eq!(flags.max_ch_setpoint, RbpAccess::ReadOnly);
    }

    #[test]
    fn fan_speed_converts_to_rpm() {
        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::ReadAck, ids::FAN_SPEED, 0x1234));
        let rpm = read_fan_speed(&mut bus, DEFAULT_MAX_RETRIES).unwrap();
        assert_eq!(rpm, (0x34 * 60) as f32);
    }

    #[test]
    fn secondary_config_decodes_modulating_and_storage() {
        let mut bus = MockLineDriver::new();
        bus.push_response(ack(MsgType::ReadAck, ids::SECONDARY_CONFIG, 0x0900));
        let cfg = read_secondary_configuration(&mut bus, DEFAULT_MAX_RETRIES).unwrap();
        assert!(cfg.dhw_present);
        assert_eq!(cfg.control_type, ControlType::Modulating);
        assert_eq!(cfg.dhw_config, DhwConfig::Storage);
        assert!(cfg.pump_control);
    }
}
