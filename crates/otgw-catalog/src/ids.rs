// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OpenTherm Data-ID numbers, per spec.md §4.D. Named after the accessor
//! they back, not the OpenTherm spec's own mnemonics, so call sites read
//! `ids::TSET` next to `write_ch_setpoint` instead of a bare magic number.

pub const STATUS: u8 = 0;
pub const TSET: u8 = 1;
pub const PRIMARY_CONFIG: u8 = 2;
pub const SECONDARY_CONFIG: u8 = 3;
pub const COMMAND: u8 = 4;
pub const ASF_FAULT: u8 = 5;
pub const RBP_FLAGS: u8 = 6;
pub const COOLING_CONTROL: u8 = 7;
pub const TSET_CH2: u8 = 8;
pub const TROVERRIDE: u8 = 9;
pub const TSP_COUNT: u8 = 10;
pub const TSP_DATA: u8 = 11;
pub const FHB_COUNT: u8 = 12;
pub const FHB_DATA: u8 = 13;
pub const MAX_REL_MODULATION: u8 = 14;
pub const MAX_CAPACITY_MIN_MODULATION: u8 = 15;
pub const TRSET: u8 = 16;
pub const REL_MOD_LEVEL: u8 = 17;
pub const CH_PRESSURE: u8 = 18;
pub const DHW_FLOW_RATE: u8 = 19;
pub const DAY_TIME: u8 = 20;
pub const DATE: u8 = 21;
pub const YEAR: u8 = 22;
pub const TRSET_CH2: u8 = 23;
pub const TR: u8 = 24;
pub const TBOILER: u8 = 25;
pub const TDHW: u8 = 26;
pub const TOUTSIDE: u8 = 27;
pub const TRET: u8 = 28;
pub const TSTORAGE: u8 = 29;
pub const TCOLLECTOR: u8 = 30;
pub const TFLOWCH2: u8 = 31;
pub const TDHW2: u8 = 32;
pub const TEXHAUST: u8 = 33;
pub const FAN_SPEED: u8 = 35;
pub const TDHWSET_BOUNDS: u8 = 48;
pub const MAXTSET_BOUNDS: u8 = 49;
pub const HCRATIO_BOUNDS: u8 = 50;
pub const TDHWSET: u8 = 56;
pub const MAXTSET: u8 = 57;
pub const HCRATIO: u8 = 58;
pub const REMOTE_OVERRIDE_FUNCTION: u8 = 100;
pub const OEM_DIAGNOSTIC_CODE: u8 = 115;
pub const BURNER_STARTS: u8 = 116;
pub const CH_PUMP_STARTS: u8 = 117;
pub const DHW_PUMP_STARTS: u8 = 118;
pub const DHW_BURNER_STARTS: u8 = 119;
pub const BURNER_OPERATION_HOURS: u8 = 120;
pub const CH_PUMP_OPERATION_HOURS: u8 = 121;
pub const DHW_PUMP_OPERATION_HOURS: u8 = 122;
pub const DHW_BURNER_OPERATION_HOURS: u8 = 123;
pub const OPENTHERM_VERSION_PRIMARY: u8 = 124;
pub const OPENTHERM_VERSION_SECONDARY: u8 = 125;
pub const PRIMARY_VERSION: u8 = 126;
pub const SECONDARY_VERSION: u8 = 127;
