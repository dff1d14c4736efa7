// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The boiler shadow: the mutable record spec.md §3 describes — last-read
//! sensor values, fault bits, setpoints and their admissible ranges,
//! enable flags, RBP access, and the last-seen power-cycle counter.
//!
//! Owned and mutated by `otgw-control`; read-only from the upstream (MQTT)
//! adapter, per spec.md §5's "shared, mutated only by the control loop"
//! rule. Defined here (not in `otgw-control`) because it is, structurally,
//! a typed view over Data-ID catalog results — the same relationship
//! `drv-i2c-api` has between its typed structs and the server that fills
//! them in.

use crate::{ApplicationFaultFlags, DhwConfig, RbpAccess};

/// A `(min, max)` admissible range for a setpoint, published upstream so
/// the UI can adapt (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointRange {
    pub min: f32,
    pub max: f32,
}

impl Default for SetpointRange {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

/// Everything the control loop has learned about the boiler so far. All
/// fields start at conservative defaults and are only ever updated by a
/// successful exchange; a failed or unsupported read leaves the field at
/// its last good value (spec.md §4.E: "the corresponding shadow field
/// retains its last good value").
#[derive(Debug, Clone, PartialEq)]
pub struct BoilerShadow {
    // Sensors (detail cycle)
    pub flow_temperature: f32,
    pub return_temperature: f32,
    pub exhaust_temperature: i16,
    pub dhw_temperature: f32,
    pub fan_speed_rpm: f32,
    pub ch_pressure_bar: f32,
    pub dhw_flow_rate: f32,
    pub modulation_level_pct: f32,
    pub max_capacity_kw: u8,
    pub min_modulation_pct: u8,

    // Status (mandatory cycle)
    pub flame_active: bool,
    pub ch_active: bool,
    pub dhw_active: bool,
    pub fault_active: bool,

    // Fault detail (detail cycle, only meaningful once fault_active trips)
    pub fault_flags: ApplicationFaultFlags,

    // User-facing controls and their admissible ranges
    pub ch_enabled: bool,
    pub dhw_enabled: bool,
    pub ch_setpoint: f32,
    pub dhw_setpoint: f32,
    pub dhw_setpoint_range: SetpointRange,
    pub max_ch_setpoint_range: SetpointRange,

    // RBP (remote boiler parameter) permissions, read once at NEGOTIATE
    pub dhw_setpoint_access: RbpAccess,
    pub max_ch_setpoint_access: RbpAccess,

    // Secondary identity, read once at NEGOTIATE
    pub dhw_present: bool,
    pub dhw_config: DhwConfig,

    // Restart detection
    pub power_cycle_counter: Option<u16>,
}

impl Default for BoilerShadow {
    fn default() -> Self {
        Self {
            flow_temperature: 0.0,
            return_temperature: 0.0,
            exhaust_temperature: 0,
            dhw_temperature: 0.0,
            fan_speed_rpm: 0.0,
            ch_pressure_bar: 0.0,
            dhw_flow_rate: 0.0,
            modulation_level_pct: 0.0,
            max_capacity_kw: 0,
            min_modulation_pct: 0,
            flame_active: false,
            ch_active: false,
            dhw_active: false,
            fault_active: false,
            fault_flags: ApplicationFaultFlags::default(),
            ch_enabled: false,
            dhw_enabled: true,
            ch_setpoint: 65.0,
            dhw_setpoint: 60.0,
            dhw_setpoint_range: SetpointRange::default(),
            max_ch_setpoint_range: SetpointRange::default(),
            dhw_setpoint_access: RbpAccess::Unsupported,
            max_ch_setpoint_access: RbpAccess::Unsupported,
            dhw_present: false,
            dhw_config: DhwConfig::Instantaneous,
            power_cycle_counter: None,
        }
    }
}

impl BoilerShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamps a candidate CH setpoint to the currently known admissible
    /// range before it is committed, per spec.md §6 ("inbound setpoints
    /// are clamped to the currently known admissible range before being
    /// committed to the shadow").
    pub fn clamp_ch_setpoint(&self, candidate: f32) -> f32 {
        candidate.clamp(self.max_ch_setpoint_range.min, self.max_ch_setpoint_range.max)
    }

    pub fn clamp_dhw_setpoint(&self, candidate: f32) -> f32 {
        candidate.clamp(self.dhw_setpoint_range.min, self.dhw_setpoint_range.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_known_range() {
        let mut shadow = BoilerShadow::new();
        shadow.dhw_setpoint_range = SetpointRange { min: 10.0, max: 31.0 };
        assert_eq!(shadow.clamp_dhw_setpoint(5.0), 10.0);
        assert_eq!(shadow.clamp_dhw_setpoint(50.0), 31.0);
        assert_eq!(shadow.clamp_dhw_setpoint(20.0), 20.0);
    }
}
