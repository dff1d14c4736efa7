// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant MQTT discovery payloads, ported from the JSON blobs
//! `original_source/main.py` builds with `json.dumps(...)` for each sensor,
//! binary_sensor, number, and switch entity. One `device` block (`{
//! "identifiers": ["boiler"], "name": "Boiler" }`) ties every entity to the
//! same HA device, exactly as the original does.
//!
//! Kept as one explicit call per entity rather than folded into a generic
//! table-driven loop: the entities aren't uniform enough (sensors carry a
//! `device_class`/unit, numbers carry a min/max, switches/numbers carry a
//! command topic) to make a single shape worth the indirection, and the
//! original itself lists them the same way.

use otgw_catalog::shadow::BoilerShadow;
use serde_json::{json, Value};

const DEVICE: fn() -> Value = || json!({"identifiers": ["boiler"], "name": "Boiler"});

/// Config-topic/payload pairs for every entity this gateway publishes,
/// under `{prefix}/<domain>/<object_id>/config`. `shadow` supplies the
/// admissible ranges for the two number entities, so discovery stays
/// accurate once NEGOTIATE has learned the boiler's real bounds.
pub fn discovery_entries(prefix: &str, shadow: &BoilerShadow) -> Vec<(String, Value)> {
    vec![
        (
            format!("{prefix}/sensor/boilerReturnTemperature/config"),
            json!({
                "device_class": "temperature",
                "state_topic": format!("{prefix}/sensor/boilerReturnTemperature/state"),
                "unit_of_measurement": "°C",
                "unique_id": "boilerReturnTemperature",
                "device": DEVICE(),
                "name": "Return Temperature",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerExhaustTemperature/config"),
            json!({
                "device_class": "temperature",
                "state_topic": format!("{prefix}/sensor/boilerExhaustTemperature/state"),
                "unit_of_measurement": "°C",
                "unique_id": "boilerExhaustTemperature",
                "device": DEVICE(),
                "name": "Exhaust Temperature",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerFanSpeed/config"),
            json!({
                "state_topic": format!("{prefix}/sensor/boilerFanSpeed/state"),
                "unit_of_measurement": "rpm",
                "unique_id": "boilerFanSpeed",
                "device": DEVICE(),
                "name": "Fan Speed",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerModulationLevel/config"),
            json!({
                "state_topic": format!("{prefix}/sensor/boilerModulationLevel/state"),
                "unit_of_measurement": "percent",
                "unique_id": "boilerModulationLevel",
                "device": DEVICE(),
                "name": "Current Modulation Level",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerChPressure/config"),
            json!({
                "device_class": "pressure",
                "state_topic": format!("{prefix}/sensor/boilerChPressure/state"),
                "unit_of_measurement": "bar",
                "unique_id": "boilerChPressure",
                "device": DEVICE(),
                "name": "CH Pressure",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerDhwFlowRate/config"),
            json!({
                "state_topic": format!("{prefix}/sensor/boilerDhwFlowRate/state"),
                "unit_of_measurement": "l/min",
                "unique_id": "boilerDhwFlowRate",
                "device": DEVICE(),
                "name": "HW Flow Rate",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerMaxCapacity/config"),
            json!({
                "device_class": "power",
                "state_topic": format!("{prefix}/sensor/boilerMaxCapacity/state"),
                "unit_of_measurement": "kW",
                "unique_id": "boilerMaxCapacity",
                "device": DEVICE(),
                "name": "Max Capacity",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerFlameActive/config"),
            json!({
                "device_class": "heat",
                "state_topic": format!("{prefix}/binary_sensor/boilerFlameActive/state"),
                "unique_id": "boilerFlameActive",
                "device": DEVICE(),
                "name": "Flame Active",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerFaultActive/config"),
            json!({
                "device_class": "problem",
                "state_topic": format!("{prefix}/binary_sensor/boilerFaultActive/state"),
                "unique_id": "boilerFaultActive",
                "device": DEVICE(),
                "name": "Fault",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerFaultLowWaterPressure/config"),
            json!({
                "device_class": "problem",
                "state_topic": format!("{prefix}/binary_sensor/boilerFaultLowWaterPressure/state"),
                "unique_id": "boilerFaultLowWaterPressure",
                "device": DEVICE(),
                "name": "Low CH Water Pressure",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerFaultFlame/config"),
            json!({
                "device_class": "problem",
                "state_topic": format!("{prefix}/binary_sensor/boilerFaultFlame/state"),
                "unique_id": "boilerFaultFlame",
                "device": DEVICE(),
                "name": "Flame Fault",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerFaultLowAirPressure/config"),
            json!({
                "device_class": "problem",
                "state_topic": format!("{prefix}/binary_sensor/boilerFaultLowAirPressure/state"),
                "unique_id": "boilerFaultLowAirPressure",
                "device": DEVICE(),
                "name": "Low Air Pressure",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerHighWaterTemperature/config"),
            json!({
                "device_class": "problem",
                "state_topic": format!("{prefix}/binary_sensor/boilerHighWaterTemperature/state"),
                "unique_id": "boilerHighWaterTemperature",
                "device": DEVICE(),
                "name": "High Water Temperature",
            }),
        ),
        (
            format!("{prefix}/switch/boilerCHEnabled/config"),
            json!({
                "state_topic": format!("{prefix}/switch/boilerCHEnabled/state"),
                "command_topic": format!("{prefix}/switch/boilerCHEnabled/command"),
                "unique_id": "boilerCHEnabled",
                "device": DEVICE(),
                "name": "Heating Enabled",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerCHFlowTemperature/config"),
            json!({
                "device_class": "temperature",
                "state_topic": format!("{prefix}/sensor/boilerCHFlowTemperature/state"),
                "unit_of_measurement": "°C",
                "unique_id": "boilerCHFlowTemperature",
                "device": DEVICE(),
                "name": "Heating Boiler Temperature",
            }),
        ),
        (
            format!("{prefix}/number/boilerCHFlowTemperatureSetpoint/config"),
            json!({
                "state_topic": format!("{prefix}/number/boilerCHFlowTemperatureSetpoint/state"),
                "command_topic": format!("{prefix}/number/boilerCHFlowTemperatureSetpoint/command"),
                "device_class": "temperature",
                "min": shadow.max_ch_setpoint_range.min,
                "max": shadow.max_ch_setpoint_range.max,
                "unit_of_measurement": "°C",
                "unique_id": "boilerCHFlowTemperatureSetpoint",
                "device": DEVICE(),
                "name": "Heating Boiler Setpoint",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerCHActive/config"),
            json!({
                "device_class": "heat",
                "state_topic": format!("{prefix}/binary_sensor/boilerCHActive/state"),
                "unique_id": "boilerCHActive",
                "device": DEVICE(),
                "name": "Heating Active",
            }),
        ),
        (
            format!("{prefix}/switch/boilerDHWEnabled/config"),
            json!({
                "state_topic": format!("{prefix}/switch/boilerDHWEnabled/state"),
                "command_topic": format!("{prefix}/switch/boilerDHWEnabled/command"),
                "unique_id": "boilerDHWEnabled",
                "device": DEVICE(),
                "name": "Hot Water Enabled",
            }),
        ),
        (
            format!("{prefix}/sensor/boilerDHWFlowTemperature/config"),
            json!({
                "device_class": "temperature",
                "state_topic": format!("{prefix}/sensor/boilerDHWFlowTemperature/state"),
                "unit_of_measurement": "°C",
                "unique_id": "boilerDHWFlowTemperature",
                "device": DEVICE(),
                "name": "Hot Water Temperature",
            }),
        ),
        (
            format!("{prefix}/number/boilerDHWFlowTemperatureSetpoint/config"),
            json!({
                "state_topic": format!("{prefix}/number/boilerDHWFlowTemperatureSetpoint/state"),
                "command_topic": format!("{prefix}/number/boilerDHWFlowTemperatureSetpoint/command"),
                "device_class": "temperature",
                "min": shadow.dhw_setpoint_range.min,
                "max": shadow.dhw_setpoint_range.max,
                "unit_of_measurement": "°C",
                "unique_id": "boilerDHWFlowTemperatureSetpoint",
                "device": DEVICE(),
                "name": "Hot Water Setpoint",
            }),
        ),
        (
            format!("{prefix}/binary_sensor/boilerDHWActive/config"),
            json!({
                "device_class": "heat",
                "state_topic": format!("{prefix}/binary_sensor/boilerDHWActive/state"),
                "unique_id": "boilerDHWActive",
                "device": DEVICE(),
                "name": "Hot Water Active",
            }),
        ),
    ]
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

fn rounded(value: f32) -> String {
    format!("{:.2}", value)
}

/// State-topic/payload pairs reflecting the current shadow, under
/// `{prefix}/<domain>/<object_id>/state`. Published on the MQTT publish
/// cadence, mirroring `mqtt_publish()` in `original_source/main.py`.
pub fn state_entries(prefix: &str, shadow: &BoilerShadow) -> Vec<(String, String)> {
    vec![
        (format!("{prefix}/sensor/boilerReturnTemperature/state"), rounded(shadow.return_temperature)),
        (format!("{prefix}/sensor/boilerExhaustTemperature/state"), shadow.exhaust_temperature.to_string()),
        (format!("{prefix}/sensor/boilerFanSpeed/state"), rounded(shadow.fan_speed_rpm)),
        (format!("{prefix}/sensor/boilerModulationLevel/state"), rounded(shadow.modulation_level_pct)),
        (format!("{prefix}/sensor/boilerChPressure/state"), rounded(shadow.ch_pressure_bar)),
        (format!("{prefix}/sensor/boilerDhwFlowRate/state"), rounded(shadow.dhw_flow_rate)),
        (format!("{prefix}/sensor/boilerMaxCapacity/state"), shadow.max_capacity_kw.to_string()),
        (format!("{prefix}/binary_sensor/boilerFlameActive/state"), on_off(shadow.flame_active).to_string()),
        (format!("{prefix}/binary_sensor/boilerFaultActive/state"), on_off(shadow.fault_active).to_string()),
        (
            format!("{prefix}/binary_sensor/boilerFaultLowWaterPressure/state"),
            on_off(shadow.fault_flags.low_water_pressure).to_string(),
        ),
        (format!("{prefix}/binary_sensor/boilerFaultFlame/state"), on_off(shadow.fault_flags.flame_fault).to_string()),
        (
            format!("{prefix}/binary_sensor/boilerFaultLowAirPressure/state"),
            on_off(shadow.fault_flags.air_pressure_fault).to_string(),
        ),
        (
            format!("{prefix}/binary_sensor/boilerHighWaterTemperature/state"),
            on_off(shadow.fault_flags.water_over_temp).to_string(),
        ),
        (format!("{prefix}/sensor/boilerCHFlowTemperature/state"), rounded(shadow.flow_temperature)),
        (format!("{prefix}/switch/boilerCHEnabled/state"), on_off(shadow.ch_enabled).to_string()),
        (format!("{prefix}/number/boilerCHFlowTemperatureSetpoint/state"), rounded(shadow.ch_setpoint)),
        (format!("{prefix}/binary_sensor/boilerCHActive/state"), on_off(shadow.ch_active).to_string()),
        (format!("{prefix}/sensor/boilerDHWFlowTemperature/state"), rounded(shadow.dhw_temperature)),
        (format!("{prefix}/switch/boilerDHWEnabled/state"), on_off(shadow.dhw_enabled).to_string()),
        (format!("{prefix}/number/boilerDHWFlowTemperatureSetpoint/state"), rounded(shadow.dhw_setpoint)),
        (format!("{prefix}/binary_sensor/boilerDHWActive/state"), on_off(shadow.dhw_active).to_string()),
    ]
}

/// The four command topics the MQTT adapter subscribes to, mirroring
/// `mqtt()`'s `mqc.subscribe(...)` calls in `original_source/main.py`.
pub fn command_topics(prefix: &str) -> [String; 4] {
    [
        format!("{prefix}/switch/boilerCHEnabled/command"),
        format!("{prefix}/number/boilerCHFlowTemperatureSetpoint/command"),
        format!("{prefix}/switch/boilerDHWEnabled/command"),
        format!("{prefix}/number/boilerDHWFlowTemperatureSetpoint/command"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_entries_cover_every_domain() {
        let shadow = BoilerShadow::new();
        let entries = discovery_entries("homeassistant", &shadow);
        assert_eq!(entries.len(), 21);
        assert!(entries.iter().any(|(topic, _)| topic.contains("/sensor/")));
        assert!(entries.iter().any(|(topic, _)| topic.contains("/binary_sensor/")));
        assert!(entries.iter().any(|(topic, _)| topic.contains("/switch/")));
        assert!(entries.iter().any(|(topic, _)| topic.contains("/number/")));
    }

    #[test]
    fn number_entity_reflects_shadow_bounds() {
        let mut shadow = BoilerShadow::new();
        shadow.dhw_setpoint_range = otgw_catalog::shadow::SetpointRange { min: 10.0, max: 31.0 };
        let entries = discovery_entries("homeassistant", &shadow);
        let (_, payload) = entries
            .iter()
            .find(|(topic, _)| topic.contains("boilerDHWFlowTemperatureSetpoint/config"))
            .unwrap();
        assert_eq!(payload["min"], 10.0);
        assert_eq!(payload["max"], 31.0);
    }

    #[test]
    fn state_entries_render_booleans_as_on_off() {
        let mut shadow = BoilerShadow::new();
        shadow.flame_active = true;
        let entries = state_entries("homeassistant", &shadow);
        let (_, value) = entries.iter().find(|(topic, _)| topic.contains("boilerFlameActive")).unwrap();
        assert_eq!(value, "ON");
    }

    #[test]
    fn command_topics_match_subscriptions() {
        let topics = command_topics("homeassistant");
        assert!(topics.contains(&"homeassistant/switch/boilerCHEnabled/command".to_string()));
        assert!(topics.contains(&"homeassistant/number/boilerDHWFlowTemperatureSetpoint/command".to_string()));
    }
}
