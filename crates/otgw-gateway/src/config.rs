// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static gateway configuration, loaded from a TOML file with `serde` +
//! `toml`, generalizing the teacher's `app.toml` board-description
//! convention (parsed with `serde`, describing the fixed wiring of a
//! build) to this gateway's runtime wiring: broker address, topic prefix,
//! and cadence periods.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub control: ControlConfig,
    /// Base MQTT topic every discovery/state/command topic is nested
    /// under. `original_source/main.py` hardcodes `"homeassistant"`.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    /// How often the control loop's `tick()` runs; the cadences
    /// themselves (mandatory/detail/write-back) are timed independently
    /// on top of this poll.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub syslog: SyslogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            control: ControlConfig::default(),
            topic_prefix: default_topic_prefix(),
            poll_interval_ms: default_poll_interval_ms(),
            syslog: SyslogConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// How often the gateway republishes discovery configs and state,
    /// per `MQTT_PUBLISH_MS` in `original_source/main.py`.
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            keepalive_secs: default_keepalive_secs(),
            publish_interval_ms: default_publish_interval_ms(),
        }
    }
}

/// Mirrors `otgw_control::Config`, minus the fields that aren't meant to
/// be end-user tunable (the retry/bus wiring is fixed by the installed
/// hardware, not by this file).
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub member_id: u8,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_mandatory_cycle_ms")]
    pub mandatory_cycle_ms: u64,
    #[serde(default = "default_detail_cycle_ms")]
    pub detail_cycle_ms: u64,
    #[serde(default = "default_write_cycle_ms")]
    pub write_cycle_ms: u64,
    #[serde(default = "default_backoff_cooldown_ms")]
    pub backoff_cooldown_ms: u64,
    #[serde(default = "default_max_relative_modulation_pct")]
    pub max_relative_modulation_pct: f32,
    #[serde(default)]
    pub max_ch_setpoint_celsius: Option<f32>,
    pub power_cycle_counter_data_id: Option<u8>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            member_id: 0,
            max_retries: default_max_retries(),
            mandatory_cycle_ms: default_mandatory_cycle_ms(),
            detail_cycle_ms: default_detail_cycle_ms(),
            write_cycle_ms: default_write_cycle_ms(),
            backoff_cooldown_ms: default_backoff_cooldown_ms(),
            max_relative_modulation_pct: default_max_relative_modulation_pct(),
            max_ch_setpoint_celsius: None,
            power_cycle_counter_data_id: None,
        }
    }
}

impl From<&ControlConfig> for otgw_control::Config {
    fn from(c: &ControlConfig) -> Self {
        otgw_control::Config {
            member_id: c.member_id,
            max_retries: c.max_retries,
            mandatory_cycle_ms: c.mandatory_cycle_ms,
            detail_cycle_ms: c.detail_cycle_ms,
            write_cycle_ms: c.write_cycle_ms,
            backoff_cooldown_ms: c.backoff_cooldown_ms,
            max_relative_modulation_pct: c.max_relative_modulation_pct,
            max_ch_setpoint_celsius: c.max_ch_setpoint_celsius,
            power_cycle_counter_data_id: c.power_cycle_counter_data_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyslogConfig {
    #[serde(default = "default_syslog_port")]
    pub port: u16,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            port: default_syslog_port(),
            hostname: default_hostname(),
        }
    }
}

fn default_topic_prefix() -> String {
    "homeassistant".to_string()
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_mqtt_host() -> String {
    "localhost".to_string()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "picotherm".to_string()
}
fn default_keepalive_secs() -> u64 {
    60
}
fn default_publish_interval_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    otgw_catalog::DEFAULT_MAX_RETRIES
}
fn default_mandatory_cycle_ms() -> u64 {
    900
}
fn default_detail_cycle_ms() -> u64 {
    10_000
}
fn default_write_cycle_ms() -> u64 {
    10_000
}
fn default_backoff_cooldown_ms() -> u64 {
    5_000
}
fn default_max_relative_modulation_pct() -> f32 {
    100.0
}
fn default_syslog_port() -> u16 {
    514
}
fn default_hostname() -> String {
    "picopower".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_fills_in_every_default() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.topic_prefix, "homeassistant");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.control.mandatory_cycle_ms, 900);
    }

    #[test]
    fn partial_document_overrides_only_what_it_names() {
        let toml_text = r#"
            topic_prefix = "ha"

            [mqtt]
            host = "broker.local"
        "#;
        let config: GatewayConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.topic_prefix, "ha");
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn control_config_maps_onto_control_loop_config() {
        let control = ControlConfig {
            power_cycle_counter_data_id: Some(117),
            ..ControlConfig::default()
        };
        let mapped: otgw_control::Config = (&control).into();
        assert_eq!(mapped.power_cycle_counter_data_id, Some(117));
        assert_eq!(mapped.mandatory_cycle_ms, 900);
    }
}
