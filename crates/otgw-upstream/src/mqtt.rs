// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The publish/subscribe seam between the upstream adapter and whatever
//! MQTT client library ends up wired in, following the teacher's
//! `drv-i2c-api` convention of a narrow trait fronting the concrete
//! implementation. `otgw-gateway` is the only crate that names `rumqttc`
//! directly; everything here is client-agnostic so discovery/command
//! parsing can be tested without a broker.

/// A destination for published state and a source of subscribed commands.
/// Implementations decide how publish/subscribe map onto their client's
/// actual API and QoS.
pub trait MqttSink {
    type Error;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error>;

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;
}

/// A command decoded from an inbound MQTT message, per the four command
/// topics `original_source/main.py`'s `mqtt_callback` handles. Parsing is
/// kept separate from applying the command to a [`otgw_control::ControlLoop`]
/// (done by the caller) so this crate doesn't need to depend on the control
/// loop's generic `Clock` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ChEnabled(bool),
    ChSetpoint(f32),
    DhwEnabled(bool),
    DhwSetpoint(f32),
}

/// Why an inbound message on a recognized command topic couldn't be
/// turned into a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidPayload {
    pub topic: String,
    pub payload: String,
}

/// Classifies one inbound `(topic, payload)` pair against the four command
/// topics under `prefix`. Returns `Ok(None)` for a topic this gateway
/// doesn't subscribe to (should not normally happen, since the adapter only
/// subscribes to the four it handles); returns `Err` for a recognized topic
/// whose payload didn't parse, mirroring `mqtt_callback`'s `except
/// ValueError` branches.
pub fn parse_command(prefix: &str, topic: &str, payload: &str) -> Result<Option<Command>, InvalidPayload> {
    let invalid = || InvalidPayload {
        topic: topic.to_string(),
        payload: payload.to_string(),
    };

    if topic == format!("{prefix}/switch/boilerCHEnabled/command") {
        return Ok(parse_on_off(payload).map(Command::ChEnabled));
    }
    if topic == format!("{prefix}/switch/boilerDHWEnabled/command") {
        return Ok(parse_on_off(payload).map(Command::DhwEnabled));
    }
    if topic == format!("{prefix}/number/boilerCHFlowTemperatureSetpoint/command") {
        return payload.parse::<f32>().map(|v| Some(Command::ChSetpoint(v))).map_err(|_| invalid());
    }
    if topic == format!("{prefix}/number/boilerDHWFlowTemperatureSetpoint/command") {
        return payload.parse::<f32>().map(|v| Some(Command::DhwSetpoint(v))).map_err(|_| invalid());
    }
    Ok(None)
}

fn parse_on_off(payload: &str) -> Option<bool> {
    match payload {
        "ON" => Some(true),
        "OFF" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_switch_commands() {
        assert_eq!(
            parse_command("homeassistant", "homeassistant/switch/boilerCHEnabled/command", "ON"),
            Ok(Some(Command::ChEnabled(true)))
        );
        assert_eq!(
            parse_command("homeassistant", "homeassistant/switch/boilerDHWEnabled/command", "OFF"),
            Ok(Some(Command::DhwEnabled(false)))
        );
    }

    #[test]
    fn parses_number_commands() {
        assert_eq!(
            parse_command("homeassistant", "homeassistant/number/boilerCHFlowTemperatureSetpoint/command", "42.5"),
            Ok(Some(Command::ChSetpoint(42.5)))
        );
    }

    #[test]
    fn rejects_unparseable_setpoint() {
        let result = parse_command("homeassistant", "homeassistant/number/boilerDHWFlowTemperatureSetpoint/command", "hot");
        assert_eq!(
            result,
            Err(InvalidPayload {
                topic: "homeassistant/number/boilerDHWFlowTemperatureSetpoint/command".to_string(),
                payload: "hot".to_string(),
            })
        );
    }

    #[test]
    fn ignores_garbage_on_off_without_erroring() {
        // main.py silently ignores a switch payload that's neither ON nor OFF.
        assert_eq!(
            parse_command("homeassistant", "homeassistant/switch/boilerCHEnabled/command", "MAYBE"),
            Ok(None)
        );
    }

    #[test]
    fn unrelated_topic_is_none() {
        assert_eq!(parse_command("homeassistant", "some/other/topic", "x"), Ok(None));
    }
}
