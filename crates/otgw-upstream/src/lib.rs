// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The thin glue around the core OpenTherm stack: MQTT publish/subscribe,
//! Home Assistant discovery payloads, syslog notification, and a Wi-Fi
//! association seam, per spec.md §1/§6. Unlike the `no_std` core crates,
//! this one is `std`: it exists entirely to talk to the outside world.
//!
//! `otgw-gateway` wires concrete implementations ([`mqtt::MqttSink`] via
//! `rumqttc`, [`syslog::UdpSyslog`]) into the control loop's output; nothing
//! in this crate touches the OpenTherm bus directly.

pub mod discovery;
pub mod mqtt;
pub mod syslog;
pub mod wifi;
