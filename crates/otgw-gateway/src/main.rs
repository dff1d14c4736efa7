// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The OpenTherm-to-MQTT gateway binary: loads [`GatewayConfig`], wires a
//! [`LineDriver`] backend to [`otgw_control::ControlLoop`], and runs a
//! single-threaded cooperative event loop with two cooperating tasks —
//! the control loop and the MQTT adapter — per spec.md §5. They share the
//! boiler shadow without a `Mutex`: both run on the same `tokio`
//! current-thread task, so there is no point at which they can observe a
//! torn write, matching `original_source/main.py`'s
//! `asyncio.gather(boiler(), mqtt())` model.
//!
//! The MQTT command handler ([`apply_command`]) only ever writes into the
//! control loop's shadow via its setters; it never touches the bus.

mod config;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use config::GatewayConfig;
use otgw_control::{Clock, ControlLoop, FaultEvent, FaultSink};
use otgw_upstream::mqtt::parse_command;
use otgw_upstream::syslog::{Syslog, UdpSyslog};
use otgw_upstream::wifi::{NoOpWifi, WifiAssociator};
use otgw_upstream::{discovery, mqtt};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the gateway's TOML configuration file. Missing file falls
    /// back to every built-in default (see `config::GatewayConfig`).
    #[arg(long, default_value = "otgw-gateway.toml")]
    config: PathBuf,
}

/// A monotonic millisecond clock backed by [`std::time::Instant`], the
/// hosted stand-in for the teacher's `sys_get_timer` syscall (spec.md §3's
/// "additional ambient data" note).
struct SystemClock(Instant);

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

/// Forwards control-loop [`FaultEvent`]s to the `log` crate and, for the
/// subset that represent actual boiler malfunctions, to syslog with a
/// human-readable summary — spec.md §7: "boiler faults ... emitted to the
/// syslog sink with a human-readable summary; bus failures are logged but
/// not surfaced as upstream faults".
struct GatewayFaultSink<S> {
    syslog: S,
}

impl<S: Syslog> FaultSink for GatewayFaultSink<S> {
    fn notify(&mut self, event: FaultEvent) {
        match event {
            FaultEvent::FaultDetected => {
                log::warn!("boiler fault flag set");
                self.syslog.send("FAULT DETECTED: boiler reports a fault condition");
            }
            FaultEvent::FaultCleared => {
                log::info!("boiler fault flag cleared");
                self.syslog.send("FAULT CLEARED: boiler fault condition resolved");
            }
            FaultEvent::SpecificFaultDetected(fault) => {
                log::warn!("specific fault detected: {fault:?}");
                self.syslog.send(&format!("FAULT DETECTED: {fault:?}"));
            }
            FaultEvent::SpecificFaultCleared(fault) => {
                log::info!("specific fault cleared: {fault:?}");
                self.syslog.send(&format!("FAULT CLEARED: {fault:?}"));
            }
            FaultEvent::BoilerRestartDetected => {
                log::info!("boiler restart detected; re-negotiating");
            }
            FaultEvent::BusFault => {
                log::error!("line driver fault; entering BACKOFF");
            }
            FaultEvent::BackoffEntered => {
                log::warn!("control loop backing off");
            }
            FaultEvent::NegotiateStepFailed(step) => {
                log::warn!("NEGOTIATE step failed, continuing: {step:?}");
            }
            FaultEvent::DetailReadUnsupported { data_id } => {
                log::debug!("boiler does not support data-id {data_id}");
            }
            FaultEvent::ExchangeIgnored { data_id } => {
                log::debug!("transient exchange failure on data-id {data_id}, will retry next cycle");
            }
        }
    }
}

#[cfg(feature = "mock")]
fn open_bus(_cfg: &GatewayConfig) -> Result<otgw_line_driver::mock::MockLineDriver> {
    log::warn!("using the in-memory mock bus: no real boiler is attached");
    Ok(otgw_line_driver::mock::MockLineDriver::new())
}

#[cfg(all(feature = "rp2040", not(feature = "mock")))]
compile_error!(
    "the rp2040 backend cannot be driven from otgw-gateway's hosted std/tokio binary: \
     `Rp2040LineDriver` owns two PIO state machines and needs `pac::Peripherals` and board \
     clocks this binary has no access to on bare metal. Build a separate #![no_std] #![no_main] \
     binary that constructs otgw_line_driver::rp2040::Rp2040LineDriver directly and links \
     otgw-control/otgw-catalog the same way this one does; this `rp2040` feature only exists so \
     `cargo build -p otgw-line-driver --features rp2040` can compile that backend in isolation."
);

/// Applies one decoded MQTT [`mqtt::Command`] to the control loop's shadow.
/// Never issues bus traffic directly, per spec.md §5.
fn apply_command<C: Clock>(control: &mut ControlLoop<C>, command: mqtt::Command) {
    match command {
        mqtt::Command::ChEnabled(v) => control.set_ch_enabled(v),
        mqtt::Command::DhwEnabled(v) => control.set_dhw_enabled(v),
        mqtt::Command::ChSetpoint(v) => control.request_ch_setpoint(v),
        mqtt::Command::DhwSetpoint(v) => control.request_dhw_setpoint(v),
    }
}

/// Publishes Home Assistant discovery configs once, retained, so they
/// survive a broker restart without the gateway needing to republish them
/// on every connection. Mirrors `original_source/main.py`'s one-time
/// `mqtt_config()` call.
fn publish_discovery(client: &AsyncClient, prefix: &str, shadow: &otgw_catalog::shadow::BoilerShadow) -> Result<()> {
    for (topic, payload) in discovery::discovery_entries(prefix, shadow) {
        let body = serde_json::to_vec(&payload).context("serializing discovery payload")?;
        client
            .try_publish(topic, QoS::AtLeastOnce, true, body)
            .context("publishing discovery config")?;
    }
    Ok(())
}

/// Publishes every state topic reflecting the current shadow. Called on
/// the configured publish cadence, mirroring `mqtt_publish()`.
fn publish_state(client: &AsyncClient, prefix: &str, shadow: &otgw_catalog::shadow::BoilerShadow) -> Result<()> {
    for (topic, payload) in discovery::state_entries(prefix, shadow) {
        client
            .try_publish(topic, QoS::AtLeastOnce, false, payload.into_bytes())
            .context("publishing state")?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = if args.config.exists() {
        GatewayConfig::load(&args.config)?
    } else {
        log::info!("no config file at {}, using defaults", args.config.display());
        GatewayConfig::default()
    };

    let mut wifi = NoOpWifi;
    wifi.associate().expect("NoOpWifi::associate is infallible");

    let mut bus = open_bus(&cfg)?;

    let syslog = UdpSyslog::new(cfg.syslog.port, &cfg.syslog.hostname, "otgw-gateway")
        .context("binding syslog broadcast socket")?;
    let mut fault_sink = GatewayFaultSink { syslog };

    let mut control = ControlLoop::new((&cfg.control).into(), SystemClock(Instant::now()));

    let mut mqtt_options = MqttOptions::new(&cfg.mqtt.client_id, &cfg.mqtt.host, cfg.mqtt.port);
    mqtt_options.set_keep_alive(Duration::from_secs(cfg.mqtt.keepalive_secs));
    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 64);

    for topic in discovery::command_topics(&cfg.topic_prefix) {
        client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .context("subscribing to command topic")?;
    }
    publish_discovery(&client, &cfg.topic_prefix, control.shadow())?;

    let mut poll_ticker = tokio::time::interval(Duration::from_millis(cfg.poll_interval_ms));
    let mut publish_ticker = tokio::time::interval(Duration::from_millis(cfg.mqtt.publish_interval_ms));
    let mut last_published_shadow: Option<otgw_catalog::shadow::BoilerShadow> = None;

    loop {
        tokio::select! {
            _ = poll_ticker.tick() => {
                control.tick(&mut bus, &mut fault_sink);
            }
            _ = publish_ticker.tick() => {
                // Publish on the heartbeat cadence even if nothing changed
                // (spec.md §6: "on change (or on a <=60s heartbeat)"); the
                // shadow comparison below additionally lets a future
                // change-triggered publish short-circuit the heartbeat
                // without duplicating this call site.
                if let Err(err) = publish_state(&client, &cfg.topic_prefix, control.shadow()) {
                    log::warn!("state publish failed: {err:#}");
                }
                last_published_shadow = Some(control.shadow().clone());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                        match parse_command(&cfg.topic_prefix, &publish.topic, &payload) {
                            Ok(Some(command)) => apply_command(&mut control, command),
                            Ok(None) => {}
                            Err(invalid) => log::warn!(
                                "ignoring unparseable payload on {}: {:?}",
                                invalid.topic, invalid.payload
                            ),
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::warn!("mqtt event loop error: {err:#}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        if last_published_shadow.as_ref() != Some(control.shadow()) {
            if let Err(err) = publish_state(&client, &cfg.topic_prefix, control.shadow()) {
                log::warn!("state publish failed: {err:#}");
            }
            last_published_shadow = Some(control.shadow().clone());
        }
    }
}
