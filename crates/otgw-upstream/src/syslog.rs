// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Syslog notification, faithfully porting `send_syslog()` from
//! `original_source/lib.py`: a single RFC 5424-shaped line, broadcast over
//! UDP to the local segment rather than sent to a configured collector,
//! since the original has no concept of a fixed syslog server address
//! either.

use std::net::UdpSocket;
use std::time::{SystemTime, UNIX_EPOCH};

/// Where the control loop and upstream adapter send human-readable
/// notifications. Mirrors `send_syslog`'s fire-and-forget semantics: a
/// send failure is swallowed by the implementation, not propagated, since
/// losing a log line must never interrupt the boiler/MQTT loops.
pub trait Syslog {
    fn send(&mut self, message: &str);
}

/// Discards every message; useful for tests and for `otgw-cli`, which has
/// no syslog collector to talk to.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSyslog;

impl Syslog for NullSyslog {
    fn send(&mut self, _message: &str) {}
}

const PRI: u32 = 13; // facility=user(1), severity=notice(5): (1<<3)|5
const VERSION: u32 = 1;

/// Broadcasts RFC 5424-shaped syslog lines over UDP, in the exact wire
/// format `send_syslog` hand-rolls: `<pri>version timestamp hostname
/// appname procid msgid - message\r\n`.
pub struct UdpSyslog {
    socket: UdpSocket,
    broadcast_addr: String,
    hostname: String,
    appname: String,
}

impl UdpSyslog {
    /// Binds an ephemeral UDP socket with `SO_BROADCAST` set, broadcasting
    /// to `255.255.255.255:{port}` the way the original does — this
    /// implementation doesn't target a specific collector IP, matching
    /// `send_syslog`'s own unconditional broadcast.
    pub fn new(port: u16, hostname: impl Into<String>, appname: impl Into<String>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            broadcast_addr: format!("255.255.255.255:{port}"),
            hostname: hostname.into(),
            appname: appname.into(),
        })
    }

    fn format_line(&self, message: &str) -> String {
        format!(
            "<{PRI}>{VERSION} {} {} {} - - - {message}\r\n",
            timestamp(),
            self.hostname,
            self.appname,
        )
    }
}

impl Syslog for UdpSyslog {
    fn send(&mut self, message: &str) {
        let line = self.format_line(message);
        if let Err(err) = self.socket.send_to(line.as_bytes(), &self.broadcast_addr) {
            log::warn!("syslog send failed: {err}");
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`, the same format `send_syslog` builds from
/// `time.localtime()` (here: UTC, since we have no reliable local
/// timezone database on a headless gateway).
fn timestamp() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs();
    let (year, month, day, hour, minute, second) = civil_from_unix(secs);
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Converts a Unix timestamp into a UTC civil date/time using Howard
/// Hinnant's `civil_from_days` algorithm, avoiding a `chrono`/`time`
/// dependency for one call site.
fn civil_from_unix(unix_secs: u64) -> (i64, u32, u32, u32, u32, u32) {
    let days = (unix_secs / 86_400) as i64;
    let rem = (unix_secs % 86_400) as u32;
    let (hour, minute, second) = (rem / 3600, (rem / 60) % 60, rem % 60);

    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = if month <= 2 { y + 1 } else { y };

    (year, month, day, hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_converts_to_1970_01_01() {
        assert_eq!(civil_from_unix(0), (1970, 1, 1, 0, 0, 0));
    }

    #[test]
    fn known_timestamp_converts_correctly() {
        // 2024-03-05T12:34:56Z
        assert_eq!(civil_from_unix(1_709_642_096), (2024, 3, 5, 12, 34, 56));
    }

    #[test]
    fn wire_format_matches_rfc5424_shape() {
        let sink = UdpSyslog::new(514, "picopower", "otgw-gateway").unwrap();
        let line = sink.format_line("FAULT DETECTED: boiler fault active");
        assert!(line.starts_with("<13>1 "));
        assert!(line.ends_with("FAULT DETECTED: boiler fault active\r\n"));
        assert!(line.contains("picopower"));
        assert!(line.contains("otgw-gateway"));
    }

    #[test]
    fn null_syslog_discards_everything() {
        let mut sink = NullSyslog;
        sink.send("anything");
    }
}
