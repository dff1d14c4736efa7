// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wi-Fi association, out of scope for the core per spec.md §1 — the
//! original's `do_connect()` drives a vendor MicroPython WLAN driver this
//! repository has no equivalent of. This trait exists only so
//! `otgw-gateway` has a named seam to call at startup; the host-side
//! implementation is a no-op, since a host running this gateway is already
//! on the network by the time the binary starts.

pub trait WifiAssociator {
    type Error;

    /// Ensures network connectivity is established before the control loop
    /// and MQTT adapter start. Blocks until associated (or fails), the way
    /// `do_connect()` loops until `sta_if.isconnected()`.
    fn associate(&mut self) -> Result<(), Self::Error>;
}

/// Always reports success immediately: on a host, association happens
/// below this process (a wired link, or a Wi-Fi driver managed by the OS),
/// so there is nothing for this gateway to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpWifi;

impl WifiAssociator for NoOpWifi {
    type Error = core::convert::Infallible;

    fn associate(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_op_wifi_always_succeeds() {
        let mut wifi = NoOpWifi;
        assert!(wifi.associate().is_ok());
    }
}
