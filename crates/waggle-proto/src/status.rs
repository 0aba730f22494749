//! Human-readable status code tables, used when logging module traffic.

/// Text for a transmit status code.
#[must_use]
pub fn tx_status_text(code: u8) -> &'static str {
    match code {
        0x00 => "success",
        0x01 => "MAC ACK failure",
        0x02 => "CCA failure",
        0x15 => "invalid destination endpoint",
        0x21 => "network ACK failure",
        0x22 => "not joined to network",
        0x23 => "self-addressed",
        0x24 => "address not found",
        0x25 => "route not found",
        0x26 => "failed to hear neighbor relay",
        0x2B => "invalid binding table index",
        0x2C | 0x32 => "resource error",
        0x2E => "attempted broadcast with APS transmission",
        0x74 => "payload too large",
        0x75 => "indirect message unrequested",
        _ => "unknown transmit status",
    }
}

/// Text for a modem status code.
#[must_use]
pub fn modem_status_text(code: u8) -> &'static str {
    match code {
        0x00 => "successfully formed or joined a network",
        0x21 => "scan found no PANs",
        0x22 => "scan found no valid PANs with the current settings",
        0x23 => "coordinator or routers found, but join window expired",
        0x24 => "no joinable beacons were found",
        0x25 => "unexpected state, node should not be joining now",
        0x27 => "node joining attempt failed",
        0x2A => "coordinator start attempt failed",
        0x2B => "checking for an existing coordinator",
        0x2C => "attempt to leave the network failed",
        0xAB => "attempted to join a device that did not respond",
        0xAC => "secure join error: network security key received unsecured",
        0xAD => "secure join error: network security key not received",
        0xAF => "secure join error: wrong preconfigured link key",
        0xFF => "scanning for a network",
        _ => "unknown modem status",
    }
}
