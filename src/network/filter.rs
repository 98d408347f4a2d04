//! Kernel-level capture filter.

use std::fmt;

use pnet::util::MacAddr;

/// UDP port used by multicast DNS.
pub const MDNS_PORT: u16 = 5353;

/// BPF predicate installed on the capture handle.
///
/// Drops frames sourced from the local interface, so reflected frames are
/// never captured again, and keeps only UDP traffic to the mDNS port. Built
/// once at startup; an address change on the interface needs a restart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureFilter {
    expression: String,
}

impl CaptureFilter {
    /// Build the filter for the given local hardware address.
    pub fn for_local_mac(local_mac: MacAddr) -> Self {
        Self {
            expression: format!("not (ether src {local_mac}) and udp dst port {MDNS_PORT}"),
        }
    }

    /// Use an arbitrary BPF expression.
    pub fn from_expression(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for CaptureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
