//! Link-layer rewrite and re-injection of classified frames.

use pnet::packet::ethernet::MutableEthernetPacket;
use pnet::util::MacAddr;
use tracing::trace;

use super::classify::ClassifiedRecord;
use crate::error::{NetworkError, Result};
use crate::network::{BufferPool, FrameSender, PooledBuffer};

/// Destination MAC of the mDNS IPv4 group 224.0.0.251.
pub const MDNS_IPV4_MAC: MacAddr = MacAddr(0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb);
/// Destination MAC of the mDNS IPv6 group ff02::fb.
pub const MDNS_IPV6_MAC: MacAddr = MacAddr(0x33, 0x33, 0x00, 0x00, 0x00, 0xfb);

/// Multicast destination for a frame of the given address family.
///
/// Anything that is not IPv6 gets the IPv4 group address, including frames
/// with no IP layer at all.
pub const fn multicast_destination(is_ipv6: bool) -> MacAddr {
    if is_ipv6 { MDNS_IPV6_MAC } else { MDNS_IPV4_MAC }
}

impl ClassifiedRecord {
    /// Point the record at the mDNS group, sourced from `local_mac`.
    pub fn rewrite_addresses(&mut self, local_mac: MacAddr) {
        self.header.source = local_mac;
        self.header.destination = multicast_destination(self.is_ipv6);
    }
}

/// Re-emits classified records from the local interface.
///
/// Uses a buffer pool so that each reflection copies into a recycled buffer
/// instead of a fresh allocation.
#[derive(Clone)]
pub struct Reflector {
    local_mac: MacAddr,
    buffer_pool: BufferPool,
}

impl Reflector {
    pub const fn new(local_mac: MacAddr, buffer_pool: BufferPool) -> Self {
        Self {
            local_mac,
            buffer_pool,
        }
    }

    pub const fn local_mac(&self) -> MacAddr {
        self.local_mac
    }

    /// Serialize the record's frame with its current header.
    ///
    /// Fails when the captured bytes cannot be turned back into a complete
    /// frame: no room for an Ethernet header, or the capture was truncated
    /// by the snap length.
    pub fn serialize(&self, record: &ClassifiedRecord) -> Result<PooledBuffer> {
        let frame = &record.frame;
        if frame.is_truncated() {
            return Err(NetworkError::Serialization(format!(
                "frame truncated by capture: {} of {} bytes",
                frame.data.len(),
                frame.wire_len
            ))
            .into());
        }

        let mut buffer = self.buffer_pool.get();
        buffer.fill_from(&frame.data);

        {
            let mut ethernet =
                MutableEthernetPacket::new(buffer.as_mut_slice()).ok_or_else(|| {
                    NetworkError::Serialization(format!(
                        "{} bytes cannot hold an Ethernet header",
                        frame.data.len()
                    ))
                })?;
            ethernet.set_source(record.header.source);
            ethernet.set_destination(record.header.destination);
        }

        Ok(buffer)
    }

    /// Rewrite the record's addresses, serialize it and write it out.
    ///
    /// Write failures are returned as-is; nothing is retried.
    pub fn reflect<S: FrameSender>(
        &self,
        sender: &mut S,
        record: &mut ClassifiedRecord,
    ) -> Result<()> {
        record.rewrite_addresses(self.local_mac);
        let buffer = self.serialize(record)?;
        sender.send(buffer.as_slice())?;
        trace!(
            destination = %record.header.destination,
            len = buffer.len(),
            "frame reflected"
        );
        Ok(())
    }
}
