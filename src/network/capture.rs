//! Live capture abstraction.
//!
//! Provides a trait-based abstraction over the capture handle to enable:
//! - Testing without real network interfaces
//! - Different capture backends
//!
//! The production backend is libpcap. A libpcap handle needs exclusive access
//! for both reading and injecting, so [`CaptureSession`] opens two handles on
//! the same device: a filtered reader and an injector. Each half is owned by
//! exactly one task and no lock is shared between them.

use std::time::Duration;

use pcap::{Active, Capture};
use pnet::datalink::{self, NetworkInterface};
use pnet::util::MacAddr;
use tracing::debug;

use super::filter::CaptureFilter;
use crate::config::CaptureSettings;
use crate::error::{NetworkError, Result};

/// A captured link-layer frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Raw bytes as delivered by the capture handle.
    pub data: Vec<u8>,
    /// Capture timestamp, relative to the Unix epoch.
    pub timestamp: Duration,
    /// Length of the frame on the wire. Larger than `data.len()` when truncated by the snap length.
    pub wire_len: u32,
}

impl Frame {
    /// Build a frame from bytes with no capture metadata.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let wire_len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            data,
            timestamp: Duration::ZERO,
            wire_len,
        }
    }

    /// Whether the capture handle cut this frame short.
    pub fn is_truncated(&self) -> bool {
        (self.data.len() as u64) < u64::from(self.wire_len)
    }
}

/// Trait for frame capture implementations.
pub trait FrameCapture: Send {
    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the read timeout expired without a frame, so the
    /// caller gets a chance to observe shutdown. Returns an error when the
    /// source is exhausted or broken; the caller must not read again after that.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Trait for frame injection implementations.
pub trait FrameSender: Send {
    /// Write a raw frame onto the wire.
    fn send(&mut self, frame: &[u8]) -> Result<()>;
}

/// Find the named interface in the OS interface list.
pub fn find_interface(name: &str) -> Result<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| {
            NetworkError::InterfaceUnavailable {
                name: name.to_string(),
                reason: "no such interface".into(),
            }
            .into()
        })
}

/// Hardware address of the interface, used both in the capture filter and as
/// the rewritten source of reflected frames.
pub fn local_mac(interface: &NetworkInterface) -> Result<MacAddr> {
    interface
        .mac
        .filter(|mac| *mac != MacAddr::zero())
        .ok_or_else(|| {
            NetworkError::NoHardwareAddress {
                name: interface.name.clone(),
            }
            .into()
        })
}

/// A live libpcap session on one interface.
///
/// The session must have a filter installed before it can be split into its
/// reading and writing halves.
pub struct CaptureSession {
    interface: String,
    reader: Capture<Active>,
    injector: Capture<Active>,
    filter: Option<CaptureFilter>,
}

impl CaptureSession {
    /// Open the interface for live capture and injection.
    pub fn open(interface: &str, settings: &CaptureSettings) -> Result<Self> {
        let unavailable = |err: pcap::Error| NetworkError::InterfaceUnavailable {
            name: interface.to_string(),
            reason: err.to_string(),
        };

        let reader = Capture::from_device(interface)
            .and_then(|cap| {
                cap.promisc(settings.promiscuous)
                    .snaplen(settings.snap_len)
                    .timeout(settings.read_timeout_ms)
                    .open()
            })
            .map_err(unavailable)?;

        // The injector never reads, so it needs no buffering beyond the defaults.
        let injector = Capture::from_device(interface)
            .and_then(|cap| cap.snaplen(settings.snap_len).open())
            .map_err(unavailable)?;

        debug!(
            interface,
            snap_len = settings.snap_len,
            promiscuous = settings.promiscuous,
            "capture session opened"
        );

        Ok(Self {
            interface: interface.to_string(),
            reader,
            injector,
            filter: None,
        })
    }

    /// Install the kernel-level filter on the reading handle.
    pub fn set_filter(&mut self, filter: &CaptureFilter) -> Result<()> {
        self.reader
            .filter(filter.as_str(), true)
            .map_err(|err| NetworkError::FilterCompile {
                filter: filter.to_string(),
                reason: err.to_string(),
            })?;
        debug!(interface = %self.interface, %filter, "capture filter installed");
        self.filter = Some(filter.clone());
        Ok(())
    }

    /// Name of the captured interface.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Split into the reading half and the writing half.
    ///
    /// Fails with [`NetworkError::FilterMissing`] when no filter was installed.
    pub fn split(self) -> Result<(PcapCapture, PcapSender)> {
        if self.filter.is_none() {
            return Err(NetworkError::FilterMissing.into());
        }
        Ok((
            PcapCapture {
                handle: self.reader,
            },
            PcapSender {
                handle: self.injector,
            },
        ))
    }
}

/// Production frame capture using libpcap.
pub struct PcapCapture {
    handle: Capture<Active>,
}

impl FrameCapture for PcapCapture {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        match self.handle.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let timestamp = Duration::from_secs(u64::try_from(ts.tv_sec).unwrap_or_default())
                    + Duration::from_micros(u64::try_from(ts.tv_usec).unwrap_or_default());
                Ok(Some(Frame {
                    data: packet.data.to_vec(),
                    timestamp,
                    wire_len: packet.header.len,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(pcap::Error::NoMorePackets) => Err(NetworkError::CaptureClosed.into()),
            Err(err) => Err(NetworkError::Capture(err.to_string()).into()),
        }
    }
}

/// Production frame injection using libpcap.
pub struct PcapSender {
    handle: Capture<Active>,
}

impl FrameSender for PcapSender {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.handle
            .sendpacket(frame)
            .map_err(|err| NetworkError::Write(err.to_string()))?;
        Ok(())
    }
}
