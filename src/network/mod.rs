//! Network-related modules for frame capture, decoding and injection.

mod buffer;
pub mod capture;
pub mod decode;
mod filter;

pub use buffer::{BufferPool, MAX_FRAME_SIZE, PooledBuffer};
pub use capture::{
    CaptureSession, Frame, FrameCapture, FrameSender, PcapCapture, PcapSender, find_interface,
    local_mac,
};
pub use decode::{EthernetHeader, LayerDecoder, is_dns_query};
pub use filter::{CaptureFilter, MDNS_PORT};
