//! Classification of captured frames.

use crate::network::{EthernetHeader, Frame, LayerDecoder, is_dns_query};

/// A captured frame together with what the decoder learned about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedRecord {
    /// The frame as captured. Its bytes are reused when reflecting.
    pub frame: Frame,
    /// Link-layer addresses. Reflection rewrites these, not the frame bytes.
    pub header: EthernetHeader,
    pub is_ipv6: bool,
    pub is_query: bool,
}

/// Decode and classify one frame.
///
/// Returns `None` when the frame has no Ethernet layer. Every other frame
/// yields a record, query or not, so the consumer can apply its own policy.
pub fn classify(frame: Frame) -> Option<ClassifiedRecord> {
    let decoder = LayerDecoder::new(&frame.data);
    let header = decoder.ethernet()?;
    let is_ipv6 = decoder.is_ipv6();
    let is_query = is_dns_query(decoder.udp_payload());

    Some(ClassifiedRecord {
        frame,
        header,
        is_ipv6,
        is_query,
    })
}

/// Whether a raw frame should be reflected: it has an Ethernet layer and its
/// UDP payload is a DNS query.
pub fn is_reflection_candidate(frame: &[u8]) -> bool {
    let decoder = LayerDecoder::new(frame);
    decoder.ethernet().is_some() && is_dns_query(decoder.udp_payload())
}
