//! Lazy layer decoding.
//!
//! [`LayerDecoder`] wraps the raw bytes of a frame and parses a layer only
//! when one of its accessors asks for it. Frames that fail early (no Ethernet
//! header, wrong ethertype) never pay for IP or UDP parsing.

use hickory_proto::op::{Message, MessageType};
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::udp::UdpPacket;
use pnet::packet::vlan::VlanPacket;
use pnet::util::MacAddr;

/// Ethernet header size in bytes.
pub const ETHERNET_HEADER_SIZE: usize = 14;
/// 802.1Q tag size in bytes.
const VLAN_TAG_SIZE: usize = 4;
/// IPv4 header size in bytes (without options).
const IPV4_MIN_HEADER_SIZE: usize = 20;
/// IPv6 header size in bytes.
const IPV6_HEADER_SIZE: usize = 40;
/// UDP header size in bytes.
const UDP_HEADER_SIZE: usize = 8;
/// Stacked tags accepted before the network layer (802.1ad outer + 802.1Q inner).
const MAX_VLAN_TAGS: usize = 2;

/// Link-layer addresses of a frame, owned and freely mutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EthernetHeader {
    pub source: MacAddr,
    pub destination: MacAddr,
}

/// On-demand view over the layers of one frame.
#[derive(Clone, Copy, Debug)]
pub struct LayerDecoder<'a> {
    frame: &'a [u8],
}

impl<'a> LayerDecoder<'a> {
    pub const fn new(frame: &'a [u8]) -> Self {
        Self { frame }
    }

    /// Source and destination MAC, or `None` when no Ethernet header parses.
    pub fn ethernet(&self) -> Option<EthernetHeader> {
        let ethernet = EthernetPacket::new(self.frame)?;
        Some(EthernetHeader {
            source: ethernet.get_source(),
            destination: ethernet.get_destination(),
        })
    }

    /// True iff an IPv6 header is present.
    ///
    /// Frames without any IP layer report `false` and are therefore addressed
    /// like IPv4 when reflected.
    pub fn is_ipv6(&self) -> bool {
        matches!(
            self.network_layer(),
            Some((EtherTypes::Ipv6, offset)) if Ipv6Packet::new(&self.frame[offset..]).is_some()
        )
    }

    /// Payload of the UDP datagram carried by the frame, if any.
    ///
    /// Bounded by the IP and UDP length fields, so Ethernet padding is never
    /// part of the payload. A frame cut short by the snap length yields what
    /// was captured.
    pub fn udp_payload(&self) -> Option<&'a [u8]> {
        let segment = self.udp_segment()?;
        let udp = UdpPacket::new(segment)?;
        let datagram_len = usize::from(udp.get_length());
        let end = if datagram_len >= UDP_HEADER_SIZE {
            datagram_len.min(segment.len())
        } else {
            segment.len()
        };
        segment.get(UDP_HEADER_SIZE..end)
    }

    /// Ethertype of the network layer and its offset, skipping VLAN tags.
    fn network_layer(&self) -> Option<(EtherType, usize)> {
        let ethernet = EthernetPacket::new(self.frame)?;
        let mut ethertype = ethernet.get_ethertype();
        let mut offset = ETHERNET_HEADER_SIZE;

        for _ in 0..MAX_VLAN_TAGS {
            if ethertype != EtherTypes::Vlan && ethertype != EtherTypes::QinQ {
                break;
            }
            let tag = VlanPacket::new(self.frame.get(offset..)?)?;
            ethertype = tag.get_ethertype();
            offset += VLAN_TAG_SIZE;
        }

        Some((ethertype, offset))
    }

    /// The UDP header and payload, bounded by the IP length fields.
    fn udp_segment(&self) -> Option<&'a [u8]> {
        let (ethertype, offset) = self.network_layer()?;
        let ip = self.frame.get(offset..)?;

        let (start, end) = match ethertype {
            EtherTypes::Ipv4 => {
                let ipv4 = Ipv4Packet::new(ip)?;
                if ipv4.get_next_level_protocol() != IpNextHeaderProtocols::Udp
                    || ipv4.get_fragment_offset() != 0
                {
                    return None;
                }
                let header_len = usize::from(ipv4.get_header_length()) * 4;
                let total_len = usize::from(ipv4.get_total_length());
                if header_len < IPV4_MIN_HEADER_SIZE || total_len < header_len {
                    return None;
                }
                (offset + header_len, offset + total_len)
            }
            EtherTypes::Ipv6 => {
                let ipv6 = Ipv6Packet::new(ip)?;
                if ipv6.get_next_header() != IpNextHeaderProtocols::Udp {
                    return None;
                }
                let start = offset + IPV6_HEADER_SIZE;
                (start, start + usize::from(ipv6.get_payload_length()))
            }
            _ => return None,
        };

        self.frame.get(start..end.min(self.frame.len()))
    }
}

/// Whether `payload` is a well-formed DNS message with the QR flag clear.
///
/// Absent or unparseable payloads are never queries.
pub fn is_dns_query(payload: Option<&[u8]>) -> bool {
    payload
        .and_then(|bytes| Message::from_vec(bytes).ok())
        .is_some_and(|message| message.message_type() == MessageType::Query)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    use hickory_proto::op::{OpCode, Query};
    use hickory_proto::rr::{Name, RecordType};
    use hickory_proto::serialize::binary::BinEncodable;
    use pnet::packet::ethernet::MutableEthernetPacket;
    use pnet::packet::ipv4::{self, MutableIpv4Packet};
    use pnet::packet::ipv6::MutableIpv6Packet;
    use pnet::packet::udp::{self, MutableUdpPacket};
    use pnet::packet::vlan::MutableVlanPacket;

    pub const IPV4_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
    pub const IPV6_GROUP: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

    fn message(message_type: MessageType) -> Vec<u8> {
        let mut message = Message::new();
        message
            .set_id(0)
            .set_message_type(message_type)
            .set_op_code(OpCode::Query);
        message.add_query(Query::query(
            Name::from_ascii("_airplay._tcp.local.").unwrap(),
            RecordType::PTR,
        ));
        message.to_vec().unwrap()
    }

    /// DNS payload of an mDNS PTR question.
    pub fn query_payload() -> Vec<u8> {
        message(MessageType::Query)
    }

    /// DNS payload of an mDNS response.
    pub fn response_payload() -> Vec<u8> {
        message(MessageType::Response)
    }

    fn write_udp(buffer: &mut [u8], dst_port: u16, payload: &[u8]) {
        let mut udp = MutableUdpPacket::new(buffer).unwrap();
        udp.set_source(5353);
        udp.set_destination(dst_port);
        udp.set_length((UDP_HEADER_SIZE + payload.len()) as u16);
        udp.set_payload(payload);
    }

    fn write_ipv4(buffer: &mut [u8], dst_port: u16, payload: &[u8]) {
        {
            let mut ip = MutableIpv4Packet::new(&mut buffer[..IPV4_MIN_HEADER_SIZE]).unwrap();
            ip.set_version(4);
            ip.set_header_length(5);
            ip.set_total_length((IPV4_MIN_HEADER_SIZE + UDP_HEADER_SIZE + payload.len()) as u16);
            ip.set_ttl(255);
            ip.set_next_level_protocol(IpNextHeaderProtocols::Udp);
            ip.set_source(Ipv4Addr::new(192, 168, 20, 7));
            ip.set_destination(IPV4_GROUP);
            let checksum = ipv4::checksum(&ip.to_immutable());
            ip.set_checksum(checksum);
        }
        write_udp(&mut buffer[IPV4_MIN_HEADER_SIZE..], dst_port, payload);
    }

    /// Ethernet + IPv4 + UDP frame addressed to the mDNS IPv4 group.
    pub fn ipv4_mdns_frame(source: MacAddr, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let len = ETHERNET_HEADER_SIZE + IPV4_MIN_HEADER_SIZE + UDP_HEADER_SIZE + payload.len();
        let mut buffer = vec![0u8; len];
        {
            let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
            eth.set_source(source);
            eth.set_destination(MacAddr::new(0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb));
            eth.set_ethertype(EtherTypes::Ipv4);
        }
        write_ipv4(&mut buffer[ETHERNET_HEADER_SIZE..], dst_port, payload);
        buffer
    }

    /// Ethernet + IPv6 + UDP frame addressed to the mDNS IPv6 group.
    pub fn ipv6_mdns_frame(source: MacAddr, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let len = ETHERNET_HEADER_SIZE + IPV6_HEADER_SIZE + UDP_HEADER_SIZE + payload.len();
        let mut buffer = vec![0u8; len];
        let src_ip = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 7);
        {
            let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
            eth.set_source(source);
            eth.set_destination(MacAddr::new(0x33, 0x33, 0x00, 0x00, 0x00, 0xfb));
            eth.set_ethertype(EtherTypes::Ipv6);
        }
        {
            let mut ip = MutableIpv6Packet::new(&mut buffer[ETHERNET_HEADER_SIZE..]).unwrap();
            ip.set_version(6);
            ip.set_payload_length((UDP_HEADER_SIZE + payload.len()) as u16);
            ip.set_next_header(IpNextHeaderProtocols::Udp);
            ip.set_hop_limit(255);
            ip.set_source(src_ip);
            ip.set_destination(IPV6_GROUP);
        }
        let udp_start = ETHERNET_HEADER_SIZE + IPV6_HEADER_SIZE;
        write_udp(&mut buffer[udp_start..], dst_port, payload);
        {
            let mut udp = MutableUdpPacket::new(&mut buffer[udp_start..]).unwrap();
            let checksum = udp::ipv6_checksum(&udp.to_immutable(), &src_ip, &IPV6_GROUP);
            udp.set_checksum(checksum);
        }
        buffer
    }

    /// Ethernet + 802.1Q + IPv4 + UDP frame.
    pub fn vlan_ipv4_mdns_frame(source: MacAddr, vlan_id: u16, payload: &[u8]) -> Vec<u8> {
        let len = ETHERNET_HEADER_SIZE
            + VLAN_TAG_SIZE
            + IPV4_MIN_HEADER_SIZE
            + UDP_HEADER_SIZE
            + payload.len();
        let mut buffer = vec![0u8; len];
        {
            let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
            eth.set_source(source);
            eth.set_destination(MacAddr::new(0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb));
            eth.set_ethertype(EtherTypes::Vlan);
        }
        {
            let mut tag = MutableVlanPacket::new(&mut buffer[ETHERNET_HEADER_SIZE..]).unwrap();
            tag.set_vlan_identifier(vlan_id);
            tag.set_ethertype(EtherTypes::Ipv4);
        }
        write_ipv4(
            &mut buffer[ETHERNET_HEADER_SIZE + VLAN_TAG_SIZE..],
            5353,
            payload,
        );
        buffer
    }

    const REMOTE: MacAddr = MacAddr(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa);

    #[test]
    fn should_decode_ethernet_addresses() {
        let frame = ipv4_mdns_frame(REMOTE, 5353, &query_payload());
        let header = LayerDecoder::new(&frame).ethernet().unwrap();

        assert_eq!(header.source, REMOTE);
        assert_eq!(header.destination, MacAddr::new(0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb));
    }

    #[test]
    fn should_report_missing_ethernet_layer() {
        let decoder = LayerDecoder::new(&[0x01, 0x00, 0x5e, 0x00]);
        assert!(decoder.ethernet().is_none());
        assert!(!decoder.is_ipv6());
        assert!(decoder.udp_payload().is_none());
    }

    #[test]
    fn should_detect_ipv6() {
        let payload = query_payload();
        assert!(LayerDecoder::new(&ipv6_mdns_frame(REMOTE, 5353, &payload)).is_ipv6());
        assert!(!LayerDecoder::new(&ipv4_mdns_frame(REMOTE, 5353, &payload)).is_ipv6());
    }

    #[test]
    fn should_treat_truncated_ipv6_header_as_absent() {
        let frame = ipv6_mdns_frame(REMOTE, 5353, &query_payload());
        let truncated = &frame[..ETHERNET_HEADER_SIZE + 10];
        assert!(!LayerDecoder::new(truncated).is_ipv6());
    }

    #[test]
    fn should_treat_non_ip_frames_as_not_ipv6() {
        let mut frame = ipv4_mdns_frame(REMOTE, 5353, &query_payload());
        MutableEthernetPacket::new(&mut frame)
            .unwrap()
            .set_ethertype(EtherTypes::Arp);

        let decoder = LayerDecoder::new(&frame);
        assert!(decoder.ethernet().is_some());
        assert!(!decoder.is_ipv6());
        assert!(decoder.udp_payload().is_none());
    }

    #[test]
    fn should_extract_udp_payload_for_both_families() {
        let payload = query_payload();

        let v4 = ipv4_mdns_frame(REMOTE, 5353, &payload);
        assert_eq!(LayerDecoder::new(&v4).udp_payload(), Some(payload.as_slice()));

        let v6 = ipv6_mdns_frame(REMOTE, 5353, &payload);
        assert_eq!(LayerDecoder::new(&v6).udp_payload(), Some(payload.as_slice()));
    }

    #[test]
    fn should_strip_ethernet_padding_from_payload() {
        let payload = query_payload();
        let mut frame = ipv4_mdns_frame(REMOTE, 5353, &payload);
        frame.extend_from_slice(&[0u8; 16]);

        assert_eq!(
            LayerDecoder::new(&frame).udp_payload(),
            Some(payload.as_slice())
        );
    }

    #[test]
    fn should_decode_through_vlan_tag() {
        let payload = query_payload();
        let frame = vlan_ipv4_mdns_frame(REMOTE, 20, &payload);
        let decoder = LayerDecoder::new(&frame);

        assert!(!decoder.is_ipv6());
        assert_eq!(decoder.udp_payload(), Some(payload.as_slice()));
    }

    #[test]
    fn should_ignore_non_udp_protocols() {
        let mut frame = ipv4_mdns_frame(REMOTE, 5353, &query_payload());
        MutableIpv4Packet::new(&mut frame[ETHERNET_HEADER_SIZE..])
            .unwrap()
            .set_next_level_protocol(IpNextHeaderProtocols::Tcp);

        assert!(LayerDecoder::new(&frame).udp_payload().is_none());
    }

    #[test]
    fn should_recognize_queries_only() {
        assert!(is_dns_query(Some(&query_payload())));
        assert!(!is_dns_query(Some(&response_payload())));
    }

    #[test]
    fn should_fail_closed_on_bad_payloads() {
        assert!(!is_dns_query(None));
        assert!(!is_dns_query(Some(&[])));
        assert!(!is_dns_query(Some(b"not a dns message")));

        // Header claims one question but the question section is missing.
        let mut truncated = query_payload();
        truncated.truncate(12);
        assert!(!is_dns_query(Some(&truncated)));
    }
}
