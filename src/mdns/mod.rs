//! mDNS query classification and reflection.

pub mod classify;
pub mod reflect;

pub use classify::{ClassifiedRecord, classify, is_reflection_candidate};
pub use reflect::{MDNS_IPV4_MAC, MDNS_IPV6_MAC, Reflector, multicast_destination};
