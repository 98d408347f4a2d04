//! bonjour-reflector - carries mDNS discovery queries across link boundaries.
//!
//! The reflector captures mDNS queries on one interface and re-emits them
//! from that interface's own hardware address, addressed to the mDNS
//! multicast group. Hosts on segments that do not forward multicast to each
//! other (separate VLANs behind a bridge, for example) can then discover
//! each other's services.
//!
//! # Architecture
//!
//! - [`network`]: live capture, the kernel-level filter, lazy layer decoding
//! - [`mdns`]: query classification and link-layer rewriting
//! - [`pipeline`]: background worker feeding classified records to a bounded queue
//! - [`server`]: the loop that drains the queue and reflects queries
//! - [`config`]: configuration loading and validation
//! - [`error`]: error types
//!
//! # Testing
//!
//! Capture and injection sit behind the [`network::FrameCapture`] and
//! [`network::FrameSender`] traits, so the whole data path can be exercised
//! without a network interface:
//!
//! ```rust
//! use bonjour_reflector::mdns::{MDNS_IPV4_MAC, MDNS_IPV6_MAC, multicast_destination};
//!
//! assert_eq!(multicast_destination(true), MDNS_IPV6_MAC);
//! assert_eq!(multicast_destination(false), MDNS_IPV4_MAC);
//! ```

pub mod config;
pub mod error;
pub mod mdns;
pub mod metrics;
pub mod network;
pub mod pipeline;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
