//! Reflector orchestration.
//!
//! Drains classified records from the decode pipeline and reflects the
//! queries, one at a time, in capture order. Designed with trait-based
//! dependencies for testability.

use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mdns::{ClassifiedRecord, Reflector};
use crate::metrics::{NON_QUERIES_DROPPED, QUERIES_REFLECTED, REFLECTION_FAILURES};
use crate::network::FrameSender;

/// Statistics for reflector operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReflectorStats {
    pub records_received: u64,
    pub queries_reflected: u64,
    pub non_queries_dropped: u64,
    pub failures: u64,
}

/// What happened to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reflected,
    NotAQuery,
    Failed,
}

/// Apply the reflection policy to one record.
///
/// Only queries are reflected; reflecting responses would let two reflectors
/// on the same segments amplify each other. Failures are logged and the
/// record is dropped.
pub fn process_record<S: FrameSender>(
    reflector: &Reflector,
    sender: &mut S,
    mut record: ClassifiedRecord,
) -> Outcome {
    if !record.is_query {
        debug!(source = %record.header.source, "Dropping non-query frame");
        counter!(NON_QUERIES_DROPPED).increment(1);
        return Outcome::NotAQuery;
    }

    debug!(
        source = %record.header.source,
        ipv6 = record.is_ipv6,
        len = record.frame.data.len(),
        "Reflecting mDNS query"
    );

    match reflector.reflect(sender, &mut record) {
        Ok(()) => {
            counter!(QUERIES_REFLECTED).increment(1);
            Outcome::Reflected
        }
        Err(err) => {
            warn!("Failed to reflect query: {err}");
            counter!(REFLECTION_FAILURES).increment(1);
            Outcome::Failed
        }
    }
}

/// Run the reflector loop until cancelled or until the pipeline hangs up.
pub async fn run_reflector<S: FrameSender>(
    mut record_rx: mpsc::Receiver<ClassifiedRecord>,
    reflector: Reflector,
    mut sender: S,
    cancel: CancellationToken,
) -> ReflectorStats {
    let mut stats = ReflectorStats::default();
    info!(local_mac = %reflector.local_mac(), "Reflector started");

    loop {
        let record = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Reflector cancelled");
                break;
            }
            record = record_rx.recv() => {
                let Some(record) = record else {
                    debug!("Record queue closed");
                    break;
                };
                record
            }
        };

        stats.records_received += 1;
        match process_record(&reflector, &mut sender, record) {
            Outcome::Reflected => stats.queries_reflected += 1,
            Outcome::NotAQuery => stats.non_queries_dropped += 1,
            Outcome::Failed => stats.failures += 1,
        }
    }

    stats
}
