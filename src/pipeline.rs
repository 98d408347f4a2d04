//! Decode pipeline.
//!
//! A blocking worker drains frames from the capture handle, classifies them
//! and publishes the records on a bounded queue. A full queue blocks the
//! worker until the reflector catches up; frames arriving meanwhile are
//! buffered, and eventually dropped, by the capture handle itself.

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::{Error, NetworkError};
use crate::mdns::{ClassifiedRecord, classify};
use crate::metrics::{FRAMES_CAPTURED, FRAMES_SKIPPED};
use crate::network::FrameCapture;

/// Counters for one run of the pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_captured: u64,
    pub frames_skipped: u64,
    pub records_published: u64,
}

/// Create the bounded queue between the pipeline and the reflector.
pub fn record_channel(
    capacity: usize,
) -> (
    mpsc::Sender<ClassifiedRecord>,
    mpsc::Receiver<ClassifiedRecord>,
) {
    mpsc::channel(capacity)
}

/// Run the pipeline on the current thread until cancelled, until the capture
/// source fails, or until the receiving side of the queue is dropped.
///
/// Blocks; must not be called from an async context.
pub fn run_decode_pipeline<C: FrameCapture>(
    capture: &mut C,
    record_tx: &mpsc::Sender<ClassifiedRecord>,
    cancel: &CancellationToken,
) -> PipelineStats {
    let mut stats = PipelineStats::default();

    while !cancel.is_cancelled() {
        let frame = match capture.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(Error::Network(NetworkError::CaptureClosed)) => {
                info!("Capture source closed");
                break;
            }
            Err(err) => {
                error!("Capture failed: {err}");
                break;
            }
        };

        stats.frames_captured += 1;
        counter!(FRAMES_CAPTURED).increment(1);

        let Some(record) = classify(frame) else {
            stats.frames_skipped += 1;
            counter!(FRAMES_SKIPPED).increment(1);
            trace!("Skipping frame without an Ethernet layer");
            continue;
        };

        if record_tx.blocking_send(record).is_err() {
            debug!("Record queue closed, stopping decode pipeline");
            break;
        }
        stats.records_published += 1;
    }

    stats
}

/// Spawn the pipeline on tokio's blocking thread pool.
pub fn spawn_decode_pipeline<C>(
    mut capture: C,
    record_tx: mpsc::Sender<ClassifiedRecord>,
    cancel: CancellationToken,
) -> JoinHandle<PipelineStats>
where
    C: FrameCapture + 'static,
{
    tokio::task::spawn_blocking(move || {
        let stats = run_decode_pipeline(&mut capture, &record_tx, &cancel);
        info!(
            captured = stats.frames_captured,
            skipped = stats.frames_skipped,
            published = stats.records_published,
            "Decode pipeline stopped"
        );
        stats
    })
}
