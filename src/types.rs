// src/types.rs
use crate::telemetry::IngestBatch;

// Ingest thread -> GUI
#[derive(Debug)]
pub enum TelemetryMessage {
    Log(String),
    Batch(IngestBatch),
    // Source hit a fatal error or was cancelled; no more batches follow.
    Finished(Option<String>),
}
