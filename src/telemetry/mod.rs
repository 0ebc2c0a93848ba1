// src/telemetry/mod.rs
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod session;
pub mod source;
pub use decoder::{decode, decode_batch, DecodedRow, FrameDecoder, IngestBatch};
pub use error::TelemetryError;
pub use pipeline::{run_until_cancelled, CancelFlag, IngestPipeline};
pub use plot::{render_history_png, save_history_png, PlotStyle};
pub use session::{ChannelSeries, SamplePoint, Session, SessionState};
pub use source::{LineSource, ManualSource, ReplaySource, SerialSource, SimulatedSource};
