//! Read `time \t x1 ... \t xn` telemetry lines from a serial device and plot
//! them, live or after the fact.
pub mod config;
pub mod console;
pub mod engine;
pub mod gui;
pub mod recorder;
pub mod telemetry;
pub mod types;
