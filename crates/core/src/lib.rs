//! Core library for the Pulse Visualiser application.
//!
//! Feature events arrive over a WebSocket, spawn and evolve polygon particles,
//! and a render loop paints whatever the particle registry currently holds.
//! Each module owns one of those concerns; [`runtime`] ties them together on
//! a single task.

pub mod config;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod particle;
pub mod registry;
pub mod render;
pub mod runtime;

pub use config::{AppConfig, VisualiserConfig};
pub use connection::{ConnectionMachine, ConnectionState, ConnectionStatus, RetryPolicy};
pub use decoder::{decode, FeatureEvent};
pub use error::{Result, VisualiserError};
pub use particle::{Entropy, NeonColor, Particle, Point, RngEntropy};
pub use registry::{ApplyOutcome, ParticleRegistry, Snapshot};
pub use render::{
    Canvas, CanvasGeometry, FrameRecorder, RenderScheduler, Rgba, SvgCanvas, Theme,
};
pub use runtime::{Command, Visualiser};
