use serde::{Deserialize, Serialize};

use crate::Result;

/// One audio-analysis tick as emitted by the feature backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureEvent {
    pub is_drum_kick: bool,
    /// Continuous rhythm intensity for this tick.
    pub rhythm_factor: f32,
}

/// Parses a raw text frame into a [`FeatureEvent`].
///
/// Extra fields are ignored. Anything else that does not match the schema,
/// including truncated JSON, is an error for the caller to log and drop.
pub fn decode(payload: &str) -> Result<FeatureEvent> {
    Ok(serde_json::from_str(payload)?)
}
