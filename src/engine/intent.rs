//! User intents driving timer state transitions

use serde::{Deserialize, Serialize};

use crate::state::DurationSetting;

/// A discrete, zero-payload user request to change timer state.
///
/// Intents are ordered by arrival on the engine input channel. Repeated
/// identical intents are idempotent: the machine reacts to the resulting
/// state change, not to event identity, so two `Start`s in a row behave as
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Start,
    Pause,
    Resume,
    Reset,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Start => "start",
            Intent::Pause => "pause",
            Intent::Resume => "resume",
            Intent::Reset => "reset",
        }
    }
}

/// Everything the engine task consumes, on one ordered channel.
///
/// Duration edits share the channel with intents so an edit followed by a
/// `Start` is observed in submission order.
#[derive(Debug, Clone)]
pub enum EngineInput {
    Intent(Intent),
    DurationEdited(DurationSetting),
}
