// src/events.rs
use crate::error::Result;
use crate::spike::Spike;
use crate::state::State;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "eventType")]
pub enum Event {
    AnimationStarted(AnimationStartInfo),
    Frame(FrameInfo),
    AnimationFinished(FinishInfo),
    CircuitStep(CircuitStepInfo),
    QueueEntry(QueueEntryInfo),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnimationStartInfo {
    pub vector: usize,
    pub form: String,
    pub frames: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub vector: usize,
    pub remaining: usize,
    pub state: State,
    pub spike: Spike,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishInfo {
    pub vector: usize,
    pub final_state: State,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CircuitStepInfo {
    pub step: usize,
    pub total_steps: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryInfo {
    pub vector: usize,
    pub index: usize,
    pub operator: String,
}

/// Writes one event as a line of JSON.
pub fn emit_event(event: &Event, writer: &mut impl Write) -> Result<()> {
    let json_output = serde_json::to_string(event)?;
    writeln!(writer, "{}", json_output)?;
    Ok(())
}
