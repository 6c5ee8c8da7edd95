/// Runtime orchestrator module - Gateway

mod orchestrator;
mod replay;

pub use orchestrator::Orchestrator;
pub use replay::{parse_event_line, replay_events, replay_from, ReplaySummary};
