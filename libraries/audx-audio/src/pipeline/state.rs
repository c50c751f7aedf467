//! Pipeline State Machine
//!
//! `Init -> Streaming -> Draining -> Closed`. A failed initialisation may
//! jump straight from `Init` to `Closed`; anything else out of order is an
//! `InvalidState` error.

use audx_core::{AudxError, Result};
use std::fmt;

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Opening the decoder, filter and downstream sink
    #[default]
    Init,
    /// Moving audio from the decoder downstream
    Streaming,
    /// Flushing the filter and finalizing the output
    Draining,
    /// Everything released
    Closed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events recorded by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// State changed
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    /// The decoder reported end of stream
    EndOfStream,
    /// A unit was skipped during streaming
    Skipped { reason: String },
}

/// Tracks the orchestrator's state and rejects out-of-order transitions
#[derive(Debug, Default)]
pub struct PipelineStateMachine {
    state: PipelineState,
    pending_events: Vec<PipelineEvent>,
}

impl PipelineStateMachine {
    /// Create a new state machine in `Init`
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    /// Record a non-fatal skip
    pub fn record_skip(&mut self, reason: impl Into<String>) {
        self.pending_events.push(PipelineEvent::Skipped {
            reason: reason.into(),
        });
    }

    // ===== State Transitions =====

    /// Init finished; start moving audio
    pub fn start_streaming(&mut self) -> Result<()> {
        self.transition(PipelineState::Init, PipelineState::Streaming)
    }

    /// Decoder exhausted; start draining
    pub fn start_draining(&mut self) -> Result<()> {
        self.transition(PipelineState::Streaming, PipelineState::Draining)?;
        self.pending_events.push(PipelineEvent::EndOfStream);
        Ok(())
    }

    /// Release everything; valid from `Init` (after a failure) or `Draining`
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Init | PipelineState::Draining => {
                self.set(PipelineState::Closed);
                Ok(())
            }
            other => Err(AudxError::invalid_state(format!(
                "cannot close pipeline while {}",
                other
            ))),
        }
    }

    /// Whether the run has ended
    pub fn is_closed(&self) -> bool {
        self.state == PipelineState::Closed
    }

    fn transition(&mut self, from: PipelineState, to: PipelineState) -> Result<()> {
        if self.state != from {
            return Err(AudxError::invalid_state(format!(
                "cannot move to {} while {}",
                to, self.state
            )));
        }
        self.set(to);
        Ok(())
    }

    fn set(&mut self, to: PipelineState) {
        let from = self.state;
        self.state = to;
        self.pending_events
            .push(PipelineEvent::StateChanged { from, to });
    }
}
