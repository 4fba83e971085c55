use std::fmt;

use crate::stager::{Order, RegistrationId, StagerState};

/// Events emitted by a stager over its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagerEvent {
    /// A stageable was accepted
    Registered { stage: String, id: RegistrationId, target: String },
    /// A stageable arrived after the pass had begun and was refused
    RegistrationRejected { stage: String, state: StagerState, target: String },
    /// The pass is about to invoke `entries` stageables
    PassStarted { stage: String, order: Order, entries: usize },
    /// One stageable has reported its outcome
    Invoked { stage: String, id: RegistrationId, target: String, cause: Option<String> },
    /// Every stageable has been attempted
    PassCompleted { stage: String, attempted: usize, failed: usize },
    /// A stage call found the pass already done
    PassSkipped { stage: String, state: StagerState },
}

impl StagerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StagerEvent::Registered { .. } => "stager.registered",
            StagerEvent::RegistrationRejected { .. } => "stager.registration_rejected",
            StagerEvent::PassStarted { .. } => "stager.pass_started",
            StagerEvent::Invoked { .. } => "stager.invoked",
            StagerEvent::PassCompleted { .. } => "stager.pass_completed",
            StagerEvent::PassSkipped { .. } => "stager.pass_skipped",
        }
    }

    pub fn stage(&self) -> &str {
        match self {
            StagerEvent::Registered { stage, .. }
            | StagerEvent::RegistrationRejected { stage, .. }
            | StagerEvent::PassStarted { stage, .. }
            | StagerEvent::Invoked { stage, .. }
            | StagerEvent::PassCompleted { stage, .. }
            | StagerEvent::PassSkipped { stage, .. } => stage,
        }
    }

    /// Whether this event reports something that went wrong
    pub fn is_failure(&self) -> bool {
        match self {
            StagerEvent::RegistrationRejected { .. } => true,
            StagerEvent::Invoked { cause, .. } => cause.is_some(),
            StagerEvent::PassCompleted { failed, .. } => *failed > 0,
            _ => false,
        }
    }
}

impl fmt::Display for StagerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagerEvent::Registered { stage, id, target } => {
                write!(f, "[{}] registered {} {}", stage, id, target)
            }
            StagerEvent::RegistrationRejected { stage, state, target } => {
                write!(f, "[{}] rejected {} while {}", stage, target, state)
            }
            StagerEvent::PassStarted { stage, order, entries } => {
                write!(f, "[{}] staging {} entries ({})", stage, entries, order)
            }
            StagerEvent::Invoked { stage, id, target, cause: None } => {
                write!(f, "[{}] {} {} succeeded", stage, id, target)
            }
            StagerEvent::Invoked { stage, id, target, cause: Some(cause) } => {
                write!(f, "[{}] {} {} failed: {}", stage, id, target, cause)
            }
            StagerEvent::PassCompleted { stage, attempted, failed } => {
                write!(f, "[{}] staged {} entries, {} failed", stage, attempted, failed)
            }
            StagerEvent::PassSkipped { stage, state } => {
                write!(f, "[{}] stage skipped, already {}", stage, state)
            }
        }
    }
}
