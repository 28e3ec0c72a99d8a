//! Order intake state machine — tracks which answer the session owes us next.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validate::{looks_like_email, looks_like_phone};

/// Steps of the lead-capture sequence.
///
/// Progresses linearly: Idle → AwaitEmail → AwaitPhone → AwaitPaymentNote →
/// Done, after which the session drops back to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeState {
    #[default]
    Idle,
    AwaitEmail,
    AwaitPhone,
    AwaitPaymentNote,
    Done,
}

impl IntakeState {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Self-loops on the validated steps are re-prompts. Any state may jump to
    /// `AwaitEmail` (a new order) or `Idle` (restart).
    pub fn can_transition_to(&self, target: IntakeState) -> bool {
        use IntakeState::*;
        matches!(
            (self, target),
            (_, AwaitEmail)
                | (_, Idle)
                | (AwaitEmail, AwaitPhone)
                | (AwaitPhone, AwaitPhone)
                | (AwaitPhone, AwaitPaymentNote)
                | (AwaitPaymentNote, Done)
        )
    }

    /// Whether the session is in the middle of an intake.
    pub fn is_collecting(&self) -> bool {
        matches!(
            self,
            Self::AwaitEmail | Self::AwaitPhone | Self::AwaitPaymentNote
        )
    }
}

impl std::fmt::Display for IntakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitEmail => "await_email",
            Self::AwaitPhone => "await_phone",
            Self::AwaitPaymentNote => "await_payment_note",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Answers gathered by a finished intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedIntake {
    pub package: String,
    pub total: Option<Decimal>,
    pub email: String,
    pub phone: String,
    pub note: String,
}

/// Outcome of feeding one free-text answer to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No intake in progress; the text was not consumed.
    NotCollecting,
    /// The answer failed its shape check; still waiting on the same step.
    Rejected(IntakeState),
    /// The answer was recorded; now waiting on the returned step.
    Advanced(IntakeState),
    /// The final answer was recorded and the session is idle again.
    Completed(CompletedIntake),
}

/// One user's conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: IntakeState,
    pub pending_package: Option<String>,
    /// Absent for orders without a price, such as "leave contact".
    pub pending_total: Option<Decimal>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub payment_note: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(&mut self, target: IntakeState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid intake transition {} -> {target}",
            self.state
        );
        self.state = target;
    }

    /// Start a new intake for `package`, discarding any answers in flight.
    pub fn begin_order(&mut self, package: impl Into<String>, total: Option<Decimal>) {
        self.pending_package = Some(package.into());
        self.pending_total = total;
        self.email = None;
        self.phone = None;
        self.payment_note = None;
        self.transition(IntakeState::AwaitEmail);
    }

    /// Forget everything about this conversation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed a free-text answer to the current step.
    pub fn submit(&mut self, text: &str) -> Step {
        let text = text.trim();
        match self.state {
            IntakeState::Idle | IntakeState::Done => Step::NotCollecting,
            IntakeState::AwaitEmail => {
                if !looks_like_email(text) {
                    return Step::Rejected(self.state);
                }
                self.email = Some(text.to_string());
                self.transition(IntakeState::AwaitPhone);
                Step::Advanced(self.state)
            }
            IntakeState::AwaitPhone => {
                if !looks_like_phone(text) {
                    return Step::Rejected(self.state);
                }
                self.phone = Some(text.to_string());
                self.transition(IntakeState::AwaitPaymentNote);
                Step::Advanced(self.state)
            }
            IntakeState::AwaitPaymentNote => {
                self.payment_note = Some(text.to_string());
                self.transition(IntakeState::Done);
                let completed = CompletedIntake {
                    package: self
                        .pending_package
                        .clone()
                        .unwrap_or_else(|| "Unknown".to_string()),
                    total: self.pending_total,
                    email: self.email.clone().unwrap_or_default(),
                    phone: self.phone.clone().unwrap_or_default(),
                    note: text.to_string(),
                };
                self.transition(IntakeState::Idle);
                Step::Completed(completed)
            }
        }
    }
}
