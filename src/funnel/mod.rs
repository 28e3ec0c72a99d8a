//! Sales funnel core — menu screens plus the lead-capture intake.
//!
//! A session browses static menu screens until it picks an order action,
//! then answers three prompts (email, phone, payment note). The final answer
//! produces a [`Lead`] which is handed to a [`LeadSink`]. Nothing here does
//! transport I/O; adapters own the session map and deliver the replies.

pub mod catalog;
pub mod dispatcher;
pub mod lead;
pub mod menu;
pub mod prompts;
pub mod state;
pub mod validate;

pub use catalog::Product;
pub use dispatcher::{Dispatched, Dispatcher, EventKind, InboundEvent};
pub use lead::{FanoutLeadSink, JsonlLeadSink, Lead, LeadSink, TracingLeadSink};
pub use menu::{Action, MenuButton, OrderKind, Reply, Screen};
pub use state::{IntakeState, Session, Step};
