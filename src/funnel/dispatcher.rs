//! Session dispatcher — routes one inbound event against one session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::FunnelConfig;

use super::lead::{Lead, LeadSink};
use super::menu::{self, Action, OrderKind, Reply, Screen};
use super::prompts;
use super::state::{IntakeState, Session, Step};

/// Commands that wipe the session and show the main menu.
const RESTART_COMMANDS: &[&str] = &["start", "restart"];

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    /// A button press, carrying its action id.
    MenuAction(String),
    /// Free text typed by the user.
    Text(String),
    /// A slash command without the leading `/`, e.g. `start`.
    Command(String),
}

/// An inbound chat interaction for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub session_id: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(session_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
        }
    }
}

/// Result of dispatching one event.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub reply: Reply,
    /// The lead emitted by this event, if it completed an intake.
    pub lead: Option<Lead>,
}

impl From<Reply> for Dispatched {
    fn from(reply: Reply) -> Self {
        Self { reply, lead: None }
    }
}

/// Routes events to the menu renderer or the intake state machine.
pub struct Dispatcher {
    config: Arc<FunnelConfig>,
    sink: Arc<dyn LeadSink>,
}

impl Dispatcher {
    pub fn new(config: Arc<FunnelConfig>, sink: Arc<dyn LeadSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    /// Apply `event` to `session` and produce the response.
    pub async fn dispatch(&self, session: &mut Session, event: &InboundEvent) -> Dispatched {
        let before = session.state;
        let dispatched: Dispatched = match &event.kind {
            EventKind::Command(command) => self.on_command(session, command).into(),
            EventKind::MenuAction(action_id) => self.on_action(session, action_id).into(),
            EventKind::Text(text) => self.on_text(session, &event.session_id, text).await,
        };
        tracing::debug!(
            session_id = %event.session_id,
            from = %before,
            to = %session.state,
            "Dispatched event"
        );
        dispatched
    }

    fn main_menu(&self) -> Reply {
        menu::render(&self.config, Screen::Main)
    }

    /// Short hint plus the main menu buttons, for input we cannot place.
    fn fallback(&self) -> Reply {
        Reply::text(prompts::FALLBACK).with_menu(menu::buttons(&self.config, Screen::Main))
    }

    fn on_command(&self, session: &mut Session, command: &str) -> Reply {
        let command = command.trim().trim_start_matches('/').to_lowercase();
        if RESTART_COMMANDS.contains(&command.as_str()) {
            session.reset();
            return self.main_menu();
        }
        tracing::debug!(command = %command, "Unknown command");
        self.fallback()
    }

    fn on_action(&self, session: &mut Session, action_id: &str) -> Reply {
        let Some(action) = Action::parse(action_id) else {
            tracing::warn!(action = %action_id, "Unknown menu action; showing main menu");
            return self.main_menu().editing();
        };

        match action {
            Action::Show(screen) => menu::render(&self.config, screen).editing(),
            Action::Order(kind) => self.begin_order(session, kind).editing(),
        }
    }

    fn begin_order(&self, session: &mut Session, kind: OrderKind) -> Reply {
        match kind {
            OrderKind::Package(product_id) => {
                let Some(product) = self.config.product(&product_id) else {
                    tracing::warn!(product = %product_id, "Order for unknown product");
                    return menu::render(&self.config, Screen::Packages);
                };
                session.begin_order(product.name.clone(), Some(product.price));
                Reply::text(prompts::package_order(
                    &self.config,
                    &product.name,
                    product.price,
                ))
            }
            OrderKind::Maintenance => {
                session.begin_order("Maintenance", Some(self.config.maintenance_fee));
                Reply::text(prompts::maintenance_order(&self.config))
            }
            OrderKind::Contact => {
                session.begin_order("Contact", None);
                Reply::text(prompts::ASK_EMAIL)
            }
        }
    }

    async fn on_text(&self, session: &mut Session, session_id: &str, text: &str) -> Dispatched {
        match session.submit(text) {
            Step::NotCollecting => self.fallback().into(),
            Step::Rejected(state) => {
                tracing::debug!(session_id = %session_id, state = %state, "Answer rejected");
                match state {
                    IntakeState::AwaitEmail => Reply::text(prompts::BAD_EMAIL).into(),
                    IntakeState::AwaitPhone => Reply::text(prompts::BAD_PHONE).into(),
                    IntakeState::AwaitPaymentNote | IntakeState::Idle | IntakeState::Done => {
                        self.fallback().into()
                    }
                }
            }
            Step::Advanced(state) => match state {
                IntakeState::AwaitEmail => Reply::text(prompts::ASK_EMAIL).into(),
                IntakeState::AwaitPhone => Reply::text(prompts::ASK_PHONE).into(),
                IntakeState::AwaitPaymentNote => Reply::text(prompts::ASK_PAYMENT_NOTE).into(),
                IntakeState::Idle | IntakeState::Done => self.fallback().into(),
            },
            Step::Completed(intake) => {
                let lead = Lead::new(session_id, intake);
                if let Err(e) = self.sink.record(&lead).await {
                    tracing::warn!(lead_id = %lead.id, "Failed to record lead: {}", e);
                }
                let reply = Reply::text(prompts::lead_received(&self.config, &lead))
                    .with_menu(menu::buttons(&self.config, Screen::Main));
                Dispatched {
                    reply,
                    lead: Some(lead),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::LeadSinkError;

    #[derive(Default)]
    struct RecordingSink {
        leads: Mutex<Vec<Lead>>,
    }

    #[async_trait]
    impl LeadSink for RecordingSink {
        async fn record(&self, lead: &Lead) -> Result<(), LeadSinkError> {
            self.leads.lock().unwrap().push(lead.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LeadSink for FailingSink {
        async fn record(&self, _lead: &Lead) -> Result<(), LeadSinkError> {
            Err(LeadSinkError::Io(std::io::Error::other("disk full")))
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let d = Dispatcher::new(Arc::new(FunnelConfig::default()), sink.clone());
        (d, sink)
    }

    fn action(id: &str) -> InboundEvent {
        InboundEvent::new("s1", EventKind::MenuAction(id.into()))
    }

    fn text(t: &str) -> InboundEvent {
        InboundEvent::new("s1", EventKind::Text(t.into()))
    }

    #[tokio::test]
    async fn order_silver_starts_intake() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        let out = d.dispatch(&mut session, &action("order_silver")).await;

        assert_eq!(session.state, IntakeState::AwaitEmail);
        assert_eq!(session.pending_package.as_deref(), Some("Silver"));
        assert_eq!(session.pending_total, Some(dec!(350)));
        assert!(out.reply.edit);
        assert!(out.reply.menu.is_none());
        assert!(out.reply.text.contains("down payment of €100"));
    }

    #[tokio::test]
    async fn contact_order_has_no_total() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        let out = d.dispatch(&mut session, &action("order_contact")).await;
        assert_eq!(session.pending_package.as_deref(), Some("Contact"));
        assert_eq!(session.pending_total, None);
        assert_eq!(out.reply.text, prompts::ASK_EMAIL);
    }

    #[tokio::test]
    async fn maintenance_order_uses_fee() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_maint")).await;
        assert_eq!(session.pending_package.as_deref(), Some("Maintenance"));
        assert_eq!(session.pending_total, Some(dec!(49.99)));
    }

    #[tokio::test]
    async fn unknown_product_shows_packages() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        let out = d.dispatch(&mut session, &action("order_platinum")).await;
        assert_eq!(session.state, IntakeState::Idle);
        assert_eq!(
            out.reply.text,
            prompts::screen_text(d.config(), Screen::Packages)
        );
    }

    #[tokio::test]
    async fn unknown_action_falls_back_to_main_menu() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        let out = d.dispatch(&mut session, &action("menu_nowhere")).await;
        assert_eq!(out.reply.text, prompts::welcome(d.config()));
        assert!(out.reply.menu.is_some());
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn menu_actions_do_not_touch_intake() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_gold")).await;
        let out = d.dispatch(&mut session, &action("menu_reviews")).await;
        assert_eq!(session.state, IntakeState::AwaitEmail);
        assert_eq!(out.reply.menu.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn idle_text_gets_fallback() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        let out = d.dispatch(&mut session, &text("hi")).await;
        assert_eq!(out.reply.text, prompts::FALLBACK);
        assert!(out.reply.menu.is_some());
        assert!(!out.reply.edit);
        assert_eq!(session.state, IntakeState::Idle);
    }

    #[tokio::test]
    async fn email_then_phone_prompts() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_silver")).await;

        let out = d.dispatch(&mut session, &text("nope")).await;
        assert_eq!(out.reply.text, prompts::BAD_EMAIL);

        let out = d.dispatch(&mut session, &text("foo@bar.com")).await;
        assert_eq!(out.reply.text, prompts::ASK_PHONE);
        assert_eq!(session.state, IntakeState::AwaitPhone);
        assert_eq!(session.email.as_deref(), Some("foo@bar.com"));

        let out = d.dispatch(&mut session, &text("12345")).await;
        assert_eq!(out.reply.text, prompts::BAD_PHONE);

        let out = d.dispatch(&mut session, &text("555-123-4567")).await;
        assert_eq!(out.reply.text, prompts::ASK_PAYMENT_NOTE);
        assert_eq!(session.state, IntakeState::AwaitPaymentNote);
    }

    #[tokio::test]
    async fn payment_note_emits_one_lead() {
        let (d, sink) = dispatcher();
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_silver")).await;
        d.dispatch(&mut session, &text("foo@bar.com")).await;
        d.dispatch(&mut session, &text("555-123-4567")).await;
        let out = d.dispatch(&mut session, &text("done")).await;

        let lead = out.lead.expect("lead emitted");
        assert_eq!(lead.session_id, "s1");
        assert_eq!(lead.package, "Silver");
        assert_eq!(lead.total, Some(dec!(350)));
        assert_eq!(lead.email, "foo@bar.com");
        assert_eq!(lead.phone, "555-123-4567");
        assert_eq!(lead.note, "done");
        assert_eq!(session.state, IntakeState::Idle);

        assert!(out.reply.text.starts_with("✅ Thanks! We received your info."));
        assert!(out.reply.menu.is_some());

        let recorded = sink.leads.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0], lead);
    }

    #[tokio::test]
    async fn start_command_resets_session() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_gold")).await;
        d.dispatch(&mut session, &text("foo@bar.com")).await;

        let out = d
            .dispatch(&mut session, &InboundEvent::new("s1", EventKind::Command("start".into())))
            .await;
        assert_eq!(session, Session::default());
        assert_eq!(out.reply.text, prompts::welcome(d.config()));
        assert!(!out.reply.edit);
    }

    #[tokio::test]
    async fn unknown_command_keeps_state() {
        let (d, _) = dispatcher();
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_gold")).await;
        let out = d
            .dispatch(&mut session, &InboundEvent::new("s1", EventKind::Command("help".into())))
            .await;
        assert_eq!(out.reply.text, prompts::FALLBACK);
        assert_eq!(session.state, IntakeState::AwaitEmail);
    }

    #[test]
    fn inbound_event_wire_shape() {
        let event: InboundEvent = serde_json::from_value(serde_json::json!({
            "session_id": "telegram:1",
            "kind": "menu_action",
            "payload": "order_silver"
        }))
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::new("telegram:1", EventKind::MenuAction("order_silver".into()))
        );
    }

    #[tokio::test]
    async fn sink_failure_still_confirms_the_order() {
        let d = Dispatcher::new(Arc::new(FunnelConfig::default()), Arc::new(FailingSink));
        let mut session = Session::new();
        d.dispatch(&mut session, &action("order_gold")).await;
        d.dispatch(&mut session, &text("foo@bar.com")).await;
        d.dispatch(&mut session, &text("555-123-4567")).await;
        let out = d.dispatch(&mut session, &text("tx: abc123")).await;

        assert_eq!(session.state, IntakeState::Idle);
        let lead = out.lead.expect("lead still emitted");
        assert_eq!(lead.package, "Gold");
        assert_eq!(out.reply.text, prompts::lead_received(d.config(), &lead));
        assert!(out.reply.menu.is_some());
    }
}
