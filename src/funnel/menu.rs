//! Menu screens, selectable actions, and the renderer that maps one to the other.

use serde::{Deserialize, Serialize};

use crate::config::FunnelConfig;

use super::prompts;

/// A named menu screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Main,
    Packages,
    Maintenance,
    Reviews,
    Contact,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Main,
        Screen::Packages,
        Screen::Maintenance,
        Screen::Reviews,
        Screen::Contact,
    ];

    /// Parse a screen identifier such as `"packages"`.
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "main" => Some(Self::Main),
            "packages" => Some(Self::Packages),
            "maintenance" => Some(Self::Maintenance),
            "reviews" => Some(Self::Reviews),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Packages => "packages",
            Self::Maintenance => "maintenance",
            Self::Reviews => "reviews",
            Self::Contact => "contact",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Which intake an order action starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKind {
    /// A catalog package, by product id.
    Package(String),
    Maintenance,
    Contact,
}

/// A button press, parsed from its action id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `menu_<screen>`
    Show(Screen),
    /// `order_<product>`, `order_maint`, `order_contact`
    Order(OrderKind),
}

impl Action {
    /// Parse an action id. Returns `None` for anything unrecognised.
    pub fn parse(id: &str) -> Option<Self> {
        if let Some(screen) = id.strip_prefix("menu_") {
            return Screen::parse(screen).map(Self::Show);
        }
        let target = id.strip_prefix("order_")?;
        let kind = match target {
            "" => return None,
            "maint" => OrderKind::Maintenance,
            "contact" => OrderKind::Contact,
            product => OrderKind::Package(product.to_string()),
        };
        Some(Self::Order(kind))
    }

    /// The wire identifier for this action.
    pub fn id(&self) -> String {
        match self {
            Self::Show(screen) => format!("menu_{screen}"),
            Self::Order(OrderKind::Package(product)) => format!("order_{product}"),
            Self::Order(OrderKind::Maintenance) => "order_maint".to_string(),
            Self::Order(OrderKind::Contact) => "order_contact".to_string(),
        }
    }
}

/// One selectable entry of a menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuButton {
    pub label: String,
    pub action_id: String,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action_id: action.id(),
        }
    }

    /// Parse the button's action id back into an [`Action`].
    pub fn action(&self) -> Option<Action> {
        Action::parse(&self.action_id)
    }
}

/// Outbound response: text plus an optional menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<Vec<MenuButton>>,
    /// Replace the message that carried the pressed button instead of
    /// sending a new one. Adapters fall back to sending when editing fails.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub edit: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            menu: None,
            edit: false,
        }
    }

    pub fn with_menu(mut self, menu: Vec<MenuButton>) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn editing(mut self) -> Self {
        self.edit = true;
        self
    }
}

fn back() -> MenuButton {
    MenuButton::new("⬅ Back", Action::Show(Screen::Main))
}

/// The buttons shown on a screen.
pub fn buttons(config: &FunnelConfig, screen: Screen) -> Vec<MenuButton> {
    match screen {
        Screen::Main => vec![
            MenuButton::new("💼 Our Packages", Action::Show(Screen::Packages)),
            MenuButton::new("🛠 Maintenance", Action::Show(Screen::Maintenance)),
            MenuButton::new("⭐ Reviews", Action::Show(Screen::Reviews)),
            MenuButton::new("📩 Contact", Action::Show(Screen::Contact)),
        ],
        Screen::Packages => config
            .products
            .iter()
            .map(|p| {
                MenuButton::new(
                    p.order_label(),
                    Action::Order(OrderKind::Package(p.id.clone())),
                )
            })
            .chain(std::iter::once(back()))
            .collect(),
        Screen::Maintenance => vec![
            MenuButton::new(
                format!("🛒 Order Maintenance (€{}/mo)", config.maintenance_fee),
                Action::Order(OrderKind::Maintenance),
            ),
            back(),
        ],
        Screen::Reviews => vec![back()],
        Screen::Contact => vec![
            MenuButton::new("✉ Leave My Contact", Action::Order(OrderKind::Contact)),
            back(),
        ],
    }
}

/// Render a screen to its display text and buttons.
pub fn render(config: &FunnelConfig, screen: Screen) -> Reply {
    Reply::text(prompts::screen_text(config, screen)).with_menu(buttons(config, screen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_menu_actions() {
        for screen in Screen::ALL {
            let id = format!("menu_{screen}");
            assert_eq!(Action::parse(&id), Some(Action::Show(screen)));
        }
        assert_eq!(Action::parse("menu_settings"), None);
    }

    #[test]
    fn parse_order_actions() {
        assert_eq!(
            Action::parse("order_silver"),
            Some(Action::Order(OrderKind::Package("silver".into())))
        );
        assert_eq!(
            Action::parse("order_maint"),
            Some(Action::Order(OrderKind::Maintenance))
        );
        assert_eq!(
            Action::parse("order_contact"),
            Some(Action::Order(OrderKind::Contact))
        );
        assert_eq!(Action::parse("order_"), None);
        assert_eq!(Action::parse("silver"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn action_id_matches_parse() {
        let actions = [
            Action::Show(Screen::Reviews),
            Action::Order(OrderKind::Package("gold".into())),
            Action::Order(OrderKind::Maintenance),
            Action::Order(OrderKind::Contact),
        ];
        for action in actions {
            assert_eq!(Action::parse(&action.id()), Some(action));
        }
    }

    #[test]
    fn screen_parse_unknown() {
        assert_eq!(Screen::parse("packages"), Some(Screen::Packages));
        assert_eq!(Screen::parse("Packages"), None);
    }

    #[test]
    fn main_menu_buttons() {
        let config = FunnelConfig::default();
        let ids: Vec<String> = buttons(&config, Screen::Main)
            .into_iter()
            .map(|b| b.action_id)
            .collect();
        assert_eq!(
            ids,
            vec!["menu_packages", "menu_maintenance", "menu_reviews", "menu_contact"]
        );
    }

    #[test]
    fn packages_menu_follows_catalog() {
        let config = FunnelConfig::default();
        let menu = buttons(&config, Screen::Packages);
        assert_eq!(menu.len(), 3);
        assert_eq!(menu[0].label, "🥈 Order Silver (€350)");
        assert_eq!(menu[0].action_id, "order_silver");
        assert_eq!(menu[1].action_id, "order_gold");
        assert_eq!(menu[2].action_id, "menu_main");
    }

    #[test]
    fn maintenance_button_shows_fee() {
        let config = FunnelConfig::default();
        let menu = buttons(&config, Screen::Maintenance);
        assert_eq!(menu[0].label, "🛒 Order Maintenance (€49.99/mo)");
        assert_eq!(menu[0].action(), Some(Action::Order(OrderKind::Maintenance)));
    }

    #[test]
    fn every_screen_button_parses() {
        let config = FunnelConfig::default();
        for screen in Screen::ALL {
            for button in buttons(&config, screen) {
                assert!(
                    button.action().is_some(),
                    "{} on {screen} has an unparseable action",
                    button.action_id
                );
            }
        }
    }

    #[test]
    fn render_is_stable() {
        let config = FunnelConfig::default();
        for screen in Screen::ALL {
            assert_eq!(render(&config, screen), render(&config, screen));
        }
    }

    #[test]
    fn reply_serializes_without_empty_fields() {
        let json = serde_json::to_value(Reply::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi"}));
    }
}
