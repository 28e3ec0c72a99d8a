//! Configuration types.
//!
//! [`FunnelConfig`] is the static storefront content (catalog, prices,
//! contact details, reviews). [`BotConfig`] is the runtime wiring read from
//! the environment.

use std::path::PathBuf;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::funnel::catalog::Product;

/// Static storefront content. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    /// Display name used in the welcome text.
    pub store_name: String,
    /// Packages offered on the packages screen, in display order.
    pub products: Vec<Product>,
    /// Down payment requested before work starts.
    pub down_payment: Decimal,
    /// Monthly maintenance fee.
    pub maintenance_fee: Decimal,
    /// Where down payments are sent.
    pub btc_address: String,
    pub contact_telegram: String,
    pub contact_email: String,
    /// One line per customer review.
    pub reviews: Vec<String>,
    /// Note appended under the reviews.
    pub review_photo_note: String,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            store_name: "Kyvarion Bots".to_string(),
            products: vec![
                Product::new("silver", "Silver", "🥈", dec!(350))
                    .with_description("No AI • Fully customizable • Delivery in 24–48h.")
                    .with_features(["No AI", "Fully customizable", "Ready in 24–48h"]),
                Product::new("gold", "Gold", "🥇", dec!(450))
                    .with_description("AI-powered • Fully customizable • Delivery in 48–72h.")
                    .with_features([
                        "With AI (OpenAI integration)",
                        "Fully customizable",
                        "Ready in 48–72h",
                    ]),
            ],
            down_payment: dec!(100),
            maintenance_fee: dec!(49.99),
            btc_address: "bc1qz02e0npyrakucwvwjdcehtxvwg3q7ewrxzpdnx".to_string(),
            contact_telegram: "@kyvarion".to_string(),
            contact_email: "contact@kyvarion.com".to_string(),
            reviews: vec![
                "⭐ \"Kyvarion Bot doubled my group sales!\" – Alex S.".to_string(),
                "⭐ \"Looks pro & easy to use.\" – Maria D.".to_string(),
                "⭐ \"The AI feature saves me hours.\" – Daniel T.".to_string(),
            ],
            review_photo_note: "📷 You can display *photo reviews* here: screenshots from your \
                                buyers, product proof, payment receipts — all directly in the bot!"
                .to_string(),
        }
    }
}

impl FunnelConfig {
    /// Look up a catalog entry by id.
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

/// Default port for the status server.
pub const DEFAULT_PORT: u16 = 8080;

/// Runtime configuration read from the environment.
#[derive(Debug)]
pub struct BotConfig {
    /// Telegram bot token. `None` runs without the Telegram channel.
    pub telegram_token: Option<SecretString>,
    /// Telegram usernames or numeric ids allowed to talk to the bot. `*` allows everyone.
    pub allowed_users: Vec<String>,
    /// Port for the status HTTP server.
    pub port: u16,
    /// Optional JSONL file that receives every captured lead.
    pub leads_path: Option<PathBuf>,
    /// Whether the stdin CLI channel is enabled.
    pub enable_cli: bool,
    /// Optional directory for daily rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = lookup("BOT_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PORT".into(),
                    message: e.to_string(),
                })?,
            None => DEFAULT_PORT,
        };

        let enable_cli = matches!(
            lookup("FUNNEL_CLI").as_deref().map(str::trim),
            Some("1" | "true" | "yes")
        );

        if telegram_token.is_none() && !enable_cli {
            return Err(ConfigError::MissingEnvVar("BOT_TOKEN".into()));
        }

        Ok(Self {
            telegram_token,
            allowed_users,
            port,
            leads_path: lookup("FUNNEL_LEADS_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            enable_cli,
            log_dir: lookup("FUNNEL_LOG_DIR")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
