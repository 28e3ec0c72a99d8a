//! Display text for every screen and intake step.

use rust_decimal::Decimal;

use crate::config::FunnelConfig;

use super::lead::Lead;
use super::menu::Screen;

pub const ASK_PHONE: &str = "Great! Now send me your phone number:";
pub const BAD_EMAIL: &str = "That doesn't look like an email. Try again:";
pub const BAD_PHONE: &str = "That doesn't look like a phone number. Try again:";
pub const ASK_PAYMENT_NOTE: &str = "Thanks! If you've sent the down payment, paste the TX ID or \
                                    say 'done'.\nIf not yet, you can do it now using the BTC \
                                    address above.";
pub const FALLBACK: &str = "Use the menu below to browse packages or leave your contact.";
pub const ASK_EMAIL: &str = "Please enter your email address:";

pub fn welcome(config: &FunnelConfig) -> String {
    format!(
        "👋 Welcome to {}!\n\
         We build custom Telegram shop bots for sellers & communities.\n\n\
         Choose an option below:",
        config.store_name
    )
}

/// Body text for a menu screen.
pub fn screen_text(config: &FunnelConfig, screen: Screen) -> String {
    match screen {
        Screen::Main => welcome(config),
        Screen::Packages => {
            let packages: Vec<String> = config.products.iter().map(|p| p.summary()).collect();
            format!("Choose your bot package:\n\n{}", packages.join("\n\n"))
        }
        Screen::Maintenance => format!(
            "Monthly Maintenance – €{}\n\n\
             Includes:\n\
             • Product / content updates\n\
             • Feature tweaks\n\
             • Bug fixes\n\
             • Priority support",
            config.maintenance_fee
        ),
        Screen::Reviews => format!(
            "{}\n\n{}",
            config.reviews.join("\n"),
            config.review_photo_note
        ),
        Screen::Contact => format!(
            "Ready to launch your own bot?\n\n\
             Telegram: {}\n\
             Email: {}\n\n\
             Or tap below to leave your contact now.",
            config.contact_telegram, config.contact_email
        ),
    }
}

/// Prompt shown after choosing a catalog package.
pub fn package_order(config: &FunnelConfig, package: &str, total: Decimal) -> String {
    format!(
        "{package} Bot – €{total} total.\n\n\
         To start your order, please send a *down payment of €{}* in BTC.\n\
         BTC address:\n{}\n\n\
         After you send the down payment, please paste the TX ID or send a screenshot here.\n\n\
         First, please enter your *email address* to continue:",
        config.down_payment, config.btc_address
    )
}

/// Prompt shown after choosing the maintenance plan.
pub fn maintenance_order(config: &FunnelConfig) -> String {
    format!(
        "You selected Maintenance (€{}/month).\n\n{ASK_EMAIL}",
        config.maintenance_fee
    )
}

/// Confirmation sent once a lead is captured.
pub fn lead_received(config: &FunnelConfig, lead: &Lead) -> String {
    format!(
        "✅ Thanks! We received your info.\n\n\
         Package: {}\n\
         Email: {}\n\
         Phone: {}\n\
         Message: {}\n\n\
         If you haven't yet, remember: *€{} BTC* to start.\n\
         BTC: {}\n\n\
         We will contact you shortly!",
        lead.package, lead.email, lead.phone, lead.note, config.down_payment, config.btc_address
    )
}
