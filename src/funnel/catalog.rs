//! Product catalog entries.

use rust_decimal::Decimal;
use serde::Serialize;

/// A package offered on the packages screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Stable id, also the suffix of the `order_<id>` action.
    pub id: String,
    /// Short name recorded on the lead, e.g. "Silver".
    pub name: String,
    /// Emoji shown before the name.
    pub badge: String,
    /// Total price in euros.
    pub price: Decimal,
    pub description: String,
    /// Bullet points for the packages screen.
    pub features: Vec<String>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        badge: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            badge: badge.into(),
            price,
            description: String::new(),
            features: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Label for the order button on the packages screen.
    pub fn order_label(&self) -> String {
        format!("{} Order {} (€{})", self.badge, self.name, self.price)
    }

    /// Block of text describing this package on the packages screen.
    pub fn summary(&self) -> String {
        let mut out = format!("{} {} Bot – €{}", self.badge, self.name, self.price);
        for feature in &self.features {
            out.push_str("\n • ");
            out.push_str(feature);
        }
        out
    }
}
