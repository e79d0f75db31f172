use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One dynamic-pricing rule: when available seats fall to or below
/// `threshold`, the running price is increased by `percentage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub threshold: i32,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicPricing {
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<PricingRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub venue: String,
    pub category: String,
    pub total_seats: i32,
    pub base_price: f64,
    pub pricing: DynamicPricing,
    pub sold_tickets: i32,
    pub revenue: f64,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn available_seats(&self) -> i32 {
        self.total_seats - self.sold_tickets
    }

    /// Current ticket price under dynamic pricing.
    ///
    /// Every rule whose threshold has been reached multiplies the running
    /// price, in declaration order (the rule list is NOT sorted). The
    /// result is rounded to 2 decimal places.
    pub fn current_price(&self) -> f64 {
        if !self.pricing.enabled {
            return self.base_price;
        }

        let available = self.available_seats();
        let mut price = self.base_price;
        for rule in &self.pricing.rules {
            if available <= rule.threshold {
                price *= 1.0 + rule.percentage / 100.0;
            }
        }

        round2(price)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
