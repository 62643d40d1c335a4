use crate::metadata::{self, Metadata};
use crate::product::derive_key;
use crate::ProviderKind;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a string-tagged enum with `as_str`, `parse` and the list of tags.
macro_rules! tagged_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $tag)] $variant),+
        }

        impl $name {
            /// Tags accepted in config files.
            pub const TAGS: &'static [&'static str] = &[$($tag),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag),+
                }
            }

            pub fn parse(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tagged_enum!(
    /// Whether a price is charged once or on a schedule.
    PriceType { OneTime => "one_time", Recurring => "recurring" }
);

tagged_enum!(
    /// Billing interval unit for recurring prices.
    Interval { Day => "day", Week => "week", Month => "month", Year => "year" }
);

tagged_enum!(
    UsageType { Licensed => "licensed", Metered => "metered" }
);

tagged_enum!(
    /// How metered usage is aggregated over a billing period.
    AggregateUsage {
        Sum => "sum",
        LastDuringPeriod => "last_during_period",
        LastEver => "last_ever",
        Max => "max",
    }
);

tagged_enum!(
    TaxBehavior { Inclusive => "inclusive", Exclusive => "exclusive", Unspecified => "unspecified" }
);

tagged_enum!(
    BillingScheme { PerUnit => "per_unit", Tiered => "tiered" }
);

impl Default for PriceType {
    fn default() -> Self {
        Self::OneTime
    }
}

/// Schedule for a recurring price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurring {
    pub interval: Interval,
    #[serde(default = "default_interval_count")]
    pub interval_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_period_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_type: Option<UsageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_usage: Option<AggregateUsage>,
}

impl Recurring {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            interval_count: 1,
            trial_period_days: None,
            usage_type: None,
            aggregate_usage: None,
        }
    }

    pub fn every(interval: Interval, count: u32) -> Self {
        Self {
            interval_count: count,
            ..Self::new(interval)
        }
    }
}

fn default_interval_count() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A declared price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Amount in minor currency units (e.g. cents).
    pub unit_amount: u64,
    /// ISO 4217 code, three characters.
    pub currency: String,
    #[serde(rename = "type", default)]
    pub price_type: PriceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurring>,
    #[serde(default = "default_active", skip_serializing_if = "is_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_behavior: Option<TaxBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_scheme: Option<BillingScheme>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A broken price invariant, reported against a field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceViolation {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for PriceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl Price {
    /// A one-time price.
    pub fn one_time(
        provider: ProviderKind,
        name: impl Into<String>,
        unit_amount: u64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            key: None,
            name: name.into(),
            nickname: None,
            unit_amount,
            currency: currency.into(),
            price_type: PriceType::OneTime,
            recurring: None,
            active: true,
            product_id: None,
            product_key: None,
            tax_behavior: None,
            billing_scheme: None,
            metadata: Metadata::new(),
            id: None,
        }
    }

    /// A recurring price with the given schedule.
    pub fn recurring(
        provider: ProviderKind,
        name: impl Into<String>,
        unit_amount: u64,
        currency: impl Into<String>,
        recurring: Recurring,
    ) -> Self {
        Self {
            price_type: PriceType::Recurring,
            recurring: Some(recurring),
            ..Self::one_time(provider, name, unit_amount, currency)
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_product_key(mut self, key: impl Into<String>) -> Self {
        self.product_key = Some(key.into());
        self
    }

    pub fn with_product_id(mut self, id: impl Into<String>) -> Self {
        self.product_id = Some(id.into());
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.price_type == PriceType::Recurring
    }

    /// Nickname sent to the provider; falls back to the name.
    pub fn display_nickname(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }

    /// Returns the key, generating one if absent.
    ///
    /// Generated keys combine the slugified name with the current time in
    /// milliseconds, so they are unique but not reproducible across runs.
    pub fn ensure_key(&mut self) -> &str {
        if self.key.as_deref().is_none_or(str::is_empty) {
            self.key = Some(format!(
                "{}_{}",
                derive_key(&self.name),
                Utc::now().timestamp_millis()
            ));
        }
        self.key.as_deref().unwrap_or_default()
    }

    /// Checks the invariants a provider would otherwise reject.
    pub fn violations(&self) -> Vec<PriceViolation> {
        let mut out = Vec::new();
        let mut push = |field, reason: String| out.push(PriceViolation { field, reason });

        if self.currency.chars().count() != 3 {
            push(
                "currency",
                format!("'{}' must be a 3-character ISO code", self.currency),
            );
        }
        if self.is_recurring() && self.recurring.is_none() {
            push(
                "recurring",
                "recurring prices require a recurring block".to_string(),
            );
        }
        if let Some(recurring) = &self.recurring {
            if recurring.interval_count == 0 {
                push("recurring.intervalCount", "must be at least 1".to_string());
            }
            if let Some(days) = recurring.trial_period_days {
                if !(1..=365).contains(&days) {
                    push(
                        "recurring.trialPeriodDays",
                        format!("{days} must be between 1 and 365"),
                    );
                }
            }
            if recurring.aggregate_usage.is_some()
                && recurring.usage_type != Some(UsageType::Metered)
            {
                push(
                    "recurring.aggregateUsage",
                    "requires usageType 'metered'".to_string(),
                );
            }
        }
        out
    }

    pub fn mark_failed(&mut self, error: &str) {
        metadata::mark_failed(&mut self.metadata, error);
    }

    pub fn clear_failure(&mut self) {
        metadata::clear_failure(&mut self.metadata);
    }

    pub fn is_failed(&self) -> bool {
        metadata::is_failed(&self.metadata)
    }
}
