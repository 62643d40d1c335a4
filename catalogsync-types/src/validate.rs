//! Schema validation for raw catalog input.
//!
//! Input arrives as a `serde_json::Value` (config loaders for every file
//! format produce one). Validation walks the whole document and collects
//! every issue with its path, so a user sees all problems at once instead of
//! the first one serde happens to trip over.

use crate::{
    AggregateUsage, BillingScheme, Config, Interval, Price, PriceType, Product, ProviderKind,
    TaxBehavior, UsageType,
};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A single schema problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, e.g. `prices[2].currency`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Config failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn render(issues: &[ValidationIssue]) -> String {
    if let [only] = issues {
        if only.path.is_empty() {
            return only.message.clone();
        }
    }
    let mut out = String::from("configuration validation failed:");
    for issue in issues {
        out.push_str("\n  - ");
        out.push_str(&issue.to_string());
    }
    out
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// The friendly rewrite for the most common mistake: entities without a
    /// `provider` tag.
    pub fn missing_provider() -> Self {
        Self::new(vec![ValidationIssue::new(
            "",
            format!(
                "Configuration validation failed: your products and prices are missing the \
                 'provider' field. Each product and price must have a 'provider' field set to \
                 one of: {}. Please update your configuration file to include this field.",
                ProviderKind::known_tags()
            ),
        )])
    }

    pub fn is_missing_provider(&self) -> bool {
        matches!(self.issues.as_slice(), [only] if only.path.is_empty() && only.message.contains("'provider' field"))
    }
}

/// Validates raw input and returns the typed config with defaults applied.
///
/// Missing `products` / `prices` arrays are treated as empty.
pub fn validate(raw: &Value) -> Result<Config, ValidationError> {
    let mut checker = Checker::default();

    let root = match raw {
        Value::Object(map) => map,
        Value::Null => return Ok(Config::default()),
        other => {
            return Err(ValidationError::new(vec![ValidationIssue::new(
                "",
                format!(
                    "expected an object with 'products' and 'prices', found {}",
                    kind(other)
                ),
            )]));
        }
    };

    let products = checker.entity_list(root, "products");
    let prices = checker.entity_list(root, "prices");

    let mut config = Config::default();
    for (i, item) in products.iter().enumerate() {
        let path = format!("products[{i}]");
        if let Some(product) = checker.product(item, &path) {
            config.products.push(product);
        }
    }
    for (i, item) in prices.iter().enumerate() {
        let path = format!("prices[{i}]");
        if let Some(price) = checker.price(item, &path) {
            config.prices.push(price);
        }
    }

    if checker.missing_provider {
        return Err(ValidationError::missing_provider());
    }
    if !checker.issues.is_empty() {
        return Err(ValidationError::new(checker.issues));
    }
    Ok(config)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Default)]
struct Checker {
    issues: Vec<ValidationIssue>,
    missing_provider: bool,
}

impl Checker {
    fn issue(&mut self, path: String, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(path, message));
    }

    fn entity_list<'a>(&mut self, root: &'a Map<String, Value>, field: &str) -> &'a [Value] {
        match root.get(field) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.issue(field.to_string(), format!("expected an array, found {}", kind(other)));
                &[]
            }
        }
    }

    fn object<'a>(&mut self, item: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match item {
            Value::Object(map) => Some(map),
            other => {
                self.issue(path.to_string(), format!("expected an object, found {}", kind(other)));
                None
            }
        }
    }

    fn provider(&mut self, obj: &Map<String, Value>, path: &str) -> bool {
        match obj.get("provider") {
            None | Some(Value::Null) => {
                self.missing_provider = true;
                false
            }
            Some(Value::String(tag)) => match tag.parse::<ProviderKind>() {
                Ok(_) => true,
                Err(message) => {
                    self.issue(format!("{path}.provider"), message);
                    false
                }
            },
            Some(other) => {
                self.issue(
                    format!("{path}.provider"),
                    format!("expected a string, found {}", kind(other)),
                );
                false
            }
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, path: &str, field: &str) -> bool {
        match obj.get(field) {
            Some(Value::String(_)) => true,
            None | Some(Value::Null) => {
                self.issue(format!("{path}.{field}"), "required");
                false
            }
            Some(other) => {
                self.issue(
                    format!("{path}.{field}"),
                    format!("expected a string, found {}", kind(other)),
                );
                false
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, path: &str, field: &str) -> bool {
        match obj.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => true,
            Some(other) => {
                self.issue(
                    format!("{path}.{field}"),
                    format!("expected a string, found {}", kind(other)),
                );
                false
            }
        }
    }

    fn optional_bool(&mut self, obj: &Map<String, Value>, path: &str, field: &str) -> bool {
        match obj.get(field) {
            None | Some(Value::Null) | Some(Value::Bool(_)) => true,
            Some(other) => {
                self.issue(
                    format!("{path}.{field}"),
                    format!("expected a boolean, found {}", kind(other)),
                );
                false
            }
        }
    }

    fn optional_string_list(&mut self, obj: &Map<String, Value>, path: &str, field: &str) -> bool {
        match obj.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::Array(items)) => {
                let mut ok = true;
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        self.issue(
                            format!("{path}.{field}[{i}]"),
                            format!("expected a string, found {}", kind(item)),
                        );
                        ok = false;
                    }
                }
                ok
            }
            Some(other) => {
                self.issue(
                    format!("{path}.{field}"),
                    format!("expected an array of strings, found {}", kind(other)),
                );
                false
            }
        }
    }

    fn optional_tag(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        field: &str,
        tags: &[&str],
    ) -> bool {
        match obj.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::String(tag)) if tags.contains(&tag.as_str()) => true,
            Some(other) => {
                self.issue(
                    format!("{path}.{field}"),
                    format!("expected one of {}, found {other}", tags.join(", ")),
                );
                false
            }
        }
    }

    fn integer(
        &mut self,
        obj: &Map<String, Value>,
        path: &str,
        field: &str,
        required: bool,
    ) -> bool {
        match obj.get(field) {
            None | Some(Value::Null) if !required => true,
            None | Some(Value::Null) => {
                self.issue(format!("{path}.{field}"), "required");
                false
            }
            Some(Value::Number(n)) if n.is_u64() => true,
            Some(other) => {
                self.issue(
                    format!("{path}.{field}"),
                    format!("expected a non-negative integer, found {other}"),
                );
                false
            }
        }
    }

    fn metadata(&mut self, obj: &Map<String, Value>, path: &str) -> bool {
        let map = match obj.get("metadata") {
            None | Some(Value::Null) => return true,
            Some(Value::Object(map)) => map,
            Some(other) => {
                self.issue(
                    format!("{path}.metadata"),
                    format!("expected an object, found {}", kind(other)),
                );
                return false;
            }
        };
        let mut ok = true;
        for (key, value) in map {
            let valid = match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
                Value::Array(items) => items.iter().all(Value::is_string),
                _ => false,
            };
            if !valid {
                self.issue(
                    format!("{path}.metadata.{key}"),
                    "expected a string, number, boolean or array of strings",
                );
                ok = false;
            }
        }
        ok
    }

    fn product(&mut self, item: &Value, path: &str) -> Option<Product> {
        let obj = self.object(item, path)?;
        let checks = [
            self.provider(obj, path),
            self.required_string(obj, path, "name"),
            self.optional_string(obj, path, "key"),
            self.optional_string(obj, path, "description"),
            self.optional_string(obj, path, "id"),
            self.optional_string_list(obj, path, "features"),
            self.optional_bool(obj, path, "highlight"),
            self.metadata(obj, path),
        ];
        if checks.contains(&false) {
            return None;
        }
        self.decode(item, path)
    }

    fn price(&mut self, item: &Value, path: &str) -> Option<Price> {
        let obj = self.object(item, path)?;
        let mut checks = vec![
            self.provider(obj, path),
            self.required_string(obj, path, "name"),
            self.optional_string(obj, path, "key"),
            self.optional_string(obj, path, "nickname"),
            self.integer(obj, path, "unitAmount", true),
            self.required_string(obj, path, "currency"),
            self.optional_tag(obj, path, "type", PriceType::TAGS),
            self.optional_bool(obj, path, "active"),
            self.optional_string(obj, path, "productId"),
            self.optional_string(obj, path, "productKey"),
            self.optional_string(obj, path, "id"),
            self.optional_tag(obj, path, "taxBehavior", TaxBehavior::TAGS),
            self.optional_tag(obj, path, "billingScheme", BillingScheme::TAGS),
            self.metadata(obj, path),
        ];
        match obj.get("recurring") {
            None | Some(Value::Null) => {}
            Some(Value::Object(recurring)) => {
                let rpath = format!("{path}.recurring");
                checks.extend([
                    self.required_interval(recurring, &rpath),
                    self.integer(recurring, &rpath, "intervalCount", false),
                    self.integer(recurring, &rpath, "trialPeriodDays", false),
                    self.optional_tag(recurring, &rpath, "usageType", UsageType::TAGS),
                    self.optional_tag(recurring, &rpath, "aggregateUsage", AggregateUsage::TAGS),
                ]);
            }
            Some(other) => {
                self.issue(
                    format!("{path}.recurring"),
                    format!("expected an object, found {}", kind(other)),
                );
                checks.push(false);
            }
        }
        if checks.contains(&false) {
            return None;
        }

        let price: Price = self.decode(item, path)?;
        let violations = price.violations();
        if violations.is_empty() {
            return Some(price);
        }
        for violation in violations {
            self.issue(format!("{path}.{}", violation.field), violation.reason);
        }
        None
    }

    fn required_interval(&mut self, obj: &Map<String, Value>, path: &str) -> bool {
        if obj.get("interval").is_none_or(Value::is_null) {
            self.issue(format!("{path}.interval"), "required");
            return false;
        }
        self.optional_tag(obj, path, "interval", Interval::TAGS)
    }

    fn decode<T: serde::de::DeserializeOwned>(&mut self, item: &Value, path: &str) -> Option<T> {
        match serde_json::from_value(item.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                self.issue(path.to_string(), e.to_string());
                None
            }
        }
    }
}
