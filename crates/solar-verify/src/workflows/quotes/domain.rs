use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Quote as submitted by a homeowner. Numeric fields stay optional here so the verdict engine
/// can report exactly which inputs were missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteInput {
    #[serde(default, alias = "system_size", deserialize_with = "deserialize_lenient_f64")]
    pub system_size_kw: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub has_battery: bool,
    #[serde(default, alias = "battery_brand")]
    pub battery_identifier: Option<String>,
    #[serde(
        default = "default_battery_quantity",
        deserialize_with = "deserialize_lenient_quantity"
    )]
    pub battery_quantity: u32,
    #[serde(
        default,
        alias = "battery_capacity",
        deserialize_with = "deserialize_lenient_f64"
    )]
    pub battery_capacity_kwh: Option<f64>,
    /// Requester counted by usage tracking: an address or an anonymous session id.
    #[serde(default)]
    pub user_email: Option<String>,
}

fn default_battery_quantity() -> u32 {
    1
}

impl QuoteInput {
    pub fn solar_only(system_size_kw: f64, total_price: f64) -> Self {
        Self {
            system_size_kw: Some(system_size_kw),
            total_price: Some(total_price),
            has_battery: false,
            battery_identifier: None,
            battery_quantity: 1,
            battery_capacity_kwh: None,
            user_email: None,
        }
    }

    pub fn with_battery(
        mut self,
        identifier: impl Into<String>,
        quantity: u32,
        capacity_kwh: Option<f64>,
    ) -> Self {
        self.has_battery = true;
        self.battery_identifier = Some(identifier.into());
        self.battery_quantity = quantity;
        self.battery_capacity_kwh = capacity_kwh;
        self
    }

    /// Required fields that are absent or not strictly positive.
    pub fn missing_fields(&self) -> Vec<QuoteField> {
        [
            (QuoteField::SystemSizeKw, self.system_size_kw),
            (QuoteField::TotalPrice, self.total_price),
        ]
        .into_iter()
        .filter(|(_, value)| !matches!(value, Some(v) if v.is_finite() && *v > 0.0))
        .map(|(field, _)| field)
        .collect()
    }

    pub fn validate(&self) -> Result<ValidatedQuote, QuoteValidationError> {
        let absent: Vec<QuoteField> = [
            (QuoteField::SystemSizeKw, self.system_size_kw),
            (QuoteField::TotalPrice, self.total_price),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(field, _)| field)
        .collect();
        if !absent.is_empty() {
            return Err(QuoteValidationError::Missing(absent));
        }

        if let Some(field) = self.missing_fields().into_iter().next() {
            return Err(QuoteValidationError::NonPositive(field));
        }

        let system_size_kw = self.system_size_kw.unwrap_or_default();
        let total_price = self.total_price.unwrap_or_default();
        if !(total_price / system_size_kw).is_finite() {
            return Err(QuoteValidationError::Unpriceable);
        }

        let battery = self.has_battery.then(|| BatterySpec {
            identifier: self
                .battery_identifier
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            quantity: self.battery_quantity.max(1),
            capacity_kwh: self
                .battery_capacity_kwh
                .filter(|capacity| capacity.is_finite() && *capacity > 0.0),
        });

        Ok(ValidatedQuote {
            system_size_kw,
            total_price,
            battery,
        })
    }
}

/// A quote whose required numbers are known to be positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuote {
    pub system_size_kw: f64,
    pub total_price: f64,
    pub battery: Option<BatterySpec>,
}

/// Battery portion of a quote. A quantity of zero on a battery quote counts as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BatterySpec {
    pub identifier: Option<String>,
    pub quantity: u32,
    pub capacity_kwh: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteField {
    SystemSizeKw,
    TotalPrice,
}

impl QuoteField {
    pub fn key(self) -> &'static str {
        match self {
            QuoteField::SystemSizeKw => "system_size_kw",
            QuoteField::TotalPrice => "total_price",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuoteField::SystemSizeKw => "System size",
            QuoteField::TotalPrice => "Total price",
        }
    }
}

impl fmt::Display for QuoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteValidationError {
    #[error("missing required fields: {}", join_fields(.0))]
    Missing(Vec<QuoteField>),
    #[error("{} must be greater than 0", .0.label())]
    NonPositive(QuoteField),
    /// Positive inputs whose derived prices overflow.
    #[error("Quote values are too large to price")]
    Unpriceable,
}

impl QuoteValidationError {
    pub fn fields(&self) -> Vec<QuoteField> {
        match self {
            QuoteValidationError::Missing(fields) => fields.clone(),
            QuoteValidationError::NonPositive(field) => vec![*field],
            QuoteValidationError::Unpriceable => Vec::new(),
        }
    }
}

fn join_fields(fields: &[QuoteField]) -> String {
    fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Condensed view of the quote carried inside analysis snapshots and report emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub system_size_kw: f64,
    pub total_price: f64,
    pub has_battery: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_label: Option<String>,
    #[serde(default)]
    pub battery_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_capacity_kwh: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn parse_lenient(raw: Option<NumberOrText>) -> Result<Option<f64>, String> {
    match raw {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("undefined") {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|err| format!("failed to parse '{text}' as a number ({err})"))
        }
    }
}

/// Accepts JSON numbers, numeric strings, `null`, `""` and `"undefined"`.
pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    parse_lenient(raw).map_err(serde::de::Error::custom)
}

fn deserialize_lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    match parse_lenient(raw).map_err(serde::de::Error::custom)? {
        None => Ok(default_battery_quantity()),
        Some(value) if value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) => {
            Ok(value as u32)
        }
        Some(value) => Err(serde::de::Error::custom(format!(
            "battery_quantity must be a non-negative whole number, got {value}"
        ))),
    }
}
