//! Record shapes accepted by the fundraiser and their validation rules.
//!
//! Each record kind maps to a document collection named after it:
//!
//! - [`Investor`] → `"investor"`
//! - [`Contribution`] → `"contribution"`
//!
//! Payload fields are read one at a time, so a missing or mistyped field is
//! reported without stopping the others from being checked. The field rules
//! (lengths, email format, positive amount) then run on the assembled record
//! and every broken rule is returned together. A record value that leaves
//! `parse` therefore satisfies all of them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

// ─────────────────────────────────────────────────────────
// Validation error
// ─────────────────────────────────────────────────────────

/// A single broken rule: which field, and which rule it broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub rule: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
        }
    }
}

/// Every rule a payload broke, sorted by field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    fn from_violations(mut violations: Vec<Violation>) -> Self {
        violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.rule.cmp(&b.rule)));
        Self { violations }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed:")?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{} ({})", v.field, v.rule)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Field reader
// ─────────────────────────────────────────────────────────

/// Pulls typed fields out of a JSON object, recording a `required` or `type`
/// violation instead of failing. A field that broke one of those gets a
/// placeholder value and is left out of the rule checks in [`Fields::finish`].
struct Fields {
    map: Map<String, Value>,
    violations: Vec<Violation>,
}

impl Fields {
    fn from_payload(payload: Value) -> Result<Self, ValidationError> {
        match payload {
            Value::Object(map) => Ok(Self {
                map,
                violations: Vec::new(),
            }),
            _ => Err(ValidationError::from_violations(vec![Violation::new(
                "body", "object",
            )])),
        }
    }

    /// The field's value; `null` counts as absent.
    fn take(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name).filter(|v| !v.is_null())
    }

    fn reject(&mut self, name: &str, rule: &str) {
        self.violations.push(Violation::new(name, rule));
    }

    fn optional_text(&mut self, name: &str) -> Option<String> {
        match self.take(name)? {
            Value::String(s) => Some(s),
            _ => {
                self.reject(name, "type");
                None
            }
        }
    }

    fn text(&mut self, name: &str) -> String {
        if !self.map.get(name).is_some_and(|v| !v.is_null()) {
            self.reject(name, "required");
        }
        self.optional_text(name).unwrap_or_default()
    }

    /// A JSON boolean. Strings such as `"yes"` are not accepted as consent.
    fn flag(&mut self, name: &str) -> bool {
        match self.take(name) {
            Some(Value::Bool(b)) => b,
            Some(_) => {
                self.reject(name, "type");
                false
            }
            None => {
                self.reject(name, "required");
                false
            }
        }
    }

    /// A JSON number, or a string holding a finite decimal number.
    fn number(&mut self, name: &str) -> f64 {
        let parsed = match self.take(name) {
            None => {
                self.reject(name, "required");
                return 0.0;
            }
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match parsed.filter(|n| n.is_finite()) {
            Some(n) => n,
            None => {
                self.reject(name, "type");
                0.0
            }
        }
    }

    /// Run the record's field rules and combine them with the reader's own
    /// violations.
    fn finish<R: Validate>(self, record: R) -> Result<R, ValidationError> {
        let mut violations = self.violations;
        if let Err(errors) = record.validate() {
            let rule_violations: Vec<Violation> = collect_violations(&errors)
                .into_iter()
                .filter(|v| !violations.iter().any(|seen| seen.field == v.field))
                .collect();
            violations.extend(rule_violations);
        }

        if violations.is_empty() {
            Ok(record)
        } else {
            Err(ValidationError::from_violations(violations))
        }
    }
}

fn collect_violations(errors: &ValidationErrors) -> Vec<Violation> {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(move |e| Violation::new(field.to_string(), e.code.to_string()))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Record trait
// ─────────────────────────────────────────────────────────

/// A validated record that can be stored as a document.
pub trait Record: Serialize + Send + Sync + Sized {
    /// Name of the collection this record kind is stored under.
    const KIND: &'static str;

    /// Validate an untyped payload and produce the strongly typed record.
    fn parse(payload: Value) -> Result<Self, ValidationError>;
}

// ─────────────────────────────────────────────────────────
// Investor
// ─────────────────────────────────────────────────────────

/// VIP investor sign-up (collection: `investor`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Investor {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 120))]
    pub wallet_address: Option<String>,
    #[validate(length(max = 80))]
    pub country: Option<String>,
    /// Agreement to the VIP terms; always given explicitly.
    pub consent: bool,
    pub referral_source: Option<String>,
}

impl Record for Investor {
    const KIND: &'static str = "investor";

    fn parse(payload: Value) -> Result<Self, ValidationError> {
        let mut fields = Fields::from_payload(payload)?;
        let investor = Investor {
            full_name: fields.text("full_name"),
            email: fields.text("email"),
            wallet_address: fields.optional_text("wallet_address"),
            country: fields.optional_text("country"),
            consent: fields.flag("consent"),
            referral_source: fields.optional_text("referral_source"),
        };
        fields.finish(investor)
    }
}

// ─────────────────────────────────────────────────────────
// Contribution
// ─────────────────────────────────────────────────────────

/// How a contribution was paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Crypto,
    Fiat,
}

impl PaymentMethod {
    /// Parse the wire name; anything other than `crypto`/`fiat` is rejected.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "crypto" => Some(Self::Crypto),
            "fiat" => Some(Self::Fiat),
            _ => None,
        }
    }
}

/// A single pledged or paid amount (collection: `contribution`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Contribution {
    #[validate(email)]
    pub investor_email: String,
    /// USD-equivalent, strictly positive.
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    pub method: PaymentMethod,
    /// Blockchain transaction reference; only meaningful for crypto.
    pub tx_hash: Option<String>,
    #[validate(length(max = 300))]
    pub note: Option<String>,
}

impl Record for Contribution {
    const KIND: &'static str = "contribution";

    fn parse(payload: Value) -> Result<Self, ValidationError> {
        let mut fields = Fields::from_payload(payload)?;

        let method = match fields.optional_text("method") {
            None => PaymentMethod::default(),
            Some(name) => PaymentMethod::from_name(&name).unwrap_or_else(|| {
                fields.reject("method", "one_of");
                PaymentMethod::default()
            }),
        };

        let contribution = Contribution {
            investor_email: fields.text("investor_email"),
            amount: fields.number("amount"),
            method,
            tx_hash: fields.optional_text("tx_hash"),
            note: fields.optional_text("note"),
        };
        fields.finish(contribution)
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn has_field(err: &ValidationError, field: &str) -> bool {
        err.violations.iter().any(|v| v.field == field)
    }

    fn investor_json() -> Value {
        json!({
            "full_name": "Ada Lovelace",
            "email": "ada@example.com",
            "wallet_address": "0xabc",
            "country": "UK",
            "consent": true,
            "referral_source": "newsletter"
        })
    }

    fn contribution_json() -> Value {
        json!({
            "investor_email": "ada@example.com",
            "amount": 500.0,
            "method": "fiat",
            "note": "first tranche"
        })
    }

    #[test]
    fn parses_valid_investor() {
        let investor = Investor::parse(investor_json()).unwrap();
        assert_eq!(investor.full_name, "Ada Lovelace");
        assert_eq!(investor.email, "ada@example.com");
        assert!(investor.consent);
        assert_eq!(investor.referral_source.as_deref(), Some("newsletter"));
    }

    #[test]
    fn investor_optional_fields_may_be_absent() {
        let investor = Investor::parse(json!({
            "full_name": "Al",
            "email": "al@example.org",
            "consent": false
        }))
        .unwrap();
        assert!(!investor.consent);
        assert_eq!(investor.wallet_address, None);
        assert_eq!(investor.country, None);
    }

    #[test]
    fn missing_consent_is_rejected_not_defaulted() {
        let mut payload = investor_json();
        payload.as_object_mut().unwrap().remove("consent");
        let err = Investor::parse(payload).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("consent", "required")]);
    }

    #[test]
    fn null_consent_is_rejected() {
        let mut payload = investor_json();
        payload["consent"] = Value::Null;
        let err = Investor::parse(payload).unwrap_err();
        assert!(has_field(&err, "consent"));
    }

    #[test]
    fn investor_reports_every_violation() {
        let err = Investor::parse(json!({
            "full_name": "A",
            "email": "not-an-email",
            "country": "x".repeat(81),
            "wallet_address": "w".repeat(121),
        }))
        .unwrap_err();

        let fields: Vec<&str> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["consent", "country", "email", "full_name", "wallet_address"]
        );
        assert!(err
            .violations
            .contains(&Violation::new("full_name", "length")));
        assert!(err.violations.contains(&Violation::new("email", "email")));
    }

    #[test]
    fn full_name_bounds_count_characters() {
        let mut payload = investor_json();
        payload["full_name"] = json!("é".repeat(100));
        assert!(Investor::parse(payload.clone()).is_ok());

        payload["full_name"] = json!("é".repeat(101));
        let err = Investor::parse(payload).unwrap_err();
        assert!(has_field(&err, "full_name"));
    }

    #[test]
    fn string_consent_is_a_type_violation() {
        let mut payload = investor_json();
        payload["consent"] = json!("yes");
        let err = Investor::parse(payload).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("consent", "type")]);
    }

    #[test]
    fn mistyped_field_does_not_hide_other_violations() {
        let err = Investor::parse(json!({
            "full_name": "A",
            "email": "x@y.io",
            "consent": "yes"
        }))
        .unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::new("consent", "type"),
                Violation::new("full_name", "length"),
            ]
        );
    }

    #[test]
    fn mistyped_text_field_is_named() {
        let mut payload = investor_json();
        payload["country"] = json!(44);
        payload["email"] = json!(["ada@example.com"]);
        let err = Investor::parse(payload).unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::new("country", "type"),
                Violation::new("email", "type"),
            ]
        );
    }

    #[test]
    fn mistyped_amount_keeps_every_contribution_violation() {
        let err = Contribution::parse(json!({
            "investor_email": "bad",
            "amount": "ten",
            "method": "cash"
        }))
        .unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::new("amount", "type"),
                Violation::new("investor_email", "email"),
                Violation::new("method", "one_of"),
            ]
        );
    }

    #[test]
    fn numeric_string_amount_is_coerced() {
        let mut payload = contribution_json();
        payload["amount"] = json!(" 12.5 ");
        assert_eq!(Contribution::parse(payload.clone()).unwrap().amount, 12.5);

        payload["amount"] = json!("-3");
        let err = Contribution::parse(payload).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("amount", "range")]);
    }

    #[test]
    fn non_finite_amount_string_is_rejected() {
        let mut payload = contribution_json();
        payload["amount"] = json!("inf");
        let err = Contribution::parse(payload).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("amount", "type")]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut payload = investor_json();
        payload["is_admin"] = json!(true);
        let value = serde_json::to_value(Investor::parse(payload).unwrap()).unwrap();
        assert!(value.get("is_admin").is_none());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = Contribution::parse(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("body", "object")]);
    }

    #[test]
    fn parses_valid_contribution() {
        let contribution = Contribution::parse(contribution_json()).unwrap();
        assert_eq!(contribution.amount, 500.0);
        assert_eq!(contribution.method, PaymentMethod::Fiat);
        assert_eq!(contribution.note.as_deref(), Some("first tranche"));
    }

    #[test]
    fn method_defaults_to_crypto() {
        let mut payload = contribution_json();
        payload.as_object_mut().unwrap().remove("method");
        let contribution = Contribution::parse(payload).unwrap();
        assert_eq!(contribution.method, PaymentMethod::Crypto);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let mut payload = contribution_json();
        payload["method"] = json!("paypal");
        let err = Contribution::parse(payload).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("method", "one_of")]);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [0.0, -0.01, -500.0] {
            let mut payload = contribution_json();
            payload["amount"] = json!(amount);
            let err = Contribution::parse(payload).unwrap_err();
            assert_eq!(err.violations, vec![Violation::new("amount", "range")]);
        }
    }

    #[test]
    fn contribution_reports_every_violation() {
        let err = Contribution::parse(json!({
            "investor_email": "nope",
            "method": "cash",
            "note": "n".repeat(301),
        }))
        .unwrap_err();

        let fields: Vec<&str> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["amount", "investor_email", "method", "note"]);
    }

    #[test]
    fn method_serializes_lowercase() {
        let contribution = Contribution::parse(contribution_json()).unwrap();
        let value = serde_json::to_value(&contribution).unwrap();
        assert_eq!(value["method"], json!("fiat"));
    }

    #[test]
    fn display_lists_fields() {
        let err = ValidationError::from_violations(vec![
            Violation::new("email", "email"),
            Violation::new("amount", "range"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: amount (range), email (email)"
        );
    }
}
