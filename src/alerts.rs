//! Health alerts sent to a phone number.
//!
//! Only a mock SMS channel exists; it records what it would have sent.

use std::{fmt, sync::Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::score::Grade;

/// Scores below this are reported as a risk alert.
pub const AT_RISK_THRESHOLD: i64 = 60;

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error("Please enter a phone number")]
    MissingPhoneNumber,
    #[error("invalid phone number '{0}'")]
    InvalidPhoneNumber(String),
    #[error("alert dispatch failed: {0}")]
    Dispatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Accepts an optional leading `+`, digits, spaces and dashes, with
    /// 7 to 15 digits in total.
    pub fn parse(raw: &str) -> Result<Self, AlertError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AlertError::MissingPhoneNumber);
        }
        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let valid_chars = body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
        let digits = body.chars().filter(char::is_ascii_digit).count();
        if !valid_chars || !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
            return Err(AlertError::InvalidPhoneNumber(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Risk,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    pub kind: AlertKind,
    pub forest_name: String,
    pub score: i64,
    pub grade: Grade,
    pub text: String,
}

impl AlertMessage {
    pub fn compose(forest_name: &str, score: i64, grade: Grade) -> Self {
        let (kind, text) = if score < AT_RISK_THRESHOLD {
            (
                AlertKind::Risk,
                format!(
                    "ALERT: {forest_name} is at risk! Health Score: {score}/100 (Grade {grade}). Immediate attention needed."
                ),
            )
        } else {
            (
                AlertKind::Status,
                format!(
                    "{forest_name} health update: Score {score}/100 (Grade {grade}). Forest is in good condition."
                ),
            )
        };
        Self {
            kind,
            forest_name: forest_name.to_string(),
            score,
            grade,
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    pub to: PhoneNumber,
    pub kind: AlertKind,
    pub text: String,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

pub trait Notifier: Send + Sync {
    fn channel(&self) -> &str;
    fn send(&self, to: &PhoneNumber, message: &AlertMessage) -> Result<DispatchReceipt, AlertError>;
}

/// Records messages instead of handing them to a carrier.
#[derive(Default)]
pub struct MockSmsNotifier {
    outbox: Mutex<Vec<DispatchReceipt>>,
}

impl MockSmsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<DispatchReceipt> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MockSmsNotifier {
    fn channel(&self) -> &str {
        "mock-sms"
    }

    fn send(&self, to: &PhoneNumber, message: &AlertMessage) -> Result<DispatchReceipt, AlertError> {
        let receipt = DispatchReceipt {
            to: to.clone(),
            kind: message.kind,
            text: message.text.clone(),
            channel: self.channel().to_string(),
            sent_at: Utc::now(),
        };
        tracing::info!(
            to = %to,
            forest = %message.forest_name,
            kind = ?message.kind,
            "sms alert sent: {}",
            message.text
        );
        self.outbox
            .lock()
            .map_err(|_| AlertError::Dispatch("outbox lock poisoned".to_string()))?
            .push(receipt.clone());
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_below_sixty_produce_risk_alerts() {
        let message = AlertMessage::compose("Arabuko Sokoke", 56, Grade::E);
        assert_eq!(message.kind, AlertKind::Risk);
        assert_eq!(
            message.text,
            "ALERT: Arabuko Sokoke is at risk! Health Score: 56/100 (Grade E). Immediate attention needed."
        );
    }

    #[test]
    fn sixty_and_above_produce_status_updates() {
        let message = AlertMessage::compose("Mau Forest Complex", 60, Grade::D);
        assert_eq!(message.kind, AlertKind::Status);
        assert_eq!(
            message.text,
            "Mau Forest Complex health update: Score 60/100 (Grade D). Forest is in good condition."
        );
        assert_eq!(AlertMessage::compose("X", 59, Grade::E).kind, AlertKind::Risk);
    }

    #[test]
    fn phone_numbers_are_validated() {
        assert_eq!(PhoneNumber::parse("  "), Err(AlertError::MissingPhoneNumber));
        assert!(PhoneNumber::parse("+254 700 000 000").is_ok());
        assert!(PhoneNumber::parse("0700-123-456").is_ok());
        assert!(matches!(
            PhoneNumber::parse("12345"),
            Err(AlertError::InvalidPhoneNumber(_))
        ));
        assert!(PhoneNumber::parse("+254 7OO 000 000").is_err());
        assert!(PhoneNumber::parse("++254700000000").is_err());
    }

    #[test]
    fn mock_notifier_records_every_dispatch() {
        let notifier = MockSmsNotifier::new();
        let to = PhoneNumber::parse("+254 700 000 000").unwrap();
        let message = AlertMessage::compose("Kakamega Forest", 86, Grade::B);
        let receipt = notifier.send(&to, &message).unwrap();
        assert_eq!(receipt.channel, "mock-sms");
        assert_eq!(receipt.to.as_str(), "+254 700 000 000");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, message.text);
        assert_eq!(sent[0].kind, AlertKind::Status);
    }
}
