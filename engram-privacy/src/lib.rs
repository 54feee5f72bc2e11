//! # engram-privacy
//!
//! Deterministic PII redaction. Runs over every message before any memory is
//! created from it; matches are replaced with `[REDACTED-<TYPE>]` and the
//! unredacted form never reaches storage.

mod luhn;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use luhn::luhn_valid;

/// The PII categories the pipeline detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiType {
    Ssn,
    CreditCard,
    Email,
    Phone,
}

impl PiiType {
    /// The replacement token suffix.
    pub fn token(&self) -> &'static str {
        match self {
            PiiType::Ssn => "[REDACTED-SSN]",
            PiiType::CreditCard => "[REDACTED-CREDIT-CARD]",
            PiiType::Email => "[REDACTED-EMAIL]",
            PiiType::Phone => "[REDACTED-PHONE]",
        }
    }
}

/// Result of a redaction pass.
#[derive(Debug, Clone)]
pub struct RedactionReport {
    pub redacted: String,
    /// Types found, in detection order, deduplicated.
    pub detected: Vec<PiiType>,
}

impl RedactionReport {
    pub fn any_detected(&self) -> bool {
        !self.detected.is_empty()
    }
}

/// Compiled regex pipeline. Order matters: SSN before phone (both are
/// digit-dash shapes), card digits validated with Luhn before replacement.
pub struct Redactor {
    ssn: Regex,
    card: Regex,
    email: Regex,
    phone: Regex,
}

impl Redactor {
    pub fn new() -> Self {
        Self {
            ssn: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn regex"),
            card: Regex::new(r"\b(?:\d[ \-]?){13,19}\b").expect("card regex"),
            email: Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b")
                .expect("email regex"),
            phone: Regex::new(r"(?:\+?1[\-. ]?)?\(?\d{3}\)?[\-. ]\d{3}[\-. ]\d{4}\b")
                .expect("phone regex"),
        }
    }

    /// Scan and replace. Deterministic: same input, same output.
    pub fn redact(&self, text: &str) -> RedactionReport {
        let mut detected = Vec::new();
        let mut out = text.to_string();

        if self.ssn.is_match(&out) {
            out = self.ssn.replace_all(&out, PiiType::Ssn.token()).into_owned();
            detected.push(PiiType::Ssn);
        }

        // Card candidates must pass Luhn; non-validating digit runs stay.
        let mut card_found = false;
        out = self
            .card
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let raw = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                if (13..=19).contains(&digits.len()) && luhn_valid(&digits) {
                    card_found = true;
                    PiiType::CreditCard.token().to_string()
                } else {
                    raw.to_string()
                }
            })
            .into_owned();
        if card_found {
            detected.push(PiiType::CreditCard);
        }

        if self.email.is_match(&out) {
            out = self
                .email
                .replace_all(&out, PiiType::Email.token())
                .into_owned();
            detected.push(PiiType::Email);
        }

        if self.phone.is_match(&out) {
            out = self
                .phone
                .replace_all(&out, PiiType::Phone.token())
                .into_owned();
            detected.push(PiiType::Phone);
        }

        if !detected.is_empty() {
            tracing::debug!(target: "engram_privacy", kinds = detected.len(), "redacted pii from message");
        }

        RedactionReport {
            redacted: out,
            detected,
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redact(text: &str) -> RedactionReport {
        Redactor::new().redact(text)
    }

    #[test]
    fn ssn_is_replaced() {
        let report = redact("my ssn is 123-45-6789 ok");
        assert_eq!(report.redacted, "my ssn is [REDACTED-SSN] ok");
        assert_eq!(report.detected, vec![PiiType::Ssn]);
    }

    #[test]
    fn valid_card_is_replaced_invalid_stays() {
        // 4111 1111 1111 1111 passes Luhn; 4111 1111 1111 1112 does not.
        let report = redact("card 4111 1111 1111 1111 here");
        assert_eq!(report.redacted, "card [REDACTED-CREDIT-CARD] here");
        assert_eq!(report.detected, vec![PiiType::CreditCard]);

        let untouched = redact("order ref 4111 1111 1111 1112 here");
        assert!(untouched.redacted.contains("4111 1111 1111 1112"));
        assert!(untouched.detected.is_empty());
    }

    #[test]
    fn email_and_phone_are_replaced() {
        let report = redact("reach ops@kai.media or 555-867-5309");
        assert!(report.redacted.contains("[REDACTED-EMAIL]"));
        assert!(report.redacted.contains("[REDACTED-PHONE]"));
        assert_eq!(report.detected, vec![PiiType::Email, PiiType::Phone]);
    }

    #[test]
    fn ssn_wins_over_phone_shape() {
        // An SSN must not be half-eaten by the phone pattern.
        let report = redact("078-05-1120");
        assert_eq!(report.redacted, "[REDACTED-SSN]");
    }

    #[test]
    fn clean_text_passes_through() {
        let report = redact("What is the status of TC Boiler's order?");
        assert_eq!(report.redacted, "What is the status of TC Boiler's order?");
        assert!(!report.any_detected());
    }
}
