//! Mention classification: pronoun / definite-NP detection and structured
//! document-number patterns.

use regex::Regex;
use std::sync::OnceLock;

/// Pronouns and definite noun phrases that gate the coreference stage.
const PRONOUNS: [&str; 8] = [
    "they", "them", "it", "he", "she", "their", "its", "this",
];

const DEFINITE_NPS: [&str; 8] = [
    "the customer",
    "the client",
    "the order",
    "the invoice",
    "the work order",
    "the payment",
    "the task",
    "that company",
];

/// True when the mention is a pronoun or a definite noun phrase rather than
/// a name.
pub fn is_referential(mention: &str) -> bool {
    let folded = mention.trim().to_lowercase();
    PRONOUNS.contains(&folded.as_str()) || DEFINITE_NPS.contains(&folded.as_str())
}

/// A structured document-number pattern and the domain table it targets.
pub struct DocumentPattern {
    pub regex: Regex,
    pub table: &'static str,
    pub entity_type: &'static str,
}

/// The mention patterns stage 5 probes, in order.
pub fn document_patterns() -> &'static [DocumentPattern] {
    static PATTERNS: OnceLock<Vec<DocumentPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let specs: [(&str, &str, &str); 5] = [
            (r"^INV-\d+$", "invoices", "invoice"),
            (r"^SO-\d+$", "sales_orders", "so"),
            (r"^WO-\d+$", "work_orders", "wo"),
            (r"^PAY-\d+$", "payments", "payment"),
            (r"^TASK-\d+$", "tasks", "task"),
        ];
        specs
            .into_iter()
            .map(|(pattern, table, entity_type)| DocumentPattern {
                regex: Regex::new(pattern).expect("document pattern"),
                table,
                entity_type,
            })
            .collect()
    })
}

/// Match a mention against the document patterns.
pub fn match_document(mention: &str) -> Option<&'static DocumentPattern> {
    let trimmed = mention.trim().to_uppercase();
    document_patterns().iter().find(|p| p.regex.is_match(&trimmed))
}
