//! Keyword classifier: which domain tables a query is asking about.
//! Single-word keywords match as word prefixes ("pay" covers "payment" but
//! not "unpaid"); phrase keywords match as substrings.

/// Target tables inferred from the query, deduplicated, in keyword order.
pub fn target_tables(query_text: &str) -> Vec<&'static str> {
    let folded = query_text.to_lowercase();
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let word_prefix = |kw: &str| words.iter().any(|w| w.starts_with(kw));

    let mut targets: Vec<&'static str> = Vec::new();
    let mut add = |table: &'static str, targets: &mut Vec<&'static str>| {
        if !targets.contains(&table) {
            targets.push(table);
        }
    };

    if word_prefix("invoice") || word_prefix("bill") || word_prefix("unpaid") {
        add("invoices", &mut targets);
    }
    let work_order = folded.contains("work order") || word_prefix("schedule");
    if work_order {
        add("work_orders", &mut targets);
    }
    if word_prefix("pay") {
        add("payments", &mut targets);
    }
    // A bare "order" means the sales order unless the query already said
    // "work order".
    if word_prefix("order") && !folded.contains("work order") {
        add("sales_orders", &mut targets);
    }
    if word_prefix("task") || word_prefix("follow") {
        add("tasks", &mut targets);
    }
    targets
}
