//! Shared vocabulary for the six domain-DB tables: entity-type tags, table
//! names, key columns, and display fields. Every crate that touches the
//! domain DB speaks this vocabulary.

/// `(entity_type, table, primary_key_column, display_column)` for each
/// domain table.
pub const DOMAIN_TABLES: [(&str, &str, &str, &str); 6] = [
    ("customer", "customers", "customer_id", "name"),
    ("so", "sales_orders", "so_id", "so_id"),
    ("wo", "work_orders", "wo_id", "wo_id"),
    ("invoice", "invoices", "invoice_id", "invoice_id"),
    ("payment", "payments", "payment_id", "payment_id"),
    ("task", "tasks", "task_id", "title"),
];

pub fn table_for_type(entity_type: &str) -> Option<&'static str> {
    DOMAIN_TABLES
        .iter()
        .find(|(t, _, _, _)| *t == entity_type)
        .map(|(_, table, _, _)| *table)
}

pub fn type_for_table(table: &str) -> Option<&'static str> {
    DOMAIN_TABLES
        .iter()
        .find(|(_, t, _, _)| *t == table)
        .map(|(ty, _, _, _)| *ty)
}

pub fn primary_key_column(table: &str) -> Option<&'static str> {
    DOMAIN_TABLES
        .iter()
        .find(|(_, t, _, _)| *t == table)
        .map(|(_, _, pk, _)| *pk)
}

pub fn display_column(table: &str) -> Option<&'static str> {
    DOMAIN_TABLES
        .iter()
        .find(|(_, t, _, _)| *t == table)
        .map(|(_, _, _, d)| *d)
}

/// The default ontology declarations for the six-table domain:
/// customers → sales_orders → work_orders / invoices → payments, plus
/// customer tasks.
pub fn default_relations() -> Vec<crate::models::OntologyRelation> {
    use crate::models::{Cardinality, JoinSpec, OntologyRelation};
    let edge = |from_ty: &str,
                to_ty: &str,
                relation: &str,
                from_table: &str,
                from_field: &str,
                to_table: &str,
                to_field: &str| OntologyRelation {
        from_entity_type: from_ty.to_string(),
        to_entity_type: to_ty.to_string(),
        relation_type: relation.to_string(),
        join_spec: JoinSpec {
            from_table: from_table.to_string(),
            from_field: from_field.to_string(),
            to_table: to_table.to_string(),
            to_field: to_field.to_string(),
        },
        cardinality: Cardinality::OneToMany,
    };
    vec![
        edge("customer", "so", "places", "customers", "customer_id", "sales_orders", "customer_id"),
        edge("so", "wo", "fulfilled_by", "sales_orders", "so_id", "work_orders", "so_id"),
        edge("so", "invoice", "billed_by", "sales_orders", "so_id", "invoices", "so_id"),
        edge("invoice", "payment", "settled_by", "invoices", "invoice_id", "payments", "invoice_id"),
        edge("customer", "task", "tracked_by", "customers", "customer_id", "tasks", "customer_id"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_are_bidirectional() {
        for (ty, table, _, _) in DOMAIN_TABLES {
            assert_eq!(table_for_type(ty), Some(table));
            assert_eq!(type_for_table(table), Some(ty));
        }
        assert_eq!(table_for_type("unknown"), None);
    }
}
