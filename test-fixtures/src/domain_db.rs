//! In-memory domain database with the six read-only tables, seeded with the
//! canonical test rows.

use std::sync::Mutex;

use chrono::{Duration, Utc};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use async_trait::async_trait;
use engram_core::errors::RetrievalError;
use engram_core::traits::{DomainDb, DomainRow};

pub struct FixtureDomainDb {
    conn: Mutex<Connection>,
}

impl FixtureDomainDb {
    /// Open and seed. Rows cover the end-to-end scenarios: TC Boiler with
    /// SO-1001/SO-2002, Kai Media with INV-1009, an overdue task.
    pub fn seeded() -> Self {
        let conn = Connection::open_in_memory().expect("open fixture db");
        conn.execute_batch(
            "CREATE TABLE customers (
                customer_id TEXT PRIMARY KEY, name TEXT NOT NULL,
                payment_terms TEXT, credit_limit REAL, created_at TEXT NOT NULL
            );
            CREATE TABLE sales_orders (
                so_id TEXT PRIMARY KEY, customer_id TEXT NOT NULL,
                status TEXT NOT NULL, total_amount REAL, created_at TEXT NOT NULL
            );
            CREATE TABLE work_orders (
                wo_id TEXT PRIMARY KEY, so_id TEXT NOT NULL,
                status TEXT NOT NULL, scheduled_date TEXT, created_at TEXT NOT NULL
            );
            CREATE TABLE invoices (
                invoice_id TEXT PRIMARY KEY, so_id TEXT NOT NULL,
                status TEXT NOT NULL, amount REAL, due_date TEXT, created_at TEXT NOT NULL
            );
            CREATE TABLE payments (
                payment_id TEXT PRIMARY KEY, invoice_id TEXT NOT NULL,
                amount REAL, paid_at TEXT, created_at TEXT NOT NULL
            );
            CREATE TABLE tasks (
                task_id TEXT PRIMARY KEY, customer_id TEXT NOT NULL,
                title TEXT NOT NULL, status TEXT NOT NULL, created_at TEXT NOT NULL
            );",
        )
        .expect("create domain tables");

        let now = Utc::now();
        let days_ago = |d: i64| (now - Duration::days(d)).to_rfc3339();
        conn.execute_batch(&format!(
            "INSERT INTO customers VALUES
                ('C-1001', 'TC Boiler', 'NET30', 50000.0, '{c0}'),
                ('C-1002', 'Kai Media', 'NET15', 20000.0, '{c0}');
            INSERT INTO sales_orders VALUES
                ('SO-1001', 'C-1001', 'in_fulfillment', 8200.0, '{c30}'),
                ('SO-2002', 'C-1001', 'in_fulfillment', 4400.0, '{c10}'),
                ('SO-3003', 'C-1002', 'fulfilled', 1200.0, '{c45}');
            INSERT INTO work_orders VALUES
                ('WO-7001', 'SO-1001', 'scheduled', '{c0}', '{c20}');
            INSERT INTO invoices VALUES
                ('INV-1009', 'SO-3003', 'open', 1200.0, '2025-09-30', '{c40}');
            INSERT INTO payments VALUES
                ('PAY-5001', 'INV-1009', 600.0, '{c5}', '{c5}');
            INSERT INTO tasks VALUES
                ('TASK-1', 'C-1001', 'Confirm boiler specs', 'open', '{c10}'),
                ('TASK-2', 'C-1002', 'Send onboarding docs', 'open', '{c2}');",
            c0 = days_ago(0),
            c2 = days_ago(2),
            c5 = days_ago(5),
            c10 = days_ago(10),
            c20 = days_ago(20),
            c30 = days_ago(30),
            c40 = days_ago(40),
            c45 = days_ago(45),
        ))
        .expect("seed domain rows");

        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Direct write access for test-specific seeding.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.conn.lock().expect("fixture db lock");
        f(&conn)
    }
}

#[async_trait]
impl DomainDb for FixtureDomainDb {
    async fn execute(
        &self,
        query: &str,
        params: &[serde_json::Value],
    ) -> Result<Vec<DomainRow>, RetrievalError> {
        let conn = self.conn.lock().expect("fixture db lock");
        let mut stmt = conn
            .prepare(query)
            .map_err(|e| RetrievalError::DomainQuery(e.to_string()))?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let bound: Vec<Box<dyn rusqlite::types::ToSql>> = params
            .iter()
            .map(|p| -> Box<dyn rusqlite::types::ToSql> {
                match p {
                    serde_json::Value::String(s) => Box::new(s.clone()),
                    serde_json::Value::Number(n) if n.is_i64() => Box::new(n.as_i64()),
                    serde_json::Value::Number(n) => Box::new(n.as_f64()),
                    serde_json::Value::Bool(b) => Box::new(*b),
                    _ => Box::new(None::<String>),
                }
            })
            .collect();
        let bound_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut rows = stmt
            .query(bound_refs.as_slice())
            .map_err(|e| RetrievalError::DomainQuery(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| RetrievalError::DomainQuery(e.to_string()))?
        {
            let mut map = DomainRow::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value = match row.get_ref(idx) {
                    Ok(ValueRef::Null) => serde_json::Value::Null,
                    Ok(ValueRef::Integer(i)) => serde_json::Value::from(i),
                    Ok(ValueRef::Real(f)) => serde_json::Value::from(f),
                    Ok(ValueRef::Text(t)) => {
                        serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
                    }
                    Ok(ValueRef::Blob(_)) | Err(_) => serde_json::Value::Null,
                };
                map.insert(name.clone(), value);
            }
            out.push(map);
        }
        Ok(out)
    }
}
