#![allow(dead_code)]

use std::time::Duration;

use relsql::database;
use sqlx::AnyPool;
use tempfile::TempDir;

#[derive(relsql::Record, relsql::Table, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[table_name = "suppliers"]
#[key(SNO)]
pub struct Supplier {
    #[attribute = "SNO"]
    pub sno: i64,
    #[attribute = "SName"]
    pub sname: String,
    #[attribute = "Status"]
    pub status: i64,
    #[attribute = "City"]
    pub city: String,
}

impl Supplier {
    pub fn new(sno: i64, sname: &str, status: i64, city: &str) -> Self {
        Self {
            sno,
            sname: sname.to_owned(),
            status,
            city: city.to_owned(),
        }
    }
}

#[derive(relsql::Record, relsql::Table, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[table_name = "shipments"]
#[key(SNO, PNO)]
pub struct Shipment {
    #[attribute = "SNO"]
    pub sno: i64,
    #[attribute = "PNO"]
    pub pno: i64,
    #[attribute = "Qty"]
    pub qty: i64,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SupplierName {
    #[attribute = "SNO"]
    pub sno: i64,
    #[attribute = "SName"]
    pub sname: String,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct City {
    #[attribute = "City"]
    pub city: String,
}

pub fn suppliers() -> Vec<Supplier> {
    vec![
        Supplier::new(1, "Smith", 20, "London"),
        Supplier::new(2, "Jones", 10, "Paris"),
        Supplier::new(3, "Blake", 30, "Paris"),
        Supplier::new(4, "Clark", 20, "London"),
        Supplier::new(5, "Adams", 30, "Athens"),
    ]
}

pub fn shipments() -> Vec<Shipment> {
    [(1, 1, 300), (1, 2, 200), (2, 1, 300), (2, 2, 400), (3, 2, 200), (4, 2, 200)]
        .iter()
        .map(|&(sno, pno, qty)| Shipment { sno, pno, qty })
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A file backed SQLite database holding the suppliers and shipments tables.
pub struct Fixture {
    pub pool: AnyPool,
    _dir: TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_connections(4).await
    }

    pub async fn with_connections(max_connections: u32) -> Self {
        init_tracing();

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("suppliers.db").display());
        let pool = database::connect(&url, max_connections, Duration::from_secs(5))
            .await
            .unwrap();

        let statements = [
            "CREATE TABLE suppliers (SNO INTEGER PRIMARY KEY, SName TEXT NOT NULL, Status INTEGER NOT NULL, City TEXT NOT NULL)",
            "CREATE TABLE shipments (SNO INTEGER NOT NULL, PNO INTEGER NOT NULL, Qty INTEGER NOT NULL, PRIMARY KEY (SNO, PNO))",
        ];
        for statement in statements {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        for s in suppliers() {
            sqlx::query("INSERT INTO suppliers (SNO, SName, Status, City) VALUES ($1, $2, $3, $4)")
                .bind(s.sno)
                .bind(s.sname)
                .bind(s.status)
                .bind(s.city)
                .execute(&pool)
                .await
                .unwrap();
        }

        for s in shipments() {
            sqlx::query("INSERT INTO shipments (SNO, PNO, Qty) VALUES ($1, $2, $3)")
                .bind(s.sno)
                .bind(s.pno)
                .bind(s.qty)
                .execute(&pool)
                .await
                .unwrap();
        }

        Self { pool, _dir: dir }
    }
}
