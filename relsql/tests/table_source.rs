mod support;

use relsql::prelude::*;
use relsql::RelError;
use support::*;
use tokio::sync::mpsc;

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Renamed {
    #[attribute = "Number"]
    number: i64,
    #[attribute = "Name"]
    name: String,
    #[attribute = "Rating"]
    rating: i64,
    #[attribute = "Town"]
    town: String,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Town {
    #[attribute = "Town"]
    town: String,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Status {
    #[attribute = "Status"]
    status: i64,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Part {
    #[attribute = "PNO"]
    pno: i64,
}

#[derive(relsql::Record, Debug, PartialEq)]
struct Nothing {}

fn sorted<T: Ord>(mut records: Vec<T>) -> Vec<T> {
    records.sort();
    records
}

#[tokio::test]
async fn scan_returns_every_row() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    assert_eq!(suppliers.to_string(), "Relation(SNO, SName, Status, City)");
    assert_eq!(suppliers.cand_keys().to_string(), "[[SNO]]");

    let rows = suppliers.collect::<Supplier>().await.unwrap();
    assert_eq!(sorted(rows), support::suppliers());
    assert!(suppliers.err().is_none());
}

#[tokio::test]
async fn every_scan_reads_afresh() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    assert_eq!(suppliers.cardinality().await.unwrap(), 5);

    sqlx::query("INSERT INTO suppliers (SNO, SName, Status, City) VALUES (6, 'Baker', 10, 'Rome')")
        .execute(&db.pool)
        .await
        .unwrap();

    assert_eq!(suppliers.cardinality().await.unwrap(), 6);
}

#[tokio::test]
async fn project_to_key_and_name() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let names = suppliers.project_to::<SupplierName>();
    assert_eq!(names.to_string(), "Relation(SNO, SName)");
    assert_eq!(names.degree(), 2);
    assert_eq!(names.cand_keys().to_string(), "[[SNO]]");
    assert_eq!(names.cardinality().await.unwrap(), 5);

    let rows = sorted(names.collect::<SupplierName>().await.unwrap());
    assert_eq!(
        rows[0],
        SupplierName {
            sno: 1,
            sname: "Smith".into()
        }
    );
}

#[tokio::test]
async fn projection_without_key_removes_duplicates() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let cities = suppliers.project_to::<City>();
    assert_eq!(cities.cand_keys().to_string(), "[[City]]");
    let rows = sorted(cities.collect::<City>().await.unwrap());
    let names: Vec<_> = rows.into_iter().map(|c| c.city).collect();
    assert_eq!(names, vec!["Athens", "London", "Paris"]);

    assert_eq!(suppliers.project_to::<Status>().cardinality().await.unwrap(), 3);
}

#[tokio::test]
async fn projection_to_no_attributes_tells_if_the_table_has_rows() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();
    let shipments = TableSource::open::<Shipment>(db.pool.clone()).into_ref();

    let dee = suppliers.project_to::<Nothing>();
    assert_eq!(dee.degree(), 0);
    assert_eq!(dee.collect::<Nothing>().await.unwrap(), vec![Nothing {}]);

    sqlx::query("DELETE FROM shipments")
        .execute(&db.pool)
        .await
        .unwrap();
    let dum = shipments.project_to::<Nothing>();
    assert_eq!(dum.cardinality().await.unwrap(), 0);
    assert!(dum.err().is_none());
}

#[tokio::test]
async fn table_without_declared_keys_is_read_distinct() {
    let db = Fixture::new().await;
    let parts =
        TableSource::from_record::<Part>(db.pool.clone(), "shipments", CandKeys::default());
    assert!(!parts.source_distinct());

    let parts = parts.into_ref();
    assert_eq!(parts.cand_keys().to_string(), "[[PNO]]");
    assert_eq!(
        sorted(parts.collect::<Part>().await.unwrap()),
        vec![Part { pno: 1 }, Part { pno: 2 }]
    );
}

#[tokio::test]
async fn rename_keeps_reading_physical_columns() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let renamed = suppliers.rename_to::<Renamed>();
    assert_eq!(renamed.to_string(), "Relation(Number, Name, Rating, Town)");
    assert_eq!(renamed.cand_keys().to_string(), "[[Number]]");

    let rows = sorted(renamed.collect::<Renamed>().await.unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(
        rows[4],
        Renamed {
            number: 5,
            name: "Adams".into(),
            rating: 30,
            town: "Athens".into()
        }
    );

    let towns = renamed.project_to::<Town>();
    assert_eq!(towns.cardinality().await.unwrap(), 3);
}

#[tokio::test]
async fn cancelled_scan_releases_its_connection() {
    let db = Fixture::with_connections(1).await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let (tx, mut rx) = mpsc::channel::<Supplier>(1);
    let cancel = suppliers.tuple_chan_of(tx);
    assert!(rx.recv().await.is_some());

    cancel.cancel();
    while rx.recv().await.is_some() {}
    assert!(suppliers.err().is_none());

    // with a single connection this only succeeds if the scan gave it back
    assert_eq!(suppliers.collect::<Supplier>().await.unwrap().len(), 5);
}

#[tokio::test]
async fn scan_cancelled_while_waiting_for_a_connection() {
    let db = Fixture::with_connections(1).await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let held = db.pool.acquire().await.unwrap();

    let (tx, mut rx) = mpsc::channel::<Supplier>(1);
    let cancel = suppliers.tuple_chan_of(tx);
    cancel.cancel();
    while rx.recv().await.is_some() {}
    assert!(suppliers.err().is_none());

    drop(held);
    assert_eq!(suppliers.cardinality().await.unwrap(), 5);
}

#[tokio::test]
async fn dropped_receiver_stops_the_scan() {
    let db = Fixture::with_connections(1).await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let (tx, mut rx) = mpsc::channel::<Supplier>(1);
    let _cancel = suppliers.tuple_chan_of(tx);
    assert!(rx.recv().await.is_some());
    drop(rx);

    assert_eq!(suppliers.cardinality().await.unwrap(), 5);
    assert!(suppliers.err().is_none());
}

#[tokio::test]
async fn failed_scan_latches_the_database_error() {
    let db = Fixture::new().await;
    let missing = TableSource::from_record::<Supplier>(
        db.pool.clone(),
        "no_such_table",
        CandKeys::from_names(&[&["SNO"]]),
    )
    .into_ref();

    let err = missing.collect::<Supplier>().await.unwrap_err();
    assert!(matches!(err, RelError::Database(_)));
    assert!(err.to_string().contains("no such table"), "{}", err);

    // the error sticks to everything derived from the relation, which no
    // longer touches the database at all
    let cities = missing.project_to::<City>();
    db.pool.close().await;

    let err = cities.collect::<City>().await.unwrap_err();
    assert!(err.to_string().contains("no such table"), "{}", err);
    assert!(missing.err().unwrap().to_string().contains("no such table"));
}

#[tokio::test]
async fn mismatched_target_closes_the_channel() {
    let db = Fixture::new().await;
    let suppliers = TableSource::open::<Supplier>(db.pool.clone()).into_ref();

    let (tx, mut rx) = mpsc::channel::<SupplierName>(1);
    let _cancel = suppliers.tuple_chan_of(tx);

    assert!(rx.recv().await.is_none());
    assert!(matches!(
        suppliers.err(),
        Some(RelError::SchemaMismatch { .. })
    ));
}

#[tokio::test]
async fn config_file_connects() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relsql.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "url = \"sqlite://{}?mode=rwc\"",
        dir.path().join("config.db").display()
    )
    .unwrap();
    writeln!(file, "max_connections = 1").unwrap();
    drop(file);

    let config = DatabaseConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.max_connections, 1);

    let pool = config.connect().await.unwrap();
    sqlx::query("CREATE TABLE cities (City TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO cities (City) VALUES ('Paris'), ('Paris'), ('Oslo')")
        .execute(&pool)
        .await
        .unwrap();

    let cities = TableSource::from_record::<City>(pool, "cities", CandKeys::default()).into_ref();
    assert_eq!(cities.cardinality().await.unwrap(), 2);
}
