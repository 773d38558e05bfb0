mod support;

use relsql::prelude::*;
use support::*;

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SupplierShipment {
    #[attribute = "SNO"]
    sno: i64,
    #[attribute = "SName"]
    sname: String,
    #[attribute = "PNO"]
    pno: i64,
    #[attribute = "Qty"]
    qty: i64,
}

#[derive(relsql::Record)]
struct Quantity {
    #[attribute = "Qty"]
    qty: i64,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Total {
    #[attribute = "Total"]
    total: i64,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SupplierTotal {
    #[attribute = "SNO"]
    sno: i64,
    #[attribute = "Total"]
    total: i64,
}

#[derive(relsql::Record, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Rating {
    #[attribute = "Rating"]
    rating: String,
}

fn sorted<T: Ord>(mut records: Vec<T>) -> Vec<T> {
    records.sort();
    records
}

fn in_city(city: &'static str) -> Predicate {
    Predicate::record(move |c: City| c.city == city)
}

fn tables(db: &Fixture) -> (RelationRef, RelationRef) {
    (
        TableSource::open::<Supplier>(db.pool.clone()).into_ref(),
        TableSource::open::<Shipment>(db.pool.clone()).into_ref(),
    )
}

#[tokio::test]
async fn restrict_by_record() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);

    let paris = suppliers.clone().restrict(in_city("Paris"));
    assert_eq!(paris.heading(), suppliers.heading());
    assert_eq!(paris.cand_keys().to_string(), "[[SNO]]");

    let names: Vec<_> = sorted(paris.collect::<Supplier>().await.unwrap())
        .into_iter()
        .map(|s| s.sname)
        .collect();
    assert_eq!(names, vec!["Jones", "Blake"]);
}

#[tokio::test]
async fn restrict_by_tuple() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);
    let heading = suppliers.heading().clone();

    let high = suppliers.restrict(Predicate::tuple(move |tuple| {
        tuple.get(&heading, "Status") >= Some(&Value::Integer(30))
    }));
    assert_eq!(high.cardinality().await.unwrap(), 2);
}

#[tokio::test]
async fn restrict_with_foreign_record_is_latched() {
    let db = Fixture::new().await;
    let (_, shipments) = tables(&db);

    let restricted = shipments.restrict(in_city("Paris"));
    assert!(matches!(
        restricted.err(),
        Some(RelError::UnknownAttribute(name)) if name == "City"
    ));
    assert!(restricted.tuples().await.is_err());
}

#[tokio::test]
async fn union_removes_duplicates() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);

    let paris = suppliers.clone().restrict(in_city("Paris"));
    let london = suppliers.clone().restrict(in_city("London"));
    assert_eq!(paris.clone().union(london).cardinality().await.unwrap(), 4);

    let both = paris.clone().union(suppliers);
    assert_eq!(both.cand_keys().to_string(), "[[City SNO SName Status]]");
    assert_eq!(both.cardinality().await.unwrap(), 5);
}

#[tokio::test]
async fn union_of_different_headings_is_latched() {
    let db = Fixture::new().await;
    let (suppliers, shipments) = tables(&db);

    let union = suppliers.union(shipments);
    assert!(matches!(union.err(), Some(RelError::SchemaMismatch { .. })));
}

#[tokio::test]
async fn diff_removes_right_tuples() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);

    let paris = suppliers.clone().restrict(in_city("Paris"));
    let rest = suppliers.diff(paris);
    assert_eq!(rest.cand_keys().to_string(), "[[SNO]]");

    let cities = sorted(rest.project_to::<City>().collect::<City>().await.unwrap());
    assert_eq!(
        cities,
        vec![
            City {
                city: "Athens".into()
            },
            City {
                city: "London".into()
            }
        ]
    );
}

#[tokio::test]
async fn natural_join_on_common_attributes() {
    let db = Fixture::new().await;
    let (suppliers, shipments) = tables(&db);

    let joined = suppliers.join(shipments, SupplierShipment::heading());
    assert_eq!(joined.to_string(), "Relation(SNO, SName, PNO, Qty)");
    assert_eq!(joined.cand_keys().to_string(), "[[PNO SNO]]");

    let rows = sorted(joined.collect::<SupplierShipment>().await.unwrap());
    assert_eq!(rows.len(), 6);
    assert_eq!(
        rows[3],
        SupplierShipment {
            sno: 2,
            sname: "Jones".into(),
            pno: 2,
            qty: 400
        }
    );
    assert!(rows.iter().all(|row| row.sno != 5));
}

#[tokio::test]
async fn join_projected_without_key_removes_duplicates() {
    let db = Fixture::new().await;
    let (suppliers, shipments) = tables(&db);

    // cities of suppliers that ship anything
    let cities = suppliers.join(shipments, City::heading());
    assert_eq!(cities.cand_keys().to_string(), "[[City]]");
    assert_eq!(cities.cardinality().await.unwrap(), 2);
}

#[tokio::test]
async fn group_by_folds_each_group() {
    let db = Fixture::new().await;
    let (_, shipments) = tables(&db);

    let fold = Fold::record(|quantities: Vec<Quantity>| Total {
        total: quantities.iter().map(|q| q.qty).sum(),
    });
    let totals = shipments.group_by(SupplierTotal::heading(), fold);
    assert_eq!(totals.cand_keys().to_string(), "[[SNO]]");

    let rows = sorted(totals.collect::<SupplierTotal>().await.unwrap());
    let rows: Vec<_> = rows.into_iter().map(|r| (r.sno, r.total)).collect();
    assert_eq!(rows, vec![(1, 500), (2, 700), (3, 200), (4, 200)]);
}

#[tokio::test]
async fn group_by_nothing_folds_everything() {
    let db = Fixture::new().await;
    let (_, shipments) = tables(&db);

    let fold = Fold::record(|quantities: Vec<Quantity>| Total {
        total: quantities.iter().map(|q| q.qty).sum(),
    });
    let total = shipments.group_by(Total::heading(), fold);
    assert_eq!(
        total.collect::<Total>().await.unwrap(),
        vec![Total { total: 1600 }]
    );
}

#[tokio::test]
async fn map_without_keys_removes_duplicates() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);

    let mapper = Mapper::record(|s: Supplier| Rating {
        rating: if s.status >= 20 { "high" } else { "low" }.to_owned(),
    });
    let ratings = suppliers.map(mapper, CandKeys::default());
    assert_eq!(ratings.to_string(), "Relation(Rating)");
    assert_eq!(ratings.cand_keys().to_string(), "[[Rating]]");
    assert_eq!(
        sorted(ratings.collect::<Rating>().await.unwrap()),
        vec![
            Rating {
                rating: "high".into()
            },
            Rating {
                rating: "low".into()
            }
        ]
    );
}

#[tokio::test]
async fn map_with_declared_keys() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);

    let mapper = Mapper::record(|s: Supplier| SupplierName {
        sno: s.sno * 10,
        sname: s.sname.to_uppercase(),
    });
    let names = suppliers.map(mapper, CandKeys::from_names(&[&["SNO"]]));
    let rows = sorted(names.collect::<SupplierName>().await.unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(
        rows[0],
        SupplierName {
            sno: 10,
            sname: "SMITH".into()
        }
    );
}

#[tokio::test]
async fn operand_errors_reach_derived_relations() {
    let db = Fixture::new().await;
    let (suppliers, _) = tables(&db);
    let missing = TableSource::from_record::<Supplier>(
        db.pool.clone(),
        "no_such_table",
        CandKeys::default(),
    )
    .into_ref();

    let union = suppliers.union(missing.clone());
    let err = union.cardinality().await.unwrap_err();
    assert!(err.to_string().contains("no such table"), "{}", err);
    assert!(union.err().is_some());
    assert!(missing.err().is_some());
}

#[tokio::test]
async fn nodes_compose() {
    let db = Fixture::new().await;
    let (suppliers, shipments) = tables(&db);

    let heavy = shipments.restrict(Predicate::record(|q: Quantity| q.qty >= 300));
    let names = suppliers
        .join(heavy, SupplierShipment::heading())
        .project_to::<SupplierName>();
    // no key of the join survives the projection
    assert_eq!(names.cand_keys().to_string(), "[[SNO SName]]");

    let names: Vec<_> = sorted(names.collect::<SupplierName>().await.unwrap())
        .into_iter()
        .map(|n| n.sname)
        .collect();
    assert_eq!(names, vec!["Smith", "Jones"]);
}
