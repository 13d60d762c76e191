//! Live round trips against PostgreSQL.
//!
//! Skipped when `DATABASE_URL` is unset. A `.env` file is honoured.

use fluentsql::prelude::*;
use std::time::Duration;
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Clone, PartialEq, Entity, FromRow)]
#[orm(table = "fluentsql_rt_items")]
struct Item {
    #[orm(id, identity)]
    id: i64,
    name: String,
    qty: i32,
    price: f64,
    note: Option<String>,
}

impl Item {
    fn new(name: &str, qty: i32, price: f64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            qty,
            price,
            note: None,
        }
    }
}

const SCHEMA: &str = "
    CREATE TEMP TABLE fluentsql_rt_items (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        qty INT4 NOT NULL,
        price FLOAT8 NOT NULL,
        note TEXT
    )";

async fn connect(test: &str) -> OrmResult<Option<Client>> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(OrmError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
        .batch_execute(SCHEMA)
        .await
        .map_err(OrmError::from_db_error)?;
    Ok(Some(client))
}

#[tokio::test]
async fn crud_roundtrip() -> OrmResult<()> {
    let Some(client) = connect("crud_roundtrip").await? else {
        return Ok(());
    };
    let session = PgSession::new(client);

    let items = vec![
        Item::new("apple", 3, 1.25),
        Item::new("banana", 12, 0.5),
        Item::new("cherry", 40, 0.1),
    ];
    assert_eq!(session.from::<Item>().insert_many(&items).await?, 3);

    let id: Option<i64> = session
        .from::<Item>()
        .insert_return_id(&Item::new("durian", 1, 9.0))
        .await?;
    let id = id.ok_or_else(|| OrmError::not_found("no generated id"))?;

    let durian = session
        .from::<Item>()
        .and_where(Item::ID.eq(id))
        .single()
        .await?
        .ok_or_else(|| OrmError::not_found("inserted row"))?;
    assert_eq!(durian.name, "durian");
    assert_eq!(durian.note, None);

    let bulk: Vec<Item> = session
        .from::<Item>()
        .and_where(Item::QTY.ge(10))
        .order_by(Item::NAME)
        .select()
        .await?;
    let names: Vec<_> = bulk.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["banana", "cherry"]);

    let changed = session
        .from::<Item>()
        .set_expr(Item::QTY, Item::QTY + 1)
        .set(Item::NOTE, Some("restocked".to_string()))
        .and_where(Item::NAME.like("%an%"))
        .update()
        .await?;
    assert_eq!(changed, 2);

    let mut updated = durian.clone();
    updated.price = 8.5;
    assert_eq!(session.from::<Item>().update_entity(&updated).await?, 1);
    let price: Vec<f64> = session
        .from::<Item>()
        .and_where(Item::ID.eq(id))
        .select_as(Item::PRICE)
        .await?;
    assert_eq!(price, vec![8.5]);

    let removed = session
        .from::<Item>()
        .and_where(Item::QTY.lt(5))
        .delete()
        .await?;
    assert_eq!(removed, 2);
    assert_eq!(session.from::<Item>().count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn aggregates_and_paging() -> OrmResult<()> {
    let Some(client) = connect("aggregates_and_paging").await? else {
        return Ok(());
    };
    let session = PgSession::new(client);

    let items: Vec<Item> = (1..=25)
        .map(|n| Item::new(&format!("item{n:02}"), n % 3, f64::from(n)))
        .collect();
    session.from::<Item>().insert_many(&items).await?;

    let (page, total) = session
        .from::<Item>()
        .order_by(Item::NAME)
        .page(2, 10)
        .await?;
    assert_eq!(total, 25);
    let rows = page.select().await?;
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].name, "item11");

    // Three qty groups: 0, 1, 2.
    let groups = session.from::<Item>().group_by(Item::QTY).count().await?;
    assert_eq!(groups, 3);

    let distinct = session
        .from::<Item>()
        .distinct()
        .count_by(Item::QTY)
        .await?;
    assert_eq!(distinct, 3);

    let qty_sum: Option<i64> = session
        .from::<Item>()
        .and_where(Item::QTY.eq(2))
        .sum(Item::QTY)
        .await?;
    assert_eq!(qty_sum, Some(16));

    let nothing: Option<i64> = session
        .from::<Item>()
        .and_where(Item::QTY.gt(100))
        .sum(Item::QTY)
        .await?;
    assert_eq!(nothing, None);

    assert!(session.from::<Item>().and_where(Item::QTY.eq(0)).exists().await?);
    assert!(!session.from::<Item>().and_where(Item::QTY.gt(9)).exists().await?);
    Ok(())
}

#[tokio::test]
async fn constraint_violations_are_classified() -> OrmResult<()> {
    let Some(client) = connect("constraint_violations_are_classified").await? else {
        return Ok(());
    };
    let session = PgSession::new(client);

    session.from::<Item>().insert(&Item::new("solo", 1, 1.0)).await?;
    let err = session
        .from::<Item>()
        .insert(&Item::new("solo", 2, 2.0))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn transaction_scoped_session() -> OrmResult<()> {
    let Some(mut client) = connect("transaction_scoped_session").await? else {
        return Ok(());
    };

    {
        let tx = client.transaction().await.map_err(OrmError::from_db_error)?;
        let session = PgSession::with_config(
            tx,
            SessionConfig::new().with_command_timeout(Duration::from_secs(5)),
        );
        session.from::<Item>().insert(&Item::new("ghost", 1, 1.0)).await?;
        assert_eq!(session.from::<Item>().count().await?, 1);
        // Dropped without commit.
    }

    let session = PgSession::new(&client);
    assert_eq!(session.from::<Item>().count().await?, 0);
    Ok(())
}
