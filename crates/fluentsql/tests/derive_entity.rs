//! `#[derive(Entity)]` / `#[derive(FromRow)]` coverage without a database.

#![allow(dead_code)]

use fluentsql::prelude::*;
use fluentsql::{find_table, registered_tables};

#[derive(Debug, Clone, Entity, FromRow)]
#[orm(table = "accounts")]
struct Account {
    #[orm(id, identity, column = "account_id")]
    id: i64,
    #[orm(column = "display_name")]
    name: String,
    balance: f64,
    credit_limit: i32,
    email: Option<String>,
}

#[derive(Debug, Clone, Entity)]
#[orm(table = "tags")]
struct Tag {
    #[orm(id)]
    slug: String,
    r#type: String,
}

#[derive(Debug, FromRow)]
struct NameAndTotal {
    name: String,
    total: i64,
}

#[test]
fn descriptor_follows_attributes() {
    let table = Account::table();
    assert_eq!(table.name, "accounts");

    let names: Vec<_> = table.columns.iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec!["account_id", "display_name", "balance", "credit_limit", "email"]
    );

    let pk = table.primary_key().unwrap();
    assert_eq!(pk.name, "account_id");
    assert_eq!(pk.property, "id");
    assert!(pk.identity);

    let name = table.column_by_property("name").unwrap();
    assert_eq!(name.name, "display_name");
    assert!(!name.primary_key);
}

#[test]
fn column_constants_are_typed_and_named() {
    assert_eq!(Account::ID.name(), "account_id");
    assert_eq!(Account::NAME.name(), "display_name");
    assert_eq!(Account::CREDIT_LIMIT.property(), "credit_limit");
    assert_eq!(Tag::TYPE.name(), "type");
    assert_eq!(Tag::TYPE.property(), "type");
}

#[test]
fn to_params_binds_every_field_by_property() {
    let account = Account {
        id: 1,
        name: "ann".to_string(),
        balance: 10.5,
        credit_limit: 100,
        email: None,
    };
    let params = account.to_params().unwrap();
    assert_eq!(
        params.keys().collect::<Vec<_>>(),
        vec!["id", "name", "balance", "credit_limit", "email"]
    );
}

#[test]
fn derived_entities_are_registered() {
    assert!(find_table("accounts").is_some());
    assert!(find_table("tags").is_some());
    assert!(find_table("missing").is_none());

    let names: Vec<_> = registered_tables().iter().map(|t| t.name).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[test]
fn statements_from_derived_metadata() {
    let query = Query::<Account>::new();
    assert_eq!(
        query.build_insert().unwrap(),
        "INSERT INTO accounts (display_name, balance, credit_limit, email) \
         VALUES (@name, @balance, @credit_limit, @email)"
    );
    assert_eq!(
        query.build_update().unwrap(),
        "UPDATE accounts SET display_name = @name, balance = @balance, \
         credit_limit = @credit_limit, email = @email WHERE account_id = @id"
    );
    assert_eq!(
        query.build_select().unwrap(),
        "SELECT account_id AS id, display_name AS name, balance AS balance, \
         credit_limit AS credit_limit, email AS email FROM accounts"
    );
}

#[test]
fn typed_predicates_over_derived_columns() {
    let sql = Query::<Account>::new()
        .and_where(Account::BALANCE.ge(0.0) & Account::EMAIL.is_not_null())
        .and_where(Account::NAME.in_list(["a", "b"]))
        .and_where((Account::BALANCE * 2.0).lt(1000.0))
        .build_count()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT COUNT(1) FROM accounts WHERE balance >= @balance0 AND email IS NOT NULL \
         AND display_name IN (@name1, @name2) AND (balance * @balance3) < @balance4"
    );
}

#[test]
fn non_identity_key_is_inserted() {
    assert_eq!(
        Query::<Tag>::new().build_insert().unwrap(),
        "INSERT INTO tags (slug, type) VALUES (@slug, @type)"
    );
}

#[tokio::test]
async fn detached_select_decodes_nothing() {
    let rows: Vec<NameAndTotal> = Query::<Account>::new()
        .group_by(Account::NAME)
        .select_as((Account::NAME, Account::ID.count().alias("total")))
        .await
        .unwrap();
    assert!(rows.is_empty());
}
