use daokit_core::db::SCHEMA_VERSION;
use daokit_core::{
    InfraError, ResourceFactory, SqliteConnection, SqliteConnectionFactory, TemplateError, User,
    UserDao,
};
use rusqlite::Connection;
use std::path::Path;

fn user_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap()
}

fn column_names(resource: &SqliteConnection, table: &str) -> Vec<String> {
    let conn = resource.connection().unwrap();
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});")).unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

fn stamp_version(path: &Path, version: u32) {
    let conn = Connection::open(path).unwrap();
    conn.pragma_update(None, "user_version", version).unwrap();
}

#[test]
fn first_acquisition_installs_users_table() {
    let dir = tempfile::tempdir().unwrap();
    let factory = SqliteConnectionFactory::new(dir.path().join("fresh.db"));

    let resource = factory.new_resource().unwrap();

    assert_eq!(column_names(&resource, "users"), vec!["id", "name", "password"]);
    assert_eq!(user_version(resource.connection().unwrap()), SCHEMA_VERSION);
}

#[test]
fn in_memory_resources_each_get_the_schema() {
    let factory = SqliteConnectionFactory::in_memory();

    let first = factory.new_resource().unwrap();
    let second = factory.new_resource().unwrap();

    assert_eq!(column_names(&first, "users").len(), 3);
    assert_eq!(column_names(&second, "users").len(), 3);
}

#[test]
fn reacquiring_keeps_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kept.db");

    UserDao::new(SqliteConnectionFactory::new(&path))
        .add(&User::new("u1", "Kim", "pw"))
        .unwrap();
    let dao = UserDao::new(SqliteConnectionFactory::new(&path));

    assert_eq!(dao.get_count().unwrap(), 1);
    assert_eq!(dao.get("u1").unwrap().map(|user| user.name), Some("Kim".to_string()));
}

#[test]
fn newer_schema_is_refused_on_acquisition_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    stamp_version(&path, SCHEMA_VERSION + 1);

    match SqliteConnectionFactory::new(&path).new_resource() {
        Err(InfraError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, SCHEMA_VERSION + 1);
            assert_eq!(latest_supported, SCHEMA_VERSION);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("a newer schema must be refused"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(user_version(&conn), SCHEMA_VERSION + 1);
    let users_tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(users_tables, 0);
}

#[test]
fn dao_surfaces_schema_refusal_as_infrastructure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    stamp_version(&path, SCHEMA_VERSION + 1);

    let err = UserDao::new(SqliteConnectionFactory::new(&path))
        .get_count()
        .unwrap_err();

    assert!(!err.is_domain());
    assert!(matches!(
        err,
        TemplateError::Infra(InfraError::UnsupportedSchemaVersion { .. })
    ));
}
