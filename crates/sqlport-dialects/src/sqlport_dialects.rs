//! Dialect providers for sqlport
//!
//! One [`DialectProvider`] per database family. Resolve a provider once with
//! [`get_dialect`] and route every rendering through it.

mod common;
mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use sqlport_core::{CoreError, DialectId, DialectProvider, Result};

static MYSQL: MySqlDialect = MySqlDialect;
static POSTGRES: PostgresDialect = PostgresDialect;
static SQLITE: SqliteDialect = SqliteDialect;
static MSSQL: MsSqlDialect = MsSqlDialect;

/// The provider for a dialect family
pub fn get_dialect(id: DialectId) -> &'static dyn DialectProvider {
    match id {
        DialectId::MySql => &MYSQL,
        DialectId::Postgres => &POSTGRES,
        DialectId::Sqlite => &SQLITE,
        DialectId::MsSql => &MSSQL,
    }
}

/// The provider for a driver name such as `"postgresql"` or `"sqlite"`
pub fn dialect_for_driver(driver_name: &str) -> Result<&'static dyn DialectProvider> {
    let id = DialectId::from_driver_name(driver_name).ok_or_else(|| {
        CoreError::Configuration(format!("no SQL dialect for driver '{driver_name}'"))
    })?;
    tracing::debug!(driver = %driver_name, dialect = %id, "resolved dialect provider");
    Ok(get_dialect(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlport_core::{DialectOperation, ObjectKind, PageQuery};

    #[test]
    fn test_registry_returns_matching_provider() {
        for id in DialectId::ALL {
            assert_eq!(get_dialect(id).id(), id);
        }
        assert_eq!(dialect_for_driver("MariaDB").unwrap().id(), DialectId::MySql);
        assert!(dialect_for_driver("mongodb").is_err());
    }

    #[test]
    fn test_shop_orders_page_query_has_no_offset_anywhere() {
        for id in [DialectId::MySql, DialectId::Postgres, DialectId::Sqlite] {
            let sql = get_dialect(id)
                .render(&DialectOperation::BuildPageQuery(PageQuery::new(
                    "shop", "orders", 50,
                )))
                .unwrap();
            assert!(sql.contains("orders"), "{sql}");
            assert!(sql.ends_with("LIMIT 50"), "{sql}");
            assert!(!sql.contains("OFFSET"), "{sql}");
        }
    }

    #[test]
    fn test_every_dialect_can_list_tables() {
        for id in DialectId::ALL {
            let sql = get_dialect(id)
                .render(&DialectOperation::ListObjects {
                    kind: ObjectKind::Table,
                    schema: "shop".into(),
                })
                .unwrap();
            assert!(sql.starts_with("SELECT"), "{id}: {sql}");
        }
    }

    #[test]
    fn test_capabilities_match_source_support() {
        for id in DialectId::ALL {
            let provider = get_dialect(id);
            let rendered = provider.render(&DialectOperation::ShowTableSource {
                schema: "shop".into(),
                table: "users".into(),
            });
            assert_eq!(rendered.is_ok(), provider.capabilities().table_source, "{id}");
        }
    }

    #[test]
    fn test_unsupported_kinds_fail_cleanly() {
        for id in DialectId::ALL {
            let provider = get_dialect(id);
            for kind in ObjectKind::ALL {
                let rendered = provider.render(&DialectOperation::ListObjects {
                    kind,
                    schema: "shop".into(),
                });
                if provider.capabilities().supports_kind(kind) {
                    assert!(rendered.is_ok(), "{id} {kind}");
                } else {
                    assert!(rendered.unwrap_err().is_unsupported(), "{id} {kind}");
                }
            }
        }
    }
}
