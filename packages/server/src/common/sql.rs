//! Database handle with schema-prefix support.
//!
//! Every SQL statement in the crate qualifies table names through
//! [`Db::table`], so a configured schema prefix is the only place to change.

use sqlx::PgPool;

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
    schema: String,
}

impl Db {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into().trim().to_string(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Qualified table name: `schema.name` when a schema is configured.
    pub fn table(&self, name: &str) -> String {
        if self.schema.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.schema, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap()
    }

    #[tokio::test]
    async fn unqualified_without_schema() {
        let db = Db::new(lazy_pool(), "");
        assert_eq!(db.table("jobs"), "jobs");
    }

    #[tokio::test]
    async fn qualified_with_schema() {
        let db = Db::new(lazy_pool(), "deals");
        assert_eq!(db.table("jobs"), "deals.jobs");
    }

    #[tokio::test]
    async fn schema_whitespace_is_trimmed() {
        let db = Db::new(lazy_pool(), "  ");
        assert_eq!(db.table("documents"), "documents");
    }
}
