use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};

/// Schema is owned by the `migration` crate; this only opens the pool.
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    tracing::info!(backend = ?db.get_database_backend(), "Database connection established");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::establish_connection;

    #[tokio::test]
    async fn establish_connection_accepts_sqlite_memory_url() {
        let conn = establish_connection("sqlite::memory:").await;
        assert!(conn.is_ok());
    }

    #[tokio::test]
    async fn establish_connection_rejects_invalid_url() {
        let conn = establish_connection("not-a-valid-db-url").await;
        assert!(conn.is_err());
    }
}
