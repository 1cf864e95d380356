use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("CAREER_DB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("CAREER_DB_NAMESPACE").unwrap_or_else(|_| "career_code".to_string()),
            database: env::var("CAREER_DB_DATABASE").unwrap_or_else(|_| "board".to_string()),
            username: env::var("CAREER_DB_USERNAME").ok(),
            password: env::var("CAREER_DB_PASSWORD").ok(),
        }
    }
}

impl DatabaseConfig {
    /// Fresh in-process database, used by tests and local runs.
    pub fn memory() -> Self {
        Self {
            url: "memory".to_string(),
            namespace: "career_code".to_string(),
            database: "board".to_string(),
            username: None,
            password: None,
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    // Documents are free-form, so both tables stay schemaless; only the fields
    // the routes filter on are indexed.
    let schema_queries = [
        "DEFINE TABLE IF NOT EXISTS job SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS job_hr_email ON TABLE job COLUMNS hr_email;",
        "DEFINE TABLE IF NOT EXISTS application SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS application_job ON TABLE application COLUMNS jobId;
         DEFINE INDEX IF NOT EXISTS application_applicant ON TABLE application COLUMNS applicant;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config() {
        let config = DatabaseConfig::memory();
        assert_eq!(config.url, "memory");
        assert!(config.username.is_none());
    }

    #[tokio::test]
    async fn test_ensure_schema_is_repeatable() {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        ensure_schema(&db).await.unwrap();
    }
}
