//! SurrealDB connection setup
//!
//! Supports in-memory, local file (`surrealkv://`), arbitrary URL and
//! authenticated remote (WebSocket) connections. Every connection selects
//! the namespace/database and initializes the schema before it is handed
//! out.

use std::path::PathBuf;

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

use crate::error::StateError;
use crate::migrations;
use crate::Result;

const DEFAULT_NAMESPACE: &str = "gauntlet";
const DEFAULT_DATABASE: &str = "main";
const DEFAULT_LOCAL_PATH: &str = ".gauntlet/db";

/// Sign-in used for a remote instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Root user, valid across namespaces
    Root { username: String, password: String },
    /// User scoped to the selected namespace/database
    Database { username: String, password: String },
}

/// Where the session store lives
#[derive(Debug, Clone)]
pub enum DbTarget {
    /// `mem://`, gone when the process exits
    Memory,
    /// Any URL SurrealDB understands, used with the default namespace
    Url(String),
    /// Embedded `surrealkv://` store in a directory
    LocalPath(PathBuf),
    /// Authenticated remote instance (e.g. `wss://xxx.surrealdb.cloud`)
    Remote {
        endpoint: String,
        namespace: String,
        database: String,
        credentials: Credentials,
    },
}

impl DbTarget {
    /// Remote target in the `gauntlet` namespace and `main` database.
    pub fn remote(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        DbTarget::Remote {
            endpoint: endpoint.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            credentials,
        }
    }

    /// Resolve the target from the environment.
    ///
    /// A complete `SURREALDB_ENDPOINT`/`_USERNAME`/`_PASSWORD` set wins, then
    /// `SURREALDB_URL`, then a local store in `.gauntlet/db`.
    pub fn from_env() -> Self {
        if let Some(remote) = Self::remote_from_env() {
            return remote;
        }
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return DbTarget::Url(url);
        }
        DbTarget::LocalPath(PathBuf::from(DEFAULT_LOCAL_PATH))
    }

    /// `SURREALDB_NAMESPACE` and `SURREALDB_DATABASE` override the defaults;
    /// `SURREALDB_ROOT=true` signs in as root.
    fn remote_from_env() -> Option<Self> {
        let endpoint = std::env::var("SURREALDB_ENDPOINT").ok()?;
        let username = std::env::var("SURREALDB_USERNAME").ok()?;
        let password = std::env::var("SURREALDB_PASSWORD").ok()?;
        let root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let credentials = if root {
            Credentials::Root { username, password }
        } else {
            Credentials::Database { username, password }
        };
        Some(DbTarget::Remote {
            endpoint,
            namespace: std::env::var("SURREALDB_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string()),
            database: std::env::var("SURREALDB_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            credentials,
        })
    }

    /// Parse a `--db` style argument: `mem://` or any URL with a scheme is
    /// used verbatim, anything else is a local directory.
    pub fn parse(value: &str) -> Self {
        if value == "mem://" || value == "memory" {
            DbTarget::Memory
        } else if value.contains("://") {
            DbTarget::Url(value.to_string())
        } else {
            DbTarget::LocalPath(PathBuf::from(value))
        }
    }
}

impl std::fmt::Display for DbTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbTarget::Memory => write!(f, "mem://"),
            DbTarget::Url(url) => write!(f, "{url}"),
            DbTarget::LocalPath(path) => write!(f, "surrealkv://{}", path.display()),
            DbTarget::Remote { endpoint, .. } => write!(f, "{endpoint}"),
        }
    }
}

/// Open a connection to `target`, select namespace/database and make sure
/// the schema exists.
#[instrument(skip_all, fields(target = %target))]
pub async fn connect(target: &DbTarget) -> Result<Surreal<Any>> {
    let (db, namespace, database) = match target {
        DbTarget::Memory => (open("mem://").await?, DEFAULT_NAMESPACE, DEFAULT_DATABASE),
        DbTarget::Url(url) => (open(url).await?, DEFAULT_NAMESPACE, DEFAULT_DATABASE),
        DbTarget::LocalPath(path) => {
            std::fs::create_dir_all(path).map_err(|e| {
                StateError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let url = format!("surrealkv://{}", path.display());
            (open(&url).await?, DEFAULT_NAMESPACE, DEFAULT_DATABASE)
        }
        DbTarget::Remote {
            endpoint,
            namespace,
            database,
            credentials,
        } => {
            let db = open(endpoint).await?;
            signin(&db, namespace, database, credentials).await?;
            (db, namespace.as_str(), database.as_str())
        }
    };

    db.use_ns(namespace)
        .use_db(database)
        .await
        .map_err(|e| {
            StateError::Connection(format!("Failed to select namespace/database: {}", e))
        })?;

    migrations::init_schema(&db).await?;
    info!("SurrealDB connected and schema initialized");
    Ok(db)
}

async fn open(url: &str) -> Result<Surreal<Any>> {
    surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))
}

async fn signin(
    db: &Surreal<Any>,
    namespace: &str,
    database: &str,
    credentials: &Credentials,
) -> Result<()> {
    let outcome = match credentials {
        Credentials::Root { username, password } => db
            .signin(Root { username, password })
            .await
            .map(|_| ()),
        Credentials::Database { username, password } => db
            .signin(Database {
                namespace,
                database,
                username,
                password,
            })
            .await
            .map(|_| ()),
    };
    outcome.map_err(|e| StateError::Connection(format!("Authentication failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_memory_urls_and_paths() {
        assert!(matches!(DbTarget::parse("mem://"), DbTarget::Memory));
        assert!(matches!(DbTarget::parse("ws://localhost:8000"), DbTarget::Url(u) if u == "ws://localhost:8000"));
        assert!(matches!(DbTarget::parse("./data/db"), DbTarget::LocalPath(p) if p == PathBuf::from("./data/db")));
    }

    #[test]
    fn remote_defaults_to_gauntlet_namespace() {
        let credentials = Credentials::Database {
            username: "user".into(),
            password: "pass".into(),
        };
        let target = DbTarget::remote("wss://example", credentials.clone());
        assert_eq!(target.to_string(), "wss://example");
        let DbTarget::Remote {
            namespace,
            database,
            credentials: resolved,
            ..
        } = target
        else {
            panic!("expected a remote target");
        };
        assert_eq!(namespace, "gauntlet");
        assert_eq!(database, "main");
        assert_eq!(resolved, credentials);
    }

    #[tokio::test]
    async fn local_path_connects_and_schema_init_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let target = DbTarget::LocalPath(dir.path().join("db"));
        let db = connect(&target).await.unwrap();
        assert!(dir.path().join("db").exists());

        migrations::init_schema(&db).await.unwrap();

        let mut res = db.query("SELECT * FROM sessions").await.unwrap();
        let rows: Vec<crate::schema::SessionRow> = res.take(0).unwrap();
        assert!(rows.is_empty());
    }
}
