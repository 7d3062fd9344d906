//! Local metadata store.
//!
//! Collections and containers live in an embedded SQLite database. A
//! container is identified by `(collection, name, tag, client, version)`;
//! writing the same key twice updates the existing row. A missing version is
//! stored as the empty string so that this key treats "no version" as a
//! single value.

mod models;

pub use models::{Collection, Container, NewContainer};

use crate::error::{Result, SregError};
use crate::metadata;
use crate::names::{ImageName, format_uri};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::time::Duration;
use tracing::debug;


const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collection (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    token TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS container (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    tag TEXT NOT NULL,
    version TEXT NOT NULL DEFAULT '',
    client TEXT NOT NULL,
    collection_id INTEGER NOT NULL REFERENCES collection(id),
    metrics TEXT NOT NULL,
    image TEXT,
    url TEXT,
    uri TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (collection_id, name, tag, client, version)
);

CREATE INDEX IF NOT EXISTS idx_container_uri ON container(uri);
CREATE INDEX IF NOT EXISTS idx_container_collection ON container(collection_id);
"#;

const CONTAINER_SELECT: &str = "SELECT c.id, c.name, c.tag, c.version, c.client, c.metrics, \
     c.image, c.url, c.uri, c.created_at, k.id, k.name, k.token, k.created_at \
     FROM container c JOIN collection k ON k.id = c.collection_id";

const CONTAINER_ORDER: &str = "ORDER BY k.name, c.name, c.tag, c.version, c.id";

const MOST_RECENT: &str = "ORDER BY c.created_at DESC, c.id DESC LIMIT 1";

/// SQLite-backed store of collections and containers.
pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    /// Opens or creates the database at `path`.
    ///
    /// The parent directory must exist and be writable; this is checked
    /// before the database is touched, and any failure here is a
    /// `Configuration` error.
    pub fn open(path: &Path) -> Result<Self> {
        let location = path.display().to_string();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        if !parent.exists() {
            return Err(SregError::configuration(
                format!("Database directory {} does not exist", parent.display()),
                Some(location),
            ));
        }
        if !parent.is_dir() {
            return Err(SregError::configuration(
                format!("Database parent {} is not a directory", parent.display()),
                Some(location),
            ));
        }
        tempfile::Builder::new()
            .prefix(".sreg-write-check")
            .tempfile_in(parent)
            .map_err(|e| {
                SregError::configuration_with_source(
                    format!("Database directory {} is not writable", parent.display()),
                    Some(location.clone()),
                    e,
                )
            })?;

        let conn = Connection::open(path).map_err(|e| {
            SregError::configuration_with_source("Failed to open database", Some(location.clone()), e)
        })?;

        debug!("Opened metadata store at {}", location);
        Self::init(conn).map_err(|e| {
            SregError::configuration_with_source(
                "Failed to initialize database",
                Some(location.clone()),
                e,
            )
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SregError::configuration_with_source("Failed to open database", Some(":memory:"), e)
        })?;
        Self::init(conn).map_err(|e| {
            SregError::configuration_with_source(
                "Failed to initialize database",
                Some(":memory:"),
                e,
            )
        })
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Returns the collection called `name`, creating it if needed.
    ///
    /// Safe against another process creating the same collection
    /// concurrently: the insert is a no-op when the name already exists.
    pub fn get_or_create_collection(&self, name: &str) -> Result<Collection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SregError::validation("Collection name cannot be empty"));
        }

        let inserted = self.conn.execute(
            "INSERT INTO collection (name, token, created_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name) DO NOTHING",
            params![name, uuid::Uuid::new_v4().to_string(), Utc::now()],
        )?;
        if inserted > 0 {
            debug!("Created collection {}", name);
        }

        self.get_collection(name)?
            .ok_or_else(|| SregError::not_found("collection", name))
    }

    /// Creates a collection. A random token is generated when none is given.
    pub fn create_collection(&self, name: &str, token: Option<&str>) -> Result<Collection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SregError::validation("Collection name cannot be empty"));
        }
        if self.get_collection(name)?.is_some() {
            return Err(SregError::duplicate_name(name));
        }

        let token = token
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let created_at = Utc::now();

        self.conn.execute(
            "INSERT INTO collection (name, token, created_at) VALUES (?1, ?2, ?3)",
            params![name, token, created_at],
        )?;

        debug!("Created collection {}", name);
        Ok(Collection {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            token,
            created_at,
        })
    }

    pub fn get_collection(&self, name: &str) -> Result<Option<Collection>> {
        let collection = self
            .conn
            .query_row(
                "SELECT id, name, token, created_at FROM collection WHERE name = ?1",
                params![name],
                |r| collection_from_row(r, 0),
            )
            .optional()?;
        Ok(collection)
    }

    /// Lists all collections ordered by name.
    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, token, created_at FROM collection ORDER BY name")?;
        let rows = stmt
            .query_map(params![], |r| collection_from_row(r, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Containers belonging to `collection`.
    pub fn collection_containers(&self, collection: &Collection) -> Result<Vec<Container>> {
        self.query_containers(
            &format!("{} WHERE c.collection_id = ?1 {}", CONTAINER_SELECT, CONTAINER_ORDER),
            params![collection.id],
        )
    }

    /// Deletes a collection together with its containers.
    ///
    /// Returns the number of containers removed.
    pub fn delete_collection(&mut self, name: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let id: i64 = tx
            .query_row(
                "SELECT id FROM collection WHERE name = ?1",
                params![name],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| SregError::not_found("collection", name))?;

        let removed = tx.execute("DELETE FROM container WHERE collection_id = ?1", params![id])?;
        tx.execute("DELETE FROM collection WHERE id = ?1", params![id])?;
        tx.commit()?;

        debug!("Deleted collection {} and {} container(s)", name, removed);
        Ok(removed)
    }

    /// Inserts a container, or updates the row with the same identity.
    ///
    /// On update `metrics` is replaced while `image` and `url` only change
    /// when a new value is given.
    pub fn upsert_container(&self, collection: &Collection, new: &NewContainer) -> Result<Container> {
        if new.name.trim().is_empty() || new.tag.trim().is_empty() {
            return Err(SregError::validation("Container name and tag cannot be empty"));
        }

        let version = new.version.as_deref().unwrap_or("");
        let uri = format_uri(&collection.name, &new.name, &new.tag, Some(version));

        let id: i64 = self.conn.query_row(
            "INSERT INTO container \
                 (name, tag, version, client, collection_id, metrics, image, url, uri, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT (collection_id, name, tag, client, version) DO UPDATE SET \
                 metrics = excluded.metrics, \
                 image = COALESCE(excluded.image, container.image), \
                 url = COALESCE(excluded.url, container.url) \
             RETURNING id",
            params![
                new.name,
                new.tag,
                version,
                new.client,
                collection.id,
                new.metrics,
                new.image,
                new.url,
                uri,
                Utc::now(),
            ],
            |r| r.get(0),
        )?;

        debug!("Stored container {} (id {})", uri, id);
        self.get_container(id)?
            .ok_or_else(|| SregError::not_found("container", uri))
    }

    fn get_container(&self, id: i64) -> Result<Option<Container>> {
        let container = self
            .conn
            .query_row(
                &format!("{} WHERE c.id = ?1", CONTAINER_SELECT),
                params![id],
                container_from_row,
            )
            .optional()?;
        Ok(container)
    }

    /// Finds a container by stored uri, falling back to a parsed name lookup.
    ///
    /// When several containers match, the most recent one wins.
    pub fn find_container(&self, query: &str) -> Result<Option<Container>> {
        let query = query.trim();

        let exact = self
            .conn
            .query_row(
                &format!("{} WHERE c.uri = ?1 {}", CONTAINER_SELECT, MOST_RECENT),
                params![query],
                container_from_row,
            )
            .optional()?;
        if exact.is_some() {
            return Ok(exact);
        }

        match query.parse::<ImageName>() {
            Ok(image) => self.find(&image),
            Err(e) => {
                debug!("'{}' is not an image name: {}", query, e);
                Ok(None)
            }
        }
    }

    /// Finds the most recent container matching `image`.
    ///
    /// The version is only compared when `image` has one.
    pub fn find(&self, image: &ImageName) -> Result<Option<Container>> {
        let version = image.version.as_deref().unwrap_or("");
        let container = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE k.name = ?1 AND c.name = ?2 AND c.tag = ?3 \
                     AND (?4 = '' OR c.version = ?4) {}",
                    CONTAINER_SELECT, MOST_RECENT
                ),
                params![image.collection, image.name, image.tag, version],
                container_from_row,
            )
            .optional()?;
        Ok(container)
    }

    /// Case-insensitive substring search over container name, uri and
    /// collection name. An empty term lists everything.
    pub fn search(&self, term: &str) -> Result<Vec<Container>> {
        let term = term.trim().to_lowercase();
        self.query_containers(
            &format!(
                "{} WHERE ?1 = '' \
                 OR instr(lower(c.name), ?1) > 0 \
                 OR instr(lower(COALESCE(c.uri, '')), ?1) > 0 \
                 OR instr(lower(k.name), ?1) > 0 {}",
                CONTAINER_SELECT, CONTAINER_ORDER
            ),
            params![term],
        )
    }

    /// Containers whose inspection properties hold the given pair.
    ///
    /// Either side may be `None` to match anything; values compare exactly.
    pub fn label_search(&self, key: Option<&str>, value: Option<&str>) -> Result<Vec<Container>> {
        Ok(self
            .list_containers()?
            .into_iter()
            .filter(|c| metadata::matches_label(&c.properties(), key, value))
            .collect())
    }

    /// All containers, in search order.
    pub fn list_containers(&self) -> Result<Vec<Container>> {
        self.query_containers(&format!("{} {}", CONTAINER_SELECT, CONTAINER_ORDER), params![])
    }

    fn query_containers<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Container>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, container_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn collection_from_row(r: &Row<'_>, offset: usize) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: r.get(offset)?,
        name: r.get(offset + 1)?,
        token: r.get(offset + 2)?,
        created_at: r.get(offset + 3)?,
    })
}

fn container_from_row(r: &Row<'_>) -> rusqlite::Result<Container> {
    let collection = collection_from_row(r, 10)?;
    let name: String = r.get(1)?;
    let tag: String = r.get(2)?;
    let version: String = r.get(3)?;
    let version = (!version.is_empty()).then_some(version);
    let stored_uri: Option<String> = r.get(8)?;
    let uri = stored_uri
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format_uri(&collection.name, &name, &tag, version.as_deref()));

    Ok(Container {
        id: r.get(0)?,
        name,
        tag,
        version,
        client: r.get(4)?,
        metrics: r.get(5)?,
        image: r.get(6)?,
        url: r.get(7)?,
        uri,
        created_at: r.get(9)?,
        collection,
    })
}
