//! SQLite metadata store for documents and their chunks
//!
//! Holds the authoritative ownership and listing records. Rows are written
//! only after the object store and vector index writes have succeeded.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ChunkRecord, Document, FileType};

/// SQLite-backed document metadata store
pub struct MetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl MetadataStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Internal(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Internal(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Enable WAL mode for better concurrency
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            -- Document ownership and listing records
            CREATE TABLE IF NOT EXISTS document (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                object_location TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_document_owner_id ON document(owner_id);

            -- Chunk rows mirror the points held in the vector index
            CREATE TABLE IF NOT EXISTS chunk (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                document_id TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES document(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_chunk_document_id ON chunk(document_id);
        "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Insert a document and its chunk rows in one transaction
    pub fn insert_document_with_chunks(
        &self,
        document: &Document,
        chunks: &[ChunkRecord],
    ) -> Result<()> {
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction()
            .map_err(|e| Error::Internal(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            r#"
            INSERT INTO document (id, name, file_type, size, object_location, owner_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                document.id.to_string(),
                document.name,
                document.file_type.as_str(),
                document.size,
                document.object_location,
                document.owner_id.to_string(),
                document.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| map_write_err("Failed to insert document", e))?;

        {
            let mut stmt = tx
                .prepare("INSERT INTO chunk (id, position, document_id) VALUES (?1, ?2, ?3)")
                .map_err(|e| Error::Internal(format!("Failed to prepare chunk insert: {}", e)))?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.id.to_string(),
                    chunk.position,
                    chunk.document_id.to_string(),
                ])
                .map_err(|e| map_write_err("Failed to insert chunk", e))?;
            }
        }

        tx.commit()
            .map_err(|e| Error::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Look up a document, scoped to its owner
    pub fn get_document(&self, owner_id: &Uuid, document_id: &Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();

        conn.query_row(
            r#"
            SELECT id, name, file_type, size, object_location, owner_id, created_at
            FROM document
            WHERE id = ?1 AND owner_id = ?2
            "#,
            params![document_id.to_string(), owner_id.to_string()],
            row_to_document,
        )
        .optional()
        .map_err(|e| Error::Internal(format!("Failed to query document: {}", e)))
    }

    /// List a user's documents, newest first
    pub fn list_documents(&self, owner_id: &Uuid) -> Result<Vec<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, name, file_type, size, object_location, owner_id, created_at
                FROM document
                WHERE owner_id = ?1
                ORDER BY created_at DESC
                "#,
            )
            .map_err(|e| Error::Internal(format!("Failed to prepare query: {}", e)))?;

        let documents = stmt
            .query_map(params![owner_id.to_string()], row_to_document)
            .map_err(|e| Error::Internal(format!("Failed to query documents: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(documents)
    }

    /// Chunk ids belonging to a document, in position order
    pub fn chunk_ids_for_document(&self, document_id: &Uuid) -> Result<Vec<Uuid>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT id FROM chunk WHERE document_id = ?1 ORDER BY position")
            .map_err(|e| Error::Internal(format!("Failed to prepare query: {}", e)))?;

        let ids = stmt
            .query_map(params![document_id.to_string()], |row| {
                let id_str: String = row.get(0)?;
                Ok(Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()))
            })
            .map_err(|e| Error::Internal(format!("Failed to query chunk ids: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(ids)
    }

    /// Resolve document names for a set of ids, scoped to an owner
    pub fn document_names(&self, owner_id: &Uuid, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare("SELECT name FROM document WHERE id = ?1 AND owner_id = ?2")
            .map_err(|e| Error::Internal(format!("Failed to prepare query: {}", e)))?;

        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            let name: Option<String> = stmt
                .query_row(params![id.to_string(), owner_id.to_string()], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|e| Error::Internal(format!("Failed to query document name: {}", e)))?;

            if let Some(name) = name {
                names.push((*id, name));
            }
        }

        Ok(names)
    }

    /// Delete a document and its chunk rows
    ///
    /// Chunk rows go first even though the schema cascades, so a partial
    /// failure can never leave chunk rows behind an already-deleted document.
    pub fn delete_document(&self, document_id: &Uuid) -> Result<()> {
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction()
            .map_err(|e| Error::Internal(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "DELETE FROM chunk WHERE document_id = ?1",
            params![document_id.to_string()],
        )
        .map_err(|e| Error::Internal(format!("Failed to delete chunks: {}", e)))?;

        tx.execute(
            "DELETE FROM document WHERE id = ?1",
            params![document_id.to_string()],
        )
        .map_err(|e| Error::Internal(format!("Failed to delete document: {}", e)))?;

        tx.commit()
            .map_err(|e| Error::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Total number of documents across all owners
    pub fn document_count(&self) -> Result<usize> {
        let conn = self.conn.lock();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM document", [], |row| row.get(0))
            .map_err(|e| Error::Internal(format!("Failed to count documents: {}", e)))?;

        Ok(count as usize)
    }
}

fn map_write_err(context: &str, e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::metadata_conflict(format!("{}: {}", context, e))
        }
        _ => Error::Internal(format!("{}: {}", context, e)),
    }
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let file_type_str: String = row.get(2)?;
    let size: i64 = row.get(3)?;
    let object_location: String = row.get(4)?;
    let owner_id_str: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;

    Ok(Document {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        name,
        file_type: FileType::from_extension(&file_type_str).unwrap_or(FileType::Plain),
        size,
        object_location,
        owner_id: Uuid::parse_str(&owner_id_str).unwrap_or_else(|_| Uuid::new_v4()),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_document(owner_id: Uuid) -> Document {
        Document::new(
            "report.pdf".to_string(),
            FileType::Pdf,
            2048,
            "documents/owner/report.pdf".to_string(),
            owner_id,
        )
    }

    #[test]
    fn test_insert_and_get_document() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();
        let document = sample_document(owner_id);
        let chunks = vec![
            ChunkRecord::new(0, document.id),
            ChunkRecord::new(1, document.id),
        ];

        db.insert_document_with_chunks(&document, &chunks).unwrap();

        let found = db.get_document(&owner_id, &document.id).unwrap().unwrap();
        assert_eq!(found.id, document.id);
        assert_eq!(found.name, "report.pdf");
        assert_eq!(found.file_type, FileType::Pdf);
        assert_eq!(found.size, 2048);
        assert_eq!(found.object_location, "documents/owner/report.pdf");
        assert_eq!(found.owner_id, owner_id);
    }

    #[test]
    fn test_get_document_is_owner_scoped() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();
        let document = sample_document(owner_id);

        db.insert_document_with_chunks(&document, &[]).unwrap();

        let other_owner = Uuid::new_v4();
        assert!(db.get_document(&other_owner, &document.id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_document_id_is_a_conflict() {
        let db = MetadataStore::in_memory().unwrap();
        let document = sample_document(Uuid::new_v4());

        db.insert_document_with_chunks(&document, &[]).unwrap();
        let err = db
            .insert_document_with_chunks(&document, &[])
            .unwrap_err();

        assert!(matches!(err, Error::MetadataConflict(_)));
    }

    #[test]
    fn test_failed_insert_rolls_back_document_row() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();
        let document = sample_document(owner_id);
        let chunk = ChunkRecord::new(0, document.id);

        // Same chunk id twice violates the primary key mid-transaction
        let err = db
            .insert_document_with_chunks(&document, &[chunk.clone(), chunk])
            .unwrap_err();
        assert!(matches!(err, Error::MetadataConflict(_)));

        assert!(db.get_document(&owner_id, &document.id).unwrap().is_none());
    }

    #[test]
    fn test_list_documents_newest_first() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();

        let mut older = sample_document(owner_id);
        older.name = "older.txt".to_string();
        older.created_at = Utc::now() - Duration::minutes(5);
        let mut newer = sample_document(owner_id);
        newer.name = "newer.txt".to_string();

        db.insert_document_with_chunks(&older, &[]).unwrap();
        db.insert_document_with_chunks(&newer, &[]).unwrap();

        let documents = db.list_documents(&owner_id).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].name, "newer.txt");
        assert_eq!(documents[1].name, "older.txt");
    }

    #[test]
    fn test_list_documents_excludes_other_owners() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();

        db.insert_document_with_chunks(&sample_document(owner_id), &[])
            .unwrap();
        db.insert_document_with_chunks(&sample_document(Uuid::new_v4()), &[])
            .unwrap();

        assert_eq!(db.list_documents(&owner_id).unwrap().len(), 1);
    }

    #[test]
    fn test_chunk_ids_come_back_in_position_order() {
        let db = MetadataStore::in_memory().unwrap();
        let document = sample_document(Uuid::new_v4());

        let c2 = ChunkRecord::new(2, document.id);
        let c0 = ChunkRecord::new(0, document.id);
        let c1 = ChunkRecord::new(1, document.id);
        db.insert_document_with_chunks(&document, &[c2.clone(), c0.clone(), c1.clone()])
            .unwrap();

        let ids = db.chunk_ids_for_document(&document.id).unwrap();
        assert_eq!(ids, vec![c0.id, c1.id, c2.id]);
    }

    #[test]
    fn test_delete_document_removes_chunk_rows() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();
        let document = sample_document(owner_id);
        let chunks = vec![
            ChunkRecord::new(0, document.id),
            ChunkRecord::new(1, document.id),
        ];

        db.insert_document_with_chunks(&document, &chunks).unwrap();
        db.delete_document(&document.id).unwrap();

        assert!(db.get_document(&owner_id, &document.id).unwrap().is_none());
        assert!(db.chunk_ids_for_document(&document.id).unwrap().is_empty());
        assert_eq!(db.document_count().unwrap(), 0);
    }

    #[test]
    fn test_unknown_size_round_trips() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();
        let mut document = sample_document(owner_id);
        document.size = crate::types::UNKNOWN_SIZE;

        db.insert_document_with_chunks(&document, &[]).unwrap();

        let found = db.get_document(&owner_id, &document.id).unwrap().unwrap();
        assert_eq!(found.size, crate::types::UNKNOWN_SIZE);
    }

    #[test]
    fn test_document_names_skips_foreign_documents() {
        let db = MetadataStore::in_memory().unwrap();
        let owner_id = Uuid::new_v4();
        let mine = sample_document(owner_id);
        let theirs = sample_document(Uuid::new_v4());

        db.insert_document_with_chunks(&mine, &[]).unwrap();
        db.insert_document_with_chunks(&theirs, &[]).unwrap();

        let names = db
            .document_names(&owner_id, &[mine.id, theirs.id])
            .unwrap();
        assert_eq!(names, vec![(mine.id, "report.pdf".to_string())]);
    }
}
