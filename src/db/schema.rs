//! Database schema and migrations for SkyVault.
//!
//! Migrations are applied in order when the database is first opened or
//! upgraded; `schema_version` records how many have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Hierarchy of folders and files
    r#"
-- parent_id is deliberately not a foreign key: orphans left by partial
-- failures must be representable so the sweeper can find them.
CREATE TABLE nodes (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    is_folder         INTEGER NOT NULL,
    name              TEXT NOT NULL,
    parent_id         INTEGER,                 -- NULL only for the root
    created_at        TEXT NOT NULL,
    last_accessed_at  TEXT NOT NULL,
    last_modified_at  TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_nodes_parent_name ON nodes(parent_id, name);
"#,
    // v2: Content description of file nodes
    r#"
CREATE TABLE file_metadata (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    file_type     TEXT NOT NULL,
    file_size     INTEGER NOT NULL,
    chunk_hashes  TEXT NOT NULL,               -- JSON array, in file order
    node_id       INTEGER NOT NULL UNIQUE REFERENCES nodes(id) ON DELETE CASCADE
);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_valid_sql() {
        for migration in MIGRATIONS {
            assert!(!migration.trim().is_empty());
            assert!(migration.contains("CREATE TABLE") || migration.contains("CREATE INDEX"));
        }
    }

    #[test]
    fn test_nodes_migration() {
        let nodes = MIGRATIONS[0];
        assert!(nodes.contains("CREATE TABLE nodes"));
        assert!(nodes.contains("parent_id"));
        assert!(nodes.contains("UNIQUE INDEX idx_nodes_parent_name ON nodes(parent_id, name)"));
        assert!(!nodes.contains("REFERENCES"));
    }

    #[test]
    fn test_file_metadata_migration() {
        let metadata = MIGRATIONS[1];
        assert!(metadata.contains("CREATE TABLE file_metadata"));
        assert!(metadata.contains("chunk_hashes"));
        assert!(metadata.contains("ON DELETE CASCADE"));
    }
}
