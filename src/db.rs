// ==========================================
// 合作社收款台账 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 建表幂等,进程内只打开一次,由调用方显式传递连接句柄
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 共享连接句柄
pub type SharedConnection = Arc<Mutex<Connection>>;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开连接、建表,并包装为共享句柄
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<SharedConnection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 内存库（测试 / 一次性任务）
pub fn open_in_memory() -> rusqlite::Result<SharedConnection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS society (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS agent (
            id TEXT PRIMARY KEY,
            society_id TEXT NOT NULL REFERENCES society(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            phone TEXT,
            pin_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (society_id, code)
        );

        CREATE TABLE IF NOT EXISTS account (
            id TEXT PRIMARY KEY,
            society_id TEXT NOT NULL REFERENCES society(id) ON DELETE CASCADE,
            agent_id TEXT NOT NULL REFERENCES agent(id) ON DELETE CASCADE,
            account_no TEXT NOT NULL,
            lot_key TEXT NOT NULL,
            client_name TEXT NOT NULL,
            account_type TEXT NOT NULL,
            frequency TEXT NOT NULL,
            account_head TEXT,
            account_head_code TEXT,
            installment_paise INTEGER NOT NULL DEFAULT 0,
            balance_paise INTEGER NOT NULL DEFAULT 0,
            last_txn_at TEXT,
            opened_at TEXT,
            closes_at TEXT,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (society_id, agent_id, account_no, lot_key)
        );

        CREATE INDEX IF NOT EXISTS idx_account_agent_lot ON account(agent_id, lot_key);

        CREATE TABLE IF NOT EXISTS collection_entry (
            id TEXT PRIMARY KEY,
            society_id TEXT NOT NULL REFERENCES society(id) ON DELETE CASCADE,
            agent_id TEXT NOT NULL REFERENCES agent(id) ON DELETE CASCADE,
            account_id TEXT NOT NULL REFERENCES account(id),
            account_no TEXT NOT NULL,
            collected_paise INTEGER NOT NULL,
            collected_at TEXT NOT NULL,
            collection_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            exported_at TEXT,
            remarks TEXT,
            UNIQUE (agent_id, account_id, collection_date)
        );

        CREATE INDEX IF NOT EXISTS idx_collection_agent_status ON collection_entry(agent_id, status);

        CREATE TABLE IF NOT EXISTS export_record (
            id TEXT PRIMARY KEY,
            society_id TEXT NOT NULL REFERENCES society(id) ON DELETE CASCADE,
            agent_id TEXT NOT NULL REFERENCES agent(id) ON DELETE CASCADE,
            exported_at TEXT NOT NULL,
            file_uri TEXT,
            collections_count INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
