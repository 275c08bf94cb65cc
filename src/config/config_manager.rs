// ==========================================
// 合作社收款台账 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (scope_id + key → value)
// 会话信息同表存放于独立 scope（见 api::session_api）
// ==========================================

use crate::config::config_reader::AppConfigReader;
use crate::db::SharedConnection;
use crate::domain::types::ExportFormat;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// 全局配置作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取指定作用域的配置值
    pub fn get_scoped_value(&self, scope_id: &str, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope_id, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入指定作用域的配置值（存在则覆盖）
    pub fn set_scoped_value(&self, scope_id: &str, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![scope_id, key, value],
        )?;
        debug!(scope_id, key, "配置已写入");
        Ok(())
    }

    /// 删除指定作用域的单个配置
    pub fn delete_scoped_value(&self, scope_id: &str, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope_id, key],
        )?;
        Ok(deleted > 0)
    }

    /// 删除指定作用域的全部配置
    pub fn clear_scope(&self, scope_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM config_kv WHERE scope_id = ?1", params![scope_id])?;
        Ok(deleted)
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_scoped_value(GLOBAL_SCOPE, key)
    }

    /// 写入 global scope 的配置值
    pub fn set_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.set_scoped_value(GLOBAL_SCOPE, key, value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let config_map = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<SqliteResult<HashMap<String, String>>>()?;

        Ok(json!(config_map).to_string())
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        _ => default,
    }
}

#[async_trait]
impl AppConfigReader for ConfigManager {
    async fn get_export_format(&self) -> RepositoryResult<ExportFormat> {
        let value = self.get_config_or_default(config_keys::EXPORT_FORMAT, defaults::EXPORT_FORMAT)?;
        Ok(ExportFormat::from_str(&value))
    }

    async fn get_export_output_dir(&self) -> RepositoryResult<PathBuf> {
        let value =
            self.get_config_or_default(config_keys::EXPORT_OUTPUT_DIR, defaults::EXPORT_OUTPUT_DIR)?;
        Ok(PathBuf::from(value))
    }

    async fn get_clear_after_export(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(config_keys::EXPORT_CLEAR_AFTER_EXPORT, "false")?;
        Ok(parse_bool(&value, defaults::CLEAR_AFTER_EXPORT))
    }

    async fn get_replace_existing(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(config_keys::IMPORT_REPLACE_EXISTING, "true")?;
        Ok(parse_bool(&value, defaults::REPLACE_EXISTING))
    }

    async fn get_search_max_results(&self) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(config_keys::SEARCH_MAX_RESULTS, "20")?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(defaults::SEARCH_MAX_RESULTS))
    }

    async fn get_default_pin(&self) -> RepositoryResult<String> {
        let value = self.get_config_or_default(config_keys::AUTH_DEFAULT_PIN, defaults::DEFAULT_PIN)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(defaults::DEFAULT_PIN.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导出
    pub const EXPORT_FORMAT: &str = "export.format";
    pub const EXPORT_OUTPUT_DIR: &str = "export.output_dir";
    pub const EXPORT_CLEAR_AFTER_EXPORT: &str = "export.clear_after_export";

    // 导入
    pub const IMPORT_REPLACE_EXISTING: &str = "import.replace_existing";

    // 检索
    pub const SEARCH_MAX_RESULTS: &str = "search.max_results";

    // 登录
    pub const AUTH_DEFAULT_PIN: &str = "auth.default_pin";
}

// 缺省值
pub mod defaults {
    pub const EXPORT_FORMAT: &str = "XLSX";
    pub const EXPORT_OUTPUT_DIR: &str = "./exports";
    pub const CLEAR_AFTER_EXPORT: bool = false;
    pub const REPLACE_EXISTING: bool = true;
    pub const SEARCH_MAX_RESULTS: usize = 20;
    pub const DEFAULT_PIN: &str = crate::credential::DEFAULT_PIN;
}
