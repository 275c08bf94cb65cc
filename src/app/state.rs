// ==========================================
// 合作社收款台账 - 应用状态
// ==========================================
// 职责: 进程内唯一的连接句柄 + 各 API 实例
// 连接在启动时打开一次,显式传入每个仓储/导入器/导出器
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{CollectionApi, ExportApi, ImportApi, SessionApi, SessionStore, SqliteSessionStore};
use crate::config::{AppConfigReader, ConfigManager};
use crate::db::{open_shared_connection, SharedConnection};
use crate::export::file_store::{DirectoryFileStore, FileStore, ShareTarget};
use crate::repository::{
    AccountRepository, AgentRepository, CollectionRepository, ExportRecordRepository,
    SocietyRepository,
};

/// DB 路径环境变量
pub const DB_PATH_ENV: &str = "IAMC_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径（内存库时为 ":memory:"）
    pub db_path: String,

    /// 共享连接
    pub conn: SharedConnection,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 合作社仓储（只读浏览）
    pub society_repo: Arc<SocietyRepository>,

    /// 代理人仓储
    pub agent_repo: Arc<AgentRepository>,

    pub session_api: Arc<SessionApi>,
    pub import_api: Arc<ImportApi>,
    pub collection_api: Arc<CollectionApi>,
    pub export_api: Arc<ExportApi>,
}

impl AppState {
    /// 打开数据库文件并组装全部组件
    ///
    /// 导出目录取 export.output_dir 配置；会话持久化到 config_kv
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化 AppState");
        let conn = open_shared_connection(&db_path)
            .map_err(|e| format!("无法打开数据库 {}: {}", db_path, e))?;

        let config = Arc::new(ConfigManager::new(conn.clone()));
        let export_dir = config
            .get_export_output_dir()
            .await
            .map_err(|e| format!("无法读取导出目录配置: {}", e))?;
        let file_store: Arc<dyn FileStore> = Arc::new(DirectoryFileStore::new(export_dir));
        let session_store: Arc<dyn SessionStore> =
            Arc::new(SqliteSessionStore::new(config.clone()));

        Ok(Self::assemble(
            db_path,
            conn,
            config,
            file_store,
            None,
            session_store,
        ))
    }

    /// 由已打开的连接组装（测试注入文件存储/分享/会话存储）
    pub fn from_parts(
        conn: SharedConnection,
        file_store: Arc<dyn FileStore>,
        share_target: Option<Arc<dyn ShareTarget>>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        let config = Arc::new(ConfigManager::new(conn.clone()));
        Self::assemble(
            ":memory:".to_string(),
            conn,
            config,
            file_store,
            share_target,
            session_store,
        )
    }

    fn assemble(
        db_path: String,
        conn: SharedConnection,
        config: Arc<ConfigManager>,
        file_store: Arc<dyn FileStore>,
        share_target: Option<Arc<dyn ShareTarget>>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        // ===== 仓储 =====
        let society_repo = Arc::new(SocietyRepository::new(conn.clone()));
        let agent_repo = Arc::new(AgentRepository::new(conn.clone()));
        let account_repo = Arc::new(AccountRepository::new(conn.clone()));
        let collection_repo = Arc::new(CollectionRepository::new(conn.clone()));
        let export_repo = Arc::new(ExportRecordRepository::new(conn.clone()));

        // ===== API =====
        let session_api = Arc::new(SessionApi::new(agent_repo.clone(), session_store));
        let import_api = Arc::new(ImportApi::new(conn.clone(), config.clone()));
        let collection_api = Arc::new(CollectionApi::new(
            account_repo.clone(),
            collection_repo.clone(),
            config.clone(),
        ));
        let export_api = Arc::new(ExportApi::new(
            collection_repo,
            account_repo,
            export_repo,
            config.clone(),
            file_store,
            share_target,
        ));

        Self {
            db_path,
            conn,
            config,
            society_repo,
            agent_repo,
            session_api,
            import_api,
            collection_api,
            export_api,
        }
    }
}

/// 默认数据库路径
///
/// 优先级: IAMC_DB_PATH 环境变量 > 用户数据目录/iamc-collect/iamc_collect.db > ./iamc_collect.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./iamc_collect.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("iamc-collect");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("iamc_collect.db");
        }
    }
    path.to_string_lossy().to_string()
}
