// ==========================================
// 合作社收款台账 - 代理人会话 API
// ==========================================
// 职责: 登录（合作社代码可省略）/ 当前会话 / 登出
// 会话以 JSON 存入 SessionStore（load/save/clear 键值接口）
// 实现者: MemorySessionStore（进程内）, SqliteSessionStore（config_kv, scope=session）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::entities::{Agent, Society};
use crate::repository::agent_repo::{AgentRepository, AuthOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 会话在存储中的键
pub const SESSION_KEY: &str = "agent_session";

/// config_kv 中会话使用的 scope
pub const SESSION_SCOPE: &str = "session";

/// 已登录代理人会话
///
/// 会话中的代理人不携带 PIN 摘要,内存与存储中均为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSession {
    pub society: Society,
    pub agent: Agent,
    pub logged_in_at: DateTime<Utc>,
}

impl AgentSession {
    pub fn new(society: Society, agent: Agent, logged_in_at: DateTime<Utc>) -> Self {
        Self {
            society,
            agent: without_pin_hash(agent),
            logged_in_at,
        }
    }
}

fn without_pin_hash(agent: Agent) -> Agent {
    Agent {
        pin_hash: String::new(),
        ..agent
    }
}

// ==========================================
// SessionStore Trait
// ==========================================
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> RepositoryResult<Option<String>>;

    async fn save(&self, key: &str, value: &str) -> RepositoryResult<()>;

    async fn clear(&self, key: &str) -> RepositoryResult<()>;
}

/// 进程内会话存储（测试与一次性 CLI 调用）
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> RepositoryResult<std::sync::MutexGuard<HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> RepositoryResult<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> RepositoryResult<()> {
        self.values()?.remove(key);
        Ok(())
    }
}

/// 持久会话存储: config_kv 表的 session scope
pub struct SqliteSessionStore {
    config: Arc<ConfigManager>,
}

impl SqliteSessionStore {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.config.get_scoped_value(SESSION_SCOPE, key)
    }

    async fn save(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.config.set_scoped_value(SESSION_SCOPE, key, value)
    }

    async fn clear(&self, key: &str) -> RepositoryResult<()> {
        self.config.delete_scoped_value(SESSION_SCOPE, key)?;
        Ok(())
    }
}

// ==========================================
// SessionApi
// ==========================================
pub struct SessionApi {
    agent_repo: Arc<AgentRepository>,
    store: Arc<dyn SessionStore>,
}

impl SessionApi {
    pub fn new(agent_repo: Arc<AgentRepository>, store: Arc<dyn SessionStore>) -> Self {
        Self { agent_repo, store }
    }

    /// 登录并保存会话
    ///
    /// # 参数
    /// - society_code: 可为空；为空时代理人代码 + PIN 必须在所有合作社中唯一匹配
    ///
    /// # 返回
    /// - Err(InvalidCredentials): 无匹配或 PIN 错误
    /// - Err(AmbiguousAgent): 多个合作社匹配
    #[instrument(skip(self, pin))]
    pub async fn login(
        &self,
        society_code: Option<&str>,
        agent_code: &str,
        pin: &str,
    ) -> ApiResult<AgentSession> {
        let outcome = self
            .agent_repo
            .authenticate_agent(society_code, agent_code, pin)?;

        let session = match outcome {
            AuthOutcome::Authenticated { society, agent } => {
                AgentSession::new(society, agent, Utc::now())
            }
            AuthOutcome::InvalidCredentials => return Err(ApiError::InvalidCredentials),
            AuthOutcome::Ambiguous { candidates } => {
                return Err(ApiError::AmbiguousAgent {
                    agent_code: agent_code.trim().to_string(),
                    candidates,
                })
            }
        };

        let json = serde_json::to_string(&session)
            .map_err(|e| ApiError::InternalError(format!("会话序列化失败: {}", e)))?;
        self.store.save(SESSION_KEY, &json).await?;

        info!(
            society_code = %session.society.code,
            agent_code = %session.agent.code,
            "代理人已登录"
        );
        Ok(session)
    }

    /// 当前会话
    ///
    /// 代理人已被删除或停用时清除会话并返回 None；
    /// 存储内容无法解析时同样视为未登录
    pub async fn current_session(&self) -> ApiResult<Option<AgentSession>> {
        let raw = match self.store.load(SESSION_KEY).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let mut session: AgentSession = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "会话内容无法解析,已清除");
                self.store.clear(SESSION_KEY).await?;
                return Ok(None);
            }
        };

        match self.agent_repo.find_by_id(&session.agent.id)? {
            Some(agent) if agent.is_active => {
                session.agent = without_pin_hash(agent);
                Ok(Some(session))
            }
            _ => {
                warn!(agent_id = %session.agent.id, "会话代理人不存在或已停用,已清除");
                self.store.clear(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    /// 当前会话（未登录时报错）
    pub async fn require_session(&self) -> ApiResult<AgentSession> {
        self.current_session()
            .await?
            .ok_or(ApiError::NotAuthenticated)
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.store.clear(SESSION_KEY).await?;
        info!("代理人已登出");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::hash_pin;
    use crate::db::open_in_memory;
    use crate::repository::agent_repo::AgentUpsert;
    use crate::repository::society_repo::SocietyRepository;

    fn seed_agent(conn: &crate::db::SharedConnection, society_code: &str, agent_code: &str) {
        let guard = conn.lock().unwrap();
        let now = Utc::now();
        let society = SocietyRepository::upsert_tx(&guard, society_code, society_code, now).unwrap();
        AgentRepository::upsert_tx(
            &guard,
            &society.id,
            &AgentUpsert {
                code: agent_code.to_string(),
                name: format!("Agent {}", agent_code),
                phone: None,
                pin_hash: None,
            },
            &hash_pin("1234"),
            now,
        )
        .unwrap();
    }

    fn api(conn: crate::db::SharedConnection, store: Arc<dyn SessionStore>) -> SessionApi {
        SessionApi::new(Arc::new(AgentRepository::new(conn)), store)
    }

    #[tokio::test]
    async fn test_login_then_current_session() {
        let conn = open_in_memory().unwrap();
        seed_agent(&conn, "SRIBAN", "12");
        let api = api(conn, Arc::new(MemorySessionStore::new()));

        assert!(api.current_session().await.unwrap().is_none());

        let session = api.login(None, "12", "1234").await.unwrap();
        assert_eq!(session.society.code, "SRIBAN");

        let current = api.current_session().await.unwrap().unwrap();
        assert_eq!(current.agent.id, session.agent.id);

        api.logout().await.unwrap();
        assert!(matches!(
            api.require_session().await,
            Err(ApiError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_pin() {
        let conn = open_in_memory().unwrap();
        seed_agent(&conn, "SRIBAN", "12");
        let api = api(conn, Arc::new(MemorySessionStore::new()));

        let err = api.login(Some("SRIBAN"), "12", "0000").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_ambiguous_without_society() {
        let conn = open_in_memory().unwrap();
        seed_agent(&conn, "SRIBAN", "12");
        seed_agent(&conn, "KAVERI", "12");
        let api = api(conn, Arc::new(MemorySessionStore::new()));

        let err = api.login(Some(" "), "12", "1234").await.unwrap_err();
        assert!(matches!(err, ApiError::AmbiguousAgent { candidates: 2, .. }));

        let session = api.login(Some("kaveri"), "12", "1234").await.unwrap();
        assert_eq!(session.society.code, "KAVERI");
    }

    #[tokio::test]
    async fn test_sqlite_store_persists_session() {
        let conn = open_in_memory().unwrap();
        seed_agent(&conn, "SRIBAN", "12");
        let config = Arc::new(ConfigManager::new(conn.clone()));

        let first = api(conn.clone(), Arc::new(SqliteSessionStore::new(config.clone())));
        first.login(None, "12", "1234").await.unwrap();

        let second = api(conn, Arc::new(SqliteSessionStore::new(config)));
        let session = second.current_session().await.unwrap().unwrap();
        assert_eq!(session.agent.code, "12");
        assert!(session.agent.pin_hash.is_empty());
    }

    #[tokio::test]
    async fn test_session_never_holds_pin_hash() {
        let conn = open_in_memory().unwrap();
        seed_agent(&conn, "SRIBAN", "12");
        let store = Arc::new(MemorySessionStore::new());
        let api = api(conn, store.clone());

        let session = api.login(Some("SRIBAN"), "12", "1234").await.unwrap();
        assert!(session.agent.pin_hash.is_empty());

        let stored = store.load(SESSION_KEY).await.unwrap().unwrap();
        assert!(!stored.contains("pin_hash"));
        assert!(!stored.contains(&hash_pin("1234")));

        let current = api.current_session().await.unwrap().unwrap();
        assert!(current.agent.pin_hash.is_empty());
        assert_eq!(current.agent.name, "Agent 12");
    }

    #[tokio::test]
    async fn test_corrupt_session_is_cleared() {
        let conn = open_in_memory().unwrap();
        let store = Arc::new(MemorySessionStore::new());
        store.save(SESSION_KEY, "{not json").await.unwrap();
        let api = api(conn, store.clone());

        assert!(api.current_session().await.unwrap().is_none());
        assert!(store.load(SESSION_KEY).await.unwrap().is_none());
    }
}
