// ==========================================
// 合作社收款台账 - 代理人仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 唯一约束: (society_id, code)
// ==========================================

use crate::credential::verify_pin;
use crate::db::SharedConnection;
use crate::domain::entities::{Agent, Society};
use crate::domain::money::to_iso_timestamp;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{map_agent, AGENT_COLUMNS};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use tracing::{debug, warn};
use uuid::Uuid;

/// 代理人导入/登记的输入
#[derive(Debug, Clone, PartialEq)]
pub struct AgentUpsert {
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    /// 显式给出的 PIN 摘要（None = 新建用默认摘要,更新时保持原值）
    pub pin_hash: Option<String>,
}

/// 登录结果
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// 唯一匹配且 PIN 正确
    Authenticated { society: Society, agent: Agent },
    /// 无匹配 / PIN 错误 / 已停用
    InvalidCredentials,
    /// 未指定合作社且多个合作社下存在同 code 同 PIN 的代理人
    Ambiguous { candidates: usize },
}

// ==========================================
// AgentRepository - 代理人仓储
// ==========================================
pub struct AgentRepository {
    conn: SharedConnection,
}

impl AgentRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按主键查询
    pub fn find_by_id(&self, agent_id: &str) -> RepositoryResult<Option<Agent>> {
        let conn = self.get_conn()?;
        let agent = conn
            .query_row(
                &format!("SELECT {} FROM agent WHERE id = ?1", AGENT_COLUMNS),
                params![agent_id],
                map_agent,
            )
            .optional()?;
        Ok(agent)
    }

    /// 按 (society_id, code) 查询
    pub fn find_by_code(&self, society_id: &str, code: &str) -> RepositoryResult<Option<Agent>> {
        let conn = self.get_conn()?;
        Self::find_by_code_tx(&conn, society_id, code)
    }

    /// 查询合作社下全部代理人
    pub fn list_by_society(&self, society_id: &str) -> RepositoryResult<Vec<Agent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent WHERE society_id = ?1 ORDER BY code ASC",
            AGENT_COLUMNS
        ))?;
        let agents = stmt
            .query_map(params![society_id], map_agent)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(agents)
    }

    /// 修改 PIN 摘要
    pub fn set_pin_hash(&self, agent_id: &str, pin_hash: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE agent SET pin_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![pin_hash, to_iso_timestamp(Utc::now()), agent_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Agent".to_string(),
                id: agent_id.to_string(),
            });
        }
        Ok(())
    }

    /// 代理人登录
    ///
    /// # 规则
    /// - society_code 非空: 在该合作社内按 code 精确查找,校验 PIN
    /// - society_code 为空: 在所有合作社的启用代理人中查找 code + PIN 匹配者,
    ///   恰好一个时成功,多个时返回 Ambiguous（不静默挑选）
    pub fn authenticate_agent(
        &self,
        society_code: Option<&str>,
        agent_code: &str,
        pin: &str,
    ) -> RepositoryResult<AuthOutcome> {
        let conn = self.get_conn()?;
        let agent_code = agent_code.trim();
        if agent_code.is_empty() {
            return Ok(AuthOutcome::InvalidCredentials);
        }

        let society_code = society_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());

        let mut stmt = conn.prepare(
            r#"
            SELECT
                a.id, a.society_id, a.code, a.name, a.phone, a.pin_hash, a.is_active,
                s.id, s.code, s.name
            FROM agent a
            JOIN society s ON s.id = a.society_id
            WHERE UPPER(a.code) = UPPER(?1)
              AND a.is_active = 1
              AND (?2 IS NULL OR s.code = ?2)
            ORDER BY s.code ASC
            "#,
        )?;

        let candidates = stmt
            .query_map(params![agent_code, society_code], |row| {
                let agent = map_agent(row)?;
                let society = Society {
                    id: row.get(7)?,
                    code: row.get(8)?,
                    name: row.get(9)?,
                };
                Ok((society, agent))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut matched: Vec<(Society, Agent)> = candidates
            .into_iter()
            .filter(|(_, agent)| verify_pin(pin, &agent.pin_hash))
            .collect();

        match matched.len() {
            0 => {
                debug!(agent_code = %agent_code, "登录失败: 无匹配代理人或 PIN 错误");
                Ok(AuthOutcome::InvalidCredentials)
            }
            1 => {
                let (society, agent) = matched.remove(0);
                Ok(AuthOutcome::Authenticated { society, agent })
            }
            n => {
                warn!(agent_code = %agent_code, candidates = n, "登录失败: 多个合作社匹配,需指定合作社代码");
                Ok(AuthOutcome::Ambiguous { candidates: n })
            }
        }
    }

    // ==========================================
    // 事务内操作（供导入器在同一事务中调用）
    // ==========================================

    pub fn find_by_code_tx(
        conn: &Connection,
        society_id: &str,
        code: &str,
    ) -> RepositoryResult<Option<Agent>> {
        let agent = conn
            .query_row(
                &format!(
                    "SELECT {} FROM agent WHERE society_id = ?1 AND code = ?2",
                    AGENT_COLUMNS
                ),
                params![society_id, code.trim()],
                map_agent,
            )
            .optional()?;
        Ok(agent)
    }

    /// 按 (society_id, code) 解析或创建代理人
    ///
    /// - 新建: PIN 摘要取 input.pin_hash,否则取 default_pin_hash
    /// - 更新: 刷新姓名/电话,强制启用；PIN 摘要仅在显式给出时覆盖
    ///
    /// # 返回
    /// - (Agent, 是否新建)
    pub fn upsert_tx(
        conn: &Connection,
        society_id: &str,
        input: &AgentUpsert,
        default_pin_hash: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<(Agent, bool)> {
        let code = input.code.trim().to_string();
        let name = input.name.trim().to_string();
        let phone = input
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let now_str = to_iso_timestamp(now);

        if let Some(existing) = Self::find_by_code_tx(conn, society_id, &code)? {
            let pin_hash = input
                .pin_hash
                .clone()
                .unwrap_or_else(|| existing.pin_hash.clone());
            conn.execute(
                r#"
                UPDATE agent
                SET name = ?1, phone = COALESCE(?2, phone), pin_hash = ?3, is_active = 1, updated_at = ?4
                WHERE id = ?5
                "#,
                params![name, phone, pin_hash, now_str, existing.id],
            )?;
            let agent = Agent {
                name,
                phone: phone.or(existing.phone.clone()),
                pin_hash,
                is_active: true,
                ..existing
            };
            return Ok((agent, false));
        }

        let agent = Agent {
            id: Uuid::new_v4().to_string(),
            society_id: society_id.to_string(),
            code,
            name,
            phone,
            pin_hash: input
                .pin_hash
                .clone()
                .unwrap_or_else(|| default_pin_hash.to_string()),
            is_active: true,
        };
        conn.execute(
            r#"
            INSERT INTO agent (id, society_id, code, name, phone, pin_hash, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
            "#,
            params![
                agent.id,
                agent.society_id,
                agent.code,
                agent.name,
                agent.phone,
                agent.pin_hash,
                now_str
            ],
        )?;
        Ok((agent, true))
    }
}
