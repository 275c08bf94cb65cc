// ==========================================
// 合作社收款台账 - 账户仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 唯一约束: (society_id, agent_id, account_no, lot_key)
// lot_key 只由 lot_key_from_parts 派生,调用方不可单独指定
// ==========================================

use crate::db::SharedConnection;
use crate::domain::entities::Account;
use crate::domain::lot::{lot_key_from_parts, lot_label, normalize_head_code, Lot, LotSummary};
use crate::domain::money::{to_iso_date, to_iso_timestamp};
use crate::domain::types::{AccountStatus, AccountType, Frequency};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{map_account, ACCOUNT_COLUMNS};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// lot 范围谓词（?1 society, ?2 agent, ?3 lot_key, ?4 type, ?5 freq, ?6 head_code）
///
/// head_code 为 NULL 时只匹配库中科目代码为空/NULL 的行,不会匹配带真实代码的批次
const LOT_SCOPE_PREDICATE: &str = r#"
    society_id = ?1 AND agent_id = ?2 AND lot_key = ?3
    AND account_type = ?4 AND frequency = ?5
    AND (
        (?6 IS NULL AND (account_head_code IS NULL OR TRIM(account_head_code) = ''))
        OR TRIM(account_head_code) = ?6
    )
"#;

/// 账户写入输入（导入器使用）
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpsert {
    pub society_id: String,
    pub agent_id: String,
    pub account_no: String,
    pub client_name: String,
    pub account_type: AccountType,
    pub frequency: Frequency,
    pub account_head: Option<String>,
    pub account_head_code: Option<String>,
    pub installment_paise: i64,
    pub balance_paise: i64,
    pub last_txn_at: Option<NaiveDate>,
    pub opened_at: Option<NaiveDate>,
    pub closes_at: Option<NaiveDate>,
    /// None = 新建为 ACTIVE,更新时保持原状态
    pub status: Option<AccountStatus>,
}

impl AccountUpsert {
    pub fn lot_key(&self) -> String {
        lot_key_from_parts(
            self.account_head_code.as_deref(),
            self.account_type,
            self.frequency,
        )
    }
}

/// lot 范围删除统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClearSummary {
    pub collections_deleted: usize,
    pub accounts_deleted: usize,
}

impl ClearSummary {
    fn add(&mut self, other: ClearSummary) {
        self.collections_deleted += other.collections_deleted;
        self.accounts_deleted += other.accounts_deleted;
    }
}

// ==========================================
// AccountRepository - 账户仓储
// ==========================================
pub struct AccountRepository {
    conn: SharedConnection,
}

impl AccountRepository {
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
    pub fn find_by_id(&self, account_id: &str) -> RepositoryResult<Option<Account>> {
        let conn = self.get_conn()?;
        let account = conn
            .query_row(
                &format!("SELECT {} FROM account WHERE id = ?1", ACCOUNT_COLUMNS),
                params![account_id],
                map_account,
            )
            .optional()?;
        Ok(account)
    }

    /// 按账号查询代理人名下账户（同一账号可能跨多个批次）
    pub fn find_by_account_no(
        &self,
        agent_id: &str,
        account_no: &str,
    ) -> RepositoryResult<Vec<Account>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM account WHERE agent_id = ?1 AND account_no = ?2 ORDER BY lot_key ASC",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![agent_id, account_no.trim()], map_account)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(accounts)
    }

    /// 代理人名下账户总数
    pub fn get_account_count(&self, agent_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM account WHERE agent_id = ?1",
            params![agent_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 代理人某批次下账户数
    pub fn get_account_count_by_lot(&self, agent_id: &str, lot_key: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM account WHERE agent_id = ?1 AND lot_key = ?2",
            params![agent_id, lot_key],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 列出代理人账户（可按批次过滤）,按账号排序
    pub fn list_accounts(
        &self,
        agent_id: &str,
        lot_key: Option<&str>,
    ) -> RepositoryResult<Vec<Account>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM account
            WHERE agent_id = ?1 AND (?2 IS NULL OR lot_key = ?2)
            ORDER BY account_no ASC, lot_key ASC
            "#,
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![agent_id, lot_key], map_account)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(accounts)
    }

    /// 按账号尾号搜索（仅 ACTIVE,结果数封顶,按账号排序）
    pub fn search_accounts_by_last_digits(
        &self,
        agent_id: &str,
        digits: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<Account>> {
        let suffix: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
        if suffix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM account
            WHERE agent_id = ?1 AND status = 'ACTIVE' AND account_no LIKE '%' || ?2
            ORDER BY account_no ASC, lot_key ASC
            LIMIT ?3
            "#,
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![agent_id, suffix, limit as i64], map_account)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(accounts)
    }

    /// 批次汇总（去重批次 + 账户数）
    pub fn list_account_lots(&self, agent_id: &str) -> RepositoryResult<Vec<LotSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT lot_key, MAX(account_head), account_head_code, account_type, frequency, COUNT(*)
            FROM account
            WHERE agent_id = ?1
            GROUP BY lot_key, account_head_code, account_type, frequency
            ORDER BY lot_key ASC
            "#,
        )?;
        let lots = stmt
            .query_map(params![agent_id], |row| {
                let account_head: Option<String> = row.get(1)?;
                let account_head_code: Option<String> = row.get(2)?;
                let account_type = AccountType::from_str(&row.get::<_, String>(3)?);
                Ok(LotSummary {
                    lot_key: row.get(0)?,
                    label: lot_label(
                        account_head.as_deref(),
                        account_type,
                        account_head_code.as_deref(),
                    ),
                    account_head,
                    account_head_code,
                    account_type,
                    frequency: Frequency::from_str(&row.get::<_, String>(4)?),
                    account_count: row.get(5)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lots)
    }

    /// 导出后按批次清理客户数据（先删收款,再删账户）,单事务
    pub fn clear_client_data_by_lots(
        &self,
        society_id: &str,
        agent_id: &str,
        lots: &[Lot],
    ) -> RepositoryResult<ClearSummary> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut summary = ClearSummary::default();
        for lot in lots {
            summary.add(Self::delete_lot_scope_tx(&tx, society_id, agent_id, lot)?);
        }

        tx.commit()?;
        info!(
            agent_id = %agent_id,
            lots = lots.len(),
            collections_deleted = summary.collections_deleted,
            accounts_deleted = summary.accounts_deleted,
            "按批次清理客户数据完成"
        );
        Ok(summary)
    }

    // ==========================================
    // 事务内操作（供导入器在同一事务中调用）
    // ==========================================

    pub fn find_by_key_tx(
        conn: &Connection,
        society_id: &str,
        agent_id: &str,
        account_no: &str,
        lot_key: &str,
    ) -> RepositoryResult<Option<Account>> {
        let account = conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM account
                    WHERE society_id = ?1 AND agent_id = ?2 AND account_no = ?3 AND lot_key = ?4
                    "#,
                    ACCOUNT_COLUMNS
                ),
                params![society_id, agent_id, account_no, lot_key],
                map_account,
            )
            .optional()?;
        Ok(account)
    }

    /// 按 (society, agent, account_no, lot_key) 写入账户
    ///
    /// # 返回
    /// - (账户ID, 是否新建)
    pub fn upsert_tx(
        conn: &Connection,
        input: &AccountUpsert,
        now: DateTime<Utc>,
    ) -> RepositoryResult<(String, bool)> {
        let account_no = input.account_no.trim();
        let lot_key = input.lot_key();
        let head_code = normalize_head_code(input.account_head_code.as_deref());
        let account_head = input
            .account_head
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());
        let now_str = to_iso_timestamp(now);

        if let Some(existing) =
            Self::find_by_key_tx(conn, &input.society_id, &input.agent_id, account_no, &lot_key)?
        {
            conn.execute(
                r#"
                UPDATE account SET
                    client_name = ?1,
                    account_type = ?2,
                    frequency = ?3,
                    account_head = ?4,
                    account_head_code = ?5,
                    installment_paise = ?6,
                    balance_paise = ?7,
                    last_txn_at = COALESCE(?8, last_txn_at),
                    opened_at = COALESCE(?9, opened_at),
                    closes_at = COALESCE(?10, closes_at),
                    status = COALESCE(?11, status),
                    updated_at = ?12
                WHERE id = ?13
                "#,
                params![
                    input.client_name.trim(),
                    input.account_type.to_db_str(),
                    input.frequency.to_db_str(),
                    account_head,
                    head_code,
                    input.installment_paise,
                    input.balance_paise,
                    input.last_txn_at.map(to_iso_date),
                    input.opened_at.map(to_iso_date),
                    input.closes_at.map(to_iso_date),
                    input.status.map(|s| s.to_db_str()),
                    now_str,
                    existing.id,
                ],
            )?;
            return Ok((existing.id, false));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            r#"
            INSERT INTO account (
                id, society_id, agent_id, account_no, lot_key, client_name,
                account_type, frequency, account_head, account_head_code,
                installment_paise, balance_paise, last_txn_at, opened_at, closes_at,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
            "#,
            params![
                id,
                input.society_id,
                input.agent_id,
                account_no,
                lot_key,
                input.client_name.trim(),
                input.account_type.to_db_str(),
                input.frequency.to_db_str(),
                account_head,
                head_code,
                input.installment_paise,
                input.balance_paise,
                input.last_txn_at.map(to_iso_date),
                input.opened_at.map(to_iso_date),
                input.closes_at.map(to_iso_date),
                input.status.unwrap_or(AccountStatus::Active).to_db_str(),
                now_str,
            ],
        )?;
        Ok((id, true))
    }

    /// 删除某批次范围内的收款与账户
    pub fn delete_lot_scope_tx(
        conn: &Connection,
        society_id: &str,
        agent_id: &str,
        lot: &Lot,
    ) -> RepositoryResult<ClearSummary> {
        let lot_key = lot.key();
        let head_code = normalize_head_code(lot.account_head_code.as_deref());
        let scope_params = params![
            society_id,
            agent_id,
            lot_key,
            lot.account_type.to_db_str(),
            lot.frequency.to_db_str(),
            head_code,
        ];

        let collections_deleted = conn.execute(
            &format!(
                "DELETE FROM collection_entry WHERE account_id IN (SELECT id FROM account WHERE {})",
                LOT_SCOPE_PREDICATE
            ),
            scope_params,
        )?;
        let accounts_deleted = conn.execute(
            &format!("DELETE FROM account WHERE {}", LOT_SCOPE_PREDICATE),
            scope_params,
        )?;

        Ok(ClearSummary {
            collections_deleted,
            accounts_deleted,
        })
    }
}
