// ==========================================
// 合作社收款台账 - 收款 API
// ==========================================
// 职责: 账户浏览/尾号检索/批次汇总/登记收款/今日汇总
// 约束: 所有查询均限定在会话代理人名下
// 收款不改动账户余额（余额只来自重新导入）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::session_api::AgentSession;
use crate::config::{AppConfigReader, ConfigManager};
use crate::domain::entities::{Account, CollectionEntry, CollectionTotals, ExportCollectionRow};
use crate::domain::lot::LotSummary;
use crate::domain::money::{rupees_to_paise, today};
use crate::repository::account_repo::AccountRepository;
use crate::repository::collection_repo::CollectionRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// 单笔收款金额上限（卢比）
pub const MAX_COLLECTION_RUPEES: f64 = 10_000_000.0;

/// 账户概览（首页计数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOverview {
    pub account_count: i64,
    pub lots: Vec<LotSummary>,
    pub today: CollectionTotals,
}

pub struct CollectionApi {
    account_repo: Arc<AccountRepository>,
    collection_repo: Arc<CollectionRepository>,
    config: Arc<ConfigManager>,
}

impl CollectionApi {
    pub fn new(
        account_repo: Arc<AccountRepository>,
        collection_repo: Arc<CollectionRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            account_repo,
            collection_repo,
            config,
        }
    }

    // ==========================================
    // 账户查询
    // ==========================================

    /// 代理人账户列表（可按批次过滤）
    pub fn list_accounts(
        &self,
        session: &AgentSession,
        lot_key: Option<&str>,
    ) -> ApiResult<Vec<Account>> {
        let lot_key = lot_key.map(str::trim).filter(|k| !k.is_empty());
        Ok(self.account_repo.list_accounts(&session.agent.id, lot_key)?)
    }

    /// 批次汇总
    pub fn list_lots(&self, session: &AgentSession) -> ApiResult<Vec<LotSummary>> {
        Ok(self.account_repo.list_account_lots(&session.agent.id)?)
    }

    /// 账户总数 / 指定批次账户数
    pub fn account_count(&self, session: &AgentSession, lot_key: Option<&str>) -> ApiResult<i64> {
        let count = match lot_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(lot_key) => self
                .account_repo
                .get_account_count_by_lot(&session.agent.id, lot_key)?,
            None => self.account_repo.get_account_count(&session.agent.id)?,
        };
        Ok(count)
    }

    /// 按账号尾号检索（上限取 search.max_results）
    pub async fn search(&self, session: &AgentSession, digits: &str) -> ApiResult<Vec<Account>> {
        let limit = self.config.get_search_max_results().await?;
        Ok(self
            .account_repo
            .search_accounts_by_last_digits(&session.agent.id, digits, limit)?)
    }

    /// 按账号查找（同账号跨批次时需给出 lot_key）
    pub fn find_account_by_no(
        &self,
        session: &AgentSession,
        account_no: &str,
        lot_key: Option<&str>,
    ) -> ApiResult<Account> {
        let mut matches = self
            .account_repo
            .find_by_account_no(&session.agent.id, account_no)?;
        if let Some(lot_key) = lot_key.map(str::trim).filter(|k| !k.is_empty()) {
            matches.retain(|a| a.lot_key == lot_key);
        }

        match matches.len() {
            0 => Err(ApiError::NotFound(format!("账号 {}", account_no.trim()))),
            1 => Ok(matches.remove(0)),
            _ => {
                let lots: Vec<String> = matches.iter().map(|a| a.lot_key.clone()).collect();
                Err(ApiError::InvalidInput(format!(
                    "账号 {} 存在于多个批次 ({}),请指定批次",
                    account_no.trim(),
                    lots.join(", ")
                )))
            }
        }
    }

    // ==========================================
    // 收款
    // ==========================================

    /// 登记今日收款
    ///
    /// # 规则
    /// - 金额必须为正且不超过 MAX_COLLECTION_RUPEES
    /// - 账户必须属于会话代理人且为 ACTIVE
    /// - 同一账户同日再次登记时覆盖金额/备注
    #[instrument(skip(self, session, remarks), fields(agent = %session.agent.code))]
    pub fn collect(
        &self,
        session: &AgentSession,
        account_id: &str,
        amount_rupees: f64,
        remarks: Option<&str>,
    ) -> ApiResult<CollectionEntry> {
        if !amount_rupees.is_finite() || amount_rupees <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "收款金额必须大于 0: {}",
                amount_rupees
            )));
        }
        if amount_rupees > MAX_COLLECTION_RUPEES {
            return Err(ApiError::InvalidInput(format!(
                "收款金额超过上限 {}: {}",
                MAX_COLLECTION_RUPEES, amount_rupees
            )));
        }
        let collected_paise = rupees_to_paise(amount_rupees);
        if collected_paise <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "收款金额不足 1 paise: {}",
                amount_rupees
            )));
        }

        let account = self
            .account_repo
            .find_by_id(account_id)?
            .filter(|a| a.agent_id == session.agent.id && a.society_id == session.society.id)
            .ok_or_else(|| ApiError::NotFound(format!("账户 {}", account_id)))?;
        if !account.is_active() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "账户 {} 已关闭,不能收款",
                account.account_no
            )));
        }

        let entry = self
            .collection_repo
            .upsert_collection_for_today(&account, collected_paise, remarks)?;
        info!(
            account_no = %entry.account_no,
            lot_key = %account.lot_key,
            collected_paise,
            "收款已登记"
        );
        Ok(entry)
    }

    // ==========================================
    // 收款查询
    // ==========================================

    /// 今日收款汇总
    pub fn today_summary(&self, session: &AgentSession) -> ApiResult<CollectionTotals> {
        Ok(self
            .collection_repo
            .get_collection_totals_for_date(&session.agent.id, today())?)
    }

    /// 今日收款明细
    pub fn list_today_collections(&self, session: &AgentSession) -> ApiResult<Vec<CollectionEntry>> {
        Ok(self
            .collection_repo
            .list_collections_for_date(&session.agent.id, today())?)
    }

    /// 待导出收款
    pub fn list_pending(&self, session: &AgentSession) -> ApiResult<Vec<ExportCollectionRow>> {
        Ok(self
            .collection_repo
            .list_pending_collections(&session.agent.id)?)
    }

    /// 首页概览
    pub fn overview(&self, session: &AgentSession) -> ApiResult<AccountOverview> {
        Ok(AccountOverview {
            account_count: self.account_repo.get_account_count(&session.agent.id)?,
            lots: self.account_repo.list_account_lots(&session.agent.id)?,
            today: self.today_summary(session)?,
        })
    }
}
