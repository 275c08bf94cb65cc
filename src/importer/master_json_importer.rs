// ==========================================
// 合作社收款台账 - 主数据 JSON 导入器
// ==========================================
// 格式: schemaVersion = 1
// 结构校验失败（版本/合作社字段/无代理人）在写库前中止
// 单行数据不合规时归一化或跳过,不会中止整批导入
// ==========================================

use crate::credential::hash_pin;
use crate::db::SharedConnection;
use crate::domain::money::{parse_amount, parse_flexible_date, rupees_to_paise};
use crate::domain::types::{AccountStatus, AccountType, Frequency};
use crate::importer::error::{ImportError, ImportResult, SchemaError};
use crate::repository::account_repo::{AccountRepository, AccountUpsert};
use crate::repository::agent_repo::{AgentRepository, AgentUpsert};
use crate::repository::error::RepositoryError;
use crate::repository::society_repo::SocietyRepository;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};

/// 支持的 schemaVersion
pub const SUPPORTED_SCHEMA_VERSION: i64 = 1;

// ==========================================
// JSON 载荷结构
// ==========================================
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterDataPayload {
    pub schema_version: Option<Value>,
    pub society: Option<SocietyPayload>,
    #[serde(default)]
    pub agents: Vec<AgentPayload>,
    #[serde(default)]
    pub accounts: Vec<AccountPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocietyPayload {
    pub code: Option<Value>,
    pub name: Option<Value>,
}

// 行级字段统一按 Value 接收,类型不符时归一化为缺省值而不是整批失败
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPayload {
    pub code: Option<Value>,
    pub name: Option<Value>,
    pub phone: Option<Value>,
    pub pin: Option<Value>,
    pub pin_hash: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    pub account_no: Option<Value>,
    pub client_name: Option<Value>,
    pub agent_code: Option<Value>,
    pub account_type: Option<Value>,
    pub frequency: Option<Value>,
    pub account_head: Option<Value>,
    pub account_head_code: Option<Value>,
    pub installment_paise: Option<Value>,
    pub installment_rupees: Option<Value>,
    pub installment_amount: Option<Value>,
    pub balance_paise: Option<Value>,
    pub balance_rupees: Option<Value>,
    pub balance: Option<Value>,
    // 日期: 各组按声明顺序取第一个可解析的值
    pub last_txn_at: Option<Value>,
    pub last_txn_date: Option<Value>,
    pub last_tr_date: Option<Value>,
    pub opened_at: Option<Value>,
    pub opening_date: Option<Value>,
    pub closes_at: Option<Value>,
    pub closing_date: Option<Value>,
    pub status: Option<Value>,
}

/// JSON 值 → 文本（数字账号 / 代码按原样转为字符串）
fn value_to_text(value: &Option<Value>) -> Option<String> {
    let text = match value.as_ref()? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn value_to_f64(value: &Option<Value>) -> Option<f64> {
    match value.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// 金额优先级: paise → rupees → amount（按卢比）
fn resolve_paise(paise: &Option<Value>, rupees: &Option<Value>, amount: &Option<Value>) -> i64 {
    if let Some(p) = value_to_f64(paise) {
        return p.round() as i64;
    }
    value_to_f64(rupees)
        .or_else(|| value_to_f64(amount))
        .map(rupees_to_paise)
        .unwrap_or(0)
}

/// 按优先级取第一个可解析的日期
fn first_date(candidates: &[&Option<Value>]) -> Option<NaiveDate> {
    candidates
        .iter()
        .filter_map(|value| value_to_text(value))
        .find_map(|text| parse_flexible_date(&text))
}

impl AccountPayload {
    pub fn last_txn_date(&self) -> Option<NaiveDate> {
        first_date(&[&self.last_txn_at, &self.last_txn_date, &self.last_tr_date])
    }

    pub fn opened_date(&self) -> Option<NaiveDate> {
        first_date(&[&self.opened_at, &self.opening_date])
    }

    pub fn closes_date(&self) -> Option<NaiveDate> {
        first_date(&[&self.closes_at, &self.closing_date])
    }

    pub fn installment_paise(&self) -> i64 {
        resolve_paise(
            &self.installment_paise,
            &self.installment_rupees,
            &self.installment_amount,
        )
    }

    pub fn balance_paise(&self) -> i64 {
        resolve_paise(&self.balance_paise, &self.balance_rupees, &self.balance)
    }
}

/// 结构校验后的载荷
#[derive(Debug, Clone)]
pub struct ValidatedPayload {
    pub society_code: String,
    pub society_name: String,
    pub agents: Vec<AgentPayload>,
    pub accounts: Vec<AccountPayload>,
}

/// 解析并校验 JSON 文本（不触库）
pub fn parse_master_json(text: &str) -> Result<ValidatedPayload, SchemaError> {
    let payload: MasterDataPayload =
        serde_json::from_str(text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

    match payload.schema_version.as_ref() {
        None | Some(Value::Null) => return Err(SchemaError::MissingVersion),
        Some(version) => {
            let numeric = match version {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            if numeric != Some(SUPPORTED_SCHEMA_VERSION) {
                return Err(SchemaError::UnsupportedVersion(version.to_string()));
            }
        }
    }

    let society = payload
        .society
        .ok_or_else(|| SchemaError::MissingField("society".to_string()))?;
    let society_code = value_to_text(&society.code)
        .ok_or_else(|| SchemaError::MissingField("society.code".to_string()))?;
    let society_name = value_to_text(&society.name)
        .ok_or_else(|| SchemaError::MissingField("society.name".to_string()))?;

    let has_agent = payload.agents.iter().any(|a| value_to_text(&a.code).is_some());
    if !payload.accounts.is_empty() && !has_agent {
        return Err(SchemaError::NoAgents);
    }

    Ok(ValidatedPayload {
        society_code,
        society_name,
        agents: payload.agents,
        accounts: payload.accounts,
    })
}

/// 主数据导入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterImportSummary {
    pub society_code: String,
    pub society_name: String,
    pub agents_upserted: usize,
    pub accounts_upserted: usize,
    /// 缺少账号或代理人无法匹配而跳过的账户行
    pub accounts_skipped: usize,
}

// ==========================================
// MasterJsonImporter
// ==========================================
pub struct MasterJsonImporter {
    conn: SharedConnection,
    default_pin_hash: String,
}

impl MasterJsonImporter {
    pub fn new(conn: SharedConnection, default_pin_hash: impl Into<String>) -> Self {
        Self {
            conn,
            default_pin_hash: default_pin_hash.into(),
        }
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn import_file(&self, path: &Path) -> ImportResult<MasterImportSummary> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        self.import_str(&text).await
    }

    #[instrument(skip(self, text))]
    pub async fn import_str(&self, text: &str) -> ImportResult<MasterImportSummary> {
        let payload = parse_master_json(text)?;
        info!(
            society = %payload.society_code,
            agents = payload.agents.len(),
            accounts = payload.accounts.len(),
            "开始导入主数据"
        );
        let summary = self.import_payload(&payload)?;
        info!(
            agents_upserted = summary.agents_upserted,
            accounts_upserted = summary.accounts_upserted,
            accounts_skipped = summary.accounts_skipped,
            "主数据导入完成"
        );
        Ok(summary)
    }

    fn import_payload(&self, payload: &ValidatedPayload) -> ImportResult<MasterImportSummary> {
        let now = Utc::now();
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;

        let society =
            SocietyRepository::upsert_tx(&tx, &payload.society_code, &payload.society_name, now)?;

        // 代理人: code → id（首个代理人为账户缺省归属）
        let mut agent_ids: HashMap<String, String> = HashMap::new();
        let mut first_agent_id: Option<String> = None;
        for agent in &payload.agents {
            let Some(code) = value_to_text(&agent.code) else {
                warn!("代理人缺少 code,已跳过");
                continue;
            };
            let pin_hash = match (value_to_text(&agent.pin_hash), value_to_text(&agent.pin)) {
                (Some(hash), _) => Some(hash),
                (None, Some(pin)) => Some(hash_pin(&pin)),
                (None, None) => None,
            };
            let input = AgentUpsert {
                name: value_to_text(&agent.name).unwrap_or_else(|| code.clone()),
                code: code.clone(),
                phone: value_to_text(&agent.phone),
                pin_hash,
            };
            let (saved, _) =
                AgentRepository::upsert_tx(&tx, &society.id, &input, &self.default_pin_hash, now)?;
            if first_agent_id.is_none() {
                first_agent_id = Some(saved.id.clone());
            }
            agent_ids.insert(code, saved.id);
        }

        let mut accounts_upserted = 0;
        let mut accounts_skipped = 0;
        for account in &payload.accounts {
            let Some(account_no) = value_to_text(&account.account_no) else {
                accounts_skipped += 1;
                continue;
            };
            let agent_id = match value_to_text(&account.agent_code) {
                Some(code) => agent_ids.get(&code).cloned(),
                None => first_agent_id.clone(),
            };
            let Some(agent_id) = agent_id else {
                warn!(account_no = %account_no, "账户的代理人未定义,已跳过");
                accounts_skipped += 1;
                continue;
            };

            let input = AccountUpsert {
                society_id: society.id.clone(),
                agent_id,
                client_name: value_to_text(&account.client_name).unwrap_or_default(),
                account_no,
                account_type: AccountType::from_str(
                    &value_to_text(&account.account_type).unwrap_or_default(),
                ),
                frequency: Frequency::from_str(&value_to_text(&account.frequency).unwrap_or_default()),
                account_head: value_to_text(&account.account_head),
                account_head_code: value_to_text(&account.account_head_code),
                installment_paise: account.installment_paise(),
                balance_paise: account.balance_paise(),
                last_txn_at: account.last_txn_date(),
                opened_at: account.opened_date(),
                closes_at: account.closes_date(),
                status: value_to_text(&account.status).map(|s| AccountStatus::from_str(&s)),
            };
            AccountRepository::upsert_tx(&tx, &input, now)?;
            accounts_upserted += 1;
        }

        tx.commit()?;

        Ok(MasterImportSummary {
            society_code: society.code,
            society_name: society.name,
            agents_upserted: agent_ids.len(),
            accounts_upserted,
            accounts_skipped,
        })
    }
}
