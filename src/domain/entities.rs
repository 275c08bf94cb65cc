// ==========================================
// 合作社收款台账 - 领域实体
// ==========================================
// Society → Agent → Account → CollectionEntry
// ExportRecord: 每写出一个导出文件追加一行（只追加）
// ==========================================

use crate::domain::lot::{lot_key_from_parts, lot_label};
use crate::domain::types::{AccountStatus, AccountType, CollectionStatus, Frequency};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Society - 合作社（租户根）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Society {
    pub id: String,
    pub code: String, // 唯一,大写
    pub name: String,
}

// ==========================================
// Agent - 收款代理人
// ==========================================
// 唯一约束: (society_id, code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub society_id: String,
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub pin_hash: String,
    pub is_active: bool,
}

// ==========================================
// Account - 客户账户
// ==========================================
// 唯一约束: (society_id, agent_id, account_no, lot_key)
// lot_key 只能由 lot_key_from_parts 派生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub society_id: String,
    pub agent_id: String,
    pub account_no: String,
    pub lot_key: String,
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
    pub status: AccountStatus,
}

impl Account {
    /// 按当前批次字段重新计算的 lot_key
    pub fn derived_lot_key(&self) -> String {
        lot_key_from_parts(
            self.account_head_code.as_deref(),
            self.account_type,
            self.frequency,
        )
    }

    pub fn lot_label(&self) -> String {
        lot_label(
            self.account_head.as_deref(),
            self.account_type,
            self.account_head_code.as_deref(),
        )
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

// ==========================================
// CollectionEntry - 收款记录
// ==========================================
// 唯一约束: (agent_id, account_id, collection_date)
// 同日重复收款覆盖金额/备注/时间,不新增
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: String,
    pub society_id: String,
    pub agent_id: String,
    pub account_id: String,
    pub account_no: String,
    pub collected_paise: i64,
    pub collected_at: DateTime<Utc>,
    pub collection_date: NaiveDate,
    pub status: CollectionStatus,
    pub exported_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

// ==========================================
// ExportRecord - 导出审计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub id: String,
    pub society_id: String,
    pub agent_id: String,
    pub exported_at: DateTime<Utc>,
    pub file_uri: Option<String>,
    pub collections_count: i64,
}

// ==========================================
// ExportCollectionRow - 待导出收款（收款 JOIN 账户）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportCollectionRow {
    pub collection_id: String,
    pub account_id: String,
    pub account_no: String,
    pub client_name: String,
    pub account_head: Option<String>,
    pub account_head_code: Option<String>,
    pub account_type: AccountType,
    pub frequency: Frequency,
    pub collected_paise: i64,
    pub collected_at: DateTime<Utc>,
    pub collection_date: NaiveDate,
    pub remarks: Option<String>,
}

impl ExportCollectionRow {
    pub fn lot_key(&self) -> String {
        lot_key_from_parts(
            self.account_head_code.as_deref(),
            self.account_type,
            self.frequency,
        )
    }

    pub fn lot_label(&self) -> String {
        lot_label(
            self.account_head.as_deref(),
            self.account_type,
            self.account_head_code.as_deref(),
        )
    }
}

/// 某日收款汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionTotals {
    pub count: i64,
    pub total_paise: i64,
}
