// ==========================================
// 合作社收款台账 - 报表解析结果模型
// ==========================================
// 文本报表与表格报表解析器输出同一结构
// ==========================================

use crate::domain::lot::{lot_key_from_parts, Lot};
use crate::domain::types::{AccountType, Frequency};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 报表中的一行账户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedAccount {
    pub account_no: String,
    pub client_name: String,
    pub account_head: Option<String>,
    pub account_head_code: Option<String>,
    pub account_type: AccountType,
    pub frequency: Frequency,
    pub installment_rupees: f64,
    pub balance_rupees: f64,
}

impl ParsedAccount {
    pub fn lot_key(&self) -> String {
        lot_key_from_parts(
            self.account_head_code.as_deref(),
            self.account_type,
            self.frequency,
        )
    }

    pub fn lot(&self) -> Lot {
        Lot::new(
            self.account_head_code.as_deref(),
            self.account_type,
            self.frequency,
        )
    }
}

/// 标准化后的代理人报表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReport {
    pub society_name: String,
    pub society_code: String,
    pub agent_name: String,
    pub agent_code: String,
    pub report_date: Option<NaiveDate>,
    pub accounts: Vec<ParsedAccount>,
}

impl ParsedReport {
    /// 报表中出现的所有批次（按首次出现顺序去重）
    pub fn distinct_lots(&self) -> Vec<Lot> {
        let mut lots: Vec<Lot> = Vec::new();
        for account in &self.accounts {
            let lot = account.lot();
            if !lots.contains(&lot) {
                lots.push(lot);
            }
        }
        lots
    }

    /// 报表日期 ISO 形式
    pub fn report_date_iso(&self) -> Option<String> {
        self.report_date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}
