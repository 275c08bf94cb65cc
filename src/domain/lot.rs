// ==========================================
// 合作社收款台账 - 批次键模型 (Lot Key Model)
// ==========================================
// Lot = (科目代码, 账户类型, 缴款频率)
// 存储隔离 / 导出分组 / 导出校验 统一使用本模块,禁止各处自行拼接
// ==========================================

use crate::domain::types::{AccountType, Frequency};
use serde::{Deserialize, Serialize};

/// 文件名中 lot 代码为空时的兜底值
pub const DEFAULT_LOT_FILE_CODE: &str = "LOT";

/// 由 (科目代码, 账户类型, 频率) 派生批次键
///
/// - 科目代码 trim 后非空: `"{code}_{type}_{freq}"`
/// - 否则: `"{type}_{freq}"`
pub fn lot_key_from_parts(
    head_code: Option<&str>,
    account_type: AccountType,
    frequency: Frequency,
) -> String {
    match normalize_head_code(head_code) {
        Some(code) => format!("{}_{}_{}", code, account_type, frequency),
        None => format!("{}_{}", account_type, frequency),
    }
}

/// 可读批次标签: 科目名（缺省用账户类型）+ 可选 "(代码)"
pub fn lot_label(
    account_head: Option<&str>,
    account_type: AccountType,
    head_code: Option<&str>,
) -> String {
    let head = account_head
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| account_type.to_string());

    match normalize_head_code(head_code) {
        Some(code) => format!("{} ({})", head, code),
        None => head,
    }
}

/// 科目代码标准化: trim,空白视为无
pub fn normalize_head_code(head_code: Option<&str>) -> Option<&str> {
    head_code.map(str::trim).filter(|c| !c.is_empty())
}

/// 文件名安全的代码: 大写,非字母数字连续段折叠为单个下划线,去首尾下划线
pub fn sanitize_file_code(value: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_uppercase());
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}

/// 批次（派生分组,不落库）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lot {
    pub account_head_code: Option<String>,
    pub account_type: AccountType,
    pub frequency: Frequency,
}

impl Lot {
    pub fn new(head_code: Option<&str>, account_type: AccountType, frequency: Frequency) -> Self {
        Self {
            account_head_code: normalize_head_code(head_code).map(str::to_string),
            account_type,
            frequency,
        }
    }

    pub fn key(&self) -> String {
        lot_key_from_parts(self.account_head_code.as_deref(), self.account_type, self.frequency)
    }

    /// 导出文件名中的 lot 代码
    pub fn file_code(&self) -> String {
        sanitize_file_code(&self.key(), DEFAULT_LOT_FILE_CODE)
    }

    pub fn label(&self, account_head: Option<&str>) -> String {
        lot_label(account_head, self.account_type, self.account_head_code.as_deref())
    }
}

/// 批次汇总（listAccountLots 的返回行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotSummary {
    pub lot_key: String,
    pub account_head: Option<String>,
    pub account_head_code: Option<String>,
    pub account_type: AccountType,
    pub frequency: Frequency,
    pub account_count: i64,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_key_without_head_code() {
        assert_eq!(
            lot_key_from_parts(None, AccountType::Loan, Frequency::Monthly),
            "LOAN_MONTHLY"
        );
        assert_eq!(
            lot_key_from_parts(Some("   "), AccountType::Savings, Frequency::Weekly),
            "SAVINGS_WEEKLY"
        );
    }

    #[test]
    fn test_lot_key_trims_head_code() {
        assert_eq!(
            lot_key_from_parts(Some(" 007 "), AccountType::Pigmy, Frequency::Daily),
            "007_PIGMY_DAILY"
        );
    }

    #[test]
    fn test_lot_label() {
        assert_eq!(
            lot_label(Some("DAILY PIGMY ACCOUNT"), AccountType::Pigmy, Some("007")),
            "DAILY PIGMY ACCOUNT (007)"
        );
        assert_eq!(lot_label(None, AccountType::Loan, None), "LOAN");
        assert_eq!(lot_label(Some("  "), AccountType::Loan, Some("21")), "LOAN (21)");
    }

    #[test]
    fn test_sanitize_file_code() {
        assert_eq!(sanitize_file_code("007_PIGMY_DAILY", "LOT"), "007_PIGMY_DAILY");
        assert_eq!(sanitize_file_code("  gold loan / 21 ", "LOT"), "GOLD_LOAN_21");
        assert_eq!(sanitize_file_code("__a--b__", "LOT"), "A_B");
        assert_eq!(sanitize_file_code("***", "LOT"), "LOT");
    }

    #[test]
    fn test_lot_struct_matches_free_function() {
        let lot = Lot::new(Some(" 021 "), AccountType::Loan, Frequency::Monthly);
        assert_eq!(lot.key(), "021_LOAN_MONTHLY");
        assert_eq!(lot.file_code(), "021_LOAN_MONTHLY");
        assert_eq!(lot.account_head_code.as_deref(), Some("021"));
    }
}
