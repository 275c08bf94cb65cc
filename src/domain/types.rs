// ==========================================
// 合作社收款台账 - 领域类型定义
// ==========================================
// 账户类型 / 缴款频率 / 账户状态 / 收款状态 / 导出格式
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 账户类型 (Account Type)
// ==========================================
// 未识别的输入一律归为 SAVINGS,不阻断导入
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Pigmy,   // 日存款
    Loan,    // 贷款
    Savings, // 储蓄/定期
}

impl AccountType {
    /// 从数据库/主数据字符串解析（宽松,默认 SAVINGS）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PIGMY" | "PIGMI" => AccountType::Pigmy,
            "LOAN" => AccountType::Loan,
            _ => AccountType::Savings,
        }
    }

    /// 从账户科目名称推断类型
    ///
    /// 子串匹配: PIGMY/PIGMI → PIGMY, LOAN → LOAN, RECURRING/DEPOSIT → SAVINGS
    pub fn infer_from_head(head: &str) -> Self {
        let upper = head.to_uppercase();
        if upper.contains("PIGMY") || upper.contains("PIGMI") {
            AccountType::Pigmy
        } else if upper.contains("LOAN") {
            AccountType::Loan
        } else {
            AccountType::Savings
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AccountType::Pigmy => "PIGMY",
            AccountType::Loan => "LOAN",
            AccountType::Savings => "SAVINGS",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 缴款频率 (Frequency)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// 宽松解析,默认 MONTHLY
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            _ => Frequency::Monthly,
        }
    }

    /// 从账户科目名称推断频率（子串匹配,默认 MONTHLY）
    pub fn infer_from_head(head: &str) -> Self {
        let upper = head.to_uppercase();
        if upper.contains("DAILY") {
            Frequency::Daily
        } else if upper.contains("WEEKLY") {
            Frequency::Weekly
        } else {
            Frequency::Monthly
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 账户状态 (Account Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CLOSED" => AccountStatus::Closed,
            _ => AccountStatus::Active,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 收款状态 (Collection Status)
// ==========================================
// 状态迁移: PENDING → EXPORTED（仅导出流程）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Pending,
    Exported,
}

impl CollectionStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "EXPORTED" => CollectionStatus::Exported,
            _ => CollectionStatus::Pending,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CollectionStatus::Pending => "PENDING",
            CollectionStatus::Exported => "EXPORTED",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 导出格式 (Export Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportFormat {
    Xlsx, // Excel 工作簿
    Txt,  // 制表符分隔文本
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "TXT" | "TEXT" | "TSV" => ExportFormat::Txt,
            _ => ExportFormat::Xlsx,
        }
    }

    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "XLSX",
            ExportFormat::Txt => "TXT",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_inference() {
        assert_eq!(AccountType::infer_from_head("DAILY PIGMY ACCOUNT"), AccountType::Pigmy);
        assert_eq!(AccountType::infer_from_head("Pigmi Deposit"), AccountType::Pigmy);
        assert_eq!(AccountType::infer_from_head("GOLD LOAN"), AccountType::Loan);
        assert_eq!(AccountType::infer_from_head("RECURRING DEPOSIT"), AccountType::Savings);
        assert_eq!(AccountType::infer_from_head("MISC"), AccountType::Savings);
    }

    #[test]
    fn test_frequency_inference() {
        assert_eq!(Frequency::infer_from_head("DAILY PIGMY"), Frequency::Daily);
        assert_eq!(Frequency::infer_from_head("weekly loan"), Frequency::Weekly);
        assert_eq!(Frequency::infer_from_head("RD 12 MONTHS"), Frequency::Monthly);
    }

    #[test]
    fn test_lenient_parsing_defaults() {
        assert_eq!(AccountType::from_str("fixed"), AccountType::Savings);
        assert_eq!(Frequency::from_str("yearly"), Frequency::Monthly);
        assert_eq!(AccountStatus::from_str("dormant"), AccountStatus::Active);
        assert_eq!(CollectionStatus::from_str("exported"), CollectionStatus::Exported);
        assert_eq!(ExportFormat::from_str("txt"), ExportFormat::Txt);
        assert_eq!(ExportFormat::from_str(""), ExportFormat::Xlsx);
    }
}
