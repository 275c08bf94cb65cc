// ==========================================
// 合作社收款台账 - 导出模块错误类型
// ==========================================
// ExportValidationError: 导出前一致性校验失败（整批中止,不写任何文件）
// ExportError: 导出流程错误（校验 / 编码 / 文件 / 数据库）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 跨批次冲突预览上限: 账号数
pub const CONFLICT_PREVIEW_ACCOUNTS: usize = 3;
/// 跨批次冲突预览上限: 每个账号的 (批次, 姓名) 对数
pub const CONFLICT_PREVIEW_ENTRIES: usize = 3;

/// 同一账号在不同批次下的客户姓名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossLotConflict {
    pub account_no: String,
    /// (批次标签, 客户姓名)
    pub entries: Vec<(String, String)>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportValidationError {
    #[error(
        "Account {account_no} in lot {lot_label} has multiple client names ({}). Re-import the agent report before exporting.",
        .names.join(" / ")
    )]
    SameLot {
        account_no: String,
        lot_label: String,
        names: Vec<String>,
    },

    #[error("{}", describe_cross_lot(.conflicts))]
    CrossLot { conflicts: Vec<CrossLotConflict> },
}

fn describe_cross_lot(conflicts: &[CrossLotConflict]) -> String {
    let preview: Vec<String> = conflicts
        .iter()
        .take(CONFLICT_PREVIEW_ACCOUNTS)
        .map(|conflict| {
            let pairs: Vec<String> = conflict
                .entries
                .iter()
                .take(CONFLICT_PREVIEW_ENTRIES)
                .map(|(lot, name)| format!("{}: {}", lot, name))
                .collect();
            format!("{} [{}]", conflict.account_no, pairs.join("; "))
        })
        .collect();

    let mut message = format!(
        "Account numbers map to different clients across account types: {}",
        preview.join(", ")
    );
    if conflicts.len() > CONFLICT_PREVIEW_ACCOUNTS {
        message.push_str(&format!(
            " and {} more",
            conflicts.len() - CONFLICT_PREVIEW_ACCOUNTS
        ));
    }
    message.push_str(". Re-import the agent reports before exporting.");
    message
}

/// 导出模块错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ExportValidationError),

    #[error("文件写入失败: {0}")]
    FileWriteError(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 生成失败: {0}")]
    XlsxError(String),

    #[error("文本生成失败: {0}")]
    TextEncodeError(String),

    #[error("分享失败: {0}")]
    ShareError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::FileWriteError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::XlsxError(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::TextEncodeError(err.to_string())
    }
}

/// Result 类型别名
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(no: &str, n: usize) -> CrossLotConflict {
        CrossLotConflict {
            account_no: no.to_string(),
            entries: (0..n)
                .map(|i| (format!("LOT{}", i), format!("NAME{}", i)))
                .collect(),
        }
    }

    #[test]
    fn test_cross_lot_message_is_bounded() {
        let err = ExportValidationError::CrossLot {
            conflicts: vec![
                conflict("1", 4),
                conflict("2", 2),
                conflict("3", 2),
                conflict("4", 2),
                conflict("5", 2),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("different clients across account types"));
        assert!(message.contains("1 [LOT0: NAME0; LOT1: NAME1; LOT2: NAME2]"));
        assert!(!message.contains("LOT3"));
        assert!(!message.contains("4 ["));
        assert!(message.contains("and 2 more"));
    }

    #[test]
    fn test_same_lot_message() {
        let err = ExportValidationError::SameLot {
            account_no: "1001".to_string(),
            lot_label: "LOAN (021)".to_string(),
            names: vec!["A".to_string(), "B".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("1001"));
        assert!(message.contains("LOAN (021)"));
        assert!(message.contains("has multiple client names"));
    }
}
