// ==========================================
// 合作社收款台账 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ParseError: 报表解析失败（不返回部分结果）
// SchemaError: 主数据 JSON 结构错误（写库前中止）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 报表解析错误（文本/表格解析器）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Society name not found")]
    SocietyNameNotFound,

    #[error("Agent name/code not found")]
    AgentNotFound,

    #[error("No account rows found")]
    NoAccountRows,

    #[error("Account table header row (Ac No) not found")]
    HeaderRowNotFound,

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Worksheet '{0}' is empty")]
    EmptyWorksheet(String),
}

/// 主数据 JSON 结构错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unsupported schemaVersion: {0} (expected 1)")]
    UnsupportedVersion(String),

    #[error("Missing schemaVersion")]
    MissingVersion,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Accounts present but no agents defined")]
    NoAgents,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .txt/.prn/.lst/.xlsx/.xlsm/.xls/.ods/.csv/.json）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 内容错误 =====
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
