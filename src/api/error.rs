// ==========================================
// 合作社收款台账 - API 层错误类型
// ==========================================
// 职责: 把仓储/导入/导出错误转换为调用方可读的错误消息
// 约束: 错误消息必须带显式原因（账号、批次、文件）
// ==========================================

use crate::export::error::{ExportError, ExportValidationError};
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 登录与会话 =====
    #[error("未登录或会话已失效")]
    NotAuthenticated,

    #[error("代理人代码或 PIN 错误")]
    InvalidCredentials,

    /// 未指定合作社且多个合作社存在同码同 PIN 的代理人
    #[error("代理人代码 {agent_code} 在 {candidates} 个合作社中匹配,请指定合作社代码")]
    AmbiguousAgent { agent_code: String, candidates: usize },

    // ===== 业务规则 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ===== 导入 =====
    #[error("导入失败: {0}")]
    ImportError(String),

    // ===== 导出 =====
    /// 导出前校验失败（消息原样透出,含账号与批次）
    #[error("{0}")]
    ExportValidation(ExportValidationError),

    #[error("导出失败: {0}")]
    ExportError(String),

    // ===== 数据访问 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}映射失败: {}", field, message))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(repo_err) => ApiError::from(repo_err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// ==========================================
// 从导出错误转换
// ==========================================
impl From<ExportValidationError> for ApiError {
    fn from(err: ExportValidationError) -> Self {
        ApiError::ExportValidation(err)
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Validation(validation) => ApiError::ExportValidation(validation),
            ExportError::Repository(repo_err) => ApiError::from(repo_err),
            other => ApiError::ExportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ParseError;

    #[test]
    fn test_repository_not_found_message() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "Account".to_string(),
            id: "a1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(err.to_string().contains("a1"));
    }

    #[test]
    fn test_import_repository_error_is_unwrapped() {
        let err: ApiError =
            ImportError::Repository(RepositoryError::LockError("poisoned".to_string())).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(_)));

        let err: ApiError = ImportError::Parse(ParseError::NoAccountRows).into();
        assert!(err.to_string().contains("No account rows found"));
    }

    #[test]
    fn test_export_validation_message_passes_through() {
        let validation = ExportValidationError::SameLot {
            account_no: "1001".to_string(),
            lot_label: "LOAN".to_string(),
            names: vec!["A".to_string(), "B".to_string()],
        };
        let expected = validation.to_string();
        let err: ApiError = ExportError::Validation(validation).into();
        assert!(matches!(err, ApiError::ExportValidation(_)));
        assert_eq!(err.to_string(), expected);
    }
}
