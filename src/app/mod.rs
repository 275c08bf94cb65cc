// ==========================================
// 合作社收款台账 - 应用层
// ==========================================
// 职责: 组装连接句柄与各 API,供 CLI 入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
