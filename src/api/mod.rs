// ==========================================
// 合作社收款台账 - API 层
// ==========================================
// 职责: 面向调用方（CLI / 上层界面）的业务接口,组装各组件
// ==========================================

pub mod collection_api;
pub mod error;
pub mod export_api;
pub mod import_api;
pub mod session_api;

// 重导出核心类型
pub use collection_api::{AccountOverview, CollectionApi};
pub use error::{ApiError, ApiResult};
pub use export_api::{ExportApi, ExportSummary};
pub use import_api::ImportApi;
pub use session_api::{
    AgentSession, MemorySessionStore, SessionApi, SessionStore, SqliteSessionStore,
};
