// ==========================================
// 合作社收款台账 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化；多行写入一律单事务
// ==========================================

pub mod account_repo;
pub mod agent_repo;
pub mod collection_repo;
pub mod error;
pub mod export_repo;
pub mod export_store;
pub mod row_mapping;
pub mod society_repo;

// 重导出核心仓储
pub use account_repo::{AccountRepository, AccountUpsert, ClearSummary};
pub use agent_repo::{AgentRepository, AgentUpsert, AuthOutcome};
pub use collection_repo::CollectionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use export_repo::ExportRecordRepository;
pub use export_store::ExportStore;
pub use society_repo::SocietyRepository;
