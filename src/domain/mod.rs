// ==========================================
// 合作社收款台账 - 领域层
// ==========================================
// 职责: 实体、枚举、金额/日期工具、批次键模型
// 红线: 不依赖数据库与文件系统
// ==========================================

pub mod entities;
pub mod lot;
pub mod money;
pub mod report;
pub mod types;

// 重导出核心类型
pub use entities::{
    Account, Agent, CollectionEntry, CollectionTotals, ExportCollectionRow, ExportRecord, Society,
};
pub use lot::{lot_key_from_parts, lot_label, sanitize_file_code, Lot, LotSummary};
pub use report::{ParsedAccount, ParsedReport};
pub use types::{AccountStatus, AccountType, CollectionStatus, ExportFormat, Frequency};
