// ==========================================
// 合作社收款台账 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 代理人外勤收款台账
//   报表导入（文本/表格/JSON）→ 收款登记 → 按批次导出并清理
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体、类型、批次键
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 报表解析与导入
pub mod importer;

// 导出层 - 校验与分批导出
pub mod export;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// PIN 摘要
pub mod credential;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AccountStatus, AccountType, CollectionStatus, ExportFormat, Frequency};

// 领域实体
pub use domain::{
    lot_key_from_parts, lot_label, Account, Agent, CollectionEntry, ExportCollectionRow,
    ExportRecord, Lot, LotSummary, ParsedAccount, ParsedReport, Society,
};

// 导入
pub use importer::{load_report, parse_report_text, ImportOptions, ImportSummary};

// 导出
pub use export::{validate_pending_collections_for_export, ExportGenerator, ExportOutcome};

// API
pub use api::{ApiError, ApiResult, CollectionApi, ExportApi, ImportApi, SessionApi};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "合作社收款台账";
