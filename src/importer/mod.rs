// ==========================================
// 合作社收款台账 - 导入层
// ==========================================
// 职责: 外部数据导入,生成内部数据
// 支持: 定宽文本报表 / Excel / ODS / CSV 报表 / 主数据 JSON
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod master_json_importer;
pub mod report_heuristics;
pub mod report_importer;
pub mod report_importer_trait;
pub mod sheet_report_parser;
pub mod text_report_parser;

// 重导出核心类型
pub use error::{ImportError, ImportResult, ParseError, SchemaError};
pub use file_parser::{load_report, ReportFileKind, ReportFileReader};
pub use master_json_importer::{parse_master_json, MasterImportSummary, MasterJsonImporter};
pub use report_importer::ReportImporterImpl;
pub use sheet_report_parser::{parse_report_sheet, parse_report_workbook, SheetData};
pub use text_report_parser::parse_report_text;

// 重导出 Trait 接口
pub use report_importer_trait::{ImportOptions, ImportSummary, ReportImporter};
