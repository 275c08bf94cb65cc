// ==========================================
// 合作社收款台账 - 导出层
// ==========================================
// 职责: 导出前校验、按批次生成导出文件、标记已导出
// 流程: validator → generator(writer + file_name + file_store) → ExportStore
// ==========================================

pub mod error;
pub mod file_name;
pub mod file_store;
pub mod generator;
pub mod validator;
pub mod writer;

pub use error::{CrossLotConflict, ExportError, ExportResult, ExportValidationError};
pub use file_name::{build_export_file_name, parse_export_file_name, ExportFileName};
pub use file_store::{DirectoryFileStore, FileStore, ShareTarget};
pub use generator::{
    group_by_lot, ExportFileResult, ExportGenerator, ExportOutcome, ExportRequest, LotGroup,
};
pub use validator::{normalize_client_name, validate_pending_collections_for_export};
pub use writer::{build_export_document, encode_document, mime_type, ExportDocument, ExportLine};
