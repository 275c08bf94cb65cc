// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、报表构造、导出相关的内存替身
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use iamc_collect::api::{AgentSession, MemorySessionStore};
use iamc_collect::app::AppState;
use iamc_collect::db::{open_shared_connection, SharedConnection};
use iamc_collect::domain::entities::{ExportCollectionRow, ExportRecord};
use iamc_collect::domain::report::{ParsedAccount, ParsedReport};
use iamc_collect::domain::types::{AccountType, Frequency};
use iamc_collect::export::error::{ExportError, ExportResult};
use iamc_collect::export::file_store::{DirectoryFileStore, FileStore, ShareTarget};
use iamc_collect::importer::report_heuristics::derive_society_code;
use iamc_collect::repository::error::RepositoryResult;
use iamc_collect::repository::export_store::ExportStore;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库（文件库,已建表）
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - SharedConnection: 共享连接
pub fn create_test_db() -> (NamedTempFile, SharedConnection) {
    let temp_file = NamedTempFile::new().expect("temp db file");
    let db_path = temp_file.path().to_str().expect("utf-8 path").to_string();
    let conn = open_shared_connection(&db_path).expect("open test db");
    (temp_file, conn)
}

/// 组装测试用 AppState: 文件库 + 临时导出目录 + 内存会话
pub struct TestApp {
    pub state: AppState,
    pub export_dir: TempDir,
    _db_file: NamedTempFile,
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_share(None)
}

pub fn create_test_app_with_share(share_target: Option<Arc<dyn ShareTarget>>) -> TestApp {
    let (db_file, conn) = create_test_db();
    let export_dir = TempDir::new().expect("export dir");
    let state = AppState::from_parts(
        conn,
        Arc::new(DirectoryFileStore::new(export_dir.path())),
        share_target,
        Arc::new(MemorySessionStore::new()),
    );
    TestApp {
        state,
        export_dir,
        _db_file: db_file,
    }
}

// ==========================================
// 报表构造
// ==========================================

pub fn parsed_account(
    account_no: &str,
    client_name: &str,
    head: Option<(&str, &str)>,
    account_type: AccountType,
    frequency: Frequency,
    installment_rupees: f64,
    balance_rupees: f64,
) -> ParsedAccount {
    ParsedAccount {
        account_no: account_no.to_string(),
        client_name: client_name.to_string(),
        account_head: head.map(|(name, _)| name.to_string()),
        account_head_code: head.map(|(_, code)| code.to_string()),
        account_type,
        frequency,
        installment_rupees,
        balance_rupees,
    }
}

/// 日缴 PIGMY 批次账户（科目 007）
pub fn pigmy_account(account_no: &str, client_name: &str, rupees: f64) -> ParsedAccount {
    parsed_account(
        account_no,
        client_name,
        Some(("DAILY PIGMY ACCOUNT", "007")),
        AccountType::Pigmy,
        Frequency::Daily,
        rupees,
        rupees,
    )
}

/// 月缴 LOAN 批次账户（科目 021）
pub fn loan_account(account_no: &str, client_name: &str, rupees: f64) -> ParsedAccount {
    parsed_account(
        account_no,
        client_name,
        Some(("MONTHLY LOAN", "021")),
        AccountType::Loan,
        Frequency::Monthly,
        rupees,
        rupees * 10.0,
    )
}

pub fn parsed_report(
    society_name: &str,
    agent_code: &str,
    agent_name: &str,
    accounts: Vec<ParsedAccount>,
) -> ParsedReport {
    ParsedReport {
        society_name: society_name.to_string(),
        society_code: derive_society_code(society_name),
        agent_name: agent_name.to_string(),
        agent_code: agent_code.to_string(),
        report_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 9),
        accounts,
    }
}

/// 导入并登录（默认 PIN 1234）
pub async fn import_and_login(state: &AppState, report: &ParsedReport) -> AgentSession {
    state
        .import_api
        .import_parsed_report(report, Some(false))
        .await
        .expect("import report");
    state
        .session_api
        .login(Some(&report.society_code), &report.agent_code, "1234")
        .await
        .expect("login")
}

// ==========================================
// 内存替身
// ==========================================

/// 内存 ExportStore: 记录每次 mark_exported 的 id 列表
#[derive(Default)]
pub struct FakeExportStore {
    pub pending: Mutex<Vec<ExportCollectionRow>>,
    pub marked: Mutex<Vec<Vec<String>>>,
    pub records: Mutex<Vec<ExportRecord>>,
}

impl FakeExportStore {
    pub fn with_pending(rows: Vec<ExportCollectionRow>) -> Self {
        Self {
            pending: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn mark_calls(&self) -> Vec<Vec<String>> {
        self.marked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExportStore for FakeExportStore {
    async fn list_pending_collections(
        &self,
        _agent_id: &str,
    ) -> RepositoryResult<Vec<ExportCollectionRow>> {
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn mark_exported(
        &self,
        collection_ids: &[String],
        record: &ExportRecord,
    ) -> RepositoryResult<usize> {
        self.marked.lock().unwrap().push(collection_ids.to_vec());
        self.records.lock().unwrap().push(record.clone());
        self.pending
            .lock()
            .unwrap()
            .retain(|row| !collection_ids.contains(&row.collection_id));
        Ok(collection_ids.len())
    }
}

/// 内存 FileStore
#[derive(Default)]
pub struct MemoryFileStore {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn write_file(&self, file_name: &str, bytes: &[u8]) -> ExportResult<String> {
        self.files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), bytes.to_vec());
        Ok(format!("memory://{}", file_name))
    }

    async fn read_file(&self, file_name: &str) -> ExportResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(file_name)
            .cloned()
            .ok_or_else(|| ExportError::FileReadError(file_name.to_string()))
    }

    async fn delete_file(&self, file_name: &str) -> ExportResult<()> {
        self.files.lock().unwrap().remove(file_name);
        Ok(())
    }

    async fn list_files(&self) -> ExportResult<Vec<String>> {
        Ok(self.file_names())
    }
}

/// 记录分享调用的 ShareTarget
#[derive(Default)]
pub struct RecordingShareTarget {
    pub calls: Mutex<Vec<(String, String)>>,
}

impl RecordingShareTarget {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ShareTarget for RecordingShareTarget {
    async fn share(&self, file_uri: &str, mime_type: &str) -> ExportResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((file_uri.to_string(), mime_type.to_string()));
        Ok(())
    }
}

/// 始终失败的 ShareTarget（模拟分享面板被取消）
#[derive(Default)]
pub struct FailingShareTarget {
    pub attempts: Mutex<usize>,
}

#[async_trait]
impl ShareTarget for FailingShareTarget {
    async fn share(&self, _file_uri: &str, _mime_type: &str) -> ExportResult<()> {
        *self.attempts.lock().unwrap() += 1;
        Err(ExportError::ShareError("share sheet dismissed".to_string()))
    }
}
