// ==========================================
// 分批导出生成器测试（内存替身）
// ==========================================
// 测试目标: 每批次一个文件 / 按批次标记 / 单文件才分享 / 空待导出
// ==========================================

mod test_helpers;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use iamc_collect::domain::entities::{Agent, ExportCollectionRow, Society};
use iamc_collect::domain::types::{AccountType, ExportFormat, Frequency};
use iamc_collect::export::{parse_export_file_name, ExportGenerator, ExportRequest, FileStore};
use std::sync::Arc;
use test_helpers::{FailingShareTarget, FakeExportStore, MemoryFileStore, RecordingShareTarget};

fn request(format: ExportFormat) -> ExportRequest {
    ExportRequest {
        society: Society {
            id: "soc-1".to_string(),
            code: "SRIBAN".to_string(),
            name: "SRI BANASHANKARI CO-OP SOCIETY".to_string(),
        },
        agent: Agent {
            id: "agent-1".to_string(),
            society_id: "soc-1".to_string(),
            code: "12".to_string(),
            name: "RAVI".to_string(),
            phone: None,
            pin_hash: String::new(),
            is_active: true,
        },
        format,
    }
}

fn exported_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, 10, 15, 0).unwrap()
}

fn row(
    id: &str,
    account_no: &str,
    head: (&str, &str),
    account_type: AccountType,
    frequency: Frequency,
    paise: i64,
) -> ExportCollectionRow {
    ExportCollectionRow {
        collection_id: id.to_string(),
        account_id: format!("acc-{}", id),
        account_no: account_no.to_string(),
        client_name: "ASHA".to_string(),
        account_head: Some(head.0.to_string()),
        account_head_code: Some(head.1.to_string()),
        account_type,
        frequency,
        collected_paise: paise,
        collected_at: exported_at(),
        collection_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
        remarks: None,
    }
}

fn pigmy(id: &str, account_no: &str, paise: i64) -> ExportCollectionRow {
    row(
        id,
        account_no,
        ("DAILY PIGMY ACCOUNT", "007"),
        AccountType::Pigmy,
        Frequency::Daily,
        paise,
    )
}

fn loan(id: &str, account_no: &str, paise: i64) -> ExportCollectionRow {
    row(
        id,
        account_no,
        ("MONTHLY LOAN", "021"),
        AccountType::Loan,
        Frequency::Monthly,
        paise,
    )
}

#[tokio::test]
async fn test_two_lots_produce_two_files_without_share() {
    let store = FakeExportStore::with_pending(vec![
        pigmy("c1", "1001", 5000),
        loan("c2", "1001", 90000),
        pigmy("c3", "1002", 2500),
    ]);
    let files = Arc::new(MemoryFileStore::default());
    let share = Arc::new(RecordingShareTarget::default());
    let generator = ExportGenerator::new(store, files.clone(), Some(share.clone()));

    let outcome = generator
        .export_pending_at(&request(ExportFormat::Txt), exported_at())
        .await
        .unwrap()
        .expect("pending rows exported");

    assert_eq!(outcome.files.len(), 2);
    assert!(!outcome.shared);
    assert_eq!(share.call_count(), 0);
    assert_eq!(outcome.collections_count(), 3);

    let names = files.file_names();
    assert_eq!(
        names,
        vec![
            "IAMC_SRIBAN_12_007_PIGMY_DAILY_20260309_101500Z.txt".to_string(),
            "IAMC_SRIBAN_12_021_LOAN_MONTHLY_20260309_101500Z.txt".to_string(),
        ]
    );
    for name in &names {
        let parsed = parse_export_file_name(name).expect("name parses");
        assert_eq!(parsed.exported_at(), exported_at());
        assert!(parsed.belongs_to("SRIBAN", "12"));
    }

    let pigmy_file = &outcome.files[0];
    assert_eq!(pigmy_file.lot_key, "007_PIGMY_DAILY");
    assert_eq!(pigmy_file.collection_ids, vec!["c1".to_string(), "c3".to_string()]);
    assert_eq!(pigmy_file.total_paise, 7500);

    let marks = generator.store().mark_calls();
    assert_eq!(marks.len(), 2);
    assert_eq!(marks[0], vec!["c1".to_string(), "c3".to_string()]);
    assert_eq!(marks[1], vec!["c2".to_string()]);

    let records = generator.store().records.lock().unwrap().clone();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.exported_at == exported_at()));
    assert_eq!(records[0].collections_count, 2);
    assert_eq!(
        records[0].file_uri.as_deref(),
        Some("memory://IAMC_SRIBAN_12_007_PIGMY_DAILY_20260309_101500Z.txt")
    );
}

#[tokio::test]
async fn test_single_lot_is_shared() {
    let store = FakeExportStore::with_pending(vec![pigmy("c1", "1001", 5000)]);
    let files = Arc::new(MemoryFileStore::default());
    let share = Arc::new(RecordingShareTarget::default());
    let generator = ExportGenerator::new(store, files.clone(), Some(share.clone()));

    let outcome = generator
        .export_pending_at(&request(ExportFormat::Xlsx), exported_at())
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.shared);
    assert_eq!(share.call_count(), 1);
    let (uri, mime) = share.calls.lock().unwrap()[0].clone();
    assert_eq!(uri, outcome.files[0].file_uri);
    assert!(mime.contains("spreadsheetml"));

    let bytes = files.read_file(&outcome.files[0].file_name).await.unwrap();
    assert!(bytes.starts_with(b"PK"), "xlsx is a zip container");
}

#[tokio::test]
async fn test_share_failure_keeps_export() {
    let store = FakeExportStore::with_pending(vec![pigmy("c1", "1001", 5000)]);
    let files = Arc::new(MemoryFileStore::default());
    let share = Arc::new(FailingShareTarget::default());
    let generator = ExportGenerator::new(store, files.clone(), Some(share.clone()));

    let outcome = generator
        .export_pending_at(&request(ExportFormat::Txt), exported_at())
        .await
        .unwrap()
        .expect("export succeeds despite share failure");

    assert!(!outcome.shared);
    assert_eq!(*share.attempts.lock().unwrap(), 1);
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(files.file_names().len(), 1);
    assert_eq!(generator.store().mark_calls(), vec![vec!["c1".to_string()]]);
    assert_eq!(generator.store().records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_single_lot_without_share_target() {
    let store = FakeExportStore::with_pending(vec![pigmy("c1", "1001", 5000)]);
    let generator = ExportGenerator::new(store, Arc::new(MemoryFileStore::default()), None);

    let outcome = generator
        .export_pending_at(&request(ExportFormat::Txt), exported_at())
        .await
        .unwrap()
        .unwrap();
    assert!(!outcome.shared);
    assert_eq!(outcome.files.len(), 1);
}

#[tokio::test]
async fn test_nothing_pending_returns_none() {
    let files = Arc::new(MemoryFileStore::default());
    let share = Arc::new(RecordingShareTarget::default());
    let generator = ExportGenerator::new(
        FakeExportStore::default(),
        files.clone(),
        Some(share.clone()),
    );

    let outcome = generator
        .export_pending_at(&request(ExportFormat::Txt), exported_at())
        .await
        .unwrap();
    assert!(outcome.is_none());
    assert!(files.file_names().is_empty());
    assert!(generator.store().mark_calls().is_empty());
    assert_eq!(share.call_count(), 0);
}

#[tokio::test]
async fn test_txt_contents_follow_header_and_columns() {
    let store = FakeExportStore::with_pending(vec![pigmy("c1", "1001", 5050)]);
    let files = Arc::new(MemoryFileStore::default());
    let generator = ExportGenerator::new(store, files.clone(), None);

    let outcome = generator
        .export_pending_at(&request(ExportFormat::Txt), exported_at())
        .await
        .unwrap()
        .unwrap();
    let bytes = files.read_file(&outcome.files[0].file_name).await.unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "SRI BANASHANKARI CO-OP SOCIETY");
    assert_eq!(lines[1], "Agent: 12 - RAVI");
    assert_eq!(lines[2], "Exported At: 2026-03-09T10:15:00.000Z");
    assert_eq!(lines[3], "Lot: DAILY PIGMY ACCOUNT (007)");
    assert_eq!(lines[4], "Records: 1");
    assert_eq!(lines[5], "");
    assert!(lines[6].starts_with("Account No\tClient Name\tAccount Head"));

    let cells: Vec<&str> = lines[7].split('\t').collect();
    assert_eq!(cells.len(), 10);
    assert_eq!(cells[0], "1001");
    assert_eq!(cells[4], "PIGMY");
    assert_eq!(cells[5], "DAILY");
    assert_eq!(cells[6], "50.50");
    assert_eq!(cells[8], "2026-03-09");
}
