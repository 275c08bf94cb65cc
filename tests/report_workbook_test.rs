// ==========================================
// 表格报表读取测试
// ==========================================
// 使用 rust_xlsxwriter 生成工作簿,经 load_report / ImportApi 读回
// ==========================================

mod test_helpers;

use iamc_collect::domain::types::{AccountType, Frequency};
use iamc_collect::importer::{load_report, ImportError};
use iamc_collect::logging;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_helpers::create_test_app;

/// 生成带 "Abstract" 汇总表的报表工作簿
fn write_report_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("pigmy_report.xlsx");
    let mut workbook = Workbook::new();

    let abstract_sheet = workbook.add_worksheet();
    abstract_sheet.set_name("Abstract").unwrap();
    abstract_sheet.write_string(0, 0, "Summary only").unwrap();
    abstract_sheet.write_number(1, 0, 2.0).unwrap();

    let data = workbook.add_worksheet();
    data.set_name("Report").unwrap();
    data.write_string(0, 0, "Pigmy Collection List").unwrap();
    data.write_string(1, 0, "SRI BANASHANKARI CO-OP SOCIETY").unwrap();
    data.write_string(1, 1, "09/03/2026").unwrap();
    data.write_string(3, 0, "Account Head:").unwrap();
    data.write_string(3, 1, "007").unwrap();
    data.write_string(3, 2, "DAILY PIGMY ACCOUNT").unwrap();
    data.write_string(4, 0, "Agent Ac No:").unwrap();
    data.write_number(4, 1, 12.0).unwrap();
    data.write_string(5, 0, "Agent Name:").unwrap();
    data.write_string(5, 1, "RAVI KUMAR 12").unwrap();

    let header = ["Ac No", "Name", "Installment", "", "", "", "Balance"];
    for (col, title) in header.iter().enumerate() {
        if !title.is_empty() {
            data.write_string(6, col as u16, *title).unwrap();
        }
    }
    data.write_number(7, 0, 3400001.0).unwrap();
    data.write_string(7, 1, "ASHA  DEVI").unwrap();
    data.write_number(7, 2, 50.0).unwrap();
    data.write_number(7, 6, 1200.5).unwrap();
    data.write_string(8, 0, "3400002").unwrap();
    data.write_string(8, 1, "MOHAN").unwrap();
    data.write_number(8, 2, 20.0).unwrap();
    data.write_number(8, 6, 300.0).unwrap();
    data.write_string(9, 1, "Total").unwrap();
    data.write_number(9, 6, 1500.5).unwrap();

    workbook.save(&path).unwrap();
    path
}

#[test]
fn test_load_xlsx_report_skips_abstract_sheet() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let path = write_report_workbook(dir.path());

    let report = load_report(&path).unwrap();
    assert_eq!(report.society_name, "SRI BANASHANKARI CO-OP SOCIETY");
    assert_eq!(report.society_code, "SRIBAN");
    assert_eq!(report.agent_code, "12");
    assert_eq!(report.agent_name, "RAVI KUMAR");
    assert_eq!(report.report_date, chrono::NaiveDate::from_ymd_opt(2026, 3, 9));
    assert_eq!(report.accounts.len(), 2);

    let first = &report.accounts[0];
    assert_eq!(first.account_no, "3400001");
    assert_eq!(first.client_name, "ASHA DEVI");
    assert_eq!(first.account_type, AccountType::Pigmy);
    assert_eq!(first.frequency, Frequency::Daily);
    assert!((first.installment_rupees - 50.0).abs() < 1e-9);
    assert!((first.balance_rupees - 1200.5).abs() < 1e-9);
}

/// 报表日期存为 Excel 日期单元格
fn write_dated_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("loan_report.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Report").unwrap();

    let date = ExcelDateTime::from_ymd(2026, 3, 15).unwrap();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");

    sheet.write_string(0, 0, "KAVERI SOUHARDA CREDIT CO-OP").unwrap();
    sheet.write_string(1, 0, "Date:").unwrap();
    sheet
        .write_datetime_with_format(1, 1, &date, &date_format)
        .unwrap();
    sheet.write_string(2, 0, "Account Head:").unwrap();
    sheet.write_string(2, 1, "021").unwrap();
    sheet.write_string(2, 2, "MONTHLY LOAN").unwrap();
    sheet.write_string(3, 0, "Agent Name:").unwrap();
    sheet.write_string(3, 1, "SUNIL 13").unwrap();
    sheet.write_string(4, 0, "Ac No").unwrap();
    sheet.write_string(4, 1, "Name").unwrap();
    sheet.write_string(4, 2, "Installment").unwrap();
    sheet.write_string(4, 6, "Balance").unwrap();
    sheet.write_number(5, 0, 2001.0).unwrap();
    sheet.write_string(5, 1, "GOPAL").unwrap();
    sheet.write_number(5, 2, 900.0).unwrap();
    sheet.write_number(5, 6, 45000.0).unwrap();

    workbook.save(&path).unwrap();
    path
}

#[test]
fn test_date_cell_sets_report_date() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let path = write_dated_workbook(dir.path());

    let report = load_report(&path).unwrap();
    assert_eq!(report.report_date, chrono::NaiveDate::from_ymd_opt(2026, 3, 15));
    assert_eq!(report.society_code, "KAVERI");
    assert_eq!(report.agent_code, "13");
    assert_eq!(report.accounts.len(), 1);
    assert_eq!(report.accounts[0].lot_key(), "021_LOAN_MONTHLY");
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, b"%PDF").unwrap();
    assert!(matches!(
        load_report(&path),
        Err(ImportError::UnsupportedFormat(_))
    ));
}

#[tokio::test]
async fn test_import_workbook_through_api() {
    let app = create_test_app();
    let dir = TempDir::new().unwrap();
    let path = write_report_workbook(dir.path());

    let preview = app.state.import_api.preview_report(&path).unwrap();
    assert_eq!(preview.accounts.len(), 2);
    assert!(app.state.society_repo.list().unwrap().is_empty());

    let summary = app
        .state
        .import_api
        .import_report_file(&path, None)
        .await
        .unwrap();
    assert_eq!(summary.society_code, "SRIBAN");
    assert_eq!(summary.accounts_created, 2);
    assert_eq!(summary.lots_replaced, vec!["007_PIGMY_DAILY".to_string()]);

    let session = app
        .state
        .session_api
        .login(Some("SRIBAN"), "12", "1234")
        .await
        .unwrap();
    let accounts = app.state.collection_api.list_accounts(&session, None).unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].balance_paise, 120_050);
}
