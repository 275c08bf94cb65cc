// ==========================================
// 合作社收款台账 - 报表文件读取
// ==========================================
// 按扩展名分派:
//   .txt/.prn/.lst        → 定宽文本解析器
//   .xlsx/.xlsm/.xls/.ods → calamine 读表 → 表格解析器
//   .csv                  → csv 读表 → 表格解析器
// ==========================================

use crate::domain::report::ParsedReport;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_report_parser::{parse_report_workbook, SheetData};
use crate::importer::text_report_parser::parse_report_text;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, instrument};

/// 报表文件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFileKind {
    Text,
    Workbook,
    Csv,
}

impl ReportFileKind {
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "txt" | "prn" | "lst" => Ok(ReportFileKind::Text),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(ReportFileKind::Workbook),
            "csv" => Ok(ReportFileKind::Csv),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// ReportFileReader Trait
// ==========================================
// 实现者: TextReportReader / WorkbookReportReader / CsvReportReader
pub trait ReportFileReader: Send + Sync {
    fn read_report(&self, path: &Path) -> ImportResult<ParsedReport>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// 文本报表
// ==========================================
pub struct TextReportReader;

impl ReportFileReader for TextReportReader {
    fn read_report(&self, path: &Path) -> ImportResult<ParsedReport> {
        ensure_exists(path)?;
        // 报表可能来自非 UTF-8 的打印输出
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(parse_report_text(&text)?)
    }
}

// ==========================================
// Excel / ODS 工作簿
// ==========================================

/// 单元格 → 文本
///
/// 日期单元格输出 DD-MM-YYYY,与文本报表的日期写法一致
pub fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(date) => date.format("%d-%m-%Y").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

pub struct WorkbookReportReader;

impl WorkbookReportReader {
    /// 读取全部工作表为字符串单元格
    pub fn read_sheets(&self, path: &Path) -> ImportResult<Vec<SheetData>> {
        ensure_exists(path)?;
        let mut workbook = open_workbook_auto(path)?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_to_text).collect())
                .collect();
            sheets.push(SheetData::new(name, rows));
        }
        debug!(path = %path.display(), sheets = sheets.len(), "工作簿读取完成");
        Ok(sheets)
    }
}

impl ReportFileReader for WorkbookReportReader {
    fn read_report(&self, path: &Path) -> ImportResult<ParsedReport> {
        let sheets = self.read_sheets(path)?;
        Ok(parse_report_workbook(&sheets)?)
    }
}

// ==========================================
// CSV（单表）
// ==========================================
pub struct CsvReportReader;

impl CsvReportReader {
    pub fn read_sheet(&self, path: &Path) -> ImportResult<SheetData> {
        ensure_exists(path)?;
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 报表各段列数不一致
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();
        Ok(SheetData::new(name, rows))
    }
}

impl ReportFileReader for CsvReportReader {
    fn read_report(&self, path: &Path) -> ImportResult<ParsedReport> {
        let sheet = self.read_sheet(path)?;
        Ok(parse_report_workbook(std::slice::from_ref(&sheet))?)
    }
}

/// 按扩展名选择读取器并解析
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_report<P: AsRef<Path>>(path: P) -> ImportResult<ParsedReport> {
    let path = path.as_ref();
    let kind = ReportFileKind::from_path(path)?;
    debug!(?kind, "报表文件类型");

    match kind {
        ReportFileKind::Text => TextReportReader.read_report(path),
        ReportFileKind::Workbook => WorkbookReportReader.read_report(path),
        ReportFileKind::Csv => CsvReportReader.read_report(path),
    }
}
