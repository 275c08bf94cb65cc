// ==========================================
// 合作社收款台账 - 表格报表解析器
// ==========================================
// 输入: 已读出的工作表（单元格统一为字符串,由 file_parser 负责读取）
// 输出: 与文本解析器相同的 ParsedReport
// 列定位: 表头行（"ac no"）按子串匹配,找不到时用固定位置兜底
// 状态机: SeekingSociety → SeekingHeaderContext ⇄ InTable
// ==========================================

use crate::domain::money::parse_amount;
use crate::domain::report::ParsedReport;
use crate::importer::error::ParseError;
use crate::importer::report_heuristics::{
    collapse_whitespace, extract_loose_date, split_agent_segment, split_society_and_date,
    strip_account_head_prefix, strip_agent_ac_no_prefix,
    strip_agent_name_prefix, strip_date_prefix, HeadContext, ReportAccumulator,
};
use crate::importer::text_report_parser::ScanState;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

// 兜底列位置
const FALLBACK_ACCOUNT_NO_COL: usize = 0;
const FALLBACK_NAME_COL: usize = 1;
const FALLBACK_INSTALLMENT_COL: usize = 2;
const FALLBACK_BALANCE_COL: usize = 6;

const ABSTRACT_SHEET_NAME: &str = "abstract";
const HEADER_MARKER: &str = "ac no";

fn total_cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)total").expect("total cell regex"))
}

/// 一张工作表（行 × 单元格字符串）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| is_blank_row(row))
    }
}

/// 表头列定位结果（installment 缺失时按 collection → 位置 2 兜底）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub account_no: usize,
    pub name: usize,
    pub installment: Option<usize>,
    pub balance: usize,
    pub collection: Option<usize>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            account_no: FALLBACK_ACCOUNT_NO_COL,
            name: FALLBACK_NAME_COL,
            installment: None,
            balance: FALLBACK_BALANCE_COL,
            collection: None,
        }
    }
}

impl ColumnMap {
    /// 从表头行定位各列
    pub fn from_header(cells: &[String]) -> Self {
        let normalized: Vec<String> = cells.iter().map(|c| normalize_cell(c)).collect();
        let find = |needles: &[&str]| {
            normalized
                .iter()
                .position(|cell| needles.iter().any(|needle| cell.contains(needle)))
        };

        Self {
            account_no: find(&[HEADER_MARKER]).unwrap_or(FALLBACK_ACCOUNT_NO_COL),
            name: find(&["name"]).unwrap_or(FALLBACK_NAME_COL),
            installment: find(&["installment", "inst"]),
            balance: find(&["balance"]).unwrap_or(FALLBACK_BALANCE_COL),
            collection: find(&["collection"]),
        }
    }
}

/// 单元格标准化: 小写,去掉 . / : ,折叠空白
pub fn normalize_cell(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !matches!(c, '.' | '/' | ':'))
        .collect();
    collapse_whitespace(&stripped).to_lowercase()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or("")
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn is_header_row(row: &[String]) -> bool {
    row.iter().any(|c| normalize_cell(c) == HEADER_MARKER)
}

fn is_numeric_text(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// 账号清理: 数值单元格读出的 "3400001.0" 去掉尾部 ".0"
fn clean_account_no(value: &str) -> String {
    let trimmed = value.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

/// 选择工作表: 第一个名称不是 "abstract" 的表,否则第一张表
pub fn select_sheet(sheets: &[SheetData]) -> Result<&SheetData, ParseError> {
    let sheet = sheets
        .iter()
        .find(|s| !s.name.trim().eq_ignore_ascii_case(ABSTRACT_SHEET_NAME))
        .or_else(|| sheets.first())
        .ok_or(ParseError::NoWorksheet)?;

    if sheet.is_empty() {
        return Err(ParseError::EmptyWorksheet(sheet.name.clone()));
    }
    Ok(sheet)
}

/// 表格报表扫描器
pub struct SheetReportScanner {
    state: ScanState,
    acc: ReportAccumulator,
    columns: Option<ColumnMap>,
    skipped_rows: usize,
}

impl Default for SheetReportScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetReportScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::SeekingSociety,
            acc: ReportAccumulator::default(),
            columns: None,
            skipped_rows: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// 处理一行,返回迁移后的状态
    pub fn feed(&mut self, row: &[String]) -> ScanState {
        if is_blank_row(row) {
            // 空行结束数据表
            if self.state == ScanState::InTable {
                self.state = ScanState::SeekingHeaderContext;
            }
            return self.state;
        }

        let first = cell(row, 0);

        if let Some(rest) = strip_account_head_prefix(first) {
            self.apply_account_head(row, rest);
            if self.state == ScanState::InTable {
                self.state = ScanState::SeekingHeaderContext;
            }
            return self.state;
        }

        if let Some(rest) = strip_agent_ac_no_prefix(first) {
            let code = if cell(row, 1).is_empty() { rest } else { cell(row, 1) };
            self.acc.set_agent_code(&clean_account_no(code));
            return self.state;
        }

        if let Some(rest) = strip_agent_name_prefix(first) {
            let text = if cell(row, 1).is_empty() { rest } else { cell(row, 1) };
            self.acc.apply_agent_identity(text);
            return self.state;
        }

        if is_header_row(row) {
            self.columns = Some(ColumnMap::from_header(row));
            self.state = ScanState::InTable;
            return self.state;
        }

        match self.state {
            ScanState::InTable => self.feed_table_row(row),
            ScanState::SeekingSociety => self.feed_society_candidate(row),
            ScanState::SeekingHeaderContext => self.feed_context_row(row),
        }
        self.state
    }

    fn apply_account_head(&mut self, row: &[String], rest: &str) {
        let cell1 = cell(row, 1);
        let cell2 = cell(row, 2);

        let head_text = if !cell2.is_empty() {
            cell2
        } else if !cell1.is_empty() && !is_numeric_text(cell1) {
            cell1
        } else {
            rest
        };

        let (head_part, agent_part) = split_agent_segment(head_text);
        let mut context = HeadContext::from_head_text(head_part);
        if context.head_code.is_none() && is_numeric_text(cell1) {
            context.head_code = Some(cell1.to_string());
        }
        self.acc.head = context;

        if let Some(agent_text) = agent_part {
            self.acc.apply_agent_identity(agent_text);
        }
    }

    fn feed_society_candidate(&mut self, row: &[String]) {
        self.offer_row_date(row);

        if let Some(rest) = strip_date_prefix(cell(row, 0)) {
            self.refine_date(row, rest);
            return;
        }

        let first = cell(row, 0);
        let plausible = !first.is_empty()
            && !first.to_lowercase().contains("collection list")
            && !is_numeric_text(&clean_account_no(first));
        if !plausible {
            self.skipped_rows += 1;
            return;
        }

        let (name, _) = split_society_and_date(first);
        if name.is_empty() {
            self.skipped_rows += 1;
            return;
        }
        self.acc.society_name = Some(name);
        self.state = ScanState::SeekingHeaderContext;
    }

    fn feed_context_row(&mut self, row: &[String]) {
        if let Some(rest) = strip_date_prefix(cell(row, 0)) {
            self.refine_date(row, rest);
            return;
        }
        if !self.offer_row_date(row) {
            self.skipped_rows += 1;
        }
    }

    fn feed_table_row(&mut self, row: &[String]) {
        if row.iter().any(|c| total_cell_re().is_match(c)) {
            self.state = ScanState::SeekingHeaderContext;
            return;
        }

        let columns = self.columns.unwrap_or_default();
        let account_no = clean_account_no(cell(row, columns.account_no));
        let client_name = cell(row, columns.name);
        if !account_no.chars().any(|c| c.is_ascii_digit()) || client_name.is_empty() {
            self.skipped_rows += 1;
            return;
        }

        let balance = parse_amount(cell(row, columns.balance)).unwrap_or(0.0);
        let installment = columns
            .installment
            .and_then(|i| parse_amount(cell(row, i)))
            .or_else(|| columns.collection.and_then(|i| parse_amount(cell(row, i))))
            .or_else(|| parse_amount(cell(row, FALLBACK_INSTALLMENT_COL)))
            .unwrap_or(0.0);

        self.acc
            .push_account(&account_no, client_name, installment, balance);
    }

    /// 前两个单元格中的宽松日期；成功返回 true
    fn offer_row_date(&mut self, row: &[String]) -> bool {
        let date = extract_loose_date(cell(row, 0)).or_else(|| extract_loose_date(cell(row, 1)));
        let found = date.is_some();
        self.acc.offer_date(date);
        found
    }

    /// "Date:" 行覆盖之前推断的日期
    fn refine_date(&mut self, row: &[String], rest: &str) {
        if let Some(date) = extract_loose_date(rest).or_else(|| extract_loose_date(cell(row, 1))) {
            self.acc.report_date = Some(date);
        }
    }

    pub fn finish(self) -> Result<ParsedReport, ParseError> {
        debug!(
            accounts = self.acc.accounts.len(),
            skipped_rows = self.skipped_rows,
            header_found = self.columns.is_some(),
            "表格报表扫描完成"
        );

        let identity_complete = self.acc.society_name.is_some()
            && self.acc.agent_name.is_some()
            && self.acc.agent_code.is_some();
        if identity_complete && self.columns.is_none() {
            return Err(ParseError::HeaderRowNotFound);
        }
        self.acc.finish()
    }
}

/// 解析单张工作表
pub fn parse_report_sheet(sheet: &SheetData) -> Result<ParsedReport, ParseError> {
    let mut scanner = SheetReportScanner::new();
    for row in &sheet.rows {
        scanner.feed(row);
    }
    scanner.finish()
}

/// 解析工作簿: 先选表再扫描
pub fn parse_report_workbook(sheets: &[SheetData]) -> Result<ParsedReport, ParseError> {
    let sheet = select_sheet(sheets)?;
    debug!(sheet = %sheet.name, rows = sheet.rows.len(), "选中工作表");
    parse_report_sheet(sheet)
}
