// ==========================================
// 合作社收款台账 - 定宽文本报表解析器
// ==========================================
// 单遍前向扫描,显式状态机:
//   SeekingSociety → SeekingHeaderContext ⇄ InTable
// 每行先分类（LineKind）,再由当前状态决定迁移；
// 未命中任何规则的行走 Skip 分支,不报错
// ==========================================

use crate::domain::money::parse_amount;
use crate::domain::report::ParsedReport;
use crate::importer::error::ParseError;
use crate::importer::report_heuristics::{
    split_agent_segment, split_society_and_date, strip_account_head_prefix,
    strip_agent_name_prefix, HeadContext, ReportAccumulator,
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn account_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{4,})\s+(.+?)\s+(-?[\d,]+(?:\.\d+)?)\s*$").expect("account row regex")
    })
}

fn rule_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*-{5,}\s*$").expect("rule line regex"))
}

fn table_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*ac\s*\.?\s*no").expect("table header regex"))
}

fn total_records_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*total\s+records").expect("total records regex"))
}

/// 扫描状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    SeekingSociety,
    SeekingHeaderContext,
    InTable,
}

/// 行分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    Blank,
    AccountHead(&'a str),
    AgentName(&'a str),
    TableHeader,
    Rule,
    TotalRecords,
    Row {
        account_no: &'a str,
        client_name: &'a str,
        amount: &'a str,
    },
    Other,
}

/// 行分类（与状态无关）
pub fn classify_line(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(rest) = strip_account_head_prefix(line) {
        return LineKind::AccountHead(rest);
    }
    if let Some(rest) = strip_agent_name_prefix(line) {
        return LineKind::AgentName(rest);
    }
    if table_header_re().is_match(line) {
        return LineKind::TableHeader;
    }
    if rule_line_re().is_match(line) {
        return LineKind::Rule;
    }
    if total_records_re().is_match(line) {
        return LineKind::TotalRecords;
    }
    if let Some(caps) = account_row_re().captures(line) {
        if let (Some(no), Some(name), Some(amount)) = (caps.get(1), caps.get(2), caps.get(3)) {
            return LineKind::Row {
                account_no: no.as_str(),
                client_name: name.as_str(),
                amount: amount.as_str(),
            };
        }
    }
    LineKind::Other
}

/// 文本报表扫描器
pub struct TextReportScanner {
    state: ScanState,
    acc: ReportAccumulator,
    skipped_lines: usize,
}

impl Default for TextReportScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl TextReportScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::SeekingSociety,
            acc: ReportAccumulator::default(),
            skipped_lines: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// 已按 Skip 分支丢弃的非空行数
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// 处理一行,返回迁移后的状态
    pub fn feed(&mut self, line: &str) -> ScanState {
        let kind = classify_line(line);

        self.state = match (self.state, kind) {
            (state, LineKind::Blank) => state,

            // 第一条非空行即合作社抬头
            (ScanState::SeekingSociety, _) => {
                let (name, date) = split_society_and_date(line);
                self.acc.society_name = Some(name);
                self.acc.offer_date(date);
                ScanState::SeekingHeaderContext
            }

            (state, LineKind::AccountHead(rest)) => {
                let (head_text, agent_text) = split_agent_segment(rest);
                self.acc.head = HeadContext::from_head_text(head_text);
                if let Some(agent_text) = agent_text {
                    self.acc.apply_agent_identity(agent_text);
                }
                state
            }

            (state, LineKind::AgentName(rest)) => {
                self.acc.apply_agent_identity(rest);
                state
            }

            (_, LineKind::TableHeader) => ScanState::InTable,

            (ScanState::InTable, LineKind::TotalRecords) => ScanState::SeekingHeaderContext,

            (
                ScanState::InTable,
                LineKind::Row {
                    account_no,
                    client_name,
                    amount,
                },
            ) => {
                match parse_amount(amount) {
                    Some(balance) => self.acc.push_account(account_no, client_name, balance, balance),
                    None => self.skipped_lines += 1,
                }
                ScanState::InTable
            }

            (state, LineKind::Rule) => state,

            // 未命中规则: 跳过
            (state, _) => {
                self.skipped_lines += 1;
                state
            }
        };

        self.state
    }

    pub fn finish(self) -> Result<ParsedReport, ParseError> {
        debug!(
            accounts = self.acc.accounts.len(),
            skipped_lines = self.skipped_lines,
            "文本报表扫描完成"
        );
        self.acc.finish()
    }
}

/// 解析定宽文本报表
pub fn parse_report_text(text: &str) -> Result<ParsedReport, ParseError> {
    let mut scanner = TextReportScanner::new();
    for line in text.lines() {
        scanner.feed(line);
    }
    scanner.finish()
}
