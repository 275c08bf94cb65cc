// ==========================================
// 合作社收款台账 - 报表解析共用规则
// ==========================================
// 文本报表与表格报表共用: 前缀识别 / 尾部数字代码拆分 / 日期抽取 / 合作社代码派生
// ==========================================

use crate::domain::money::parse_dmy;
use crate::domain::report::{ParsedAccount, ParsedReport};
use crate::domain::types::{AccountType, Frequency};
use crate::importer::error::ParseError;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// 合作社代码派生失败时的兜底值
pub const FALLBACK_SOCIETY_CODE: &str = "SOCIETY";

fn account_head_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*account\s+head\s*:-?\s*").expect("account head regex"))
}

fn agent_name_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)agent\s+name\s*:-?\s*").expect("agent name regex"))
}

fn agent_ac_no_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*agent\s+a/?c\.?\s*no\.?\s*:-?\s*").expect("agent ac no regex"))
}

fn date_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*date\s*:-?\s*").expect("date prefix regex"))
}

fn date_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bdate\s*:?-?").expect("date marker regex"))
}

fn trailing_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)[\s:\-]*(\d+)\s*$").expect("trailing code regex"))
}

fn strict_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})-(\d{2})-(\d{4})").expect("strict date regex"))
}

fn loose_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})").expect("loose date regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// 折叠连续空白为单个空格并 trim
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").into_owned()
}

/// "Account Head:" 前缀之后的文本；不以该前缀开头时返回 None
pub fn strip_account_head_prefix(text: &str) -> Option<&str> {
    account_head_prefix_re().find(text).map(|m| &text[m.end()..])
}

/// "Agent Name:" 前缀之后的文本（必须位于行首）
pub fn strip_agent_name_prefix(text: &str) -> Option<&str> {
    let m = agent_name_marker_re().find(text)?;
    if text[..m.start()].trim().is_empty() {
        Some(&text[m.end()..])
    } else {
        None
    }
}

/// "Agent Ac No:" 前缀之后的文本
pub fn strip_agent_ac_no_prefix(text: &str) -> Option<&str> {
    agent_ac_no_prefix_re().find(text).map(|m| &text[m.end()..])
}

/// "Date:" 前缀之后的文本
pub fn strip_date_prefix(text: &str) -> Option<&str> {
    date_prefix_re().find(text).map(|m| &text[m.end()..])
}

/// 拆分嵌入的 "Agent Name:" 段
///
/// # 返回
/// - (之前的文本, 之后的文本) ；无该段时第二项为 None
pub fn split_agent_segment(text: &str) -> (&str, Option<&str>) {
    match agent_name_marker_re().find(text) {
        Some(m) => (&text[..m.start()], Some(&text[m.end()..])),
        None => (text, None),
    }
}

/// 尾部数字代码拆分: "DAILY PIGMY ACCOUNT 007" → ("DAILY PIGMY ACCOUNT", Some("007"))
pub fn split_trailing_code(text: &str) -> (String, Option<String>) {
    let trimmed = text.trim();
    match trailing_code_re().captures(trimmed) {
        Some(caps) => {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let code = caps.get(2).map(|m| m.as_str().to_string());
            (collapse_whitespace(name), code)
        }
        None => (collapse_whitespace(trimmed), None),
    }
}

/// 严格日期 DD-MM-YYYY
pub fn extract_strict_date(text: &str) -> Option<NaiveDate> {
    let caps = strict_date_re().captures(text)?;
    parse_dmy(&caps[1], &caps[2], &caps[3])
}

/// 宽松日期 DD[-/.]MM[-/.]YYYY,失败时回退严格格式
pub fn extract_loose_date(text: &str) -> Option<NaiveDate> {
    loose_date_re()
        .captures(text)
        .and_then(|caps| parse_dmy(&caps[1], &caps[2], &caps[3]))
        .or_else(|| extract_strict_date(text))
}

/// 合作社抬头行: "SRI BANK CO-OP SOCIETY   Date :- 09-03-2026"
///
/// # 返回
/// - (合作社名称, 报表日期)
pub fn split_society_and_date(line: &str) -> (String, Option<NaiveDate>) {
    match date_marker_re().find(line) {
        Some(m) => {
            let name = collapse_whitespace(&line[..m.start()]);
            let date = extract_strict_date(&line[m.end()..]).or_else(|| extract_strict_date(line));
            (name, date)
        }
        None => (collapse_whitespace(line), None),
    }
}

/// 由合作社名称派生代码: 去非字母数字、转大写,长度 ≥4 取前 6 位,否则 "SOCIETY"
pub fn derive_society_code(society_name: &str) -> String {
    let cleaned: String = society_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() >= 4 {
        cleaned.chars().take(6).collect()
    } else {
        FALLBACK_SOCIETY_CODE.to_string()
    }
}

/// 账户科目上下文（作用于其后的所有账户行,直到下一条 Account Head）
#[derive(Debug, Clone, PartialEq)]
pub struct HeadContext {
    pub head: Option<String>,
    pub head_code: Option<String>,
    pub account_type: AccountType,
    pub frequency: Frequency,
}

impl Default for HeadContext {
    fn default() -> Self {
        Self {
            head: None,
            head_code: None,
            account_type: AccountType::Savings,
            frequency: Frequency::Monthly,
        }
    }
}

impl HeadContext {
    /// 由科目文本构造: 尾部数字为代码,其余为科目名；类型/频率按科目名推断
    pub fn from_head_text(text: &str) -> Self {
        let (name, code) = split_trailing_code(text);
        let head = if name.is_empty() { None } else { Some(name) };
        let basis = head.clone().unwrap_or_default();
        Self {
            account_type: AccountType::infer_from_head(&basis),
            frequency: Frequency::infer_from_head(&basis),
            head,
            head_code: code,
        }
    }
}

/// 代理人身份: 尾部数字为代码,其余为姓名
pub fn parse_agent_identity(text: &str) -> (Option<String>, Option<String>) {
    let (name, code) = split_trailing_code(text);
    let name = if name.is_empty() { None } else { Some(name) };
    (name, code)
}

// ==========================================
// ReportAccumulator - 扫描过程中的累积状态
// ==========================================
// 两种解析器共用: 扫描结束后 finish() 统一做完整性检查
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    pub society_name: Option<String>,
    pub report_date: Option<NaiveDate>,
    pub agent_name: Option<String>,
    pub agent_code: Option<String>,
    pub head: HeadContext,
    pub accounts: Vec<ParsedAccount>,
}

impl ReportAccumulator {
    /// 以 "姓名 + 尾部代码" 文本更新代理人身份（空值不覆盖已有值）
    pub fn apply_agent_identity(&mut self, text: &str) {
        let (name, code) = parse_agent_identity(text);
        if name.is_some() {
            self.agent_name = name;
        }
        if code.is_some() {
            self.agent_code = code;
        }
    }

    pub fn set_agent_code(&mut self, code: &str) {
        let code = code.trim();
        if !code.is_empty() {
            self.agent_code = Some(code.to_string());
        }
    }

    /// 日期只取第一次成功解析的值
    pub fn offer_date(&mut self, date: Option<NaiveDate>) {
        if self.report_date.is_none() {
            self.report_date = date;
        }
    }

    /// 在当前科目上下文下追加一行账户
    pub fn push_account(
        &mut self,
        account_no: &str,
        client_name: &str,
        installment_rupees: f64,
        balance_rupees: f64,
    ) {
        self.accounts.push(ParsedAccount {
            account_no: account_no.trim().to_string(),
            client_name: collapse_whitespace(client_name),
            account_head: self.head.head.clone(),
            account_head_code: self.head.head_code.clone(),
            account_type: self.head.account_type,
            frequency: self.head.frequency,
            installment_rupees,
            balance_rupees,
        });
    }

    /// 完整性检查: 合作社 → 代理人 → 账户行,依次失败
    pub fn finish(self) -> Result<ParsedReport, ParseError> {
        let society_name = self
            .society_name
            .filter(|s| !s.trim().is_empty())
            .ok_or(ParseError::SocietyNameNotFound)?;
        let (agent_name, agent_code) = match (self.agent_name, self.agent_code) {
            (Some(name), Some(code)) => (name, code),
            _ => return Err(ParseError::AgentNotFound),
        };
        if self.accounts.is_empty() {
            return Err(ParseError::NoAccountRows);
        }
        Ok(ParsedReport {
            society_code: derive_society_code(&society_name),
            society_name,
            agent_name,
            agent_code,
            report_date: self.report_date,
            accounts: self.accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trailing_code() {
        assert_eq!(
            split_trailing_code("DAILY PIGMY ACCOUNT 007"),
            ("DAILY PIGMY ACCOUNT".to_string(), Some("007".to_string()))
        );
        assert_eq!(
            split_trailing_code("RAMESH  KUMAR - 12 "),
            ("RAMESH KUMAR".to_string(), Some("12".to_string()))
        );
        assert_eq!(split_trailing_code("GOLD LOAN"), ("GOLD LOAN".to_string(), None));
    }

    #[test]
    fn test_head_context_inference() {
        let ctx = HeadContext::from_head_text("MONTHLY LOAN ACCOUNT 021");
        assert_eq!(ctx.head.as_deref(), Some("MONTHLY LOAN ACCOUNT"));
        assert_eq!(ctx.head_code.as_deref(), Some("021"));
        assert_eq!(ctx.account_type, AccountType::Loan);
        assert_eq!(ctx.frequency, Frequency::Monthly);
    }

    #[test]
    fn test_split_agent_segment() {
        let (head, agent) = split_agent_segment("DAILY PIGMY 007   Agent Name: RAVI 12");
        assert_eq!(head.trim(), "DAILY PIGMY 007");
        assert_eq!(agent, Some("RAVI 12"));
        assert_eq!(split_agent_segment("DAILY PIGMY 007").1, None);
    }

    #[test]
    fn test_prefix_matchers_are_case_insensitive() {
        assert_eq!(strip_account_head_prefix("ACCOUNT HEAD : X 1"), Some("X 1"));
        assert_eq!(strip_agent_name_prefix("agent name:- RAVI 12"), Some("RAVI 12"));
        assert_eq!(strip_agent_name_prefix("Account Head: X Agent Name: Y"), None);
        assert_eq!(strip_agent_ac_no_prefix("Agent Ac No: 12"), Some("12"));
        assert_eq!(strip_date_prefix("Date :- 01-02-2026"), Some("01-02-2026"));
    }

    #[test]
    fn test_split_society_and_date() {
        let (name, date) = split_society_and_date("SRI BANK CO-OP SOCIETY   Date :- 09-03-2026");
        assert_eq!(name, "SRI BANK CO-OP SOCIETY");
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 9));

        let (name, date) = split_society_and_date("SRI BANK CO-OP SOCIETY");
        assert_eq!(name, "SRI BANK CO-OP SOCIETY");
        assert_eq!(date, None);
    }

    #[test]
    fn test_loose_date() {
        assert_eq!(extract_loose_date("As on 9/3/2026"), NaiveDate::from_ymd_opt(2026, 3, 9));
        assert_eq!(extract_loose_date("09.03.2026"), NaiveDate::from_ymd_opt(2026, 3, 9));
        assert_eq!(extract_loose_date("no date"), None);
    }

    #[test]
    fn test_derive_society_code() {
        assert_eq!(derive_society_code("Sri Bank Co-op Society"), "SRIBAN");
        assert_eq!(derive_society_code("A.B.C"), "SOCIETY");
        assert_eq!(derive_society_code("ABCD"), "ABCD");
    }

    #[test]
    fn test_accumulator_failure_order() {
        let acc = ReportAccumulator::default();
        assert_eq!(acc.finish(), Err(ParseError::SocietyNameNotFound));

        let mut acc = ReportAccumulator::default();
        acc.society_name = Some("SRI BANK".to_string());
        acc.agent_name = Some("RAVI".to_string());
        assert_eq!(acc.finish(), Err(ParseError::AgentNotFound));

        let mut acc = ReportAccumulator::default();
        acc.society_name = Some("SRI BANK".to_string());
        acc.apply_agent_identity("RAVI KUMAR 12");
        assert_eq!(acc.finish(), Err(ParseError::NoAccountRows));
    }
}
