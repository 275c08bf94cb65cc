// ==========================================
// 合作社收款台账 - 导出文件名
// ==========================================
// 格式: IAMC_<SOCIETY>_<AGENT>_<LOT_FILE_CODE>_<YYYYMMDD>_<HHMMSS>Z.<xlsx|txt>
// 同一次导出的所有批次共用同一时间戳
// ==========================================

use crate::domain::lot::{sanitize_file_code, Lot};
use crate::domain::types::ExportFormat;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const FILE_NAME_PREFIX: &str = "IAMC";

fn file_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^IAMC_([A-Z0-9]+)_([A-Z0-9]+)_([A-Z0-9_]+)_(\d{8})_(\d{6})Z\.(xlsx|txt)$")
            .expect("export file name regex")
    })
}

/// 文件名中的代码段: 仅保留大写字母数字
fn compact_code(value: &str, fallback: &str) -> String {
    let code: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if code.is_empty() {
        fallback.to_string()
    } else {
        code
    }
}

/// 紧凑时间戳 YYYYMMDD_HHMMSSZ（UTC）
pub fn compact_timestamp(exported_at: DateTime<Utc>) -> String {
    exported_at.format("%Y%m%d_%H%M%SZ").to_string()
}

/// 生成导出文件名
pub fn build_export_file_name(
    society_code: &str,
    agent_code: &str,
    lot: &Lot,
    exported_at: DateTime<Utc>,
    format: ExportFormat,
) -> String {
    format!(
        "{}_{}_{}_{}_{}.{}",
        FILE_NAME_PREFIX,
        compact_code(society_code, "SOCIETY"),
        compact_code(agent_code, "AGENT"),
        lot.file_code(),
        compact_timestamp(exported_at),
        format.extension()
    )
}

/// 解析后的导出文件名（用于展示导出历史）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFileName {
    pub file_name: String,
    pub society_code: String,
    pub agent_code: String,
    pub lot_code: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub format: ExportFormat,
}

impl ExportFileName {
    pub fn exported_at(&self) -> DateTime<Utc> {
        NaiveDateTime::new(self.date, self.time).and_utc()
    }

    /// 是否属于某代理人（按文件名中的代码比较）
    pub fn belongs_to(&self, society_code: &str, agent_code: &str) -> bool {
        self.society_code == compact_code(society_code, "SOCIETY")
            && self.agent_code == compact_code(agent_code, "AGENT")
    }
}

/// 解析导出文件名；不符合格式时返回 None
pub fn parse_export_file_name(file_name: &str) -> Option<ExportFileName> {
    let caps = file_name_re().captures(file_name.trim())?;
    let date = NaiveDate::parse_from_str(&caps[4], "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[5], "%H%M%S").ok()?;
    Some(ExportFileName {
        file_name: file_name.trim().to_string(),
        society_code: caps[1].to_string(),
        agent_code: caps[2].to_string(),
        lot_code: sanitize_file_code(&caps[3], crate::domain::lot::DEFAULT_LOT_FILE_CODE),
        date,
        time,
        format: ExportFormat::from_str(&caps[6]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccountType, Frequency};
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 30).unwrap()
    }

    #[test]
    fn test_build_file_name() {
        let lot = Lot::new(Some("007"), AccountType::Pigmy, Frequency::Daily);
        let name = build_export_file_name("sri-ban", "12", &lot, instant(), ExportFormat::Xlsx);
        assert_eq!(name, "IAMC_SRIBAN_12_007_PIGMY_DAILY_20260309_070530Z.xlsx");
    }

    #[test]
    fn test_parse_file_name() {
        let parsed =
            parse_export_file_name("IAMC_SRIBAN_12_007_PIGMY_DAILY_20260309_070530Z.txt").unwrap();
        assert_eq!(parsed.society_code, "SRIBAN");
        assert_eq!(parsed.agent_code, "12");
        assert_eq!(parsed.lot_code, "007_PIGMY_DAILY");
        assert_eq!(parsed.format, ExportFormat::Txt);
        assert_eq!(parsed.exported_at(), instant());
        assert!(parsed.belongs_to("sriban", "12"));
        assert!(!parsed.belongs_to("sriban", "13"));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(parse_export_file_name("report.xlsx").is_none());
        assert!(parse_export_file_name("IAMC_A_B_LOT_20260309_070530Z.pdf").is_none());
        assert!(parse_export_file_name("IAMC_A_B_LOT_20261399_070530Z.txt").is_none());
    }
}
