// ==========================================
// 合作社收款台账 - 金额与日期工具
// ==========================================
// 金额一律以整数 paise 存储（1 卢比 = 100 paise）
// 日期一律以 YYYY-MM-DD 存储
// ==========================================

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};

/// 每卢比的 paise 数
pub const PAISE_PER_RUPEE: i64 = 100;

/// 卢比（浮点）→ paise（整数,四舍五入）
///
/// 非有限值（NaN/Inf）按 0 处理。
pub fn rupees_to_paise(rupees: f64) -> i64 {
    if !rupees.is_finite() {
        return 0;
    }
    (rupees * PAISE_PER_RUPEE as f64).round() as i64
}

/// paise → 卢比（浮点,仅用于展示/导出）
pub fn paise_to_rupees(paise: i64) -> f64 {
    paise as f64 / PAISE_PER_RUPEE as f64
}

/// paise → "1234.50" 形式的定点字符串
pub fn format_paise(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        abs / PAISE_PER_RUPEE as u64,
        abs % PAISE_PER_RUPEE as u64
    )
}

/// 解析带千分位逗号的金额文本（"1,200.50" → 1200.5）
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// DD-MM-YYYY → NaiveDate
pub fn parse_dmy(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let d = day.parse::<u32>().ok()?;
    let m = month.parse::<u32>().ok()?;
    let y = year.parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// 解析 ISO 日期（兼容 YYYY-MM-DD / DD-MM-YYYY / DD/MM/YYYY / RFC3339 前缀）
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d-%m-%Y"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d.%m.%Y"))
        .ok()
}

/// 日期 → "YYYY-MM-DD"
pub fn to_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// 时间戳 → RFC3339（UTC, 毫秒精度, `Z` 后缀）
pub fn to_iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 当天日期（本地日历日,收款按此归日）
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
