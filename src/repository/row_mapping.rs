// ==========================================
// 合作社收款台账 - 行映射辅助
// ==========================================
// 每个实体一个强类型映射函数,形状不符时返回 FromSqlConversionFailure
// ==========================================

use crate::domain::entities::{
    Account, Agent, CollectionEntry, ExportCollectionRow, ExportRecord, Society,
};
use crate::domain::types::{AccountStatus, AccountType, CollectionStatus, Frequency};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// 读取必填日期列（YYYY-MM-DD）
pub fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, format!("无效日期 '{}': {}", raw, e)))
}

/// 读取可空日期列
pub fn get_opt_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|e| conversion_error(idx, format!("无效日期 '{}': {}", raw, e))),
        _ => Ok(None),
    }
}

/// 读取必填时间戳列（RFC3339）
pub fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("无效时间戳 '{}': {}", raw, e)))
}

/// 读取可空时间戳列
pub fn get_opt_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, format!("无效时间戳 '{}': {}", raw, e))),
        _ => Ok(None),
    }
}

pub const SOCIETY_COLUMNS: &str = "id, code, name";

pub fn map_society(row: &Row<'_>) -> rusqlite::Result<Society> {
    Ok(Society {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
    })
}

pub const AGENT_COLUMNS: &str = "id, society_id, code, name, phone, pin_hash, is_active";

pub fn map_agent(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        society_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        pin_hash: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
    })
}

pub const ACCOUNT_COLUMNS: &str = "id, society_id, agent_id, account_no, lot_key, client_name, \
     account_type, frequency, account_head, account_head_code, installment_paise, balance_paise, \
     last_txn_at, opened_at, closes_at, status";

pub fn map_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        society_id: row.get(1)?,
        agent_id: row.get(2)?,
        account_no: row.get(3)?,
        lot_key: row.get(4)?,
        client_name: row.get(5)?,
        account_type: AccountType::from_str(&row.get::<_, String>(6)?),
        frequency: Frequency::from_str(&row.get::<_, String>(7)?),
        account_head: row.get(8)?,
        account_head_code: row.get(9)?,
        installment_paise: row.get(10)?,
        balance_paise: row.get(11)?,
        last_txn_at: get_opt_date(row, 12)?,
        opened_at: get_opt_date(row, 13)?,
        closes_at: get_opt_date(row, 14)?,
        status: AccountStatus::from_str(&row.get::<_, String>(15)?),
    })
}

pub const COLLECTION_COLUMNS: &str = "id, society_id, agent_id, account_id, account_no, \
     collected_paise, collected_at, collection_date, status, exported_at, remarks";

pub fn map_collection(row: &Row<'_>) -> rusqlite::Result<CollectionEntry> {
    Ok(CollectionEntry {
        id: row.get(0)?,
        society_id: row.get(1)?,
        agent_id: row.get(2)?,
        account_id: row.get(3)?,
        account_no: row.get(4)?,
        collected_paise: row.get(5)?,
        collected_at: get_timestamp(row, 6)?,
        collection_date: get_date(row, 7)?,
        status: CollectionStatus::from_str(&row.get::<_, String>(8)?),
        exported_at: get_opt_timestamp(row, 9)?,
        remarks: row.get(10)?,
    })
}

pub const EXPORT_ROW_COLUMNS: &str = "c.id, a.id, c.account_no, a.client_name, a.account_head, \
     a.account_head_code, a.account_type, a.frequency, c.collected_paise, c.collected_at, \
     c.collection_date, c.remarks";

pub fn map_export_row(row: &Row<'_>) -> rusqlite::Result<ExportCollectionRow> {
    Ok(ExportCollectionRow {
        collection_id: row.get(0)?,
        account_id: row.get(1)?,
        account_no: row.get(2)?,
        client_name: row.get(3)?,
        account_head: row.get(4)?,
        account_head_code: row.get(5)?,
        account_type: AccountType::from_str(&row.get::<_, String>(6)?),
        frequency: Frequency::from_str(&row.get::<_, String>(7)?),
        collected_paise: row.get(8)?,
        collected_at: get_timestamp(row, 9)?,
        collection_date: get_date(row, 10)?,
        remarks: row.get(11)?,
    })
}

pub const EXPORT_RECORD_COLUMNS: &str =
    "id, society_id, agent_id, exported_at, file_uri, collections_count";

pub fn map_export_record(row: &Row<'_>) -> rusqlite::Result<ExportRecord> {
    Ok(ExportRecord {
        id: row.get(0)?,
        society_id: row.get(1)?,
        agent_id: row.get(2)?,
        exported_at: get_timestamp(row, 3)?,
        file_uri: row.get(4)?,
        collections_count: row.get(5)?,
    })
}
