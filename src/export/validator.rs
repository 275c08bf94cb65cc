// ==========================================
// 合作社收款台账 - 导出前一致性校验
// ==========================================
// 规则1: 同一批次内,同一账号只能对应一个客户姓名（快速失败）
// 规则2: 同一账号跨批次出现时,各批次客户姓名必须一致
// 姓名比较前折叠空白并转大写
// 纯检查,无副作用；任一违反即中止整批导出
// ==========================================

use crate::domain::entities::ExportCollectionRow;
use crate::export::error::{CrossLotConflict, ExportValidationError};
use crate::importer::report_heuristics::collapse_whitespace;
use std::collections::{BTreeMap, HashMap};

/// 姓名标准化: 折叠空白 + 大写
pub fn normalize_client_name(name: &str) -> String {
    collapse_whitespace(name).to_uppercase()
}

/// 导出前校验待导出收款
pub fn validate_pending_collections_for_export(
    rows: &[ExportCollectionRow],
) -> Result<(), ExportValidationError> {
    // ===== 规则1: 批次内 =====
    // (lot_key, account_no) → (批次标签, 首个姓名, 标准化姓名)
    let mut within_lot: HashMap<(String, String), (String, String, String)> = HashMap::new();
    for row in rows {
        let key = (row.lot_key(), row.account_no.trim().to_string());
        let normalized = normalize_client_name(&row.client_name);
        match within_lot.get(&key) {
            Some((lot_label, first_name, first_normalized)) => {
                if *first_normalized != normalized {
                    return Err(ExportValidationError::SameLot {
                        account_no: key.1.clone(),
                        lot_label: lot_label.clone(),
                        names: vec![first_name.clone(), collapse_whitespace(&row.client_name)],
                    });
                }
            }
            None => {
                within_lot.insert(
                    key,
                    (
                        row.lot_label(),
                        collapse_whitespace(&row.client_name),
                        normalized,
                    ),
                );
            }
        }
    }

    // ===== 规则2: 跨批次 =====
    // account_no → lot_key → (批次标签, 姓名, 标准化姓名)
    let mut by_account: BTreeMap<String, BTreeMap<String, (String, String, String)>> =
        BTreeMap::new();
    for ((lot_key, account_no), entry) in within_lot {
        by_account
            .entry(account_no)
            .or_default()
            .insert(lot_key, entry);
    }

    let conflicts: Vec<CrossLotConflict> = by_account
        .into_iter()
        .filter(|(_, lots)| {
            let mut names = lots.values().map(|(_, _, normalized)| normalized);
            match names.next() {
                Some(first) => names.any(|n| n != first),
                None => false,
            }
        })
        .map(|(account_no, lots)| CrossLotConflict {
            account_no,
            entries: lots
                .into_values()
                .map(|(label, name, _)| (label, name))
                .collect(),
        })
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(ExportValidationError::CrossLot { conflicts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccountType, Frequency};
    use chrono::{NaiveDate, Utc};

    fn row(
        account_no: &str,
        client_name: &str,
        head_code: Option<&str>,
        account_type: AccountType,
        frequency: Frequency,
    ) -> ExportCollectionRow {
        ExportCollectionRow {
            collection_id: format!("c-{}-{}", account_no, client_name),
            account_id: format!("a-{}", account_no),
            account_no: account_no.to_string(),
            client_name: client_name.to_string(),
            account_head: None,
            account_head_code: head_code.map(str::to_string),
            account_type,
            frequency,
            collected_paise: 1000,
            collected_at: Utc::now(),
            collection_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            remarks: None,
        }
    }

    #[test]
    fn test_consistent_rows_across_lots_pass() {
        let rows = vec![
            row("1001", "Ravi Kumar", Some("007"), AccountType::Pigmy, Frequency::Daily),
            row("1001", "RAVI  KUMAR", Some("021"), AccountType::Loan, Frequency::Monthly),
            row("1002", "Sita", Some("007"), AccountType::Pigmy, Frequency::Daily),
        ];
        assert!(validate_pending_collections_for_export(&rows).is_ok());
    }

    #[test]
    fn test_same_lot_conflict() {
        let rows = vec![
            row("1001", "A", None, AccountType::Loan, Frequency::Monthly),
            row("1001", "B", None, AccountType::Loan, Frequency::Monthly),
        ];
        let err = validate_pending_collections_for_export(&rows).unwrap_err();
        assert!(matches!(err, ExportValidationError::SameLot { .. }));
        assert!(err.to_string().contains("has multiple client names"));
    }

    #[test]
    fn test_cross_lot_conflict() {
        let rows = vec![
            row("1001", "A", Some("007"), AccountType::Pigmy, Frequency::Daily),
            row("1001", "B", Some("021"), AccountType::Loan, Frequency::Monthly),
        ];
        let err = validate_pending_collections_for_export(&rows).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("different clients across account types"));
        assert!(message.contains("1001"));
    }

    #[test]
    fn test_empty_rows_pass() {
        assert!(validate_pending_collections_for_export(&[]).is_ok());
    }
}
