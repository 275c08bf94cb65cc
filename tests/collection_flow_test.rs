// ==========================================
// 收款流程集成测试
// ==========================================
// 测试目标: 同日覆盖 / 尾号检索 / 批次选择 / 非法收款拒绝
// ==========================================

mod test_helpers;

use iamc_collect::api::ApiError;
use iamc_collect::domain::types::CollectionStatus;
use test_helpers::{create_test_app, import_and_login, loan_account, parsed_report, pigmy_account};

const SOCIETY: &str = "SRI BANASHANKARI CO-OP SOCIETY";

#[tokio::test]
async fn test_collect_twice_same_day_overwrites() {
    let app = create_test_app();
    let report = parsed_report(SOCIETY, "12", "RAVI", vec![pigmy_account("1001", "ASHA", 50.0)]);
    let session = import_and_login(&app.state, &report).await;
    let api = &app.state.collection_api;

    let account = api.find_account_by_no(&session, "1001", None).unwrap();
    let first = api.collect(&session, &account.id, 50.0, Some("morning")).unwrap();
    let second = api.collect(&session, &account.id, 70.5, None).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.collected_paise, 7050);
    assert_eq!(second.remarks, None);
    assert_eq!(second.status, CollectionStatus::Pending);

    let totals = api.today_summary(&session).unwrap();
    assert_eq!(totals.count, 1);
    assert_eq!(totals.total_paise, 7050);

    let today = api.list_today_collections(&session).unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].account_no, "1001");
}

#[tokio::test]
async fn test_search_by_trailing_digits() {
    let app = create_test_app();
    let report = parsed_report(
        SOCIETY,
        "12",
        "RAVI",
        vec![
            pigmy_account("1001", "ASHA", 50.0),
            pigmy_account("2001", "MOHAN", 20.0),
            pigmy_account("1002", "LATHA", 10.0),
        ],
    );
    let session = import_and_login(&app.state, &report).await;

    let hits = app.state.collection_api.search(&session, "01").await.unwrap();
    let numbers: Vec<&str> = hits.iter().map(|a| a.account_no.as_str()).collect();
    assert_eq!(numbers, vec!["1001", "2001"]);

    assert!(app
        .state
        .collection_api
        .search(&session, "  ")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_account_in_two_lots_needs_lot_key() {
    let app = create_test_app();
    let pigmy = parsed_report(SOCIETY, "12", "RAVI", vec![pigmy_account("1001", "ASHA", 50.0)]);
    let loan = parsed_report(SOCIETY, "12", "RAVI", vec![loan_account("1001", "ASHA", 900.0)]);
    let session = import_and_login(&app.state, &pigmy).await;
    app.state
        .import_api
        .import_parsed_report(&loan, Some(false))
        .await
        .unwrap();
    let api = &app.state.collection_api;

    let err = api.find_account_by_no(&session, "1001", None).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let loan_account = api
        .find_account_by_no(&session, "1001", Some("021_LOAN_MONTHLY"))
        .unwrap();
    assert_eq!(loan_account.installment_paise, 90_000);

    let lots = api.list_lots(&session).unwrap();
    let keys: Vec<&str> = lots.iter().map(|l| l.lot_key.as_str()).collect();
    assert_eq!(keys, vec!["007_PIGMY_DAILY", "021_LOAN_MONTHLY"]);
    assert_eq!(lots[1].label, "MONTHLY LOAN (021)");

    assert_eq!(api.account_count(&session, None).unwrap(), 2);
    assert_eq!(api.account_count(&session, Some("007_PIGMY_DAILY")).unwrap(), 1);

    let overview = api.overview(&session).unwrap();
    assert_eq!(overview.account_count, 2);
    assert_eq!(overview.lots.len(), 2);
    assert_eq!(overview.today.count, 0);
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() {
    let app = create_test_app();
    let report = parsed_report(SOCIETY, "12", "RAVI", vec![pigmy_account("1001", "ASHA", 50.0)]);
    let session = import_and_login(&app.state, &report).await;
    let api = &app.state.collection_api;
    let account = api.find_account_by_no(&session, "1001", None).unwrap();

    for amount in [0.0, -5.0, f64::NAN, 0.001] {
        let err = api.collect(&session, &account.id, amount, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)), "amount {}", amount);
    }
    assert_eq!(api.today_summary(&session).unwrap().count, 0);
}

#[tokio::test]
async fn test_closed_or_foreign_account_is_rejected() {
    let app = create_test_app();
    let ravi = parsed_report(SOCIETY, "12", "RAVI", vec![pigmy_account("1001", "ASHA", 50.0)]);
    let sunil = parsed_report(SOCIETY, "13", "SUNIL", vec![pigmy_account("3001", "GOPAL", 20.0)]);
    let ravi_session = import_and_login(&app.state, &ravi).await;
    let sunil_session = import_and_login(&app.state, &sunil).await;
    let api = &app.state.collection_api;

    let sunil_account = api.find_account_by_no(&sunil_session, "3001", None).unwrap();
    let err = api
        .collect(&ravi_session, &sunil_account.id, 10.0, None)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let ravi_account = api.find_account_by_no(&ravi_session, "1001", None).unwrap();
    {
        let conn = app.state.conn.lock().unwrap();
        conn.execute(
            "UPDATE account SET status = 'CLOSED' WHERE id = ?1",
            [&ravi_account.id],
        )
        .unwrap();
    }
    let err = api
        .collect(&ravi_session, &ravi_account.id, 10.0, None)
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    // 关闭的账户不出现在检索结果中
    assert!(api.search(&ravi_session, "1001").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pending_rows_carry_lot_context() {
    let app = create_test_app();
    let report = parsed_report(SOCIETY, "12", "RAVI", vec![pigmy_account("1001", "ASHA", 50.0)]);
    let session = import_and_login(&app.state, &report).await;
    let api = &app.state.collection_api;
    let account = api.find_account_by_no(&session, "1001", None).unwrap();
    api.collect(&session, &account.id, 50.0, Some("  ")).unwrap();

    let pending = api.list_pending(&session).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].lot_key(), "007_PIGMY_DAILY");
    assert_eq!(pending[0].lot_label(), "DAILY PIGMY ACCOUNT (007)");
    assert_eq!(pending[0].client_name, "ASHA");
    assert_eq!(pending[0].remarks, None);
}
