use super::*;
use rust_decimal::Decimal;
use shared::domain::{AccountId, MemberId, Role, WorkDomain};

fn member(id: i64, active: bool) -> Member {
    Member {
        id: MemberId(id),
        first_name: "Abebe".into(),
        last_name: "Kebede".into(),
        employee_id: format!("EMP{id:03}"),
        work_domain: WorkDomain::Academic,
        email: None,
        phone_number: Some("+251 911 000 000".into()),
        registration_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        registration_fee: Decimal::from(500),
        is_active: active,
        deactivation_date: None,
        deactivation_reason: None,
        shares: None,
        saving_accounts: None,
    }
}

fn account(kind: AccountType, active: bool) -> SavingAccount {
    SavingAccount {
        id: AccountId(1),
        account_number: "ACC001".into(),
        account_type: kind,
        current_balance: Decimal::new(250000, 2),
        opening_date: None,
        is_active: active,
        monthly_amount: None,
        target_amount: Some(Decimal::from(10000)),
        member_id: None,
        transactions: None,
    }
}

#[test]
fn member_actions_follow_status() {
    assert_eq!(
        member(1, true).row_actions(None),
        vec![
            RowAction::Update,
            RowAction::PurchaseShares,
            RowAction::Deactivate
        ]
    );
    assert_eq!(member(1, false).row_actions(None), vec![RowAction::Reactivate]);
}

#[test]
fn withdraw_is_offered_only_on_active_informal_accounts() {
    assert_eq!(
        account(AccountType::Informal, true).row_actions(None),
        vec![RowAction::Deposit, RowAction::Withdraw, RowAction::Deactivate]
    );
    assert_eq!(
        account(AccountType::Formal, true).row_actions(None),
        vec![RowAction::Deposit, RowAction::Deactivate]
    );
    assert_eq!(
        account(AccountType::Informal, false).row_actions(None),
        vec![RowAction::Reactivate]
    );
}

#[test]
fn own_staff_row_has_no_actions() {
    let me = StaffUser {
        username: "admin".into(),
        role: Role::Admin,
    };
    assert!(me.row_actions(Some("admin")).is_empty());
    assert_eq!(
        me.row_actions(Some("other")),
        vec![RowAction::ChangeRole, RowAction::Delete]
    );
}

#[test]
fn projection_marks_sorted_column_and_formats_cells() {
    let query = ListQuery::new("employeeId").with_sort("employeeId", SortDirection::Desc);
    let page = Page::new(vec![member(7, true)], 11, 0, 10);
    let view = project(&member_columns(), &page, &query, Some("clerk"));

    let sorted: Vec<_> = view
        .headers
        .iter()
        .filter(|h| h.indicator.is_some())
        .collect();
    assert_eq!(sorted.len(), 1);
    assert_eq!(sorted[0].label(), "Employee ID ↓");
    assert!(!view.headers[3].sortable());

    let row = &view.rows[0];
    assert_eq!(row.cells[0], "Abebe Kebede");
    assert_eq!(row.cells[2], "Academic Staff");
    assert_eq!(row.cells[3], "+251 911 000 000");
    assert_eq!(row.cells[4], "Mar 1, 2024");
    assert_eq!(view.summary.to_string(), "Showing 1 of 11 · Page 1 of 2");
}

#[test]
fn header_click_toggles_same_column_and_starts_new_ascending() {
    let query = ListQuery::new("firstName").with_sort("firstName", SortDirection::Asc);
    let page: Page<Member> = Page::new(Vec::new(), 0, 0, 10);
    let view = project(&member_columns(), &page, &query, None);

    assert_eq!(
        view.headers[0].click(&query),
        Some(("firstName", SortDirection::Desc))
    );
    assert_eq!(
        view.headers[1].click(&query),
        Some(("employeeId", SortDirection::Asc))
    );
    assert_eq!(view.headers[5].click(&query), None);
}

#[test]
fn informal_balance_shows_target_progress() {
    let view = project(
        &account_columns(),
        &Page::new(vec![account(AccountType::Informal, true)], 1, 0, 10),
        &ListQuery::new("id"),
        None,
    );
    assert_eq!(view.rows[0].cells[2], "ETB 2,500.00 (25.0% of target)");
}
