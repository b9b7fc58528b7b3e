//! Stateless projection of a page into header cells and rows.

use std::fmt;

use chrono::NaiveDate;
use shared::domain::{AccountType, Member, SavingAccount, StaffUser};

use crate::{
    actions::format_currency,
    owners::AccountWithOwner,
    page::{ListQuery, Page, PageSummary, SortDirection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Update,
    PurchaseShares,
    Deactivate,
    Reactivate,
    Deposit,
    Withdraw,
    ChangeRole,
    Delete,
}

impl RowAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RowAction::Update => "update",
            RowAction::PurchaseShares => "purchase_shares",
            RowAction::Deactivate => "deactivate",
            RowAction::Reactivate => "reactivate",
            RowAction::Deposit => "deposit",
            RowAction::Withdraw => "withdraw",
            RowAction::ChangeRole => "change_role",
            RowAction::Delete => "delete",
        }
    }
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which row actions to offer. Advisory only; the service has the final say.
pub trait RowActions {
    /// `viewer` is the signed-in username, if any.
    fn row_actions(&self, viewer: Option<&str>) -> Vec<RowAction>;
}

impl RowActions for Member {
    fn row_actions(&self, _viewer: Option<&str>) -> Vec<RowAction> {
        if self.is_active {
            vec![
                RowAction::Update,
                RowAction::PurchaseShares,
                RowAction::Deactivate,
            ]
        } else {
            vec![RowAction::Reactivate]
        }
    }
}

impl RowActions for SavingAccount {
    fn row_actions(&self, _viewer: Option<&str>) -> Vec<RowAction> {
        if !self.is_active {
            return vec![RowAction::Reactivate];
        }
        let mut actions = vec![RowAction::Deposit];
        if self.account_type == AccountType::Informal {
            actions.push(RowAction::Withdraw);
        }
        actions.push(RowAction::Deactivate);
        actions
    }
}

impl RowActions for AccountWithOwner {
    fn row_actions(&self, viewer: Option<&str>) -> Vec<RowAction> {
        self.account.row_actions(viewer)
    }
}

impl RowActions for StaffUser {
    fn row_actions(&self, viewer: Option<&str>) -> Vec<RowAction> {
        if viewer == Some(self.username.as_str()) {
            Vec::new()
        } else {
            vec![RowAction::ChangeRole, RowAction::Delete]
        }
    }
}

pub struct Column<T> {
    pub title: &'static str,
    /// Backend field to sort by; `None` for unsortable columns.
    pub sort_key: Option<&'static str>,
    pub cell: fn(&T) -> String,
}

impl<T> Column<T> {
    pub fn sortable(title: &'static str, sort_key: &'static str, cell: fn(&T) -> String) -> Self {
        Self {
            title,
            sort_key: Some(sort_key),
            cell,
        }
    }

    pub fn plain(title: &'static str, cell: fn(&T) -> String) -> Self {
        Self {
            title,
            sort_key: None,
            cell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub title: &'static str,
    pub sort_key: Option<&'static str>,
    /// Set on the column the page is currently sorted by.
    pub indicator: Option<SortDirection>,
}

impl HeaderCell {
    pub fn sortable(&self) -> bool {
        self.sort_key.is_some()
    }

    /// The sort a click on this header asks for.
    pub fn click(&self, query: &ListQuery) -> Option<(&'static str, SortDirection)> {
        let key = self.sort_key?;
        Some((key, query.next_sort_direction(key)))
    }

    pub fn label(&self) -> String {
        match self.indicator {
            Some(SortDirection::Asc) => format!("{} ↑", self.title),
            Some(SortDirection::Desc) => format!("{} ↓", self.title),
            None => self.title.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub actions: Vec<RowAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<TableRow>,
    pub summary: PageSummary,
}

pub fn project<T: RowActions>(
    columns: &[Column<T>],
    page: &Page<T>,
    query: &ListQuery,
    viewer: Option<&str>,
) -> TableView {
    let headers = columns
        .iter()
        .map(|column| HeaderCell {
            title: column.title,
            sort_key: column.sort_key,
            indicator: column
                .sort_key
                .filter(|key| *key == query.sort_field)
                .map(|_| query.sort_direction),
        })
        .collect();
    let rows = page
        .items
        .iter()
        .map(|item| TableRow {
            cells: columns.iter().map(|column| (column.cell)(item)).collect(),
            actions: item.row_actions(viewer),
        })
        .collect();
    TableView {
        headers,
        rows,
        summary: page.summary(),
    }
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_owned(), |d| d.format("%b %-d, %Y").to_string())
}

fn status_cell(is_active: bool) -> String {
    if is_active { "Active" } else { "Inactive" }.to_owned()
}

pub fn member_columns() -> Vec<Column<Member>> {
    type C = Column<Member>;
    vec![
        C::sortable("Name", "firstName", |m| m.full_name()),
        C::sortable("Employee ID", "employeeId", |m| m.employee_id.clone()),
        C::sortable("Work Domain", "workDomain", |m| m.work_domain.label().to_owned()),
        C::plain("Contact", |m| {
            m.email
                .clone()
                .or_else(|| m.phone_number.clone())
                .unwrap_or_else(|| "-".to_owned())
        }),
        C::sortable("Registered", "registrationDate", |m| {
            date_cell(m.registration_date)
        }),
        C::plain("Status", |m| status_cell(m.is_active)),
    ]
}

fn balance_cell(account: &SavingAccount) -> String {
    let balance = format_currency(account.current_balance);
    match account.target_progress() {
        Some(progress) => format!("{balance} ({progress:.1}% of target)"),
        None => balance,
    }
}

pub fn account_columns() -> Vec<Column<SavingAccount>> {
    type C = Column<SavingAccount>;
    vec![
        C::sortable("Account", "accountNumber", |a| a.account_number.clone()),
        C::sortable("Type", "accountType", |a| a.account_type.to_string()),
        C::sortable("Balance", "currentBalance", balance_cell),
        C::plain("Monthly", |a| {
            a.monthly_amount
                .map_or_else(|| "-".to_owned(), format_currency)
        }),
        C::sortable("Opened", "openingDate", |a| date_cell(a.opening_date)),
        C::plain("Status", |a| status_cell(a.is_active)),
    ]
}

pub fn enforcement_columns() -> Vec<Column<AccountWithOwner>> {
    type C = Column<AccountWithOwner>;
    vec![
        C::sortable("Account", "accountNumber", |r| r.account.account_number.clone()),
        C::plain("Owner", |r| {
            if r.placeholder {
                format!("{} (unresolved)", r.owner.full_name())
            } else {
                r.owner.full_name()
            }
        }),
        C::plain("Domain", |r| r.owner.work_domain.label().to_owned()),
        C::sortable("Type", "accountType", |r| r.account.account_type.to_string()),
        C::sortable("Balance", "currentBalance", |r| balance_cell(&r.account)),
        C::plain("Status", |r| status_cell(r.account.is_active)),
    ]
}

pub fn staff_columns() -> Vec<Column<StaffUser>> {
    type C = Column<StaffUser>;
    vec![
        C::sortable("Username", "username", |s| s.username.clone()),
        C::sortable("Role", "role", |s| s.role.to_string()),
    ]
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
