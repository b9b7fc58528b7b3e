//! Typed endpoints per resource and the list sources the views fetch from.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    domain::{AccountId, Member, MemberId, Role, SavingAccount, StaffUser, WorkDomain},
    protocol::{
        Acknowledgement, AccountOpened, AccountStatusChange, ApiResponse, BulkDepositResponse,
        CreateMemberRequest, ListResponse, MemberCounts, RegisterStaffRequest, SharesPurchased,
        TransactionReceipt, UpdateMemberRequest, UpdateRoleRequest,
    },
};
use tracing::debug;

use crate::{
    error::Result,
    http::ApiClient,
    page::{matches_status, Filterable, ListQuery, Listing},
};

/// Filter keys understood by the built-in sources.
pub mod filter_keys {
    pub const STATUS: &str = "status";
    pub const WORK_DOMAIN: &str = "workDomain";
    pub const ACCOUNT_TYPE: &str = "accountType";
    pub const ROLE: &str = "role";
}

/// Where a list view gets its pages from.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    /// Whether the endpoint chosen for `query` applies filter `key` itself.
    /// Everything else is post-filtered by the controller.
    fn handles_filter(&self, _key: &str, _query: &ListQuery) -> bool {
        false
    }

    async fn fetch_listing(&self, query: &ListQuery) -> Result<Listing<T>>;
}

impl Filterable for Member {
    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            filter_keys::STATUS => matches_status(self.is_active, value),
            filter_keys::WORK_DOMAIN => WorkDomain::parse(value)
                .map_or(true, |domain| domain == self.work_domain),
            _ => true,
        }
    }
}

impl Filterable for SavingAccount {
    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            filter_keys::STATUS => matches_status(self.is_active, value),
            filter_keys::ACCOUNT_TYPE => shared::domain::AccountType::parse(value)
                .map_or(true, |kind| kind == self.account_type),
            _ => true,
        }
    }
}

impl Filterable for StaffUser {
    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            filter_keys::ROLE => Role::parse(value).map_or(true, |role| role == self.role),
            _ => true,
        }
    }
}

/// `sort=field,dir` as the member and account endpoints expect it.
fn combined_sort(query: &ListQuery) -> String {
    format!("{},{}", query.sort_field, query.sort_direction)
}

fn window_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    vec![
        ("page", query.page_index.to_string()),
        ("size", query.page_size.to_string()),
        ("sort", combined_sort(query)),
    ]
}

/// Which members endpoint serves a query. Search wins over the domain
/// filter, which wins over the plain listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRoute {
    Search(String),
    Domain(WorkDomain),
    All { include_inactive: bool },
}

impl MemberRoute {
    pub fn for_query(query: &ListQuery) -> Self {
        if let Some(text) = query.search() {
            return MemberRoute::Search(text.to_owned());
        }
        if let Some(domain) = query.filter(filter_keys::WORK_DOMAIN).and_then(WorkDomain::parse) {
            return MemberRoute::Domain(domain);
        }
        let only_active = query
            .filter(filter_keys::STATUS)
            .is_some_and(|status| status.eq_ignore_ascii_case("active"));
        MemberRoute::All {
            include_inactive: !only_active,
        }
    }
}

impl ApiClient {
    pub async fn list_members(&self, query: &ListQuery) -> Result<Listing<Member>> {
        let mut params = window_params(query);
        let route = MemberRoute::for_query(query);
        debug!(?route, page = query.page_index, "members: fetching");
        match route {
            MemberRoute::Search(text) => {
                params.insert(0, ("q", text));
                self.get_listing(&["members", "search"], &params, query).await
            }
            MemberRoute::Domain(domain) => {
                self.get_listing(&["members", "domain", domain.as_str()], &params, query)
                    .await
            }
            MemberRoute::All { include_inactive } => {
                if include_inactive {
                    params.push(("includeInactive", "true".to_owned()));
                }
                self.get_listing(&["members"], &params, query).await
            }
        }
    }

    pub async fn member(&self, id: MemberId) -> Result<Member> {
        self.get(&["members", &id.to_string()], &[]).await
    }

    /// Member with shares and saving accounts expanded.
    pub async fn member_full(&self, id: MemberId) -> Result<Member> {
        self.get(&["members", &id.to_string(), "full"], &[]).await
    }

    pub async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member> {
        self.post_json(&["members"], request).await
    }

    pub async fn update_member(
        &self,
        id: MemberId,
        request: &UpdateMemberRequest,
    ) -> Result<Member> {
        self.put_json(&["members", &id.to_string()], request).await
    }

    pub async fn deactivate_member(&self, id: MemberId, reason: &str) -> Result<Acknowledgement> {
        self.put(
            &["members", &id.to_string(), "deactivate"],
            &[("reason", reason.to_owned())],
        )
        .await
    }

    pub async fn reactivate_member(&self, id: MemberId) -> Result<Acknowledgement> {
        self.put(&["members", &id.to_string(), "reactivate"], &[])
            .await
    }

    pub async fn purchase_shares(&self, id: MemberId, quantity: u32) -> Result<SharesPurchased> {
        self.post(
            &["members", &id.to_string(), "shares"],
            &[("quantity", quantity.to_string())],
        )
        .await
    }

    pub async fn member_counts(&self) -> Result<MemberCounts> {
        self.get(&["members", "stats", "count"], &[]).await
    }

    pub async fn list_accounts(&self, query: &ListQuery) -> Result<Listing<SavingAccount>> {
        let mut params = window_params(query);
        if let Some(text) = query.search() {
            params.push(("search", text.to_owned()));
        }
        debug!(page = query.page_index, "accounts: fetching");
        self.get_listing(&["accounts"], &params, query).await
    }

    pub async fn account(&self, id: AccountId) -> Result<SavingAccount> {
        self.get(&["accounts", &id.to_string()], &[]).await
    }

    pub async fn member_accounts(&self, member_id: MemberId) -> Result<Vec<SavingAccount>> {
        self.get(&["accounts", "member", &member_id.to_string()], &[])
            .await
    }

    pub async fn open_formal_account(
        &self,
        member_id: MemberId,
        monthly_amount: Decimal,
    ) -> Result<AccountOpened> {
        self.post(
            &["accounts", "formal"],
            &[
                ("memberId", member_id.to_string()),
                ("monthlyAmount", monthly_amount.to_string()),
            ],
        )
        .await
    }

    pub async fn open_informal_account(
        &self,
        member_id: MemberId,
        target_amount: Option<Decimal>,
    ) -> Result<AccountOpened> {
        let mut params = vec![("memberId", member_id.to_string())];
        if let Some(target) = target_amount {
            params.push(("targetAmount", target.to_string()));
        }
        self.post(&["accounts", "informal"], &params).await
    }

    pub async fn deposit(
        &self,
        id: AccountId,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransactionReceipt> {
        let params = amount_params(amount, description);
        self.post(&["accounts", &id.to_string(), "deposit"], &params)
            .await
    }

    pub async fn monthly_deposit(&self, id: AccountId) -> Result<TransactionReceipt> {
        self.post(&["accounts", &id.to_string(), "deposit", "monthly"], &[])
            .await
    }

    pub async fn withdraw(
        &self,
        id: AccountId,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransactionReceipt> {
        let params = amount_params(amount, description);
        self.post(&["accounts", &id.to_string(), "withdraw"], &params)
            .await
    }

    pub async fn close_account(&self, id: AccountId) -> Result<AccountStatusChange> {
        self.put(&["accounts", &id.to_string(), "close"], &[]).await
    }

    pub async fn deactivate_account(&self, id: AccountId) -> Result<AccountStatusChange> {
        self.put(&["accounts", &id.to_string(), "deactivate"], &[])
            .await
    }

    pub async fn reactivate_account(&self, id: AccountId) -> Result<AccountStatusChange> {
        self.put(&["accounts", &id.to_string(), "reactivate"], &[])
            .await
    }

    pub async fn bulk_deposit(
        &self,
        domain: WorkDomain,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<BulkDepositResponse> {
        let mut params = vec![
            ("workDomain", domain.as_str().to_owned()),
            ("amount", amount.to_string()),
        ];
        if let Some(description) = description {
            params.push(("description", description.to_owned()));
        }
        self.post(&["accounts", "bulk-deposit"], &params).await
    }

    pub async fn list_staff(&self, query: &ListQuery) -> Result<Listing<StaffUser>> {
        let mut params = vec![
            ("page", query.page_index.to_string()),
            ("size", query.page_size.to_string()),
            ("sort", query.sort_field.clone()),
            ("direction", query.sort_direction.as_str().to_owned()),
        ];
        if let Some(text) = query.search() {
            params.push(("search", text.to_owned()));
        }
        let wrapped: ApiResponse<ListResponse<StaffUser>> =
            self.get(&["auth", "staff"], &params).await?;
        Ok(wrapped
            .data
            .map(|data| Listing::from_response(data, query))
            .unwrap_or(Listing::Complete(Vec::new())))
    }

    pub async fn register_staff(&self, request: &RegisterStaffRequest) -> Result<Acknowledgement> {
        self.post_json(&["auth", "register"], request).await
    }

    pub async fn delete_staff(&self, username: &str) -> Result<Acknowledgement> {
        self.delete(&["auth", "staff", username]).await
    }

    pub async fn update_staff_role(&self, username: &str, role: Role) -> Result<Acknowledgement> {
        self.put_json(&["auth", "staff", username, "role"], &UpdateRoleRequest { role })
            .await
    }
}

fn amount_params(amount: Decimal, description: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![("amount", amount.to_string())];
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        params.push(("description", description.to_owned()));
    }
    params
}

pub struct MemberSource {
    api: Arc<ApiClient>,
}

impl MemberSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource<Member> for MemberSource {
    fn handles_filter(&self, key: &str, query: &ListQuery) -> bool {
        key == filter_keys::WORK_DOMAIN
            && matches!(MemberRoute::for_query(query), MemberRoute::Domain(_))
    }

    async fn fetch_listing(&self, query: &ListQuery) -> Result<Listing<Member>> {
        self.api.list_members(query).await
    }
}

pub struct AccountSource {
    api: Arc<ApiClient>,
}

impl AccountSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource<SavingAccount> for AccountSource {
    async fn fetch_listing(&self, query: &ListQuery) -> Result<Listing<SavingAccount>> {
        self.api.list_accounts(query).await
    }
}

pub struct StaffSource {
    api: Arc<ApiClient>,
}

impl StaffSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource<StaffUser> for StaffSource {
    async fn fetch_listing(&self, query: &ListQuery) -> Result<Listing<StaffUser>> {
        self.api.list_staff(query).await
    }
}

#[cfg(test)]
#[path = "tests/resources_tests.rs"]
mod tests;
