use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, MemberId, Role, WorkDomain};

/// Spring-style page envelope as returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub last: bool,
    #[serde(default)]
    pub number_of_elements: u64,
}

/// A list endpoint answers either with a bare array or with a page envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Items(Vec<T>),
    Envelope(PageEnvelope<T>),
}

/// `{message, data}` wrapper used by the auth and account endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStaffRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub first_name: String,
    pub last_name: String,
    pub employee_id: String,
    pub work_domain: WorkDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCounts {
    #[serde(default)]
    pub total_members: u64,
    #[serde(default)]
    pub active_members: u64,
    #[serde(default)]
    pub inactive_members: u64,
}

/// Body of a successful deposit, withdrawal, or monthly deposit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub transaction_id: Option<i64>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub new_balance: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOpened {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub member_id: Option<MemberId>,
}

/// Body of close/deactivate/reactivate on an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatusChange {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharesPurchased {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub quantity_purchased: Option<u32>,
    #[serde(default)]
    pub total_shares: Option<u32>,
    #[serde(default)]
    pub total_share_value: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDepositTotals {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub total_amount: Decimal,
}

/// Bulk deposit answer. The aggregate counts are reported either at the top
/// level or nested under `results`, so both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDepositResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub work_domain: Option<WorkDomain>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub results: Option<BulkDepositTotals>,
    #[serde(default)]
    pub success_count: Option<u64>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

impl BulkDepositResponse {
    pub fn totals(&self) -> BulkDepositTotals {
        let nested = self.results.unwrap_or_default();
        BulkDepositTotals {
            success_count: self.success_count.unwrap_or(nested.success_count),
            failure_count: nested.failure_count,
            total_amount: self.total_amount.unwrap_or(nested.total_amount),
        }
    }
}

/// Plain `{message}` acknowledgement for the remaining mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}
