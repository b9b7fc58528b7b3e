use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(MemberId);
id_newtype!(AccountId);
id_newtype!(ShareId);
id_newtype!(TransactionId);

/// Staff role. Declaration order is the privilege order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Assistant,
    Manager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Assistant, Role::Manager, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Assistant => "ASSISTANT",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkDomain {
    Academic,
    Administration,
    Contract,
    Other,
}

impl WorkDomain {
    pub const ALL: [WorkDomain; 4] = [
        WorkDomain::Academic,
        WorkDomain::Administration,
        WorkDomain::Contract,
        WorkDomain::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkDomain::Academic => "ACADEMIC",
            WorkDomain::Administration => "ADMINISTRATION",
            WorkDomain::Contract => "CONTRACT",
            WorkDomain::Other => "OTHER",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkDomain::Academic => "Academic Staff",
            WorkDomain::Administration => "Administration",
            WorkDomain::Contract => "Contract Workers",
            WorkDomain::Other => "Other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for WorkDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Formal,
    Informal,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Formal => "FORMAL",
            AccountType::Informal => "INFORMAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FORMAL" => Some(AccountType::Formal),
            "INFORMAL" => Some(AccountType::Informal),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Interest,
    Penalty,
    Fee,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub id: ShareId,
    pub share_value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    pub certificate_number: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<NaiveDateTime>,
    pub reference_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingAccount {
    pub id: AccountId,
    pub account_number: String,
    pub account_type: AccountType,
    pub current_balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_date: Option<NaiveDate>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<Decimal>,
    /// Owning member, when the backend includes the linkage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<MemberId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
}

impl SavingAccount {
    /// Percentage of the target reached, capped at 100. Only informal
    /// accounts with a positive target have progress.
    pub fn target_progress(&self) -> Option<Decimal> {
        let target = self.target_amount.filter(|t| !t.is_zero())?;
        if self.account_type != AccountType::Informal {
            return None;
        }
        let pct = self.current_balance / target * Decimal::ONE_HUNDRED;
        Some(pct.min(Decimal::ONE_HUNDRED).round_dp(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub employee_id: String,
    pub work_domain: WorkDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_fee: Decimal,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivation_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<Vec<Share>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saving_accounts: Option<Vec<SavingAccount>>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .collect()
    }

    pub fn owns_account(&self, account_id: AccountId) -> bool {
        self.saving_accounts
            .as_deref()
            .is_some_and(|accounts| accounts.iter().any(|a| a.id == account_id))
    }
}

/// Staff login as listed by the staff-management endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUser {
    pub username: String,
    pub role: Role,
}
