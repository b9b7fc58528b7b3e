use std::cmp::Ordering;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    domain::{AccountId, AccountType, MemberId, Role, WorkDomain},
    protocol::{CreateMemberRequest, RegisterStaffRequest, UpdateMemberRequest},
};
use tracing::info;

use crate::{error::Result, http::ApiClient};

/// Member targeted by an action, with the name used in feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub id: MemberId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub id: AccountId,
    pub number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewAccount {
    Formal { monthly_amount: Decimal },
    Informal { target_amount: Option<Decimal> },
}

impl NewAccount {
    pub fn account_type(self) -> AccountType {
        match self {
            NewAccount::Formal { .. } => AccountType::Formal,
            NewAccount::Informal { .. } => AccountType::Informal,
        }
    }
}

/// A validated mutation, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    RegisterMember(CreateMemberRequest),
    UpdateMember {
        member: MemberRef,
        request: UpdateMemberRequest,
    },
    DeactivateMember {
        member: MemberRef,
        reason: String,
    },
    ReactivateMember {
        member: MemberRef,
    },
    PurchaseShares {
        member: MemberRef,
        quantity: u32,
    },
    OpenAccount {
        member_id: MemberId,
        account: NewAccount,
    },
    Deposit {
        account: AccountRef,
        amount: Decimal,
        description: Option<String>,
    },
    Withdraw {
        account: AccountRef,
        amount: Decimal,
        description: Option<String>,
    },
    MonthlyDeposit {
        account: AccountRef,
    },
    DeactivateAccount {
        account: AccountRef,
    },
    ReactivateAccount {
        account: AccountRef,
    },
    CloseAccount {
        account: AccountRef,
    },
    BulkDeposit {
        domain: WorkDomain,
        amount: Decimal,
        description: Option<String>,
    },
    RegisterStaff(RegisterStaffRequest),
    ChangeStaffRole {
        username: String,
        from: Role,
        to: Role,
    },
    DeleteStaff {
        username: String,
    },
}

impl ActionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionRequest::RegisterMember(_) => "register_member",
            ActionRequest::UpdateMember { .. } => "update_member",
            ActionRequest::DeactivateMember { .. } => "deactivate_member",
            ActionRequest::ReactivateMember { .. } => "reactivate_member",
            ActionRequest::PurchaseShares { .. } => "purchase_shares",
            ActionRequest::OpenAccount { .. } => "open_account",
            ActionRequest::Deposit { .. } => "deposit",
            ActionRequest::Withdraw { .. } => "withdraw",
            ActionRequest::MonthlyDeposit { .. } => "monthly_deposit",
            ActionRequest::DeactivateAccount { .. } => "deactivate_account",
            ActionRequest::ReactivateAccount { .. } => "reactivate_account",
            ActionRequest::CloseAccount { .. } => "close_account",
            ActionRequest::BulkDeposit { .. } => "bulk_deposit",
            ActionRequest::RegisterStaff(_) => "register_staff",
            ActionRequest::ChangeStaffRole { .. } => "change_staff_role",
            ActionRequest::DeleteStaff { .. } => "delete_staff",
        }
    }

    /// Title and generic text for a failure notification. The server's own
    /// message replaces the text when it sent one.
    pub fn failure(&self) -> (&'static str, &'static str) {
        match self {
            ActionRequest::RegisterMember(_) => {
                ("Registration Failed", "Failed to register member")
            }
            ActionRequest::UpdateMember { .. } => ("Update Failed", "Failed to update member"),
            ActionRequest::DeactivateMember { .. } => {
                ("Deactivation Failed", "Failed to deactivate member")
            }
            ActionRequest::ReactivateMember { .. } => {
                ("Reactivation Failed", "Failed to reactivate member")
            }
            ActionRequest::PurchaseShares { .. } => {
                ("Purchase Failed", "Failed to purchase shares")
            }
            ActionRequest::OpenAccount { .. } => ("Creation Failed", "Failed to create account"),
            ActionRequest::Deposit { .. }
            | ActionRequest::Withdraw { .. }
            | ActionRequest::MonthlyDeposit { .. } => {
                ("Transaction Failed", "Failed to process transaction")
            }
            ActionRequest::DeactivateAccount { .. } => {
                ("Deactivation Failed", "Failed to deactivate account")
            }
            ActionRequest::ReactivateAccount { .. } => {
                ("Reactivation Failed", "Failed to reactivate account")
            }
            ActionRequest::CloseAccount { .. } => ("Closure Failed", "Failed to close account"),
            ActionRequest::BulkDeposit { .. } => {
                ("Bulk Deposit Failed", "Failed to process bulk deposit")
            }
            ActionRequest::RegisterStaff(_) => ("Creation Failed", "Failed to create staff member"),
            ActionRequest::ChangeStaffRole { .. } => {
                ("Update Failed", "Failed to update staff role")
            }
            ActionRequest::DeleteStaff { .. } => {
                ("Deletion Failed", "Failed to delete staff member")
            }
        }
    }
}

/// Success feedback for a completed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub title: String,
    pub message: String,
}

impl ActionOutcome {
    fn new(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_owned(),
            message: message.into(),
        }
    }
}

/// Sends an [`ActionRequest`] to wherever mutations are applied.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome>;
}

#[async_trait]
impl ActionExecutor for ApiClient {
    async fn execute(&self, request: &ActionRequest) -> Result<ActionOutcome> {
        let outcome = match request {
            ActionRequest::RegisterMember(body) => {
                let member = self.create_member(body).await?;
                ActionOutcome::new(
                    "Member Registered",
                    format!("{} has been successfully registered.", member.full_name()),
                )
            }
            ActionRequest::UpdateMember { member, request } => {
                self.update_member(member.id, request).await?;
                ActionOutcome::new(
                    "Member Updated",
                    format!(
                        "{} {}'s information has been updated.",
                        request.first_name, request.last_name
                    ),
                )
            }
            ActionRequest::DeactivateMember { member, reason } => {
                self.deactivate_member(member.id, reason).await?;
                ActionOutcome::new(
                    "Member Deactivated",
                    format!("{} has been deactivated", member.name),
                )
            }
            ActionRequest::ReactivateMember { member } => {
                self.reactivate_member(member.id).await?;
                ActionOutcome::new(
                    "Member Reactivated",
                    format!("{} has been reactivated", member.name),
                )
            }
            ActionRequest::PurchaseShares { member, quantity } => {
                self.purchase_shares(member.id, *quantity).await?;
                ActionOutcome::new(
                    "Shares Purchased",
                    format!("Successfully purchased {quantity} shares."),
                )
            }
            ActionRequest::OpenAccount { member_id, account } => {
                let opened = match *account {
                    NewAccount::Formal { monthly_amount } => {
                        self.open_formal_account(*member_id, monthly_amount).await?
                    }
                    NewAccount::Informal { target_amount } => {
                        self.open_informal_account(*member_id, target_amount).await?
                    }
                };
                let number = opened
                    .account_number
                    .map(|n| format!(" ({n})"))
                    .unwrap_or_default();
                ActionOutcome::new(
                    "Account Created",
                    format!(
                        "{} account{number} has been successfully created.",
                        account.account_type()
                    ),
                )
            }
            ActionRequest::Deposit {
                account,
                amount,
                description,
            } => {
                self.deposit(account.id, *amount, description.as_deref())
                    .await?;
                ActionOutcome::new(
                    "Deposit Successful",
                    format!(
                        "{} has been deposited to account {}",
                        format_currency(*amount),
                        account.number
                    ),
                )
            }
            ActionRequest::Withdraw {
                account,
                amount,
                description,
            } => {
                self.withdraw(account.id, *amount, description.as_deref())
                    .await?;
                ActionOutcome::new(
                    "Withdrawal Successful",
                    format!(
                        "{} has been withdrawn from account {}",
                        format_currency(*amount),
                        account.number
                    ),
                )
            }
            ActionRequest::MonthlyDeposit { account } => {
                let receipt = self.monthly_deposit(account.id).await?;
                let amount = receipt
                    .amount
                    .map(|a| format!("{} ", format_currency(a)))
                    .unwrap_or_default();
                ActionOutcome::new(
                    "Deposit Successful",
                    format!(
                        "Monthly deposit {amount}recorded for account {}",
                        account.number
                    ),
                )
            }
            ActionRequest::DeactivateAccount { account } => {
                self.deactivate_account(account.id).await?;
                ActionOutcome::new(
                    "Account Deactivated",
                    format!("Account {} has been deactivated", account.number),
                )
            }
            ActionRequest::ReactivateAccount { account } => {
                self.reactivate_account(account.id).await?;
                ActionOutcome::new(
                    "Account Reactivated",
                    format!("Account {} has been reactivated", account.number),
                )
            }
            ActionRequest::CloseAccount { account } => {
                self.close_account(account.id).await?;
                ActionOutcome::new(
                    "Account Closed",
                    format!("Account {} has been closed", account.number),
                )
            }
            ActionRequest::BulkDeposit {
                domain,
                amount,
                description,
            } => {
                let response = self
                    .bulk_deposit(*domain, *amount, description.as_deref())
                    .await?;
                let totals = response.totals();
                ActionOutcome::new(
                    "Bulk Deposit Completed",
                    format!(
                        "Successfully deposited to {} accounts. Total: {}",
                        totals.success_count,
                        format_currency(totals.total_amount)
                    ),
                )
            }
            ActionRequest::RegisterStaff(body) => {
                self.register_staff(body).await?;
                ActionOutcome::new(
                    "Staff Created",
                    format!("Staff member {} created successfully", body.username),
                )
            }
            ActionRequest::ChangeStaffRole { username, from, to } => {
                self.update_staff_role(username, *to).await?;
                ActionOutcome::new(
                    "Role Updated",
                    format!("{username} has been {} to {to}", role_change_verb(*from, *to)),
                )
            }
            ActionRequest::DeleteStaff { username } => {
                self.delete_staff(username).await?;
                ActionOutcome::new(
                    "Staff Deleted",
                    format!("Staff member {username} deleted successfully"),
                )
            }
        };
        info!(action = request.kind(), "action: {}", outcome.title);
        Ok(outcome)
    }
}

/// "promoted" or "demoted" along the role hierarchy.
pub fn role_change_verb(from: Role, to: Role) -> &'static str {
    match to.cmp(&from) {
        Ordering::Greater => "promoted",
        Ordering::Less => "demoted",
        Ordering::Equal => "updated",
    }
}

/// `ETB 1,500.00`
pub fn format_currency(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.abs().round_dp(2));
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}ETB {grouped}.{cents}")
}
