//! Action modal payloads.
//!
//! A form holds what the user typed, exactly as typed. `submit` trims it,
//! checks it and either yields an [`ActionRequest`] or the per-field
//! messages to show next to the inputs. Forms never talk to the service.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use shared::{
    domain::{AccountType, MemberId, Role, WorkDomain},
    protocol::{CreateMemberRequest, RegisterStaffRequest, UpdateMemberRequest},
};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::actions::{format_currency, AccountRef, ActionRequest, MemberRef, NewAccount};

pub const MIN_MONTHLY_AMOUNT: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Digits, spaces, dashes and parentheses with an optional leading `+`.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[\d\s\-()]+$").expect("phone regex is invalid")
});

/// Field name to message, first failure per field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    /// Records `message` when `value` is missing and passes the value on.
    fn require<T>(&mut self, value: Option<T>, field: &str, message: &str) -> Option<T> {
        if value.is_none() {
            self.add(field, message);
        }
        value
    }

    fn absorb(&mut self, result: Result<(), ValidationErrors>) {
        if let Err(errors) = result {
            for (field, message) in FieldErrors::from(errors).0 {
                self.0.entry(field).or_insert(message);
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        for (field, list) in errors.field_errors() {
            if let Some(first) = list.first() {
                let message = first
                    .message
                    .as_ref()
                    .map_or_else(|| first.code.to_string(), |m| m.to_string());
                out.add(&field, message);
            }
        }
        out
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{0}")]
    Invalid(FieldErrors),
}

impl FormError {
    pub fn fields(&self) -> &FieldErrors {
        match self {
            FormError::Invalid(fields) => fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields().get(name)
    }
}

fn finish<T>(errors: FieldErrors, value: Option<T>) -> Result<T, FormError> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(FormError::Invalid(errors)),
    }
}

fn trimmed(raw: &str) -> String {
    raw.trim().to_owned()
}

fn optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct RegisterMemberForm {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Employee ID is required"))]
    pub employee_id: String,
    /// Wire name of the domain, as picked from the select.
    pub work_domain: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Please enter a valid phone number"))]
    pub phone_number: Option<String>,
}

impl RegisterMemberForm {
    fn normalized(&self) -> Self {
        Self {
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
            employee_id: trimmed(&self.employee_id),
            work_domain: trimmed(&self.work_domain),
            email: optional(self.email.as_deref()),
            phone_number: optional(self.phone_number.as_deref()),
        }
    }

    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let form = self.normalized();
        let mut errors = FieldErrors::default();
        errors.absorb(form.validate());
        let work_domain = errors.require(
            WorkDomain::parse(&form.work_domain),
            "work_domain",
            "Work domain is required",
        );
        let work_domain = finish(errors, work_domain)?;
        Ok(ActionRequest::RegisterMember(CreateMemberRequest {
            first_name: form.first_name,
            last_name: form.last_name,
            employee_id: form.employee_id,
            work_domain,
            email: form.email,
            phone_number: form.phone_number,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct UpdateMemberForm {
    pub member: MemberRef,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Please enter a valid phone number"))]
    pub phone_number: Option<String>,
}

impl UpdateMemberForm {
    /// Pre-filled from the member being edited.
    pub fn for_member(member: &shared::domain::Member) -> Self {
        Self {
            member: MemberRef {
                id: member.id,
                name: member.full_name(),
            },
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            email: member.email.clone(),
            phone_number: member.phone_number.clone(),
        }
    }

    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let form = Self {
            member: self.member.clone(),
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
            email: optional(self.email.as_deref()),
            phone_number: optional(self.phone_number.as_deref()),
        };
        let mut errors = FieldErrors::default();
        errors.absorb(form.validate());

        finish(errors, Some(()))?;
        Ok(ActionRequest::UpdateMember {
            member: form.member,
            request: UpdateMemberRequest {
                first_name: form.first_name,
                last_name: form.last_name,
                email: form.email,
                phone_number: form.phone_number,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountForm {
    pub member_id: String,
    pub account_type: AccountType,
    pub monthly_amount: String,
    pub target_amount: String,
}

impl CreateAccountForm {
    pub fn new(account_type: AccountType) -> Self {
        Self {
            member_id: String::new(),
            account_type,
            monthly_amount: MIN_MONTHLY_AMOUNT.to_string(),
            target_amount: String::new(),
        }
    }

    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let mut errors = FieldErrors::default();
        let member_id = errors.require(
            self.member_id
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .map(MemberId),
            "member_id",
            "Member ID must be a positive number",
        );

        let account = match self.account_type {
            AccountType::Formal => errors
                .require(
                    parse_amount(&self.monthly_amount).filter(|a| *a >= MIN_MONTHLY_AMOUNT),
                    "monthly_amount",
                    "Monthly amount must be at least 500",
                )
                .map(|monthly_amount| NewAccount::Formal { monthly_amount }),
            AccountType::Informal if self.target_amount.trim().is_empty() => {
                Some(NewAccount::Informal {
                    target_amount: None,
                })
            }
            AccountType::Informal => errors
                .require(
                    parse_amount(&self.target_amount).filter(|a| *a >= Decimal::ONE),
                    "target_amount",
                    "Target amount must be at least 1",
                )
                .map(|target| NewAccount::Informal {
                    target_amount: Some(target),
                }),
        };

        let (member_id, account) = finish(errors, member_id.zip(account))?;
        Ok(ActionRequest::OpenAccount { member_id, account })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionForm {
    pub account: AccountRef,
    /// Balance shown in the modal; caps withdrawals.
    pub balance: Decimal,
    pub kind: TransactionKind,
    pub amount: String,
    pub description: String,
}

impl TransactionForm {
    pub fn new(account: AccountRef, balance: Decimal, kind: TransactionKind) -> Self {
        Self {
            account,
            balance,
            kind,
            amount: String::new(),
            description: String::new(),
        }
    }

    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let mut errors = FieldErrors::default();
        let amount = errors.require(
            parse_amount(&self.amount).filter(|a| *a > Decimal::ZERO),
            "amount",
            "Amount must be greater than 0",
        );
        if self.kind == TransactionKind::Withdraw
            && amount.is_some_and(|amount| amount > self.balance)
        {
            errors.add(
                "amount",
                format!("Maximum withdrawal: {}", format_currency(self.balance)),
            );
        }

        let amount = finish(errors, amount)?;
        let account = self.account.clone();
        let description = optional(Some(&self.description));
        Ok(match self.kind {
            TransactionKind::Deposit => ActionRequest::Deposit {
                account,
                amount,
                description,
            },
            TransactionKind::Withdraw => ActionRequest::Withdraw {
                account,
                amount,
                description,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivateMemberForm {
    pub member: MemberRef,
    pub reason: String,
}

impl DeactivateMemberForm {
    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let reason = self.reason.trim();
        let mut errors = FieldErrors::default();
        let reason = errors.require(
            (!reason.is_empty()).then(|| reason.to_owned()),
            "reason",
            "Please provide a reason for deactivation",
        );
        let reason = finish(errors, reason)?;
        Ok(ActionRequest::DeactivateMember {
            member: self.member.clone(),
            reason,
        })
    }
}

#[derive(Debug, Validate)]
struct ShareQuantity {
    #[validate(range(
        min = 1,
        max = 10,
        message = "You can purchase between 1 and 10 shares at a time"
    ))]
    quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseSharesForm {
    pub member: MemberRef,
    pub quantity: String,
}

impl PurchaseSharesForm {
    pub fn new(member: MemberRef) -> Self {
        Self {
            member,
            quantity: "1".to_owned(),
        }
    }

    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let mut errors = FieldErrors::default();
        let quantity = errors.require(
            self.quantity.trim().parse::<u32>().ok(),
            "quantity",
            "Quantity must be a whole number",
        );
        if let Some(quantity) = quantity {
            errors.absorb(ShareQuantity { quantity }.validate());
        }
        let quantity = finish(errors, quantity)?;
        Ok(ActionRequest::PurchaseShares {
            member: self.member.clone(),
            quantity,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDepositForm {
    pub work_domain: String,
    pub amount: String,
    pub description: String,
}

impl BulkDepositForm {
    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let mut errors = FieldErrors::default();
        let domain = WorkDomain::parse(self.work_domain.trim());
        if domain.is_none() || self.amount.trim().is_empty() {
            errors.add("form", "Please select a domain and enter an amount");
        }
        let amount = parse_amount(&self.amount).filter(|a| *a > Decimal::ZERO);
        if amount.is_none() {
            errors.add("amount", "Amount must be greater than 0");
        }

        let (domain, amount) = finish(errors, domain.zip(amount))?;
        Ok(ActionRequest::BulkDeposit {
            domain,
            amount,
            description: optional(Some(&self.description)),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct RegisterStaffForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub role: String,
}

impl RegisterStaffForm {
    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        // Passwords are sent exactly as typed.
        let form = Self {
            username: trimmed(&self.username),
            password: self.password.clone(),
            role: trimmed(&self.role),
        };
        let mut errors = FieldErrors::default();
        errors.absorb(form.validate());
        let role = errors.require(Role::parse(&form.role), "role", "Role is required");

        let role = finish(errors, role)?;
        Ok(ActionRequest::RegisterStaff(RegisterStaffRequest {
            username: form.username,
            password: form.password,
            role,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRoleForm {
    pub username: String,
    pub current: Role,
    pub new_role: String,
}

impl ChangeRoleForm {
    pub fn new(username: impl Into<String>, current: Role) -> Self {
        Self {
            username: username.into(),
            current,
            new_role: current.as_str().to_owned(),
        }
    }

    pub fn submit(&self) -> Result<ActionRequest, FormError> {
        let mut errors = FieldErrors::default();
        let to = errors.require(
            Role::parse(self.new_role.trim()),
            "new_role",
            "Role is required",
        );
        if to == Some(self.current) {
            errors.add("new_role", "New role must be different from the current role");
        }

        let to = finish(errors, to)?;
        Ok(ActionRequest::ChangeStaffRole {
            username: self.username.clone(),
            from: self.current,
            to,
        })
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
