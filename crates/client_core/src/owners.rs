use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::domain::{Member, MemberId, SavingAccount, WorkDomain};
use tracing::warn;

use crate::{
    error::Result,
    http::ApiClient,
    page::{Filterable, ListQuery, Listing},
    resources::{filter_keys, ListSource},
};

/// Page size used when the whole member roster is needed at once.
pub const ROSTER_PAGE_SIZE: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountWithOwner {
    pub account: SavingAccount,
    pub owner: Member,
    /// The owner could not be resolved and is synthesized.
    pub placeholder: bool,
}

impl Filterable for AccountWithOwner {
    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            filter_keys::WORK_DOMAIN => WorkDomain::parse(value)
                .map_or(true, |domain| !self.placeholder && domain == self.owner.work_domain),
            _ => self.account.matches_filter(key, value),
        }
    }
}

pub fn placeholder_owner(account: &SavingAccount) -> Member {
    Member {
        id: MemberId(0),
        first_name: "Unknown".into(),
        last_name: "Member".into(),
        employee_id: "N/A".into(),
        work_domain: WorkDomain::Other,
        email: None,
        phone_number: None,
        registration_date: account.opening_date,
        registration_fee: Decimal::ZERO,
        is_active: true,
        deactivation_date: None,
        deactivation_reason: None,
        shares: None,
        saving_accounts: None,
    }
}

/// Pairs each account with its owner: by `memberId`, then by a member whose
/// saving accounts list it, then a placeholder. Without a roster every owner
/// is a placeholder.
pub fn resolve_owners(
    accounts: Vec<SavingAccount>,
    members: Option<&[Member]>,
) -> Vec<AccountWithOwner> {
    let members = members.unwrap_or_default();
    let by_id: HashMap<MemberId, &Member> = members.iter().map(|m| (m.id, m)).collect();

    accounts
        .into_iter()
        .map(|account| {
            let found = account
                .member_id
                .and_then(|id| by_id.get(&id).copied())
                .or_else(|| members.iter().find(|m| m.owns_account(account.id)));
            match found {
                Some(owner) => AccountWithOwner {
                    owner: owner.clone(),
                    account,
                    placeholder: false,
                },
                None => {
                    warn!(
                        account = %account.account_number,
                        "owners: no member found, using placeholder"
                    );
                    AccountWithOwner {
                        owner: placeholder_owner(&account),
                        account,
                        placeholder: true,
                    }
                }
            }
        })
        .collect()
}

/// Accounts enriched with their owners, as the enforcement queue lists them.
pub struct AccountOwnerSource {
    api: Arc<ApiClient>,
}

impl AccountOwnerSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource<AccountWithOwner> for AccountOwnerSource {
    async fn fetch_listing(&self, query: &ListQuery) -> Result<Listing<AccountWithOwner>> {
        let accounts = self.api.list_accounts(query).await?;
        let roster = ListQuery::new("id").with_page_size(ROSTER_PAGE_SIZE);
        let members = match self.api.list_members(&roster).await {
            Ok(listing) => Some(listing.into_items()),
            Err(err) => {
                warn!("owners: member lookup failed, all owners become placeholders: {err}");
                None
            }
        };

        Ok(accounts.map_items(|items| resolve_owners(items, members.as_deref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{AccountId, AccountType};

    fn account(id: i64, member_id: Option<i64>) -> SavingAccount {
        SavingAccount {
            id: AccountId(id),
            account_number: format!("ACC{id:03}"),
            account_type: AccountType::Formal,
            current_balance: Decimal::from(100),
            opening_date: None,
            is_active: true,
            monthly_amount: Some(Decimal::from(500)),
            target_amount: None,
            member_id: member_id.map(MemberId),
            transactions: None,
        }
    }

    fn member(id: i64, owned: &[i64]) -> Member {
        let mut member = placeholder_owner(&account(0, None));
        member.id = MemberId(id);
        member.first_name = format!("M{id}");
        member.work_domain = WorkDomain::Academic;
        member.saving_accounts = Some(owned.iter().map(|a| account(*a, None)).collect());
        member
    }

    #[test]
    fn resolves_by_member_id_then_ownership_then_placeholder() {
        let members = vec![member(1, &[]), member(2, &[20])];
        let resolved = resolve_owners(
            vec![account(10, Some(1)), account(20, None), account(30, Some(99))],
            Some(&members),
        );

        assert_eq!(resolved[0].owner.id, MemberId(1));
        assert_eq!(resolved[1].owner.id, MemberId(2));
        assert!(resolved[2].placeholder);
        assert_eq!(resolved[2].owner.full_name(), "Unknown Member");
    }

    #[test]
    fn missing_roster_degrades_every_owner() {
        let resolved = resolve_owners(vec![account(1, Some(1)), account(2, None)], None);
        assert!(resolved.iter().all(|r| r.placeholder));
        assert!(!resolved[0].matches_filter(filter_keys::WORK_DOMAIN, "OTHER"));
    }
}
