//! System statistics and the members-by-domain pie chart geometry.

use rust_decimal::Decimal;
use shared::{
    domain::{AccountType, Member, SavingAccount, WorkDomain},
    protocol::MemberCounts,
};
use tracing::{info, warn};

use crate::{error::Result, http::ApiClient, owners::ROSTER_PAGE_SIZE, page::ListQuery};

const PIE_CENTER: f64 = 50.0;
const PIE_RADIUS: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainShare {
    pub domain: WorkDomain,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub formal: u64,
    pub informal: u64,
    pub total_balance: Decimal,
    pub average_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub members: MemberCounts,
    pub domains: Vec<DomainShare>,
    pub accounts: AccountStats,
}

/// Member count per work domain, in declaration order, zeros included.
pub fn domain_distribution(members: &[Member]) -> Vec<DomainShare> {
    WorkDomain::ALL
        .into_iter()
        .map(|domain| DomainShare {
            domain,
            count: members.iter().filter(|m| m.work_domain == domain).count() as u64,
        })
        .collect()
}

pub fn account_stats(accounts: &[SavingAccount]) -> AccountStats {
    let total = accounts.len() as u64;
    let active = accounts.iter().filter(|a| a.is_active).count() as u64;
    let formal = accounts
        .iter()
        .filter(|a| a.account_type == AccountType::Formal)
        .count() as u64;
    let total_balance: Decimal = accounts.iter().map(|a| a.current_balance).sum();
    let average_balance = if total > 0 {
        (total_balance / Decimal::from(total)).round_dp(2)
    } else {
        Decimal::ZERO
    };
    AccountStats {
        total,
        active,
        inactive: total - active,
        formal,
        informal: total - formal,
        total_balance,
        average_balance,
    }
}

/// One wedge of the distribution chart, drawn in a 100x100 viewbox.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub domain: WorkDomain,
    pub count: u64,
    pub percentage: f64,
    pub start_angle: f64,
    pub sweep: f64,
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub large_arc: bool,
}

impl PieSlice {
    pub fn svg_path(&self) -> String {
        format!(
            "M {c} {c} L {:.2} {:.2} A {r} {r} 0 {} 1 {:.2} {:.2} Z",
            self.start.0,
            self.start.1,
            u8::from(self.large_arc),
            self.end.0,
            self.end.1,
            c = PIE_CENTER,
            r = PIE_RADIUS,
        )
    }
}

fn point_on_circle(degrees: f64) -> (f64, f64) {
    let radians = degrees.to_radians();
    (
        PIE_CENTER + PIE_RADIUS * radians.cos(),
        PIE_CENTER + PIE_RADIUS * radians.sin(),
    )
}

/// Wedges start at 0° and follow each other clockwise. Domains without
/// members get no wedge.
pub fn pie_slices(shares: &[DomainShare]) -> Vec<PieSlice> {
    let total: u64 = shares.iter().map(|s| s.count).sum();
    if total == 0 {
        return Vec::new();
    }
    let mut start_angle = 0.0;
    shares
        .iter()
        .filter(|share| share.count > 0)
        .map(|share| {
            let percentage = share.count as f64 / total as f64 * 100.0;
            let sweep = percentage / 100.0 * 360.0;
            let slice = PieSlice {
                domain: share.domain,
                count: share.count,
                percentage,
                start_angle,
                sweep,
                start: point_on_circle(start_angle),
                end: point_on_circle(start_angle + sweep),
                large_arc: sweep > 180.0,
            };
            start_angle += sweep;
            slice
        })
        .collect()
}

/// Member counts and the domain split are required; account figures fall
/// back to zeros when the accounts listing is unavailable.
pub async fn load_statistics(api: &ApiClient) -> Result<Statistics> {
    let roster = ListQuery::new("id").with_page_size(ROSTER_PAGE_SIZE);
    let (members, roster_listing) =
        futures::try_join!(api.member_counts(), api.list_members(&roster))?;

    let accounts = match api.list_accounts(&roster).await {
        Ok(listing) => account_stats(&listing.into_items()),
        Err(err) => {
            warn!("stats: account figures unavailable, reporting zeros: {err}");
            AccountStats::default()
        }
    };

    info!(
        members = members.total_members,
        accounts = accounts.total,
        "stats: loaded"
    );
    Ok(Statistics {
        members,
        domains: domain_distribution(&roster_listing.into_items()),
        accounts,
    })
}

#[cfg(test)]
#[path = "tests/stats_tests.rs"]
mod tests;
