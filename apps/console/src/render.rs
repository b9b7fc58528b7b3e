use std::fmt::Write as _;

use rust_decimal::Decimal;
use shared::domain::{Member, SavingAccount};

use client_core::{
    actions::format_currency,
    notify::{Notification, NotificationKind},
    stats::{PieSlice, Statistics},
    table::TableView,
};

/// Plain-text table with padded columns, an actions column when any row
/// offers one, and the paging summary underneath.
pub fn table(view: &TableView) -> String {
    let mut headers: Vec<String> = view.headers.iter().map(|h| h.label()).collect();
    let with_actions = view.rows.iter().any(|row| !row.actions.is_empty());
    if with_actions {
        headers.push("Actions".to_owned());
    }

    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.cells.clone();
            if with_actions {
                let actions: Vec<&str> = row.actions.iter().map(|a| a.as_str()).collect();
                cells.push(actions.join(","));
            }
            cells
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    if rows.is_empty() {
        out.push_str("(no results)\n");
    }
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    let _ = writeln!(out, "{}", view.summary);
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join("  ").trim_end());
}

pub fn notification(note: &Notification) -> String {
    let marker = match note.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Error => "error",
    };
    format!("[{marker}] {note}")
}

pub fn statistics(stats: &Statistics, slices: &[PieSlice]) -> String {
    let mut out = String::new();
    let members = &stats.members;
    let _ = writeln!(
        out,
        "Members: {} total, {} active, {} inactive",
        members.total_members, members.active_members, members.inactive_members
    );
    let _ = writeln!(out, "By work domain:");
    for share in &stats.domains {
        let pct = slices
            .iter()
            .find(|slice| slice.domain == share.domain)
            .map_or(0.0, |slice| slice.percentage);
        let _ = writeln!(out, "  {:<16} {:>5}  {pct:>5.1}%", share.domain.label(), share.count);
    }
    let accounts = &stats.accounts;
    let _ = writeln!(
        out,
        "Accounts: {} total, {} active, {} inactive ({} formal, {} informal)",
        accounts.total, accounts.active, accounts.inactive, accounts.formal, accounts.informal
    );
    let _ = writeln!(
        out,
        "Balance: {} total, {} average",
        format_currency(accounts.total_balance),
        format_currency(accounts.average_balance)
    );
    out
}

pub fn member_detail(member: &Member, accounts: &[SavingAccount]) -> String {
    let mut out = String::new();
    let status = if member.is_active { "Active" } else { "Inactive" };
    let _ = writeln!(out, "{} ({}) [{status}]", member.full_name(), member.employee_id);
    let _ = writeln!(out, "Work domain: {}", member.work_domain.label());
    if let Some(email) = &member.email {
        let _ = writeln!(out, "Email: {email}");
    }
    if let Some(phone) = &member.phone_number {
        let _ = writeln!(out, "Phone: {phone}");
    }
    if let Some(reason) = &member.deactivation_reason {
        let _ = writeln!(out, "Deactivated: {reason}");
    }

    let shares: Vec<_> = member
        .shares
        .iter()
        .flatten()
        .filter(|share| share.is_active)
        .collect();
    let value: Decimal = shares.iter().map(|share| share.share_value).sum();
    let _ = writeln!(out, "Shares: {} ({})", shares.len(), format_currency(value));

    let _ = writeln!(out, "Accounts:");
    if accounts.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for account in accounts {
        let state = if account.is_active { "" } else { " (inactive)" };
        let _ = writeln!(
            out,
            "  {} {} {}{state}",
            account.account_number,
            account.account_type,
            format_currency(account.current_balance)
        );
    }
    out
}
