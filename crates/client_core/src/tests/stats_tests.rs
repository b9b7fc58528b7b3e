use super::*;
use crate::session::SessionProvider;
use anyhow::Result as TestResult;
use axum::{http::StatusCode, routing::get, Json, Router};
use shared::domain::{AccountId, MemberId};
use std::sync::Arc;
use tokio::net::TcpListener;

fn share(domain: WorkDomain, count: u64) -> DomainShare {
    DomainShare { domain, count }
}

#[test]
fn majority_domain_gets_a_large_arc() {
    let slices = pie_slices(&[
        share(WorkDomain::Academic, 3),
        share(WorkDomain::Administration, 0),
        share(WorkDomain::Contract, 1),
    ]);
    assert_eq!(slices.len(), 2, "zero counts draw nothing");

    let academic = &slices[0];
    assert_eq!(academic.percentage, 75.0);
    assert_eq!(academic.start_angle, 0.0);
    assert_eq!(academic.sweep, 270.0);
    assert!(academic.large_arc);
    assert_eq!(
        academic.svg_path(),
        "M 50 50 L 90.00 50.00 A 40 40 0 1 1 50.00 10.00 Z"
    );

    let contract = &slices[1];
    assert_eq!(contract.start_angle, 270.0);
    assert!(!contract.large_arc);
    assert!((contract.end.0 - 90.0).abs() < 1e-9);
}

#[test]
fn no_members_means_no_slices() {
    assert!(pie_slices(&[share(WorkDomain::Other, 0)]).is_empty());
}

#[test]
fn account_figures_split_by_status_and_type() {
    let account = |id: i64, kind: AccountType, active: bool, balance: i64| SavingAccount {
        id: AccountId(id),
        account_number: format!("ACC{id:03}"),
        account_type: kind,
        current_balance: Decimal::from(balance),
        opening_date: None,
        is_active: active,
        monthly_amount: None,
        target_amount: None,
        member_id: Some(MemberId(1)),
        transactions: None,
    };
    let stats = account_stats(&[
        account(1, AccountType::Formal, true, 1000),
        account(2, AccountType::Informal, false, 250),
        account(3, AccountType::Informal, true, 0),
    ]);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.inactive, 1);
    assert_eq!(stats.formal, 1);
    assert_eq!(stats.informal, 2);
    assert_eq!(stats.total_balance, Decimal::from(1250));
    assert_eq!(stats.average_balance, Decimal::new(41667, 2));
    assert_eq!(account_stats(&[]), AccountStats::default());
}

async fn handle_counts() -> Json<serde_json::Value> {
    Json(serde_json::json!({"totalMembers": 3, "activeMembers": 2, "inactiveMembers": 1}))
}

async fn handle_members() -> Json<serde_json::Value> {
    let member = |id: i64, domain: &str| {
        serde_json::json!({
            "id": id, "firstName": "A", "lastName": "B", "employeeId": format!("E{id}"),
            "workDomain": domain, "isActive": true
        })
    };
    Json(serde_json::json!([
        member(1, "ACADEMIC"),
        member(2, "ACADEMIC"),
        member(3, "OTHER")
    ]))
}

async fn handle_accounts() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal Server Error"})),
    )
}

async fn spawn_stats_server() -> TestResult<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/members/stats/count", get(handle_counts))
        .route("/api/members", get(handle_members))
        .route("/api/accounts", get(handle_accounts));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

#[tokio::test]
async fn account_failure_degrades_to_zeros() {
    let base = spawn_stats_server().await.expect("spawn server");
    let api = ApiClient::new(&base, Arc::new(SessionProvider::in_memory())).expect("client");

    let stats = load_statistics(&api).await.expect("statistics");
    assert_eq!(stats.members.total_members, 3);
    assert_eq!(stats.accounts, AccountStats::default());
    assert_eq!(
        stats.domains,
        vec![
            share(WorkDomain::Academic, 2),
            share(WorkDomain::Administration, 0),
            share(WorkDomain::Contract, 0),
            share(WorkDomain::Other, 1),
        ]
    );
}
