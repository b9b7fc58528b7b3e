use super::*;
use crate::session::SessionProvider;
use anyhow::Result as TestResult;
use axum::{
    extract::{Path, RawQuery, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Mutex;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct ServerState {
    requests: Arc<Mutex<Vec<String>>>,
}

impl ServerState {
    fn record(&self, path: &str, query: Option<String>) {
        self.requests
            .lock()
            .expect("lock")
            .push(format!("{path}?{}", query.unwrap_or_default()));
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.requests.lock().expect("lock"))
    }
}

fn member_json(id: i64, active: bool, domain: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "firstName": format!("First{id}"),
        "lastName": "Member",
        "employeeId": format!("EMP{id:03}"),
        "workDomain": domain,
        "registrationFee": 500,
        "isActive": active
    })
}

async fn handle_members(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> Json<serde_json::Value> {
    state.record("/members", query);
    Json(serde_json::json!({
        "content": [member_json(1, true, "ACADEMIC"), member_json(2, false, "CONTRACT")],
        "totalElements": 2, "totalPages": 1, "size": 10, "number": 0,
        "first": true, "last": true, "numberOfElements": 2
    }))
}

async fn handle_member_search(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> Json<serde_json::Value> {
    state.record("/members/search", query);
    Json(serde_json::json!([member_json(3, true, "OTHER")]))
}

async fn handle_members_by_domain(
    State(state): State<ServerState>,
    Path(domain): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<serde_json::Value> {
    state.record(&format!("/members/domain/{domain}"), query);
    Json(serde_json::json!([member_json(4, true, &domain)]))
}

async fn handle_staff(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> Json<serde_json::Value> {
    state.record("/auth/staff", query);
    Json(serde_json::json!({
        "message": "Staff retrieved successfully",
        "data": {
            "content": [{"username": "admin", "role": "ADMIN"}],
            "totalElements": 1, "totalPages": 1, "size": 10, "number": 0
        }
    }))
}

async fn handle_deposit(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
) -> Json<serde_json::Value> {
    state.record(&format!("/accounts/{id}/deposit"), query);
    Json(serde_json::json!({
        "message": "Deposit successful",
        "transactionId": 9,
        "amount": 500.00,
        "newBalance": 1500.00
    }))
}

async fn handle_account(Path(id): Path<i64>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": id,
        "accountNumber": format!("ACC{id:03}"),
        "accountType": "INFORMAL",
        "currentBalance": "320.50",
        "isActive": true,
        "targetAmount": 1000
    }))
}

async fn spawn_resource_server() -> TestResult<(Arc<ApiClient>, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/members", get(handle_members))
        .route("/api/members/search", get(handle_member_search))
        .route("/api/members/domain/:domain", get(handle_members_by_domain))
        .route("/api/auth/staff", get(handle_staff))
        .route("/api/accounts/:id", get(handle_account))
        .route("/api/accounts/:id/deposit", post(handle_deposit))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let api = ApiClient::new(
        &format!("http://{addr}/api"),
        Arc::new(SessionProvider::in_memory()),
    )?;
    Ok((Arc::new(api), state))
}

#[test]
fn member_route_prefers_search_then_domain() {
    let query = ListQuery::new("id")
        .with_filter(filter_keys::WORK_DOMAIN, "ACADEMIC")
        .with_search("abebe");
    assert_eq!(
        MemberRoute::for_query(&query),
        MemberRoute::Search("abebe".into())
    );

    let query = ListQuery::new("id").with_filter(filter_keys::WORK_DOMAIN, "academic");
    assert_eq!(
        MemberRoute::for_query(&query),
        MemberRoute::Domain(WorkDomain::Academic)
    );

    let query = ListQuery::new("id").with_filter(filter_keys::STATUS, "active");
    assert_eq!(
        MemberRoute::for_query(&query),
        MemberRoute::All {
            include_inactive: false
        }
    );
}

#[test]
fn entity_filters_match_on_status_and_kind() {
    let account: SavingAccount = serde_json::from_value(serde_json::json!({
        "id": 1, "accountNumber": "ACC001", "accountType": "INFORMAL",
        "currentBalance": 10, "isActive": false
    }))
    .expect("account");
    assert!(account.matches_filter(filter_keys::STATUS, "inactive"));
    assert!(!account.matches_filter(filter_keys::ACCOUNT_TYPE, "FORMAL"));
    assert!(account.matches_filter("unknown", "anything"));

    let staff = StaffUser {
        username: "clerk".into(),
        role: Role::Assistant,
    };
    assert!(staff.matches_filter(filter_keys::ROLE, "assistant"));
    assert!(!staff.matches_filter(filter_keys::ROLE, "ADMIN"));
}

#[tokio::test]
async fn members_list_includes_inactive_unless_filtered_active() {
    let (api, state) = spawn_resource_server().await.expect("spawn server");

    let query = ListQuery::new("firstName");
    let page = api
        .list_members(&query)
        .await
        .expect("members")
        .into_page(&query, &[]);
    assert_eq!(page.total_items, 2);

    api.list_members(&ListQuery::new("id").with_filter(filter_keys::STATUS, "active"))
        .await
        .expect("active members");

    assert_eq!(
        state.take(),
        vec![
            "/members?page=0&size=10&sort=firstName%2Casc&includeInactive=true".to_owned(),
            "/members?page=0&size=10&sort=id%2Casc".to_owned(),
        ]
    );
}

#[tokio::test]
async fn members_search_and_domain_use_dedicated_endpoints() {
    let (api, state) = spawn_resource_server().await.expect("spawn server");
    let source = MemberSource::new(api.clone());

    let searched = source
        .fetch_listing(&ListQuery::new("id").with_search("first3"))
        .await
        .expect("search")
        .into_items();
    assert_eq!(searched[0].id, MemberId(3));

    let by_domain = ListQuery::new("id").with_filter(filter_keys::WORK_DOMAIN, "CONTRACT");
    assert!(source.handles_filter(filter_keys::WORK_DOMAIN, &by_domain));
    assert!(!source.handles_filter(filter_keys::STATUS, &by_domain));
    let members = source.fetch_listing(&by_domain).await.expect("domain").into_items();
    assert_eq!(members[0].work_domain, WorkDomain::Contract);

    assert_eq!(
        state.take(),
        vec![
            "/members/search?q=first3&page=0&size=10&sort=id%2Casc".to_owned(),
            "/members/domain/CONTRACT?page=0&size=10&sort=id%2Casc".to_owned(),
        ]
    );
}

#[tokio::test]
async fn staff_page_is_unwrapped_with_separate_direction() {
    let (api, state) = spawn_resource_server().await.expect("spawn server");
    let query = ListQuery::new("username").with_sort("role", crate::page::SortDirection::Desc);

    let page = StaffSource::new(api)
        .fetch_listing(&query)
        .await
        .expect("staff")
        .into_page(&query, &[]);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].role, Role::Admin);
    assert_eq!(
        state.take(),
        vec!["/auth/staff?page=0&size=10&sort=role&direction=desc".to_owned()]
    );
}

#[tokio::test]
async fn deposit_sends_amount_with_scale_and_trimmed_description() {
    let (api, state) = spawn_resource_server().await.expect("spawn server");

    let receipt = api
        .deposit(AccountId(7), Decimal::new(50000, 2), Some("  March dues "))
        .await
        .expect("deposit");
    assert_eq!(receipt.new_balance, Some(Decimal::from(1500)));
    assert_eq!(
        state.take(),
        vec!["/accounts/7/deposit?amount=500.00&description=March+dues".to_owned()]
    );
}

#[tokio::test]
async fn single_account_is_fetched_by_id() {
    let (api, _) = spawn_resource_server().await.expect("spawn server");

    let account = api.account(AccountId(12)).await.expect("account");
    assert_eq!(account.account_number, "ACC012");
    assert_eq!(account.current_balance, Decimal::new(32050, 2));
    assert_eq!(account.target_amount, Some(Decimal::from(1000)));
}
