use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result as TestResult;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use client_core::{
    actions::AccountRef,
    notify::NotificationKind,
    session::{LogoutReason, Session},
    ActionRequest, ApiClient, BackOffice, FetchOutcome, NotificationLog, SessionProvider,
    SessionState, SortDirection,
};
use rust_decimal::Decimal;
use shared::domain::{AccountId, Role};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Backend {
    accounts: usize,
    account_hits: Arc<AtomicUsize>,
}

fn account_json(id: usize) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "accountNumber": format!("ACC{id:03}"),
        "accountType": if id % 2 == 0 { "FORMAL" } else { "INFORMAL" },
        "currentBalance": "1000.00",
        "isActive": true
    })
}

async fn handle_accounts(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    backend.account_hits.fetch_add(1, Ordering::SeqCst);
    let sort = params.get("sort").cloned().unwrap_or_default();
    if sort.starts_with("openingDate") {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    let all: Vec<_> = (1..=backend.accounts).map(account_json).collect();
    Json(serde_json::Value::Array(all))
}

async fn handle_deposit(
    Path(id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Deposit successful",
        "transactionId": id * 100,
        "amount": params.get("amount").cloned().unwrap_or_default(),
        "newBalance": "1500.00"
    }))
}

async fn handle_members() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn handle_member_search(
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let page: u64 = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or_default();
    Json(serde_json::json!({
        "content": [{
            "id": 11, "firstName": "Hana", "lastName": "Girma", "employeeId": "E11",
            "workDomain": "CONTRACT", "isActive": true
        }],
        "totalElements": 11,
        "totalPages": 2,
        "size": 10,
        "number": page,
        "first": page == 0,
        "last": page == 1,
        "numberOfElements": 1
    }))
}

async fn spawn_backend(accounts: usize) -> TestResult<(String, Arc<AtomicUsize>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let account_hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/accounts", get(handle_accounts))
        .route("/api/accounts/:id/deposit", post(handle_deposit))
        .route("/api/members", get(handle_members))
        .route("/api/members/search", get(handle_member_search))
        .with_state(Backend {
            accounts,
            account_hits: account_hits.clone(),
        });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), account_hits))
}

fn signed_in_office(base: &str, page_size: u64) -> TestResult<(BackOffice, Arc<NotificationLog>)> {
    let session = Arc::new(SessionProvider::in_memory());
    session.sign_in(Session {
        username: "manager".into(),
        role: Role::Manager,
        token: "token-1".into(),
    })?;
    let api = ApiClient::new(base, session)?;
    let log = Arc::new(NotificationLog::default());
    let office = BackOffice::new(api, log.clone()).with_page_size(page_size);
    Ok((office, log))
}

#[tokio::test]
async fn twenty_three_accounts_make_three_pages() -> TestResult<()> {
    let (base, _) = spawn_backend(23).await?;
    let (office, _) = signed_in_office(&base, 10)?;
    let accounts = office.accounts();

    assert_eq!(accounts.refresh().await, FetchOutcome::Applied);
    let first = accounts.page().await.expect("page");
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_items, 23);
    assert_eq!(first.total_pages, 3);
    assert!(first.is_first && !first.is_last);

    assert_eq!(accounts.set_page(2).await, Some(FetchOutcome::Applied));
    let last = accounts.page().await.expect("page");
    assert_eq!(last.items.len(), 3);
    assert_eq!(last.page_index, 2);
    assert!(last.is_last && !last.is_first);
    assert_eq!(last.summary().to_string(), "Showing 3 of 23 · Page 3 of 3");

    assert_eq!(accounts.set_page(3).await, None);
    Ok(())
}

#[tokio::test]
async fn bare_array_is_windowed_to_the_requested_page() -> TestResult<()> {
    let (base, _) = spawn_backend(7).await?;
    let (office, _) = signed_in_office(&base, 5)?;
    let accounts = office.accounts();

    accounts.refresh().await;
    accounts.set_page(1).await;
    let page = accounts.page().await.expect("page");
    let numbers: Vec<_> = page.items.iter().map(|a| a.account_number.as_str()).collect();
    assert_eq!(numbers, vec!["ACC006", "ACC007"]);
    assert_eq!((page.total_items, page.total_pages), (7, 2));
    Ok(())
}

#[tokio::test]
async fn filtering_a_bare_array_counts_every_match() -> TestResult<()> {
    let (base, _) = spawn_backend(23).await?;
    let (office, _) = signed_in_office(&base, 5)?;
    let accounts = office.accounts();

    assert_eq!(
        accounts.set_filter("accountType", "INFORMAL").await,
        FetchOutcome::Applied
    );
    let first = accounts.page().await.expect("page");
    assert_eq!(first.items.len(), 5);
    assert_eq!((first.total_items, first.total_pages), (12, 3));

    assert_eq!(accounts.set_page(2).await, Some(FetchOutcome::Applied));
    let last = accounts.page().await.expect("page");
    let numbers: Vec<_> = last.items.iter().map(|a| a.account_number.as_str()).collect();
    assert_eq!(numbers, vec!["ACC021", "ACC023"]);
    assert!(last.is_last);
    Ok(())
}

#[tokio::test]
async fn enforcement_failures_name_the_enforcement_view() -> TestResult<()> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}/api", listener.local_addr()?);
    drop(listener);
    let (office, log) = signed_in_office(&base, 10)?;
    let enforcement = office.enforcement();

    assert_eq!(enforcement.label(), "enforcement");
    assert_eq!(enforcement.refresh().await, FetchOutcome::Failed);
    assert_eq!(
        enforcement.snapshot().await.error.as_deref(),
        Some("Failed to load enforcement")
    );
    assert_eq!(log.drain()[0].message, "Failed to load enforcement");
    Ok(())
}

#[tokio::test]
async fn query_changes_return_to_the_first_page() -> TestResult<()> {
    let (base, _) = spawn_backend(23).await?;
    let (office, _) = signed_in_office(&base, 10)?;
    let accounts = office.accounts();

    accounts.refresh().await;
    accounts.set_page(1).await;
    assert_eq!(accounts.query().await.page_index, 1);

    accounts.set_sort("currentBalance", SortDirection::Desc).await;
    assert_eq!(accounts.query().await.page_index, 0);

    accounts.set_page(2).await;
    accounts.set_filter("accountType", "INFORMAL").await;
    assert_eq!(accounts.query().await.page_index, 0);

    accounts.set_page_size(5).await;
    let query = accounts.query().await;
    assert_eq!((query.page_index, query.page_size), (0, 5));
    Ok(())
}

#[tokio::test]
async fn refresh_is_idempotent_and_always_hits_the_service() -> TestResult<()> {
    let (base, hits) = spawn_backend(12).await?;
    let (office, _) = signed_in_office(&base, 10)?;
    let accounts = office.accounts();

    accounts.refresh().await;
    let before = accounts.snapshot().await;
    accounts.refresh().await;
    let after = accounts.snapshot().await;

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(before.query, after.query);
    assert_eq!(before.page, after.page);
    Ok(())
}

#[tokio::test]
async fn slow_response_never_overwrites_a_newer_query() -> TestResult<()> {
    let (base, _) = spawn_backend(4).await?;
    let (office, _) = signed_in_office(&base, 10)?;
    let accounts = office.accounts();
    let mut events = accounts.subscribe();

    let slow = accounts.clone();
    let (stale, fresh) = tokio::join!(
        slow.set_sort("openingDate", SortDirection::Asc),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            accounts.set_sort("accountNumber", SortDirection::Desc).await
        }
    );

    assert_eq!(stale, FetchOutcome::Superseded);
    assert_eq!(fresh, FetchOutcome::Applied);
    let state = accounts.snapshot().await;
    assert_eq!(state.query.sort_field, "accountNumber");
    assert_eq!(state.page.expect("page").total_items, 4);

    let mut superseded = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, client_core::ListEvent::Superseded { .. }) {
            superseded += 1;
        }
    }
    assert_eq!(superseded, 1);
    Ok(())
}

#[tokio::test]
async fn envelope_pages_are_taken_as_sent() -> TestResult<()> {
    let (base, _) = spawn_backend(0).await?;
    let (office, _) = signed_in_office(&base, 10)?;
    let members = office.members();

    assert_eq!(members.set_search("hana").await, FetchOutcome::Applied);
    let page = members.page().await.expect("page");
    assert_eq!(page.total_items, 11);
    assert_eq!(page.total_pages, 2);
    assert!(page.is_first);

    assert_eq!(members.set_page(1).await, Some(FetchOutcome::Applied));
    let page = members.page().await.expect("page");
    assert!(page.is_last);
    assert_eq!(page.items[0].full_name(), "Hana Girma");
    Ok(())
}

#[tokio::test]
async fn deposit_announces_amount_and_account() -> TestResult<()> {
    let (base, hits) = spawn_backend(3).await?;
    let (office, log) = signed_in_office(&base, 10)?;
    let accounts = office.accounts();
    accounts.refresh().await;

    let outcome = accounts
        .submit(ActionRequest::Deposit {
            account: AccountRef {
                id: AccountId(1),
                number: "ACC001".into(),
            },
            amount: Decimal::new(50000, 2),
            description: None,
        })
        .await?;

    assert_eq!(outcome.title, "Deposit Successful");
    let notes = log.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Success);
    assert!(notes[0].message.contains("500.00"));
    assert!(notes[0].message.contains("ACC001"));
    assert_eq!(hits.load(Ordering::SeqCst), 2, "success refreshes the list");
    Ok(())
}

#[tokio::test]
async fn unauthorized_response_ends_the_session() -> TestResult<()> {
    let (base, _) = spawn_backend(0).await?;
    let (office, log) = signed_in_office(&base, 10)?;
    let mut session_rx = office.session().subscribe();
    let members = office.members();

    assert_eq!(members.refresh().await, FetchOutcome::Failed);

    session_rx.changed().await?;
    assert_eq!(
        *session_rx.borrow(),
        SessionState::SignedOut {
            reason: Some(LogoutReason::Unauthorized)
        }
    );
    assert!(office.session().token().is_none());

    let notes = log.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Loading Failed");
    assert_eq!(
        notes[0].message,
        "Your session has expired. Please sign in again."
    );
    Ok(())
}
