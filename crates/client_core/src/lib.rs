//! View-model layer of the back-office console.
//!
//! [`BackOffice`] wires one API client, one session and one notification
//! sink into the list controllers the screens render from.

use std::sync::Arc;

use shared::domain::{Member, SavingAccount, StaffUser};

pub mod access;
pub mod actions;
pub mod controller;
pub mod error;
pub mod forms;
pub mod http;
pub mod notify;
pub mod owners;
pub mod page;
pub mod resources;
pub mod session;
pub mod stats;
pub mod table;

pub use access::{guard, AccessDenied, Screen};
pub use actions::{ActionExecutor, ActionOutcome, ActionRequest};
pub use controller::{FetchOutcome, ListController, ListEvent, ListViewState, LoadStatus};
pub use error::{ClientError, Result};
pub use forms::FormError;
pub use http::ApiClient;
pub use notify::{Notification, NotificationKind, NotificationLog, NotificationSink};
pub use owners::AccountWithOwner;
pub use page::{ListQuery, Listing, Page, SortDirection};
pub use session::{Session, SessionProvider, SessionState};

use owners::AccountOwnerSource;
use resources::{AccountSource, MemberSource, StaffSource};

pub struct BackOffice {
    api: Arc<ApiClient>,
    notifier: Arc<dyn NotificationSink>,
    page_size: u64,
}

impl BackOffice {
    pub fn new(api: ApiClient, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            api: Arc::new(api),
            notifier,
            page_size: page::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionProvider> {
        self.api.session()
    }

    /// First page at the configured size, sorted ascending by `sort_field`.
    pub fn query(&self, sort_field: &str) -> ListQuery {
        ListQuery::new(sort_field).with_page_size(self.page_size)
    }

    fn controller<T>(
        &self,
        label: &'static str,
        source: Arc<dyn resources::ListSource<T>>,
        sort_field: &str,
    ) -> ListController<T>
    where
        T: page::Filterable + Clone + Send + Sync + 'static,
    {
        ListController::new(
            label,
            source,
            self.api.clone(),
            self.notifier.clone(),
            self.query(sort_field),
        )
    }

    pub fn members(&self) -> ListController<Member> {
        self.controller("members", Arc::new(MemberSource::new(self.api.clone())), "id")
    }

    pub fn accounts(&self) -> ListController<SavingAccount> {
        self.controller("accounts", Arc::new(AccountSource::new(self.api.clone())), "id")
    }

    pub fn enforcement(&self) -> ListController<AccountWithOwner> {
        self.controller(
            "enforcement",
            Arc::new(AccountOwnerSource::new(self.api.clone())),
            "id",
        )
    }

    pub fn staff(&self) -> ListController<StaffUser> {
        self.controller(
            "staff",
            Arc::new(StaffSource::new(self.api.clone())),
            "username",
        )
    }
}
