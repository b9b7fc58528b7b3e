use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    access::{guard, Screen},
    actions::{AccountRef, MemberRef},
    forms::{
        BulkDepositForm, ChangeRoleForm, CreateAccountForm, DeactivateMemberForm,
        PurchaseSharesForm, RegisterMemberForm, RegisterStaffForm, TransactionForm,
        TransactionKind, UpdateMemberForm,
    },
    page::Filterable,
    session::{FileSessionStore, LogoutReason},
    stats::{load_statistics, pie_slices},
    table::{
        account_columns, enforcement_columns, member_columns, project, staff_columns, Column,
        RowActions,
    },
    ActionRequest, ApiClient, BackOffice, FetchOutcome, ListController, ListQuery,
    NotificationLog, SessionProvider, SessionState, SortDirection,
};
use shared::domain::{AccountId, AccountType, Member, MemberId, Role, SavingAccount};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(name = "console", about = "Cooperative back-office console")]
struct Cli {
    /// Config file; `console.toml` in the working directory when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    Members {
        #[command(subcommand)]
        command: MembersCommand,
    },
    Accounts {
        #[command(subcommand)]
        command: AccountsCommand,
    },
    Staff {
        #[command(subcommand)]
        command: StaffCommand,
    },
    Enforcement {
        #[command(subcommand)]
        command: EnforcementCommand,
    },
    Stats,
}

#[derive(Subcommand, Debug)]
enum MembersCommand {
    List(ListArgs),
    /// Member details with shares and saving accounts.
    Show {
        id: i64,
    },
    Register {
        first_name: String,
        last_name: String,
        employee_id: String,
        #[arg(long)]
        domain: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Deactivate {
        id: i64,
        #[arg(long)]
        reason: String,
    },
    Reactivate {
        id: i64,
    },
    Shares {
        id: i64,
        #[arg(default_value = "1")]
        quantity: String,
    },
}

#[derive(Subcommand, Debug)]
enum AccountsCommand {
    List(ListArgs),
    Open {
        #[arg(long)]
        member: String,
        /// FORMAL or INFORMAL.
        #[arg(long)]
        kind: String,
        #[arg(long, default_value = "500")]
        monthly: String,
        #[arg(long, default_value = "")]
        target: String,
    },
    Deposit {
        id: i64,
        amount: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Withdraw {
        id: i64,
        amount: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Monthly {
        id: i64,
    },
    Deactivate {
        id: i64,
    },
    Reactivate {
        id: i64,
    },
    Close {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum StaffCommand {
    List(ListArgs),
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: String,
    },
    Role {
        username: String,
        role: String,
    },
    Delete {
        username: String,
    },
}

#[derive(Subcommand, Debug)]
enum EnforcementCommand {
    Accounts(ListArgs),
    BulkDeposit {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long)]
    size: Option<u64>,
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    search: Option<String>,
    /// `key=value`, repeatable.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

impl ListArgs {
    fn into_query(self, base: ListQuery) -> ListQuery {
        let mut query = base;
        if let Some(size) = self.size.filter(|size| *size > 0) {
            query.page_size = size;
        }
        if let Some(sort) = self.sort {
            query.sort_field = sort;
        }
        if self.desc {
            query.sort_direction = SortDirection::Desc;
        }
        if let Some(search) = self.search {
            query.set_search(search);
        }
        for (key, value) in self.filters {
            query.set_filter(key, value);
        }
        query.page_index = self.page.saturating_sub(1);
        query
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    debug!(
        api = %settings.api_base_url,
        session = %settings.session_file.display(),
        "console: settings loaded"
    );

    let session = Arc::new(SessionProvider::new(Arc::new(FileSessionStore::new(
        settings.session_file.clone(),
    ))));
    session.init();
    let api = ApiClient::with_timeout(
        &settings.api_base_url,
        session,
        settings.request_timeout(),
    )
    .context("failed to build api client")?;
    let log = Arc::new(NotificationLog::default());
    let office = BackOffice::new(api, log.clone()).with_page_size(settings.page_size);

    let result = run(cli.command, &office).await;
    for note in log.drain() {
        println!("{}", render::notification(&note));
    }
    result
}

async fn run(command: Command, office: &BackOffice) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let session = office.api().login(&username, &password).await?;
            println!("Signed in as {} ({})", session.username, session.role);
        }
        Command::Logout => {
            office.api().logout();
            println!("Signed out");
        }
        Command::Whoami => whoami(&office.session().state()),
        Command::Members { command } => members(command, office).await?,
        Command::Accounts { command } => accounts(command, office).await?,
        Command::Staff { command } => staff(command, office).await?,
        Command::Enforcement { command } => enforcement(command, office).await?,
        Command::Stats => {
            guard(&office.session().state(), Screen::Statistics)?;
            let stats = load_statistics(office.api()).await?;
            let slices = pie_slices(&stats.domains);
            print!("{}", render::statistics(&stats, &slices));
        }
    }
    Ok(())
}

fn whoami(state: &SessionState) {
    match state {
        SessionState::SignedIn(session) => {
            println!("{} ({})", session.username, session.role);
            let screens: Vec<&str> = [
                Screen::Members,
                Screen::Accounts,
                Screen::Statistics,
                Screen::Enforcement,
                Screen::StaffManagement,
            ]
            .into_iter()
            .filter(|screen| screen.allows(session.role))
            .map(Screen::title)
            .collect();
            println!("Screens: {}", screens.join(", "));
        }
        SessionState::SignedOut {
            reason: Some(LogoutReason::Expired),
        } => println!("Not signed in (session expired)"),
        SessionState::SignedOut { .. } => println!("Not signed in"),
    }
}

fn viewer(office: &BackOffice) -> Option<String> {
    office.session().current().map(|session| session.username)
}

async fn show_list<T>(
    controller: ListController<T>,
    query: ListQuery,
    columns: &[Column<T>],
    viewer: Option<&str>,
) -> Result<()>
where
    T: Filterable + RowActions + Clone + Send + Sync + 'static,
{
    if controller.load(query).await != FetchOutcome::Applied {
        bail!("failed to load {}", controller.label());
    }
    let state = controller.snapshot().await;
    let page = state
        .page
        .ok_or_else(|| anyhow!("no {} loaded", controller.label()))?;
    print!(
        "{}",
        render::table(&project(columns, &page, &state.query, viewer))
    );
    Ok(())
}

async fn member_ref(office: &BackOffice, id: i64) -> Result<(Member, MemberRef)> {
    let member = office
        .api()
        .member(MemberId(id))
        .await
        .with_context(|| format!("failed to look up member {id}"))?;
    let reference = MemberRef {
        id: member.id,
        name: member.full_name(),
    };
    Ok((member, reference))
}

async fn account_ref(office: &BackOffice, id: i64) -> Result<(SavingAccount, AccountRef)> {
    let account = office
        .api()
        .account(AccountId(id))
        .await
        .with_context(|| format!("failed to look up account {id}"))?;
    let reference = AccountRef {
        id: account.id,
        number: account.account_number.clone(),
    };
    Ok((account, reference))
}

async fn members(command: MembersCommand, office: &BackOffice) -> Result<()> {
    guard(&office.session().state(), Screen::Members)?;
    let controller = office.members();
    let request = match command {
        MembersCommand::List(args) => {
            let query = args.into_query(office.query("id"));
            let viewer = viewer(office);
            return show_list(controller, query, &member_columns(), viewer.as_deref()).await;
        }
        MembersCommand::Show { id } => return show_member(office, id).await,
        MembersCommand::Register {
            first_name,
            last_name,
            employee_id,
            domain,
            email,
            phone,
        } => RegisterMemberForm {
            first_name,
            last_name,
            employee_id,
            work_domain: domain,
            email,
            phone_number: phone,
        }
        .submit()?,
        MembersCommand::Update {
            id,
            first_name,
            last_name,
            email,
            phone,
        } => {
            let (member, _) = member_ref(office, id).await?;
            let mut form = UpdateMemberForm::for_member(&member);
            if let Some(v) = first_name {
                form.first_name = v;
            }
            if let Some(v) = last_name {
                form.last_name = v;
            }
            if email.is_some() {
                form.email = email;
            }
            if phone.is_some() {
                form.phone_number = phone;
            }
            form.submit()?
        }
        MembersCommand::Deactivate { id, reason } => {
            let (_, member) = member_ref(office, id).await?;
            DeactivateMemberForm { member, reason }.submit()?
        }
        MembersCommand::Reactivate { id } => {
            let (_, member) = member_ref(office, id).await?;
            ActionRequest::ReactivateMember { member }
        }
        MembersCommand::Shares { id, quantity } => {
            let (_, member) = member_ref(office, id).await?;
            PurchaseSharesForm { member, quantity }.submit()?
        }
    };
    controller.submit(request).await?;
    Ok(())
}

async fn show_member(office: &BackOffice, id: i64) -> Result<()> {
    let api = office.api();
    let member = api
        .member_full(MemberId(id))
        .await
        .with_context(|| format!("failed to load member {id}"))?;
    let accounts = match &member.saving_accounts {
        Some(accounts) => accounts.clone(),
        None => api.member_accounts(member.id).await?,
    };
    print!("{}", render::member_detail(&member, &accounts));
    Ok(())
}

async fn accounts(command: AccountsCommand, office: &BackOffice) -> Result<()> {
    guard(&office.session().state(), Screen::Accounts)?;
    let controller = office.accounts();
    let request = match command {
        AccountsCommand::List(args) => {
            let query = args.into_query(office.query("id"));
            let viewer = viewer(office);
            return show_list(controller, query, &account_columns(), viewer.as_deref()).await;
        }
        AccountsCommand::Open {
            member,
            kind,
            monthly,
            target,
        } => {
            let account_type = AccountType::parse(&kind)
                .ok_or_else(|| anyhow!("account kind must be FORMAL or INFORMAL"))?;
            let mut form = CreateAccountForm::new(account_type);
            form.member_id = member;
            form.monthly_amount = monthly;
            form.target_amount = target;
            form.submit()?
        }
        AccountsCommand::Deposit {
            id,
            amount,
            description,
        } => transaction(office, id, TransactionKind::Deposit, amount, description).await?,
        AccountsCommand::Withdraw {
            id,
            amount,
            description,
        } => transaction(office, id, TransactionKind::Withdraw, amount, description).await?,
        AccountsCommand::Monthly { id } => ActionRequest::MonthlyDeposit {
            account: account_ref(office, id).await?.1,
        },
        AccountsCommand::Deactivate { id } => ActionRequest::DeactivateAccount {
            account: account_ref(office, id).await?.1,
        },
        AccountsCommand::Reactivate { id } => ActionRequest::ReactivateAccount {
            account: account_ref(office, id).await?.1,
        },
        AccountsCommand::Close { id } => ActionRequest::CloseAccount {
            account: account_ref(office, id).await?.1,
        },
    };
    controller.submit(request).await?;
    Ok(())
}

async fn transaction(
    office: &BackOffice,
    id: i64,
    kind: TransactionKind,
    amount: String,
    description: String,
) -> Result<ActionRequest> {
    let (account, reference) = account_ref(office, id).await?;
    let mut form = TransactionForm::new(reference, account.current_balance, kind);
    form.amount = amount;
    form.description = description;
    Ok(form.submit()?)
}

async fn staff(command: StaffCommand, office: &BackOffice) -> Result<()> {
    guard(&office.session().state(), Screen::StaffManagement)?;
    let controller = office.staff();
    let request = match command {
        StaffCommand::List(args) => {
            let query = args.into_query(office.query("username"));
            let viewer = viewer(office);
            return show_list(controller, query, &staff_columns(), viewer.as_deref()).await;
        }
        StaffCommand::Register {
            username,
            password,
            role,
        } => RegisterStaffForm {
            username,
            password,
            role,
        }
        .submit()?,
        StaffCommand::Role { username, role } => {
            let current = current_role(office, &username).await?;
            let mut form = ChangeRoleForm::new(username, current);
            form.new_role = role;
            form.submit()?
        }
        StaffCommand::Delete { username } => {
            if viewer(office).as_deref() == Some(username.as_str()) {
                bail!("you cannot delete your own account");
            }
            ActionRequest::DeleteStaff { username }
        }
    };
    controller.submit(request).await?;
    Ok(())
}

async fn current_role(office: &BackOffice, username: &str) -> Result<Role> {
    let query = office.query("username").with_search(username);
    let staff = office.api().list_staff(&query).await?;
    staff
        .into_items()
        .into_iter()
        .find(|user| user.username == username)
        .map(|user| user.role)
        .ok_or_else(|| anyhow!("no staff member named '{username}'"))
}

async fn enforcement(command: EnforcementCommand, office: &BackOffice) -> Result<()> {
    guard(&office.session().state(), Screen::Enforcement)?;
    let controller = office.enforcement();
    match command {
        EnforcementCommand::Accounts(args) => {
            let query = args.into_query(office.query("id"));
            let viewer = viewer(office);
            show_list(controller, query, &enforcement_columns(), viewer.as_deref()).await
        }
        EnforcementCommand::BulkDeposit {
            domain,
            amount,
            description,
        } => {
            let request = BulkDepositForm {
                work_domain: domain,
                amount,
                description,
            }
            .submit()?;
            controller.submit(request).await?;
            Ok(())
        }
    }
}
