//! bvs-admin: terminal front end for the BVS admin API
//!
//! Each subcommand drives the same list-page pattern the dashboard uses:
//! authenticate, load a collection, optionally mutate it, load again.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use bvs_admin::shared::{
    Bills, EntityId, FilterState, Filterable, HistoryDate, Hotels, MutableResource, Orders,
    PendingPricingOrders, Products, Resource, Suppliers, SupportTickets, TodaysFilling,
    TodaysHotelsOrders, TodaysVegetables, UnpaidBills, UnpaidReport, Users, status_counts,
};
use bvs_admin::{
    AdminApi, ClientConfig, ClientError, FileTokenStore, MutationExecutor, ProcessEnv,
    ReqwestHttpClient, ResourceCollection, ResourceListController, SessionGuard,
};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Admin client for the BVS vegetable supply API
#[derive(Parser)]
#[command(name = "bvs-admin", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange credentials for a session token
    Login(LoginArgs),
    /// Forget the stored session token
    Logout,
    /// Load a collection once and print it
    List(ListArgs),
    /// Keep a collection on screen, refreshing it periodically
    Watch(WatchArgs),
    /// Delete one row, then reload the collection
    Delete(DeleteArgs),
    /// Move an order to another status
    SetStatus(SetStatusArgs),
    /// Set the stock quantity of a product
    SetStock(SetStockArgs),
    /// Fix the line prices of an order awaiting pricing
    FinalizePrices(FinalizePricesArgs),
    /// Answer or close a support ticket
    #[command(subcommand)]
    Ticket(TicketCommands),
    /// Summarize outstanding bills
    Unpaid(UnpaidArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ResourceKind {
    Orders,
    PendingPricing,
    Products,
    Users,
    Hotels,
    Suppliers,
    Bills,
    UnpaidBills,
    Filling,
    HotelsOrders,
    Vegetables,
    Tickets,
}

#[derive(Clone, Copy, ValueEnum)]
enum MutableKind {
    Orders,
    Products,
    Users,
    Hotels,
    Suppliers,
    Bills,
    Tickets,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(short, long)]
    username: String,

    /// Read from stdin when omitted
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    resource: ResourceKind,

    /// Show the history view for a day (YYYY-MM-DD)
    #[arg(long)]
    date: Option<HistoryDate>,

    /// Show the history view for today
    #[arg(long, conflicts_with = "date")]
    today: bool,

    /// Status or category to keep ("all" keeps everything)
    #[arg(long, default_value = "all")]
    filter: String,

    /// Case-insensitive text search
    #[arg(long, default_value = "")]
    search: String,

    /// Print rows as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WatchArgs {
    resource: ResourceKind,

    /// Refresh period in seconds (defaults to BVS_REFRESH_SECS)
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Args)]
struct DeleteArgs {
    resource: MutableKind,
    id: EntityId,

    /// Confirm the deletion
    #[arg(long)]
    yes: bool,
}

#[derive(Args)]
struct SetStatusArgs {
    id: EntityId,
    status: String,
}

#[derive(Args)]
struct SetStockArgs {
    id: EntityId,
    quantity: f64,
}

#[derive(Args)]
struct FinalizePricesArgs {
    /// Order awaiting pricing
    id: EntityId,

    /// Price per unit for one product, as PRODUCT_ID=PRICE (repeatable)
    #[arg(long = "price", value_name = "PRODUCT_ID=PRICE", value_parser = parse_price)]
    prices: Vec<(EntityId, f64)>,
}

#[derive(Subcommand)]
enum TicketCommands {
    /// Post an admin reply
    Reply { id: EntityId, message: String },
    /// Mark the ticket closed
    Close { id: EntityId },
}

#[derive(Args)]
struct UnpaidArgs {
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing from RUST_LOG env (default: info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match App::from_env() {
        Ok(app) => app.run(cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            if e
                .downcast_ref::<ClientError>()
                .is_some_and(ClientError::requires_login)
            {
                eprintln!("Run `bvs-admin login` to start a new session.");
            }
            ExitCode::FAILURE
        }
    }
}

macro_rules! with_resource {
    ($kind:expr, $func:ident($($arg:expr),*)) => {
        match $kind {
            ResourceKind::Orders => $func::<Orders>($($arg),*).await,
            ResourceKind::PendingPricing => $func::<PendingPricingOrders>($($arg),*).await,
            ResourceKind::Products => $func::<Products>($($arg),*).await,
            ResourceKind::Users => $func::<Users>($($arg),*).await,
            ResourceKind::Hotels => $func::<Hotels>($($arg),*).await,
            ResourceKind::Suppliers => $func::<Suppliers>($($arg),*).await,
            ResourceKind::Bills => $func::<Bills>($($arg),*).await,
            ResourceKind::UnpaidBills => $func::<UnpaidBills>($($arg),*).await,
            ResourceKind::Filling => $func::<TodaysFilling>($($arg),*).await,
            ResourceKind::HotelsOrders => $func::<TodaysHotelsOrders>($($arg),*).await,
            ResourceKind::Vegetables => $func::<TodaysVegetables>($($arg),*).await,
            ResourceKind::Tickets => $func::<SupportTickets>($($arg),*).await,
        }
    };
}

macro_rules! with_mutable {
    ($kind:expr, $func:ident($($arg:expr),*)) => {
        match $kind {
            MutableKind::Orders => $func::<Orders>($($arg),*).await,
            MutableKind::Products => $func::<Products>($($arg),*).await,
            MutableKind::Users => $func::<Users>($($arg),*).await,
            MutableKind::Hotels => $func::<Hotels>($($arg),*).await,
            MutableKind::Suppliers => $func::<Suppliers>($($arg),*).await,
            MutableKind::Bills => $func::<Bills>($($arg),*).await,
            MutableKind::Tickets => $func::<SupportTickets>($($arg),*).await,
        }
    };
}

struct App {
    config: ClientConfig,
    api: AdminApi<ReqwestHttpClient>,
}

impl App {
    fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env(&ProcessEnv).context("Failed to read configuration")?;
        let store = FileTokenStore::new(&config.token_file);
        let session = Arc::new(SessionGuard::init(Box::new(store)));
        let api = AdminApi::new(
            config.api_url.clone(),
            Arc::new(ReqwestHttpClient::new()),
            session,
        );
        Ok(Self { config, api })
    }

    async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.login(args).await,
            Commands::Logout => {
                self.api.logout();
                println!("Logged out");
                Ok(())
            }
            Commands::List(args) => {
                self.ensure_session()?;
                with_resource!(args.resource, cmd_list(self, &args))
            }
            Commands::Watch(args) => {
                self.ensure_session()?;
                with_resource!(args.resource, cmd_watch(self, &args))
            }
            Commands::Delete(args) => {
                self.ensure_session()?;
                with_mutable!(args.resource, cmd_delete(self, &args))
            }
            Commands::SetStatus(args) => {
                self.ensure_session()?;
                cmd_set_status(self, args).await
            }
            Commands::SetStock(args) => {
                self.ensure_session()?;
                cmd_set_stock(self, args).await
            }
            Commands::FinalizePrices(args) => {
                self.ensure_session()?;
                cmd_finalize_prices(self, args).await
            }
            Commands::Ticket(command) => {
                self.ensure_session()?;
                cmd_ticket(self, command).await
            }
            Commands::Unpaid(args) => {
                self.ensure_session()?;
                cmd_unpaid(self, args).await
            }
        }
    }

    fn ensure_session(&self) -> Result<()> {
        if !self.api.session().is_authenticated() {
            bail!(ClientError::NotAuthenticated);
        }
        Ok(())
    }

    async fn login(&self, args: LoginArgs) -> Result<()> {
        let password = match args.password {
            Some(password) => password,
            None => read_password().context("Failed to read password from stdin")?,
        };
        self.api.login(&args.username, &password).await?;
        println!("Logged in as {}", args.username);
        Ok(())
    }

    fn controller<R: Resource>(&self) -> Arc<ResourceListController<R, ReqwestHttpClient>> {
        ResourceListController::new(self.api.clone())
    }
}

fn read_password() -> io::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// ---------------------------------------------------------------------------
// list / watch
// ---------------------------------------------------------------------------

async fn cmd_list<R: Resource>(app: &App, args: &ListArgs) -> Result<()> {
    let date = if args.today {
        Some(HistoryDate::today())
    } else {
        args.date
    };
    let filter = FilterState::default()
        .with_status(args.filter.clone())
        .with_search(args.search.clone())
        .with_history_date(date);

    let controller = app.controller::<R>();
    let rows = controller.apply(&filter).await;

    let state = controller.state();
    if let Some(message) = state.error {
        bail!(message);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        print_row(row);
    }
    println!("{} of {} {}", rows.len(), state.items.len(), R::NAME);
    print_counts(&state.items);
    Ok(())
}

async fn cmd_watch<R: Resource>(app: &App, args: &WatchArgs) -> Result<()> {
    let period = args
        .interval
        .map(Duration::from_secs)
        .or(app.config.refresh_interval)
        .context("Auto-refresh is disabled; pass --interval")?;

    let controller = app.controller::<R>();
    let mut rx = controller.subscribe();
    controller.load().await;
    report(R::NAME, &*rx.borrow_and_update());

    controller.start_auto_refresh(period);
    info!(resource = R::NAME, "watching, press Ctrl-C to stop");

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if !state.loading {
                    report(R::NAME, &state);
                }
                if !app.api.session().is_authenticated() {
                    bail!(ClientError::Unauthorized);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.stop_auto_refresh();
    Ok(())
}

fn report<T: Filterable>(name: &str, state: &ResourceCollection<T>) {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    match &state.error {
        Some(message) => println!("[{stamp}] {message}"),
        None => {
            println!("[{stamp}] {} {}", state.items.len(), name);
            print_counts(&state.items);
        }
    }
}

fn print_row<T: Filterable>(row: &T) {
    println!(
        "{:<14} {}",
        row.category().unwrap_or("-"),
        row.search_fields().join(" | ")
    );
}

fn print_counts<T: Filterable>(items: &[T]) {
    let counts = status_counts(items);
    if counts.is_empty() {
        return;
    }
    let line = counts
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  {line}");
}

// ---------------------------------------------------------------------------
// mutations
// ---------------------------------------------------------------------------

async fn cmd_delete<R: MutableResource>(app: &App, args: &DeleteArgs) -> Result<()> {
    if !args.yes {
        bail!("Refusing to delete {} {} without --yes", R::NAME, args.id);
    }

    let controller = app.controller::<R>();
    let executor = MutationExecutor::<R, _>::new(app.api.clone());
    controller.refetch_after(executor.delete(&args.id), "Deleted").await?;

    print_notice(&controller);
    println!("{} {} remaining", controller.state().items.len(), R::NAME);
    Ok(())
}

async fn cmd_set_status(app: &App, args: SetStatusArgs) -> Result<()> {
    let controller = app.controller::<Orders>();
    let executor = MutationExecutor::<Orders, _>::new(app.api.clone());
    controller
        .refetch_after(executor.update_status(&args.id, &args.status), "Status updated")
        .await?;

    print_notice(&controller);
    println!("Order {} is now {}", args.id, args.status);
    print_counts(&controller.state().items);
    Ok(())
}

async fn cmd_set_stock(app: &App, args: SetStockArgs) -> Result<()> {
    let controller = app.controller::<Products>();
    let executor = MutationExecutor::<Products, _>::new(app.api.clone());
    controller
        .refetch_after(executor.update_stock(&args.id, args.quantity), "Stock updated")
        .await?;

    print_notice(&controller);
    println!("Product {} stock set to {}", args.id, args.quantity);
    Ok(())
}

async fn cmd_finalize_prices(app: &App, args: FinalizePricesArgs) -> Result<()> {
    let controller = app.controller::<PendingPricingOrders>();
    controller.load().await;
    let state = controller.state();
    if let Some(message) = state.error {
        bail!(message);
    }
    let order = state
        .items
        .into_iter()
        .find(|order| order.id == args.id)
        .with_context(|| format!("Order {} is not awaiting pricing", args.id))?;

    let prices: HashMap<EntityId, f64> = args.prices.into_iter().collect();
    let executor = MutationExecutor::<PendingPricingOrders, _>::new(app.api.clone());
    controller
        .refetch_after(executor.finalize_prices(&order, &prices), "Prices finalized")
        .await?;

    print_notice(&controller);
    println!("{} orders still awaiting pricing", controller.state().items.len());
    Ok(())
}

async fn cmd_ticket(app: &App, command: TicketCommands) -> Result<()> {
    let controller = app.controller::<SupportTickets>();
    let executor = MutationExecutor::<SupportTickets, _>::new(app.api.clone());
    match command {
        TicketCommands::Reply { id, message } => {
            controller.refetch_after(executor.reply(&id, &message), "Reply sent").await?;
        }
        TicketCommands::Close { id } => {
            controller.refetch_after(executor.close(&id), "Ticket closed").await?;
        }
    }

    print_notice(&controller);
    print_counts(&controller.state().items);
    Ok(())
}

/// Prints the pending notice once and dismisses it
fn print_notice<R: Resource>(controller: &ResourceListController<R, ReqwestHttpClient>) {
    if let Some(notice) = controller.state().notice {
        println!("{}", notice.message);
        controller.clear_notice();
    }
}

fn parse_price(raw: &str) -> Result<(EntityId, f64), String> {
    let (id, price) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PRODUCT_ID=PRICE, got {raw:?}"))?;
    let price = price
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid price {price:?}"))?;
    let Ok(id) = id.trim().parse::<EntityId>();
    Ok((id, price))
}

// ---------------------------------------------------------------------------
// unpaid
// ---------------------------------------------------------------------------

async fn cmd_unpaid(app: &App, args: UnpaidArgs) -> Result<()> {
    let report: UnpaidReport = app
        .api
        .get_json(UnpaidBills::LIST_PATH, "Failed to fetch unpaid bills")
        .await?;
    let breakdown = report.hotel_breakdown.clone();
    let summary = report.summarize();

    if args.json {
        let value = serde_json::json!({
            "bills": summary.bills,
            "hotel_breakdown": breakdown,
            "total_amount": summary.total_amount,
            "bill_count": summary.bill_count,
            "oldest_bill": summary.oldest_bill,
            "average_amount": summary.average_amount,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for bill in &summary.bills {
        println!(
            "{:<12} {:<24} {:>10.2}",
            bill.bill_date.as_deref().unwrap_or("-"),
            bill.hotel_name.as_deref().unwrap_or("-"),
            bill.total_amount
        );
    }
    println!();
    for due in &breakdown {
        println!(
            "{:<24} {:>10.2}",
            due.hotel_name.as_deref().unwrap_or("-"),
            due.total_amount
        );
    }
    println!(
        "Total {:.2} across {} bills (average {:.2}), oldest {}",
        summary.total_amount,
        summary.bill_count,
        summary.average_amount,
        summary
            .oldest_bill
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}
