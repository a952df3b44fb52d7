// YieldVault CLI - Command-line client for the YieldVault server

mod client;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use uuid::Uuid;

use client::{ApiClient, InvestmentSummary, TransactionSummary};

/// YieldVault - wallet and fixed-term investment client
#[derive(Parser)]
#[command(name = "yieldvault")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server address
    #[arg(long, env = "YIELDVAULT_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// User to act as
    #[arg(long, env = "YIELDVAULT_USER")]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active plans
    Plans,
    /// Buy a plan with wallet funds
    Buy {
        /// Plan to buy
        plan_id: Uuid,
    },
    /// List your investments
    Investments {
        /// Only show investments that have not matured yet
        #[arg(short, long)]
        active: bool,
    },
    /// Show wallet balance, investments and recent activity
    Dashboard,
    /// Show transaction history
    History {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Request a deposit (credited after admin approval)
    Deposit {
        amount: i64,

        /// Reference to the payment proof
        #[arg(long)]
        proof: Option<String>,
    },
    /// Request a withdrawal (debited after admin approval)
    Withdraw { amount: i64 },
    /// Admin operations
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Show platform-wide totals
    Stats,
    /// List deposit and withdrawal requests awaiting review
    Pending,
    /// Approve a pending request
    Approve { transaction_id: Uuid },
    /// Reject a pending request
    Reject { transaction_id: Uuid },
    /// Run one maturity sweep now
    Sweep,
}

fn main() {
    let cli = Cli::parse();
    let api = ApiClient::new(&cli.server);

    let result = match cli.command {
        Commands::Plans => handle_plans(&api, cli.user),
        Commands::Buy { plan_id } => {
            require_user(cli.user).and_then(|u| handle_buy(&api, u, plan_id))
        }
        Commands::Investments { active } => {
            require_user(cli.user).and_then(|u| handle_investments(&api, u, active))
        }
        Commands::Dashboard => require_user(cli.user).and_then(|u| handle_dashboard(&api, u)),
        Commands::History { limit } => {
            require_user(cli.user).and_then(|u| handle_history(&api, u, limit))
        }
        Commands::Deposit { amount, proof } => {
            require_user(cli.user).and_then(|u| handle_deposit(&api, u, amount, proof.as_deref()))
        }
        Commands::Withdraw { amount } => {
            require_user(cli.user).and_then(|u| handle_withdraw(&api, u, amount))
        }
        Commands::Admin { action } => handle_admin(&api, action),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn require_user(user: Option<Uuid>) -> Result<Uuid> {
    user.ok_or_else(|| anyhow!("No user given. Pass --user <UUID> or set YIELDVAULT_USER"))
}

fn handle_plans(api: &ApiClient, user: Option<Uuid>) -> Result<()> {
    let plans = api.plans(user)?;
    if plans.is_empty() {
        println!("No plans available.");
        return Ok(());
    }

    for plan in &plans {
        let lock = match plan.is_locked {
            Some(true) => " (locked)".yellow().to_string(),
            _ => String::new(),
        };
        let once = if plan.one_time_only { " one-time" } else { "" };
        let tags = format!("[{}{}]", plan.category, once);
        println!("{} {}{}", plan.title.bold(), tags.dimmed(), lock);
        println!(
            "  {} -> {}  (+{} / {}% over {} days)",
            rupees(plan.amount),
            rupees(plan.total_maturity_amount),
            rupees(plan.profit_amount),
            plan.return_percent,
            plan.duration_in_days
        );
        println!("  ID: {}", plan.id.to_string().dimmed());
    }
    Ok(())
}

fn handle_buy(api: &ApiClient, user: Uuid, plan_id: Uuid) -> Result<()> {
    let receipt = api.buy(user, plan_id)?;
    println!("{} {}", "✓".green().bold(), "Investment successful".green());
    println!();
    print_investment(&receipt.investment);
    println!();
    println!("  Wallet balance: {}", rupees(receipt.new_wallet_balance));
    Ok(())
}

fn handle_investments(api: &ApiClient, user: Uuid, active: bool) -> Result<()> {
    let investments = api.investments(user, active)?;
    if investments.is_empty() {
        println!("No investments yet.");
        return Ok(());
    }
    for investment in &investments {
        print_investment(investment);
    }
    Ok(())
}

fn handle_dashboard(api: &ApiClient, user: Uuid) -> Result<()> {
    let dashboard = api.dashboard(user)?;
    println!("  Wallet balance:     {}", rupees(dashboard.wallet_balance).bold());
    println!("  Total invested:     {}", rupees(dashboard.total_invested));
    println!("  Active investments: {}", dashboard.active_investments);

    if !dashboard.investments.is_empty() {
        println!();
        println!("{}", "Investments".bold());
        for investment in &dashboard.investments {
            print_investment(investment);
        }
    }

    if !dashboard.recent_transactions.is_empty() {
        println!();
        println!("{}", "Recent activity".bold());
        for tx in &dashboard.recent_transactions {
            print_transaction(tx);
        }
    }
    Ok(())
}

fn handle_history(api: &ApiClient, user: Uuid, limit: Option<u32>) -> Result<()> {
    let history = api.history(user, limit)?;
    if history.is_empty() {
        println!("No transactions yet.");
    }
    for tx in &history {
        print_transaction(tx);
    }
    Ok(())
}

fn handle_deposit(api: &ApiClient, user: Uuid, amount: i64, proof: Option<&str>) -> Result<()> {
    let receipt = api.deposit(user, amount, proof)?;
    println!("{} {}", "✓".green().bold(), receipt.message);
    println!("  Request ID: {}", receipt.transaction.id);
    Ok(())
}

fn handle_withdraw(api: &ApiClient, user: Uuid, amount: i64) -> Result<()> {
    let receipt = api.withdraw(user, amount)?;
    println!("{} {}", "✓".green().bold(), receipt.message);
    println!("  Request ID: {}", receipt.transaction.id);
    Ok(())
}

fn handle_admin(api: &ApiClient, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::Pending => {
            let pending = api.pending()?;
            if pending.is_empty() {
                println!("Nothing awaiting review.");
            }
            for tx in &pending {
                print_transaction(tx);
                println!("    ID: {}", tx.id.to_string().dimmed());
            }
            Ok(())
        }
        AdminAction::Stats => {
            let stats = api.stats()?;
            println!("  Users:               {}", stats.total_users);
            println!(
                "  Investments:         {} ({} active)",
                stats.total_investments, stats.active_investments
            );
            println!("  Total invested:      {}", rupees(stats.total_invested_amount));
            println!("  Pending deposits:    {}", stats.pending_deposits);
            println!("  Pending withdrawals: {}", stats.pending_withdrawals);
            Ok(())
        }
        AdminAction::Approve { transaction_id } => handle_review(api, transaction_id, true),
        AdminAction::Reject { transaction_id } => handle_review(api, transaction_id, false),
        AdminAction::Sweep => {
            let report = api.sweep()?;
            println!("{} Maturity sweep as of {}", "✓".green().bold(), report.as_of);
            println!("  Matured:  {}", report.found);
            println!("  Settled:  {}", report.completed);
            println!("  Skipped:  {}", report.skipped);
            let failed = report.failed.to_string();
            if report.failed > 0 {
                println!("  Failed:   {}", failed.red());
            } else {
                println!("  Failed:   {}", failed);
            }
            println!("  Credited: {}", rupees(report.credited));
            Ok(())
        }
    }
}

fn handle_review(api: &ApiClient, transaction_id: Uuid, approve: bool) -> Result<()> {
    let receipt = api.review(transaction_id, approve)?;
    println!("{} Transaction status updated", "✓".green().bold());
    print_transaction(&receipt.transaction);
    println!("  Wallet balance: {}", rupees(receipt.wallet_balance));
    Ok(())
}

fn print_investment(investment: &InvestmentSummary) {
    let status = match investment.status.as_str() {
        "active" => investment.status.cyan(),
        "completed" => investment.status.green(),
        _ => investment.status.normal(),
    };
    println!("  {} [{}]", investment.plan_title().bold(), status);
    println!(
        "    {} -> {}  matures {}",
        rupees(investment.invested_amount),
        rupees(investment.total_maturity_amount),
        date_part(&investment.maturity_date)
    );
    if investment.status == "active" {
        println!(
            "    {} days remaining, {:.0}% elapsed",
            investment.days_remaining, investment.progress_percent
        );
    }
}

fn print_transaction(tx: &TransactionSummary) {
    let amount = match tx.kind.as_str() {
        "deposit" | "return" => format!("+{}", rupees(tx.amount)).green(),
        _ => format!("-{}", rupees(tx.amount)).red(),
    };
    let status = match tx.status.as_str() {
        "pending" => tx.status.yellow(),
        "rejected" => tx.status.red(),
        _ => tx.status.dimmed(),
    };
    println!(
        "  {}  {:<10} {:>12}  {}  {}",
        date_part(&tx.created_at),
        tx.kind,
        amount,
        status,
        tx.description.as_deref().unwrap_or("")
    );
}

fn rupees(amount: i64) -> String {
    format!("₹{}", amount)
}

/// Date portion of an RFC 3339 timestamp.
fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}
