//! Maintenance commands for the cooperative fund ledger.
//!
//! Everything here goes through the same engine operations the web layer
//! uses, so a fix applied from the terminal can never disagree with what the
//! pages show.

use std::error::Error;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use engine::{AddDeductionCmd, Engine, Money};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "lingap_admin")]
#[command(about = "Admin utilities for the lingap fund ledger")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./lingap.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capital seed and yearly report.
    Capital(Capital),
    /// Interest baseline, verification, recompute.
    Interest(Interest),
    /// Monthly contribution maintenance.
    Contributions(Contributions),
    /// Manual capital deductions.
    Deduction(Deduction),
}

#[derive(Args, Debug)]
struct Capital {
    #[command(subcommand)]
    command: CapitalCommand,
}

#[derive(Subcommand, Debug)]
enum CapitalCommand {
    /// Set the manually seeded capital for a year.
    Set(YearAmountArgs),
    /// Print the year's capital and cash-flow picture.
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct Interest {
    #[command(subcommand)]
    command: InterestCommand,
}

#[derive(Subcommand, Debug)]
enum InterestCommand {
    /// Set the manual interest baseline folded into the collected total.
    SetBase(YearAmountArgs),
    /// Compare the cached interest total against a fresh recomputation.
    Verify(YearArgs),
    /// Recompute the year's collected interest from the paid rows.
    Recalc(YearArgs),
}

#[derive(Args, Debug)]
struct Contributions {
    #[command(subcommand)]
    command: ContributionsCommand,
}

#[derive(Subcommand, Debug)]
enum ContributionsCommand {
    /// Set the contribution fee for every member for a year.
    SetAmount(YearAmountArgs),
    /// Mark every pending contribution of a year paid.
    MarkPaid(YearArgs),
    /// Recompute the year's collected contributions from the paid rows.
    Recalc(YearArgs),
}

#[derive(Args, Debug)]
struct Deduction {
    #[command(subcommand)]
    command: DeductionCommand,
}

#[derive(Subcommand, Debug)]
enum DeductionCommand {
    Add(DeductionAddArgs),
    Undo(DeductionUndoArgs),
}

#[derive(Args, Debug)]
struct YearArgs {
    #[arg(long)]
    year: i32,
}

#[derive(Args, Debug)]
struct YearAmountArgs {
    #[arg(long)]
    year: i32,
    /// Amount in pesos, e.g. `300` or `15.50`.
    #[arg(long, value_parser = parse_money)]
    amount: Money,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long)]
    year: i32,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DeductionAddArgs {
    #[arg(long)]
    year: i32,
    /// 1-12 or a month name (`jun`, `june`).
    #[arg(long)]
    month: String,
    /// Amount in pesos; defaults to the ₱15 monthly fee.
    #[arg(long, value_parser = parse_money)]
    amount: Option<Money>,
    #[arg(long)]
    description: Option<String>,
    /// Allow a second deduction for the same month.
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct DeductionUndoArgs {
    #[arg(long)]
    id: i64,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

/// Parse a month from a number or an English name. Returns 1-12.
fn parse_month(input: &str) -> Option<u32> {
    let input = input.trim().to_lowercase();

    let by_name = match input.as_str() {
        "jan" | "january" => Some(1),
        "feb" | "february" => Some(2),
        "mar" | "march" => Some(3),
        "apr" | "april" => Some(4),
        "may" => Some(5),
        "jun" | "june" => Some(6),
        "jul" | "july" => Some(7),
        "aug" | "august" => Some(8),
        "sep" | "sept" | "september" => Some(9),
        "oct" | "october" => Some(10),
        "nov" | "november" => Some(11),
        "dec" | "december" => Some(12),
        _ => None,
    };
    if by_name.is_some() {
        return by_name;
    }

    match input.parse::<u32>() {
        Ok(num) if (1..=12).contains(&num) => Some(num),
        _ => None,
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_report(report: &engine::YearReport) {
    println!("=== Year: {} ===", report.year);
    println!("Capital (manual seed):     {}", report.capital);
    println!("Interest collected:        {}", report.interest_collected);
    println!(
        "  of which manual baseline: {}",
        report.interest_collected_base
    );
    println!("Contributions collected:   {}", report.contributions_collected);
    println!("Money released:            {}", report.money_released);
    println!("Remaining loan balances:   {}", report.total_loan_balances);
    println!("Deductions:                {}", report.total_deductions);
    println!("Base capital:              {}", report.base_capital);
    println!("Available capital:         {}", report.available_capital);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lingap_admin=info,engine=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    let outcome = run(&engine, cli.command).await;
    if let Err(err) = outcome {
        eprintln!("{err}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(engine: &Engine, command: Command) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        Command::Capital(Capital {
            command: CapitalCommand::Set(args),
        }) => {
            engine.set_capital(args.year, args.amount).await?;
            println!("capital for {} set to {}", args.year, args.amount);
        }
        Command::Capital(Capital {
            command: CapitalCommand::Report(args),
        }) => {
            let report = engine.year_report(args.year).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Interest(Interest {
            command: InterestCommand::SetBase(args),
        }) => {
            let summary = engine.set_interest_base(args.year, args.amount).await?;
            println!(
                "interest baseline for {} set to {}; collected total is now {}",
                args.year, args.amount, summary.interest_collected
            );
        }
        Command::Interest(Interest {
            command: InterestCommand::Verify(args),
        }) => {
            let verification = engine.verify_interest_collected(args.year).await?;
            println!("=== Year: {} ===", verification.year);
            println!("Cached interest_collected:  {}", verification.cached);
            println!("Manual baseline:            {}", verification.base);
            println!(
                "Recomputed paid payments:   {} ({} payment(s))",
                verification.actual, verification.paid_payments
            );
            for entry in &verification.by_month {
                println!(
                    "  - month {:>2}: {} payment(s), {}",
                    entry.month, entry.payments, entry.total
                );
            }
            if verification.is_consistent() {
                println!("values match");
            } else {
                println!("MISMATCH: run `interest recalc --year {}`", verification.year);
                std::process::exit(1);
            }
        }
        Command::Interest(Interest {
            command: InterestCommand::Recalc(args),
        }) => {
            let total = engine.recalc_interest_collected(args.year).await?;
            println!("interest collected for {} is now {}", args.year, total);
        }
        Command::Contributions(Contributions {
            command: ContributionsCommand::SetAmount(args),
        }) => {
            let rows = engine.set_contribution_amount(args.year, args.amount).await?;
            println!(
                "contribution fee for {} set to {} ({rows} row(s) touched)",
                args.year, args.amount
            );
        }
        Command::Contributions(Contributions {
            command: ContributionsCommand::MarkPaid(args),
        }) => {
            let today = Local::now().date_naive();
            let receipt = engine.mark_contributions_paid(args.year, today).await?;
            println!(
                "marked {} contribution(s) paid for {}, total {}",
                receipt.marked, args.year, receipt.total
            );
        }
        Command::Contributions(Contributions {
            command: ContributionsCommand::Recalc(args),
        }) => {
            let total = engine.recalc_contributions_collected(args.year).await?;
            println!("contributions collected for {} is now {}", args.year, total);
        }
        Command::Deduction(Deduction {
            command: DeductionCommand::Add(args),
        }) => {
            let Some(month) = parse_month(&args.month) else {
                eprintln!(
                    "invalid month: {}. Use 1-12 or a month name (jan, january, ...)",
                    args.month
                );
                std::process::exit(2);
            };
            let mut cmd = AddDeductionCmd::new(args.year, month);
            if let Some(amount) = args.amount {
                cmd = cmd.amount(amount);
            }
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            if args.force {
                cmd = cmd.force();
            }
            let amount = cmd.amount;
            let id = engine.add_deduction(cmd).await?;
            println!(
                "deduction of {amount} recorded for {}-{month:02} (id {id}); it reduces available capital",
                args.year
            );
        }
        Command::Deduction(Deduction {
            command: DeductionCommand::Undo(args),
        }) => {
            engine.undo_deduction(args.id).await?;
            println!("deduction {} removed", args.id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_month;

    #[test]
    fn parse_month_accepts_numbers_and_names() {
        assert_eq!(parse_month("6"), Some(6));
        assert_eq!(parse_month("jun"), Some(6));
        assert_eq!(parse_month("June"), Some(6));
        assert_eq!(parse_month(" SEPT "), Some(9));
        assert_eq!(parse_month("december"), Some(12));
    }

    #[test]
    fn parse_month_rejects_out_of_range() {
        assert_eq!(parse_month("0"), None);
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("m13"), None);
        assert_eq!(parse_month(""), None);
    }
}
