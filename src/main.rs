use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use expense_dashboard::{
    category_totals, format_amount, new_expense_id, Category, Config, ExpenseDraft,
    ExpenseStore, SpendingSummary, Storage,
};

#[derive(Parser)]
#[clap(name = "expense-dashboard", version, about = "Track daily expenses from the terminal")]
struct Cli {
    #[clap(flatten)]
    config: Config,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive dashboard (default)
    Tui,

    /// Print every recorded expense
    List {
        /// Print the stored JSON instead of a table
        #[clap(long)]
        json: bool,
    },

    /// Record a new expense
    Add {
        #[clap(long)]
        amount: f64,
        #[clap(long)]
        description: String,
        #[clap(long)]
        category: String,
        /// Defaults to today
        #[clap(long)]
        date: Option<NaiveDate>,
    },

    /// Change fields of an existing expense
    Edit {
        id: String,
        #[clap(long)]
        amount: Option<f64>,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        category: Option<String>,
        #[clap(long)]
        date: Option<NaiveDate>,
    },

    /// Remove an expense
    Delete { id: String },

    /// Today / week / month totals and the category breakdown
    Summary {
        /// Reference day, defaults to today
        #[clap(long)]
        today: Option<NaiveDate>,
    },

    /// List the categories accepted by `add` and `edit`
    Categories,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.config.init_logging()?;

    let storage = cli.config.open_storage()?;
    info!(backend = ?cli.config.backend, dir = %cli.config.data_dir.display(), "Opening expenses");

    let mut store = ExpenseStore::load(storage);
    let today = Utc::now().date_naive();

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_ui_mode(store, today)?,
        Command::List { json } => {
            report_store_error(&store);
            run_list(&store, json)?;
        }
        Command::Add {
            amount,
            description,
            category,
            date,
        } => {
            let draft = ExpenseDraft {
                amount: Some(amount),
                description,
                category,
                date: Some(date.unwrap_or(today)),
            };
            let expense = check(draft.into_expense(new_expense_id(), today))?;

            println!("✓ Added {} ({}) as {}", expense.description, format_amount(expense.amount), expense.id);
            store.add(expense);
            finish(&store)?;
        }
        Command::Edit {
            id,
            amount,
            description,
            category,
            date,
        } => {
            let Some(existing) = store.get(&id) else {
                bail!("No expense with id {}", id);
            };

            let mut draft = ExpenseDraft::from_expense(existing);
            if let Some(amount) = amount {
                draft.amount = Some(amount);
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(category) = category {
                draft.category = category;
            }
            if let Some(date) = date {
                draft.date = Some(date);
            }

            let expense = check(draft.into_expense(id, today))?;
            println!("✓ Updated {}", expense.description);
            store.update(expense);
            finish(&store)?;
        }
        Command::Delete { id } => {
            let Some(existing) = store.get(&id).cloned() else {
                bail!("No expense with id {}", id);
            };

            store.delete(&id);
            println!("✓ {} has been removed", existing.description);
            finish(&store)?;
        }
        Command::Summary { today: reference } => {
            report_store_error(&store);
            run_summary(&store, reference.unwrap_or(today));
        }
        Command::Categories => {
            for category in Category::ALL {
                println!("{}", category);
            }
        }
    }

    Ok(())
}

fn check<T>(result: std::result::Result<T, Vec<expense_dashboard::FieldError>>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(errors) => {
            for error in &errors {
                eprintln!("❌ {}: {}", error.field, error.message);
            }
            bail!("Expense rejected ({} problem(s))", errors.len())
        }
    }
}

fn report_store_error<S: Storage>(store: &ExpenseStore<S>) {
    if let Some(message) = store.last_error() {
        eprintln!("⚠️  {}", message);
    }
}

/// Surface the error slot after a mutation; a failed save is a failed command.
fn finish<S: Storage>(store: &ExpenseStore<S>) -> Result<()> {
    match store.last_error() {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

fn run_list<S: Storage>(store: &ExpenseStore<S>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(store.expenses())?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No expenses recorded yet.");
        return Ok(());
    }

    println!("{:<38} {:<12} {:<30} {:<16} {:>10}", "ID", "Date", "Description", "Category", "Amount");
    println!("{}", "━".repeat(110));
    for expense in store.expenses() {
        println!(
            "{:<38} {:<12} {:<30} {:<16} {:>10}",
            expense.id,
            expense.day().format("%Y-%m-%d"),
            expense.description,
            expense.category,
            format_amount(expense.amount),
        );
    }
    println!("\n{} expenses", store.len());

    Ok(())
}

fn run_summary<S: Storage>(store: &ExpenseStore<S>, today: NaiveDate) {
    let summary = SpendingSummary::compute(store.expenses(), today);

    println!("📊 Spending as of {}", today.format("%B %-d, %Y"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("Today:       {:>12}", format_amount(summary.today_total));
    match summary.trend_label() {
        Some(trend) => println!("   {}", trend),
        None => println!(),
    }
    println!("This week:   {:>12}", format_amount(summary.week_total));
    println!("This month:  {:>12}", format_amount(summary.month_total));

    let totals = category_totals(store.expenses());
    if totals.is_empty() {
        println!("\nNo data to display");
        return;
    }

    println!("\nBy category");
    let max = totals.iter().map(|t| t.total).fold(0.0_f64, f64::max);
    for entry in totals {
        let width = if max > 0.0 {
            ((entry.total.max(0.0) / max) * 30.0).round() as usize
        } else {
            0
        };
        println!(
            "  {:<16} {:>10}  {}",
            entry.category,
            format_amount(entry.total),
            "█".repeat(width)
        );
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode<S: Storage>(store: ExpenseStore<S>, today: NaiveDate) -> Result<()> {
    let mut app = expense_dashboard::ui::App::new(store, today);
    expense_dashboard::ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode<S: Storage>(store: ExpenseStore<S>, today: NaiveDate) -> Result<()> {
    let _ = (store, today);
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the subcommands: list, add, edit, delete, summary");
    std::process::exit(1);
}
