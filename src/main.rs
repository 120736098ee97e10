use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use portfolio_dashboard::client::ApiClient;
use portfolio_dashboard::config::AppConfig;
use portfolio_dashboard::dashboard::{Dashboard, LoadState, RefreshOutcome};
use portfolio_dashboard::export::export_holdings_csv;
use portfolio_dashboard::models::Holding;
use portfolio_dashboard::report;
use portfolio_dashboard::table::holdings::HoldingField;
use portfolio_dashboard::table::{SortDirection, TableEngine};
use portfolio_dashboard::utils::Timer;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "portfolio-dashboard", about = "Portfolio analytics dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Backend base URL (overrides api.base_url)
    #[arg(long, env = "PORTFOLIO_API_URL", global = true)]
    api_url: Option<String>,
}

/// Holdings view actions, applied in order: filter, sort, columns, page size, page.
#[derive(Args, Debug)]
struct ViewArgs {
    /// Case-insensitive substring matched against the filter column
    #[arg(short, long)]
    filter: Option<String>,

    /// Column the filter applies to (default from config)
    #[arg(long)]
    filter_by: Option<HoldingField>,

    /// Column to sort by
    #[arg(short, long)]
    sort: Option<HoldingField>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Hide a column (repeatable)
    #[arg(long)]
    hide: Vec<HoldingField>,

    #[arg(long)]
    page_size: Option<NonZeroUsize>,
}

#[derive(Subcommand)]
enum Command {
    /// Totals, best/worst performers and diversification
    Summary,

    /// One page of the holdings table
    Holdings {
        #[command(flatten)]
        view: ViewArgs,

        /// 1-based page number; out-of-range pages are clamped
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Portfolio vs benchmarks, as % change from the first point
    Performance {
        /// Show raw values instead of % change
        #[arg(long)]
        absolute: bool,
    },

    /// Sector and market-cap allocation
    Allocation,

    /// Write the filtered, sorted holdings (visible columns) to CSV
    Export {
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
}

fn apply_view(engine: &mut TableEngine<Holding>, args: &ViewArgs) {
    if let Some(field) = args.filter_by {
        engine.set_filter_field(field);
    }
    if let Some(text) = &args.filter {
        engine.set_filter(text.as_str());
    }
    if let Some(field) = args.sort {
        let direction = if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        engine.set_sort(field, direction);
    }
    for &field in &args.hide {
        engine.set_column_visibility(field, false);
    }
    if let Some(size) = args.page_size {
        engine.set_page_size(size);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "portfolio_dashboard=info,warn",
        1 => "portfolio_dashboard=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    let client = ApiClient::new(&config.api)?;
    info!("Backend: {}", client.base_url());
    let dashboard = Dashboard::new(client, &config.table);

    {
        let _t = Timer::start("Dashboard fetch");
        match dashboard.refresh().await {
            RefreshOutcome::Committed { .. } => {}
            RefreshOutcome::Failed { error, .. } => {
                eprint!("{}", report::render_error(&error.to_string()));
                bail!("dashboard fetch failed");
            }
            // Single-shot CLI: nothing else can bump the epoch.
            RefreshOutcome::Discarded { epoch } => bail!("refresh #{} was superseded", epoch),
        }
    }

    let LoadState::Ready { snapshot, metrics } = dashboard.load_state().await else {
        bail!("dashboard has no data");
    };

    match cli.command {
        Command::Summary => {
            print!("{}", report::render_summary(&metrics, &snapshot));
        }

        Command::Holdings { view, page } => {
            let text = dashboard
                .update_holdings(|engine| {
                    apply_view(engine, &view);
                    engine.go_to_page(page.saturating_sub(1));
                    report::render_holdings(&engine.visible_rows())
                })
                .await;
            print!("{}", text);
        }

        Command::Performance { absolute } => {
            print!("{}", report::render_performance(&metrics, absolute));
        }

        Command::Allocation => {
            print!("{}", report::render_allocations(&metrics, &snapshot));
        }

        Command::Export { out, view } => {
            let _t = Timer::start("CSV export");
            let n = dashboard
                .update_holdings(|engine| {
                    apply_view(engine, &view);
                    export_holdings_csv(engine, &out)
                })
                .await?;
            println!("{} holdings written to {}", n, out.display());
        }
    }

    Ok(())
}
