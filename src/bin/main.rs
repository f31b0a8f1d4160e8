use anyhow::Context;
use std::env;
use stock_screener::cli::{self, View};
use stock_screener::config::Config;
use stock_screener::provider::{LocalProvider, MarketDataProvider, YahooProvider};
use stock_screener::{io, report, views};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "stock_screener=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print whole tables unless the user set their own polars limits.
fn configure_table_display() {
    for var in ["POLARS_FMT_MAX_ROWS", "POLARS_FMT_MAX_COLS"] {
        if env::var_os(var).is_none() {
            env::set_var(var, "-1");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = cli::parse_args();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(config) = &config {
        config.merge_with_cli(&mut args);
    }

    init_logging(args.verbose);
    configure_table_display();
    debug!(?args, "stock screener starting");

    let provider: Box<dyn MarketDataProvider> = match &args.data_dir {
        Some(data_dir) => Box::new(LocalProvider::new(data_dir)?),
        None => {
            let provider_config = config.map(|c| c.provider).unwrap_or_default();
            Box::new(YahooProvider::new(&provider_config).context("Failed to create HTTP client")?)
        }
    };

    let tickers_input = args.tickers.clone().unwrap_or_default();
    let data = views::validate_and_fetch(
        provider.as_ref(),
        &tickers_input,
        args.start_date(),
        args.end_date(),
        args.concurrent,
    )?;

    match args.view {
        View::Individual => {
            let view = views::individual_view(provider.as_ref(), &data);
            print!("{}", report::render_individual_view(&view)?);

            if let Some(output_dir) = &args.output {
                for path in io::export_individual_view(&view, output_dir, args.force)? {
                    println!("Saved: {}", path.display());
                }
            }
        }
        View::Portfolio => {
            let view = views::portfolio_view(&data)?;
            print!("{}", report::render_portfolio_view(&view)?);

            if let Some(output_dir) = &args.output {
                for path in io::export_portfolio_view(&view, output_dir, args.force)? {
                    println!("Saved: {}", path.display());
                }
            }
        }
    }

    info!("stock screener finished");
    Ok(())
}
