use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use tick_pulse::config::Config;
use tick_pulse::event::FeedStatus;
use tick_pulse::feed::{spawn_feed, FeedHandle};
use tick_pulse::input::{parse_command, ShellCommand, HELP_TEXT};
use tick_pulse::instrument_catalog::InstrumentCatalog;
use tick_pulse::model::signal::Recommendation;

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

fn render_recommendation(rec: &Recommendation) -> String {
    let ind = &rec.indicators;
    let mut out = format!(
        "{} @ {:.4} ({} ticks)\n  SMA20 {}  SMA50 {}  RSI14 {}  VOL20 {}  MOM10 {}%\n",
        rec.symbol,
        rec.price,
        rec.sample_count,
        fmt_opt(ind.sma20, 4),
        fmt_opt(ind.sma50, 4),
        fmt_opt(ind.rsi14, 2),
        fmt_opt(ind.volatility20, 4),
        fmt_opt(ind.momentum10, 2),
    );
    for signal in &rec.signals {
        out.push_str(&format!("  {}\n", signal));
    }
    out.push_str(&format!(
        "  trend strength {:+} => {}",
        rec.trend_strength, rec.action
    ));
    out
}

fn render_status(status: &FeedStatus) -> String {
    let mut out = format!(
        "{} [{}{}] window {} ticks, last {}",
        status.symbol,
        status.state,
        if status.public_fallback { ", public" } else { "" },
        status.window_len,
        fmt_opt(status.last_price, 4),
    );
    if let Some(err) = &status.last_error {
        out.push_str(&format!("\n  last error: {}", err));
    }
    out
}

async fn run_shell(feed: &FeedHandle, catalog: &InstrumentCatalog) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP_TEXT);

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let Some(cmd) = parse_command(&line) else {
            if !line.trim().is_empty() {
                println!("unknown command, type 'help'");
            }
            continue;
        };
        match cmd {
            ShellCommand::Analyze => match feed.analyze().await? {
                Ok(rec) => println!("{}", render_recommendation(&rec)),
                Err(e) => println!("analysis declined: {}", e),
            },
            ShellCommand::SelectMarket(symbol) => match catalog.resolve(&symbol) {
                Some(instrument) => {
                    feed.select_instrument(&instrument.symbol).await?;
                    println!("switching to {} ({})", instrument.symbol, instrument.label);
                }
                None => println!("unknown instrument '{}', see 'markets'", symbol),
            },
            ShellCommand::ListMarkets => {
                for instrument in catalog.instruments() {
                    println!("  {:<10} {}", instrument.symbol, instrument.label);
                }
            }
            ShellCommand::Reconnect => {
                feed.reconnect().await?;
                println!("reconnecting");
            }
            ShellCommand::Status => println!("{}", render_status(&feed.status())),
            ShellCommand::ShowLog(n) => {
                for record in feed.recent_events(n).await? {
                    println!("{}", record);
                }
            }
            ShellCommand::Help => println!("{}", HELP_TEXT),
            ShellCommand::Quit => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure config/default.toml exists (or set TICK_PULSE_CONFIG)");
            std::process::exit(1);
        }
    };

    // Log to file so it doesn't interleave with the shell
    let log_file = std::fs::File::create("tick-pulse.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .json()
        .init();

    let ws_url = config.deriv.ws_url()?;
    tracing::info!(
        symbol = %config.deriv.symbol,
        ws_url = %ws_url,
        authorized = config.deriv.api_token.is_some(),
        "Starting tick-pulse"
    );

    let catalog = InstrumentCatalog::from_symbols(&config.deriv.tradable_symbols());
    let (feed, feed_task) = spawn_feed(&config)?;

    tokio::select! {
        res = run_shell(&feed, &catalog) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "shell stopped");
                eprintln!("{:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received");
        }
    }

    feed.shutdown().await;
    let _ = feed_task.await;
    Ok(())
}
