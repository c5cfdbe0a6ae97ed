use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burza::backend::BackendClient;
use burza::cache::{RefreshReport, RefreshScope};
use burza::config::{self, LogFormat};
use burza::dispatch::{Command, Outcome};
use burza::eligibility;
use burza::format;
use burza::redirect::PaymentReturn;
use burza::session::Session;
use burza::Marketplace;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cfg = config::load()?;
    let args = Cli::parse();

    init_tracing(cfg.log_format);

    if let Some(url) = &args.backend_url {
        cfg.backend_url = url::Url::parse(url).context("invalid --backend-url")?;
    }
    if let Some(token) = args.token.clone() {
        cfg.session_token = Some(token);
    }

    let session = cfg
        .session_token
        .take()
        .map(Session::from_bearer)
        .transpose()
        .context("session token is not a valid JWT")?;
    if let Some(s) = &session {
        tracing::info!(user_id = %s.user_id(), role = ?s.role(), "signed in");
    }

    let api = Arc::new(BackendClient::new(&cfg.backend_url)?);
    let market = Marketplace::new(api, session).with_listings_take(cfg.listings_take);

    if let Err(e) = run(&market, args.command.unwrap_or(Commands::Status)).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "burza=info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(market: &Marketplace, command: Commands) -> anyhow::Result<()> {
    if let Commands::Return { url } = &command {
        // Only a success indicator refreshes, so no initial load here.
        let outcome = market.handle_payment_return(url).await?;
        match outcome.indicator {
            None => println!("No payment result in URL."),
            Some(_) if outcome.duplicate => println!("Payment result already handled."),
            Some(PaymentReturn::Success) => {
                println!("Payment completed.");
                if let Some(report) = &outcome.refresh {
                    report_refresh(report);
                }
                print_status(market).await;
            }
            Some(PaymentReturn::Cancel) => println!("Payment cancelled."),
        }
        println!("Continue at {}", outcome.cleaned_url);
        return Ok(());
    }

    if let Commands::Refresh = command {
        report_refresh(&market.refresh(RefreshScope::ALL).await);
        print_status(market).await;
        return Ok(());
    }

    report_refresh(&market.sign_in().await);

    match command {
        Commands::Status => print_status(market).await,
        Commands::Supply => print_supply(market).await,
        Commands::Wallet => print_wallet(market).await,
        Commands::Listings { mine } => print_listings(market, mine).await?,
        Commands::Buy { quantity } => dispatch(market, Command::BuyTreasury { quantity }).await?,
        Commands::BuyListing { listing_id } => {
            dispatch(market, Command::BuyListing { listing_id }).await?
        }
        Commands::List {
            price,
            token_ids,
            count,
        } => {
            let token_ids = match count {
                Some(n) => market
                    .eligibility()
                    .await
                    .sellable
                    .into_iter()
                    .take(n)
                    .map(|t| t.id)
                    .collect(),
                None => token_ids,
            };
            dispatch(
                market,
                Command::CreateListing {
                    token_ids,
                    price_eur: price,
                },
            )
            .await?
        }
        Commands::Cancel { listing_id } => {
            dispatch(market, Command::CancelListing { listing_id }).await?
        }
        Commands::Mint {
            quantity,
            price,
            year,
        } => {
            dispatch(
                market,
                Command::Mint {
                    quantity,
                    price_eur: price,
                    year: year.unwrap_or_else(|| market.year()),
                },
            )
            .await?
        }
        Commands::SetPrice {
            price,
            reprice_treasury,
        } => {
            dispatch(
                market,
                Command::Reprice {
                    price_eur: price,
                    reprice_treasury,
                },
            )
            .await?
        }
        Commands::Exec { json } => {
            let command: Command =
                serde_json::from_str(&json).context("invalid command object")?;
            dispatch(market, command).await?
        }
        Commands::Return { .. } | Commands::Refresh => {}
    }
    Ok(())
}

async fn dispatch(market: &Marketplace, command: Command) -> anyhow::Result<()> {
    let operation = command.operation();
    match market.execute(command).await {
        Ok(Outcome::Redirect { url }) => println!("Continue to payment: {}", url),
        Ok(Outcome::Completed) => println!("Done."),
        Ok(Outcome::Batch(report)) => {
            println!("Listed {} token(s).", report.listed.len());
            for (token_id, message) in &report.failed {
                println!("  {} not listed: {}", token_id, message);
            }
        }
        Err(e) => anyhow::bail!(e.user_message(operation)),
    }
    Ok(())
}

fn report_refresh(report: &RefreshReport) {
    for (kind, err) in &report.failures {
        eprintln!("Could not load {}: {}", kind.as_str(), err);
    }
}

async fn print_status(market: &Marketplace) {
    print_supply(market).await;
    if market.session().is_some() {
        print_wallet(market).await;
        let view = market.eligibility().await;
        println!(
            "Owned for {}: {} / {}",
            view.year,
            view.owned_this_year,
            eligibility::ANNUAL_LIMIT
        );
        if view.treasury_purchase_enabled {
            println!("You can buy up to {} more token(s).", view.purchasable_quantity);
        } else {
            println!("Treasury purchase unavailable.");
        }
    }
}

async fn print_supply(market: &Marketplace) {
    match market.snapshot().await.supply {
        Some(s) => println!(
            "Treasury {}: {} available @ {} ({} minted, {} sold)",
            s.year,
            s.treasury_available,
            format::eur(s.price_eur),
            s.total_minted,
            s.total_sold
        ),
        None => println!("Treasury supply unavailable."),
    }
}

async fn print_wallet(market: &Marketplace) {
    let Some(balance) = market.snapshot().await.balance else {
        println!("Wallet unavailable.");
        return;
    };
    let summary = balance.summary();
    println!(
        "Wallet: {} ({} active, {} listed, {} spent)",
        format::minutes(summary.total_minutes),
        summary.active,
        summary.listed,
        summary.spent
    );
    for t in &balance.tokens {
        let marker = if eligibility::is_sellable(t) { " *" } else { "" };
        println!(
            "  {}  {}  {} min  {}{}",
            t.id,
            t.issued_year,
            t.minutes_remaining,
            t.status.as_str(),
            marker
        );
    }
}

async fn print_listings(market: &Marketplace, mine: bool) -> anyhow::Result<()> {
    let listings = market.snapshot().await.listings;
    let user_id = market.session().map(|s| s.user_id());
    let shown = if mine {
        let user_id = user_id.context("sign in to see your listings")?;
        eligibility::own_listings(&listings, user_id)
    } else {
        eligibility::listings_from_others(&listings, user_id)
    };
    if shown.is_empty() {
        println!("No open listings.");
    }
    for l in shown {
        println!(
            "  {}  token {}  {}  {}",
            l.id,
            l.token_id,
            format::eur(l.price_eur),
            l.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
