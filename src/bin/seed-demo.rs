//! Demo data seed script
//!
//! Publishes the sample menus for a day and the next, then books the sample
//! reservations against the first one. Runs through the same stores as the
//! API, so a configured remote backend receives the records too.
//!
//! Usage:
//!   ./seed-demo --data-dir ./data --date 2024-06-03 --reset

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;

use lunch_reservation_api::{
    config::Config,
    db::storage::{JsonFileRepository, AUTH_STORAGE, MENU_STORAGE, RESERVATION_STORAGE},
    models::{
        menu::{sample_menus, PublishMenuRequest},
        reservation::{sample_reservations, CreateReservationRequest},
    },
    services::today,
    AppState,
};

#[derive(Debug, Parser)]
#[command(about = "Seed the lunch reservation stores with demo data")]
struct Args {
    /// Local data directory (defaults to DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Day to seed (defaults to today, UTC)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Remove the existing local stores first
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    let date = args.date.unwrap_or_else(today);

    println!("=== Seed Demo Data ===");

    if args.reset {
        println!("Removing existing local stores...");
        for key in [AUTH_STORAGE, MENU_STORAGE, RESERVATION_STORAGE] {
            let repo = JsonFileRepository::new(&config.data_dir, key);
            let path = repo.path();
            if path.exists() {
                std::fs::remove_file(path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                println!("  Removed {}", path.display());
            }
        }
    }

    let state = AppState::from_config(config).await?;

    println!("Publishing menus...");
    for menu in sample_menus(date) {
        let menu_date = menu.date;
        let published = state
            .menus
            .publish_menu(&PublishMenuRequest {
                date: menu.date,
                name: menu.name,
                description: menu.description,
                price: menu.price,
                image_url: menu.image_url,
            })
            .await
            .with_context(|| format!("Failed to publish menu for {menu_date}"))?;
        println!("  {}: {} (¥{})", published.date, published.name, published.price);
    }

    println!("Booking reservations for {date}...");
    for sample in sample_reservations(date, Utc::now()) {
        let booked = state
            .reservations
            .add_reservation(&CreateReservationRequest {
                name: sample.name,
                room_number: sample.room_number,
                date: Some(date),
            })
            .await
            .context("Failed to add reservation")?;
        if sample.is_paid {
            state
                .reservations
                .set_payment_status(booked.id, true)
                .await
                .context("Failed to mark reservation paid")?;
        }
        println!(
            "  {} (room {}){}",
            booked.name,
            booked.room_number,
            if sample.is_paid { ", paid" } else { "" }
        );
    }

    let status = state.reservations.status().await;
    if let Some(error) = status.error {
        println!("Warning: remote mirror reported: {error}");
    }

    println!("=== Done ===");
    Ok(())
}
