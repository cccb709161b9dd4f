//! Autolote command-line entry point

use autolote::data::ListingFilter;
use autolote::error::AppError;
use autolote::export::ExportFormat;
use autolote::service::FavoriteOutcome;
use autolote::{Marketplace, config};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "autolote", version, about = "Used-car marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List unsold vehicles, optionally searched or filtered
    Browse {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Brand or model prefix
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        brand: Option<i64>,
        #[arg(long)]
        model: Option<i64>,
        #[arg(long)]
        year_from: Option<i64>,
        #[arg(long)]
        year_to: Option<i64>,
        #[arg(long)]
        price_from: Option<i64>,
        #[arg(long)]
        price_to: Option<i64>,
        #[arg(long)]
        doors: Option<i32>,
        #[arg(long)]
        order_by_price: bool,
        #[arg(long)]
        order_by_year: bool,
    },
    /// Show one vehicle by id
    Show { id: i64 },
    /// List your favorites
    Favorites {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Add a vehicle to your favorites
    FavoriteAdd { id: i64 },
    /// Remove a vehicle from your favorites
    FavoriteRemove { id: i64 },
    /// Export a vehicle's technical sheet
    Export {
        id: i64,
        #[arg(long, default_value = "png")]
        format: String,
    },
    /// Delete one of your vehicles and everything attached to it
    DeleteListing { id: i64 },
    /// Store a session token
    Login { token: String },
    /// Forget the stored session token
    Logout,
}

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Initialize metrics
/// 4. Build the shared marketplace resources
/// 5. Run the requested command
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG still overrides the level
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.logging.default_directive().into())
    };
    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
    tracing::info!(base_url = %config.api.base_url, "Configuration loaded");

    // 3. Initialize metrics
    autolote::metrics::init_metrics();

    // 4. Build shared resources
    let market = Marketplace::new(config)?;

    // 5. Run command
    let operation = operation_name(&cli.command);
    if let Err(error) = run(&market, cli.command).await {
        tracing::error!(%error, operation, "Command failed");
        eprintln!("{}", error.user_message(operation));
        std::process::exit(1);
    }

    Ok(())
}

fn operation_name(command: &Command) -> &'static str {
    match command {
        Command::Browse { .. } => "browse",
        Command::Show { .. } => "show",
        Command::Favorites { .. } => "favorites",
        Command::FavoriteAdd { .. } => "favorite_add",
        Command::FavoriteRemove { .. } => "favorite_remove",
        Command::Export { .. } => "export",
        Command::DeleteListing { .. } => "delete_listing",
        Command::Login { .. } => "login",
        Command::Logout => "logout",
    }
}

async fn run(market: &Marketplace, command: Command) -> Result<(), AppError> {
    match command {
        Command::Browse {
            page,
            search,
            brand,
            model,
            year_from,
            year_to,
            price_from,
            price_to,
            doors,
            order_by_price,
            order_by_year,
        } => {
            let browser = market.browser();
            let filters = ListingFilter {
                brand,
                model,
                year_from,
                year_to,
                price_from,
                price_to,
                doors,
                order_by_price,
                order_by_year,
                ..ListingFilter::default()
            };
            if !filters.is_empty() {
                browser.set_filters(filters).await;
            }
            if let Some(text) = search {
                browser.set_search_query(text).await;
            }
            browser.set_page(page).await.wait().await;

            let state = browser.snapshot().await;
            if let Some(message) = state.last_error {
                eprintln!("{message}");
                std::process::exit(1);
            }
            for listing in &state.items {
                println!(
                    "{:>6}  {:<32} {}",
                    listing.id_cars,
                    listing.headline(),
                    autolote::export::format_price_crc(listing.price)
                );
            }
            println!("page {}/{}", state.page, state.total_pages);
        }
        Command::Show { id } => {
            let listing = market.listings().find_by_id(id).await?.ok_or(AppError::NotFound)?;
            let sheet = autolote::export::TechnicalSheet::from_listing(&listing);
            for line in sheet.text_lines() {
                println!("{line}");
            }
            if let Some(link) = sheet.seller.and_then(|seller| seller.whatsapp) {
                println!("WhatsApp: {link}");
            }
        }
        Command::Favorites { page } => {
            let mut favorites = market.favorites_manager()?;
            favorites.load().await?;
            let (items, pages) = favorites.page(page);
            for car in items {
                println!("{:>6}  {:<32} {}", car.id_cars, car.title, car.price_label);
            }
            println!("page {}/{}", page.clamp(1, pages), pages);
        }
        Command::FavoriteAdd { id } => {
            let user_id = market.viewer().ok_or(AppError::Unauthorized)?;
            match market.favorites().add(user_id, id).await? {
                FavoriteOutcome::Added => println!("Agregado a favoritos"),
                FavoriteOutcome::AlreadyFavorite => {
                    println!("Este vehículo ya está en tus favoritos")
                }
            }
        }
        Command::FavoriteRemove { id } => {
            let user_id = market.viewer().ok_or(AppError::Unauthorized)?;
            market.favorites().remove(user_id, id).await?;
            println!("Eliminado de favoritos");
        }
        Command::Export { id, format } => {
            let format: ExportFormat = format.parse()?;
            let listing = market.listings().find_by_id(id).await?.ok_or(AppError::NotFound)?;
            let exported = market.exporter().export_today(&listing, format).await?;
            println!("{}", exported.path.display());
        }
        Command::DeleteListing { id } => {
            market.viewer().ok_or(AppError::Unauthorized)?;
            let outcome = market.deletion().delete_listing(id).await?;
            println!(
                "Publicación eliminada ({} imágenes)",
                outcome.images_deleted
            );
        }
        Command::Login { token } => {
            let claims = autolote::auth::decode_token(&token)?;
            market.tokens.save(&token)?;
            println!("Sesión iniciada como usuario {}", claims.id_user);
        }
        Command::Logout => {
            market.tokens.clear()?;
            println!("Sesión cerrada");
        }
    }
    Ok(())
}
