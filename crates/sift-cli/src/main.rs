//! Sift CLI - Explainable transaction categorization
//!
//! Usage:
//!   sift init                          Initialize database
//!   sift categories add Coffee --keywords coffee,espresso
//!   sift test "STARBUCKS 0512" --stats Categorize one description
//!   sift preview --file statement.csv  Preview a bulk import
//!   sift serve --port 3000             Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = cli.user.as_str();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_categories_list(&db, user, false),
                Some(CategoriesAction::List { all }) => {
                    commands::cmd_categories_list(&db, user, all)
                }
                Some(CategoriesAction::Add {
                    name,
                    category_type,
                    keywords,
                    patterns,
                }) => commands::cmd_categories_add(
                    &db,
                    user,
                    &name,
                    category_type,
                    keywords,
                    patterns,
                ),
                Some(CategoriesAction::Update {
                    id,
                    name,
                    category_type,
                    keywords,
                    patterns,
                    activate,
                    deactivate,
                }) => {
                    let is_active = match (activate, deactivate) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    };
                    commands::cmd_categories_update(
                        &db,
                        user,
                        id,
                        sift_core::models::CategoryUpdate {
                            name,
                            category_type,
                            keywords,
                            merchant_patterns: patterns,
                            is_active,
                        },
                    )
                }
                Some(CategoriesAction::Delete { id }) => {
                    commands::cmd_categories_delete(&db, user, id)
                }
            }
        }
        Commands::Settings { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            match action {
                None | Some(SettingsAction::Show) => {
                    commands::cmd_settings_show(&db, user, &config)
                }
                Some(SettingsAction::Set {
                    threshold,
                    auto,
                    methods,
                }) => commands::cmd_settings_set(&db, user, &config, threshold, auto, methods),
            }
        }
        Commands::Test {
            text,
            merchant,
            stats,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_test(&db, user, config, &text, merchant.as_deref(), stats)
        }
        Commands::Preview {
            file,
            overwrite_existing,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_preview(&db, user, config, &file, overwrite_existing, json)
        }
        Commands::Analyze { file, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_analyze(&db, user, config, &file, json)
        }
        Commands::Audit { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_audit(&db, user, limit)
        }
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_serve(
                &cli.db,
                config,
                &host,
                port,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
    }
}
