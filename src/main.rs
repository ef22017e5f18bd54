use clap::Parser;

mod app;
mod cli;
mod config;
mod db;
mod error;
mod feed;
mod models;
mod scrape;
mod services;
#[cfg(test)]
mod test_support;

use app::App;
use cli::Cli;
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.db_path = db.to_string_lossy().to_string();
    }

    let app = App::new(&config).await?;

    if let Err(e) = app.run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
