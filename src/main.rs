use clap::Parser;
use linc::country::CountryRegistry;
use linc::{jobs, seed, settings, storage, web};
use miette::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "linc",
    version,
    about = "Multi-country driver's licensing records backend"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// JSON seed file with user groups and users; overrides bootstrap.seed_file
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    let registry = CountryRegistry::builtin();

    // one database per enabled country
    let tenants = storage::init(&settings, &registry).await?;

    if let Some(path) = cli.seed.as_ref().or(settings.bootstrap.seed_file.as_ref()) {
        seed::sync_from_file(&tenants, path).await?;
    }

    // keep the scheduler alive for the lifetime of the server
    let _scheduler = jobs::init_scheduler(tenants.clone(), &settings).await?;

    let state = web::AppState::new(settings, registry, tenants);
    web::serve(state).await?;
    Ok(())
}
