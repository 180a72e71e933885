use anyhow::{Context, Result};
use clap::Parser;
use roster_bot::{render_event, BotConfig, Console};
use roster_core::{ChannelId, MemberStyle};
use std::path::PathBuf;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "roster-bot")]
#[command(about = "Community roster manager and role bot, driven from the console", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Roster state file (overrides config and ROSTER_STATE_FILE)
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Roster channel id (overrides config and ROSTER_CHANNEL_ID)
    #[arg(long)]
    channel: Option<u64>,

    /// Display style at startup
    #[arg(long)]
    style: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for bot output)
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(&cli)?;
    let console = Console::start(&config, |event| println!("{}", render_event(event))).await;
    console.run(BufReader::new(tokio::io::stdin())).await
}

fn load_config(cli: &Cli) -> Result<BotConfig> {
    let mut config = BotConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    config
        .apply_env()
        .context("Failed to apply environment overrides")?;

    if let Some(path) = &cli.state_file {
        config.state_file = path.clone();
    }
    if let Some(channel) = cli.channel {
        config.roster_channel_id = Some(ChannelId(channel));
    }
    if let Some(style) = &cli.style {
        config.default_style = style
            .parse::<MemberStyle>()
            .with_context(|| format!("Unknown style '{style}'"))?;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
