use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chain_bridge::{
    AsyncDispatcher, BlockingDispatcher, BridgeConfig, ChannelSink, PipelineEvent, SinkEvent,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "chain-bridge")]
#[command(about = "Replay pipeline event logs through the chat message bridge")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a JSON lines event log to a dispatcher and print the sink operations
    Replay {
        /// File with one pipeline event per line
        file: PathBuf,

        /// Bridge configuration (TOML or JSON)
        #[arg(long, env = "CHAIN_BRIDGE_CONFIG")]
        config: Option<PathBuf>,

        /// Use the blocking dispatcher instead of the async one
        #[arg(long)]
        blocking: bool,

        /// Print sink events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Replay {
            file,
            config,
            blocking,
            json,
        } => replay(&file, config.as_deref(), blocking, json),
    }
}

fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}] {} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => BridgeConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Parses a JSON lines event log. Blank lines and `#` comments are skipped.
fn parse_events(input: &str) -> anyhow::Result<Vec<(usize, PipelineEvent)>> {
    let mut events = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event: PipelineEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("line {line_no}: invalid pipeline event"))?;
        events.push((line_no, event));
    }
    Ok(events)
}

fn replay(file: &Path, config: Option<&Path>, blocking: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let input = fs::read_to_string(file)
        .with_context(|| format!("failed to read event log {}", file.display()))?;
    let events = parse_events(&input)?;
    log::info!(
        "replaying {} events from {} ({} dispatcher)",
        events.len(),
        file.display(),
        if blocking { "blocking" } else { "async" }
    );

    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    let (sink, mut rx) = ChannelSink::new();
    let sink = Arc::new(sink);

    if blocking {
        let mut dispatcher = BlockingDispatcher::new(config, sink, runtime.handle().clone());
        for (line_no, event) in &events {
            dispatcher
                .handle(event)
                .with_context(|| format!("line {line_no}: {} failed", event.name()))?;
            print_events(&mut rx, json)?;
        }
    } else {
        runtime.block_on(async {
            let mut dispatcher = AsyncDispatcher::new(config, sink);
            for (line_no, event) in &events {
                dispatcher
                    .handle(event)
                    .await
                    .with_context(|| format!("line {line_no}: {} failed", event.name()))?;
                print_events(&mut rx, json)?;
            }
            anyhow::Ok(())
        })?;
    }

    Ok(())
}

fn print_events(rx: &mut UnboundedReceiver<SinkEvent>, json: bool) -> anyhow::Result<()> {
    while let Ok(event) = rx.try_recv() {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", render(&event));
        }
    }
    Ok(())
}

fn render(event: &SinkEvent) -> String {
    match event {
        SinkEvent::MessageSent { message, .. } => {
            let pad = "  ".repeat(message.indent);
            if message.content.is_empty() {
                format!("{pad}{}", format!("▸ {}", message.author).cyan())
            } else {
                format!(
                    "{pad}{} {}",
                    format!("{}:", message.author).cyan(),
                    message.content
                )
            }
        }
        SinkEvent::StreamOpened { stream, message } => {
            let pad = "  ".repeat(message.indent);
            let mut line = format!(
                "{pad}{}",
                format!("⇢ {} streaming [{stream}]", message.author).yellow()
            );
            if let Some(settings) = &message.settings {
                line.push_str(&format!(" {}", format!("({})", settings.model_name).dimmed()));
            }
            line
        }
        SinkEvent::Token { stream, token } => {
            format!("{} {}", format!("  [{stream}]").dimmed(), token.green())
        }
        SinkEvent::StreamSent { stream, .. } => {
            format!("{}", format!("✅ sent [{stream}]").green())
        }
        SinkEvent::StreamDiscarded { stream } => {
            format!("{}", format!("✖ dropped [{stream}]").dimmed())
        }
        SinkEvent::ErrorSent {
            author, content, ..
        } => format!("{}", format!("❌ {author}: {content}").red()),
        SinkEvent::TokenCountUpdated { total } => {
            format!("{}", format!("📊 total tokens: {total}").dimmed())
        }
    }
}
