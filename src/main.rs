mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use bf_core::config::Config;
use bf_core::StyleCatalog;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting boothforge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    bf_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "boothforge=trace,bf_server=trace,bf_av=debug,bf_restyle=debug,bf_export=debug,bf_db=debug,tower_http=debug".to_string()
        } else {
            "boothforge=debug,bf_server=debug,bf_av=info,bf_restyle=info,bf_export=info,bf_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Styles => list_styles(cli.config.as_deref()),
        Commands::Version => {
            println!("boothforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = bf_av::ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. GIF and boomerang capture need ffmpeg.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration parses");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Media: {} -> {}", config.server.media_dir.display(), config.server.public_base_url);
    println!(
        "  Restyle: {} attempts, {} style overrides",
        config.restyle.max_attempts,
        config.restyle.styles.len()
    );
    println!(
        "  Export: concurrency {}, compression level {}",
        config.export.concurrency, config.export.compression_level
    );

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ No warnings");
    } else {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

fn list_styles(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let catalog = StyleCatalog::with_overrides(&config.restyle.styles);
    for style in catalog.all() {
        println!("{:<16} {:<20} {}", style.key, style.name, style.model);
    }
    Ok(())
}
