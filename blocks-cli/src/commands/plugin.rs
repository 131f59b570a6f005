//! Plugin commands

use anyhow::Result;
use blocks_core::{HostContext, LoadState, PluginDescriptor, PluginHost, PluginHostConfig};
use blocks_plugin_api::PluginConfig;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::config::BlocksConfig;

/// Plugin arguments
#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommands,
}

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginCommands {
    /// Load every plugin and list what was found
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load every plugin and report activations and failures
    Scan,
    /// Show plugin details
    Info {
        /// Plugin name, type name, or file name
        name: String,
    },
    /// Show where plugins are loaded from
    Dir,
}

/// Run plugin command
///
/// Every subcommand that loads plugins shuts them down again before returning.
pub fn run(args: PluginArgs, config: &BlocksConfig) -> Result<()> {
    let ctx = host_context(config)?;
    let mut host = PluginHost::new(host_config(config));

    let result = match args.command {
        PluginCommands::List { json } => list_plugins(&mut host, &ctx, json),
        PluginCommands::Scan => scan_plugins(&mut host, &ctx),
        PluginCommands::Info { name } => show_plugin_info(&mut host, &ctx, &name),
        PluginCommands::Dir => show_plugin_dir(&host),
    };

    host.shutdown();

    if ctx.config_is_dirty() {
        ctx.save_config(&config.plugins.settings)?;
        tracing::debug!(path = %config.plugins.settings.display(), "Saved plugin settings");
    }

    // Plugin services go before the libraries holding their code
    drop(ctx);
    drop(host);

    result
}

fn host_config(config: &BlocksConfig) -> PluginHostConfig {
    PluginHostConfig {
        plugin_dir: config.plugins.dir.clone(),
        extensions: config.plugins.extensions.clone(),
    }
}

fn host_context(config: &BlocksConfig) -> Result<HostContext> {
    let settings = PluginConfig::load(&config.plugins.settings)?;
    Ok(HostContext::new(
        config.app.name.clone(),
        blocks_paths::app_dir(),
        config.plugins.dir.clone(),
        settings,
    ))
}

fn list_plugins(host: &mut PluginHost, ctx: &HostContext, json: bool) -> Result<()> {
    host.load_all(ctx);
    let plugins = host.list_plugins();

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    if plugins.is_empty() {
        println!("No plugins installed");
        println!();
        println!("Plugin directory: {}", host.plugin_dir().display());
        println!();
        println!("To install a plugin, copy its library into the plugin directory:");
        println!("  cp target/release/libmy_plugin.so {}/", host.plugin_dir().display());
        return Ok(());
    }

    println!("{}", plugin_table(&plugins));
    Ok(())
}

fn plugin_table(plugins: &[PluginDescriptor]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Unit").fg(Color::Cyan),
        Cell::new("Activated").fg(Color::Cyan),
    ]);

    for p in plugins {
        let activated = p
            .activated_at
            .map(|t| t.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            status_cell(&p.state),
            Cell::new(p.name.as_deref().unwrap_or("-")),
            Cell::new(p.type_name.as_deref().unwrap_or("-")),
            Cell::new(&p.unit),
            Cell::new(activated),
        ]);
    }

    table
}

fn status_cell(state: &LoadState) -> Cell {
    match state {
        LoadState::Activated => Cell::new("✓").fg(Color::Green),
        LoadState::Deactivated => Cell::new("○").fg(Color::Grey),
        LoadState::Loaded => Cell::new("·"),
        LoadState::Failed { .. } => Cell::new("✗").fg(Color::Red),
    }
}

fn scan_plugins(host: &mut PluginHost, ctx: &HostContext) -> Result<()> {
    let report = host.load_all(ctx);

    println!("Scanned {}", report.directory.display());

    for name in &report.activated {
        println!("  ✓ {}", name);
    }
    for failure in &report.failures {
        println!("  ✗ {}: {}", failure.path.display(), failure.error);
    }

    println!();
    println!(
        "{} activated, {} failed",
        report.activated.len(),
        report.failures.len()
    );

    Ok(())
}

fn show_plugin_info(host: &mut PluginHost, ctx: &HostContext, name: &str) -> Result<()> {
    host.load_all(ctx);

    let Some(info) = host.get_plugin_info(name) else {
        println!("Plugin '{}' not found", name);
        println!();
        println!("Run 'nobleblocks plugin list' to see every discovered plugin.");
        return Ok(());
    };

    println!("Name:      {}", info.name.as_deref().unwrap_or("-"));
    println!("Type:      {}", info.type_name.as_deref().unwrap_or("-"));
    println!("Unit:      {}", info.unit);
    println!("Path:      {}", info.path.display());

    match &info.state {
        LoadState::Activated => println!("Status:    Activated"),
        LoadState::Deactivated => println!("Status:    Deactivated"),
        LoadState::Loaded => println!("Status:    Loaded (declares no plugins)"),
        LoadState::Failed { error } => println!("Status:    Failed ({})", error),
    }

    if let Some(at) = info.activated_at {
        println!("Activated: {}", at.to_rfc3339());
    }

    Ok(())
}

fn show_plugin_dir(host: &PluginHost) -> Result<()> {
    let dir = host.plugin_dir();
    let exists = if dir.is_dir() { "" } else { " (missing)" };

    println!("Plugin directory: {}{}", dir.display(), exists);
    println!(
        "Extensions:       {}",
        host.recognized_extensions().join(", ")
    );
    Ok(())
}
