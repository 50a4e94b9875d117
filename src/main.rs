use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tanc::app::{default_network_name, App};
use tanc::config::Config;
use tanc::resource::{CloudResource, ResourceKind, Snapshot};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Discover and extend Cloud SQL and GKE authorized networks
#[derive(Parser, Debug)]
#[command(name = "tanc", version = tanc::VERSION, about, long_about = None)]
struct Args {
    /// Project to fall back to when the project list is unavailable
    #[arg(long = "project", global = true)]
    fallback_project: Option<String>,

    /// Maximum concurrent list calls during discovery (1-20)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List SQL instances and GKE clusters in every accessible project
    List {
        /// Only show resources matching this text
        #[arg(short, long)]
        filter: Option<String>,

        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,

        /// Fail if any project could not be listed
        #[arg(long)]
        strict: bool,
    },
    /// Show one resource and its authorized networks
    Show {
        #[arg(value_enum)]
        kind: KindArg,
        project: String,
        name: String,
        /// Cluster zone or region (required for GKE)
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Authorize a network on a resource
    Add {
        #[arg(value_enum)]
        kind: KindArg,
        project: String,
        name: String,
        /// Cluster zone or region (required for GKE)
        #[arg(short, long)]
        location: Option<String>,
        /// Display name of the new network (defaults to the local user name)
        #[arg(long = "network-name")]
        network_name: Option<String>,
        /// Address or CIDR to authorize (defaults to your public IP)
        #[arg(long)]
        value: Option<String>,
    },
    /// Inspect or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Save the fallback project
    SetProject { project: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Sql,
    Gke,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sql => ResourceKind::DatabaseInstance,
            KindArg::Gke => ResourceKind::Cluster,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tanc {} started with log level: {:?}", tanc::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tanc").join("tanc.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tanc").join("tanc.log");
    }
    PathBuf::from("tanc.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    if let Some(project) = &args.fallback_project {
        config.project_id = Some(project.clone());
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }

    match args.command {
        Command::Config { action } => run_config(action, config),
        Command::List {
            filter,
            output,
            strict,
        } => {
            let app = App::connect(&config).await?;
            run_list(&app, filter.as_deref(), output, strict).await
        }
        Command::Show {
            kind,
            project,
            name,
            location,
        } => {
            let app = App::connect(&config).await?;
            let reference = resource_ref(kind.into(), &project, &name, location)?;
            let resource = app.fetch_detail(&reference).await?;
            print_detail(&resource);
            Ok(())
        }
        Command::Add {
            kind,
            project,
            name,
            location,
            network_name,
            value,
        } => {
            let app = App::connect(&config).await?;
            let reference = resource_ref(kind.into(), &project, &name, location)?;
            run_add(&app, &reference, network_name, value).await
        }
    }
}

fn run_config(action: ConfigAction, mut config: Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(project) = config.effective_project() {
                println!("\nEffective fallback project: {}", project);
            }
        }
        ConfigAction::SetProject { project } => {
            config.set_project(&project).context("Failed to save config")?;
            println!("Fallback project set to {}", project);
        }
    }
    Ok(())
}

fn resource_ref(
    kind: ResourceKind,
    project: &str,
    name: &str,
    location: Option<String>,
) -> Result<CloudResource> {
    let location = match (kind, location) {
        (ResourceKind::Cluster, None) => {
            anyhow::bail!("--location is required for GKE clusters")
        }
        (_, location) => location.unwrap_or_default(),
    };
    Ok(CloudResource::reference(kind, project, name, &location))
}

async fn run_list(app: &App, filter: Option<&str>, output: OutputFormat, strict: bool) -> Result<()> {
    let snapshot = app.discover().await?;

    let snapshot = if strict {
        Snapshot {
            resources: snapshot.into_strict()?,
            failures: Vec::new(),
        }
    } else {
        snapshot
    };

    let query = filter.unwrap_or("");
    let shown = Snapshot {
        resources: snapshot.filtered(query).cloned().collect(),
        failures: snapshot.failures.clone(),
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&shown)?),
        OutputFormat::Table => print_table(&shown),
    }

    for failure in &shown.failures {
        eprintln!("warning: could not list {}", failure);
    }

    Ok(())
}

fn print_table(snapshot: &Snapshot) {
    println!(
        "{:<4} {:<30} {:<30} {:<24} {:>8}",
        "TYPE", "PROJECT", "NAME", "LOCATION", "NETWORKS"
    );
    for resource in &snapshot.resources {
        let lock = if resource.can_add_network() { "" } else { " [locked]" };
        println!(
            "{:<4} {:<30} {:<30} {:<24} {:>8}{}",
            resource.kind(),
            resource.project(),
            resource.name(),
            resource.location(),
            resource.authorized_networks().len(),
            lock
        );
    }
    println!("\n{} resources", snapshot.resources.len());
}

fn print_detail(resource: &CloudResource) {
    println!("{} {}", resource.kind(), resource.display_name());
    println!("  Location:   {}", resource.location());
    println!(
        "  Public:     {}",
        if resource.has_public_ip() { "yes" } else { "no" }
    );
    if let Some(restriction) = resource.network_restrictions() {
        println!("  Restricted: {}", restriction);
    }
    println!("  Console:    {}", resource.console_url());

    let networks = resource.authorized_networks();
    if networks.is_empty() {
        println!("\n  No authorized networks configured");
        return;
    }

    println!("\n  {:<30} {}", "NAME", "VALUE");
    for network in networks {
        println!("  {:<30} {}", network.display_name, network.cidr_value);
    }
}

async fn run_add(
    app: &App,
    reference: &CloudResource,
    network_name: Option<String>,
    value: Option<String>,
) -> Result<()> {
    let resource = app.fetch_detail(reference).await?;

    let name = network_name.unwrap_or_else(default_network_name);
    let value = match value {
        Some(v) => v,
        None => {
            let ip = app.detect_public_ip().await?;
            println!("Using detected public IP {}", ip);
            ip
        }
    };

    let outcome = app.add_network(&resource, &name, &value).await?;
    println!("{}", outcome.message);

    let refreshed = app.fetch_detail(&resource).await?;
    print_detail(&refreshed);
    Ok(())
}
