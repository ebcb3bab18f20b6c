mod echo;

use anyhow::{Context, Result, bail};
use axum::{Router, routing::get};
use clap::{Parser, Subcommand};
use launchkit::{
    CheckinClient, JobPlist, LaunchError, SocketSpec, SupervisorTransport, platform_transport,
};
use launchkit_bootstrap::{AppConfig, init_logging, shutdown_token};
use launchkit_http::{HttpError, LaunchHttpServer};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Line echo service started by a socket-activating supervisor
#[derive(Parser)]
#[command(name = "launch-echo")]
#[command(version)]
#[command(about = "Line echo service started by a socket-activating supervisor")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check in with the supervisor and echo lines on the inherited sockets
    Run,
    /// Write a launchd job plist that starts this binary
    Plist {
        /// Destination file
        path: PathBuf,
        /// Also declare the HTTP status socket group on this port
        #[arg(long)]
        http_port: Option<u16>,
    },
    /// Validate configuration and print it as YAML
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_verbosity(cli.verbose);
    init_logging(&config.logging)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await,
        Commands::Plist { path, http_port } => {
            write_plist(&config, cli.config.as_deref(), &path, http_port)
        }
        Commands::Check => check_config(&config),
    }
}

fn check_in(config: &AppConfig) -> Result<CheckinClient<Box<dyn SupervisorTransport>>> {
    let service = &config.service;
    let client = CheckinClient::new(platform_transport(&[
        service.socket_group.as_str(),
        service.http_socket_group.as_str(),
    ]));

    if client
        .checkin()
        .context("checkin with the supervisor failed")?
        .is_none()
    {
        bail!(
            "no supervisor configuration available; start launch-echo through launchd \
             (see `launch-echo plist`) or a LISTEN_FDS-compatible supervisor"
        );
    }
    Ok(client)
}

async fn run(config: &AppConfig) -> Result<()> {
    let client = check_in(config)?;
    let service = &config.service;

    let listeners: Vec<TcpListener> = client
        .sockets(&service.socket_group)
        .with_context(|| format!("cannot use socket group '{}'", service.socket_group))?;

    let http = match LaunchHttpServer::bind_group(&client, &service.http_socket_group) {
        Ok(server) => Some(server),
        Err(HttpError::Launch(LaunchError::SocketGroupNotFound { .. })) => None,
        Err(e) => return Err(e.into()),
    };

    let cancel = shutdown_token();
    let mut servers: JoinSet<Result<()>> = JoinSet::new();

    for listener in listeners {
        let cancel = cancel.clone();
        servers.spawn(async move { Ok(echo::serve(listener, cancel).await?) });
    }
    if let Some(http) = http {
        let router = status_router(&service.label);
        let cancel = cancel.clone();
        servers.spawn(async move { Ok(http.serve(router, cancel).await?) });
    }

    tracing::info!(label = %service.label, servers = servers.len(), "launch-echo running");

    while let Some(joined) = servers.join_next().await {
        joined.context("server task panicked")??;
    }
    tracing::info!("launch-echo stopped");
    Ok(())
}

fn status_router(label: &str) -> Router {
    let status = format!("{label} {}\n", env!("CARGO_PKG_VERSION"));
    Router::new()
        .route(
            "/",
            get(move || {
                let status = status.clone();
                async move { status }
            }),
        )
        .route("/health", get(|| async { "ok\n" }))
}

fn write_plist(
    config: &AppConfig,
    config_path: Option<&Path>,
    path: &Path,
    http_port: Option<u16>,
) -> Result<()> {
    let exe = std::env::current_exe().context("cannot locate the launch-echo executable")?;

    let mut args = vec![exe.display().to_string()];
    if let Some(config_path) = config_path {
        let config_path = std::fs::canonicalize(config_path)
            .with_context(|| format!("cannot resolve {}", config_path.display()))?;
        args.push("--config".to_owned());
        args.push(config_path.display().to_string());
    }
    args.push("run".to_owned());

    let service = &config.service;
    let mut plist = JobPlist::new(&service.label)
        .program_arguments(args)
        .service_ipc(true)
        .socket(&service.socket_group, SocketSpec::tcp(service.service_port));
    if let Some(port) = http_port {
        plist = plist.socket(&service.http_socket_group, SocketSpec::tcp(port));
    }

    plist
        .write_to(path)
        .with_context(|| format!("cannot write {}", path.display()))?;

    println!("Wrote {}", path.display());
    println!("Load it with: launchctl load {}", path.display());
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Configuration is valid");
    print!("{}", config.to_yaml()?);
    Ok(())
}

