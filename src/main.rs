//! Tech watch digest agent — binary entrypoint.
//! One-shot CLI run by default; `--serve` boots the Axum HTTP server with
//! the same pipeline behind `/watch`.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tech_watch_agent::config::AppConfig;
use tech_watch_agent::error::PipelineError;
use tech_watch_agent::telemetry::Metrics;
use tech_watch_agent::pipeline::{run, DigestRequest};
use tech_watch_agent::sources::types::Focus;

#[derive(Debug, Parser)]
#[command(name = "tech-watch-agent", about = "Agent de veille technologique", version)]
struct Args {
    /// Question posée à l'agent
    #[arg(default_value = "Quoi de neuf en tech ?")]
    query: String,

    /// Focus thématique: general, ai, devops, web, security, tools, all
    #[arg(long, default_value = "general")]
    focus: String,

    /// Items max par source
    #[arg(long)]
    max_items: Option<usize>,

    /// Fichier de sortie: "auto" pour veille_YYYY-MM-DD.md, sinon un nom.
    /// Absent: le digest part sur stdout.
    #[arg(short, long)]
    output: Option<String>,

    /// Répertoire des fichiers de sortie
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Démarre le serveur HTTP au lieu d'un run unique
    #[arg(long)]
    serve: bool,

    /// Port HTTP (mode --serve)
    #[arg(long)]
    port: Option<u16>,

    /// Affiche la configuration résolue et quitte
    #[arg(long)]
    status: bool,

    /// Logs verbeux
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| default.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn output_path(args: &Args) -> Option<PathBuf> {
    let name = args.output.as_deref()?;
    let file = if name == "auto" {
        format!("veille_{}.md", Utc::now().format("%Y-%m-%d"))
    } else if name.ends_with(".md") {
        name.to_string()
    } else {
        format!("{name}.md")
    };
    Some(args.output_dir.join(file))
}

async fn run_once(cfg: &AppConfig, args: &Args) -> anyhow::Result<()> {
    let focus = Focus::parse(&args.focus)
        .ok_or_else(|| anyhow::anyhow!("focus inconnu: {}", args.focus))?;
    let max_items = args.max_items.unwrap_or(cfg.max_items_per_source);
    let request = DigestRequest::new(&args.query, focus, max_items);

    let out = run(cfg, &request).await?;

    match output_path(args) {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &out.markdown)?;
            println!("Digest écrit dans {}", path.display());
        }
        None => println!("{}", out.markdown),
    }

    if out.report.stats.synthesis_degraded {
        eprintln!("Attention: synthèse en mode dégradé (aucun LLM disponible).");
    }
    Ok(())
}

async fn serve(cfg: AppConfig, args: &Args) -> anyhow::Result<()> {
    let port = args.port.unwrap_or(cfg.port);
    let metrics = Metrics::init();
    let router = tech_watch_agent::api::create_router(cfg).merge(metrics.router());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "serveur HTTP démarré");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.debug);

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Erreur de configuration: {e:#}");
            return ExitCode::from(2);
        }
    };

    if args.status {
        print!("{}", cfg.status());
        return ExitCode::SUCCESS;
    }

    let result = if args.serve {
        serve(cfg, &args).await
    } else {
        run_once(&cfg, &args).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Échec du run: {e:#}");
            match e.downcast_ref::<PipelineError>() {
                Some(PipelineError::AllSourcesFailed { .. }) => ExitCode::from(3),
                Some(PipelineError::Config(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
