//! Serviço HTTP de análise de endereços e comandos offline.
//!
//! - `serve`: carrega o gazetteer, roda o self-test e atende `POST /analyze`.
//! - `build-cache`: reconstrói o gazetteer a partir dos CSVs e grava o cache.
//! - `evaluate`: roda um arquivo de casos e imprime o relatório de falhas.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr_core::eval::{evaluate, EvalCase};
use addr_core::{
    selftest, AddressPipeline, EntityLabel, ExclusionPolicy, Gazetteer, GazetteerSource, PipelineEvent,
    RecognizerConfig,
};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "addr-web")]
#[command(about = "Reconhecimento de endereços alemães em texto clínico")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sobe o serviço HTTP
    Serve {
        #[command(flatten)]
        gazetteer: GazetteerArgs,
        #[arg(long, env = "ADDR_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
        /// Roda a bateria de verificação antes de aceitar requisições
        #[arg(long, env = "ADDR_SELFTEST", default_value_t = true, action = ArgAction::Set)]
        selftest: bool,
    },
    /// Reconstrói o gazetteer dos CSVs e grava o cache
    BuildCache {
        #[command(flatten)]
        gazetteer: GazetteerArgs,
    },
    /// Avalia um arquivo JSON de casos `[{sentence, expected}]`
    Evaluate {
        #[command(flatten)]
        gazetteer: GazetteerArgs,
        cases: PathBuf,
    },
}

#[derive(Args)]
struct GazetteerArgs {
    /// Cache binário do gazetteer
    #[arg(long, env = "ADDR_GAZETTEER_CACHE")]
    cache: Option<PathBuf>,
    /// CSV com coluna `name` (sem país)
    #[arg(long = "csv", env = "ADDR_GAZETTEER_CSV", value_delimiter = ',')]
    csv: Vec<PathBuf>,
    /// CSV com colunas `Name` e `Country`
    #[arg(long = "dach-csv", env = "ADDR_GAZETTEER_DACH_CSV", value_delimiter = ',')]
    dach_csv: Vec<PathBuf>,
    /// Configuração JSON (`recognizer` e `exclusion`)
    #[arg(long, env = "ADDR_CONFIG")]
    config: Option<PathBuf>,
}

/// Arquivo de configuração do serviço; blocos ausentes ficam no padrão.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceConfig {
    recognizer: RecognizerConfig,
    exclusion: ExclusionPolicy,
}

impl GazetteerArgs {
    fn sources(&self) -> Vec<GazetteerSource> {
        self.csv
            .iter()
            .map(GazetteerSource::names_only)
            .chain(self.dach_csv.iter().map(GazetteerSource::with_country))
            .collect()
    }

    fn service_config(&self) -> Result<ServiceConfig> {
        let Some(path) = &self.config else {
            return Ok(ServiceConfig::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("lendo configuração {}", path.display()))?;
        let config: ServiceConfig =
            serde_json::from_str(&raw).with_context(|| format!("configuração inválida em {}", path.display()))?;
        config.recognizer.validate()?;
        Ok(config)
    }

    fn pipeline(&self) -> Result<AddressPipeline> {
        let config = self.service_config()?;
        let gazetteer = Gazetteer::load(self.cache.as_deref(), &self.sources(), &config.exclusion, true)
            .context("carregando o gazetteer")?;
        info!(names = gazetteer.len(), "gazetteer pronto");
        Ok(AddressPipeline::new(Arc::new(gazetteer), &config.recognizer)?)
    }
}

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: AddressPipeline,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
    /// Rótulos pedidos ("ADDRESS", "PERSON", ...); ausente = todos
    #[serde(default)]
    entities: Option<Vec<String>>,
    #[serde(default)]
    score_threshold: Option<f64>,
}

/// Resultado no formato do analisador: offsets em caracteres.
#[derive(Serialize)]
struct RecognizerResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
    text: String,
}

fn bad_request(message: &str) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response()
}

fn internal_error(message: String) -> axum::response::Response {
    error!(%message, "falha na análise");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": message }))).into_response()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Serve {
            gazetteer,
            bind,
            selftest,
        } => serve(&gazetteer, bind, selftest).await,
        Command::BuildCache { gazetteer } => build_cache(&gazetteer),
        Command::Evaluate { gazetteer, cases } => run_evaluation(&gazetteer, &cases),
    }
}

async fn serve(args: &GazetteerArgs, bind: SocketAddr, run_selftest: bool) -> Result<()> {
    let pipeline = args.pipeline()?;
    if run_selftest {
        selftest::run(&pipeline, &selftest::default_cases()).context("self-test de endereços")?;
    }

    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .route("/analyze/trace", post(trace_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("abrindo {bind}"))?;
    info!("serviço de endereços ouvindo em http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_cache(args: &GazetteerArgs) -> Result<()> {
    let cache = args
        .cache
        .as_deref()
        .context("informe --cache (ou ADDR_GAZETTEER_CACHE) para gravar o cache")?;
    let config = args.service_config()?;
    let (gazetteer, stats) = Gazetteer::build(&args.sources(), &config.exclusion)?;
    gazetteer.save_cache(cache)?;
    info!(path = %cache.display(), kept = stats.kept, "cache gravado");
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_evaluation(args: &GazetteerArgs, cases_path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(cases_path)
        .with_context(|| format!("lendo casos {}", cases_path.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_str(&raw)?;
    let pipeline = args.pipeline()?;

    let report = evaluate(&pipeline, &cases);
    info!(
        total = report.total,
        successful = report.successful,
        rate = report.success_rate(),
        "avaliação concluída"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "gazetteer_names": state.pipeline.gazetteer().len(),
    }))
}

/// Análise via HTTP POST; o pipeline é síncrono e roda fora do runtime.
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> axum::response::Response {
    if req.text.trim().is_empty() {
        return bad_request("Texto vazio");
    }

    let wanted: Option<Vec<EntityLabel>> = req
        .entities
        .as_ref()
        .map(|names| names.iter().filter_map(|n| EntityLabel::from_name(n)).collect());
    let threshold = req.score_threshold.unwrap_or(0.0);

    let result = tokio::task::spawn_blocking(move || {
        let doc = addr_core::Document::from_text(&req.text);
        let analysis = state.pipeline.analyze_document(&doc);
        analysis
            .entities
            .into_iter()
            .filter(|e| wanted.as_ref().map_or(true, |w| w.contains(&e.label)))
            .filter(|e| e.confidence >= threshold)
            .map(|e| RecognizerResult {
                entity_type: e.label.name().to_string(),
                start: doc.char_offset(e.start),
                end: doc.char_offset(e.end),
                score: e.confidence,
                text: e.text,
            })
            .collect::<Vec<_>>()
    })
    .await;

    match result {
        Ok(results) => Json(results).into_response(),
        Err(err) => internal_error(err.to_string()),
    }
}

/// Todos os eventos do pipeline para um texto, na ordem em que foram emitidos.
async fn trace_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> axum::response::Response {
    if req.text.trim().is_empty() {
        return bad_request("Texto vazio");
    }

    let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
    let handle = tokio::task::spawn_blocking(move || {
        state.pipeline.analyze_streaming(&req.text, tx);
    });
    if let Err(err) = handle.await {
        return internal_error(err.to_string());
    }

    let events: Vec<PipelineEvent> = rx.try_iter().collect();
    Json(events).into_response()
}
