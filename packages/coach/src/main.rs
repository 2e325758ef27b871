use std::process::ExitCode;
use std::sync::Arc;

use renshu_coach::coach::{CycleEngine, Dashboard, DocumentStore};
use renshu_coach::config::Config;
use renshu_coach::logging::init_tracing;
use renshu_coach::services::content::ContentService;
use renshu_coach::services::feed::Feed;
use renshu_coach::services::llm_provider::LLMProvider;
use renshu_coach::services::sink::{ConsoleSink, Sink};
use renshu_coach::services::telegram::TelegramClient;
use renshu_coach::workers::{PracticeRunner, WorkerManager};

const USAGE: &str = "usage: renshu-coach [run|schedule]";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level, config.log_dir.as_deref());

    let mode = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());
    if mode != "run" && mode != "schedule" {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    let telegram = TelegramClient::new(config.telegram.clone());
    let content = LLMProvider::new(config.llm.clone());
    if !content.is_available() {
        tracing::warn!("LLM_API_KEY not set, grading and quiz generation will fall back to notices");
    }
    let origin = telegram.chat_id().map(str::to_string);
    let engine = CycleEngine::new(telegram.clone(), content, config.coach.clone(), origin);
    let store = DocumentStore::new(&config.data_dir);
    let dashboard = Dashboard::new(&config.data_dir);
    tracing::info!(data_dir = %config.data_dir.display(), mode = %mode, "renshu-coach starting");

    let code = if telegram.is_available() {
        let runner = PracticeRunner::new(engine, telegram, store, dashboard, config.clock);
        dispatch(&mode, runner, &config.schedule).await
    } else {
        tracing::warn!("TG_BOT_TOKEN or TG_CHAT_ID not set, outbound messages go to the log");
        let runner = PracticeRunner::new(engine, ConsoleSink, store, dashboard, config.clock);
        dispatch(&mode, runner, &config.schedule).await
    };
    ExitCode::from(code)
}

async fn dispatch<F, C, S>(mode: &str, runner: PracticeRunner<F, C, S>, schedule: &str) -> u8
where
    F: Feed + 'static,
    C: ContentService + 'static,
    S: Sink + 'static,
{
    if mode == "run" {
        return match runner.run_once().await {
            Ok(summary) => {
                tracing::info!(
                    sent = summary.delivery.sent,
                    mode = ?summary.cycle.mode,
                    "run finished"
                );
                0
            }
            Err(e) => {
                tracing::error!(error = %e, "run failed, documents left untouched");
                1
            }
        };
    }

    let manager = match WorkerManager::new().await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "worker manager not initialized");
            return 1;
        }
    };
    if let Err(e) = manager.start(Arc::new(runner), schedule).await {
        tracing::error!(error = %e, "failed to start workers");
        return 1;
    }

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping scheduler");
    manager.stop().await;
    tracing::info!("Graceful shutdown complete");
    0
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
