/// Daily escalation job: fetch the hourly feed, classify the city, resolve
/// the scene, publish the artifact. Designed to be invoked once per day by
/// cron; `--verify` instead checks the configured stations against the feed.

use std::path::Path;
use std::process::ExitCode;

use aqmon_service::config::{self, AppConfig, DEFAULT_CONFIG_PATH};
use aqmon_service::dev_mode::ReplaySource;
use aqmon_service::engine::EscalationEngine;
use aqmon_service::ingest::madrid::MadridOpenData;
use aqmon_service::ingest::ReadingSource;
use aqmon_service::logging::{self, DataSource, LogLevel};
use aqmon_service::model::ProviderError;
use aqmon_service::snapshots::SnapshotStore;
use aqmon_service::verify;
use aqmon_service::zones::ZoneRegistry;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match config::load(Path::new(DEFAULT_CONFIG_PATH)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(LogLevel::Info, config.log_file.as_deref());

    let registry = match load_registry(&config) {
        Ok(registry) => registry,
        Err(e) => {
            logging::error(
                DataSource::System,
                None,
                &format!("Zone registry rejected: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    if std::env::args().any(|arg| arg == "--verify") {
        return run_verification(&registry, &config);
    }

    run_daily(registry, &config)
}

fn load_registry(config: &AppConfig) -> Result<ZoneRegistry, Box<dyn std::error::Error>> {
    match &config.zones_file {
        Some(path) => {
            let registry = ZoneRegistry::from_toml_file(path)?;
            logging::info(
                DataSource::System,
                None,
                &format!(
                    "Loaded {} zones ({} stations) from {}",
                    registry.zones.len(),
                    registry.station_total(),
                    path.display()
                ),
            );
            Ok(registry)
        }
        None => Ok(ZoneRegistry::builtin()),
    }
}

fn build_source(config: &AppConfig) -> Result<Box<dyn ReadingSource>, ProviderError> {
    match &config.replay_file {
        Some(path) => {
            logging::info(
                DataSource::System,
                None,
                &format!("Replay mode: reading saved feed {}", path.display()),
            );
            Ok(Box::new(ReplaySource::new(path.clone(), config.pollutant)))
        }
        None => Ok(Box::new(MadridOpenData::new(
            config.feed_url.clone(),
            config.pollutant,
        )?)),
    }
}

fn run_daily(registry: ZoneRegistry, config: &AppConfig) -> ExitCode {
    let store = match SnapshotStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            logging::error(
                DataSource::Store,
                None,
                &format!("Cannot open snapshot store: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    let source = match build_source(config) {
        Ok(source) => source,
        Err(e) => {
            logging::error(
                DataSource::Feed,
                None,
                &format!("Cannot build reading source: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    let engine = EscalationEngine::new(registry, source, store);
    let run_date = chrono::Local::now().date_naive();

    match engine.run(run_date) {
        Ok(outcome) => {
            if let Err(e) = publish_scene(&config.scene_path, outcome.scene) {
                logging::error(
                    DataSource::Store,
                    None,
                    &format!(
                        "Failed to publish scene to {}: {}",
                        config.scene_path.display(),
                        e
                    ),
                );
                return ExitCode::FAILURE;
            }
            logging::info(
                DataSource::Store,
                None,
                &format!(
                    "Scene {} published to {}",
                    outcome.scene,
                    config.scene_path.display()
                ),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(DataSource::System, None, &format!("Run aborted: {}", e));
            ExitCode::FAILURE
        }
    }
}

/// The artifact the downstream display reads: a bare scene integer.
fn publish_scene(path: &Path, scene: u8) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, scene.to_string())
}

fn run_verification(registry: &ZoneRegistry, config: &AppConfig) -> ExitCode {
    match verify::run_feed_verification(registry, &config.feed_url, config.pollutant) {
        Ok(report) => {
            verify::print_summary(&report);
            if report.summary.zones_failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Verification failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
