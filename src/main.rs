use log::info;

use orion_pipeline::configs::{FederatedConfig, GenerativeConfig, HybridConfig, TextConfig};
use orion_pipeline::data::synthetic_series;
use orion_pipeline::pipeline::{self, Outcome, Stage, StageTask};
use orion_pipeline::stages::{classify, federated, generative, hybrid};

const SERIES_LEN: usize = 100;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    info!("=== orion pipeline ===");

    // All stage inputs are built up front and handed to the tasks; no stage
    // reaches for process-global state.
    let series = synthetic_series(SERIES_LEN, &mut rand::thread_rng());
    let federated_cfg = FederatedConfig::default();
    let clients = federated::synthetic_clients(&federated_cfg, &mut rand::thread_rng());

    let tasks = vec![
        StageTask::new(Stage::Hybrid, {
            let cfg = HybridConfig::default();
            let series = series.clone();
            move || hybrid::run(series.view(), &cfg, &mut rand::thread_rng())
        }),
        StageTask::new(Stage::TextClassifier, {
            let cfg = TextConfig::default();
            move || classify::run(&cfg)
        }),
        StageTask::new(Stage::Generative, {
            let cfg = GenerativeConfig::default();
            move || generative::run(&cfg, &mut rand::thread_rng())
        }),
        StageTask::new(Stage::Federated, {
            move || federated::run(&clients, &federated_cfg).map(|_| ())
        }),
    ];

    // A stage failure has already been logged with its stage context; the
    // process still exits cleanly (failure is an early return, not an exit
    // code).
    match pipeline::run(tasks) {
        Outcome::Completed => info!("pipeline finished"),
        Outcome::Failed { stage, .. } => info!("pipeline aborted at the {stage} stage"),
    }

    Ok(())
}
