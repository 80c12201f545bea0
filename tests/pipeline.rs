use std::path::PathBuf;

use orion_pipeline::configs::{FederatedConfig, GenerativeConfig, HybridConfig, TextConfig};
use orion_pipeline::data::synthetic_series;
use orion_pipeline::pipeline::{self, Outcome, Stage, StageTask};
use orion_pipeline::stages::{classify, federated, generative, hybrid};

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("orion_e2e_{tag}_{}.json", std::process::id()))
}

/// Small configs so the end-to-end run stays fast.
fn small_generative(tag: &str) -> GenerativeConfig {
    GenerativeConfig {
        pretrained_path: temp_path(&format!("{tag}_pre")),
        save_path: temp_path(&format!("{tag}_post")),
        hidden: vec![8, 8],
        steps: 2,
        ..GenerativeConfig::default()
    }
}

fn small_hybrid() -> HybridConfig {
    HybridConfig {
        hidden: 4,
        epochs: 2,
        boost_rounds: 5,
        ..HybridConfig::default()
    }
}

#[test]
fn full_pipeline_completes_and_persists_the_generator() {
    let series = synthetic_series(100, &mut rand::thread_rng());
    let federated_cfg = FederatedConfig::default();
    let clients = federated::synthetic_clients(&federated_cfg, &mut rand::thread_rng());
    let generative_cfg = small_generative("full");

    let tasks = vec![
        StageTask::new(Stage::Hybrid, {
            let cfg = small_hybrid();
            let series = series.clone();
            move || hybrid::run(series.view(), &cfg, &mut rand::thread_rng())
        }),
        StageTask::new(Stage::TextClassifier, {
            let cfg = TextConfig::default();
            move || classify::run(&cfg)
        }),
        StageTask::new(Stage::Generative, {
            let cfg = generative_cfg.clone();
            move || generative::run(&cfg, &mut rand::thread_rng())
        }),
        StageTask::new(Stage::Federated, {
            move || federated::run(&clients, &federated_cfg).map(|_| ())
        }),
    ];

    let outcome = pipeline::run(tasks);
    assert!(outcome.is_completed(), "got {outcome:?}");
    assert!(generative_cfg.save_path.exists());

    std::fs::remove_file(&generative_cfg.save_path).ok();
}

#[test]
fn failing_text_stage_aborts_generative_and_federated() {
    let federated_cfg = FederatedConfig::default();
    let clients = federated::synthetic_clients(&federated_cfg, &mut rand::thread_rng());
    let generative_cfg = small_generative("abort");

    let bad_text = TextConfig {
        label: 9, // out of range for two labels
        ..TextConfig::default()
    };

    let tasks = vec![
        StageTask::new(Stage::TextClassifier, {
            let cfg = bad_text.clone();
            move || classify::run(&cfg)
        }),
        StageTask::new(Stage::Generative, {
            let cfg = generative_cfg.clone();
            move || generative::run(&cfg, &mut rand::thread_rng())
        }),
        StageTask::new(Stage::Federated, {
            move || federated::run(&clients, &federated_cfg).map(|_| ())
        }),
    ];

    match pipeline::run(tasks) {
        Outcome::Failed { stage, .. } => assert_eq!(stage, Stage::TextClassifier),
        Outcome::Completed => panic!("expected the text stage to fail"),
    }

    // The generative stage never ran, so nothing was persisted.
    assert!(!generative_cfg.save_path.exists());
}
