//! The fail-fast driver.
//!
//! Stages run in a fixed order; the first error is logged with stage
//! context and aborts every remaining stage. The early-exit `Outcome` makes
//! that policy explicit instead of burying it in nested error handlers.

use std::fmt;

use log::{error, info};

use crate::error::{Result, StageError};

/// The driver's fixed sequence of workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Hybrid,
    TextClassifier,
    Generative,
    Federated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Hybrid => "hybrid sequence regressor",
            Stage::TextClassifier => "text classifier",
            Stage::Generative => "generative fine-tuning",
            Stage::Federated => "federated simulation",
        };
        write!(f, "{name}")
    }
}

/// A stage tag paired with its runner.
pub struct StageTask<'a> {
    stage: Stage,
    run: Box<dyn FnMut() -> Result<()> + 'a>,
}

impl<'a> StageTask<'a> {
    pub fn new(stage: Stage, run: impl FnMut() -> Result<()> + 'a) -> Self {
        Self {
            stage,
            run: Box::new(run),
        }
    }
}

/// The driver's terminal state.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Failed { stage: Stage, error: StageError },
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

/// Runs the tasks in order, stopping at the first failure. No retries.
pub fn run(tasks: Vec<StageTask>) -> Outcome {
    for mut task in tasks {
        info!("running {} stage", task.stage);

        if let Err(error) = (task.run)() {
            error!("error in {} stage: {error}", task.stage);
            return Outcome::Failed {
                stage: task.stage,
                error,
            };
        }
    }

    info!("all stages completed");
    Outcome::Completed
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn completes_when_every_stage_succeeds() {
        let ran = Cell::new(0);
        let tasks = vec![
            StageTask::new(Stage::Hybrid, || {
                ran.set(ran.get() + 1);
                Ok(())
            }),
            StageTask::new(Stage::Federated, || {
                ran.set(ran.get() + 1);
                Ok(())
            }),
        ];

        assert!(run(tasks).is_completed());
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn first_failure_skips_all_later_stages() {
        let hybrid_runs = Cell::new(0);
        let generative_runs = Cell::new(0);
        let federated_runs = Cell::new(0);

        let tasks = vec![
            StageTask::new(Stage::Hybrid, || {
                hybrid_runs.set(hybrid_runs.get() + 1);
                Ok(())
            }),
            StageTask::new(Stage::TextClassifier, || {
                Err(StageError::InvalidInput("no pretrained weights"))
            }),
            StageTask::new(Stage::Generative, || {
                generative_runs.set(generative_runs.get() + 1);
                Ok(())
            }),
            StageTask::new(Stage::Federated, || {
                federated_runs.set(federated_runs.get() + 1);
                Ok(())
            }),
        ];

        let outcome = run(tasks);
        match outcome {
            Outcome::Failed { stage, .. } => assert_eq!(stage, Stage::TextClassifier),
            Outcome::Completed => panic!("expected a failure"),
        }

        assert_eq!(hybrid_runs.get(), 1);
        assert_eq!(generative_runs.get(), 0);
        assert_eq!(federated_runs.get(), 0);
    }

    #[test]
    fn stage_names_carry_context() {
        assert_eq!(Stage::TextClassifier.to_string(), "text classifier");
        assert_eq!(Stage::Federated.to_string(), "federated simulation");
    }
}
