//! Minibatch training loop with best-model tracking and early stopping.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::error::Error;
use super::loss::{graph_loss, has_targets};
use super::metrics::{Metrics, Outcome};
use crate::config::{DbxConfig, LossConfig, TrainingConfig};
use crate::gnn::{self, DbxModel, Optimizer};
use crate::graph::PoseGraph;
use crate::io::HistoryRow;

/// Summary of one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    /// 1-based epoch number.
    pub epoch: usize,
    pub train_loss: f64,
    /// Loss on the monitored set (validation, or training when there is none).
    pub val_loss: f64,
    pub metrics: Metrics,
}

impl From<&EpochRecord> for HistoryRow {
    fn from(record: &EpochRecord) -> Self {
        HistoryRow {
            epoch: record.epoch,
            train_loss: record.train_loss,
            val_loss: record.val_loss,
            val_auc: record.metrics.auc,
            val_success_rate: record.metrics.success_rate,
            val_pearson: record.metrics.pearson,
            val_rmse: record.metrics.rmse,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Parameters from the epoch with the lowest monitored loss.
    pub model: DbxModel,
    pub history: Vec<EpochRecord>,
    /// Epoch the returned model comes from; 0 when no epoch ran.
    pub best_epoch: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Mean loss over graphs with targets; `None` if there were none.
    pub loss: Option<f64>,
    pub metrics: Metrics,
    pub outcomes: Vec<Outcome>,
}

/// Runs the model over `graphs` without updating it.
pub fn evaluate(
    model: &DbxModel,
    graphs: &[PoseGraph],
    loss_config: &LossConfig,
) -> Result<Evaluation, Error> {
    let mut total = 0.0;
    let mut counted = 0usize;
    let mut outcomes = Vec::with_capacity(graphs.len());

    for graph in graphs {
        let forward = model.forward(graph)?;
        if let Some(loss) = graph_loss(&forward, graph, loss_config) {
            total += loss.total;
            counted += 1;
        }
        outcomes.push(Outcome {
            probabilities: forward.probabilities,
            labels: graph.labels.clone(),
            predicted_pkd: forward.pkd,
            pkd: graph.pkd,
        });
    }

    Ok(Evaluation {
        loss: (counted > 0).then(|| total / counted as f64),
        metrics: Metrics::compute(&outcomes),
        outcomes,
    })
}

pub struct Trainer {
    loss: LossConfig,
    training: TrainingConfig,
    model: DbxModel,
    optimizer: Box<dyn Optimizer>,
    rng: ChaCha8Rng,
}

impl Trainer {
    pub fn new(config: &DbxConfig, model: DbxModel) -> Self {
        Self {
            loss: config.loss.clone(),
            training: config.training.clone(),
            model,
            optimizer: gnn::optimizer_from_config(&config.optimizer),
            // decorrelate shuffling from weight initialization
            rng: ChaCha8Rng::seed_from_u64(config.training.seed.wrapping_add(1)),
        }
    }

    pub fn model(&self) -> &DbxModel {
        &self.model
    }

    pub fn fit(self, train: &[PoseGraph], val: &[PoseGraph]) -> Result<TrainOutcome, Error> {
        self.fit_with(train, val, |_| {})
    }

    /// Like [`fit`](Self::fit), calling `on_epoch` after every epoch.
    pub fn fit_with<F>(
        mut self,
        train: &[PoseGraph],
        val: &[PoseGraph],
        mut on_epoch: F,
    ) -> Result<TrainOutcome, Error>
    where
        F: FnMut(&EpochRecord),
    {
        if train.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        let usable = train.iter().filter(|g| has_targets(g, &self.loss)).count();
        if usable == 0 {
            return Err(Error::NoLabels(self.loss.task));
        }
        if usable < train.len() {
            log::warn!(
                "{} of {} training graphs have no targets for task '{}' and are skipped",
                train.len() - usable,
                train.len(),
                self.loss.task
            );
        }

        let monitored = if val.iter().any(|g| has_targets(g, &self.loss)) {
            val
        } else {
            if !val.is_empty() {
                log::warn!("validation graphs have no targets; monitoring the training set");
            }
            train
        };

        log::info!(
            "training on {} graphs ({} validation) for up to {} epochs, {} parameters",
            train.len(),
            val.len(),
            self.training.epochs,
            self.model.params.count()
        );

        let mut best_model = self.model.clone();
        let mut monitor = Monitor::new(self.training.patience);
        let mut history = Vec::new();
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 1..=self.training.epochs {
            order.shuffle(&mut self.rng);
            let train_loss = self.run_epoch(train, &order, epoch)?;
            if !self.model.params.is_finite() {
                return Err(Error::Diverged(epoch));
            }

            let eval = evaluate(&self.model, monitored, &self.loss)?;
            let record = EpochRecord {
                epoch,
                train_loss,
                val_loss: eval.loss.unwrap_or(train_loss),
                metrics: eval.metrics,
            };

            log::debug!(
                "epoch {epoch}: train_loss={:.4} val_loss={:.4} auc={} success={} rmse={}",
                record.train_loss,
                record.val_loss,
                fmt_metric(record.metrics.auc),
                fmt_metric(record.metrics.success_rate),
                fmt_metric(record.metrics.rmse)
            );

            if monitor.observe(epoch, record.val_loss) {
                best_model = self.model.clone();
            }

            on_epoch(&record);
            history.push(record);

            if monitor.should_stop() {
                log::info!(
                    "early stopping at epoch {epoch} (no improvement for {} epochs)",
                    self.training.patience
                );
                break;
            }
        }

        if monitor.best_epoch > 0 {
            log::info!(
                "best model from epoch {} (loss {:.4})",
                monitor.best_epoch,
                monitor.best_loss
            );
        }
        Ok(TrainOutcome {
            model: best_model,
            history,
            best_epoch: monitor.best_epoch,
        })
    }

    /// One pass over the shuffled training set; returns the mean loss of
    /// graphs with targets, measured before each update.
    fn run_epoch(
        &mut self,
        train: &[PoseGraph],
        order: &[usize],
        epoch: usize,
    ) -> Result<f64, Error> {
        let mut total = 0.0;
        let mut counted = 0usize;

        for (batch_index, batch) in order.chunks(self.training.batch_size).enumerate() {
            let mut grads = self.model.params.zeros_like();
            let mut in_batch = 0usize;
            let mut batch_loss = 0.0;

            for &g in batch {
                let graph = &train[g];
                let forward = self.model.forward(graph)?;
                let Some(loss) = graph_loss(&forward, graph, &self.loss) else {
                    continue;
                };
                grads.add_scaled(&self.model.backward(graph, &forward, &loss.upstream), 1.0);
                batch_loss += loss.total;
                in_batch += 1;
            }

            if in_batch == 0 {
                continue;
            }
            grads.scale(1.0 / in_batch as f64);
            self.optimizer.step(&mut self.model.params, &grads);

            log::trace!(
                "epoch {epoch} batch {batch_index}: {in_batch} graphs, loss {:.4}",
                batch_loss / in_batch as f64
            );
            total += batch_loss;
            counted += in_batch;
        }

        Ok(if counted > 0 { total / counted as f64 } else { 0.0 })
    }
}

/// Tracks the lowest monitored loss and epochs since it last improved.
struct Monitor {
    patience: usize,
    best_loss: f64,
    best_epoch: usize,
    stale: usize,
}

impl Monitor {
    fn new(patience: usize) -> Self {
        Self {
            patience,
            best_loss: f64::INFINITY,
            best_epoch: 0,
            stale: 0,
        }
    }

    /// Returns true when `loss` is a new best.
    fn observe(&mut self, epoch: usize, loss: f64) -> bool {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = epoch;
            self.stale = 0;
            true
        } else {
            self.stale += 1;
            false
        }
    }

    fn should_stop(&self) -> bool {
        self.patience > 0 && self.stale >= self.patience
    }
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Activation, OptimizerKind, Task};
    use ndarray::Array2;

    /// Two-pose systems where the correct pose has the lower score.
    fn graphs(count: usize) -> Vec<PoseGraph> {
        (0..count)
            .map(|k| {
                let shift = (k as f64 * 0.37).sin() * 0.2;
                let features =
                    Array2::from_shape_vec((2, 1), vec![-1.0 + shift, 1.0 + shift]).expect("shape");
                PoseGraph {
                    id: format!("sys{k}"),
                    features,
                    neighbors: vec![vec![], vec![]],
                    labels: Some(vec![true, false]),
                    pkd: Some(5.0 + shift),
                    programs: vec!["vina".into(); 2],
                }
            })
            .collect()
    }

    fn config() -> DbxConfig {
        let mut config = DbxConfig::default();
        config.gnn.depth = 1;
        config.gnn.hidden = 4;
        config.gnn.activation = Activation::Tanh;
        config.gnn.normalize = false;
        config.gnn.regressor_hidden = 4;
        config.optimizer.learning_rate = 0.05;
        config.training.epochs = 60;
        config.training.batch_size = 4;
        config
    }

    fn model(config: &DbxConfig) -> DbxModel {
        DbxModel::new(
            &config.gnn,
            1,
            config.loss.task.predicts_affinity(),
            config.training.init_scale,
            config.training.seed,
        )
    }

    #[test]
    fn loss_decreases_and_best_model_is_kept() {
        let config = config();
        let train = graphs(12);
        let val = graphs(4);

        let before = evaluate(&model(&config), &val, &config.loss).expect("eval");
        let outcome = Trainer::new(&config, model(&config))
            .fit(&train, &val)
            .expect("fit");

        assert_eq!(outcome.history.len(), 60);
        assert!(outcome.best_epoch >= 1);
        let best = &outcome.history[outcome.best_epoch - 1];
        assert!(outcome.history.iter().all(|r| r.val_loss >= best.val_loss));

        let after = evaluate(&outcome.model, &val, &config.loss).expect("eval");
        assert!((after.loss.expect("loss") - best.val_loss).abs() < 1e-12);
        assert!(after.loss < before.loss);
        assert_eq!(after.metrics.success_rate, Some(1.0));
    }

    #[test]
    fn training_is_reproducible() {
        let config = config();
        let train = graphs(6);
        let run = || {
            Trainer::new(&config, model(&config))
                .fit(&train, &[])
                .expect("fit")
        };
        let (a, b) = (run(), run());
        assert_eq!(a.history, b.history);
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn monitor_stops_after_patience_epochs_without_improvement() {
        let mut monitor = Monitor::new(2);
        assert!(monitor.observe(1, 1.0));
        assert!(monitor.observe(2, 0.9));
        assert!(!monitor.observe(3, 0.95));
        assert!(!monitor.should_stop());
        assert!(!monitor.observe(4, 0.9));
        assert!(monitor.should_stop());
        assert_eq!(monitor.best_epoch, 2);

        let mut unlimited = Monitor::new(0);
        for epoch in 1..10 {
            unlimited.observe(epoch, 1.0);
        }
        assert!(!unlimited.should_stop());
    }

    #[test]
    fn empty_and_unlabeled_sets_are_rejected() {
        let config = config();
        assert!(matches!(
            Trainer::new(&config, model(&config)).fit(&[], &[]),
            Err(Error::EmptyTrainingSet)
        ));

        let mut unlabeled = graphs(2);
        for g in &mut unlabeled {
            g.labels = None;
        }
        let mut binding = config.clone();
        binding.loss.task = Task::BindingMode;
        assert!(matches!(
            Trainer::new(&binding, model(&binding)).fit(&unlabeled, &[]),
            Err(Error::NoLabels(Task::BindingMode))
        ));
    }

    /// SGD steps too small to move any weight, so the monitored loss stays flat.
    fn frozen(config: &DbxConfig) -> DbxConfig {
        let mut config = config.clone();
        config.optimizer.kind = OptimizerKind::Sgd;
        config.optimizer.learning_rate = 1e-300;
        config.optimizer.weight_decay = 0.0;
        config
    }

    #[test]
    fn huge_epoch_budget_stops_early_without_preallocating() {
        let mut config = frozen(&config());
        config.training.epochs = 1_000_000_000;
        config.training.patience = 2;

        let outcome = Trainer::new(&config, model(&config))
            .fit(&graphs(2), &[])
            .expect("fit");

        assert!(outcome.history.len() < 100);
        assert_eq!(outcome.best_epoch + 2, outcome.history.len());
    }

    #[test]
    fn patience_ends_fit_early() {
        let mut config = frozen(&config());
        config.training.patience = 3;

        let outcome = Trainer::new(&config, model(&config))
            .fit(&graphs(4), &graphs(2))
            .expect("fit");

        assert!(outcome.history.len() < config.training.epochs);
        assert_eq!(outcome.best_epoch + 3, outcome.history.len());
    }

    #[test]
    fn zero_epochs_return_the_initial_model() {
        let mut config = config();
        config.training.epochs = 0;

        let outcome = Trainer::new(&config, model(&config))
            .fit(&graphs(3), &[])
            .expect("fit");

        assert!(outcome.history.is_empty());
        assert_eq!(outcome.best_epoch, 0);
        assert_eq!(outcome.model, model(&config));
    }

    #[test]
    fn huge_learning_rate_reports_divergence() {
        let mut config = config();
        config.optimizer.kind = OptimizerKind::Sgd;
        config.optimizer.learning_rate = 1e300;
        config.training.batch_size = 1;
        config.training.epochs = 5;

        let result = Trainer::new(&config, model(&config)).fit(&graphs(4), &[]);
        assert!(matches!(result, Err(Error::Diverged(_))));
    }

    #[test]
    fn validation_without_targets_monitors_training_set() {
        let mut config = config();
        config.training.epochs = 3;
        let train = graphs(4);
        let mut unlabeled = graphs(2);
        for g in &mut unlabeled {
            g.labels = None;
            g.pkd = None;
        }

        let with_val = Trainer::new(&config, model(&config))
            .fit(&train, &unlabeled)
            .expect("fit");
        let without_val = Trainer::new(&config, model(&config))
            .fit(&train, &[])
            .expect("fit");

        assert_eq!(with_val.history, without_val.history);
        assert_eq!(with_val.best_epoch, without_val.best_epoch);
    }

    #[test]
    fn history_rows_carry_metrics() {
        let record = EpochRecord {
            epoch: 2,
            train_loss: 0.5,
            val_loss: 0.4,
            metrics: Metrics {
                auc: Some(0.9),
                ..Metrics::default()
            },
        };
        let row = HistoryRow::from(&record);
        assert_eq!(row.epoch, 2);
        assert_eq!(row.val_auc, Some(0.9));
        assert_eq!(row.val_rmse, None);
    }
}
