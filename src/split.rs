//! Reproducible train/validation splitting by system.
//!
//! Poses of one system always land on the same side. Optional
//! stratification keeps the affinity distribution or the share of systems
//! with a correct pose similar in both parts.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::model::system::{Dataset, LigandSystem};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("validation fraction must be in [0, 1) (got {0})")]
    InvalidFraction(f64),

    #[error("affinity stratification needs at least one bin")]
    NoBins,

    #[error("label cutoff must be a positive RMSD (got {0})")]
    InvalidCutoff(f64),
}

/// How systems are grouped before sampling the validation set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Stratify {
    #[default]
    None,
    /// Quantile bins of pKd; systems without a pKd form their own group.
    Affinity { bins: usize },
    /// Has a correct pose, has none, or unknown.
    BindingMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub val_fraction: f64,
    pub seed: u64,
    pub stratify: Stratify,
    /// RMSD (Å) at or below which a pose is correct, for [`Stratify::BindingMode`].
    pub label_cutoff: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            val_fraction: 0.2,
            seed: 42,
            stratify: Stratify::None,
            label_cutoff: 2.0,
        }
    }
}

/// Number of validation systems for `n` systems.
pub fn validation_count(n: usize, fraction: f64) -> usize {
    if n < 2 || fraction <= 0.0 {
        return 0;
    }
    ((n as f64 * fraction).round() as usize).clamp(1, n - 1)
}

/// Splits `dataset` into `(train, validation)`, each in input order.
pub fn split(dataset: &Dataset, config: &SplitConfig) -> Result<(Dataset, Dataset), Error> {
    let fraction = config.val_fraction;
    if !(0.0..1.0).contains(&fraction) {
        return Err(Error::InvalidFraction(fraction));
    }
    if config.stratify == (Stratify::Affinity { bins: 0 }) {
        return Err(Error::NoBins);
    }
    if !(config.label_cutoff.is_finite() && config.label_cutoff > 0.0) {
        return Err(Error::InvalidCutoff(config.label_cutoff));
    }

    let n = dataset.len();
    let n_val = validation_count(n, fraction);
    let groups = strata(&dataset.systems, config);
    let quotas = allocate(n_val, &groups);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut chosen = HashSet::with_capacity(n_val);
    for (group, quota) in groups.iter().zip(quotas) {
        let mut members = group.clone();
        members.shuffle(&mut rng);
        chosen.extend(members.into_iter().take(quota));
    }

    let (val, train): (Vec<_>, Vec<_>) = dataset
        .systems
        .iter()
        .enumerate()
        .partition(|(i, _)| chosen.contains(i));
    let collect = |part: Vec<(usize, &LigandSystem)>| {
        Dataset::new(part.into_iter().map(|(_, s)| s.clone()).collect())
    };

    log::info!(
        "split {} systems into {} train / {} validation ({} strata)",
        n,
        train.len(),
        val.len(),
        groups.len()
    );
    Ok((collect(train), collect(val)))
}

/// Groups system indices by stratum, dropping empty groups. Members keep
/// input order.
fn strata(systems: &[LigandSystem], config: &SplitConfig) -> Vec<Vec<usize>> {
    let groups: Vec<Vec<usize>> = match config.stratify {
        Stratify::None => vec![(0..systems.len()).collect()],
        Stratify::BindingMode => {
            let mut groups = vec![Vec::new(); 3];
            for (i, system) in systems.iter().enumerate() {
                let slot = match system.has_correct_pose(config.label_cutoff) {
                    Some(true) => 0,
                    Some(false) => 1,
                    None => 2,
                };
                groups[slot].push(i);
            }
            groups
        }
        Stratify::Affinity { bins } => {
            let mut known: Vec<(usize, f64)> = systems
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.pkd.map(|p| (i, p)))
                .collect();
            known.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

            // more bins than systems with a pKd would only add empty groups
            let m = known.len();
            let bins = bins.min(m.max(1));
            let mut groups = vec![Vec::new(); bins + 1];
            for (rank, &(i, _)) in known.iter().enumerate() {
                groups[rank * bins / m.max(1)].push(i);
            }
            groups[bins].extend((0..systems.len()).filter(|&i| systems[i].pkd.is_none()));
            for group in &mut groups {
                group.sort_unstable();
            }
            groups
        }
    };
    groups.into_iter().filter(|g| !g.is_empty()).collect()
}

/// Largest-remainder apportionment of `total` across groups by size.
fn allocate(total: usize, groups: &[Vec<usize>]) -> Vec<usize> {
    let n: usize = groups.iter().map(Vec::len).sum();
    if n == 0 || total == 0 {
        return vec![0; groups.len()];
    }

    let exact: Vec<f64> = groups
        .iter()
        .map(|g| total as f64 * g.len() as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|q| q.floor() as usize).collect();

    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - quotas[a] as f64;
        let rb = exact[b] - quotas[b] as f64;
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut remaining = total.saturating_sub(quotas.iter().sum());
    for &g in order.iter().cycle().take(order.len() * 2) {
        if remaining == 0 {
            break;
        }
        if quotas[g] < groups[g].len() {
            quotas[g] += 1;
            remaining -= 1;
        }
    }
    quotas
}
