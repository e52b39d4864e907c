//! In-place RMSD between two poses of the same ligand.

use thiserror::Error;

use crate::model::{atom::Atom, pose::Pose};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RmsdError {
    #[error("poses have different atom counts ({left} vs {right})")]
    CountMismatch { left: usize, right: usize },

    #[error("element mismatch at atom {index} ({left} vs {right})")]
    ElementMismatch {
        index: usize,
        left: String,
        right: String,
    },

    #[error("pose has no atoms to compare")]
    Empty,
}

fn selected_atoms(pose: &Pose, heavy_only: bool) -> Vec<&Atom> {
    pose.atoms
        .iter()
        .filter(|a| !heavy_only || !a.is_hydrogen())
        .collect()
}

/// Root-mean-square deviation between matching atoms, without superposition.
///
/// Both poses must list the same elements in the same order once
/// hydrogens are dropped (when `heavy_only` is set).
pub fn pose_rmsd(a: &Pose, b: &Pose, heavy_only: bool) -> Result<f64, RmsdError> {
    let left = selected_atoms(a, heavy_only);
    let right = selected_atoms(b, heavy_only);

    if left.len() != right.len() {
        return Err(RmsdError::CountMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Err(RmsdError::Empty);
    }

    let mut sum_sq = 0.0;
    for (index, (p, q)) in left.iter().zip(right.iter()).enumerate() {
        if !p.symbol.eq_ignore_ascii_case(&q.symbol) {
            return Err(RmsdError::ElementMismatch {
                index,
                left: p.symbol.clone(),
                right: q.symbol.clone(),
            });
        }
        sum_sq += (0..3)
            .map(|k| (p.position[k] - q.position[k]).powi(2))
            .sum::<f64>();
    }

    Ok((sum_sq / left.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(atoms: &[(&str, [f64; 3])]) -> Pose {
        Pose::new("test").with_atoms(atoms.iter().map(|(s, p)| Atom::new(*s, *p)).collect())
    }

    #[test]
    fn identical_poses_have_zero_rmsd() {
        let a = pose(&[("C", [0.0, 0.0, 0.0]), ("O", [1.2, 0.0, 0.0])]);
        assert_eq!(pose_rmsd(&a, &a, true), Ok(0.0));
    }

    #[test]
    fn uniform_shift_equals_rmsd() {
        let a = pose(&[("C", [0.0, 0.0, 0.0]), ("N", [1.0, 1.0, 1.0])]);
        let b = pose(&[("C", [3.0, 0.0, 0.0]), ("N", [4.0, 1.0, 1.0])]);
        let rmsd = pose_rmsd(&a, &b, true).expect("rmsd");
        assert!((rmsd - 3.0).abs() < 1e-12);
    }

    #[test]
    fn hydrogens_are_ignored_when_requested() {
        let a = pose(&[("C", [0.0, 0.0, 0.0]), ("H", [0.0, 1.0, 0.0])]);
        let b = pose(&[("C", [0.0, 0.0, 0.0]), ("H", [0.0, 5.0, 0.0])]);
        assert_eq!(pose_rmsd(&a, &b, true), Ok(0.0));

        let with_h = pose_rmsd(&a, &b, false).expect("rmsd");
        assert!((with_h - (16.0_f64 / 2.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn mismatched_poses_are_rejected() {
        let a = pose(&[("C", [0.0; 3]), ("O", [1.0, 0.0, 0.0])]);
        let b = pose(&[("C", [0.0; 3])]);
        assert_eq!(
            pose_rmsd(&a, &b, true),
            Err(RmsdError::CountMismatch { left: 2, right: 1 })
        );

        let c = pose(&[("C", [0.0; 3]), ("N", [1.0, 0.0, 0.0])]);
        assert!(matches!(
            pose_rmsd(&a, &c, true),
            Err(RmsdError::ElementMismatch { index: 1, .. })
        ));

        let empty = pose(&[]);
        assert_eq!(pose_rmsd(&empty, &empty, true), Err(RmsdError::Empty));
    }
}
