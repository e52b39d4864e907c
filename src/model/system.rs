use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::pose::Pose;

/// All docked poses of one protein–ligand complex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LigandSystem {
    pub id: String,
    /// Experimental binding affinity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkd: Option<f64>,
    #[serde(default)]
    pub poses: Vec<Pose>,
}

impl LigandSystem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }

    /// `Some(true)` if any pose is correct, `None` if a pose lacks a reference RMSD.
    pub fn has_correct_pose(&self, cutoff: f64) -> Option<bool> {
        let mut any = false;
        for pose in &self.poses {
            any |= pose.is_correct(cutoff)?;
        }
        Some(any)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub systems: Vec<LigandSystem>,
}

impl Dataset {
    pub fn new(systems: Vec<LigandSystem>) -> Self {
        Self { systems }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn pose_count(&self) -> usize {
        self.systems.iter().map(LigandSystem::pose_count).sum()
    }

    /// Sorted union of the feature names found on any pose.
    pub fn feature_names(&self) -> Vec<String> {
        self.systems
            .iter()
            .flat_map(|s| s.poses.iter())
            .flat_map(|p| p.features.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted set of docking program names.
    pub fn programs(&self) -> Vec<String> {
        self.systems
            .iter()
            .flat_map(|s| s.poses.iter())
            .map(|p| p.program.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the first id that occurs more than once.
    pub fn find_duplicate_id(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.systems.len());
        self.systems
            .iter()
            .map(|s| s.id.as_str())
            .find(|id| !seen.insert(*id))
    }

    /// Keeps the systems whose id is in `ids`, preserving dataset order.
    pub fn subset(&self, ids: &HashSet<String>) -> Dataset {
        Dataset {
            systems: self
                .systems
                .iter()
                .filter(|s| ids.contains(&s.id))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut a = LigandSystem::new("1abc");
        a.pkd = Some(6.5);
        a.poses.push(Pose::new("vina").with_feature("vina", -8.0).with_rmsd(1.2));
        a.poses.push(Pose::new("dock").with_feature("dock", -30.0).with_rmsd(4.5));

        let mut b = LigandSystem::new("2xyz");
        b.poses.push(Pose::new("vina").with_feature("vina", -6.1).with_rmsd(3.0));

        Dataset::new(vec![a, b])
    }

    #[test]
    fn feature_names_and_programs_are_sorted_unions() {
        let ds = sample();
        assert_eq!(ds.feature_names(), vec!["dock", "vina"]);
        assert_eq!(ds.programs(), vec!["dock", "vina"]);
        assert_eq!(ds.pose_count(), 3);
    }

    #[test]
    fn subset_preserves_order() {
        let ds = sample();
        let ids: HashSet<String> = ["2xyz".to_string(), "1abc".to_string()].into();
        let sub = ds.subset(&ids);
        assert_eq!(sub.systems[0].id, "1abc");
        assert_eq!(sub.systems[1].id, "2xyz");
    }

    #[test]
    fn correct_pose_detection() {
        let ds = sample();
        assert_eq!(ds.systems[0].has_correct_pose(2.0), Some(true));
        assert_eq!(ds.systems[1].has_correct_pose(2.0), Some(false));

        let mut unknown = LigandSystem::new("3def");
        unknown.poses.push(Pose::new("vina"));
        assert_eq!(unknown.has_correct_pose(2.0), None);
    }

    #[test]
    fn detects_duplicate_ids() {
        let mut ds = sample();
        assert!(ds.find_duplicate_id().is_none());
        ds.systems.push(LigandSystem::new("1abc"));
        assert_eq!(ds.find_duplicate_id(), Some("1abc"));
    }
}
