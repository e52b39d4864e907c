//! Core data structures describing docked ligand poses.
//!
//! This module provides the types that flow through `dockbox2`:
//!
//! - [`atom`] – Ligand atoms (element symbol and Cartesian coordinates) and bonds.
//! - [`pose`] – A single docked pose with its docking scores and reference RMSD.
//! - [`system`] – All poses of one protein–ligand complex, and datasets of complexes.
//!
//! The data model keeps raw docking output ([`LigandSystem`]) separate from
//! the pose graphs built from it by [`GraphBuilder`](crate::GraphBuilder), so
//! the same dataset can be re-featurized under different configurations.
//!
//! [`LigandSystem`]: system::LigandSystem

pub mod atom;
pub mod pose;
pub mod system;
