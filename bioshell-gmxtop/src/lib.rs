//! Reads GROMACS molecular topology files (`.top`, `.itp`) and instantiates
//! the molecules they describe into a single, flat structure.
//!
//! # Loading a topology
//!
//! A [`Topology`](Topology) is read and fully instantiated in one call:
//!```no_run
//! use bioshell_gmxtop::Topology;
//! # fn main() -> Result<(), bioshell_gmxtop::TopologyError> {
//! let topology = Topology::open("system.top")?;
//! println!("{} atoms", topology.count_atoms());
//! # Ok(())
//! # }
//!```
//! `#include` directives are flattened in place and `#ifdef`/`#ifndef`/`#else`/
//! `#endif` conditional blocks are resolved against the `#define`d symbols
//! encountered so far, exactly as GROMACS itself would preprocess the file.
//! Every molecule named in the file's `[ molecules ]` section is expanded the
//! requested number of times, with atom ids and residue numbers renumbered
//! continuously across the whole structure.
//!
//! # Structure, bonds, and angles
//!
//! Once open, a [`Topology`](Topology) exposes its instantiated content
//! through plain accessor methods — no explicit close or cursor to manage:
//!```no_run
//! # use bioshell_gmxtop::Topology;
//! # fn main() -> Result<(), bioshell_gmxtop::TopologyError> {
//! # let topology = Topology::open("system.top")?;
//! for atom in topology.read_structure() {
//!     println!("{} {} {}", atom.id, atom.segid, atom.atom_name);
//! }
//! for bond in topology.read_bonds() {
//!     println!("{} - {}", bond.ai, bond.aj);
//! }
//! # Ok(())
//! # }
//!```
#![allow(clippy::needless_return)]

mod dispatcher;
mod errors;
mod instantiate;
mod lexer;
mod line_source;
mod preprocessor;
mod records;
mod tables;
mod topology;

pub use errors::TopologyError;
pub use instantiate::{InstantiatedAngle, InstantiatedAtom, InstantiatedBond, InstantiatedDihedral, InstantiatedStructure};
pub use tables::{AngleRecord, AtomRecord, AtomTypeRecord, BondRecord, DihedralRecord, InstantiationEntry, MoleculeType};
pub use topology::Topology;
