use crate::dispatcher::parse_document;
use crate::errors::TopologyError;
use crate::instantiate::{instantiate, InstantiatedAngle, InstantiatedAtom, InstantiatedBond, InstantiatedDihedral};

/// A fully parsed and instantiated GROMACS molecular topology.
///
/// [`Topology::open`] reads a `.top` (or `.itp` fragment) file, flattens its
/// `#include` tree, applies conditional compilation, and expands the
/// `[ molecules ]` roster into one flat, globally-numbered structure — all
/// eagerly, at open time. There is no `close()`: a [`Topology`] is a plain
/// owned value, and the underlying files are released as soon as parsing
/// finishes, well before this struct is returned to the caller.
#[derive(Debug, Default, Clone)]
pub struct Topology {
    atoms: Vec<InstantiatedAtom>,
    bonds: Vec<InstantiatedBond>,
    angles: Vec<InstantiatedAngle>,
    propers: Vec<InstantiatedDihedral>,
    impropers: Vec<InstantiatedDihedral>,
}

impl Topology {
    /// Parses `path` and every file it transitively `#include`s, then
    /// instantiates the resulting roster into a single [`Topology`].
    pub fn open(path: &str) -> Result<Self, TopologyError> {
        let doc = parse_document(path)?;
        log::info!(
            "parsed '{path}': {} molecule type(s), {} atom type(s), {} roster entries",
            doc.moltypes.len(),
            doc.atomtypes.len(),
            doc.roster.len()
        );
        let structure = instantiate(&doc)?;
        log::info!(
            "instantiated '{path}': {} atoms, {} bonds, {} angles, {} propers, {} impropers",
            structure.atoms.len(),
            structure.bonds.len(),
            structure.angles.len(),
            structure.propers.len(),
            structure.impropers.len()
        );
        Ok(Self {
            atoms: structure.atoms,
            bonds: structure.bonds,
            angles: structure.angles,
            propers: structure.propers,
            impropers: structure.impropers,
        })
    }

    /// The instantiated atoms, in global id order.
    pub fn read_structure(&self) -> &[InstantiatedAtom] {
        &self.atoms
    }

    /// The instantiated bonds (constraints are folded in among these).
    pub fn read_bonds(&self) -> &[InstantiatedBond] {
        &self.bonds
    }

    /// The instantiated bond angles.
    pub fn read_angles(&self) -> &[InstantiatedAngle] {
        &self.angles
    }

    /// The instantiated proper dihedrals (`funct` not `2` or `4`).
    pub fn read_propers(&self) -> &[InstantiatedDihedral] {
        &self.propers
    }

    /// The instantiated improper dihedrals (`funct` `2` or `4`).
    pub fn read_impropers(&self) -> &[InstantiatedDihedral] {
        &self.impropers
    }

    /// Total number of instantiated atoms.
    pub fn count_atoms(&self) -> usize {
        self.atoms.len()
    }
}
