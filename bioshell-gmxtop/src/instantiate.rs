use crate::dispatcher::ParsedDocument;
use crate::errors::TopologyError;

/// One atom of the fully instantiated structure, with a globally unique,
/// contiguous 1-based `id` (the atom's position across every instantiated
/// molecule, not whatever `id` token its source record happened to carry)
/// and a residue number renumbered continuously across every molecule copy
/// in roster order.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantiatedAtom {
    pub id: i64,
    pub atom_type: String,
    pub resid: i64,
    pub residue: String,
    pub atom_name: String,
    pub segid: String,
    pub cgnr: i64,
    pub charge: f64,
    pub mass: f64,
}

/// A bond or constraint between two globally-numbered atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstantiatedBond {
    pub ai: i64,
    pub aj: i64,
}

/// A bond angle between three globally-numbered atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstantiatedAngle {
    pub ai: i64,
    pub aj: i64,
    pub ak: i64,
}

/// A proper or improper dihedral between four globally-numbered atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstantiatedDihedral {
    pub ai: i64,
    pub aj: i64,
    pub ak: i64,
    pub al: i64,
    pub funct: i64,
}

/// The fully instantiated structure: every molecule named in `[ molecules ]`,
/// expanded `count` times each, with dihedrals already split into propers and
/// impropers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InstantiatedStructure {
    pub atoms: Vec<InstantiatedAtom>,
    pub bonds: Vec<InstantiatedBond>,
    pub angles: Vec<InstantiatedAngle>,
    pub propers: Vec<InstantiatedDihedral>,
    pub impropers: Vec<InstantiatedDihedral>,
}

/// Remembers, for one roster copy, the running totals in effect when that
/// copy's atoms were laid out — so the second pass can place bonds/angles/
/// dihedrals at the same global offset without recomputing residue ranges.
struct CopyPlacement {
    atom_offset: i64,
    resid_base: i64,
}

/// Expands the roster (`[ molecules ]`) against the molecule-type and
/// atom-type tables into a flat, globally-numbered structure.
///
/// This is a two-pass walk over the same roster order in both passes —
/// roster order, then copy index, then intra-moltype record order — so
/// atoms always precede the bonds/angles/dihedrals that reference them.
/// The first pass alone decides every atom's global id, residue number, and
/// back-filled mass; the second pass only ever adds a remembered per-copy
/// atom offset to local indices, split into bonds, angles, propers, and
/// impropers.
pub fn instantiate(doc: &ParsedDocument) -> Result<InstantiatedStructure, TopologyError> {
    let mut out = InstantiatedStructure::default();
    let mut atom_offset: i64 = 0;
    let mut resid_base: i64 = 0;
    let mut placements: Vec<CopyPlacement> = Vec::new();

    for entry in &doc.roster {
        let moltype = doc
            .moltypes
            .get(&entry.moltype_name)
            .ok_or_else(|| TopologyError::UnresolvedMoleculeType { name: entry.moltype_name.clone() })?;
        let segid = moltype.segid();
        let min_resnr = moltype.residue_range().map(|(min, _)| min).unwrap_or(1);

        for _ in 0..entry.count.max(0) {
            placements.push(CopyPlacement { atom_offset, resid_base });

            for (local_idx, atom) in moltype.atoms.iter().enumerate() {
                let mass = if atom.mass > 0.0 { atom.mass } else { doc.atomtypes.mass_of(&atom.atom_type).unwrap_or(0.0) };
                out.atoms.push(InstantiatedAtom {
                    // Global id is the atom's position within this molecule type,
                    // not its parsed `id` token — the file's own ids are never
                    // validated against position and may be gapped, duplicated,
                    // or out of order.
                    id: atom_offset + local_idx as i64 + 1,
                    atom_type: atom.atom_type.clone(),
                    resid: resid_base + (atom.resnr - min_resnr) + 1,
                    residue: atom.residue.clone(),
                    atom_name: atom.atom_name.clone(),
                    segid: segid.clone(),
                    cgnr: atom.cgnr,
                    charge: atom.charge,
                    mass,
                });
            }

            atom_offset += moltype.natoms() as i64;
            if let Some((min, max)) = moltype.residue_range() {
                resid_base += max - min + 1;
            }
        }
    }

    let mut placements = placements.into_iter();
    for entry in &doc.roster {
        let moltype = doc.moltypes.get(&entry.moltype_name).expect("validated in the atom pass above");
        for _ in 0..entry.count.max(0) {
            let placement = placements.next().expect("one placement per roster copy, same order as the atom pass");
            let offset = placement.atom_offset;

            for bond in &moltype.bonds {
                out.bonds.push(InstantiatedBond { ai: offset + bond.ai, aj: offset + bond.aj });
            }
            for angle in &moltype.angles {
                out.angles.push(InstantiatedAngle { ai: offset + angle.ai, aj: offset + angle.aj, ak: offset + angle.ak });
            }
            for dihedral in &moltype.dihedrals {
                let instantiated = InstantiatedDihedral {
                    ai: offset + dihedral.ai,
                    aj: offset + dihedral.aj,
                    ak: offset + dihedral.ak,
                    al: offset + dihedral.al,
                    funct: dihedral.funct,
                };
                if dihedral.is_improper() {
                    out.impropers.push(instantiated);
                } else {
                    out.propers.push(instantiated);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{AngleRecord, AtomRecord, AtomTypeRecord, AtomTypeTable, BondRecord, DihedralRecord, InstantiationEntry, MoleculeType, MoleculeTypeTable};

    fn atom(id: i64, atom_type: &str, resnr: i64, residue: &str, name: &str, mass: f64) -> AtomRecord {
        AtomRecord { id, atom_type: atom_type.to_string(), resnr, residue: residue.to_string(), atom_name: name.to_string(), cgnr: id, charge: 0.0, mass }
    }

    #[test]
    fn single_water_gets_segid_and_backfilled_mass() {
        let mut moltypes = MoleculeTypeTable::default();
        let mut sol = MoleculeType::new("SOL", 2);
        sol.atoms.push(atom(1, "OW", 1, "SOL", "OW", 0.0));
        sol.atoms.push(atom(2, "HW", 1, "SOL", "HW1", 0.0));
        sol.atoms.push(atom(3, "HW", 1, "SOL", "HW2", 0.0));
        sol.bonds.push(BondRecord { ai: 1, aj: 2 });
        sol.bonds.push(BondRecord { ai: 1, aj: 3 });
        moltypes.insert(sol);

        let mut atomtypes = AtomTypeTable::default();
        atomtypes.insert(AtomTypeRecord { name: "OW".to_string(), mass: 16.0 });
        atomtypes.insert(AtomTypeRecord { name: "HW".to_string(), mass: 1.008 });

        let doc = ParsedDocument { moltypes, atomtypes, roster: vec![InstantiationEntry { moltype_name: "SOL".to_string(), count: 1 }] };
        let structure = instantiate(&doc).unwrap();

        assert_eq!(structure.atoms.len(), 3);
        assert_eq!(structure.atoms[0].segid, "SOL");
        assert_eq!(structure.atoms[0].mass, 16.0);
        assert_eq!(structure.atoms[1].mass, 1.008);
        assert_eq!(structure.bonds.len(), 2);
        assert_eq!(structure.bonds[0], InstantiatedBond { ai: 1, aj: 2 });
    }

    #[test]
    fn three_copies_get_disjoint_global_numbering() {
        let mut moltypes = MoleculeTypeTable::default();
        let mut sol = MoleculeType::new("SOL", 2);
        sol.atoms.push(atom(1, "OW", 1, "SOL", "OW", 16.0));
        sol.atoms.push(atom(2, "HW", 1, "SOL", "HW1", 1.0));
        sol.bonds.push(BondRecord { ai: 1, aj: 2 });
        moltypes.insert(sol);

        let doc = ParsedDocument {
            moltypes,
            atomtypes: AtomTypeTable::default(),
            roster: vec![InstantiationEntry { moltype_name: "SOL".to_string(), count: 3 }],
        };
        let structure = instantiate(&doc).unwrap();

        assert_eq!(structure.atoms.len(), 6);
        assert_eq!(structure.atoms.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(structure.atoms.iter().map(|a| a.resid).collect::<Vec<_>>(), vec![1, 1, 2, 2, 3, 3]);
        assert_eq!(structure.bonds, vec![
            InstantiatedBond { ai: 1, aj: 2 },
            InstantiatedBond { ai: 3, aj: 4 },
            InstantiatedBond { ai: 5, aj: 6 },
        ]);
    }

    #[test]
    fn global_id_follows_position_not_the_parsed_id_token() {
        let mut moltypes = MoleculeTypeTable::default();
        let mut mt = MoleculeType::new("M", 3);
        // Gapped, duplicated, out-of-order `id` tokens — the permissive
        // record parser never validates these against position.
        mt.atoms.push(atom(7, "A", 1, "R", "A1", 1.0));
        mt.atoms.push(atom(7, "A", 1, "R", "A2", 1.0));
        mt.atoms.push(atom(2, "A", 1, "R", "A3", 1.0));
        moltypes.insert(mt);

        let doc = ParsedDocument {
            moltypes,
            atomtypes: AtomTypeTable::default(),
            roster: vec![InstantiationEntry { moltype_name: "M".to_string(), count: 2 }],
        };
        let structure = instantiate(&doc).unwrap();

        assert_eq!(structure.atoms.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn dihedrals_split_into_propers_and_impropers() {
        let mut moltypes = MoleculeTypeTable::default();
        let mut mt = MoleculeType::new("M", 3);
        for i in 1..=4 {
            mt.atoms.push(atom(i, "A", 1, "R", "A", 1.0));
        }
        mt.dihedrals.push(DihedralRecord { ai: 1, aj: 2, ak: 3, al: 4, funct: 9 });
        mt.dihedrals.push(DihedralRecord { ai: 1, aj: 2, ak: 3, al: 4, funct: 2 });
        mt.angles.push(AngleRecord { ai: 1, aj: 2, ak: 3 });
        moltypes.insert(mt);

        let doc = ParsedDocument { moltypes, atomtypes: AtomTypeTable::default(), roster: vec![InstantiationEntry { moltype_name: "M".to_string(), count: 1 }] };
        let structure = instantiate(&doc).unwrap();

        assert_eq!(structure.propers.len(), 1);
        assert_eq!(structure.impropers.len(), 1);
        assert_eq!(structure.angles.len(), 1);
    }

    #[test]
    fn unresolved_moltype_in_roster_is_an_error() {
        let doc = ParsedDocument {
            moltypes: MoleculeTypeTable::default(),
            atomtypes: AtomTypeTable::default(),
            roster: vec![InstantiationEntry { moltype_name: "GHOST".to_string(), count: 1 }],
        };
        assert!(matches!(instantiate(&doc), Err(TopologyError::UnresolvedMoleculeType { .. })));
    }

    #[test]
    fn explicit_mass_is_never_overridden_by_atomtype_table() {
        let mut moltypes = MoleculeTypeTable::default();
        let mut mt = MoleculeType::new("M", 3);
        mt.atoms.push(atom(1, "OW", 1, "R", "A", 99.0));
        moltypes.insert(mt);

        let mut atomtypes = AtomTypeTable::default();
        atomtypes.insert(AtomTypeRecord { name: "OW".to_string(), mass: 16.0 });

        let doc = ParsedDocument { moltypes, atomtypes, roster: vec![InstantiationEntry { moltype_name: "M".to_string(), count: 1 }] };
        let structure = instantiate(&doc).unwrap();
        assert_eq!(structure.atoms[0].mass, 99.0);
    }
}
