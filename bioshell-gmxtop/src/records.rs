use bioshell_io::split_into_strings;

use crate::tables::{AngleRecord, AtomRecord, AtomTypeRecord, BondRecord, DihedralRecord, InstantiationEntry};

/// Field-width limits carried from the legacy reader's `sscanf("%15s %7s
/// %15s", ...)`-style record layout (spec.md §3): overlong tokens are
/// truncated at assembly time rather than rejected outright.
const MAX_ATOM_TYPE_LEN: usize = 15;
const MAX_RESIDUE_NAME_LEN: usize = 7;
const MAX_ATOM_NAME_LEN: usize = 15;
const MAX_MOLTYPE_NAME_LEN: usize = 31;

fn tokens(line: &str) -> Vec<String> {
    split_into_strings(line, false)
}

fn truncated(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Parses an `[ atomtypes ]` record, accepting either the MARTINI shape
/// (`name mass ...`) or the GROMACS full shape (`name bond_type atomic_num
/// mass ...`). MARTINI is tried first and wins whenever it parses, even if
/// the GROMACS-shaped 4th column would also parse to a different mass — this
/// is the legacy reader's documented, intentionally preserved behavior.
pub fn parse_atomtype(line: &str) -> Option<AtomTypeRecord> {
    let tok = tokens(line);
    if tok.len() >= 2 {
        if let Ok(mass) = tok[1].parse::<f64>() {
            return Some(AtomTypeRecord { name: tok[0].clone(), mass });
        }
    }
    if tok.len() >= 4 {
        if let Ok(mass) = tok[3].parse::<f64>() {
            return Some(AtomTypeRecord { name: tok[0].clone(), mass });
        }
    }
    None
}

/// Parses the header line of a `[ moleculetype ]` record: `name [nrexcl]`.
pub fn parse_moleculetype_header(line: &str) -> Option<(String, i64)> {
    let tok = tokens(line);
    if tok.is_empty() {
        return None;
    }
    let name = truncated(&tok[0], MAX_MOLTYPE_NAME_LEN);
    let nrexcl = tok.get(1).and_then(|s| s.parse::<i64>().ok()).unwrap_or(3);
    Some((name, nrexcl))
}

/// Parses an `[ atoms ]` record: `id type resnr residue atom cgnr charge [mass]`.
pub fn parse_atom(line: &str) -> Option<AtomRecord> {
    let tok = tokens(line);
    if tok.len() < 7 {
        return None;
    }
    let id = tok[0].parse::<i64>().ok()?;
    let atom_type = truncated(&tok[1], MAX_ATOM_TYPE_LEN);
    let resnr = tok[2].parse::<i64>().ok()?;
    let residue = truncated(&tok[3], MAX_RESIDUE_NAME_LEN);
    let atom_name = truncated(&tok[4], MAX_ATOM_NAME_LEN);
    let cgnr = tok[5].parse::<i64>().ok()?;
    let charge = tok[6].parse::<f64>().ok()?;
    let mass = tok.get(7).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
    Some(AtomRecord { id, atom_type, resnr, residue, atom_name, cgnr, charge, mass })
}

/// Parses a `[ bonds ]` or `[ constraints ]` record: `ai aj [funct params...]`.
pub fn parse_bond(line: &str) -> Option<BondRecord> {
    let tok = tokens(line);
    if tok.len() < 2 {
        return None;
    }
    let ai = tok[0].parse::<i64>().ok()?;
    let aj = tok[1].parse::<i64>().ok()?;
    Some(BondRecord { ai, aj })
}

/// Parses an `[ angles ]` record: `ai aj ak [funct params...]`.
pub fn parse_angle(line: &str) -> Option<AngleRecord> {
    let tok = tokens(line);
    if tok.len() < 3 {
        return None;
    }
    let ai = tok[0].parse::<i64>().ok()?;
    let aj = tok[1].parse::<i64>().ok()?;
    let ak = tok[2].parse::<i64>().ok()?;
    Some(AngleRecord { ai, aj, ak })
}

/// Parses a `[ dihedrals ]` record: `ai aj ak al [funct params...]`.
pub fn parse_dihedral(line: &str) -> Option<DihedralRecord> {
    let tok = tokens(line);
    if tok.len() < 4 {
        return None;
    }
    let ai = tok[0].parse::<i64>().ok()?;
    let aj = tok[1].parse::<i64>().ok()?;
    let ak = tok[2].parse::<i64>().ok()?;
    let al = tok[3].parse::<i64>().ok()?;
    let funct = tok.get(4).and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
    Some(DihedralRecord { ai, aj, ak, al, funct })
}

/// Parses a `[ molecules ]` record: `name count`.
pub fn parse_instantiation_entry(line: &str) -> Option<InstantiationEntry> {
    let tok = tokens(line);
    if tok.len() < 2 {
        return None;
    }
    let moltype_name = tok[0].clone();
    let count = tok[1].parse::<i64>().ok()?;
    Some(InstantiationEntry { moltype_name, count })
}
