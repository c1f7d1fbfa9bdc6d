use crate::errors::TopologyError;
use crate::preprocessor::{Event, Preprocessor};
use crate::records::{parse_angle, parse_atom, parse_atomtype, parse_bond, parse_dihedral, parse_instantiation_entry, parse_moleculetype_header};
use crate::tables::{AtomTypeTable, InstantiationEntry, MoleculeType, MoleculeTypeTable, MAX_ROSTER_ENTRIES};

/// Everything the parser accumulates before instantiation: the molecule-type
/// registry, the atom-type table, and the `[ molecules ]` roster.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub moltypes: MoleculeTypeTable,
    pub atomtypes: AtomTypeTable,
    pub roster: Vec<InstantiationEntry>,
}

/// Parses a topology file (and all of its transitive includes) into a
/// [`ParsedDocument`], by driving the [`Preprocessor`]'s event stream through
/// a section-routing state machine.
///
/// This is the event-driven replacement for the legacy fseek-and-reparse
/// idiom: directives between records never surface as events at all, so
/// there is nothing to "unread" here — a section's handler simply keeps
/// consuming `Event::Record`s until it sees the next `Event::Section` (or end
/// of input), and that next event becomes the state for the outer loop.
pub fn parse_document(path: &str) -> Result<ParsedDocument, TopologyError> {
    let mut pp = Preprocessor::open(path)?;
    let mut doc = ParsedDocument::default();
    let mut current_moltype: Option<String> = None;

    let mut current = pp.next_event()?;
    loop {
        let event = match current.take() {
            None => break,
            Some(e) => e,
        };
        current = match event {
            // A record with no enclosing section header is meaningless; skip it.
            Event::Record(_) => pp.next_event()?,
            Event::Section(name) => dispatch_section(&name, &mut pp, &mut doc, &mut current_moltype)?,
        };
    }

    Ok(doc)
}

fn dispatch_section(
    name: &str,
    pp: &mut Preprocessor,
    doc: &mut ParsedDocument,
    current_moltype: &mut Option<String>,
) -> Result<Option<Event>, TopologyError> {
    log::debug!("processing section: [{name}]");
    match name {
        "atomtypes" => drain_records(pp, |line| {
            if let Some(rec) = parse_atomtype(line) {
                doc.atomtypes.insert(rec);
            } else {
                log::warn!("malformed atomtypes record, skipped: '{line}'");
            }
        }),
        "moleculetype" => parse_moleculetype_section(pp, doc, current_moltype),
        "atoms" => drain_intra_moltype(pp, doc, current_moltype, |moltype, line| {
            if let Some(rec) = parse_atom(line) {
                moltype.atoms.push(rec);
            } else {
                log::warn!("malformed atoms record, skipped: '{line}'");
            }
        }),
        "bonds" | "constraints" => drain_intra_moltype(pp, doc, current_moltype, |moltype, line| {
            if let Some(rec) = parse_bond(line) {
                moltype.bonds.push(rec);
            } else {
                log::warn!("malformed {name} record, skipped: '{line}'");
            }
        }),
        "angles" => drain_intra_moltype(pp, doc, current_moltype, |moltype, line| {
            if let Some(rec) = parse_angle(line) {
                moltype.angles.push(rec);
            } else {
                log::warn!("malformed angles record, skipped: '{line}'");
            }
        }),
        "dihedrals" => drain_intra_moltype(pp, doc, current_moltype, |moltype, line| {
            if let Some(rec) = parse_dihedral(line) {
                moltype.dihedrals.push(rec);
            } else {
                log::warn!("malformed dihedrals record, skipped: '{line}'");
            }
        }),
        "molecules" => drain_records(pp, |line| {
            if let Some(entry) = parse_instantiation_entry(line) {
                if doc.roster.len() >= MAX_ROSTER_ENTRIES {
                    log::warn!("maximum roster size ({MAX_ROSTER_ENTRIES}) exceeded, dropping '{}'", entry.moltype_name);
                } else {
                    log::debug!("found molecule: {} x {}", entry.moltype_name, entry.count);
                    doc.roster.push(entry);
                }
            } else {
                log::warn!("malformed molecules record, skipped: '{line}'");
            }
        }),
        // system, defaults, pairs, exclusions, settles, position_restraints, and anything unrecognized.
        _ => drain_records(pp, |_| {}),
    }
}

/// Consumes `Event::Record`s by handing each line to `handler`, stopping at
/// the next `Event::Section` or end of input, which it returns to become the
/// caller's next lookahead event.
fn drain_records(pp: &mut Preprocessor, mut handler: impl FnMut(&str)) -> Result<Option<Event>, TopologyError> {
    loop {
        match pp.next_event()? {
            Some(Event::Record(line)) => handler(&line),
            other => return Ok(other),
        }
    }
}

fn drain_intra_moltype(
    pp: &mut Preprocessor,
    doc: &mut ParsedDocument,
    current_moltype: &Option<String>,
    mut handler: impl FnMut(&mut MoleculeType, &str),
) -> Result<Option<Event>, TopologyError> {
    let Some(name) = current_moltype.clone() else {
        log::warn!("section encountered with no enclosing [ moleculetype ], contents ignored");
        return drain_records(pp, |_| {});
    };
    drain_records(pp, |line| {
        if let Some(moltype) = doc.moltypes.get_mut(&name) {
            handler(moltype, line);
        }
    })
}

/// A `[ moleculetype ]` section holds exactly one header record (`name
/// [nrexcl]`); any further non-header lines before the next section are
/// dropped — real molecule data always arrives through a following `[ atoms
/// ]` section, not inline here.
fn parse_moleculetype_section(
    pp: &mut Preprocessor,
    doc: &mut ParsedDocument,
    current_moltype: &mut Option<String>,
) -> Result<Option<Event>, TopologyError> {
    match pp.next_event()? {
        Some(Event::Record(line)) => {
            if let Some((name, nrexcl)) = parse_moleculetype_header(&line) {
                *current_moltype = if doc.moltypes.insert(MoleculeType::new(name.clone(), nrexcl)) {
                    Some(name)
                } else {
                    // The duplicate was ignored, not merged — any following
                    // [ atoms ]/[ bonds ]/etc. must not be appended onto the
                    // first definition of this name.
                    None
                };
            } else {
                log::warn!("malformed moleculetype header, skipped: '{line}'");
            }
            drain_records(pp, |_| {})
        }
        other => {
            log::warn!("[ moleculetype ] section has no header record");
            Ok(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(name: &str, content: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap().write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn parses_single_water_moltype_and_roster() {
        let path = write_file("gmxtop_dispatch_water.top", concat!(
            "[ atomtypes ]\n",
            "OW 16.0\n",
            "HW 1.008\n",
            "[ moleculetype ]\n",
            "SOL 2\n",
            "[ atoms ]\n",
            "1 OW 1 SOL OW 1 -0.8\n",
            "2 HW 1 SOL HW1 1 0.4\n",
            "3 HW 1 SOL HW2 1 0.4\n",
            "[ bonds ]\n",
            "1 2\n",
            "1 3\n",
            "[ molecules ]\n",
            "SOL 1\n",
        ));
        let doc = parse_document(&path).unwrap();
        assert_eq!(doc.atomtypes.mass_of("OW"), Some(16.0));
        let sol = doc.moltypes.get("SOL").unwrap();
        assert_eq!(sol.natoms(), 3);
        assert_eq!(sol.bonds.len(), 2);
        assert_eq!(doc.roster, vec![InstantiationEntry { moltype_name: "SOL".to_string(), count: 1 }]);
    }

    #[test]
    fn constraints_append_to_bonds() {
        let path = write_file("gmxtop_dispatch_constraints.top", concat!(
            "[ moleculetype ]\n",
            "M 3\n",
            "[ atoms ]\n",
            "1 A 1 R A1 1 0.0\n",
            "2 A 1 R A2 1 0.0\n",
            "3 A 1 R A3 1 0.0\n",
            "[ bonds ]\n",
            "1 2\n",
            "[ constraints ]\n",
            "2 3\n",
            "[ molecules ]\n",
            "M 1\n",
        ));
        let doc = parse_document(&path).unwrap();
        let m = doc.moltypes.get("M").unwrap();
        assert_eq!(m.bonds.len(), 2);
    }

    #[test]
    fn duplicate_moleculetype_header_does_not_inflate_the_first_definition() {
        let path = write_file("gmxtop_dispatch_duplicate_moltype.top", concat!(
            "[ moleculetype ]\n",
            "M 3\n",
            "[ atoms ]\n",
            "1 A 1 R A1 1 0.0\n",
            "2 A 1 R A2 1 0.0\n",
            "[ moleculetype ]\n",
            "M 3\n",
            "[ atoms ]\n",
            "1 A 1 R A3 1 0.0\n",
            "[ molecules ]\n",
            "M 1\n",
        ));
        let doc = parse_document(&path).unwrap();
        let m = doc.moltypes.get("M").unwrap();
        assert_eq!(m.natoms(), 2);
    }

    #[test]
    fn atoms_section_without_moleculetype_is_ignored() {
        let path = write_file("gmxtop_dispatch_orphan.top", concat!(
            "[ atoms ]\n",
            "1 A 1 R A1 1 0.0\n",
            "[ molecules ]\n",
        ));
        let doc = parse_document(&path).unwrap();
        assert!(doc.moltypes.is_empty());
    }
}
