use crate::io::{Format, error::Error};
use crate::model::{
    atom::{Atom, Bond},
    pose::Pose,
    system::LigandSystem,
};
use std::io::BufRead;

const UNKNOWN_PROGRAM: &str = "unknown";

/// One `$$$$`-terminated molfile record with its data items.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfRecord {
    pub title: String,
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    pub data: Vec<(String, String)>,
}

impl SdfRecord {
    pub fn data_item(&self, name: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Converts the record into a pose. Numeric data items become features;
    /// `program`, `rmsd` and `pkd` are interpreted. `dbx2_*` items are
    /// prediction output and never become features.
    pub fn into_pose(self) -> Pose {
        let program = self
            .data_item("program")
            .or_else(|| self.data_item("docking_program"))
            .map(str::to_string)
            .or_else(|| Some(self.title.trim().to_string()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| UNKNOWN_PROGRAM.to_string());

        let rmsd = self.data_item("rmsd").and_then(|v| v.trim().parse().ok());

        let features = self
            .data
            .iter()
            .filter(|(key, _)| !is_reserved_item(key))
            .filter_map(|(key, value)| value.trim().parse::<f64>().ok().map(|v| (key.clone(), v)))
            .collect();

        Pose {
            program,
            features,
            rmsd,
            atoms: self.atoms,
            bonds: self.bonds,
        }
    }
}

/// Prefix of the items written alongside ranked poses.
const PREDICTION_PREFIX: &str = "dbx2_";

fn is_reserved_item(name: &str) -> bool {
    let prediction = name
        .get(..PREDICTION_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PREDICTION_PREFIX));
    prediction
        || ["program", "docking_program", "rmsd", "pkd"]
            .iter()
            .any(|reserved| name.eq_ignore_ascii_case(reserved))
}

/// Reads every record of a multi-record SDF stream.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<SdfRecord>, Error> {
    let mut records = Vec::new();
    let mut block: Vec<(usize, String)> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let content = line.map_err(|e| Error::Io { source: e })?;
        let ln = i + 1;
        if content.trim() == "$$$$" {
            if !is_blank(&block) {
                records.push(parse_record(&block)?);
            }
            block.clear();
        } else {
            block.push((ln, content));
        }
    }

    if !is_blank(&block) {
        records.push(parse_record(&block)?);
    }

    Ok(records)
}

/// Reads a multi-record SDF stream as the poses of a single system.
pub fn read_system<R: BufRead>(reader: R, id: &str) -> Result<LigandSystem, Error> {
    let records = read_records(reader)?;

    let pkd = records.iter().find_map(|r| {
        r.data_item("pkd")
            .and_then(|v| v.trim().parse::<f64>().ok())
    });

    Ok(LigandSystem {
        id: id.to_string(),
        pkd,
        poses: records.into_iter().map(SdfRecord::into_pose).collect(),
    })
}

fn is_blank(block: &[(usize, String)]) -> bool {
    block.iter().all(|(_, line)| line.trim().is_empty())
}

fn parse_record(lines: &[(usize, String)]) -> Result<SdfRecord, Error> {
    let first_ln = lines.first().map(|(ln, _)| *ln).unwrap_or(1);
    if lines.len() < 4 {
        return Err(Error::parse(
            Format::Sdf,
            first_ln,
            "SDF record must contain at least a header and counts line",
        ));
    }

    let counts_line_no = lines[3].0;
    let counts_line = &lines[3].1;
    if counts_line.contains("V3000") {
        return Err(Error::parse(
            Format::Sdf,
            counts_line_no,
            "V3000 is not supported",
        ));
    }

    let (atom_count, bond_count) = parse_counts(counts_line, counts_line_no)?;
    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let bond_end = bond_start + bond_count;

    if lines.len() < bond_end {
        return Err(Error::parse(
            Format::Sdf,
            lines.last().map(|(ln, _)| *ln).unwrap_or(counts_line_no),
            "SDF record ended before atoms/bonds were fully specified",
        ));
    }

    let atoms = parse_atoms(&lines[atom_start..bond_start])?;
    let bonds = parse_bonds(&lines[bond_start..bond_end], atom_count)?;
    let data = parse_data_items(&lines[bond_end..]);

    Ok(SdfRecord {
        title: lines[0].1.trim().to_string(),
        atoms,
        bonds,
        data,
    })
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), Error> {
    let padded = format!("{line:<6}");
    let (atoms_field, bonds_field) = match (padded.get(0..3), padded.get(3..6)) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => (a, b),
        _ => {
            let tokens: Vec<_> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return Err(Error::parse(
                    Format::Sdf,
                    line_no,
                    "counts line must contain atom and bond counts",
                ));
            }
            (tokens[0], tokens[1])
        }
    };
    let atoms = atoms_field
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse(Format::Sdf, line_no, "invalid atom count"))?;
    let bonds = bonds_field
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse(Format::Sdf, line_no, "invalid bond count"))?;
    Ok((atoms, bonds))
}

fn parse_atoms(lines: &[(usize, String)]) -> Result<Vec<Atom>, Error> {
    let mut atoms = Vec::with_capacity(lines.len());
    for (ln, raw) in lines {
        let padded = format!("{raw:<40}");

        let x = parse_coord(column(&padded, 0..10, *ln)?, *ln, "x")?;
        let y = parse_coord(column(&padded, 10..20, *ln)?, *ln, "y")?;
        let z = parse_coord(column(&padded, 20..30, *ln)?, *ln, "z")?;

        let symbol = column(&padded, 31..34, *ln)?.trim();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::parse(
                Format::Sdf,
                *ln,
                "unable to read element symbol",
            ));
        }

        atoms.push(Atom::new(normalize_symbol(symbol), [x, y, z]));
    }
    Ok(atoms)
}

fn column(line: &str, range: std::ops::Range<usize>, ln: usize) -> Result<&str, Error> {
    line.get(range)
        .ok_or_else(|| Error::parse(Format::Sdf, ln, "atom line is not valid fixed-column text"))
}

fn parse_coord(field: &str, ln: usize, axis: &str) -> Result<f64, Error> {
    field.trim().parse::<f64>().map_err(|_| {
        Error::parse(
            Format::Sdf,
            ln,
            format!("invalid {axis} coordinate in atom line"),
        )
    })
}

fn normalize_symbol(symbol: &str) -> String {
    let mut chars = symbol.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn parse_bonds(lines: &[(usize, String)], atom_count: usize) -> Result<Vec<Bond>, Error> {
    let mut bonds = Vec::with_capacity(lines.len());
    for (ln, raw) in lines {
        let padded = format!("{raw:<9}");
        let fields: Vec<&str> = match (padded.get(0..3), padded.get(3..6), padded.get(6..9)) {
            (Some(a), Some(b), Some(c)) if [a, b, c].iter().all(|f| !f.trim().is_empty()) => {
                vec![a, b, c]
            }
            _ => raw.split_whitespace().take(3).collect(),
        };
        if fields.len() < 3 {
            return Err(Error::parse(Format::Sdf, *ln, "invalid bond line"));
        }

        let a1 = fields[0]
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::parse(Format::Sdf, *ln, "invalid first atom index"))?;
        let a2 = fields[1]
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::parse(Format::Sdf, *ln, "invalid second atom index"))?;
        let order = fields[2]
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::parse(Format::Sdf, *ln, "invalid bond order value"))?;

        if !(1..=4).contains(&order) {
            return Err(Error::parse(
                Format::Sdf,
                *ln,
                "unsupported bond order in bond line",
            ));
        }

        if a1 == 0 || a2 == 0 || a1 > atom_count || a2 > atom_count {
            return Err(Error::parse(
                Format::Sdf,
                *ln,
                "bond references atom outside declared range",
            ));
        }

        bonds.push(Bond::new(a1 - 1, a2 - 1, order));
    }
    Ok(bonds)
}

fn parse_data_items(lines: &[(usize, String)]) -> Vec<(String, String)> {
    let mut items = Vec::new();
    let mut iter = lines
        .iter()
        .map(|(_, l)| l.as_str())
        .skip_while(|l| !l.trim_start().starts_with("M  END"))
        .skip(1)
        .peekable();

    while let Some(line) = iter.next() {
        let Some(name) = data_header_name(line) else {
            continue;
        };

        let mut value_lines = Vec::new();
        while let Some(next) = iter.peek() {
            if next.trim().is_empty() || data_header_name(next).is_some() {
                break;
            }
            value_lines.push(next.trim_end());
            iter.next();
        }
        items.push((name, value_lines.join("\n")));
    }

    items
}

fn data_header_name(line: &str) -> Option<String> {
    if !line.starts_with('>') {
        return None;
    }
    let start = line.find('<')? + 1;
    let end = start + line[start..].find('>')?;
    Some(line[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_POSES: &str = "\
pose_1
  dockbox2

  3  2  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
   -0.5000    0.9000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  2  0  0  0  0
  1  3  1  0  0  0  0
M  END
> <program>
vina

> <vina_score>
-8.25

> <rmsd>
1.10

> <pKd>
6.4

> <comment>
not a number

$$$$
pose_2
  dockbox2

  3  2  0  0  0  0  0  0  0  0999 V2000
    0.1000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.6000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
   -0.4000    0.9000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  2  0  0  0  0
  1  3  1  0  0  0  0
M  END
> <vina_score>
-7.00

$$$$
";

    #[test]
    fn reads_all_records_with_data_items() {
        let records = read_records(Cursor::new(TWO_POSES)).expect("read records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "pose_1");
        assert_eq!(records[0].atoms.len(), 3);
        assert_eq!(records[0].bonds[0], Bond::new(0, 1, 2));
        assert_eq!(records[0].data_item("PROGRAM"), Some("vina"));
        assert_eq!(records[0].data_item("comment"), Some("not a number"));
    }

    #[test]
    fn converts_records_into_a_system() {
        let system = read_system(Cursor::new(TWO_POSES), "1abc").expect("read system");
        assert_eq!(system.id, "1abc");
        assert_eq!(system.pkd, Some(6.4));
        assert_eq!(system.poses.len(), 2);

        let first = &system.poses[0];
        assert_eq!(first.program, "vina");
        assert_eq!(first.rmsd, Some(1.10));
        assert_eq!(first.feature("vina_score"), Some(-8.25));
        assert!(first.feature("comment").is_none());
        assert!(first.feature("rmsd").is_none());

        let second = &system.poses[1];
        assert_eq!(second.program, "pose_2");
        assert!(second.rmsd.is_none());
        assert!((second.atoms[0].position[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rejects_v3000_records() {
        let input = "title\n  prog\n\n  0  0  0  0  0  0  0  0  0  0999 V3000\nM  END\n$$$$\n";
        let err = read_records(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 4, .. }));
    }

    #[test]
    fn rejects_bond_outside_atom_range() {
        let input = "\
t
  p

  1  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
M  END
$$$$
";
        let err = read_records(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 6, .. }));
    }

    #[test]
    fn normalizes_two_letter_symbols() {
        assert_eq!(normalize_symbol("CL"), "Cl");
        assert_eq!(normalize_symbol("br"), "Br");
        assert_eq!(normalize_symbol("N"), "N");
    }
}
