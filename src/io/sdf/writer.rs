use crate::io::error::Error;
use crate::model::pose::Pose;
use std::io::Write;

/// Writes one pose as a V2000 record followed by its data items.
///
/// The pose's program, reference RMSD and features are always written;
/// `extra` items are appended after them in the given order.
pub fn write_pose<W: Write>(
    mut writer: W,
    title: &str,
    pose: &Pose,
    extra: &[(String, String)],
) -> Result<(), Error> {
    let atom_count = pose.atom_count();
    let bond_count = pose.bonds.len();

    writeln!(writer, "{title}")?;
    writeln!(writer, "  dockbox2")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:>3}{:>3}  0  0  0  0  0  0  0  0  0999 V2000",
        atom_count, bond_count
    )?;

    for atom in &pose.atoms {
        writeln!(
            writer,
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
            atom.position[0], atom.position[1], atom.position[2], atom.symbol
        )?;
    }

    for bond in &pose.bonds {
        writeln!(
            writer,
            "{:>3}{:>3}{:>3}  0  0  0  0",
            bond.i + 1,
            bond.j + 1,
            bond.order
        )?;
    }

    writeln!(writer, "M  END")?;

    write_item(&mut writer, "program", &pose.program)?;
    if let Some(rmsd) = pose.rmsd {
        write_item(&mut writer, "rmsd", &format!("{rmsd:.4}"))?;
    }
    for (name, value) in &pose.features {
        write_item(&mut writer, name, &value.to_string())?;
    }
    for (name, value) in extra {
        write_item(&mut writer, name, value)?;
    }

    writeln!(writer, "$$$$")?;
    Ok(())
}

fn write_item<W: Write>(writer: &mut W, name: &str, value: &str) -> Result<(), Error> {
    writeln!(writer, "> <{name}>")?;
    writeln!(writer, "{value}")?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sdf::reader;
    use crate::model::atom::{Atom, Bond};
    use std::io::Cursor;

    #[test]
    fn written_pose_reads_back_with_scores() {
        let mut pose = Pose::new("vina")
            .with_feature("vina_score", -7.5)
            .with_rmsd(2.25)
            .with_atoms(vec![
                Atom::new("C", [0.0, 0.0, 0.0]),
                Atom::new("Cl", [1.75, 0.0, 0.0]),
                Atom::new("H", [0.0, 1.0, 0.0]),
            ]);
        pose.bonds = vec![Bond::new(0, 1, 1), Bond::new(0, 2, 1)];

        let mut buf = Vec::new();
        write_pose(
            &mut buf,
            "1abc",
            &pose,
            &[("dbx2_probability".to_string(), "0.9000".to_string())],
        )
        .expect("write sdf");

        let system = reader::read_system(Cursor::new(buf), "1abc").expect("read sdf");
        let parsed = &system.poses[0];

        assert_eq!(parsed.program, "vina");
        assert_eq!(parsed.rmsd, Some(2.25));
        assert_eq!(parsed.feature("vina_score"), Some(-7.5));
        assert_eq!(parsed.feature("dbx2_probability"), None);
        assert_eq!(parsed.bonds, pose.bonds);
        for (a, b) in pose.atoms.iter().zip(parsed.atoms.iter()) {
            assert_eq!(a.symbol, b.symbol);
            for k in 0..3 {
                assert!((a.position[k] - b.position[k]).abs() < 1e-4);
            }
        }
    }
}
