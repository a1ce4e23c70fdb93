//! Result writer.

use rectpack_core::{Instance, SearchableEntry};
use std::io::{self, Write};

/// Header line preceding the placements.
pub const PLACEMENT_HEADER: &str = "placement of rectangles";

/// Writes a placed instance as text: optionally the instance itself, then
/// [`PLACEMENT_HEADER`] and one `x y` line per rectangle in id order,
/// prefixed by `yes` or `no` when rotation is allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultWriter {
    echo_instance: bool,
}

impl ResultWriter {
    /// Creates a writer that prints placements only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also prints the instance header and rectangle sizes first.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo_instance = echo;
        self
    }

    /// Writes `placed` to `out`.
    pub fn write<W: Write>(&self, out: &mut W, placed: &Instance) -> io::Result<()> {
        let mut entries: Vec<_> = placed.entries().iter().collect();
        entries.sort_by_key(|e| e.id());

        if self.echo_instance {
            match placed.fixed_height() {
                Some(height) => writeln!(out, "container height: fixed {height}")?,
                None => writeln!(out, "container height: free")?,
            }
            writeln!(out, "rotations allowed: {}", yes_no(placed.allows_rotation()))?;
            writeln!(out, "number of rectangles: {}", entries.len())?;
            for entry in &entries {
                writeln!(out, "{} {}", entry.raw_width(), entry.raw_height())?;
            }
        }

        writeln!(out, "{PLACEMENT_HEADER}")?;
        for entry in entries {
            let (x, y) = entry.position().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("rectangle {} is not placed", entry.id()),
                )
            })?;
            if placed.allows_rotation() {
                writeln!(out, "{} {} {}", yes_no(entry.rotated()), x, y)?;
            } else {
                writeln!(out, "{x} {y}")?;
            }
        }
        Ok(())
    }

    /// Renders `placed` into a string.
    pub fn render(&self, placed: &Instance) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, placed)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::InstanceParser;

    fn placed(rotatable: bool) -> Instance {
        let mut instance = Instance::from_dimensions(rotatable, Some(3), &[(2, 3), (3, 1)]);
        instance.set_box(5, 3);
        // output order follows ids, not the instance order
        instance.swap(0, 1);
        instance.set_position(0, 2, 0);
        instance.set_position(1, 0, 0);
        if rotatable {
            instance.set_rotation(0, true);
        }
        instance
    }

    #[test]
    fn test_placements_without_rotation() {
        let text = ResultWriter::new().render(&placed(false)).unwrap();
        assert_eq!(text, "placement of rectangles\n0 0\n2 0\n");
    }

    #[test]
    fn test_placements_with_rotation() {
        let text = ResultWriter::new().render(&placed(true)).unwrap();
        assert_eq!(text, "placement of rectangles\nno 0 0\nyes 2 0\n");
    }

    #[test]
    fn test_echo_parses_back() {
        let original = placed(true);
        let text = ResultWriter::new().with_echo(true).render(&original).unwrap();
        assert!(text.starts_with("container height: fixed 3\nrotations allowed: yes\n"));

        let header: String = text
            .lines()
            .take_while(|l| *l != PLACEMENT_HEADER)
            .map(|l| format!("{l}\n"))
            .collect();
        let parsed = InstanceParser::new().parse_str(&header).unwrap();
        assert_eq!(parsed.size(), 2);
        assert_eq!(parsed.entry(0).raw_width(), 2);
        assert_eq!(parsed.entry(1).raw_width(), 3);
    }

    #[test]
    fn test_unplaced_entry_is_an_error() {
        let instance = Instance::from_dimensions(false, None, &[(1, 1)]);
        assert!(ResultWriter::new().render(&instance).is_err());
    }
}
