//! Parsing the programming tool's identify output
//!
//! flashrom reports a detected chip with a line like
//!
//! ```text
//! Found Winbond flash chip "W25Q32.V" (4096 kB, SPI) on linux_spi.
//! ```
//!
//! The part name is the quoted name, or else the word, right before the size
//! in parentheses. Sizes in `kB`/`KB` are KiB, sizes in `MiB`/`MB` are MiB.
//!
//! Parts flashrom only knows generically are reported as
//! `"unknown SPI chip (RDID)" (0 kB, SPI)` and are skipped, so a later line
//! naming a real part wins. A real part listed with size 0 keeps its 0; it
//! is up to the caller to treat that as an unknown size.

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FoundChip {
    pub name: String,
    pub size_bytes: u64,
}

const UNITS: [(&str, u64); 4] = [
    ("MiB", 1024 * 1024),
    ("MB", 1024 * 1024),
    ("kB", 1024),
    ("KB", 1024),
];

/// First `Found ... (<size> <unit>` line in the output, if any
pub fn parse_found_line(text: &str) -> Option<FoundChip> {
    text.lines().find_map(parse_line)
}

fn parse_line(line: &str) -> Option<FoundChip> {
    let start = line.find("Found ")?;
    let rest = &line[start + "Found ".len()..];
    // Part names may carry their own parentheses, e.g. "MX25L3205(A)"
    rest.match_indices('(').find_map(|(open, _)| {
        let size_bytes = parse_size(&rest[open + 1..])?;
        let name = part_name(&rest[..open])?;
        if name.is_empty() || name.starts_with("unknown") {
            return None;
        }
        Some(FoundChip {
            name: name.to_owned(),
            size_bytes,
        })
    })
}

/// The quoted name ending `head`, or its last word when unquoted
fn part_name(head: &str) -> Option<&str> {
    let head = head.trim_end();
    match head.strip_suffix('"') {
        Some(quoted) => {
            let open = quoted.rfind('"')?;
            Some(&quoted[open + 1..])
        }
        None => head.split_whitespace().last(),
    }
}

/// `<digits> [spaces] <unit>` followed by a word boundary
fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits == 0 {
        return None;
    }
    let size: u64 = s[..digits].parse().ok()?;
    let unit = s[digits..].trim_start();
    UNITS.iter().find_map(|&(name, scale)| {
        let after = unit.strip_prefix(name)?;
        match after.chars().next() {
            Some(c) if c.is_alphanumeric() || c == '_' => None,
            _ => size.checked_mul(scale),
        }
    })
}
