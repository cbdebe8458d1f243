//! Human-readable device sizes for log lines

use std::fmt;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Displays whole MiB from 1 MiB up, whole KiB below that, `n/a` when
/// unknown or zero
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HumanSize(pub Option<u64>);

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) if n >= MIB => write!(f, "{} MiB", n / MIB),
            Some(n) if n > 0 => write!(f, "{} KiB", n / KIB),
            _ => write!(f, "n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!("4 MiB", HumanSize(Some(4 * MIB)).to_string());
        assert_eq!("4 MiB", HumanSize(Some(4 * MIB + 10)).to_string());
        assert_eq!("512 KiB", HumanSize(Some(512 * KIB)).to_string());
        assert_eq!("0 KiB", HumanSize(Some(100)).to_string());
        assert_eq!("n/a", HumanSize(Some(0)).to_string());
        assert_eq!("n/a", HumanSize(None).to_string());
    }
}
