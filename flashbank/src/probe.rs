use banktools::found::{parse_found_line, FoundChip};
use banktools::size::HumanSize;
use tracing::debug;

use crate::programmer::{Operation, Programmer, ToolStatus};

/// What identify mode saw on one slot at one point in time
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProbeResult {
    pub found: bool,
    pub device_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub raw_output: String,
}

impl ProbeResult {
    /// A part listed with size 0 is found with an unknown size
    pub fn from_output(raw_output: String) -> Self {
        match parse_found_line(&raw_output) {
            Some(FoundChip { name, size_bytes }) => ProbeResult {
                found: true,
                device_name: Some(name),
                size_bytes: Some(size_bytes).filter(|&n| n > 0),
                raw_output,
            },
            None => ProbeResult {
                raw_output,
                ..Default::default()
            },
        }
    }

    /// Present with exactly `size` bytes
    pub fn matches(&self, size: u64) -> bool {
        self.found && self.size_bytes == Some(size)
    }

    pub fn name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("unknown")
    }

    pub fn human_size(&self) -> HumanSize {
        HumanSize(self.size_bytes)
    }
}

/// Identify whatever sits in the currently selected slot.
///
/// The output is parsed whatever the exit status, since the identify line
/// is printed before flashrom complains about anything else. Only a tool
/// that cannot be started gives nothing to parse.
pub fn probe(programmer: &dyn Programmer, hint: Option<&str>) -> ProbeResult {
    let run = programmer.run(Operation::Identify { hint });
    if let ToolStatus::Spawn(e) = &run.status {
        return ProbeResult {
            raw_output: format!("error: {}", e),
            ..Default::default()
        };
    }
    let result = ProbeResult::from_output(run.output);
    debug!(status = ?run.status, found = result.found, "probe output:\n{}", result.raw_output);
    result
}
