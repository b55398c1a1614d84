use std::fmt;

use super::types::PortError;

/// Inclusive range of host ports handed out to workloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self, PortError> {
        if start >= end {
            return Err(PortError::InvalidRange(format!(
                "start ({}) must be less than end ({})",
                start, end
            )));
        }
        Ok(PortRange { start, end })
    }

    /// Parses `START-END`, e.g. `30000-40000`.
    pub fn parse(range_str: &str) -> Result<Self, PortError> {
        let (start, end) = range_str.split_once('-').ok_or_else(|| {
            PortError::InvalidRange(format!("{:?}, expected START-END", range_str))
        })?;

        let start: u16 = start
            .trim()
            .parse()
            .map_err(|_| PortError::InvalidRange(format!("invalid start port {:?}", start)))?;
        let end: u16 = end
            .trim()
            .parse()
            .map_err(|_| PortError::InvalidRange(format!("invalid end port {:?}", end)))?;

        PortRange::new(start, end)
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    pub fn size(&self) -> u32 {
        u32::from(self.end - self.start) + 1
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
