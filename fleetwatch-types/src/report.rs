//! The structured system report an entity sends.

/// Usage of one mounted storage directory, in megabytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageUsage {
    pub directory: String,
    pub total: u64,
    pub used: u64,
}

impl StorageUsage {
    pub fn new(directory: impl Into<String>, total: u64, used: u64) -> Self {
        Self {
            directory: directory.into(),
            total,
            used,
        }
    }

    /// Used fraction of the directory in `0.0..=1.0` (0 when `total` is 0).
    pub fn used_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.used as f64 / self.total as f64).min(1.0)
        }
    }
}

/// A validated system report.
///
/// Produced by validating an entity's raw payload; every field is required.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemReport {
    /// Display name of the entity.
    pub name: String,
    /// Current CPU usage in whole percent.
    pub cpu: u32,
    /// Memory in use, in megabytes.
    pub memory_used: u64,
    /// Total memory, in megabytes.
    pub memory_total: u64,
    pub storage: Vec<StorageUsage>,
}
