use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The measured quantities recorded for every benchmark configuration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Metric {
    Duration,
    CpuUsage,
    MemUsage,
    IoUsage,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Duration,
        Metric::CpuUsage,
        Metric::MemUsage,
        Metric::IoUsage,
    ];

    /// Column name used by the benchmark scripts
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Duration => "Duration",
            Metric::CpuUsage => "CPU_Usage",
            Metric::MemUsage => "Mem_Usage",
            Metric::IoUsage => "IO_Usage",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::Duration => "Execution Time (s)",
            Metric::CpuUsage => "CPU Usage (%)",
            Metric::MemUsage => "Memory Usage (%)",
            Metric::IoUsage => "IO Usage (%)",
        }
    }

    pub fn short_title(&self) -> &'static str {
        match self {
            Metric::Duration => "Time (s)",
            Metric::CpuUsage => "CPU (%)",
            Metric::MemUsage => "Mem (%)",
            Metric::IoUsage => "IO (%)",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Duration => "Seconds",
            _ => "Percent",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
