use eyre::{Result, bail};
use serde::{Deserialize, Serialize};

/// Measurements of one socket copy strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// ie. `Two-Copy`
    pub name: String,
    /// The send path used, ie. `send/recv`
    pub call: String,
    /// Gbps per message size, single thread
    pub throughput_gbps: Vec<f64>,
    /// Microseconds per thread count
    pub latency_us: Vec<f64>,
    /// Per message size, single thread
    pub l1_misses: Vec<u64>,
    pub llc_misses: Vec<u64>,
    pub cycles: Vec<u64>,
    pub bytes: Vec<u64>,
}

impl Strategy {
    /// `Two-Copy (send/recv)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.call)
    }

    /// CPU cycles spent per byte transferred, per message size
    pub fn cycles_per_byte(&self) -> Result<Vec<f64>> {
        self.cycles
            .iter()
            .zip(&self.bytes)
            .map(|(cycles, bytes)| {
                if *bytes == 0 {
                    bail!("{} transferred no bytes", self.name);
                }
                Ok(*cycles as f64 / *bytes as f64)
            })
            .collect()
    }
}

/// The copy strategy experiment: message size and thread count sweeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetIoData {
    /// Bytes
    pub message_sizes: Vec<u64>,
    pub thread_counts: Vec<u32>,
    /// Message size the latency sweep ran with
    pub latency_message_size: u64,
    /// Shown in a box on the single panel charts
    #[serde(default)]
    pub system_note: Option<String>,
    pub strategies: Vec<Strategy>,
}

/// `1KB`, `64KB`, `1MB`
pub fn size_label(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes}B")
    }
}

impl NetIoData {
    pub fn message_labels(&self) -> Vec<String> {
        self.message_sizes.iter().map(|s| size_label(*s)).collect()
    }

    /// Every series must have one value per message size or thread count
    pub fn validate(&self) -> Result<()> {
        let sizes = self.message_sizes.len();
        for strategy in &self.strategies {
            let per_size = [
                ("throughput_gbps", strategy.throughput_gbps.len()),
                ("l1_misses", strategy.l1_misses.len()),
                ("llc_misses", strategy.llc_misses.len()),
                ("cycles", strategy.cycles.len()),
                ("bytes", strategy.bytes.len()),
            ];
            for (series, len) in per_size {
                if len != sizes {
                    bail!(
                        "{} {series} has {len} values, expected {sizes} (one per message size)",
                        strategy.name
                    );
                }
            }
            if strategy.latency_us.len() != self.thread_counts.len() {
                bail!(
                    "{} latency_us has {} values, expected {} (one per thread count)",
                    strategy.name,
                    strategy.latency_us.len(),
                    self.thread_counts.len()
                );
            }
        }
        Ok(())
    }
}

impl Default for NetIoData {
    /// Results of the network namespace runs (server 10.0.0.1, client
    /// 10.0.0.2 over a veth pair, 3s per run)
    fn default() -> Self {
        Self {
            message_sizes: vec![1024, 4096, 16384, 65536],
            thread_counts: vec![1, 2, 4, 8],
            latency_message_size: 16384,
            system_note: Some(
                "System: Linux (Ubuntu)
CPU: Intel Core (10th Gen)
Memory: 16GB DDR4
Network: Namespace isolation
  ns_server (10.0.0.1)
  ns_client (10.0.0.2)
Test Duration: 3 seconds"
                    .to_owned(),
            ),
            strategies: vec![
                Strategy {
                    name: "Two-Copy".to_owned(),
                    call: "send/recv".to_owned(),
                    throughput_gbps: vec![0.4864, 1.9107, 6.4142, 26.3699],
                    latency_us: vec![40.78, 43.54, 64.66, 97.13],
                    l1_misses: vec![61018298, 98413687, 166022002, 468900573],
                    llc_misses: vec![165046, 165859, 177906, 4413061],
                    cycles: vec![3534204433, 4433526806, 4328019630, 7255172477],
                    bytes: vec![91204608, 358256640, 1202667520, 4944363520],
                },
                Strategy {
                    name: "One-Copy".to_owned(),
                    call: "sendmsg".to_owned(),
                    throughput_gbps: vec![0.4764, 2.0457, 7.3903, 20.7566],
                    latency_us: vec![35.39, 25.85, 66.69, 88.31],
                    l1_misses: vec![60106832, 104433781, 193524384, 371898024],
                    llc_misses: vec![149514, 134811, 158895, 8687259],
                    cycles: vec![3561178133, 4486849183, 4912728151, 6363464011],
                    bytes: vec![89321472, 383578112, 1385676800, 3891855360],
                },
                Strategy {
                    name: "Zero-Copy".to_owned(),
                    call: "MSG_ZEROCOPY".to_owned(),
                    throughput_gbps: vec![0.2891, 1.1567, 4.2649, 16.5811],
                    latency_us: vec![59.07, 55.87, 77.76, 129.26],
                    l1_misses: vec![49607671, 64186836, 109729293, 302944765],
                    llc_misses: vec![168817, 194656, 196928, 634073],
                    cycles: vec![3692911095, 4104185916, 4338528037, 7973077586],
                    bytes: vec![54213632, 216887296, 799670272, 3108962304],
                },
            ],
        }
    }
}
