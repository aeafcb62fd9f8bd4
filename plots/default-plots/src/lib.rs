use common::{
    config::{Config, Settings},
    plot::Plot,
};
use netio_analysis::NetIoAnalysis;
use pair_comparison::PairComparison;
use scaling_grid::ScalingGrid;
use worker_efficiency::WorkerEfficiency;

/// Names of the crates providing plots, for log filtering
pub const PLOT_MODULES: &[&str] = &[
    "common",
    "plot_common",
    "scaling_grid",
    "pair_comparison",
    "worker_efficiency",
    "netio_analysis",
];

/// Makes sure every plot type is linked in and registered for
/// deserialization
pub fn init_plots() {
    _ = serde_json::to_string(&ScalingGrid::default());
    _ = serde_json::to_string(&PairComparison::default());
    _ = serde_json::to_string(&WorkerEfficiency::default());
    _ = serde_json::to_string(&NetIoAnalysis::default());
}

/// The batch run when no config file is given: the process/thread
/// comparison and scaling plots followed by the copy strategy charts
pub fn default_config() -> Config {
    let plots: Vec<Box<dyn Plot>> = vec![
        Box::new(PairComparison::default()),
        Box::new(ScalingGrid::default()),
        Box::new(WorkerEfficiency::default()),
        Box::new(NetIoAnalysis::default()),
    ];
    Config {
        name: "default".to_owned(),
        settings: Settings::default(),
        plots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch_outputs() {
        let outputs = default_config()
            .plots
            .iter()
            .flat_map(|plot| plot.outputs())
            .collect::<Vec<_>>();
        assert_eq!(
            outputs,
            vec![
                "MT25091_Part_C_Plot.png",
                "MT25091_Part_D_Plot_1.png",
                "MT25091_Part_D_Plot_2.png",
                "plot_throughput_vs_msgsize.png",
                "plot_latency_vs_threads.png",
                "plot_cache_misses_vs_msgsize.png",
                "plot_cycles_per_byte.png",
            ]
        );
    }

    #[test]
    fn default_config_survives_yaml() {
        init_plots();
        let yaml = serde_yml::to_string(&default_config()).unwrap();
        let config = Config::from_yaml(&yaml).unwrap();
        let names = config.plots.iter().map(|p| p.name()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "PairComparison",
                "ScalingGrid",
                "WorkerEfficiency",
                "NetIoAnalysis"
            ]
        );
        let netio = serde_json::to_value(&config.plots[3]).unwrap();
        assert_eq!(netio["type"], "NetIoAnalysis");
    }

    #[test]
    fn minimal_config() {
        init_plots();
        let config = Config::from_yaml(
            "name: pa01
plots:
  - type: ScalingGrid
    input: scaling.csv
  - type: WorkerEfficiency
    input: scaling.csv
    output: efficiency.png
",
        )
        .unwrap();
        assert_eq!(config.settings.width, Settings::default().width);
        assert_eq!(config.plots[1].outputs(), vec!["efficiency.png"]);
    }
}
