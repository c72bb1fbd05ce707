//! # Orchestrator configuration.
//!
//! [`Config`] carries the filesystem layout for updates (staging root, live
//! root, artifact name), the bus and stream queue capacities, and the sanity
//! probe timeout. Nothing here is hard-coded into the agents; tests
//! substitute throwaway directories per invocation.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use binvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.artifact_name = "tool".to_string();
//! cfg.probe_timeout = Duration::from_secs(5);
//!
//! assert_eq!(cfg.artifact_name, "tool");
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Global configuration shared by the agents.
///
/// The update agent stages under `<temp_root>/<invocation-id>/` and activates
/// at `<current_root>/<artifact_name>`. The two roots must live on the same
/// filesystem: activation is a rename, and a cross-device rename would not be
/// atomic.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root for per-invocation staging directories.
    pub temp_root: PathBuf,
    /// Directory holding the live artifact.
    pub current_root: PathBuf,
    /// File name of the live artifact inside `current_root`.
    pub artifact_name: String,
    /// Capacity of each subscriber queue on the bus.
    pub bus_capacity: usize,
    /// Capacity of the caller-facing event stream returned by the run agent.
    pub stream_capacity: usize,
    /// Upper bound on one sanity probe execution.
    pub probe_timeout: Duration,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `temp_root = <system temp>/binvisor/staging`
    /// - `current_root = <system temp>/binvisor/current`
    /// - `artifact_name = "binary"`
    /// - `bus_capacity = 64`
    /// - `stream_capacity = 64`
    /// - `probe_timeout = 10s`
    fn default() -> Self {
        let base = std::env::temp_dir().join("binvisor");
        Self {
            temp_root: base.join("staging"),
            current_root: base.join("current"),
            artifact_name: "binary".to_string(),
            bus_capacity: 64,
            stream_capacity: 64,
            probe_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Full path of the live artifact (`current_root` + `artifact_name`).
    pub fn current_path(&self) -> PathBuf {
        self.current_root.join(&self.artifact_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_share_the_temp_root() {
        let cfg = Config::default();
        assert!(cfg.temp_root.starts_with(std::env::temp_dir()));
        assert!(cfg.current_root.starts_with(std::env::temp_dir()));
        assert_eq!(cfg.current_path().file_name().unwrap(), "binary");
    }
}
