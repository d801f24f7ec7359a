//! Run Configuration
//!
//! Every setting has an in-code default; environment variables (or a `.env`
//! file) may override them.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::doe::DoeConfig;
use crate::test_circuit::TestCircuitConfig;

/// Settings for one run of the `mmi_layout` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub test_device_gds: PathBuf,
    pub doe_dir: PathBuf,
    pub doe_n_grid: usize,
    pub fiber_pitch: f64,
    pub doe_manifest: bool,
    pub rust_log: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_device_gds: PathBuf::from("mmi_test_device_fixed.gds"),
            doe_dir: PathBuf::from("mmi_doe_gds"),
            doe_n_grid: 9,
            fiber_pitch: 127.0,
            doe_manifest: false,
            rust_log: "info".to_string(),
        }
    }
}

impl RunConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // .env is optional
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(RunConfig {
            test_device_gds: lookup("MMI_TEST_DEVICE_GDS")
                .map(PathBuf::from)
                .unwrap_or(d.test_device_gds),
            doe_dir: lookup("MMI_DOE_DIR").map(PathBuf::from).unwrap_or(d.doe_dir),
            doe_n_grid: parse_or(&lookup, "MMI_DOE_N_GRID", d.doe_n_grid)?,
            fiber_pitch: parse_or(&lookup, "MMI_FIBER_PITCH", d.fiber_pitch)?,
            doe_manifest: parse_or(&lookup, "MMI_DOE_MANIFEST", d.doe_manifest)?,
            rust_log: lookup("RUST_LOG").unwrap_or(d.rust_log),
        })
    }

    pub fn test_circuit(&self) -> TestCircuitConfig {
        TestCircuitConfig {
            fiber_pitch: self.fiber_pitch,
            ..Default::default()
        }
    }

    pub fn doe(&self) -> DoeConfig {
        DoeConfig {
            write_manifest: self.doe_manifest,
            ..DoeConfig::new(&self.doe_dir, self.doe_n_grid)
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = RunConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.doe().n_grid, 9);
        assert_eq!(cfg.doe().output_dir, PathBuf::from("mmi_doe_gds"));
        assert_eq!(cfg.test_circuit().fiber_pitch, 127.0);
    }

    #[test]
    fn test_overrides() {
        let cfg = RunConfig::from_lookup(lookup(&[
            ("MMI_DOE_N_GRID", "16"),
            ("MMI_FIBER_PITCH", "250"),
            ("MMI_DOE_DIR", "/tmp/doe"),
            ("MMI_DOE_MANIFEST", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.doe_n_grid, 16);
        assert_eq!(cfg.fiber_pitch, 250.0);
        assert!(cfg.doe().write_manifest);
        assert_eq!(cfg.doe().output_dir, PathBuf::from("/tmp/doe"));
    }

    #[test]
    fn test_invalid_value_is_error() {
        let err = RunConfig::from_lookup(lookup(&[("MMI_DOE_N_GRID", "nine")])).unwrap_err();
        assert!(err.to_string().contains("MMI_DOE_N_GRID"));
    }
}
