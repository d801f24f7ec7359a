//! MMI layout run: default MMI, its fiber test circuit, and the DOE sweep.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mmi_layout::{generate_doe_gds, mmi_2x2, test_circuit_mmi, write_gds, MmiConfig, RunConfig};

fn main() -> Result<()> {
    let config = RunConfig::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("mmi_layout={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mmi_layout v{}", env!("CARGO_PKG_VERSION"));

    let mmi = mmi_2x2(&MmiConfig::default()).context("building default MMI")?;
    let tc = test_circuit_mmi(Arc::new(mmi), &config.test_circuit())
        .context("building MMI test circuit")?;
    write_gds(&tc, &config.test_device_gds)
        .with_context(|| format!("writing {}", config.test_device_gds.display()))?;
    println!("Wrote {}", config.test_device_gds.display());

    let doe = config.doe();
    let report = generate_doe_gds(&doe)
        .with_context(|| format!("DOE sweep into {}", doe.output_dir.display()))?;
    println!("Total designs: {}", report.total());

    Ok(())
}
