use clap::Parser;
use eyre::{Context, Result};
use tensor_mpc_common::{
    config::{Config, Opt, ENV_PREFIX},
    tracing::initialize_tracing,
};
use tensor_mpc_cpu::{analysis::sign_leakage, shares::ShareGenerator};
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    initialize_tracing()?;

    info!("Init config");
    let mut config = Config::load_config(ENV_PREFIX)?;
    config.overwrite_defaults_with_cli_args(Opt::parse());
    config.validate()?;
    info!(
        ring_bits = config.ring_bits,
        share_mode = %config.share_mode,
        trials = config.trials,
        "Running sign leakage trials"
    );

    let mut generator = match config.seed {
        Some(seed) => ShareGenerator::seed_from_u64(seed),
        None => ShareGenerator::from_entropy(),
    };
    let report = sign_leakage::run(&config, &mut generator)?;

    println!(
        "Total Trials: {} - Mean Same Sign (same-sign weights): {:.2} ({:.4}) - Mean Same Sign \
         (uniform weights): {:.2} ({:.4})",
        report.trials,
        report.same_sign_weights_output_mean,
        report.same_sign_weights_output_fraction(),
        report.uniform_weights_output_mean,
        report.uniform_weights_output_fraction(),
    );

    if let Some(path) = &config.report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote report");
    }
    Ok(())
}
