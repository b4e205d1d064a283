use anyhow::{bail, Context, Result};
use archiver_app::cli::Cli;
use archiver_app::config::ArchiverConfig;
use archiver_engine::{LogProgressSink, SiteArchiver};
use clap::Parser;
use engine_logging::{engine_error, engine_info};

fn main() -> Result<()> {
    let cli = Cli::parse();
    engine_logging::initialize(cli.log_destination(), cli.log_level(), &cli.log_file);

    let config = ArchiverConfig::load(&cli.config)?;
    let sites = config.select(cli.site.as_deref())?;
    let settings = config.fetch.settings();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let mut failed = Vec::new();
    for entry in sites {
        let mut site = entry.to_site_config();
        if cli.no_publish {
            site.publish = false;
        }

        let archiver = match SiteArchiver::new(site, &settings) {
            Ok(archiver) => archiver,
            Err(err) => {
                engine_error!("Skipping {}: {}", entry.name, err);
                failed.push(entry.name.clone());
                continue;
            }
        };

        match runtime.block_on(archiver.run_pass(&LogProgressSink)) {
            Ok(report) => {
                for line in report.summary_lines() {
                    println!("{line}");
                }
                engine_info!("Finished {}", entry.name);
            }
            Err(err) => {
                engine_error!("Pass for {} aborted: {}", entry.name, err);
                failed.push(entry.name.clone());
            }
        }
    }

    if !failed.is_empty() {
        bail!("archiving failed for: {}", failed.join(", "));
    }
    Ok(())
}
