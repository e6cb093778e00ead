mod cli_main;

use clap::Parser;
use cli_main::{Cli, Commands};
use kestrel::pipeline::count::{count_database, inspect_database};
use kestrel::{build_cdbg, BuildParams, CountParams, Result};
use std::process;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Count {
            input,
            k,
            output,
            min_count,
            threads,
            buckets,
            temp_dir,
        } => {
            let defaults = CountParams::default();
            let params = CountParams {
                k,
                inputs: input,
                output_path: output,
                min_count,
                thread_count: threads,
                num_buckets: buckets,
                temp_dir: temp_dir.unwrap_or(defaults.temp_dir),
                write_buffer_size: defaults.write_buffer_size,
            };
            let header = count_database(&params)?;
            info!(
                "Wrote {} k-mers to {}",
                header.kmer_count,
                params.output_path.display()
            );
        }

        Commands::Build {
            db,
            k,
            output,
            threads,
            work_dir,
            mph,
            report,
            batch_size,
        } => {
            let defaults = BuildParams::default();
            let params = BuildParams {
                k,
                kmer_db_path: db,
                thread_count: threads,
                output_path: output,
                working_dir: work_dir.unwrap_or(defaults.working_dir),
                mph_file_path: mph,
                report_path: report,
                batch_size,
            };
            build_cdbg(&params)?;
        }

        Commands::Inspect { db } => {
            let header = inspect_database(&db)?;
            println!("{}", serde_json::to_string_pretty(&header)?);
        }
    }

    Ok(())
}

fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install the log subscriber: {}", e);
    }

    let cli = Cli::parse();
    let start = std::time::Instant::now();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    info!("Done in {:.2}s", start.elapsed().as_secs_f32());
}
