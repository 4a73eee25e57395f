use parser::Commands;

use std::process;
use clap::Parser;

#[macro_use]
extern crate log;

/// Parse command line arguments and dispatch the requested subcommand.
fn main() {
    let cli = parser::Cli::parse();
    dispatch(cli, 0);
}

// `from-yaml` resolves into a fresh Cli and re-enters here; `depth` stops a
// yaml file that names another from-yaml run from looping forever.
fn dispatch(cli: parser::Cli, depth: u8) {
    match &cli.commands {
        Commands::Estimate { est } => {
            // ----------------------------- Init logger.
            logger::Logger::init(cli.verbose + u8::from(!cli.quiet));

            // ----------------------------- Run the estimation pipeline.
            if let Err(e) = nedrift_rs::run(&cli, est) {
                error!("{e:?}");
                process::exit(1);
            }
        }
        Commands::FromYaml { yaml } => {
            if depth > 0 {
                eprintln!("Nested from-yaml configurations are not supported");
                process::exit(1);
            }
            match parser::Cli::deserialize(yaml) {
                Ok(restored) => dispatch(restored, depth + 1),
                Err(e) => {
                    eprintln!("Failed to restore arguments from {}: {e}", yaml.display());
                    process::exit(1);
                }
            }
        }
        Commands::Cite => {
            for citation in parser::CITATIONS {
                println!("{citation}\n");
            }
        }
    }
}
