use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

/// Builder over a complete estimation run against an on-disk fixture.
pub struct EstimateRunnerBuilder {
    input_name : String,
    input      : String,
    configure  : Box<dyn FnOnce(&mut parser::Estimate)>,
}

impl EstimateRunnerBuilder {
    pub fn new() -> EstimateRunnerBuilder {
        EstimateRunnerBuilder {
            input_name : String::from("fixture.dat"),
            input      : String::new(),
            configure  : Box::new(|_| {}),
        }
    }

    /// File name of the genotype fixture (the extension drives the format).
    pub fn input_name(mut self, name: &str) -> Self {
        self.input_name = name.to_string();
        self
    }

    /// Raw content of the genotype fixture.
    pub fn input(mut self, content: &str) -> Self {
        self.input = content.to_string();
        self
    }

    /// Adjust the estimate arguments before the run.
    pub fn configure(mut self, configure: impl FnOnce(&mut parser::Estimate) + 'static) -> Self {
        self.configure = Box::new(configure);
        self
    }

    pub fn build(self) -> Result<EstimateRunner> {
        let dir = TempDir::new()?;
        let input_path = dir.path().join(&self.input_name);
        fs::write(&input_path, &self.input)?;

        let mut est = parser::Estimate {
            input      : input_path.to_string_lossy().into_owned(),
            output_dir : dir.path().join("output"),
            ..Default::default()
        };
        (self.configure)(&mut est);

        let stem = input_path.file_stem().expect("fixture has a stem").to_string_lossy().into_owned();
        Ok(EstimateRunner { dir, est, stem })
    }
}

pub struct EstimateRunner {
    dir  : TempDir,
    est  : parser::Estimate,
    stem : String,
}

impl EstimateRunner {
    pub fn run(&self) -> Result<()> {
        let cli = parser::Cli {
            verbose  : 0,
            quiet    : true,
            commands : parser::Commands::Estimate { est: Box::new(self.est.clone()) },
        };
        nedrift_rs::run(&cli, &self.est)
    }

    pub fn output_file(&self, suffix: &str) -> PathBuf {
        self.dir.path().join("output").join(format!("{}-{suffix}", self.stem))
    }

    pub fn report(&self) -> Result<String> {
        Ok(fs::read_to_string(self.output_file("ne.txt"))?)
    }
}
