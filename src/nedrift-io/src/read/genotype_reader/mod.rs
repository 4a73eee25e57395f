use std::{fs::File, io::{BufRead, BufReader}, path::Path};

use popgene::{Genotype, LocusSet, PopulationSample};

use anyhow::Result;
use located_error::LocatedError;
use log::{info, warn};

pub mod error;
pub use error::{GenotypeReaderError, GENOTYPE_VALID_FILE_FORMATS};

mod fstat;
mod genepop;

/// The two supported genotype text formats.
///
/// - `Fstat`   : fixed header (population count, locus count, highest allele
///               mobility, allele digit width), one locus name per line,
///               then one individual per line.
/// - `Genepop` : free title line, locus names, populations separated by
///               literal `pop` lines; digit width inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenotypeFormat {
    Fstat,
    Genepop,
}

impl GenotypeFormat {
    /// Choose the format from the input file's extension.
    ///
    /// # Errors
    /// - `MissingExtension` when the path carries none.
    /// - `InvalidFileFormat` for an unrecognized extension.
    pub fn from_extension(path: &str) -> Result<GenotypeFormat> {
        use GenotypeReaderError::{InvalidFileFormat, MissingExtension};
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(MissingExtension)
            .loc("While inspecting the genotype file extension")?;
        match extension.to_ascii_lowercase().as_str() {
            "dat"         => Ok(GenotypeFormat::Fstat),
            "gen" | "txt" => Ok(GenotypeFormat::Genepop),
            other         => Err(InvalidFileFormat(other.to_string()))
                .loc("While choosing the genotype file format"),
        }
    }
}

/// Row filters applied while reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Cap on ingested individuals per population; the rest are skipped.
    pub max_individuals : Option<usize>,
    /// 1-based inclusive range of population ordinals to keep.
    pub population_range : Option<(usize, usize)>,
}

impl ReadOptions {
    fn keeps_population(&self, ordinal_1based: usize) -> bool {
        match self.population_range {
            None            => true,
            Some((lo, hi))  => (lo..=hi).contains(&ordinal_1based),
        }
    }

    fn accepts_more(&self, ingested: usize) -> bool {
        self.max_individuals.map_or(true, |cap| ingested < cap)
    }
}

/// Parsed content of one genotype input file: the locus list and one
/// finalized sample per retained population.
#[derive(Debug)]
pub struct GenotypeInput {
    pub loci        : LocusSet,
    pub populations : Vec<PopulationSample>,
}

/// Line-oriented reader over either genotype format.
pub struct GenotypeReader<'a> {
    source  : Box<dyn BufRead + 'a>,
    format  : GenotypeFormat,
    options : ReadOptions,
}

impl<'a> GenotypeReader<'a> {
    /// Open `path`, choosing the format from its extension unless overridden.
    ///
    /// # Errors
    /// `OpenFile` when the path is unreadable; format detection errors as in
    /// [`GenotypeFormat::from_extension`].
    pub fn new(path: &str, format: Option<GenotypeFormat>, options: ReadOptions) -> Result<GenotypeReader<'a>> {
        use GenotypeReaderError::OpenFile;
        let format = match format {
            Some(format) => format,
            None         => GenotypeFormat::from_extension(path)?,
        };
        let file = File::open(path)
            .map_err(|e| OpenFile(path.to_string(), e))
            .loc("While opening the genotype input")?;
        info!("Reading genotype input {path} ({format:?})");
        Ok(GenotypeReader { source: Box::new(BufReader::new(file)), format, options })
    }

    /// Wrap an already-open reader (used by the unit tests).
    #[must_use]
    pub fn from_reader(source: Box<dyn BufRead + 'a>, format: GenotypeFormat, options: ReadOptions) -> GenotypeReader<'a> {
        GenotypeReader { source, format, options }
    }

    /// Consume the input and build the locus set and population samples.
    /// Structural errors (bad header, malformed genotype, premature EOF)
    /// abandon the file.
    pub fn read(self) -> Result<GenotypeInput> {
        let input = match self.format {
            GenotypeFormat::Fstat   => fstat::read(self.source, &self.options),
            GenotypeFormat::Genepop => genepop::read(self.source, &self.options),
        }?;
        if input.populations.is_empty() {
            return Err(GenotypeReaderError::EmptyInput)
                .loc("While validating the parsed genotype input")
        }
        for population in &input.populations {
            info!("{population}");
            if population.has_missing() {
                warn!("Population {} contains missing genotypes: sample-size weighting applies", population.id());
            }
        }
        Ok(input)
    }
}

// Parse one genotype token of 2×`digit_width` digits. A zero allele marks
// the genotype missing, as does a mobility above the declared ceiling.
pub(crate) fn parse_genotype(
    token: &str,
    digit_width: usize,
    max_mobility: u32,
    line: usize,
) -> Result<Genotype, GenotypeReaderError> {
    if token.len() != 2 * digit_width {
        return Err(GenotypeReaderError::GenotypeWidth {
            line,
            token: token.to_string(),
            expected: 2 * digit_width,
        })
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GenotypeReaderError::NonDigit { line, token: token.to_string() })
    }
    let first : u32 = token[..digit_width].parse()
        .map_err(|_| GenotypeReaderError::NonDigit { line, token: token.to_string() })?;
    let second: u32 = token[digit_width..].parse()
        .map_err(|_| GenotypeReaderError::NonDigit { line, token: token.to_string() })?;

    if first == 0 || second == 0 || first > max_mobility || second > max_mobility {
        return Ok(Genotype::MISSING)
    }
    Ok(Genotype(first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_parsing() {
        assert_eq!(parse_genotype("0102", 2, 99, 1).unwrap(), Genotype(1, 2));
        assert_eq!(parse_genotype("120130", 3, 999, 1).unwrap(), Genotype(120, 130));
        // All-zero and half-zero genotypes are missing.
        assert_eq!(parse_genotype("0000", 2, 99, 1).unwrap(), Genotype::MISSING);
        assert_eq!(parse_genotype("0100", 2, 99, 1).unwrap(), Genotype::MISSING);
        // Mobility above the declared ceiling is missing data, not an error.
        assert_eq!(parse_genotype("9901", 2, 50, 1).unwrap(), Genotype::MISSING);
    }

    #[test]
    fn token_width_is_structural() {
        assert!(matches!(
            parse_genotype("010", 2, 99, 7),
            Err(GenotypeReaderError::GenotypeWidth { line: 7, .. })
        ));
        assert!(matches!(
            parse_genotype("01023", 2, 99, 7),
            Err(GenotypeReaderError::GenotypeWidth { .. })
        ));
    }

    #[test]
    fn non_digit_is_structural() {
        assert!(matches!(
            parse_genotype("01a2", 2, 99, 3),
            Err(GenotypeReaderError::NonDigit { line: 3, .. })
        ));
    }

    #[test]
    fn format_dispatch_by_extension() {
        assert_eq!(GenotypeFormat::from_extension("input.dat").unwrap(), GenotypeFormat::Fstat);
        assert_eq!(GenotypeFormat::from_extension("input.gen").unwrap(), GenotypeFormat::Genepop);
        assert_eq!(GenotypeFormat::from_extension("INPUT.GEN").unwrap(), GenotypeFormat::Genepop);
        assert!(GenotypeFormat::from_extension("input.vcf").is_err());
        assert!(GenotypeFormat::from_extension("input").is_err());
    }
}
