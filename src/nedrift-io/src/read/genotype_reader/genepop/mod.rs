//! `pop`-separated genotype format: a free title line, locus names (one per
//! line or comma-separated), then per-population blocks opened by a literal
//! `pop` line with one `name , g g …` individual per line. The allele digit
//! width is inferred from the first genotype token and must stay uniform.

use super::fstat::{ingest_capped, push_finalized};
use super::{parse_genotype, GenotypeInput, GenotypeReaderError, ReadOptions};

use popgene::{Genotype, LocusSet, PopulationSample};

use std::io::BufRead;

use anyhow::Result;
use located_error::LocatedError;

// A population separator: `pop`, case-insensitive, possibly followed by junk.
fn is_pop_separator(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.len() < 3 || !trimmed[..3].eq_ignore_ascii_case("pop") {
        return false
    }
    trimmed[3..].chars().next().map_or(true, |c| !c.is_ascii_alphanumeric())
}

pub(super) fn read(source: Box<dyn BufRead + '_>, options: &ReadOptions) -> Result<GenotypeInput> {
    use GenotypeReaderError::{GenotypeCount, PrematureEof};
    let context = || "While parsing the pop-separated genotype input";

    let mut lines = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line = line
            .map_err(|e| PrematureEof(format!("I/O failure at line {}: {e}", index + 1)))
            .with_loc(context)?;
        lines.push(line);
    }
    let mut cursor = lines.iter().enumerate();

    // ---- Title line.
    cursor.next().ok_or(PrematureEof("empty input".to_string())).with_loc(context)?;

    // ---- Locus names, up to the first separator.
    let mut names: Vec<String> = Vec::new();
    let mut saw_separator = false;
    for (_, line) in cursor.by_ref() {
        if is_pop_separator(line) {
            saw_separator = true;
            break
        }
        if line.trim().is_empty() {
            continue
        }
        names.extend(line.split(',').map(|name| name.trim().to_string()).filter(|name| !name.is_empty()));
    }
    if !saw_separator || names.is_empty() {
        return Err(PrematureEof("no population separator after the locus names".to_string()))
            .with_loc(context)
    }
    let loci = LocusSet::new(names);

    // ---- Population blocks.
    let mut populations: Vec<PopulationSample> = Vec::new();
    let mut current: Option<(PopulationSample, usize)> = None;
    let mut ordinal = 1usize; // the separator consumed above opened block 1
    let mut digit_width: Option<usize> = None;
    let mut genotypes: Vec<Genotype> = Vec::with_capacity(loci.len());

    for (index, line) in cursor {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue
        }
        if is_pop_separator(line) {
            if let Some((sample, ord)) = current.take() {
                push_finalized(&mut populations, sample, ord, options);
            }
            ordinal += 1;
            continue
        }

        // `name , g g g` — the comma terminates the sample name.
        let (name, data) = match line.split_once(',') {
            Some((name, data)) => (name.trim(), data),
            None => {
                let mut split = line.splitn(2, char::is_whitespace);
                let name = split.next().unwrap_or_default().trim();
                (name, split.next().unwrap_or_default())
            }
        };

        genotypes.clear();
        for token in data.split_whitespace() {
            let width = match digit_width {
                Some(width) => width,
                None => {
                    let inferred = infer_digit_width(token, line_number).with_loc(context)?;
                    digit_width = Some(inferred);
                    inferred
                }
            };
            let max_mobility = 10u32.pow(width as u32) - 1;
            genotypes.push(parse_genotype(token, width, max_mobility, line_number).with_loc(context)?);
        }
        if genotypes.len() != loci.len() {
            return Err(GenotypeCount { line: line_number, expected: loci.len(), found: genotypes.len() })
                .with_loc(context)
        }

        // The first individual of a block names the population.
        if current.is_none() {
            current = Some((PopulationSample::new(name, loci.len()), ordinal));
        }
        let (sample, _) = current.as_mut().expect("population opened above");
        ingest_capped(sample, &genotypes, options)?;
    }
    if let Some((sample, ord)) = current.take() {
        push_finalized(&mut populations, sample, ord, options);
    }

    Ok(GenotypeInput { loci, populations })
}

// The digit width is half the first token's length; only 2- and 3-digit
// alleles (and the degenerate 1-digit case) are representable.
fn infer_digit_width(token: &str, line: usize) -> Result<usize, GenotypeReaderError> {
    match token.len() {
        2 => Ok(1),
        4 => Ok(2),
        6 => Ok(3),
        _ => Err(GenotypeReaderError::GenotypeWidth { line, token: token.to_string(), expected: 4 }),
    }
}
