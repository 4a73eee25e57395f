//! Fixed-header genotype format: a four-field header (population count,
//! locus count, highest allele mobility, allele digit width), one locus name
//! per line, then one individual per line as `popname , g g g …`.

use super::{parse_genotype, GenotypeInput, GenotypeReaderError, ReadOptions};

use popgene::{Genotype, LocusSet, PopulationSample};

use std::io::BufRead;

use anyhow::Result;
use located_error::LocatedError;
use log::warn;

struct Header {
    populations  : usize,
    loci         : usize,
    max_mobility : u32,
    digit_width  : usize,
}

pub(super) fn read(source: Box<dyn BufRead + '_>, options: &ReadOptions) -> Result<GenotypeInput> {
    use GenotypeReaderError::{BadHeader, PrematureEof};
    let context = || "While parsing the fixed-header genotype input";

    let mut lines = source.lines().enumerate();
    let mut next_line = || -> Result<(usize, String), GenotypeReaderError> {
        loop {
            match lines.next() {
                None => return Err(PrematureEof("expected more input lines".to_string())),
                Some((index, Err(e))) => {
                    return Err(PrematureEof(format!("I/O failure at line {}: {e}", index + 1)))
                }
                Some((index, Ok(line))) => {
                    if !line.trim().is_empty() {
                        return Ok((index + 1, line))
                    }
                }
            }
        }
    };

    // ---- Header.
    let (_, header_line) = next_line().with_loc(context)?;
    let fields: Vec<&str> = header_line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(BadHeader(format!("expected 4 header fields, found {}", fields.len())))
            .with_loc(context)
    }
    let header = Header {
        populations  : fields[0].parse().map_err(|_| BadHeader(format!("population count '{}'", fields[0]))).with_loc(context)?,
        loci         : fields[1].parse().map_err(|_| BadHeader(format!("locus count '{}'", fields[1]))).with_loc(context)?,
        max_mobility : fields[2].parse().map_err(|_| BadHeader(format!("max mobility '{}'", fields[2]))).with_loc(context)?,
        digit_width  : fields[3].parse().map_err(|_| BadHeader(format!("digit width '{}'", fields[3]))).with_loc(context)?,
    };
    if header.loci == 0 || header.digit_width == 0 {
        return Err(BadHeader("zero locus count or digit width".to_string())).with_loc(context)
    }

    // ---- Locus names, one per line.
    let mut names = Vec::with_capacity(header.loci);
    for _ in 0..header.loci {
        let (_, line) = next_line().with_loc(|| "While reading locus names")?;
        names.push(line.trim().to_string());
    }
    let loci = LocusSet::new(names);

    // ---- Individuals, grouped by population name.
    let mut populations: Vec<PopulationSample> = Vec::new();
    let mut current: Option<(String, PopulationSample, usize)> = None; // (name, sample, ordinal)
    let mut ordinal = 0usize;
    let mut genotypes = Vec::with_capacity(header.loci);

    loop {
        let (line_number, line) = match next_line() {
            Err(_) => break, // regular EOF
            Ok(found) => found,
        };
        let mut tokens = line.split_whitespace();
        let Some(raw_name) = tokens.next() else { continue };
        let pop_name = raw_name.trim_end_matches(',').to_string();

        // Population transition.
        let is_new = current.as_ref().map_or(true, |(name, _, _)| *name != pop_name);
        if is_new {
            if let Some((_, sample, ord)) = current.take() {
                push_finalized(&mut populations, sample, ord, options);
            }
            ordinal += 1;
            current = Some((pop_name.clone(), PopulationSample::new(pop_name, loci.len()), ordinal));
        }

        genotypes.clear();
        for token in tokens {
            if token == "," {
                continue
            }
            genotypes.push(parse_genotype(token, header.digit_width, header.max_mobility, line_number)
                .with_loc(context)?);
        }
        if genotypes.len() != loci.len() {
            return Err(GenotypeReaderError::GenotypeCount {
                line: line_number,
                expected: loci.len(),
                found: genotypes.len(),
            }).with_loc(context)
        }

        let (_, sample, _) = current.as_mut().expect("population opened above");
        ingest_capped(sample, &genotypes, options)?;
    }
    if let Some((_, sample, ord)) = current.take() {
        push_finalized(&mut populations, sample, ord, options);
    }

    if populations.len() != header.populations && options.population_range.is_none() {
        warn!("Header declares {} populations, input contains {}", header.populations, populations.len());
    }
    Ok(GenotypeInput { loci, populations })
}

pub(super) fn push_finalized(
    populations: &mut Vec<PopulationSample>,
    mut sample: PopulationSample,
    ordinal_1based: usize,
    options: &ReadOptions,
) {
    if sample.n() == 0 || !options.keeps_population(ordinal_1based) {
        return
    }
    sample.finalize();
    populations.push(sample);
}

pub(super) fn ingest_capped(sample: &mut PopulationSample, genotypes: &[Genotype], options: &ReadOptions) -> Result<()> {
    if !options.accepts_more(sample.n()) {
        return Ok(())
    }
    sample.ingest(genotypes).loc("While ingesting an individual")
}
