//! Chromosome/locus map file: one `<chromosome-name> <locus-name>` pair per
//! line. Loci absent from the map land in a synthetic "unknown" chromosome,
//! so that chromosome-grouped LD runs never silently drop them.

use popgene::{ChromosomeId, LocusSet, UNKNOWN_CHROMOSOME};

use std::{fs::File, io::{BufRead, BufReader}};

use ahash::AHashMap;
use anyhow::Result;
use located_error::LocatedError;
use log::{info, warn};
use thiserror::Error;

pub const UNKNOWN_CHROMOSOME_NAME: &str = "unknown";

#[derive(Error, Debug)]
pub enum ChromosomeMapError {
    #[error("Failed to open chromosome map file {0}")]
    OpenFile(String, #[source] std::io::Error),

    #[error("Line {0}: expected '<chromosome> <locus>', found '{1}'")]
    BadLine(usize, String),
}

/// Parsed chromosome map: an interned chromosome-name table plus the
/// locus-name → chromosome assignment.
#[derive(Debug, Default)]
pub struct ChromosomeMap {
    names     : Vec<String>,
    by_locus  : AHashMap<String, ChromosomeId>,
}

impl ChromosomeMap {
    /// Read a map file.
    ///
    /// # Errors
    /// `OpenFile` / `BadLine` on an unreadable file or a malformed line.
    pub fn read(path: &str) -> Result<ChromosomeMap> {
        use ChromosomeMapError::{BadLine, OpenFile};
        let file = File::open(path)
            .map_err(|e| OpenFile(path.to_string(), e))
            .loc("While opening the chromosome map")?;

        let mut map = ChromosomeMap::default();
        let mut ids: AHashMap<String, ChromosomeId> = AHashMap::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.loc("While reading the chromosome map")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue
            }
            let mut fields = trimmed.split_whitespace();
            let (Some(chromosome), Some(locus)) = (fields.next(), fields.next()) else {
                return Err(BadLine(index + 1, line.clone()))
                    .loc("While parsing the chromosome map")
            };
            let id = *ids.entry(chromosome.to_string()).or_insert_with(|| {
                map.names.push(chromosome.to_string());
                (map.names.len() - 1) as ChromosomeId
            });
            if map.by_locus.insert(locus.to_string(), id).is_some() {
                warn!("Locus {locus} listed twice in the chromosome map; keeping the later assignment");
            }
        }
        info!("Chromosome map: {} chromosomes, {} mapped loci", map.names.len(), map.by_locus.len());
        Ok(map)
    }

    /// Stamp every locus with its chromosome; unmapped loci go to the
    /// synthetic unknown chromosome.
    pub fn assign(&self, loci: &mut LocusSet) {
        let mut unmapped = 0usize;
        for locus in loci.get_mut() {
            locus.chromosome = Some(match self.by_locus.get(&locus.name) {
                Some(&id) => id,
                None      => { unmapped += 1; UNKNOWN_CHROMOSOME }
            });
        }
        if unmapped > 0 {
            warn!("{unmapped} loci missing from the chromosome map were assigned to '{UNKNOWN_CHROMOSOME_NAME}'");
        }
    }

    /// Printable chromosome name for an id.
    #[must_use]
    pub fn name(&self, id: ChromosomeId) -> &str {
        if id == UNKNOWN_CHROMOSOME {
            UNKNOWN_CHROMOSOME_NAME
        } else {
            self.names.get(id as usize).map_or(UNKNOWN_CHROMOSOME_NAME, String::as_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_map(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn assigns_listed_and_unknown_loci() -> Result<()> {
        let file = write_map("chr1 LocusA\nchr1 LocusB\nchr2 LocusC\n");
        let map = ChromosomeMap::read(file.path().to_str().unwrap())?;

        let mut loci = LocusSet::new(["LocusA", "LocusC", "LocusX"].map(String::from));
        map.assign(&mut loci);

        let chr = |i: usize| loci.get()[i].chromosome.unwrap();
        assert_ne!(chr(0), chr(1)); // chr1 vs chr2
        assert_eq!(chr(2), UNKNOWN_CHROMOSOME);
        assert_eq!(map.name(chr(0)), "chr1");
        assert_eq!(map.name(chr(2)), UNKNOWN_CHROMOSOME_NAME);
        Ok(())
    }

    #[test]
    fn malformed_line_is_fatal() {
        let file = write_map("chr1 LocusA\njust-one-field\n");
        assert!(ChromosomeMap::read(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn comments_and_blanks_are_skipped() -> Result<()> {
        let file = write_map("# header\n\nchr1 LocusA\n");
        let map = ChromosomeMap::read(file.path().to_str().unwrap())?;
        let mut loci = LocusSet::new(["LocusA".to_string()]);
        map.assign(&mut loci);
        assert_eq!(map.name(loci.get()[0].chromosome.unwrap()), "chr1");
        Ok(())
    }
}
