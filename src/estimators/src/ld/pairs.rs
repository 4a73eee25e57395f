use crate::EstimatorError;

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Result;
use log::debug;
use memmap2::Mmap;

/// Summary of one locus pair after the Burrows pass. Fixed-size so that the
/// scratch store can spill to a flat memory-mapped file.
///
/// - `p`, `q`        : locus indices, p < q.
/// - `n`             : jointly scored individuals.
/// - `weight_base`   : K(p)·K(q), the independent-allele product.
/// - `r2`            : mean Burrows r² over retained allele pairs.
/// - `exp_r2`        : E[r² | n] under drift-free sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairRecord {
    pub p           : u32,
    pub q           : u32,
    pub n           : u32,
    pub weight_base : f64,
    pub r2          : f64,
    pub exp_r2      : f64,
}

impl PairRecord {
    pub const ENCODED_SIZE: usize = 36;

    fn encode(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut bytes = [0u8; Self::ENCODED_SIZE];
        bytes[0..4].copy_from_slice(&self.p.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.q.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.n.to_le_bytes());
        bytes[12..20].copy_from_slice(&self.weight_base.to_le_bytes());
        bytes[20..28].copy_from_slice(&self.r2.to_le_bytes());
        bytes[28..36].copy_from_slice(&self.exp_r2.to_le_bytes());
        bytes
    }

    fn decode(bytes: &[u8]) -> PairRecord {
        let u32_at = |offset: usize| u32::from_le_bytes(bytes[offset..offset + 4].try_into().expect("4-byte slice"));
        let f64_at = |offset: usize| f64::from_le_bytes(bytes[offset..offset + 8].try_into().expect("8-byte slice"));
        PairRecord {
            p           : u32_at(0),
            q           : u32_at(4),
            n           : u32_at(8),
            weight_base : f64_at(12),
            r2          : f64_at(20),
            exp_r2      : f64_at(28),
        }
    }

    /// Pair weight under the current weighting scheme: K(p)·K(q)·n² when the
    /// sample carries missing data, K(p)·K(q) otherwise.
    #[must_use]
    pub fn weight(&self, has_missing: bool) -> f64 {
        if has_missing {
            self.weight_base * f64::from(self.n) * f64::from(self.n)
        } else {
            self.weight_base
        }
    }
}

/// Scratch store for the per-pair records, sized O(locus-pairs).
///
/// Records accumulate in memory up to `threshold`, then the store migrates
/// to an anonymous temporary file which is memory-mapped for the re-reading
/// passes (re-weighting, CI, dump). The backing choice is opaque to callers.
pub struct PairStore {
    mem       : Vec<PairRecord>,
    spill     : Option<BufWriter<File>>,
    spilled   : usize,
    threshold : usize,
    pop_id    : String,
}

impl PairStore {
    #[must_use]
    pub fn new(threshold: usize, pop_id: &str) -> PairStore {
        PairStore {
            mem       : Vec::new(),
            spill     : None,
            spilled   : 0,
            threshold : threshold.max(1),
            pop_id    : pop_id.to_string(),
        }
    }

    pub fn push(&mut self, record: PairRecord) -> Result<()> {
        if self.spill.is_none() && self.mem.len() >= self.threshold {
            self.start_spill()?;
        }
        match &mut self.spill {
            Some(writer) => {
                writer.write_all(&record.encode())
                    .map_err(|e| EstimatorError::PairStoreAllocation(self.pop_id.clone(), e))?;
                self.spilled += 1;
            }
            None => self.mem.push(record),
        }
        Ok(())
    }

    fn start_spill(&mut self) -> Result<()> {
        debug!("Locus-pair store for population {} exceeded {} records: spilling to a temporary file",
               self.pop_id, self.threshold);
        let file = tempfile::tempfile()
            .map_err(|e| EstimatorError::PairStoreAllocation(self.pop_id.clone(), e))?;
        let mut writer = BufWriter::new(file);
        for record in self.mem.drain(..) {
            writer.write_all(&record.encode())
                .map_err(|e| EstimatorError::PairStoreAllocation(self.pop_id.clone(), e))?;
            self.spilled += 1;
        }
        self.spill = Some(writer);
        Ok(())
    }

    /// Seal the store and expose the records for iteration.
    pub fn finish(self) -> Result<FinishedPairStore> {
        match self.spill {
            None => Ok(FinishedPairStore::Memory(self.mem)),
            Some(writer) => {
                let file = writer.into_inner()
                    .map_err(|e| EstimatorError::PairStoreAllocation(self.pop_id.clone(), e.into_error()))?;
                // Safety: the anonymous temp file is exclusively owned here
                // and never written to again.
                let map = unsafe { Mmap::map(&file) }
                    .map_err(|e| EstimatorError::PairStoreAllocation(self.pop_id.clone(), e))?;
                Ok(FinishedPairStore::Mapped { map, count: self.spilled, _file: file })
            }
        }
    }
}

/// Sealed pair store; iteration decodes records straight out of either
/// backing.
pub enum FinishedPairStore {
    Memory(Vec<PairRecord>),
    Mapped { map: Mmap, count: usize, _file: File },
}

impl FinishedPairStore {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            FinishedPairStore::Memory(records)  => records.len(),
            FinishedPairStore::Mapped { count, .. } => *count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = PairRecord> + '_> {
        match self {
            FinishedPairStore::Memory(records) => Box::new(records.iter().copied()),
            FinishedPairStore::Mapped { map, count, .. } => {
                Box::new((0..*count).map(move |i| {
                    let offset = i * PairRecord::ENCODED_SIZE;
                    PairRecord::decode(&map[offset..offset + PairRecord::ENCODED_SIZE])
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(p: u32, q: u32) -> PairRecord {
        PairRecord { p, q, n: 40, weight_base: 4.0, r2: 0.031, exp_r2: 0.027 }
    }

    #[test]
    fn roundtrip_encoding() {
        let original = record(3, 7);
        let decoded  = PairRecord::decode(&original.encode());
        assert_eq!(original, decoded);
    }

    #[test]
    fn memory_backing_below_threshold() -> Result<()> {
        let mut store = PairStore::new(10, "pop1");
        for i in 0..5 {
            store.push(record(i, i + 1))?;
        }
        let finished = store.finish()?;
        assert!(matches!(finished, FinishedPairStore::Memory(_)));
        assert_eq!(finished.len(), 5);
        assert_eq!(finished.iter().count(), 5);
        Ok(())
    }

    #[test]
    fn spill_backing_past_threshold() -> Result<()> {
        let mut store = PairStore::new(4, "pop1");
        for i in 0..12 {
            store.push(record(i, i + 1))?;
        }
        let finished = store.finish()?;
        assert!(matches!(finished, FinishedPairStore::Mapped { .. }));
        assert_eq!(finished.len(), 12);

        let decoded: Vec<PairRecord> = finished.iter().collect();
        assert_eq!(decoded[7], record(7, 8));
        Ok(())
    }

    #[test]
    fn weights_toggle_on_missing_data() {
        let rec = record(0, 1);
        assert_eq!(rec.weight(false), 4.0);
        assert_eq!(rec.weight(true), 4.0 * 1600.0);
    }
}
