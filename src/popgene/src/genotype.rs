use std::fmt::{self, Display, Formatter};

/// A diploid genotype at one locus: an ordered pair of allele mobilities.
/// Either both values are > 0 (scored) or both are 0 (missing at this locus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genotype(pub u32, pub u32);

impl Genotype {
    pub const MISSING: Genotype = Genotype(0, 0);

    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn is_homozygote(&self) -> bool {
        !self.is_missing() && self.0 == self.1
    }

    /// Copies of `mobility` carried by this genotype (0, 1 or 2).
    #[must_use]
    pub fn copies_of(&self, mobility: u32) -> u32 {
        u32::from(self.0 == mobility) + u32::from(self.1 == mobility)
    }

    /// Molecular similarity score with another genotype: the number of
    /// matching gene comparisons among the four (allele, allele) pairs.
    /// Ranges over {0, 1, 2, 3, 4}.
    #[must_use]
    pub fn similarity(&self, other: &Genotype) -> u32 {
          u32::from(self.0 == other.0) + u32::from(self.0 == other.1)
        + u32::from(self.1 == other.0) + u32::from(self.1 == other.1)
    }
}

impl Display for Genotype {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}
