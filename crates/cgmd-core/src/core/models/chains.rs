use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainLayoutError {
    #[error("Chain {index} spans {start}..{end}, which is empty or reversed")]
    EmptyChain {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("Chain {index} ends at {end}, past the last particle ({num_particles})")]
    OutOfBounds {
        index: usize,
        end: usize,
        num_particles: usize,
    },
    #[error("Chain {index} overlaps a previous chain at particle {particle}")]
    Overlap { index: usize, particle: usize },
}

/// Chain membership of every particle, and the along-chain relations derived from it.
///
/// Particles are indexed densely and every chain is a contiguous index range. A particle
/// that belongs to no chain behaves as a chain of its own: it is terminal, has no
/// bonds and no triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chains {
    chain_idx: Vec<Option<usize>>,
    is_terminal: Vec<bool>,
    has_bond: Vec<bool>,
    has_triple: Vec<bool>,
    ranges: Vec<Range<usize>>,
}

impl Chains {
    pub fn new(num_particles: usize, ranges: Vec<Range<usize>>) -> Result<Self, ChainLayoutError> {
        let mut chain_idx = vec![None; num_particles];
        let mut is_terminal = vec![true; num_particles];
        let mut has_bond = vec![false; num_particles];
        let mut has_triple = vec![false; num_particles];

        for (index, range) in ranges.iter().enumerate() {
            if range.start >= range.end {
                return Err(ChainLayoutError::EmptyChain {
                    index,
                    start: range.start,
                    end: range.end,
                });
            }
            if range.end > num_particles {
                return Err(ChainLayoutError::OutOfBounds {
                    index,
                    end: range.end,
                    num_particles,
                });
            }
            for i in range.clone() {
                if chain_idx[i].is_some() {
                    return Err(ChainLayoutError::Overlap { index, particle: i });
                }
                chain_idx[i] = Some(index);
                is_terminal[i] = i == range.start || i + 1 == range.end;
                has_bond[i] = i + 1 < range.end;
                has_triple[i] = i > range.start && i + 1 < range.end;
            }
        }

        Ok(Self {
            chain_idx,
            is_terminal,
            has_bond,
            has_triple,
            ranges,
        })
    }

    /// A single chain covering every particle.
    pub fn single(num_particles: usize) -> Self {
        let ranges = if num_particles > 0 {
            vec![0..num_particles]
        } else {
            vec![]
        };
        // A lone covering range can never fail validation.
        Self::new(num_particles, ranges).unwrap_or_else(|_| Self::unchained(num_particles))
    }

    /// Every particle is its own chain.
    pub fn unchained(num_particles: usize) -> Self {
        Self {
            chain_idx: vec![None; num_particles],
            is_terminal: vec![true; num_particles],
            has_bond: vec![false; num_particles],
            has_triple: vec![false; num_particles],
            ranges: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.chain_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain_idx.is_empty()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    #[inline]
    pub fn chain_of(&self, i: usize) -> Option<usize> {
        self.chain_idx[i]
    }

    /// `true` if `i` is the first or last member of its chain (and thus lacks a neighbour).
    #[inline]
    pub fn is_terminal(&self, i: usize) -> bool {
        self.is_terminal[i]
    }

    /// `true` if `(i, i+1)` both lie in one chain.
    #[inline]
    pub fn has_bond(&self, i: usize) -> bool {
        self.has_bond[i]
    }

    /// `true` if `(i-1, i, i+1)` all lie in one chain.
    #[inline]
    pub fn has_triple(&self, i: usize) -> bool {
        self.has_triple[i]
    }

    /// `true` if `i` and `j` lie in different chains, or are at least `n` bonds apart
    /// within one chain.
    #[inline]
    pub fn sep_by_at_least(&self, i: usize, j: usize, n: usize) -> bool {
        let same_chain = match (self.chain_idx[i], self.chain_idx[j]) {
            (Some(a), Some(b)) => a == b,
            _ => i == j,
        };
        !same_chain || i.abs_diff(j) >= n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chains() -> Chains {
        Chains::new(7, vec![0..4, 4..7]).unwrap()
    }

    #[test]
    fn terminal_flags_mark_chain_ends() {
        let chains = two_chains();
        let terminal: Vec<bool> = (0..7).map(|i| chains.is_terminal(i)).collect();
        assert_eq!(terminal, vec![true, false, false, true, true, false, true]);
    }

    #[test]
    fn triples_exclude_chain_ends() {
        let chains = two_chains();
        let triples: Vec<bool> = (0..7).map(|i| chains.has_triple(i)).collect();
        assert_eq!(
            triples,
            vec![false, true, true, false, false, true, false]
        );
    }

    #[test]
    fn bonds_do_not_cross_chain_boundaries() {
        let chains = two_chains();
        assert!(chains.has_bond(2));
        assert!(!chains.has_bond(3));
        assert!(chains.has_bond(4));
        assert!(!chains.has_bond(6));
    }

    #[test]
    fn separation_is_unconditional_across_chains() {
        let chains = two_chains();
        assert!(chains.sep_by_at_least(3, 4, 3));
        assert!(!chains.sep_by_at_least(0, 2, 3));
        assert!(chains.sep_by_at_least(0, 3, 3));
    }

    #[test]
    fn unchained_particles_are_always_separated_from_others() {
        let chains = Chains::new(5, vec![0..3]).unwrap();
        assert_eq!(chains.chain_of(4), None);
        assert!(chains.sep_by_at_least(3, 4, 10));
        assert!(chains.is_terminal(4));
        assert!(!chains.has_triple(3));
    }

    #[test]
    fn rejects_overlapping_chains() {
        let err = Chains::new(6, vec![0..4, 3..6]).unwrap_err();
        assert_eq!(err, ChainLayoutError::Overlap { index: 1, particle: 3 });
    }

    #[test]
    fn rejects_chains_past_the_particle_count() {
        let err = Chains::new(3, vec![0..4]).unwrap_err();
        assert!(matches!(err, ChainLayoutError::OutOfBounds { .. }));
    }

    #[test]
    fn rejects_empty_chains() {
        let err = Chains::new(3, vec![2..2]).unwrap_err();
        assert!(matches!(err, ChainLayoutError::EmptyChain { .. }));
    }

    #[test]
    fn single_chain_covers_all_particles() {
        let chains = Chains::single(12);
        assert_eq!(chains.ranges(), &[0..12]);
        assert!(chains.sep_by_at_least(0, 3, 3));
        assert!(!chains.sep_by_at_least(5, 7, 3));
    }
}
