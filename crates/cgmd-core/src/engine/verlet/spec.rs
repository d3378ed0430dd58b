/// Requirements one nonlocal interaction places on the shared pair list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionSpec {
    pub cutoff_sq: f64,
    pub min_bond_sep: usize,
}

impl InteractionSpec {
    pub fn new(cutoff: f64, min_bond_sep: usize) -> Self {
        Self {
            cutoff_sq: cutoff * cutoff,
            min_bond_sep,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff_sq.sqrt()
    }

    /// The least restrictive spec satisfying both: the larger cutoff and the smaller
    /// minimum separation.
    pub fn merge(self, other: InteractionSpec) -> InteractionSpec {
        InteractionSpec {
            cutoff_sq: self.cutoff_sq.max(other.cutoff_sq),
            min_bond_sep: self.min_bond_sep.min(other.min_bond_sep),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_largest_cutoff_and_smallest_separation() {
        let a = InteractionSpec::new(5.0, 2);
        let b = InteractionSpec::new(18.0, 3);
        let merged = a.merge(b);
        assert_eq!(merged.cutoff(), 18.0);
        assert_eq!(merged.min_bond_sep, 2);
        assert_eq!(merged, b.merge(a));
    }

    #[test]
    fn merge_is_idempotent() {
        let a = InteractionSpec::new(7.5, 3);
        assert_eq!(a.merge(a), a);
    }
}
