use super::contact::{Contact, FreePair};
use super::valence::{Valence, ValenceTable};

/// A contact proposed by the parallel phase, not yet charged against any counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationCandidate {
    pub contact: Contact,
    /// Index of the originating entry in the free-pair list.
    pub free_pair: usize,
    pub deltas: [Valence; 2],
}

/// Applies candidates in ascending `(i1, i2)` order, so the outcome does not depend on the
/// order in which workers produced them. A candidate is dropped if its free pair was taken
/// or if the counters can no longer afford it.
pub fn commit(
    mut candidates: Vec<FormationCandidate>,
    valence: &mut ValenceTable,
    free_pairs: &mut [FreePair],
) -> Vec<Contact> {
    candidates.sort_unstable_by_key(|candidate| candidate.contact.key());

    let mut committed = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let free = &mut free_pairs[candidate.free_pair];
        if free.taken {
            continue;
        }
        let Contact { i1, i2, .. } = candidate.contact;
        if valence.try_apply(i1, i2, &candidate.deltas) {
            free.taken = true;
            committed.push(candidate.contact);
        }
    }
    committed
}
