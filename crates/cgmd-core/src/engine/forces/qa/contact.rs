use crate::engine::verlet::Pair;

/// Which part of each residue takes part in a contact; the first word names particle `i1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContactKind {
    BackboneBackbone,
    BackboneSidechain,
    SidechainBackbone,
    SidechainSidechain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactStatus {
    /// Strength ramps up from zero over the formation time.
    Forming,
    /// Strength ramps down to zero over the breaking time.
    Breaking,
    /// Ramp finished; the contact no longer acts and is dropped at the next commit.
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub i1: usize,
    pub i2: usize,
    pub kind: ContactKind,
    pub status: ContactStatus,
    /// Time of the last status change, shifted so the ramp is continuous.
    pub t0: f64,
}

impl Contact {
    pub fn forming(i1: usize, i2: usize, kind: ContactKind, t: f64) -> Self {
        Self {
            i1,
            i2,
            kind,
            status: ContactStatus::Forming,
            t0: t,
        }
    }

    #[inline]
    pub fn key(&self) -> Pair {
        (self.i1, self.i2)
    }

    pub fn is_active(&self) -> bool {
        self.status != ContactStatus::Removed
    }

    /// Fraction of full strength at time `t`, in `[0, 1]`.
    pub fn stage(&self, t: f64, formation_time: f64, breaking_time: f64) -> f64 {
        match self.status {
            ContactStatus::Forming => ((t - self.t0) / formation_time).clamp(0.0, 1.0),
            ContactStatus::Breaking => (1.0 - (t - self.t0) / breaking_time).clamp(0.0, 1.0),
            ContactStatus::Removed => 0.0,
        }
    }

    /// Switches to `Breaking` so that the ramp down starts from the current `stage`.
    pub fn begin_breaking(&mut self, t: f64, stage: f64, breaking_time: f64) {
        self.status = ContactStatus::Breaking;
        self.t0 = t - (1.0 - stage) * breaking_time;
    }
}

/// A pair eligible for contact formation. `taken` is set once a contact is committed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreePair {
    pub i1: usize,
    pub i2: usize,
    pub taken: bool,
}

impl FreePair {
    pub fn new(i1: usize, i2: usize) -> Self {
        Self {
            i1,
            i2,
            taken: false,
        }
    }
}
