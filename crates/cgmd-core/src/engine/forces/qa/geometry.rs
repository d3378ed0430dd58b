use super::contact::ContactKind;
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use crate::engine::config::QuasiAdiabaticConfig;
use nalgebra::Vector3;
use rayon::prelude::*;

const DEGENERATE_NORM: f64 = 1e-12;

/// Local orientation of a chain at one particle, from its `(i-1, i, i+1)` triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Unit vector along the bend, `(r[i+1] - r[i]) - (r[i] - r[i-1])`.
    pub n: Vector3<f64>,
    /// Unit normal of the plane of the triple.
    pub h: Vector3<f64>,
}

/// Frames for every particle. `None` for particles without a triple or with a straight
/// or collapsed triple.
pub fn frames(state: &State, chains: &Chains) -> Vec<Option<Frame>> {
    (0..state.len())
        .into_par_iter()
        .map(|i| {
            if !chains.has_triple(i) {
                return None;
            }
            let v0 = state.displacement(i, i - 1);
            let v1 = state.displacement(i + 1, i);
            let n = (v1 - v0).try_normalize(DEGENERATE_NORM)?;
            let h = v1.cross(&v0).try_normalize(DEGENERATE_NORM)?;
            Some(Frame { n, h })
        })
        .collect()
}

/// Angular and distance limits of the formation tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub hr_abs_min: f64,
    pub hh_abs_min: f64,
    pub nr_max: f64,
    pub bb_max_dist: f64,
    pub bs_max_dist: f64,
    pub formation_tolerance: f64,
}

impl From<&QuasiAdiabaticConfig> for Thresholds {
    fn from(config: &QuasiAdiabaticConfig) -> Self {
        Self {
            hr_abs_min: config.hr_abs_min,
            hh_abs_min: config.hh_abs_min,
            nr_max: config.nr_max,
            bb_max_dist: config.bb_r_min,
            bs_max_dist: config.bs_r_min * config.formation_tolerance,
            formation_tolerance: config.formation_tolerance,
        }
    }
}

/// Picks the kind of contact a free pair could form, testing backbone-backbone,
/// backbone-sidechain, sidechain-backbone and sidechain-sidechain in that order.
///
/// `unit` points from `i2` to `i1`; `ss_sink_max` is the sidechain well extent of the
/// pair's residue types.
pub fn classify(
    limits: &Thresholds,
    f1: &Frame,
    f2: &Frame,
    unit: &Vector3<f64>,
    norm: f64,
    ss_sink_max: f64,
) -> Option<ContactKind> {
    let cos_h1_r = f1.h.dot(unit);
    let cos_h2_r = f2.h.dot(unit);
    let cos_h1_h2 = f1.h.dot(&f2.h);
    let cos_n1_r = f1.n.dot(unit);
    let cos_n2_r = f2.n.dot(unit);

    let h1_ok = cos_h1_r.abs() >= limits.hr_abs_min;
    let h2_ok = cos_h2_r.abs() >= limits.hr_abs_min;
    let n1_ok = cos_n1_r <= limits.nr_max;
    let n2_ok = -cos_n2_r <= limits.nr_max;

    if h1_ok && h2_ok && cos_h1_h2.abs() >= limits.hh_abs_min && norm <= limits.bb_max_dist {
        Some(ContactKind::BackboneBackbone)
    } else if h1_ok && n2_ok && norm <= limits.bs_max_dist {
        Some(ContactKind::BackboneSidechain)
    } else if n1_ok && h2_ok && norm <= limits.bs_max_dist {
        Some(ContactKind::SidechainBackbone)
    } else if n1_ok && n2_ok && norm <= ss_sink_max * limits.formation_tolerance {
        Some(ContactKind::SidechainSidechain)
    } else {
        None
    }
}
