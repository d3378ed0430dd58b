use super::config::{IntegratorConfig, LangevinConfig};
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::models::state::State;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// Leapfrog integrator in kick-drift form: velocities live at half steps.
///
/// `v(t + dt/2) = v(t - dt/2) + a(t) dt`, then `r(t + dt) = r(t) + v(t + dt/2) dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leapfrog {
    dt: f64,
}

impl Leapfrog {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Advances `state` by one step under the forces in `dynamics`.
    pub fn step(&self, state: &mut State, dynamics: &Dynamics) {
        let dt = self.dt;
        state
            .positions
            .par_iter_mut()
            .zip(state.velocities.par_iter_mut())
            .zip(state.accelerations.par_iter_mut())
            .zip(dynamics.forces.par_iter())
            .zip(state.masses.par_iter())
            .for_each(|((((r, v), a), f), &m)| {
                *a = f / m;
                *v += *a * dt;
                *r += *v * dt;
            });
        state.t += dt;
    }
}

/// Gear corrector weights of a fifth-order predictor-corrector for second-order equations.
const GEAR_CORRECTOR: [f64; 6] = [
    3.0 / 16.0,
    251.0 / 360.0,
    1.0,
    11.0 / 18.0,
    1.0 / 6.0,
    1.0 / 60.0,
];

/// Scaled derivatives `y[k] = dt^k / k! * d^k r / dt^k` of one particle.
type Derivatives = [Vector3<f64>; 6];

/// Fifth-order Gear predictor-corrector coupled to a Langevin bath.
///
/// Each step adds friction `-gamma v` to the force and a Gaussian velocity kick of
/// variance `2 gamma T dt / m^2`. Noise is drawn sequentially from one seeded generator,
/// so a run is reproducible for any number of worker threads.
#[derive(Debug, Clone)]
pub struct LangevinPredictorCorrector {
    dt: f64,
    gamma: f64,
    temperature: f64,
    rng: StdRng,
    y: Vec<Derivatives>,
    noise: Vec<Vector3<f64>>,
    initialized: bool,
}

impl LangevinPredictorCorrector {
    pub fn new(dt: f64, config: &LangevinConfig, state: &State) -> Self {
        let y = state
            .positions
            .iter()
            .zip(&state.velocities)
            .map(|(r, v)| {
                let mut y = [Vector3::zeros(); 6];
                y[0] = *r;
                y[1] = v * dt;
                y
            })
            .collect();
        Self {
            dt,
            gamma: config.gamma,
            temperature: config.temperature,
            rng: StdRng::seed_from_u64(config.seed),
            y,
            noise: vec![Vector3::zeros(); state.len()],
            initialized: false,
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    fn generate_noise(&mut self) {
        let rng = &mut self.rng;
        for xi in &mut self.noise {
            *xi = Vector3::from_fn(|_, _| rng.sample(StandardNormal));
        }
    }

    pub fn step(&mut self, state: &mut State, dynamics: &Dynamics) {
        let dt = self.dt;
        let half_dt2 = dt * dt / 2.0;

        if !self.initialized {
            for ((y, f), &m) in self.y.iter_mut().zip(&dynamics.forces).zip(&state.masses) {
                y[2] = f / m * half_dt2;
            }
            self.initialized = true;
        }
        self.generate_noise();

        let noise_scale = (2.0 * self.temperature * self.gamma * dt).sqrt() * dt;
        let friction = self.gamma / dt;

        self.y
            .par_iter_mut()
            .zip(self.noise.par_iter())
            .zip(dynamics.forces.par_iter())
            .zip(state.masses.par_iter())
            .zip(state.positions.par_iter_mut())
            .zip(state.velocities.par_iter_mut())
            .zip(state.accelerations.par_iter_mut())
            .for_each(|((((((y, xi), f), &m), r), v), a)| {
                y[1] += xi * (noise_scale / m);
                *a = (f - y[1] * friction) / m;

                let err = y[2] - *a * half_dt2;
                for (yk, c) in y.iter_mut().zip(GEAR_CORRECTOR) {
                    *yk -= err * c;
                }

                y[0] += y[1] + y[2] + y[3] + y[4] + y[5];
                y[1] += y[2] * 2.0 + y[3] * 3.0 + y[4] * 4.0 + y[5] * 5.0;
                y[2] += y[3] * 3.0 + y[4] * 6.0 + y[5] * 10.0;
                y[3] += y[4] * 4.0 + y[5] * 10.0;
                y[4] += y[5] * 5.0;

                *r = y[0];
                *v = y[1] / dt;
            });
        state.t += dt;
    }
}

/// The time-stepping scheme selected by [`IntegratorConfig`].
#[derive(Debug, Clone)]
pub enum Integrator {
    Leapfrog(Leapfrog),
    Langevin(LangevinPredictorCorrector),
}

impl Integrator {
    pub fn new(config: &IntegratorConfig, state: &State) -> Self {
        match &config.langevin {
            Some(langevin) => {
                Integrator::Langevin(LangevinPredictorCorrector::new(config.dt, langevin, state))
            }
            None => Integrator::Leapfrog(Leapfrog::new(config.dt)),
        }
    }

    pub fn dt(&self) -> f64 {
        match self {
            Integrator::Leapfrog(i) => i.dt(),
            Integrator::Langevin(i) => i.dt(),
        }
    }

    pub fn step(&mut self, state: &mut State, dynamics: &Dynamics) {
        match self {
            Integrator::Leapfrog(i) => i.step(state, dynamics),
            Integrator::Langevin(i) => i.step(state, dynamics),
        }
    }
}
