/// State of the run after one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Steps completed in the current `advance` call, counting this one.
    pub step: u64,
    pub t: f64,
    pub potential_energy: f64,
    /// Live quasi-adiabatic contacts; zero when that interaction is disabled.
    pub contacts: usize,
}

/// Events emitted while a workflow runs. Front ends map them onto progress bars or logs.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    DynamicsStart { total_steps: u64, dt: f64 },
    Step(StepReport),
    DynamicsFinish,

    /// The spatial index regenerated its pair list before step `step`.
    PairListRebuilt { step: u64, pairs: usize },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Whether anyone listens; lets callers skip assembling per-step reports.
    #[inline]
    pub fn is_listening(&self) -> bool {
        self.callback.is_some()
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_silent() {
        let reporter = ProgressReporter::new();
        assert!(!reporter.is_listening());
        reporter.report(Progress::DynamicsFinish);
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(event);
        }));
        assert!(reporter.is_listening());
        let step = StepReport {
            step: 1,
            t: 0.01,
            potential_energy: -1.5,
            contacts: 2,
        };
        reporter.report(Progress::PairListRebuilt { step: 1, pairs: 7 });
        reporter.report(Progress::Step(step));
        reporter.report(Progress::DynamicsFinish);
        drop(reporter);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                Progress::PairListRebuilt { step: 1, pairs: 7 },
                Progress::Step(step),
                Progress::DynamicsFinish,
            ]
        );
    }
}
