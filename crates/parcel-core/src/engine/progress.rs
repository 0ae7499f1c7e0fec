use std::fmt;

/// Stage of a parcel run, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Archive schema and the initial record at `t = 0`.
    Setup,
    /// Rising at constant vertical velocity.
    Ascent,
    /// Resting at the final height for `wait` ticks.
    Holding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Setup => "Output Setup",
            Stage::Ascent => "Ascent",
            Stage::Holding => "Holding",
        })
    }
}

/// Events emitted while a parcel is integrated.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A stage begins; `ticks` is the number of time steps it will take.
    StageStart { stage: Stage, ticks: u64 },
    /// One time step has been integrated.
    Tick,
    /// An output record has been written.
    Record { index: usize, time: f64, z: f64 },
    StageFinish { stage: Stage },
    /// The archive has been finalized.
    Finished { ticks: usize, records: usize },
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

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `body` between the start and finish events of `stage`.
    ///
    /// No finish event is sent if `body` fails.
    pub fn stage<T, E>(
        &self,
        stage: Stage,
        ticks: u64,
        body: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        self.report(Progress::StageStart { stage, ticks });
        let value = body()?;
        self.report(Progress::StageFinish { stage });
        Ok(value)
    }
}
