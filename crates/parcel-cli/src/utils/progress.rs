use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parcel::engine::progress::{Progress, ProgressCallback, Stage};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Shows the ascent and the holding stage of a parcel run as tick bars on stderr.
///
/// The bar message follows the most recent output record.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        bar.finish_and_clear();
        Self {
            bar: Arc::new(Mutex::new(bar)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();

        Box::new(move |progress: Progress| {
            let Ok(bar) = bar.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::StageStart { stage, ticks } => {
                    bar.reset();
                    bar.set_length(ticks);
                    bar.set_style(Self::stage_style(stage));
                    bar.set_prefix(stage.to_string());
                }
                Progress::Tick => bar.inc(1),
                Progress::Record { index, time, z } => {
                    bar.set_message(Self::record_message(index, time, z));
                }
                Progress::StageFinish { stage } => {
                    if stage == Stage::Setup {
                        bar.finish_and_clear();
                    } else {
                        bar.finish();
                    }
                }
                Progress::Finished { ticks, records } => {
                    bar.finish_with_message(format!("✓ {ticks} ticks, {records} records"));
                }
            }
        })
    }

    fn record_message(index: usize, time: f64, z: f64) -> String {
        format!("rec {index} | t = {time:.1} s | z = {z:.1} m")
    }

    fn stage_style(stage: Stage) -> ProgressStyle {
        let template = match stage {
            Stage::Setup => "{prefix:<12} {msg}",
            Stage::Ascent | Stage::Holding => {
                "{prefix:<12} [{bar:40.cyan/blue}] {pos}/{len} ticks {msg}"
            }
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
