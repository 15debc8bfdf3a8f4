//! Headless simulation of a motion file
//!
//! Values are ticked at a fixed frame length, so the output is identical on
//! every run regardless of machine speed.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use lumo_animation::{AnimValue, AnimationScheduler, ResolvedValue, ValueId};
use lumo_core::CallbackQueue;
use serde::Serialize;

pub struct SimulationOptions {
    pub fps: u32,
    pub max_frames: u64,
    pub json: bool,
}

#[derive(Debug, Default)]
pub struct SimulationSummary {
    pub frames: u64,
    /// Values in settle order, with the frame they settled on
    pub settled: Vec<(String, u64)>,
    pub running: Vec<String>,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: u64,
    t_ms: f32,
    values: BTreeMap<&'a str, AnimValue>,
}

pub struct Simulation {
    values: Vec<ResolvedValue>,
    options: SimulationOptions,
}

impl Simulation {
    pub fn new(values: Vec<ResolvedValue>, options: SimulationOptions) -> Self {
        Self { values, options }
    }

    pub fn run(self, out: &mut impl Write) -> Result<SimulationSummary> {
        let queue = CallbackQueue::new();
        let scheduler = AnimationScheduler::new().with_dispatcher(queue.dispatcher());
        let handle = scheduler.handle();

        // Written only from drained completions, on this thread
        let settled_now: Arc<Mutex<Vec<usize>>> = Arc::default();

        let mut ids: Vec<ValueId> = Vec::with_capacity(self.values.len());
        for (index, value) in self.values.iter().enumerate() {
            let id = handle
                .create(value.initial)
                .ok_or_else(|| anyhow::anyhow!("scheduler dropped during setup"))?;
            let settled_now = Arc::clone(&settled_now);
            handle.retarget_with(id, value.transition.clone(), move || {
                settled_now
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(index);
            });
            ids.push(id);
        }

        let frame_dt = Duration::from_secs_f64(1.0 / self.options.fps as f64);
        let mut summary = SimulationSummary::default();
        let mut settle_frames: Vec<Option<u64>> = vec![None; self.values.len()];

        self.write_frame(out, 0, &read_values(&scheduler, &ids))?;

        while summary.frames < self.options.max_frames {
            let active = scheduler.tick_by(frame_dt);
            summary.frames += 1;
            queue.drain();

            for index in settled_now
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
            {
                settle_frames[index] = Some(summary.frames);
                summary
                    .settled
                    .push((self.values[index].name.clone(), summary.frames));
            }

            self.write_frame(out, summary.frames, &read_values(&scheduler, &ids))?;

            if !active {
                break;
            }
        }

        summary.running = self
            .values
            .iter()
            .zip(&settle_frames)
            .filter(|(_, frame)| frame.is_none())
            .map(|(value, _)| value.name.clone())
            .collect();

        Ok(summary)
    }

    fn write_frame(&self, out: &mut impl Write, frame: u64, readings: &[AnimValue]) -> Result<()> {
        let t_ms = frame as f32 * 1000.0 / self.options.fps as f32;

        if self.options.json {
            let record = FrameRecord {
                frame,
                t_ms,
                values: self
                    .values
                    .iter()
                    .map(|value| value.name.as_str())
                    .zip(readings.iter().copied())
                    .collect(),
            };
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
            return Ok(());
        }

        write!(out, "{frame:>5} {t_ms:>9.2}ms")?;
        for (value, reading) in self.values.iter().zip(readings) {
            match reading {
                AnimValue::Scalar(v) => write!(out, "  {}={:.4}", value.name, v)?,
                AnimValue::Pair(p) => write!(out, "  {}=({:.4}, {:.4})", value.name, p.x, p.y)?,
            }
        }
        writeln!(out)?;
        Ok(())
    }
}

fn read_values(scheduler: &AnimationScheduler, ids: &[ValueId]) -> Vec<AnimValue> {
    scheduler.with_store(|store| ids.iter().map(|id| store.read(*id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_animation::MotionFile;

    fn resolve(source: &str) -> Vec<ResolvedValue> {
        MotionFile::parse(source).unwrap().resolve().unwrap()
    }

    #[test]
    fn test_simulation_reports_settle_frames() {
        let values = resolve(
            r#"
[[values]]
name = "fast"
initial = 0.0
transition = { kind = "timing", to = 1.0, duration_ms = 100.0, easing = "linear" }

[[values]]
name = "slow"
initial = 0.0
transition = { kind = "timing", to = 1.0, duration_ms = 200.0, easing = "linear" }
"#,
        );
        let options = SimulationOptions {
            fps: 20,
            max_frames: 100,
            json: false,
        };

        let mut out = Vec::new();
        let summary = Simulation::new(values, options).run(&mut out).unwrap();

        assert_eq!(
            summary.settled,
            vec![("fast".to_string(), 2), ("slow".to_string(), 4)]
        );
        assert!(summary.running.is_empty());
        assert_eq!(summary.frames, 4);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().last().unwrap().contains("slow=1.0000"));
    }

    #[test]
    fn test_demo_motion_file_settles() {
        let values = resolve(include_str!("../../../demos/course_screen.toml"));
        let names: Vec<_> = values.iter().map(|value| value.name.clone()).collect();
        let options = SimulationOptions {
            fps: 60,
            max_frames: 600,
            json: false,
        };

        let summary = Simulation::new(values, options).run(&mut std::io::sink()).unwrap();
        assert!(summary.running.is_empty());
        let mut settled: Vec<_> = summary.settled.into_iter().map(|(name, _)| name).collect();
        let mut expected = names;
        settled.sort();
        expected.sort();
        assert_eq!(settled, expected);
    }

    #[test]
    fn test_indefinite_values_stop_at_max_frames() {
        let values = resolve(
            r#"
[[values]]
name = "spin"
initial = 0.0
transition = { kind = "repeat", child = { kind = "timing", to = 360.0, duration_ms = 500.0 } }
"#,
        );
        let options = SimulationOptions {
            fps: 60,
            max_frames: 30,
            json: true,
        };

        let mut out = Vec::new();
        let summary = Simulation::new(values, options).run(&mut out).unwrap();
        assert_eq!(summary.frames, 30);
        assert_eq!(summary.running, vec!["spin".to_string()]);

        let text = String::from_utf8(out).unwrap();
        let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last["frame"], 30);
        assert!(last["values"]["spin"].is_number());
    }
}
