//! Step-level observation seam.
//!
//! Replaces the source's global logging/plot hooks inside the inner loop
//! (see `DESIGN.md`) with a typed event an external plotting or metrics
//! crate can subscribe to. The default observer is a no-op; this crate
//! does not itself draw anything.

/// A snapshot of one force-assembler step, handed to an [`Observer`] after
/// the step and the scale controller's rescaling have both run.
#[derive(Debug, Clone, Copy)]
pub struct StepEvent {
    pub round: usize,
    pub dimension: usize,
    pub step: usize,
    pub steps_in_round: usize,
    pub temperature: f64,
    pub scaling_factor: f64,
    pub min_pair_distance: f64,
    pub max_radial_distance: f64,
}

pub trait Observer {
    fn on_step(&mut self, event: StepEvent);
}

/// The default observer: does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_step(&mut self, _event: StepEvent) {}
}
