pub mod timer;

pub use timer::{Clock, ManualClock, SystemClock};

use crate::config::{LandscapeConfig, LandscapeConfigError};
use crate::diagram::NetworkDiagram;
use crate::nn::{InvalidWeightIndex, WeightParam, WeightSet};
use crate::surface::{SurfaceMesh, SurfaceStats};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::Serialize;
use std::time::Instant;
use std::{error::Error, fmt};
use timer::PerturbTimer;
use tracing::{debug, trace, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMode {
    #[default]
    Idle,
    Perturbing,
}

#[derive(Clone, Debug, Serialize)]
pub struct FrameTimings {
    pub frame_index: u64,
    pub vertex_count: usize,
    pub sample_us: u64,
    pub stats: SurfaceStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionInitError {
    Config(LandscapeConfigError),
}

impl fmt::Display for SessionInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionInitError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl From<LandscapeConfigError> for SessionInitError {
    fn from(err: LandscapeConfigError) -> Self {
        SessionInitError::Config(err)
    }
}

impl Error for SessionInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionInitError::Config(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Manual edits are locked out while auto-perturbation runs.
    AutoModeActive,
    /// Auto mode can only start from an open view.
    ViewClosed,
    InvalidIndex(usize),
    InvalidParam(WeightParam),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::AutoModeActive => {
                write!(f, "manual weight edits are disabled while auto mode is on")
            }
            CommandError::ViewClosed => write!(f, "view is closed"),
            CommandError::InvalidIndex(index) => write!(
                f,
                "weight index {index} out of range (0..{})",
                WeightSet::WEIGHT_COUNT
            ),
            CommandError::InvalidParam(param) => write!(f, "weight parameter {param:?} out of range"),
        }
    }
}

impl From<InvalidWeightIndex> for CommandError {
    fn from(err: InvalidWeightIndex) -> Self {
        CommandError::InvalidIndex(err.index)
    }
}

impl Error for CommandError {}

/// One interactive visualizer session.
///
/// Owns the only `WeightSet`. Manual edits and the perturbation timer are the
/// two writers; rendering only reads. Everything runs on the caller's thread.
pub struct LandscapeSession<C: Clock = SystemClock> {
    config: LandscapeConfig,
    weights: WeightSet,
    mesh: SurfaceMesh,
    rng: ChaCha12Rng,
    clock: C,
    auto: AutoMode,
    view_open: bool,
    visible: bool,
    /// Present exactly while the perturbation source is allowed to run.
    timer: Option<PerturbTimer>,
    frame_index: u64,
    perturb_ticks: u64,
}

impl LandscapeSession<SystemClock> {
    pub fn new(config: LandscapeConfig) -> Self {
        Self::try_new(config, WeightSet::default(), SystemClock).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<C: Clock> LandscapeSession<C> {
    pub fn try_new(
        config: LandscapeConfig,
        mut weights: WeightSet,
        clock: C,
    ) -> Result<Self, SessionInitError> {
        config.validate()?;
        for param in WeightParam::ALL {
            weights.set_clamped(param, weights.get(param), config.weight_limit);
        }
        let mesh = SurfaceMesh::new(&config);
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            weights,
            mesh,
            rng,
            clock,
            auto: AutoMode::Idle,
            view_open: false,
            visible: true,
            timer: None,
            frame_index: 0,
            perturb_ticks: 0,
        })
    }

    pub fn config(&self) -> &LandscapeConfig {
        &self.config
    }

    /// Read-only snapshot for rendering.
    pub fn weights(&self) -> &WeightSet {
        &self.weights
    }

    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    pub fn auto_mode(&self) -> AutoMode {
        self.auto
    }

    pub fn is_view_open(&self) -> bool {
        self.view_open
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn next_perturbation_due(&self) -> Option<Instant> {
        self.timer.as_ref().map(|t| t.next_due())
    }

    pub fn perturb_ticks(&self) -> u64 {
        self.perturb_ticks
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn open_view(&mut self) {
        if !self.view_open {
            debug!("view opened");
            self.view_open = true;
            self.sync_timer();
        }
    }

    /// Closing the view also stops auto mode.
    pub fn close_view(&mut self) {
        if self.view_open {
            debug!("view closed");
            self.view_open = false;
            self.set_auto(AutoMode::Idle);
            self.sync_timer();
        }
    }

    /// Backgrounding only suspends the timer if `pause_when_hidden` is set.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            debug!(visible, "visibility changed");
            self.visible = visible;
            self.sync_timer();
        }
    }

    pub fn start_auto(&mut self) -> Result<(), CommandError> {
        if !self.view_open {
            warn!("auto mode requested while view is closed");
            return Err(CommandError::ViewClosed);
        }
        self.set_auto(AutoMode::Perturbing);
        self.sync_timer();
        Ok(())
    }

    pub fn stop_auto(&mut self) {
        self.set_auto(AutoMode::Idle);
        self.sync_timer();
    }

    pub fn toggle_auto(&mut self) -> Result<AutoMode, CommandError> {
        match self.auto {
            AutoMode::Idle => self.start_auto()?,
            AutoMode::Perturbing => self.stop_auto(),
        }
        Ok(self.auto)
    }

    /// Write one scalar, clamped to the weight limit. Returns the stored value.
    pub fn set_weight(&mut self, param: WeightParam, value: f64) -> Result<f64, CommandError> {
        if !param.is_valid() {
            return Err(CommandError::InvalidParam(param));
        }
        if self.auto == AutoMode::Perturbing {
            warn!(param = %param.label(), "manual edit rejected while auto mode is on");
            return Err(CommandError::AutoModeActive);
        }
        let stored = self
            .weights
            .set_clamped(param, value, self.config.weight_limit);
        trace!(param = %param.label(), requested = value, stored, "weight set");
        Ok(stored)
    }

    pub fn set_weight_flat(&mut self, index: usize, value: f64) -> Result<f64, CommandError> {
        let param = WeightParam::from_index(index)?;
        self.set_weight(param, value)
    }

    /// Run every perturbation step that has come due. Returns how many ran.
    pub fn poll(&mut self) -> u32 {
        let now = self.clock.now();
        let Some(timer) = self.timer.as_mut() else {
            return 0;
        };
        let fired = timer.fire_due(now, self.config.max_catch_up_ticks);
        if fired.truncated {
            warn!(
                ticks = fired.ticks,
                "perturbation timer fell behind; realigned to current time"
            );
        }
        for _ in 0..fired.ticks {
            self.weights
                .perturb(&mut self.rng, self.config.perturb_step, self.config.weight_limit);
        }
        self.perturb_ticks += fired.ticks as u64;
        if fired.ticks > 0 {
            trace!(ticks = fired.ticks, total = self.perturb_ticks, "perturbed weights");
        }
        fired.ticks
    }

    /// Resample the surface from the current weights. Nothing is drawn while
    /// the view is closed.
    pub fn render_frame(&mut self) -> Option<FrameTimings> {
        if !self.view_open {
            return None;
        }
        let t0 = Instant::now();
        let stats = self.mesh.resample(&self.weights);
        let sample_us = t0.elapsed().as_micros() as u64;
        self.frame_index += 1;
        Some(FrameTimings {
            frame_index: self.frame_index,
            vertex_count: self.mesh.vertices().len(),
            sample_us,
            stats,
        })
    }

    pub fn diagram(&self) -> NetworkDiagram {
        NetworkDiagram::build(
            &self.weights,
            self.config.weight_limit,
            self.auto == AutoMode::Perturbing,
        )
    }

    fn set_auto(&mut self, next: AutoMode) {
        if self.auto != next {
            debug!(from = ?self.auto, to = ?next, "auto mode transition");
            self.auto = next;
        }
    }

    fn timer_should_run(&self) -> bool {
        self.view_open
            && self.auto == AutoMode::Perturbing
            && (self.visible || !self.config.pause_when_hidden)
    }

    /// Arm or cancel the timer so it exists exactly while it should run.
    fn sync_timer(&mut self) {
        match (self.timer_should_run(), self.timer.is_some()) {
            (true, false) => {
                let period = self.config.perturb_interval();
                debug!(?period, "perturbation timer armed");
                self.timer = Some(PerturbTimer::start(self.clock.now(), period));
            }
            (false, true) => {
                debug!("perturbation timer cancelled");
                self.timer = None;
            }
            _ => {}
        }
    }
}
