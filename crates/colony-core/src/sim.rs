//! Tick clock input and simulation bookkeeping types.

use crate::fixed::{Fixed64, Ticks};

// ---------------------------------------------------------------------------
// Tick clock
// ---------------------------------------------------------------------------

/// Time input supplied by the host for each step.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickClock {
    pub tick_number: Ticks,
    /// Seconds of wall time covered by this tick.
    pub delta_time: f32,
    pub is_paused: bool,
    pub speed_multiplier: f32,
}

impl TickClock {
    /// Speed multipliers below this are treated as this value.
    pub const MIN_SPEED: f32 = 0.01;

    pub fn new(tick_number: Ticks, delta_time: f32) -> Self {
        Self {
            tick_number,
            delta_time,
            is_paused: false,
            speed_multiplier: 1.0,
        }
    }

    pub fn paused(mut self) -> Self {
        self.is_paused = true;
        self
    }

    pub fn with_speed(mut self, speed_multiplier: f32) -> Self {
        self.speed_multiplier = speed_multiplier;
        self
    }

    /// Delta time scaled by the speed multiplier.
    pub fn scaled_delta(&self) -> f32 {
        self.delta_time.max(0.0) * self.speed_multiplier.max(Self::MIN_SPEED)
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable bookkeeping tracked by the engine.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Tick of the most recent step that ran.
    pub last_tick: Option<Ticks>,
    /// Number of steps that actually ran (paused steps excluded).
    pub steps_run: u64,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Step result
// ---------------------------------------------------------------------------

/// Summary of one `Engine::step()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepResult {
    /// False when the step was skipped (paused or economy disabled).
    pub ran: bool,
    pub tick: Ticks,
    pub businesses_spawned: u32,
    pub jobs_started: u32,
    pub jobs_completed: u32,
    /// Carriers that unloaded straight into a colony this step.
    pub carrier_exports: u32,
    pub haulers_delivered: u32,
    pub state_hash: u64,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
