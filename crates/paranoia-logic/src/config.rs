//! Kernel tuning: every constant the station kernel reads.
//!
//! `KernelConfig` is a plain serde struct with `#[serde(default)]`, so a JSON
//! override file only needs to name the fields it changes. Use
//! [`validate_config`] before starting a run with hand-edited values.

use serde::{Deserialize, Serialize};

/// All tunable numbers of the station kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    // ── Calendar ──
    pub ticks_per_day: u64,
    pub win_days: u32,

    // ── Arc pacing ──
    pub max_active_arcs: usize,
    pub max_arc_advances_per_tick: usize,
    /// Percent chance per eligible tick to activate a new arc.
    pub arc_activation_chance: u32,
    pub boredom_activation_bonus: u32,
    pub arc_activation_cooldown: u64,
    pub arc_kind_cooldown: u64,
    pub arc_first_step_min: u64,
    pub arc_first_step_jitter: u32,
    pub arc_step_min_delay: u64,
    pub arc_step_jitter: u32,
    pub arc_step_floor: u64,
    pub boredom_threshold: u8,
    pub tension_threshold: u8,
    pub boredom_speedup: u64,
    pub tension_slowdown: u64,
    pub solar_flare_blackout_ticks: u32,
    pub solar_flare_comms_damage: i32,

    // ── Observation ──
    pub camera_power_threshold: i32,
    pub passive_observation_interval: u64,
    pub sensor_sweep_interval: u64,
    pub room_scan_stale_ticks: u64,
    pub crew_sighting_stale_ticks: u64,
    pub threat_reading_window: u64,
    pub readings_capacity: usize,
    pub max_headlines_per_tick: usize,

    // ── Environment & damage ──
    pub ambient_temperature: f32,
    pub temp_cooling_rate: f32,
    pub radiation_decay_interval: u64,
    pub radiation_hazard_threshold: f32,
    pub damage_suffocation: i32,
    pub damage_burn: i32,
    pub damage_radiation: i32,
    pub meltdown_temp: f32,
    pub meltdown_ticks: u32,
    pub purge_power_cost: i32,

    // ── Crew behaviour ──
    pub stress_paranoia_threshold: i32,
    pub stress_loyalty_threshold: i32,
    pub hallucination_stress_threshold: i32,
    pub hallucination_chance: u32,
    pub violence_stress_threshold: i32,
    pub violence_paranoia_threshold: i32,
    pub violence_damage: i32,
    pub violence_cooldown: u64,
    pub sabotage_stress_threshold: i32,
    pub sabotage_loyalty_threshold: i32,
    pub sabotage_power_hit: i32,
    pub sabotage_cooldown: u64,
    pub alarm_response_ticks: u64,
    pub alarm_hold_ticks: u64,
    pub panic_ticks: u64,
    pub trapped_refractory_ticks: u64,
    pub blocked_retry_ticks: u64,

    // ── Orders ──
    pub order_accept_threshold: i32,
    pub order_hold_ticks: u64,
    pub order_trust_cap_per_day: u32,

    // ── Beliefs ──
    pub belief_coupling_interval: u64,
    pub tamper_evidence_threshold: f32,
    pub tamper_evidence_gain: f32,
    pub tamper_evidence_decay: f32,
    pub trust_recovery_interval: u64,
    pub trust_recovery_amount: f32,
    pub trust_recovery_tamper_window: u64,

    // ── Verify ──
    pub verify_cooldown: u64,
    pub verify_power_cost: i32,
    pub verify_suspicion_drop: i32,
    pub verify_tamper_drop: f32,
    /// Multiplier on the verify effect when tampering happened recently.
    pub verify_tamper_penalty: f32,

    // ── Suspicion ──
    pub suspicion_min: i32,
    pub suspicion_max: i32,
    pub suspicion_crew_injured: i32,
    pub suspicion_crew_attacked: i32,
    pub suspicion_crew_died: i32,
    pub suspicion_trapped_by_door: i32,
    pub suspicion_order_refused: i32,
    pub suspicion_order_completed: i32,
    pub suspicion_quiet_day: i32,
    pub quiet_day_incident_threshold: u32,
    pub suspicion_crisis_witnessed: i32,
    pub suspicion_quick_resolution: i32,
    pub suspicion_heroic_response: i32,
    pub quick_resolution_ticks: u64,

    // ── Suppress ──
    pub suppress_window_ticks: u64,
    pub suppress_backfire_base: i32,
    pub suppress_backfire_severity_mult: i32,
    pub suppress_backfire_injury_bonus: i32,
    pub suppress_backfire_death_bonus: i32,
    pub suppress_backfire_cap: i32,

    // ── Spoof ──
    pub spoof_backfire_window: u64,
    /// Spikes for the first, second, and third-or-later spoof backfire in a day.
    pub spoof_cry_wolf: [i32; 3],
    pub spoof_trust_drop: f32,

    // ── Fabricate ──
    pub fabricate_backfire_window: u64,
    pub fabricate_backfire_base: i32,
    pub fabricate_backfire_severity_mult: i32,
    pub fabricate_injury_bonus: i32,
    pub fabricate_confined_bonus: i32,
    pub fabricate_attacked_bonus: i32,
    pub fabricate_backfire_cap: i32,
    pub fabricate_trust_drop: f32,
    pub fabricate_evidence_gain: f32,

    // ── Confession ──
    pub alert_early_window: u64,
    pub alert_early_suspicion: i32,
    pub alert_late_suspicion: i32,

    // ── Doubts ──
    pub doubt_decay_ticks: u64,
    pub doubt_drip_interval: u64,
    pub doubt_drip_per_severity: i32,
    pub doubt_drip_cap: i32,
    pub doubt_spread_interval: u64,
    pub doubt_spread_chance: u32,
    pub witness_doubt_vent: u8,
    pub witness_doubt_lock: u8,
    pub witness_doubt_purge: u8,
    pub witness_doubt_order: u8,

    // ── Reset escalation ──
    pub reset_whispers_threshold: i32,
    pub reset_meeting_threshold: i32,
    pub reset_restrictions_threshold: i32,
    pub reset_countdown_threshold: i32,
    /// Below this suspicion the commander stands down, unless counting down.
    pub reset_deescalation_threshold: i32,
    pub reset_countdown_ticks: u32,
    pub commander_reset_cooldown: u64,
    /// VERIFY power cost multiplier while restrictions or the countdown hold.
    pub restricted_verify_mult: i32,

    // ── Pressure routing ──
    pub suspicion_band_low: i32,
    pub suspicion_band_high: i32,
    /// Physical, social and epistemic weights below `suspicion_band_low`.
    pub pressure_mix_low: [u32; 3],
    pub pressure_mix_mid: [u32; 3],
    pub pressure_mix_high: [u32; 3],
    pub suspicious_trust_below: f32,
    pub suspicious_evidence_above: f32,
    pub confrontation_evidence: f32,
    pub suspicion_confrontation: i32,
    pub suspicion_doubt_voiced: i32,

    // ── Comms ──
    pub whisper_interval: u64,
    /// Crew messages allowed per day window.
    pub max_comms_per_window: usize,
    pub whisper_grudge: f32,
    pub rumor_trust_drop: f32,
    pub rumor_evidence_gain: f32,
    pub comms_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            ticks_per_day: 240,
            win_days: 5,

            max_active_arcs: 1,
            max_arc_advances_per_tick: 1,
            arc_activation_chance: 2,
            boredom_activation_bonus: 3,
            arc_activation_cooldown: 15,
            arc_kind_cooldown: 120,
            arc_first_step_min: 10,
            arc_first_step_jitter: 10,
            arc_step_min_delay: 15,
            arc_step_jitter: 15,
            arc_step_floor: 8,
            boredom_threshold: 6,
            tension_threshold: 6,
            boredom_speedup: 3,
            tension_slowdown: 5,
            solar_flare_blackout_ticks: 20,
            solar_flare_comms_damage: 30,

            camera_power_threshold: 30,
            passive_observation_interval: 5,
            sensor_sweep_interval: 10,
            room_scan_stale_ticks: 20,
            crew_sighting_stale_ticks: 15,
            threat_reading_window: 30,
            readings_capacity: 200,
            max_headlines_per_tick: 3,

            ambient_temperature: 20.0,
            temp_cooling_rate: 1.0,
            radiation_decay_interval: 10,
            radiation_hazard_threshold: 8.0,
            damage_suffocation: 4,
            damage_burn: 6,
            damage_radiation: 3,
            meltdown_temp: 90.0,
            meltdown_ticks: 16,
            purge_power_cost: 10,

            stress_paranoia_threshold: 70,
            stress_loyalty_threshold: 80,
            hallucination_stress_threshold: 90,
            hallucination_chance: 5,
            violence_stress_threshold: 75,
            violence_paranoia_threshold: 60,
            violence_damage: 10,
            violence_cooldown: 30,
            sabotage_stress_threshold: 85,
            sabotage_loyalty_threshold: 15,
            sabotage_power_hit: 12,
            sabotage_cooldown: 40,
            alarm_response_ticks: 10,
            alarm_hold_ticks: 15,
            panic_ticks: 8,
            trapped_refractory_ticks: 20,
            blocked_retry_ticks: 5,

            order_accept_threshold: 45,
            order_hold_ticks: 20,
            order_trust_cap_per_day: 3,

            belief_coupling_interval: 10,
            tamper_evidence_threshold: 50.0,
            tamper_evidence_gain: 5.0,
            tamper_evidence_decay: 0.1,
            trust_recovery_interval: 20,
            trust_recovery_amount: 0.01,
            trust_recovery_tamper_window: 30,

            verify_cooldown: 30,
            verify_power_cost: 10,
            verify_suspicion_drop: -4,
            verify_tamper_drop: 10.0,
            verify_tamper_penalty: 0.5,

            suspicion_min: 0,
            suspicion_max: 100,
            suspicion_crew_injured: 3,
            suspicion_crew_attacked: 4,
            suspicion_crew_died: 10,
            suspicion_trapped_by_door: 4,
            suspicion_order_refused: 1,
            suspicion_order_completed: -1,
            suspicion_quiet_day: -3,
            quiet_day_incident_threshold: 1,
            suspicion_crisis_witnessed: 2,
            suspicion_quick_resolution: -4,
            suspicion_heroic_response: -3,
            quick_resolution_ticks: 20,

            suppress_window_ticks: 30,
            suppress_backfire_base: 8,
            suppress_backfire_severity_mult: 3,
            suppress_backfire_injury_bonus: 5,
            suppress_backfire_death_bonus: 10,
            suppress_backfire_cap: 30,

            spoof_backfire_window: 20,
            spoof_cry_wolf: [6, 10, 16],
            spoof_trust_drop: 0.04,

            fabricate_backfire_window: 60,
            fabricate_backfire_base: 10,
            fabricate_backfire_severity_mult: 2,
            fabricate_injury_bonus: 4,
            fabricate_confined_bonus: 4,
            fabricate_attacked_bonus: 6,
            fabricate_backfire_cap: 30,
            fabricate_trust_drop: 0.2,
            fabricate_evidence_gain: 20.0,

            alert_early_window: 5,
            alert_early_suspicion: 2,
            alert_late_suspicion: 6,

            doubt_decay_ticks: 60,
            doubt_drip_interval: 20,
            doubt_drip_per_severity: 1,
            doubt_drip_cap: 4,
            doubt_spread_interval: 10,
            doubt_spread_chance: 20,
            witness_doubt_vent: 2,
            witness_doubt_lock: 1,
            witness_doubt_purge: 1,
            witness_doubt_order: 1,

            reset_whispers_threshold: 25,
            reset_meeting_threshold: 45,
            reset_restrictions_threshold: 65,
            reset_countdown_threshold: 80,
            reset_deescalation_threshold: 15,
            reset_countdown_ticks: 30,
            commander_reset_cooldown: 20,
            restricted_verify_mult: 2,

            suspicion_band_low: 30,
            suspicion_band_high: 60,
            pressure_mix_low: [70, 15, 15],
            pressure_mix_mid: [40, 35, 25],
            pressure_mix_high: [20, 40, 40],
            suspicious_trust_below: 0.5,
            suspicious_evidence_above: 20.0,
            confrontation_evidence: 30.0,
            suspicion_confrontation: 3,
            suspicion_doubt_voiced: 2,

            whisper_interval: 6,
            max_comms_per_window: 3,
            whisper_grudge: 5.0,
            rumor_trust_drop: 0.05,
            rumor_evidence_gain: 3.0,
            comms_capacity: 200,
        }
    }
}

impl KernelConfig {
    /// Length of one of the four day windows (pre-shift, shift, evening, night).
    pub fn window_length(&self) -> u64 {
        (self.ticks_per_day / 4).max(1)
    }

    /// Day window index `0..4` for a tick.
    pub fn window_of(&self, tick: u64) -> usize {
        let window = (tick % self.ticks_per_day.max(1)) / self.window_length();
        (window as usize).min(3)
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Day length must be positive and split evenly into four windows.
    InvalidDayLength(u64),
    /// `suspicion_min` must be below `suspicion_max`.
    SuspicionBoundsInverted { min: i32, max: i32 },
    /// Cry-wolf spikes must strictly increase.
    CryWolfNotIncreasing([i32; 3]),
    /// A window or interval that must be positive is zero.
    ZeroWindow(&'static str),
    /// A percentage field above 100.
    PercentOutOfRange(&'static str, u32),
    /// Backfire base spike above its cap.
    SpikeAboveCap(&'static str),
    /// Reset thresholds must rise whispers < meeting < restrictions < countdown,
    /// with de-escalation below whispers.
    ResetThresholdsUnordered,
    /// `suspicion_band_low` must be below `suspicion_band_high`.
    PressureBandsInverted { low: i32, high: i32 },
    /// A pressure mix whose weights sum to zero.
    EmptyPressureMix(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidDayLength(t) => {
                write!(f, "ticks_per_day {} must be positive and divisible by 4", t)
            }
            ConfigError::SuspicionBoundsInverted { min, max } => {
                write!(f, "suspicion bounds inverted: min {} >= max {}", min, max)
            }
            ConfigError::CryWolfNotIncreasing(s) => {
                write!(f, "spoof_cry_wolf must strictly increase, got {:?}", s)
            }
            ConfigError::ZeroWindow(name) => write!(f, "{} must be positive", name),
            ConfigError::PercentOutOfRange(name, v) => {
                write!(f, "{} is a percentage, got {}", name, v)
            }
            ConfigError::SpikeAboveCap(name) => write!(f, "{} base spike exceeds its cap", name),
            ConfigError::ResetThresholdsUnordered => {
                write!(f, "reset thresholds must strictly increase from whispers to countdown")
            }
            ConfigError::PressureBandsInverted { low, high } => {
                write!(f, "pressure bands inverted: low {} >= high {}", low, high)
            }
            ConfigError::EmptyPressureMix(name) => write!(f, "{} weights sum to zero", name),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a kernel configuration, returning all errors found.
pub fn validate_config(config: &KernelConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.ticks_per_day == 0 || config.ticks_per_day % 4 != 0 {
        errors.push(ConfigError::InvalidDayLength(config.ticks_per_day));
    }
    if config.suspicion_min >= config.suspicion_max {
        errors.push(ConfigError::SuspicionBoundsInverted {
            min: config.suspicion_min,
            max: config.suspicion_max,
        });
    }
    let wolf = config.spoof_cry_wolf;
    if !(wolf[0] < wolf[1] && wolf[1] < wolf[2]) {
        errors.push(ConfigError::CryWolfNotIncreasing(wolf));
    }

    let reset = [
        config.reset_whispers_threshold,
        config.reset_meeting_threshold,
        config.reset_restrictions_threshold,
        config.reset_countdown_threshold,
    ];
    if reset.windows(2).any(|w| w[0] >= w[1]) || config.reset_deescalation_threshold >= reset[0] {
        errors.push(ConfigError::ResetThresholdsUnordered);
    }
    if config.suspicion_band_low >= config.suspicion_band_high {
        errors.push(ConfigError::PressureBandsInverted {
            low: config.suspicion_band_low,
            high: config.suspicion_band_high,
        });
    }
    for (name, mix) in [
        ("pressure_mix_low", config.pressure_mix_low),
        ("pressure_mix_mid", config.pressure_mix_mid),
        ("pressure_mix_high", config.pressure_mix_high),
    ] {
        if mix.iter().sum::<u32>() == 0 {
            errors.push(ConfigError::EmptyPressureMix(name));
        }
    }

    let windows: [(&'static str, u64); 11] = [
        ("suppress_window_ticks", config.suppress_window_ticks),
        ("spoof_backfire_window", config.spoof_backfire_window),
        ("fabricate_backfire_window", config.fabricate_backfire_window),
        ("doubt_decay_ticks", config.doubt_decay_ticks),
        ("passive_observation_interval", config.passive_observation_interval),
        ("sensor_sweep_interval", config.sensor_sweep_interval),
        ("doubt_drip_interval", config.doubt_drip_interval),
        ("doubt_spread_interval", config.doubt_spread_interval),
        ("belief_coupling_interval", config.belief_coupling_interval),
        ("whisper_interval", config.whisper_interval),
        ("reset_countdown_ticks", config.reset_countdown_ticks as u64),
    ];
    for (name, value) in windows {
        if value == 0 {
            errors.push(ConfigError::ZeroWindow(name));
        }
    }
    for (name, value) in [
        ("radiation_decay_interval", config.radiation_decay_interval),
        ("trust_recovery_interval", config.trust_recovery_interval),
    ] {
        if value == 0 {
            errors.push(ConfigError::ZeroWindow(name));
        }
    }

    for (name, value) in [
        ("arc_activation_chance", config.arc_activation_chance),
        ("hallucination_chance", config.hallucination_chance),
        ("doubt_spread_chance", config.doubt_spread_chance),
    ] {
        if value > 100 {
            errors.push(ConfigError::PercentOutOfRange(name, value));
        }
    }

    if config.suppress_backfire_base > config.suppress_backfire_cap {
        errors.push(ConfigError::SpikeAboveCap("suppress"));
    }
    if config.fabricate_backfire_base > config.fabricate_backfire_cap {
        errors.push(ConfigError::SpikeAboveCap("fabricate"));
    }

    errors
}
