//! Search tunables and their option-name surface.
//!
//! Every heuristic can be switched off independently; [`SearchConfig::plain`]
//! turns all of them off, which leaves textbook alpha-beta.

use std::fmt;

use crate::errors::ConfigError;

/// Recursion never goes deeper than this, whatever `max_depth` says.
pub const MAX_DEPTH_CEILING: u8 = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub max_depth: u8,
    pub quiescence: bool,

    pub transposition_table: bool,
    pub transposition_table_size_mb: usize,

    pub lmr: bool,
    pub lmr_min_depth: u8,
    pub lmr_min_full_depth_searched_moves: usize,
    pub lmr_base: f64,
    pub lmr_divisor: f64,

    pub null_move_pruning: bool,
    pub nmp_min_depth: u8,
    pub nmp_base_depth_reduction: u8,

    pub aspiration_windows: bool,
    pub aspiration_window_delta: i32,
    pub aspiration_window_min_depth: u8,

    pub reverse_futility_pruning: bool,
    pub rfp_max_depth: u8,
    pub rfp_depth_scaling_factor: i32,

    pub razoring: bool,
    pub razoring_max_depth: u8,
    pub razoring_depth1_bonus: i32,
    pub razoring_not_depth1_bonus: i32,

    pub internal_iterative_reduction: bool,
    pub iir_min_depth: u8,

    pub late_move_pruning: bool,
    pub lmp_max_depth: u8,
    pub lmp_base_moves_to_try: i32,
    pub lmp_moves_depth_multiplier: i32,

    pub history_ordering: bool,
    pub history_max_move_value: i32,
    pub history_max_move_raw_bonus: i32,

    pub see_ordering: bool,
    pub see_bad_capture_reduction: u8,

    pub hard_time_bound_multiplier: f64,
    pub soft_time_bound_multiplier: f64,
    pub default_moves_to_go: u32,
    pub soft_time_base_increment_multiplier: f64,
    pub move_overhead_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            quiescence: true,

            transposition_table: true,
            transposition_table_size_mb: 16,

            lmr: true,
            lmr_min_depth: 3,
            lmr_min_full_depth_searched_moves: 4,
            lmr_base: 0.85,
            lmr_divisor: 2.84,

            null_move_pruning: true,
            nmp_min_depth: 3,
            nmp_base_depth_reduction: 1,

            aspiration_windows: true,
            aspiration_window_delta: 20,
            aspiration_window_min_depth: 7,

            reverse_futility_pruning: true,
            rfp_max_depth: 4,
            rfp_depth_scaling_factor: 87,

            razoring: true,
            razoring_max_depth: 3,
            razoring_depth1_bonus: 105,
            razoring_not_depth1_bonus: 161,

            internal_iterative_reduction: true,
            iir_min_depth: 2,

            late_move_pruning: true,
            lmp_max_depth: 2,
            lmp_base_moves_to_try: 0,
            lmp_moves_depth_multiplier: 10,

            history_ordering: true,
            history_max_move_value: 8_192,
            history_max_move_raw_bonus: 1_896,

            see_ordering: true,
            see_bad_capture_reduction: 1,

            hard_time_bound_multiplier: 0.52,
            soft_time_bound_multiplier: 1.0,
            default_moves_to_go: 45,
            soft_time_base_increment_multiplier: 0.8,
            move_overhead_ms: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    Check,
    Spin { min: i64, max: i64 },
    /// Fractional tunables; advertised as free text since UCI has no float type.
    Float { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: String,
}

impl fmt::Display for OptionDescriptor {
    /// UCI `option` line body, e.g. `option name Hash type spin default 16 min 1 max 1024`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OptionKind::Check => write!(f, "option name {} type check default {}", self.name, self.default),
            OptionKind::Spin { min, max } => write!(
                f,
                "option name {} type spin default {} min {} max {}",
                self.name, self.default, min, max
            ),
            OptionKind::Float { .. } => {
                write!(f, "option name {} type string default {}", self.name, self.default)
            }
        }
    }
}

fn check(name: &'static str, value: bool) -> OptionDescriptor {
    OptionDescriptor {
        name,
        kind: OptionKind::Check,
        default: value.to_string(),
    }
}

fn spin(name: &'static str, value: i64, min: i64, max: i64) -> OptionDescriptor {
    OptionDescriptor {
        name,
        kind: OptionKind::Spin { min, max },
        default: value.to_string(),
    }
}

fn float(name: &'static str, value: f64, min: f64, max: f64) -> OptionDescriptor {
    OptionDescriptor {
        name,
        kind: OptionKind::Float { min, max },
        default: value.to_string(),
    }
}

impl SearchConfig {
    /// Every heuristic, quiescence and the transposition table switched off.
    pub fn plain() -> Self {
        Self {
            quiescence: false,
            transposition_table: false,
            lmr: false,
            null_move_pruning: false,
            aspiration_windows: false,
            reverse_futility_pruning: false,
            razoring: false,
            internal_iterative_reduction: false,
            late_move_pruning: false,
            history_ordering: false,
            see_ordering: false,
            ..Self::default()
        }
    }

    /// Depth the driver iterates to, clamped to the recursion ceiling.
    #[inline]
    pub fn effective_max_depth(&self) -> u8 {
        self.max_depth.clamp(1, MAX_DEPTH_CEILING)
    }

    /// Option descriptors with default values, in advertisement order.
    pub fn options() -> Vec<OptionDescriptor> {
        let d = Self::default();
        vec![
            spin("Hash", d.transposition_table_size_mb as i64, 1, 1024),
            spin("MaxDepth", i64::from(d.max_depth), 1, i64::from(MAX_DEPTH_CEILING)),
            spin("MoveOverhead", d.move_overhead_ms as i64, 0, 5_000),
            check("Quiescence", d.quiescence),
            check("TranspositionTable", d.transposition_table),
            check("LMR", d.lmr),
            spin("LMR_MinDepth", i64::from(d.lmr_min_depth), 1, 32),
            spin(
                "LMR_MinFullDepthSearchedMoves",
                d.lmr_min_full_depth_searched_moves as i64,
                1,
                64,
            ),
            float("LMR_Base", d.lmr_base, 0.0, 5.0),
            float("LMR_Divisor", d.lmr_divisor, 0.5, 10.0),
            check("NMP", d.null_move_pruning),
            spin("NMP_MinDepth", i64::from(d.nmp_min_depth), 1, 32),
            spin("NMP_BaseDepthReduction", i64::from(d.nmp_base_depth_reduction), 0, 8),
            check("AspirationWindows", d.aspiration_windows),
            spin("AspirationWindow_Delta", i64::from(d.aspiration_window_delta), 1, 500),
            spin("AspirationWindow_MinDepth", i64::from(d.aspiration_window_min_depth), 1, 64),
            check("RFP", d.reverse_futility_pruning),
            spin("RFP_MaxDepth", i64::from(d.rfp_max_depth), 1, 32),
            spin("RFP_DepthScalingFactor", i64::from(d.rfp_depth_scaling_factor), 1, 500),
            check("Razoring", d.razoring),
            spin("Razoring_MaxDepth", i64::from(d.razoring_max_depth), 1, 32),
            spin("Razoring_Depth1Bonus", i64::from(d.razoring_depth1_bonus), 0, 1_000),
            spin("Razoring_NotDepth1Bonus", i64::from(d.razoring_not_depth1_bonus), 0, 1_000),
            check("IIR", d.internal_iterative_reduction),
            spin("IIR_MinDepth", i64::from(d.iir_min_depth), 1, 32),
            check("LMP", d.late_move_pruning),
            spin("LMP_MaxDepth", i64::from(d.lmp_max_depth), 1, 32),
            spin("LMP_BaseMovesToTry", i64::from(d.lmp_base_moves_to_try), 0, 64),
            spin("LMP_MovesDepthMultiplier", i64::from(d.lmp_moves_depth_multiplier), 1, 64),
            check("HistoryOrdering", d.history_ordering),
            spin("History_MaxMoveValue", i64::from(d.history_max_move_value), 1, 65_536),
            spin("History_MaxMoveRawBonus", i64::from(d.history_max_move_raw_bonus), 1, 65_536),
            check("SEEOrdering", d.see_ordering),
            spin("SEE_BadCaptureReduction", i64::from(d.see_bad_capture_reduction), 0, 8),
            float("HardTimeBoundMultiplier", d.hard_time_bound_multiplier, 0.01, 1.0),
            float("SoftTimeBoundMultiplier", d.soft_time_bound_multiplier, 0.01, 5.0),
            spin("DefaultMovesToGo", i64::from(d.default_moves_to_go), 1, 200),
            float(
                "SoftTimeBaseIncrementMultiplier",
                d.soft_time_base_increment_multiplier,
                0.0,
                5.0,
            ),
        ]
    }

    /// Update one tunable by option name. Names match case-insensitively.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let descriptor = Self::options()
            .into_iter()
            .find(|option| option.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ConfigError::UnknownOption(name.trim().to_owned()))?;
        let value = value.trim();

        match descriptor.kind {
            OptionKind::Check => self.set_check(descriptor.name, parse_check(descriptor.name, value)?),
            OptionKind::Spin { min, max } => {
                self.set_spin(descriptor.name, parse_spin(descriptor.name, value, min, max)?)
            }
            OptionKind::Float { min, max } => {
                self.set_float(descriptor.name, parse_float(descriptor.name, value, min, max)?)
            }
        }
        Ok(())
    }

    fn set_check(&mut self, name: &str, value: bool) {
        match name {
            "Quiescence" => self.quiescence = value,
            "TranspositionTable" => self.transposition_table = value,
            "LMR" => self.lmr = value,
            "NMP" => self.null_move_pruning = value,
            "AspirationWindows" => self.aspiration_windows = value,
            "RFP" => self.reverse_futility_pruning = value,
            "Razoring" => self.razoring = value,
            "IIR" => self.internal_iterative_reduction = value,
            "LMP" => self.late_move_pruning = value,
            "HistoryOrdering" => self.history_ordering = value,
            "SEEOrdering" => self.see_ordering = value,
            _ => {}
        }
    }

    // Values reaching here are already range-checked against the descriptor,
    // so the narrowing casts cannot truncate.
    fn set_spin(&mut self, name: &str, value: i64) {
        match name {
            "Hash" => self.transposition_table_size_mb = value as usize,
            "MaxDepth" => self.max_depth = value as u8,
            "MoveOverhead" => self.move_overhead_ms = value as u64,
            "LMR_MinDepth" => self.lmr_min_depth = value as u8,
            "LMR_MinFullDepthSearchedMoves" => self.lmr_min_full_depth_searched_moves = value as usize,
            "NMP_MinDepth" => self.nmp_min_depth = value as u8,
            "NMP_BaseDepthReduction" => self.nmp_base_depth_reduction = value as u8,
            "AspirationWindow_Delta" => self.aspiration_window_delta = value as i32,
            "AspirationWindow_MinDepth" => self.aspiration_window_min_depth = value as u8,
            "RFP_MaxDepth" => self.rfp_max_depth = value as u8,
            "RFP_DepthScalingFactor" => self.rfp_depth_scaling_factor = value as i32,
            "Razoring_MaxDepth" => self.razoring_max_depth = value as u8,
            "Razoring_Depth1Bonus" => self.razoring_depth1_bonus = value as i32,
            "Razoring_NotDepth1Bonus" => self.razoring_not_depth1_bonus = value as i32,
            "IIR_MinDepth" => self.iir_min_depth = value as u8,
            "LMP_MaxDepth" => self.lmp_max_depth = value as u8,
            "LMP_BaseMovesToTry" => self.lmp_base_moves_to_try = value as i32,
            "LMP_MovesDepthMultiplier" => self.lmp_moves_depth_multiplier = value as i32,
            "History_MaxMoveValue" => self.history_max_move_value = value as i32,
            "History_MaxMoveRawBonus" => self.history_max_move_raw_bonus = value as i32,
            "SEE_BadCaptureReduction" => self.see_bad_capture_reduction = value as u8,
            "DefaultMovesToGo" => self.default_moves_to_go = value as u32,
            _ => {}
        }
    }

    fn set_float(&mut self, name: &str, value: f64) {
        match name {
            "LMR_Base" => self.lmr_base = value,
            "LMR_Divisor" => self.lmr_divisor = value,
            "HardTimeBoundMultiplier" => self.hard_time_bound_multiplier = value,
            "SoftTimeBoundMultiplier" => self.soft_time_bound_multiplier = value,
            "SoftTimeBaseIncrementMultiplier" => self.soft_time_base_increment_multiplier = value,
            _ => {}
        }
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_check(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_spin(name: &str, value: &str, min: i64, max: i64) -> Result<i64, ConfigError> {
    let parsed: i64 = value.parse().map_err(|_| invalid(name, value))?;
    if !(min..=max).contains(&parsed) {
        return Err(ConfigError::OutOfRange {
            name: name.to_owned(),
            value: parsed,
            min,
            max,
        });
    }
    Ok(parsed)
}

fn parse_float(name: &str, value: &str, min: f64, max: f64) -> Result<f64, ConfigError> {
    let parsed: f64 = value.parse().map_err(|_| invalid(name, value))?;
    if !parsed.is_finite() || parsed < min || parsed > max {
        return Err(invalid(name, value));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{OptionKind, SearchConfig, MAX_DEPTH_CEILING};
    use crate::errors::ConfigError;

    #[test]
    fn defaults_enable_every_heuristic() {
        let config = SearchConfig::default();
        assert!(config.quiescence && config.transposition_table);
        assert!(config.lmr && config.null_move_pruning && config.aspiration_windows);
        assert!(config.reverse_futility_pruning && config.razoring);
        assert!(config.internal_iterative_reduction && config.late_move_pruning);
        assert!(config.history_ordering && config.see_ordering);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.aspiration_window_delta, 20);
        assert_eq!(config.history_max_move_raw_bonus, 1_896);
    }

    #[test]
    fn plain_disables_every_heuristic_but_keeps_limits() {
        let plain = SearchConfig::plain();
        assert!(!plain.quiescence && !plain.transposition_table);
        assert!(!plain.lmr && !plain.null_move_pruning && !plain.aspiration_windows);
        assert!(!plain.reverse_futility_pruning && !plain.razoring);
        assert!(!plain.internal_iterative_reduction && !plain.late_move_pruning);
        assert!(!plain.history_ordering && !plain.see_ordering);
        assert_eq!(plain.max_depth, SearchConfig::default().max_depth);
    }

    #[test]
    fn set_option_updates_named_fields() {
        let mut config = SearchConfig::default();
        config.set_option("hash", "64").expect("Hash should accept 64");
        config.set_option("LMR", "false").expect("LMR should accept false");
        config.set_option("LMR_Base", "1.25").expect("LMR_Base should accept 1.25");
        config.set_option("RFP_DepthScalingFactor", " 90 ").expect("value is trimmed");

        assert_eq!(config.transposition_table_size_mb, 64);
        assert!(!config.lmr);
        assert!((config.lmr_base - 1.25).abs() < f64::EPSILON);
        assert_eq!(config.rfp_depth_scaling_factor, 90);
    }

    #[test]
    fn set_option_rejects_bad_input() {
        let mut config = SearchConfig::default();
        assert_eq!(
            config.set_option("Contempt", "10"),
            Err(ConfigError::UnknownOption("Contempt".to_owned()))
        );
        assert!(matches!(
            config.set_option("NMP", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set_option("MaxDepth", "500"),
            Err(ConfigError::OutOfRange { value: 500, .. })
        ));
        assert_eq!(config, SearchConfig::default());
    }

    #[test]
    fn descriptors_render_uci_lines() {
        let options = SearchConfig::options();
        let hash = options.iter().find(|o| o.name == "Hash").expect("Hash is advertised");
        assert_eq!(hash.to_string(), "option name Hash type spin default 16 min 1 max 1024");

        let lmr = options.iter().find(|o| o.name == "LMR").expect("LMR is advertised");
        assert_eq!(lmr.kind, OptionKind::Check);
        assert_eq!(lmr.to_string(), "option name LMR type check default true");
    }

    #[test]
    fn every_descriptor_round_trips_through_set_option() {
        let mut config = SearchConfig::default();
        for option in SearchConfig::options() {
            config
                .set_option(option.name, &option.default)
                .unwrap_or_else(|e| panic!("{} default should be accepted: {e}", option.name));
        }
        assert_eq!(config, SearchConfig::default());
    }

    #[test]
    fn effective_depth_is_clamped() {
        let config = SearchConfig {
            max_depth: 200,
            ..SearchConfig::default()
        };
        assert_eq!(config.effective_max_depth(), MAX_DEPTH_CEILING);
    }
}
