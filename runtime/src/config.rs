//! Loading and validation of encounter configuration files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use barrage_core::EncounterConfig;
use thiserror::Error;

/// Errors raised while loading or validating an encounter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file `{path}`")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid TOML for an encounter.
    #[error("failed to parse encounter configuration")]
    Parse(#[from] toml::de::Error),
    /// The roster defines no stage at all.
    #[error("the stage roster is empty")]
    EmptyRoster,
    /// A stage would never spawn a hostile and could never be cleared by play.
    #[error("stage {stage} spawns no hostiles")]
    EmptyStage {
        /// One-based stage number.
        stage: u32,
    },
    /// A spawn group asks for zero hostiles.
    #[error("stage {stage} group {group} has a count of zero")]
    ZeroCount {
        /// One-based stage number.
        stage: u32,
        /// Zero-based index of the group within the stage.
        group: usize,
    },
    /// The power table cannot describe every reachable level.
    #[error("power table needs at least {required} thresholds for max power {max_power}, found {found}")]
    PowerTable {
        /// Configured maximum power level.
        max_power: u32,
        /// Number of thresholds required.
        required: usize,
        /// Number of thresholds configured.
        found: usize,
    },
    /// The playfield has no area or a negative exit margin.
    #[error("playfield must have a positive size and a non-negative exit margin, found {width}x{height} with margin {exit_margin}")]
    Playfield {
        /// Configured width.
        width: f32,
        /// Configured height.
        height: f32,
        /// Configured exit margin.
        exit_margin: f32,
    },
    /// A cadence that drives a repeating timer is zero.
    #[error("`{name}` must be greater than zero")]
    ZeroInterval {
        /// Dotted path of the offending setting.
        name: &'static str,
    },
}

/// Reads, parses and validates the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<EncounterConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parses and validates configuration text. Missing values take their defaults.
pub fn parse_config(text: &str) -> Result<EncounterConfig, ConfigError> {
    let config: EncounterConfig = toml::from_str(text)?;
    validate(&config)?;
    Ok(config)
}

/// Checks the invariants the encounter relies on.
pub fn validate(config: &EncounterConfig) -> Result<(), ConfigError> {
    let stages = config.stages.stages();
    if stages.is_empty() {
        return Err(ConfigError::EmptyRoster);
    }

    for (stage, definition) in (1u32..).zip(stages) {
        if definition.spawns.is_empty() {
            return Err(ConfigError::EmptyStage { stage });
        }
        if let Some(group) = definition.spawns.iter().position(|group| group.count == 0) {
            return Err(ConfigError::ZeroCount { stage, group });
        }
    }

    let playfield = &config.playfield;
    let sized = playfield.width > 0.0 && playfield.height > 0.0;
    let margin = playfield.exit_margin >= 0.0;
    if !sized || !margin {
        return Err(ConfigError::Playfield {
            width: playfield.width,
            height: playfield.height,
            exit_margin: playfield.exit_margin,
        });
    }

    let player = &config.player;
    let required = player.max_power as usize;
    if player.max_power == 0 || player.power_thresholds.len() < required {
        return Err(ConfigError::PowerTable {
            max_power: player.max_power,
            required: required.max(1),
            found: player.power_thresholds.len(),
        });
    }

    let intervals = [
        ("player.fire_interval_ms", player.fire_interval_ms),
        ("director.spawn_interval_ms", config.director.spawn_interval_ms),
        ("patterns.normal.shot_interval_ms", config.patterns.normal.shot_interval_ms),
        ("patterns.multi.burst_interval_ms", config.patterns.multi.burst_interval_ms),
    ];
    if let Some(&(name, _)) = intervals.iter().find(|(_, millis)| *millis == 0) {
        return Err(ConfigError::ZeroInterval { name });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_the_default_encounter() {
        let config = parse_config("").expect("defaults are valid");
        assert_eq!(config, EncounterConfig::default());
    }

    #[test]
    fn rejects_zero_counts() {
        let error = parse_config(
            r#"
            [[stages]]
            spawns = [{ pattern = "normal", count = 3 }, { pattern = "aim", count = 0 }]
            "#,
        )
        .expect_err("zero count must be rejected");

        assert!(matches!(error, ConfigError::ZeroCount { stage: 1, group: 1 }));
    }

    #[test]
    fn rejects_an_empty_roster() {
        let error = parse_config("stages = []").expect_err("empty roster must be rejected");
        assert!(matches!(error, ConfigError::EmptyRoster));
    }

    #[test]
    fn rejects_short_power_tables() {
        let error = parse_config(
            r#"
            [player]
            max_power = 4
            power_thresholds = [0, 50]
            "#,
        )
        .expect_err("short table must be rejected");

        assert!(matches!(
            error,
            ConfigError::PowerTable {
                required: 4,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn rejects_degenerate_playfields() {
        for text in [
            "[playfield]\nwidth = 0.0",
            "[playfield]\nheight = -600.0",
            "[playfield]\nexit_margin = -1.0",
        ] {
            let error = parse_config(text).expect_err("degenerate playfield must be rejected");
            assert!(matches!(error, ConfigError::Playfield { .. }), "{text}");
        }
    }

    #[test]
    fn rejects_zero_spawn_interval() {
        let error = parse_config("[director]\nspawn_interval_ms = 0")
            .expect_err("zero interval must be rejected");
        assert_eq!(
            error.to_string(),
            "`director.spawn_interval_ms` must be greater than zero"
        );
    }

    #[test]
    fn unknown_pattern_tokens_fail_to_parse() {
        let error = parse_config(
            r#"
            [[stages]]
            spawns = [{ pattern = "spiral", count = 3 }]
            "#,
        )
        .expect_err("unknown token must be rejected");
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
