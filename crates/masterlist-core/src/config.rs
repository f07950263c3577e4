//! Configuration for masterlist-core
//!
//! Groups the parameters of duplicate removal and merging so a pipeline can
//! be described in one TOML or JSON document.

use serde::{Deserialize, Serialize};

use crate::dedupe::{DedupeOptions, FLAG_CLEANED};
use crate::error::{MasterlistError, MasterlistResult};
use crate::merge::{MergeOptions, DEC_COL, RA_COL};
use crate::sky::{Angle, DEFAULT_RADIUS_ARCSEC};

/// Pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterlistConfig {
    /// Duplicate removal settings
    pub dedupe: DedupeConfig,
    /// Merge settings
    pub merge: MergeConfig,
}

/// Duplicate removal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Duplicate radius in arcsec
    pub radius_arcsec: f64,
    pub ra_col: String,
    pub dec_col: String,
    /// Sort keys deciding which duplicate survives
    pub sort_keys: Vec<String>,
    pub reverse: bool,
    /// Flag column added to the output
    pub flag_name: String,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            radius_arcsec: DEFAULT_RADIUS_ARCSEC,
            ra_col: RA_COL.to_string(),
            dec_col: DEC_COL.to_string(),
            sort_keys: Vec::new(),
            reverse: false,
            flag_name: FLAG_CLEANED.to_string(),
        }
    }
}

/// Merge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Association radius in arcsec
    pub radius_arcsec: f64,
    /// Position columns of the catalogue being merged in
    pub ra_col_2: String,
    pub dec_col_2: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            radius_arcsec: DEFAULT_RADIUS_ARCSEC,
            ra_col_2: RA_COL.to_string(),
            dec_col_2: DEC_COL.to_string(),
        }
    }
}

impl From<&DedupeConfig> for DedupeOptions {
    fn from(config: &DedupeConfig) -> Self {
        DedupeOptions {
            ra_col: config.ra_col.clone(),
            dec_col: config.dec_col.clone(),
            radius: Angle::from_arcsec(config.radius_arcsec),
            sort_keys: config.sort_keys.clone(),
            reverse: config.reverse,
            flag_name: config.flag_name.clone(),
        }
    }
}

impl From<&MergeConfig> for MergeOptions {
    fn from(config: &MergeConfig) -> Self {
        MergeOptions::new(
            config.ra_col_2.clone(),
            config.dec_col_2.clone(),
            Angle::from_arcsec(config.radius_arcsec),
        )
    }
}

impl MasterlistConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    ///
    /// A zero radius is allowed (it matches nothing); negative or
    /// non-finite radii are rejected.
    pub fn validate(&self) -> MasterlistResult<()> {
        check_radius("dedupe.radius_arcsec", self.dedupe.radius_arcsec)?;
        check_radius("merge.radius_arcsec", self.merge.radius_arcsec)?;

        for (field, value) in [
            ("dedupe.ra_col", &self.dedupe.ra_col),
            ("dedupe.dec_col", &self.dedupe.dec_col),
            ("merge.ra_col_2", &self.merge.ra_col_2),
            ("merge.dec_col_2", &self.merge.dec_col_2),
        ] {
            if value.trim().is_empty() {
                return Err(MasterlistError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }

        if !self.dedupe.flag_name.contains("flag") {
            return Err(MasterlistError::InvalidConfig(format!(
                "dedupe.flag_name '{}' must contain 'flag'",
                self.dedupe.flag_name
            )));
        }

        Ok(())
    }
}

fn check_radius(field: &str, value: f64) -> MasterlistResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MasterlistError::InvalidConfig(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MasterlistConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dedupe.flag_name, "flag_cleaned");
        assert_eq!(config.merge.radius_arcsec, 0.4);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = MasterlistConfig::from_toml(
            r#"
            [dedupe]
            sort_keys = ["merr_ap_irac_i1"]
            reverse = true

            [merge]
            ra_col_2 = "servs_ra"
            dec_col_2 = "servs_dec"
            radius_arcsec = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.dedupe.sort_keys, vec!["merr_ap_irac_i1"]);
        assert_eq!(config.dedupe.radius_arcsec, 0.4);
        assert_eq!(config.merge.ra_col_2, "servs_ra");

        let options = MergeOptions::from(&config.merge);
        assert!((options.radius.arcsec() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_toml_and_json_roundtrip() {
        let mut config = MasterlistConfig::default();
        config.dedupe.sort_keys = vec!["mag".to_string()];

        let toml = config.to_toml().unwrap();
        assert_eq!(MasterlistConfig::from_toml(&toml).unwrap(), config);

        let json = config.to_json().unwrap();
        assert_eq!(MasterlistConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_radius() {
        let mut config = MasterlistConfig::default();
        config.merge.radius_arcsec = -1.0;
        assert!(config.validate().is_err());

        config.merge.radius_arcsec = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_flag_name() {
        let mut config = MasterlistConfig::default();
        config.dedupe.flag_name = "cleaned".to_string();
        assert!(matches!(
            config.validate(),
            Err(MasterlistError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dedupe_options_from_config() {
        let config = DedupeConfig {
            sort_keys: vec!["snr".to_string()],
            reverse: true,
            ..DedupeConfig::default()
        };
        let options = DedupeOptions::from(&config);
        assert_eq!(options.sort_keys, vec!["snr"]);
        assert!(options.reverse);
        assert_eq!(options.flag_name, FLAG_CLEANED);
    }
}
