//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use protlab_calc::ScenarioParameters;
use protlab_common::PresetConfig;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SimError};

/// Named motor-bus scenario offered to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub name: String,
    pub description: String,
    pub parameters: ScenarioParameters,
}

impl ScenarioPreset {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ScenarioParameters,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Raw preset record when deserializing catalog files.
#[derive(Debug, Deserialize)]
pub struct PresetRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub inertia_constant: f64,
    pub decay_constant: f64,
    pub load_factor: f64,
}

impl PresetRecord {
    fn into_preset(self) -> Result<ScenarioPreset> {
        let parameters = ScenarioParameters {
            inertia_constant: self.inertia_constant,
            decay_constant: self.decay_constant,
            load_factor: self.load_factor,
        };
        parameters.validate()?;
        Ok(ScenarioPreset {
            description: self.description.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            parameters,
        })
    }
}

/// Insertion-ordered set of presets; later inserts replace earlier ones with
/// the same name but keep their position.
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: IndexMap<String, ScenarioPreset>,
}

impl PresetCatalog {
    /// The stock inertia-class and load-type scenarios.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        let stock = [
            ("high-inertia", "Large machines: slow decay, wide fast-transfer window", 3.5, 2.5, 1.0),
            ("medium-inertia", "Mixed motor bus", 1.5, 1.2, 1.0),
            ("low-inertia", "Small machines: the bus slips out of phase quickly", 0.5, 0.5, 1.0),
            ("light-load", "High-inertia bus lightly loaded", 3.5, 2.5, 0.6),
            ("heavy-load", "High-inertia bus heavily loaded", 3.5, 2.5, 1.4),
        ];
        for (name, description, inertia_constant, decay_constant, load_factor) in stock {
            catalog.insert(ScenarioPreset::new(
                name,
                description,
                ScenarioParameters {
                    inertia_constant,
                    decay_constant,
                    load_factor,
                },
            ));
        }
        catalog
    }

    /// Built-in presets extended with the configured catalog file and the
    /// inline `[presets.custom]` table, in that order.
    pub fn from_config(config: &PresetConfig) -> Result<Self> {
        let mut catalog = Self::builtin();
        if let Some(path) = &config.catalog {
            catalog.extend(Self::from_path(path)?);
        }
        for (name, custom) in &config.custom {
            let preset = PresetRecord {
                name: name.clone(),
                description: custom.description.clone(),
                inertia_constant: custom.inertia_constant,
                decay_constant: custom.decay_constant,
                load_factor: custom.load_factor,
            }
            .into_preset()?;
            catalog.insert(preset);
        }
        Ok(catalog)
    }

    /// Load a catalog file: a YAML or JSON list of preset records.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let records: Vec<PresetRecord> = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => return Err(SimError::UnsupportedFormat(path.to_path_buf())),
        };
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record.into_preset()?);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, preset: ScenarioPreset) {
        self.presets.insert(preset.name.clone(), preset);
    }

    pub fn extend(&mut self, other: PresetCatalog) {
        for (_, preset) in other.presets {
            self.insert(preset);
        }
    }

    pub fn get(&self, name: &str) -> Result<&ScenarioPreset> {
        self.presets
            .get(name)
            .ok_or_else(|| SimError::UnknownPreset(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.presets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioPreset> + '_ {
        self.presets.values()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use protlab_common::config::ScenarioPresetConfig;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn builtin_catalog_is_ordered() {
        let catalog = PresetCatalog::builtin();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(
            names,
            vec!["high-inertia", "medium-inertia", "low-inertia", "light-load", "heavy-load"]
        );
        let high = catalog.get("high-inertia").unwrap();
        assert_eq!(high.parameters, ScenarioParameters::default());
    }

    #[test]
    fn unknown_preset_is_reported() {
        let catalog = PresetCatalog::builtin();
        assert!(matches!(
            catalog.get("no-such-bus"),
            Err(SimError::UnknownPreset(name)) if name == "no-such-bus"
        ));
    }

    #[test]
    fn loads_yaml_catalog() -> Result<()> {
        let mut file = Builder::new().suffix(".yaml").tempfile()?;
        writeln!(
            file,
            "- name: pump-house\n  description: Centrifugal pumps\n  inertia_constant: 0.8\n  decay_constant: 0.7\n  load_factor: 1.1"
        )?;
        file.flush()?;
        let catalog = PresetCatalog::from_path(file.path())?;
        let preset = catalog.get("pump-house")?;
        assert_eq!(preset.parameters.inertia_constant, 0.8);
        assert_eq!(preset.description, "Centrifugal pumps");
        Ok(())
    }

    #[test]
    fn loads_json_catalog_without_descriptions() -> Result<()> {
        let mut file = Builder::new().suffix(".json").tempfile()?;
        writeln!(
            file,
            r#"[{{"name":"fan-bus","inertia_constant":2.0,"decay_constant":1.0,"load_factor":0.9}}]"#
        )?;
        file.flush()?;
        let catalog = PresetCatalog::from_path(file.path())?;
        assert_eq!(catalog.get("fan-bus")?.description, "fan-bus");
        Ok(())
    }

    #[test]
    fn rejects_unknown_extension_and_bad_values() -> Result<()> {
        let file = Builder::new().suffix(".txt").tempfile()?;
        assert!(matches!(
            PresetCatalog::from_path(file.path()),
            Err(SimError::UnsupportedFormat(_))
        ));

        let mut bad = Builder::new().suffix(".json").tempfile()?;
        writeln!(
            bad,
            r#"[{{"name":"broken","inertia_constant":0.0,"decay_constant":1.0,"load_factor":1.0}}]"#
        )?;
        bad.flush()?;
        assert!(matches!(
            PresetCatalog::from_path(bad.path()),
            Err(SimError::InvalidSettings(_))
        ));
        Ok(())
    }

    #[test]
    fn config_customs_override_builtins_in_place() -> Result<()> {
        let mut config = PresetConfig::default();
        config.custom.insert(
            "medium-inertia".into(),
            ScenarioPresetConfig {
                description: None,
                inertia_constant: 1.8,
                decay_constant: 1.3,
                load_factor: 1.0,
            },
        );
        let catalog = PresetCatalog::from_config(&config)?;
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.names().nth(1), Some("medium-inertia"));
        assert_eq!(catalog.get("medium-inertia")?.parameters.inertia_constant, 1.8);
        Ok(())
    }
}
