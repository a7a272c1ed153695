//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, Result};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = apply_setting(&settings, key, value)?;
            updated.save()?;
            Output::success(&format!("Set {} = {}", key, value));
            Output::info(&format!(
                "Saved to {}",
                Settings::default_config_path().display()
            ));
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();

            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save()?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            // Try to open in editor
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply a dotted-path assignment like `rag.top_k = 8` to the settings.
///
/// The value is parsed with the type of the field it replaces, and the
/// updated settings must still pass validation.
fn apply_setting(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut root = toml::Value::try_from(settings)
        .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

    let parts: Vec<&str> = key.split('.').collect();
    let (field, sections) = parts
        .split_last()
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| anyhow!("Empty configuration key"))?;

    let mut node = &mut root;
    for section in sections {
        node = node
            .get_mut(section)
            .ok_or_else(|| anyhow!("Unknown configuration section: {}", section))?;
    }

    let table = node
        .as_table_mut()
        .ok_or_else(|| anyhow!("'{}' is not a configuration section", sections.join(".")))?;

    let current = table
        .get(*field)
        .ok_or_else(|| anyhow!("Unknown configuration key: {}", key))?;

    let new_value = coerce_value(current, value)
        .ok_or_else(|| anyhow!("'{}' is not a valid value for {}", value, key))?;
    table.insert((*field).to_string(), new_value);

    let updated: Settings = root
        .try_into()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    updated.validate()?;
    Ok(updated)
}

/// Parse `value` with the same type as the field's current value.
fn coerce_value(current: &toml::Value, value: &str) -> Option<toml::Value> {
    match current {
        toml::Value::String(_) => Some(toml::Value::String(value.to_string())),
        toml::Value::Integer(_) => value.parse().ok().map(toml::Value::Integer),
        toml::Value::Float(_) => value.parse().ok().map(toml::Value::Float),
        toml::Value::Boolean(_) => value.parse().ok().map(toml::Value::Boolean),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_integer_field() {
        let updated = apply_setting(&Settings::default(), "rag.top_k", "8").unwrap();
        assert_eq!(updated.rag.top_k, 8);
    }

    #[test]
    fn test_set_string_field() {
        let updated = apply_setting(&Settings::default(), "rag.model", "gpt-4o").unwrap();
        assert_eq!(updated.rag.model, "gpt-4o");
    }

    #[test]
    fn test_set_float_field() {
        let updated = apply_setting(&Settings::default(), "rag.min_score", "0.25").unwrap();
        assert!((updated.rag.min_score - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(apply_setting(&Settings::default(), "rag.nonexistent", "1").is_err());
        assert!(apply_setting(&Settings::default(), "nonexistent.model", "x").is_err());
        assert!(apply_setting(&Settings::default(), "", "x").is_err());
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        assert!(apply_setting(&Settings::default(), "rag.top_k", "lots").is_err());
    }

    #[test]
    fn test_invalid_combination_is_rejected() {
        // chunk_overlap must stay smaller than chunk_size
        assert!(apply_setting(&Settings::default(), "ingestion.chunk_overlap", "4000").is_err());
    }
}
