//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Env vars are **fallback**, not override. They are only applied to fields
//! that no config file set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `VERDANT_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "VERDANT_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "VERDANT_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "VERDANT_DATA_DIR",
        field_path: "storage.path",
    },
    EnvMapping {
        var_name: "VERDANT_STORAGE_BACKEND",
        field_path: "storage.backend",
    },
    EnvMapping {
        var_name: "VERDANT_SUBMISSION_FEE",
        field_path: "registry.submission_fee",
    },
    EnvMapping {
        var_name: "VERDANT_MAX_AUDITS",
        field_path: "registry.max_audits",
    },
    EnvMapping {
        var_name: "VERDANT_REGISTRY_PRINCIPAL",
        field_path: "registry.registry_principal",
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            let keys: Vec<String> = table.keys().cloned().collect();
            for key in keys {
                if let Some(child) = table.get_mut(&key) {
                    resolve_env_references(child, env_vars);
                }
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

/// Replace `${VAR}` references in a string with their env var values.
fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = var_name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                // Malformed reference, leave as-is.
                result.push_str("${");
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Set a field in the TOML tree from a string value.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), toml_val);
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Coerce a string env var value to the TOML type of the field.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(path, "registry.submission_fee" | "registry.max_audits")
        && let Ok(i) = val.parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_apply_env_fallbacks() {
        let mut merged: toml::Value = toml::from_str("[registry]\nmax_audits = 5").unwrap();
        let mut sources = FieldSources::new();
        let env = make_env(&[("VERDANT_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 1);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "debug");
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_fallback_overrides_defaults() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);

        let env = make_env(&[("VERDANT_LOG_LEVEL", "trace")]);
        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 1);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "trace");
    }

    #[test]
    fn test_env_fallback_skips_file_values() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::User);

        let env = make_env(&[("VERDANT_LOG_LEVEL", "debug")]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "warn");
    }

    #[test]
    fn test_numeric_fields_are_coerced() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let env = make_env(&[
            ("VERDANT_SUBMISSION_FEE", "750"),
            ("VERDANT_MAX_AUDITS", "3"),
            ("VERDANT_REGISTRY_PRINCIPAL", "ST2TEST"),
        ]);

        apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(merged["registry"]["submission_fee"].as_integer(), Some(750));
        assert_eq!(merged["registry"]["max_audits"].as_integer(), Some(3));
        assert_eq!(
            merged["registry"]["registry_principal"].as_str(),
            Some("ST2TEST")
        );
    }

    #[test]
    fn test_non_numeric_value_stays_string() {
        let v = coerce_to_toml_value("registry.max_audits", "lots");
        assert_eq!(v.as_str(), Some("lots"));
    }

    #[test]
    fn test_resolve_env_references() {
        let mut val: toml::Value =
            toml::from_str("[storage]\npath = \"${DATA_ROOT}/verdant\"").unwrap();
        let env = make_env(&[("DATA_ROOT", "/srv")]);
        resolve_env_references(&mut val, &env);

        assert_eq!(val["storage"]["path"].as_str().unwrap(), "/srv/verdant");
    }

    #[test]
    fn test_resolve_env_references_unresolved() {
        let mut val: toml::Value =
            toml::from_str("[storage]\npath = \"${MISSING_VAR}\"").unwrap();
        resolve_env_references(&mut val, &HashMap::new());

        assert_eq!(val["storage"]["path"].as_str().unwrap(), "${MISSING_VAR}");
    }

    #[test]
    fn test_resolve_malformed_reference() {
        let env = make_env(&[("X", "y")]);
        assert_eq!(resolve_string_refs("a${X", &env), "a${X");
        assert_eq!(resolve_string_refs("${}", &env), "${}");
        assert_eq!(resolve_string_refs("a${}b${X}", &env), "a${}by");
        assert_eq!(resolve_string_refs("$X", &env), "$X");
    }
}
