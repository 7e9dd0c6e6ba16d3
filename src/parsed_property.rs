use std::{fmt::Display, ops::Deref, path::PathBuf};

/// A configuration value together with the layer it came from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ParsedProperty<T> {
    /// From a command line flag (parsed_value, flag_value)
    Cli(T, String),
    /// From an `ADO_GITTER_*` environment variable (parsed_value, variable_value)
    Env(T, String),
    /// From the configuration file (parsed_value, file_path, toml_value)
    File(T, PathBuf, String),
    /// Built-in default
    Default(T),
}

impl<T> ParsedProperty<T> {
    pub fn value(&self) -> &T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _, _)
            | ParsedProperty::Default(value) => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ParsedProperty::Cli(value, _)
            | ParsedProperty::Env(value, _)
            | ParsedProperty::File(value, _, _)
            | ParsedProperty::Default(value) => value,
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            ParsedProperty::Cli(..) => "cli",
            ParsedProperty::Env(..) => "env",
            ParsedProperty::File(..) => "file",
            ParsedProperty::Default(_) => "default",
        }
    }

    /// The text the value was parsed from, if it was not a default.
    pub fn original(&self) -> Option<&str> {
        match self {
            ParsedProperty::Cli(_, original)
            | ParsedProperty::Env(_, original)
            | ParsedProperty::File(_, _, original) => Some(original),
            ParsedProperty::Default(_) => None,
        }
    }

    /// Parses `raw` and tags the result with the same source as `self`.
    ///
    /// Used to turn a string property into a typed one without losing track of where the
    /// text came from.
    pub fn try_map<U, E>(&self, parse: impl FnOnce(&T) -> Result<U, E>) -> Result<ParsedProperty<U>, E> {
        let parsed = parse(self.value())?;
        Ok(match self {
            ParsedProperty::Cli(_, original) => ParsedProperty::Cli(parsed, original.clone()),
            ParsedProperty::Env(_, original) => ParsedProperty::Env(parsed, original.clone()),
            ParsedProperty::File(_, path, original) => {
                ParsedProperty::File(parsed, path.clone(), original.clone())
            }
            ParsedProperty::Default(_) => ParsedProperty::Default(parsed),
        })
    }
}

impl<T> Deref for ParsedProperty<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: Display> Display for ParsedProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value().fmt(f)
    }
}

impl<T> From<T> for ParsedProperty<T> {
    fn from(value: T) -> Self {
        ParsedProperty::Default(value)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    /// # ParsedProperty Source Tracking
    ///
    /// Tests value access and source bookkeeping for every layer.
    ///
    /// ## Test Scenario
    /// - Creates one property per source
    /// - Reads value, source name and original text
    ///
    /// ## Expected Outcome
    /// - The value is reachable through value() and Deref
    /// - Originals are kept for every source except defaults
    #[test]
    fn test_parsed_property_source_tracking() {
        let cli = ParsedProperty::Cli("org".to_string(), "--organization org".to_string());
        let env = ParsedProperty::Env("org".to_string(), "org".to_string());
        let file = ParsedProperty::File(
            "org".to_string(),
            PathBuf::from("config.toml"),
            "organization = \"org\"".to_string(),
        );
        let default = ParsedProperty::Default("org".to_string());

        for property in [&cli, &env, &file, &default] {
            assert_eq!(property.value(), "org");
            assert_eq!(&**property, "org");
        }

        assert_eq!(cli.source_name(), "cli");
        assert_eq!(env.source_name(), "env");
        assert_eq!(file.source_name(), "file");
        assert_eq!(default.source_name(), "default");

        assert_eq!(cli.original(), Some("--organization org"));
        assert_eq!(file.original(), Some("organization = \"org\""));
        assert_eq!(default.original(), None);
        assert_eq!(default.into_value(), "org");
    }

    /// # Typed Conversion Keeps the Source
    ///
    /// Tests converting a string property into a typed one.
    ///
    /// ## Test Scenario
    /// - Parses a numeric environment value
    /// - Parses an invalid file value
    ///
    /// ## Expected Outcome
    /// - The parsed property keeps the environment source and original text
    /// - A parse failure is returned unchanged
    #[test]
    fn test_try_map_keeps_source() {
        let env = ParsedProperty::Env("42".to_string(), "42".to_string());
        let parsed = env.try_map(|raw| raw.parse::<u32>()).unwrap();
        assert_eq!(parsed, ParsedProperty::Env(42, "42".to_string()));

        let file = ParsedProperty::File(
            "many".to_string(),
            PathBuf::from("config.toml"),
            "many".to_string(),
        );
        assert!(file.try_map(|raw| raw.parse::<u32>()).is_err());
    }
}
