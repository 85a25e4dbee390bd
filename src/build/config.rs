//! Build configuration for the interpreter's configure step
//!
//! A [`BuildConfig`] is an ordered list of flags handed to the configure tool
//! verbatim. Presets reproduce the performance profiles the interpreters ship
//! with; anything else is appended by the caller.

use std::fmt;

/// A single configure-step flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFlag {
    /// `-D<key>=<value>`
    Define { key: String, value: String },
    /// A bare switch passed as-is (e.g. `-Wno-dev`)
    Switch(String),
}

impl BuildFlag {
    pub fn define(key: impl Into<String>, value: impl Into<String>) -> Self {
        BuildFlag::Define {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `KEY=VALUE` pair as given on the command line.
    pub fn parse_define(raw: &str) -> Result<Self, String> {
        let raw = raw.strip_prefix("-D").unwrap_or(raw);
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(BuildFlag::define(key.trim(), value.trim())),
            _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
        }
    }

    /// Render as a configure-tool argument
    pub fn to_arg(&self) -> String {
        match self {
            BuildFlag::Define { key, value } => format!("-D{}={}", key, value),
            BuildFlag::Switch(s) => s.clone(),
        }
    }
}

impl fmt::Display for BuildFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_arg())
    }
}

/// ON/OFF value for boolean configure options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl From<bool> for Toggle {
    fn from(b: bool) -> Self {
        if b { Toggle::On } else { Toggle::Off }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::On => write!(f, "ON"),
            Toggle::Off => write!(f, "OFF"),
        }
    }
}

/// Interpreter variants with a known performance profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EnginePreset {
    /// Axeon engine (JIT enabled by default)
    #[default]
    Axeon,
    /// KIO engine (JIT disabled by default)
    Kio,
}

impl EnginePreset {
    /// Prefix of the engine's CMake options
    pub fn option_prefix(self) -> &'static str {
        match self {
            EnginePreset::Axeon => "AXEON",
            EnginePreset::Kio => "KIO",
        }
    }

    /// Name of the executable the build produces
    pub fn binary_name(self) -> &'static str {
        match self {
            EnginePreset::Axeon => "axeon",
            EnginePreset::Kio => "kio",
        }
    }

    /// Extension of the engine's script files, dot included
    pub fn script_extension(self) -> &'static str {
        match self {
            EnginePreset::Axeon => ".axe",
            EnginePreset::Kio => ".kio",
        }
    }

    pub fn jit_default(self) -> bool {
        matches!(self, EnginePreset::Axeon)
    }

    /// Release build with LTO, native arch and fast-math enabled.
    pub fn performance_config(self, jit: Option<bool>, lsp: bool) -> BuildConfig {
        let p = self.option_prefix();
        let jit = Toggle::from(jit.unwrap_or_else(|| self.jit_default()));

        BuildConfig::builder()
            .define("CMAKE_BUILD_TYPE", "Release")
            .define(format!("{p}_ENABLE_LTO"), Toggle::On.to_string())
            .define(format!("{p}_ENABLE_NATIVE_ARCH"), Toggle::On.to_string())
            .define(format!("{p}_ENABLE_FAST_MATH"), Toggle::On.to_string())
            .define(format!("{p}_ENABLE_JIT"), jit.to_string())
            .define(format!("{p}_BUILD_LSP"), Toggle::from(lsp).to_string())
            .build()
    }
}

impl fmt::Display for EnginePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary_name())
    }
}

/// Ordered, immutable set of configure flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    flags: Vec<BuildFlag>,
}

impl BuildConfig {
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::default()
    }

    pub fn flags(&self) -> &[BuildFlag] {
        &self.flags
    }

    /// Flags rendered as configure-tool arguments, in insertion order
    pub fn to_args(&self) -> Vec<String> {
        self.flags.iter().map(BuildFlag::to_arg).collect()
    }

    /// A copy of this config with `extra` appended after the existing flags.
    pub fn extended(&self, extra: impl IntoIterator<Item = BuildFlag>) -> BuildConfig {
        let mut flags = self.flags.clone();
        flags.extend(extra);
        BuildConfig { flags }
    }
}

/// Builder for [`BuildConfig`]
#[derive(Debug, Default)]
pub struct BuildConfigBuilder {
    flags: Vec<BuildFlag>,
}

impl BuildConfigBuilder {
    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.push(BuildFlag::define(key, value));
        self
    }

    pub fn switch(mut self, switch: impl Into<String>) -> Self {
        self.flags.push(BuildFlag::Switch(switch.into()));
        self
    }

    pub fn flag(mut self, flag: BuildFlag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn build(self) -> BuildConfig {
        BuildConfig { flags: self.flags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axeon_performance_profile() {
        let config = EnginePreset::Axeon.performance_config(None, false);
        assert_eq!(
            config.to_args(),
            vec![
                "-DCMAKE_BUILD_TYPE=Release",
                "-DAXEON_ENABLE_LTO=ON",
                "-DAXEON_ENABLE_NATIVE_ARCH=ON",
                "-DAXEON_ENABLE_FAST_MATH=ON",
                "-DAXEON_ENABLE_JIT=ON",
                "-DAXEON_BUILD_LSP=OFF",
            ]
        );
    }

    #[test]
    fn test_kio_disables_jit_by_default() {
        let config = EnginePreset::Kio.performance_config(None, false);
        assert!(config.to_args().contains(&"-DKIO_ENABLE_JIT=OFF".to_string()));

        let forced = EnginePreset::Kio.performance_config(Some(true), true);
        assert!(forced.to_args().contains(&"-DKIO_ENABLE_JIT=ON".to_string()));
        assert!(forced.to_args().contains(&"-DKIO_BUILD_LSP=ON".to_string()));
    }

    #[test]
    fn test_extended_keeps_order() {
        let base = BuildConfig::builder().define("A", "1").switch("-Wno-dev").build();
        let extended = base.extended([BuildFlag::define("B", "2")]);
        assert_eq!(extended.to_args(), vec!["-DA=1", "-Wno-dev", "-DB=2"]);
        assert_eq!(base.flags().len(), 2);
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(
            BuildFlag::parse_define("AXEON_ENABLE_JIT=OFF").unwrap(),
            BuildFlag::define("AXEON_ENABLE_JIT", "OFF")
        );
        assert_eq!(
            BuildFlag::parse_define("-DCMAKE_BUILD_TYPE=Debug").unwrap(),
            BuildFlag::define("CMAKE_BUILD_TYPE", "Debug")
        );
        assert!(BuildFlag::parse_define("NOVALUE").is_err());
        assert!(BuildFlag::parse_define("=x").is_err());
    }
}
