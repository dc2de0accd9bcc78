use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field separator of the marker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Space,
    Tab,
    #[default]
    Comma,
    Colon,
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Space => b' ',
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
            Delimiter::Colon => b':',
            Delimiter::Semicolon => b';',
        }
    }
}

/// Describer the imported markers are passed off as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DescriberType {
    #[default]
    Cctag3,
    Cctag4,
}

impl DescriberType {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriberType::Cctag3 => "cctag3",
            DescriberType::Cctag4 => "cctag4",
        }
    }
}

impl fmt::Display for DescriberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Fatal,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    /// `log` has no fatal level, so fatal and error share `Error`.
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Fatal | Verbosity::Error => log::LevelFilter::Error,
            Verbosity::Warning => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Skip the 128-byte indicator block and write `0.matches.txt` directly.
    pub bypass_limit: bool,
    pub describer_type: DescriberType,
    pub delimiter: Delimiter,
    pub verbosity: Verbosity,
    pub parallel: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            bypass_limit: false,
            describer_type: DescriberType::Cctag3,
            delimiter: Delimiter::Comma,
            verbosity: Verbosity::Info,
            parallel: false,
        }
    }
}
