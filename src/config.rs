use a5200_core::hardware::{MachineConfig, MachineType};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MachineKind {
    #[serde(rename = "5200")]
    #[default]
    Atari5200,
    #[serde(rename = "800-os-a")]
    Atari800OsA,
    #[serde(rename = "800-os-b")]
    Atari800OsB,
    #[serde(rename = "xl-xe")]
    XlXe,
}

impl From<MachineKind> for MachineType {
    fn from(kind: MachineKind) -> Self {
        match kind {
            MachineKind::Atari5200 => MachineType::Atari5200,
            MachineKind::Atari800OsA => MachineType::Atari800OsA,
            MachineKind::Atari800OsB => MachineType::Atari800OsB,
            MachineKind::XlXe => MachineType::XlXe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub machine: MachineKind,
    pub rtime8: bool,
    pub basic_rom: Option<PathBuf>,
    pub basic_enabled: bool,
    pub ram_kb: u32,
    pub save_verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            machine: MachineKind::default(),
            rtime8: true,
            basic_rom: None,
            basic_enabled: true,
            ram_kb: 16,
            save_verbose: false,
        }
    }
}

impl Config {
    /// Build the core configuration, loading the BASIC image if one is set.
    pub fn to_machine_config(&self) -> std::io::Result<MachineConfig> {
        let basic_rom = match &self.basic_rom {
            Some(path) => Some(std::fs::read(path)?.into()),
            None => None,
        };
        Ok(MachineConfig {
            machine: self.machine.into(),
            rtime8: self.rtime8,
            basic_rom,
            basic_enabled: self.basic_enabled,
            ram_kb: self.ram_kb,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("a5200").join("a5200.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("a5200").join("a5200.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("a5200")
            .join("a5200.toml");
    }

    PathBuf::from("a5200.toml")
}

pub fn load_from_file(path: &PathBuf) -> Config {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return Config::default(),
    };

    match toml::from_str::<Config>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            Config::default()
        }
    }
}

pub fn save_to_file(path: &PathBuf, cfg: &Config) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(cfg).unwrap_or_else(|_| String::new());
    std::fs::write(path, text)
}
