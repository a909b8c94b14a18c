use std::path::PathBuf;
use std::{fs, io};

use serde::Deserialize;

/// Server configuration, read from YAML.
///
/// # Example
/// ```yaml
/// address: 127.0.0.1:8080
/// threads: 8
/// users:
///   - username: alice
///     token: alice-token
///   - username: bob
/// games:
///   - name: casual
///     white: alice
///     black: bob
///   - name: endgame study
///     fen: 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1
/// ```
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub address: String,
    /// Worker threads that run commands. Connections have their own reader threads.
    pub threads: usize,
    pub users: Vec<UserConfig>,
    pub games: Vec<GameConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub username: String,
    /// Fixed auth token. A random one is issued when absent.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    pub name: String,
    #[serde(default)]
    pub white: Option<String>,
    #[serde(default)]
    pub black: Option<String>,
    /// Starting position, the standard one when absent.
    #[serde(default)]
    pub fen: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".into(),
            threads: 8,
            users: vec![
                UserConfig {
                    username: "white".into(),
                    token: None,
                },
                UserConfig {
                    username: "black".into(),
                    token: None,
                },
            ],
            games: vec![GameConfig {
                name: "casual".into(),
                white: Some("white".into()),
                black: Some("black".into()),
                fen: None,
            }],
        }
    }
}

impl Config {
    /// Load from `path`. A missing path or file yields the defaults.
    pub fn load(path: Option<&PathBuf>) -> io::Result<Self> {
        match path {
            Some(path) if path.exists() => Self::from_yaml(&fs::read_to_string(path)?),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_yaml(content: &str) -> io::Result<Self> {
        serde_yaml::from_str(content).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
