use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl SpotifyConfig {
    pub fn is_configured(&self) -> bool {
        self.client_id.as_ref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_ref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    pub bitrate_kbps: u32,
    pub ytdlp: String,
    pub ffmpeg: String,
    /// 외부 도구 한 번 실행에 허용하는 최대 시간(초).
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            bitrate_kbps: 256,
            ytdlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            timeout_secs: 600,
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 연속된 검색 사이의 대기 시간 범위(밀리초).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: 1000,
            delay_max_ms: 3000,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spotify-dl")
        .join("config.toml")
}

/// 설정 파일을 읽는다. 파일이 없으면 기본값을 쓰고,
/// 읽기나 파싱에 실패하면 경고를 남기고 기본값을 쓴다.
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match read_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("설정 파일을 무시합니다 ({}): {:#}", path.display(), e);
            Config::default()
        }
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).context("설정 파일을 읽을 수 없습니다")?;
    toml::from_str(&content).context("설정 파일 형식이 올바르지 않습니다")
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.toml"));
        assert_eq!(config, Config::default());
        assert_eq!(config.download.bitrate_kbps, 256);
        assert!(!config.spotify.is_configured());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[download]\nbitrate_kbps = 192\n\n[search]\ndelay_max_ms = 0\n",
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.download.bitrate_kbps, 192);
        assert_eq!(config.download.ytdlp, "yt-dlp");
        assert_eq!(config.search.delay_min_ms, 1000);
        assert_eq!(config.search.delay_max_ms, 0);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[download\n").unwrap();
        assert_eq!(load_config(&path), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.spotify = SpotifyConfig {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
        };

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path);
        assert!(loaded.spotify.is_configured());
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_empty_credentials_not_configured() {
        let cfg = SpotifyConfig {
            client_id: Some(String::new()),
            client_secret: Some("secret".to_string()),
        };
        assert!(!cfg.is_configured());
    }
}
