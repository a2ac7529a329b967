use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::core::process;
use crate::models::CatalogMatch;

/// 스테이징 디렉토리 안에서 원본 오디오 파일의 이름(확장자 제외).
const ASSET_STEM: &str = "source";

/// 매치된 항목의 오디오 스트림을 로컬 파일로 받아오는 단계.
/// 스테이징 디렉토리 안에 만든 원본 오디오 파일의 경로를 반환한다.
pub trait Downloader {
    fn download(&self, matched: &CatalogMatch, staging_dir: &Path) -> Result<PathBuf>;
}

/// `yt-dlp`로 가장 높은 비트레이트의 오디오 스트림을 받는다.
pub struct YtDlp {
    program: String,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn build_args(url: &str, staging_dir: &Path) -> Vec<String> {
        let template = staging_dir.join(format!("{}.%(ext)s", ASSET_STEM));
        vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            url.to_string(),
        ]
    }
}

impl Downloader for YtDlp {
    fn download(&self, matched: &CatalogMatch, staging_dir: &Path) -> Result<PathBuf> {
        let url = matched.watch_url();
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::build_args(&url, staging_dir));

        let output = process::run(cmd, self.timeout)?;
        let printed = output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from);

        let path = match printed {
            Some(path) if path.is_file() => path,
            _ => find_asset(staging_dir)?,
        };
        tracing::debug!(path = %path.display(), "다운로드 완료");
        Ok(path)
    }
}

/// 스테이징 디렉토리에서 `source.*` 파일을 찾는다. 정확히 하나여야 한다.
pub fn find_asset(staging_dir: &Path) -> Result<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(staging_dir)? {
        let path = entry?.path();
        let is_asset = path.is_file()
            && path.file_stem().and_then(|s| s.to_str()) == Some(ASSET_STEM)
            && !path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "part" || e == "ytdl");
        if is_asset {
            found.push(path);
        }
    }

    match found.len() {
        0 => bail!("다운로드된 파일을 찾을 수 없습니다: {}", staging_dir.display()),
        1 => Ok(found.remove(0)),
        n => bail!("다운로드된 파일이 {}개입니다: {}", n, staging_dir.display()),
    }
}
