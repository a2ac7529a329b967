use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::config::SearchConfig;
use crate::core::downloader::Downloader;
use crate::core::transcoder::Transcoder;
use crate::core::{matcher, renamer, tagger};
use crate::error::{Error, Result};
use crate::models::{Playlist, TrackInfo};
use crate::sources::{self, CatalogSearch, PlaylistSource};

/// 스테이징 디렉토리 안에서 변환 결과 파일의 이름.
const STAGED_OUTPUT: &str = "output.mp3";

/// 연속된 검색 사이에 무작위로 쉬는 시간.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchPacing {
    min: Duration,
    max: Duration,
}

impl SearchPacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    fn delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }

    fn pause(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            tracing::trace!(?delay, "검색 전 대기");
            std::thread::sleep(delay);
        }
    }
}

impl From<&SearchConfig> for SearchPacing {
    fn from(config: &SearchConfig) -> Self {
        Self::new(
            Duration::from_millis(config.delay_min_ms),
            Duration::from_millis(config.delay_max_ms),
        )
    }
}

/// 트랙 하나의 처리 결과.
#[derive(Debug)]
pub struct TrackOutcome {
    pub track: TrackInfo,
    pub result: Result<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub playlist_name: Option<String>,
    pub outcomes: Vec<TrackOutcome>,
}

impl RunSummary {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.saved()
    }
}

/// 플레이리스트 읽기부터 태그 기록까지 트랙 하나씩 순서대로 처리한다.
pub struct Pipeline {
    pub playlist_source: Box<dyn PlaylistSource>,
    pub search: Box<dyn CatalogSearch>,
    pub downloader: Box<dyn Downloader>,
    pub transcoder: Box<dyn Transcoder>,
    pub output_dir: PathBuf,
    pub pacing: SearchPacing,
}

/// 플레이리스트 참조를 해석해 트랙 목록을 가져온다. 실패하면 `PlaylistUnavailable`.
pub fn read_playlist(source: &dyn PlaylistSource, reference: &str) -> Result<Playlist> {
    let unavailable = |e: anyhow::Error| Error::PlaylistUnavailable {
        reference: reference.to_string(),
        source: e.into(),
    };

    let playlist_id = sources::parse_playlist_id(reference).map_err(unavailable)?;
    tracing::info!(source = source.name(), %playlist_id, "플레이리스트를 가져옵니다");

    let playlist = source.read_playlist(&playlist_id).map_err(unavailable)?;
    tracing::info!(
        name = playlist.name.as_deref().unwrap_or("-"),
        "트랙 {}개를 찾았습니다",
        playlist.tracks.len()
    );
    Ok(playlist)
}

impl Pipeline {
    /// 전체 실행. 치명적인 오류만 `Err`로 반환하고,
    /// 트랙별 실패는 로그를 남긴 뒤 요약에 기록하고 다음 트랙으로 넘어간다.
    pub fn run(&self, reference: &str) -> Result<RunSummary> {
        let playlist = read_playlist(self.playlist_source.as_ref(), reference)?;

        let mut summary = RunSummary {
            playlist_name: playlist.name,
            outcomes: Vec::with_capacity(playlist.tracks.len()),
        };
        if playlist.tracks.is_empty() {
            tracing::warn!("다운로드할 트랙이 없습니다");
            return Ok(summary);
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let total = playlist.tracks.len();
        let mut used_names = HashSet::new();

        for (index, track) in playlist.tracks.into_iter().enumerate() {
            if index > 0 {
                self.pacing.pause();
            }
            tracing::info!("[{}/{}] {}", index + 1, total, track.summary());

            let result = match self.process_track(&track, &mut used_names) {
                Err(e) if e.is_fatal() => return Err(e),
                result => result,
            };
            match &result {
                Ok(path) => tracing::info!(path = %path.display(), "저장했습니다"),
                Err(e) => tracing::error!(track = %track.summary(), "{}", e.report()),
            }
            summary.outcomes.push(TrackOutcome { track, result });
        }

        tracing::info!(
            "완료: 성공 {}개, 실패 {}개 ({})",
            summary.saved(),
            summary.failed(),
            self.output_dir.display()
        );
        Ok(summary)
    }

    /// 매치 → 다운로드 → 변환 → 태그 → 이동. 스테이징 디렉토리는 끝나면 지워진다.
    /// `used_names`는 이번 실행에서 이미 쓴 파일명이다.
    pub fn process_track(
        &self,
        track: &TrackInfo,
        used_names: &mut HashSet<String>,
    ) -> Result<PathBuf> {
        let matched = matcher::find_match(self.search.as_ref(), track)?;
        tracing::debug!(
            video_id = %matched.video_id,
            title = %matched.title,
            duration = %matched.display_duration(),
            "매치"
        );

        let staging = tempfile::Builder::new()
            .prefix(".spotify-dl-")
            .tempdir_in(&self.output_dir)?;

        let asset = self
            .downloader
            .download(&matched, staging.path())
            .map_err(|e| Error::DownloadFailed {
                video_id: matched.video_id.clone(),
                source: e.into(),
            })?;

        let staged = staging.path().join(STAGED_OUTPUT);
        self.transcoder
            .transcode(&asset, &staged)
            .map_err(|e| Error::TranscodeFailed {
                input: asset.clone(),
                source: e.into(),
            })?;

        let album_art = self.fetch_album_art(track);
        let tag_failed = |e: anyhow::Error| Error::TagFailed {
            path: staged.clone(),
            source: e.into(),
        };
        tagger::write_tags(&staged, track, album_art.as_deref()).map_err(tag_failed)?;
        let file_name = renamer::claim_filename(track, used_names);
        renamer::finalize(&staged, &self.output_dir, &file_name).map_err(tag_failed)
    }

    fn fetch_album_art(&self, track: &TrackInfo) -> Option<Vec<u8>> {
        match self.playlist_source.fetch_album_art(track) {
            Ok(art) => art,
            Err(e) => {
                tracing::warn!("앨범 아트 없이 진행합니다: {:#}", e);
                None
            }
        }
    }
}
