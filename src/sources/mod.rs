pub mod spotify;
pub mod ytmusic;

use anyhow::{bail, Result};
use url::Url;

use crate::models::{CatalogMatch, Playlist, TrackInfo};

/// 플레이리스트 메타데이터 소스 트레이트.
/// 익명 embed 페이지와 Web API 두 가지 구현이 있다.
pub trait PlaylistSource {
    fn name(&self) -> &str;
    /// 플레이리스트 ID로 트랙 목록을 순서대로 가져온다.
    fn read_playlist(&self, playlist_id: &str) -> Result<Playlist>;
    /// 트랙의 앨범 아트 이미지를 다운로드한다. URL이 없으면 None.
    fn fetch_album_art(&self, track: &TrackInfo) -> Result<Option<Vec<u8>>>;
}

/// 음악 카탈로그 검색 트레이트. 결과는 검색 엔진이 준 순서 그대로다.
pub trait CatalogSearch {
    fn search(&self, query: &str) -> Result<Vec<CatalogMatch>>;
}

/// 플레이리스트 URL, `spotify:playlist:` URI, 또는 ID 자체에서 ID를 꺼낸다.
pub fn parse_playlist_id(reference: &str) -> Result<String> {
    let reference = reference.trim();

    if let Some(id) = reference.strip_prefix("spotify:playlist:") {
        return validate_id(id);
    }

    if reference.contains("://") {
        let url = Url::parse(reference)?;
        let host = url.host_str().unwrap_or_default();
        if host != "open.spotify.com" && host != "play.spotify.com" {
            bail!("Spotify 주소가 아닙니다: {}", host);
        }
        let mut segments = url.path_segments().into_iter().flatten();
        while let Some(segment) = segments.next() {
            if segment == "playlist" {
                if let Some(id) = segments.next() {
                    return validate_id(id);
                }
            }
        }
        bail!("플레이리스트 주소가 아닙니다: {}", reference);
    }

    validate_id(reference)
}

/// Spotify ID는 22자의 base62 문자열이다.
fn validate_id(id: &str) -> Result<String> {
    if id.len() == 22 && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(id.to_string())
    } else {
        bail!("올바르지 않은 플레이리스트 ID입니다: {}", id)
    }
}
