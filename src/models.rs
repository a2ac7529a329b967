/// 플레이리스트의 트랙 하나에 대한 메타데이터.
/// 플레이리스트 리더가 만들고, 매처와 태거가 한 번씩 읽는다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub track_number: Option<u32>,
    pub year: Option<i32>,
    pub duration_ms: Option<u64>,
    pub album_art_url: Option<String>,
    pub source: String,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            title: title.into(),
            artists,
            ..Default::default()
        }
    }

    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    /// 아티스트 목록을 `", "`로 이어 붙인다. 태그와 파일명에 그대로 쓰인다.
    pub fn display_artist(&self) -> String {
        self.artists.join(", ")
    }

    pub fn display_album(&self) -> &str {
        self.album.as_deref().unwrap_or("-")
    }

    pub fn summary(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.display_artist(), self.title)
        }
    }
}

/// 플레이리스트 리더의 결과. 트랙 순서는 플레이리스트 순서와 같다.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub name: Option<String>,
    pub tracks: Vec<TrackInfo>,
}

/// 카탈로그 검색 결과 후보 하나.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    pub video_id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_secs: Option<u64>,
}

impl CatalogMatch {
    pub fn watch_url(&self) -> String {
        format!("https://music.youtube.com/watch?v={}", self.video_id)
    }

    pub fn display_duration(&self) -> String {
        match self.duration_secs {
            Some(secs) => format_duration(secs),
            None => "-".to_string(),
        }
    }
}

/// 초 단위 길이를 `m:ss` 또는 `h:mm:ss`로 표시한다.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
