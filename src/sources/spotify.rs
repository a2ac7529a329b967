use anyhow::{bail, Context, Result};
use base64::Engine;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::config::SpotifyConfig;
use crate::models::{Playlist, TrackInfo};
use crate::sources::PlaylistSource;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 설정에 자격증명이 있으면 Web API 클라이언트를, 없으면 익명 embed 클라이언트를 만든다.
pub fn from_config(config: &SpotifyConfig) -> Result<Box<dyn PlaylistSource>> {
    if config.is_configured() {
        Ok(Box::new(SpotifyClient::new(config)?))
    } else {
        Ok(Box::new(SpotifyEmbedClient::new()?))
    }
}

/// 인증 없이 공개 embed 페이지를 파싱하는 클라이언트.
/// embed 페이지에는 앨범 정보가 없으므로 album은 항상 None이다.
pub struct SpotifyEmbedClient {
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct NextData {
    props: NextProps,
}

#[derive(Deserialize)]
struct NextProps {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Deserialize)]
struct PageProps {
    state: Option<EmbedState>,
}

#[derive(Deserialize)]
struct EmbedState {
    data: EmbedData,
}

#[derive(Deserialize)]
struct EmbedData {
    entity: EmbedEntity,
}

#[derive(Deserialize)]
struct EmbedEntity {
    name: Option<String>,
    #[serde(rename = "trackList", default)]
    track_list: Vec<EmbedTrack>,
}

#[derive(Deserialize)]
struct EmbedTrack {
    uri: Option<String>,
    title: String,
    #[serde(default)]
    subtitle: String,
    duration: Option<u64>,
    #[serde(rename = "entityType")]
    entity_type: Option<String>,
}

impl EmbedTrack {
    fn is_track(&self) -> bool {
        let episode_uri = self
            .uri
            .as_deref()
            .is_some_and(|u| u.starts_with("spotify:episode:"));
        let episode_type = self.entity_type.as_deref() == Some("episode");
        !episode_uri && !episode_type
    }
}

impl SpotifyEmbedClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Spotify HTTP 클라이언트 생성에 실패했습니다")?;

        Ok(Self { client })
    }

    /// embed 페이지 HTML의 `__NEXT_DATA__` 스크립트에서 트랙 목록을 꺼낸다.
    fn parse_embed_html(html: &str) -> Result<Playlist> {
        let document = Html::parse_document(html);
        let script_sel = Selector::parse("script#__NEXT_DATA__").unwrap();

        let json = document
            .select(&script_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .context("embed 페이지에 플레이리스트 데이터가 없습니다")?;

        let data: NextData =
            serde_json::from_str(&json).context("embed 데이터 파싱에 실패했습니다")?;
        let entity = data
            .props
            .page_props
            .state
            .context("embed 데이터에 플레이리스트 상태가 없습니다")?
            .data
            .entity;

        let mut tracks = Vec::with_capacity(entity.track_list.len());
        for item in entity.track_list {
            if !item.is_track() {
                tracing::debug!(title = %item.title, "트랙이 아닌 항목을 건너뜁니다");
                continue;
            }
            let artists = split_artists(&item.subtitle);
            tracks.push(TrackInfo {
                duration_ms: item.duration,
                source: "spotify-embed".to_string(),
                ..TrackInfo::new(item.title, artists)
            });
        }

        Ok(Playlist {
            name: entity.name,
            tracks,
        })
    }
}

/// embed 페이지의 subtitle은 `"A, B"` 형식이며 공백 대신 NBSP가 올 수도 있다.
/// 구분자가 쉼표뿐이라 이름에 쉼표가 들어간 아티스트(`"Tyler, The Creator"`)는 둘로 나뉜다.
/// 정확한 아티스트 목록이 필요하면 Web API 자격증명을 설정한다.
fn split_artists(subtitle: &str) -> Vec<String> {
    subtitle
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl PlaylistSource for SpotifyEmbedClient {
    fn name(&self) -> &str {
        "Spotify (embed)"
    }

    fn read_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let url = format!("https://open.spotify.com/embed/playlist/{}", playlist_id);

        let html = self
            .client
            .get(&url)
            .send()
            .context("Spotify 연결에 실패했습니다")?
            .error_for_status()
            .context("Spotify embed 페이지 요청이 실패했습니다")?
            .text()
            .context("Spotify embed 페이지 읽기에 실패했습니다")?;

        Self::parse_embed_html(&html)
    }

    fn fetch_album_art(&self, track: &TrackInfo) -> Result<Option<Vec<u8>>> {
        download_image(&self.client, track)
    }
}

/// Client Credentials 인증을 쓰는 Spotify Web API 클라이언트.
/// 앨범, 트랙 번호, 발매 연도, 앨범 아트까지 가져온다.
pub struct SpotifyClient {
    client: reqwest::blocking::Client,
    access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ApiPlaylist {
    name: Option<String>,
    tracks: TracksPage,
}

#[derive(Deserialize)]
struct TracksPage {
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: Option<SpotifyAlbum>,
    track_number: Option<u32>,
    duration_ms: Option<u64>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    name: String,
    release_date: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
    width: Option<u32>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .as_ref()
            .context("Spotify client_id가 설정되지 않았습니다")?;
        let client_secret = config
            .client_secret
            .as_ref()
            .context("Spotify client_secret가 설정되지 않았습니다")?;

        let client = reqwest::blocking::Client::new();
        let access_token = Self::authenticate(&client, client_id, client_secret)?;

        Ok(Self {
            client,
            access_token,
        })
    }

    fn authenticate(
        client: &reqwest::blocking::Client,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String> {
        let credentials = format!("{}:{}", client_id, client_secret);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);

        let resp: TokenResponse = client
            .post("https://accounts.spotify.com/api/token")
            .header("Authorization", format!("Basic {}", encoded))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .context("Spotify 연결에 실패했습니다")?
            .error_for_status()
            .context("Spotify 인증에 실패했습니다. client_id와 client_secret를 확인하세요.")?
            .json()
            .context("Spotify 토큰 응답 파싱에 실패했습니다")?;

        Ok(resp.access_token)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .context("Spotify 요청에 실패했습니다")?
            .error_for_status()
            .context("Spotify API 요청이 실패했습니다")?
            .json()
            .context("Spotify API 응답 파싱에 실패했습니다")
    }

    fn parse_year(release_date: &Option<String>) -> Option<i32> {
        release_date
            .as_ref()
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse().ok())
    }

    /// 에피소드나 삭제된 트랙이면 None을 반환한다.
    fn convert_item(item: PlaylistItem) -> Option<TrackInfo> {
        let track = item.track?;
        if track.kind.as_deref().is_some_and(|k| k != "track") || track.name.is_empty() {
            return None;
        }

        let album = track.album;
        let album_art_url = album.as_ref().and_then(|a| {
            a.images
                .iter()
                .max_by_key(|img| img.width.unwrap_or(0))
                .map(|img| img.url.clone())
        });

        Some(TrackInfo {
            title: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album_artist: album
                .as_ref()
                .and_then(|a| a.artists.first())
                .map(|a| a.name.clone()),
            year: album.as_ref().and_then(|a| Self::parse_year(&a.release_date)),
            album: album.map(|a| a.name),
            track_number: track.track_number,
            duration_ms: track.duration_ms,
            album_art_url,
            source: "spotify".to_string(),
        })
    }

    fn collect_page(page: TracksPage, tracks: &mut Vec<TrackInfo>) -> Option<String> {
        for item in page.items {
            match Self::convert_item(item) {
                Some(track) => tracks.push(track),
                None => tracing::debug!("트랙이 아닌 항목을 건너뜁니다"),
            }
        }
        page.next
    }
}

impl PlaylistSource for SpotifyClient {
    fn name(&self) -> &str {
        "Spotify"
    }

    fn read_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let url = format!("https://api.spotify.com/v1/playlists/{}", playlist_id);
        let playlist: ApiPlaylist = self.get_json(&url)?;

        let mut tracks = Vec::new();
        let mut next = Self::collect_page(playlist.tracks, &mut tracks);
        while let Some(url) = next {
            tracing::debug!(%url, "다음 페이지를 가져옵니다");
            let page: TracksPage = self.get_json(&url)?;
            next = Self::collect_page(page, &mut tracks);
        }

        Ok(Playlist {
            name: playlist.name,
            tracks,
        })
    }

    fn fetch_album_art(&self, track: &TrackInfo) -> Result<Option<Vec<u8>>> {
        download_image(&self.client, track)
    }
}

fn download_image(
    client: &reqwest::blocking::Client,
    track: &TrackInfo,
) -> Result<Option<Vec<u8>>> {
    let Some(url) = track.album_art_url.as_ref() else {
        return Ok(None);
    };

    let data = client
        .get(url)
        .send()
        .context("앨범 아트 다운로드에 실패했습니다")?
        .error_for_status()?
        .bytes()?
        .to_vec();

    if data.is_empty() {
        bail!("앨범 아트가 비어 있습니다");
    }
    Ok(Some(data))
}
