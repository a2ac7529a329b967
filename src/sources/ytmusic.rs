use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::models::CatalogMatch;
use crate::sources::CatalogSearch;

const SEARCH_URL: &str = "https://music.youtube.com/youtubei/v1/search?prettyPrint=false";
const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20250203.01.00";
/// 검색 결과를 "노래"로 한정하는 필터 파라미터.
const SONGS_FILTER: &str = "EgWKAQIIAWoMEA4QChADEAQQCRAF";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// YouTube Music InnerTube 검색 클라이언트. 인증 없이 동작한다.
pub struct YtMusicClient {
    client: reqwest::blocking::Client,
}

impl YtMusicClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("YouTube Music HTTP 클라이언트 생성에 실패했습니다")?;

        Ok(Self { client })
    }

    fn request_body(query: &str) -> Value {
        json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "hl": "en",
                    "gl": "US",
                }
            },
            "query": query,
            "params": SONGS_FILTER,
        })
    }

    /// 검색 응답에서 후보를 응답 순서대로 꺼낸다.
    /// 상단 결과 카드와 노래 목록을 모두 보며, "이것을 찾으셨나요" 섹션은 무시한다.
    fn parse_response(data: &Value) -> Vec<CatalogMatch> {
        let sections = data
            .pointer("/contents/tabbedSearchResultsRenderer/tabs/0/tabRenderer/content/sectionListRenderer/contents")
            .and_then(Value::as_array);

        let mut results = Vec::new();
        for section in sections.into_iter().flatten() {
            if let Some(card) = section.get("musicCardShelfRenderer") {
                results.extend(parse_card(card));
            } else if let Some(shelf) = section.get("musicShelfRenderer") {
                let items = shelf.get("contents").and_then(Value::as_array);
                results.extend(
                    items
                        .into_iter()
                        .flatten()
                        .filter_map(|item| item.get("musicResponsiveListItemRenderer"))
                        .filter_map(parse_list_item),
                );
            }
        }
        results
    }
}

impl CatalogSearch for YtMusicClient {
    fn search(&self, query: &str) -> Result<Vec<CatalogMatch>> {
        let data: Value = self
            .client
            .post(SEARCH_URL)
            .header("Origin", "https://music.youtube.com")
            .header("Referer", "https://music.youtube.com/")
            .json(&Self::request_body(query))
            .send()
            .context("YouTube Music 검색에 실패했습니다")?
            .error_for_status()
            .context("YouTube Music 검색 요청이 실패했습니다")?
            .json()
            .context("YouTube Music 검색 응답 파싱에 실패했습니다")?;

        Ok(Self::parse_response(&data))
    }
}

fn text_runs(value: &Value) -> Vec<&str> {
    value
        .pointer("/text/runs")
        .or_else(|| value.get("runs"))
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|r| r.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

/// 노래 목록의 한 줄. 두 번째 열은 `아티스트 • 앨범 • 3:45` 형식이다.
fn parse_list_item(item: &Value) -> Option<CatalogMatch> {
    let video_id = item
        .pointer("/playlistItemData/videoId")
        .or_else(|| {
            item.pointer("/overlay/musicItemThumbnailOverlayRenderer/content/musicPlayButtonRenderer/playNavigationEndpoint/watchEndpoint/videoId")
        })
        .and_then(Value::as_str)?;

    let columns = item.get("flexColumns").and_then(Value::as_array)?;
    let column = |i: usize| {
        columns
            .get(i)
            .and_then(|c| c.get("musicResponsiveListItemFlexColumnRenderer"))
            .map(text_runs)
            .unwrap_or_default()
    };

    let title = column(0).concat();
    let details = column(1);

    Some(CatalogMatch {
        video_id: video_id.to_string(),
        title,
        artists: artists_before_separator(&details),
        duration_secs: details.last().and_then(|t| parse_duration(t)),
    })
}

/// 상단 결과 카드. 영상이나 아티스트 카드일 수도 있으며 videoId가 없으면 건너뛴다.
fn parse_card(card: &Value) -> Option<CatalogMatch> {
    let title_run = card.pointer("/title/runs/0")?;
    let video_id = title_run
        .pointer("/navigationEndpoint/watchEndpoint/videoId")
        .and_then(Value::as_str)?;
    let title = title_run.get("text").and_then(Value::as_str).unwrap_or_default();

    let subtitle = card.get("subtitle").map(text_runs).unwrap_or_default();
    // 카드 subtitle은 `Song • 아티스트 • 3:45` 형식이다.
    let after_kind: Vec<&str> = subtitle
        .iter()
        .skip_while(|t| !is_separator(t))
        .skip(1)
        .copied()
        .collect();

    Some(CatalogMatch {
        video_id: video_id.to_string(),
        title: title.to_string(),
        artists: artists_before_separator(&after_kind),
        duration_secs: subtitle.last().and_then(|t| parse_duration(t)),
    })
}

fn is_separator(text: &str) -> bool {
    text.trim() == "•"
}

fn artists_before_separator(runs: &[&str]) -> Vec<String> {
    runs.iter()
        .take_while(|t| !is_separator(t))
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && *t != "&" && *t != ",")
        .map(str::to_string)
        .collect()
}

/// `m:ss` 또는 `h:mm:ss`를 초로 변환한다.
pub fn parse_duration(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    parts.iter().try_fold(0u64, |acc, part| {
        let value: u64 = part.parse().ok()?;
        Some(acc * 60 + value)
    })
}
