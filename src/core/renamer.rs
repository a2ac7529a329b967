use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::TrackInfo;

/// 파일명에 사용할 수 없는 문자를 `_`로 치환한다.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c == '/' || c == '\0' {
                return '_';
            }
            if cfg!(target_os = "windows") {
                if matches!(c, '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                    return '_';
                }
                if c.is_ascii_control() {
                    return '_';
                }
            }
            if cfg!(target_os = "macos") && c == ':' {
                return '_';
            }
            c
        })
        .collect()
}

/// 대부분의 파일시스템이 허용하는 파일명 최대 길이(바이트).
const MAX_FILENAME_BYTES: usize = 255;
const EXTENSION: &str = ".mp3";

/// TrackInfo에서 `"{artist} - {title}.mp3"` 형식의 파일명을 만든다.
/// 아티스트가 없으면 `"{title}.mp3"`가 된다.
pub fn build_filename(info: &TrackInfo) -> String {
    numbered_filename(&build_stem(info), 1)
}

fn build_stem(info: &TrackInfo) -> String {
    let title = match info.title.trim() {
        "" => "Unknown",
        t => t,
    };
    let artist = info.display_artist();
    let artist = artist.trim();

    // 숨김 파일이 되지 않도록 앞의 점은 떼어 낸다.
    let stem = if artist.is_empty() {
        sanitize_filename(title)
    } else {
        format!("{} - {}", sanitize_filename(artist), sanitize_filename(title))
    };
    match stem.trim_start_matches('.') {
        "" => "Unknown".to_string(),
        s => s.to_string(),
    }
}

/// `n`이 2 이상이면 `"{stem} (n).mp3"`. 전체 길이가 255바이트를 넘지 않도록 stem을 자른다.
fn numbered_filename(stem: &str, n: usize) -> String {
    let suffix = if n <= 1 {
        EXTENSION.to_string()
    } else {
        format!(" ({}){}", n, EXTENSION)
    };
    let stem = truncate_bytes(stem, MAX_FILENAME_BYTES - suffix.len()).trim_end();
    format!("{}{}", stem, suffix)
}

/// 문자 경계를 지키면서 `max` 바이트 이하로 자른다.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// 이번 실행에서 아직 쓰지 않은 파일명을 골라 `used`에 등록한다.
/// 같은 아티스트와 제목이 다시 나오면 `" (2)"`, `" (3)"`…을 붙인다.
pub fn claim_filename(info: &TrackInfo, used: &mut HashSet<String>) -> String {
    let stem = build_stem(info);
    let mut n = 1;
    loop {
        let name = numbered_filename(&stem, n);
        if used.insert(name.clone()) {
            if n > 1 {
                tracing::warn!(file = %name, "같은 이름의 트랙이 이미 저장되어 번호를 붙입니다");
            }
            return name;
        }
        n += 1;
    }
}

/// 완성된 파일을 출력 디렉토리의 `file_name`으로 옮긴다. 같은 이름의 파일이 있으면 덮어쓴다.
pub fn finalize(staged: &Path, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let final_path = output_dir.join(file_name);
    std::fs::rename(staged, &final_path)
        .with_context(|| format!("파일을 옮길 수 없습니다: {}", final_path.display()))?;
    Ok(final_path)
}
