use std::path::Path;

use anyhow::{Context, Result};
use id3::{Tag, TagLike, Version};

use crate::models::TrackInfo;

/// MP3 파일에서 ID3 태그를 읽어 TrackInfo로 변환한다.
/// 태그가 없거나 제목이 비어 있으면 None을 반환한다.
#[cfg(test)]
pub fn read_tags(path: &Path) -> Result<Option<TrackInfo>> {
    let tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let Some(title) = tag.title() else {
        return Ok(None);
    };

    let artists = tag
        .artist()
        .map(|a| a.split(", ").map(str::to_string).collect())
        .unwrap_or_default();

    let info = TrackInfo {
        title: title.to_string(),
        artists,
        album: tag.album().map(|s| s.to_string()),
        album_artist: tag.album_artist().map(|s| s.to_string()),
        track_number: tag.track(),
        year: tag.year(),
        source: "id3".to_string(),
        ..Default::default()
    };

    Ok(Some(info))
}

/// TrackInfo를 MP3 파일에 ID3v2.4 태그로 기록한다.
/// 기존 태그는 버리고 새로 만들기 때문에 같은 입력이면 항상 같은 태그가 된다.
pub fn write_tags(path: &Path, info: &TrackInfo, album_art: Option<&[u8]>) -> Result<()> {
    let mut tag = Tag::new();

    tag.set_title(&info.title);
    if !info.artists.is_empty() {
        tag.set_artist(info.display_artist());
    }
    if let Some(ref album) = info.album {
        tag.set_album(album);
    }
    if let Some(ref album_artist) = info.album_artist {
        tag.set_album_artist(album_artist);
    }
    if let Some(track) = info.track_number {
        tag.set_track(track);
    }
    if let Some(year) = info.year {
        tag.set_year(year);
    }
    if let Some(art_data) = album_art {
        tag.add_frame(id3::frame::Picture {
            mime_type: detect_mime_type(art_data),
            picture_type: id3::frame::PictureType::CoverFront,
            description: String::new(),
            data: art_data.to_vec(),
        });
    }

    tag.write_to_path(path, Version::Id3v24)
        .with_context(|| format!("ID3 태그를 쓸 수 없습니다: {}", path.display()))?;
    Ok(())
}

/// 이미지 바이너리의 매직 바이트로 MIME 타입을 판별한다.
fn detect_mime_type(data: &[u8]) -> String {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png".to_string()
    } else {
        "image/jpeg".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 태그 없는 MPEG 프레임 헤더 비슷한 바이트로 가짜 MP3를 만든다.
    fn fake_mp3(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut data = vec![0xFF, 0xFB, 0x90, 0x64];
        data.extend(std::iter::repeat(0u8).take(412));
        std::fs::write(&path, data).unwrap();
        path
    }

    fn sample_track() -> TrackInfo {
        TrackInfo {
            title: "Under Pressure".to_string(),
            artists: vec!["Queen".to_string(), "David Bowie".to_string()],
            album: Some("Hot Space".to_string()),
            album_artist: Some("Queen".to_string()),
            track_number: Some(11),
            year: Some(1982),
            source: "spotify".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_written_tags_match_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_mp3(dir.path(), "a.mp3");
        let track = sample_track();

        write_tags(&path, &track, None).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.title(), Some("Under Pressure"));
        assert_eq!(tag.artist(), Some("Queen, David Bowie"));
        assert_eq!(tag.album(), Some("Hot Space"));
        assert_eq!(tag.album_artist(), Some("Queen"));
        assert_eq!(tag.track(), Some(11));
        assert_eq!(tag.year(), Some(1982));
        assert_eq!(tag.pictures().count(), 0);

        let read = read_tags(&path).unwrap().unwrap();
        assert_eq!(read.title, track.title);
        assert_eq!(read.artists, track.artists);
        assert_eq!(read.album, track.album);
    }

    #[test]
    fn test_album_art_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_mp3(dir.path(), "a.mp3");
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

        write_tags(&path, &sample_track(), Some(&png)).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        let pic = tag.pictures().next().unwrap();
        assert_eq!(pic.mime_type, "image/png");
        assert_eq!(pic.picture_type, id3::frame::PictureType::CoverFront);
        assert_eq!(pic.data, png);
    }

    #[test]
    fn test_tag_bytes_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let first = fake_mp3(dir.path(), "first.mp3");
        let second = fake_mp3(dir.path(), "second.mp3");
        let track = sample_track();

        write_tags(&first, &track, None).unwrap();
        write_tags(&second, &track, None).unwrap();
        // 같은 파일에 다시 써도 결과가 같아야 한다.
        write_tags(&second, &track, None).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[test]
    fn test_read_untagged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = fake_mp3(dir.path(), "plain.mp3");
        assert!(read_tags(&path).unwrap().is_none());
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(&[0x89, 0x50, 0x4E, 0x47]), "image/png");
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
    }
}
