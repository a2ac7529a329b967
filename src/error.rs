use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 실행 중 발생하는 오류 종류.
/// `PlaylistUnavailable`, `ToolMissing`, `Io`는 실행 전체를 중단시키고,
/// 나머지는 해당 트랙만 실패로 기록된다.
#[derive(Debug, Error)]
pub enum Error {
    #[error("플레이리스트를 읽을 수 없습니다: {reference}")]
    PlaylistUnavailable {
        reference: String,
        #[source]
        source: BoxError,
    },

    #[error("외부 도구를 찾을 수 없습니다: {tool}")]
    ToolMissing {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("검색 결과가 없습니다: \"{query}\"")]
    NoMatchFound { query: String },

    #[error("검색에 실패했습니다: \"{query}\"")]
    SearchFailed {
        query: String,
        #[source]
        source: BoxError,
    },

    #[error("다운로드에 실패했습니다: {video_id}")]
    DownloadFailed {
        video_id: String,
        #[source]
        source: BoxError,
    },

    #[error("변환에 실패했습니다: {}", input.display())]
    TranscodeFailed {
        input: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("태그 기록에 실패했습니다: {}", path.display())]
    TagFailed {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 실행 전체를 중단시켜야 하는 오류인지 여부.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::PlaylistUnavailable { .. } | Error::ToolMissing { .. } | Error::Io(_)
        )
    }

    /// 원인 체인까지 한 줄로 이어 붙인 메시지.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = StdError::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = StdError::source(cause);
        }
        message
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        let err = Error::PlaylistUnavailable {
            reference: "nope".to_string(),
            source: anyhow::anyhow!("404").into(),
        };
        assert!(err.is_fatal());

        let err = Error::NoMatchFound {
            query: "Queen Bohemian Rhapsody".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("Queen Bohemian Rhapsody"));
    }

    #[test]
    fn test_source_chain_is_kept() {
        let err = Error::DownloadFailed {
            video_id: "abc".to_string(),
            source: anyhow::anyhow!("yt-dlp exited with 1").into(),
        };
        let report = err.report();
        assert!(report.contains("abc"));
        assert!(report.ends_with("yt-dlp exited with 1"));

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.contains("yt-dlp exited with 1"));
    }
}
