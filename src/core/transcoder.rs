use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::core::process;

/// 받은 오디오를 목표 비트레이트의 MP3로 변환하는 단계.
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// `ffmpeg`로 libmp3lame CBR 변환을 수행한다.
/// 원본의 메타데이터는 모두 버리며, 태그는 이후 태거가 기록한다.
pub struct Ffmpeg {
    program: String,
    bitrate_kbps: u32,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(program: impl Into<String>, bitrate_kbps: u32, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            bitrate_kbps,
            timeout,
        }
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(input.to_string_lossy().into_owned());
        args.extend(
            ["-vn", "-map_metadata", "-1", "-c:a", "libmp3lame", "-b:a"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(format!("{}k", self.bitrate_kbps));
        // ID3 헤더를 쓰지 않아 인코더 정보 같은 태그가 섞이지 않게 한다.
        args.extend(["-id3v2_version", "0", "-f", "mp3"].iter().map(|s| s.to_string()));
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl Transcoder for Ffmpeg {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(input, output));
        process::run(cmd, self.timeout)?;

        if !output.is_file() {
            bail!("변환 결과 파일이 없습니다: {}", output.display());
        }
        Ok(())
    }
}
