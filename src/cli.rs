use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::Input;

use crate::config::{self, Config, SpotifyConfig};
use crate::core::downloader::YtDlp;
use crate::core::pipeline::{self, Pipeline, RunSummary, SearchPacing};
use crate::core::transcoder::Ffmpeg;
use crate::error::Error;
use crate::models::format_duration;
use crate::sources::spotify;
use crate::sources::ytmusic::YtMusicClient;
use crate::sources::CatalogSearch;

#[derive(Parser)]
#[command(
    name = "spotify-dl",
    version,
    about = "Spotify 플레이리스트를 YouTube Music에서 찾아 MP3로 내려받습니다",
    arg_required_else_help = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Spotify 플레이리스트 URL, URI 또는 ID
    #[arg(value_name = "PLAYLIST", required = true)]
    pub playlist: Option<String>,

    #[command(flatten)]
    pub download: DownloadArgs,

    /// 설정 파일 경로
    #[arg(long, env = "SPOTIFY_DL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// 로그를 더 자세히 출력 (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 경고와 오류만 출력
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Args)]
pub struct DownloadArgs {
    /// 저장할 디렉토리 (기본값: ./downloads)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// MP3 비트레이트 (kbps)
    #[arg(long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// 외부 도구 실행 제한 시간 (초)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 플레이리스트의 트랙 목록만 표시
    Tracks {
        /// Spotify 플레이리스트 URL, URI 또는 ID
        playlist: String,
    },
    /// YouTube Music 검색 결과 표시
    Search {
        /// 검색어
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Spotify API 자격증명 설정 (선택 사항)
    Config,
}

impl Cli {
    pub fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            self.verbose.min(2) as i8
        }
    }

    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(config::default_config_path)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    let mut cfg = config::load_config(&config_path);

    match cli.command {
        Some(Commands::Tracks { playlist }) => cmd_tracks(&cfg, &playlist),
        Some(Commands::Search { query }) => cmd_search(&query.join(" ")),
        Some(Commands::Config) => cmd_config(&config_path, &mut cfg),
        None => {
            let Some(playlist) = cli.playlist else {
                bail!("플레이리스트를 지정하세요");
            };
            apply_overrides(&mut cfg, &cli.download);
            cmd_download(&cfg, &playlist)
        }
    }
}

fn apply_overrides(cfg: &mut Config, args: &DownloadArgs) {
    if let Some(ref dir) = args.output_dir {
        cfg.download.output_dir = dir.clone();
    }
    if let Some(bitrate) = args.bitrate {
        cfg.download.bitrate_kbps = bitrate;
    }
    if let Some(timeout) = args.timeout {
        cfg.download.timeout_secs = timeout;
    }
}

/// 외부 도구가 실행 가능한 위치에 있는지 미리 확인한다.
fn check_tools(cfg: &Config) -> Result<(), Error> {
    for tool in [&cfg.download.ytdlp, &cfg.download.ffmpeg] {
        let path = which::which(tool).map_err(|source| Error::ToolMissing {
            tool: tool.clone(),
            source,
        })?;
        tracing::debug!(tool = %tool, path = %path.display(), "외부 도구 확인");
    }
    Ok(())
}

fn cmd_download(cfg: &Config, playlist: &str) -> Result<()> {
    check_tools(cfg)?;

    let timeout = cfg.download.timeout();
    let pipeline = Pipeline {
        playlist_source: spotify::from_config(&cfg.spotify)?,
        search: Box::new(YtMusicClient::new()?),
        downloader: Box::new(YtDlp::new(&cfg.download.ytdlp, timeout)),
        transcoder: Box::new(Ffmpeg::new(
            &cfg.download.ffmpeg,
            cfg.download.bitrate_kbps,
            timeout,
        )),
        output_dir: cfg.download.output_dir.clone(),
        pacing: SearchPacing::from(&cfg.search),
    };

    let summary = pipeline.run(playlist)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.outcomes.is_empty() {
        return;
    }
    if let Some(ref name) = summary.playlist_name {
        println!("{}\n", name);
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "트랙", "결과"]);
    for (i, outcome) in summary.outcomes.iter().enumerate() {
        let status = match &outcome.result {
            Ok(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Err(e) => format!("실패: {}", e),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(outcome.track.summary()),
            Cell::new(status),
        ]);
    }

    println!("{table}");
    println!(
        "\n총 {}곡 (성공: {}, 실패: {})",
        summary.outcomes.len(),
        summary.saved(),
        summary.failed(),
    );
}

fn cmd_tracks(cfg: &Config, playlist: &str) -> Result<()> {
    let source = spotify::from_config(&cfg.spotify)?;
    let playlist = pipeline::read_playlist(source.as_ref(), playlist)?;

    if let Some(ref name) = playlist.name {
        println!("{}\n", name);
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "제목", "아티스트", "앨범", "길이"]);
    for (i, track) in playlist.tracks.iter().enumerate() {
        let duration = track
            .duration_ms
            .map(|ms| format_duration(ms / 1000))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&track.title),
            Cell::new(track.display_artist()),
            Cell::new(track.display_album()),
            Cell::new(duration),
        ]);
    }

    println!("{table}");
    println!("\n총 {}곡", playlist.tracks.len());
    Ok(())
}

fn cmd_search(query: &str) -> Result<()> {
    let client = YtMusicClient::new()?;
    let results = client
        .search(query)
        .with_context(|| format!("\"{}\" 검색에 실패했습니다", query))?;

    if results.is_empty() {
        println!("검색 결과가 없습니다.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "제목", "아티스트", "길이", "URL"]);
    for (i, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&result.title),
            Cell::new(result.artists.join(", ")),
            Cell::new(result.display_duration()),
            Cell::new(result.watch_url()),
        ]);
    }

    println!("{table}");
    println!("\n다운로드 시에는 1번 결과가 사용됩니다.");
    Ok(())
}

fn cmd_config(path: &std::path::Path, cfg: &mut Config) -> Result<()> {
    println!("Spotify API 설정");
    println!("(설정하지 않아도 공개 플레이리스트는 읽을 수 있습니다. 설정하면 앨범 정보와 앨범 아트가 태그에 추가됩니다.)");
    println!("(자격증명은 https://developer.spotify.com/dashboard 에서 발급받으세요)\n");

    let current_id = cfg.spotify.client_id.clone().unwrap_or_default();

    let client_id: String = Input::new()
        .with_prompt("Client ID")
        .with_initial_text(current_id)
        .allow_empty(true)
        .interact_text()?;

    let current_secret = cfg.spotify.client_secret.clone().unwrap_or_default();

    let client_secret: String = Input::new()
        .with_prompt("Client Secret")
        .with_initial_text(current_secret)
        .allow_empty(true)
        .interact_text()?;

    cfg.spotify = SpotifyConfig {
        client_id: Some(client_id).filter(|s| !s.is_empty()),
        client_secret: Some(client_secret).filter(|s| !s.is_empty()),
    };

    config::save_config(path, cfg)?;
    println!("\n설정이 저장되었습니다: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_playlist_with_options() {
        let cli = Cli::try_parse_from([
            "spotify-dl",
            "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M",
            "-o",
            "music",
            "--bitrate",
            "192",
            "-vv",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert_eq!(
            cli.playlist.as_deref(),
            Some("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M")
        );
        assert_eq!(cli.verbosity(), 2);

        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli.download);
        assert_eq!(cfg.download.output_dir, PathBuf::from("music"));
        assert_eq!(cfg.download.bitrate_kbps, 192);
        assert_eq!(cfg.download.timeout_secs, 600);
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::try_parse_from(["spotify-dl", "search", "Queen", "Bohemian", "Rhapsody"])
            .unwrap();
        match cli.command {
            Some(Commands::Search { query }) => {
                assert_eq!(query.join(" "), "Queen Bohemian Rhapsody")
            }
            _ => panic!("search 명령이어야 합니다"),
        }

        let cli = Cli::try_parse_from(["spotify-dl", "tracks", "abc", "-q"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Tracks { .. })));
        assert_eq!(cli.verbosity(), -1);
    }

    #[test]
    fn test_playlist_is_required() {
        assert!(Cli::try_parse_from(["spotify-dl"]).is_err());
        assert!(Cli::try_parse_from(["spotify-dl", "-v", "-o", "music"]).is_err());
        assert!(Cli::try_parse_from(["spotify-dl", "config"]).is_ok());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["spotify-dl", "-q", "-v", "x"]).is_err());
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let mut cfg = Config::default();
        cfg.download.ytdlp = "definitely-not-a-real-tool-1234".to_string();
        match check_tools(&cfg) {
            Err(Error::ToolMissing { tool, .. }) => {
                assert_eq!(tool, "definitely-not-a-real-tool-1234")
            }
            _ => panic!("ToolMissing이어야 합니다"),
        }
    }
}
