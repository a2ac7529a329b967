use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 종료된 외부 프로세스의 결과.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// 외부 도구를 실행하고 종료를 기다린다.
/// `timeout`이 지나면 프로세스를 종료시키고 에러를 반환하며,
/// 종료 코드가 0이 아니면 stderr 마지막 줄들을 담은 에러를 반환한다.
pub fn run(mut command: Command, timeout: Duration) -> Result<ToolOutput> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!(?command, "외부 도구 실행");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("{}을(를) 실행할 수 없습니다", program))?;

    // 파이프 버퍼가 가득 차서 자식 프로세스가 멈추지 않도록 별도 스레드에서 읽는다.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, timeout)
        .with_context(|| format!("{} 실행이 끝나지 않았습니다", program));
    let output = ToolOutput {
        status: status?,
        stdout: join(stdout),
        stderr: join(stderr),
    };

    if !output.status.success() {
        bail!(
            "{}이(가) 실패했습니다 ({}): {}",
            program,
            output.status,
            tail(&output.stderr, 5)
        );
    }
    Ok(output)
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            tracing::error!("{}초가 지나 프로세스를 종료합니다", timeout.as_secs_f32());
            let _ = child.kill();
            let _ = child.wait();
            bail!("시간 초과 ({}초)", timeout.as_secs_f32());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// 출력의 마지막 `lines`줄만 남긴다.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\n\nc\n", 2), "b\nc");
        assert_eq!(tail("only", 5), "only");
        assert_eq!(tail("", 5), "");
    }

    #[test]
    fn test_missing_program() {
        let cmd = Command::new("definitely-not-a-real-tool-1234");
        let err = run(cmd, Duration::from_secs(5)).unwrap_err();
        assert!(format!("{:#}", err).contains("definitely-not-a-real-tool-1234"));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);
        let output = run(cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        let err = run(cmd, Duration::from_secs(5)).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let started = Instant::now();
        let err = run(cmd, Duration::from_millis(200)).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(format!("{:#}", err).contains("시간 초과"));
    }
}
