use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 로그 구독자를 설치한다. `RUST_LOG`가 설정되어 있으면 그 값을 따르고,
/// 아니면 `verbosity`(-1: warn, 0: info, 1: debug, 2 이상: trace)를 쓴다.
pub fn init(verbosity: i8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn default_directive(verbosity: i8) -> String {
    let level = match verbosity {
        i8::MIN..=-1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,spotify_dl={}", level)
}
