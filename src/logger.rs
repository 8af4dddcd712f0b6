use crate::config::Config;
use once_cell::sync::OnceCell;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_DIR: &str = "logs";
const SERVER_LOG_FILE: &str = "server.log";
const ERROR_LOG_FILE: &str = "error.log";

struct LoggerGuards {
    _file: WorkerGuard,
    _error: WorkerGuard,
}

static LOG_GUARDS: OnceCell<LoggerGuards> = OnceCell::new();

pub fn init_logger(cfg: &Config) -> Result<(), String> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        fs::create_dir_all(log_dir).map_err(|e| format!("create log dir failed: {e}"))?;
    }

    prune_logs(log_dir, parse_keep_days(&cfg.log_max_files));

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(rolling::daily(log_dir, SERVER_LOG_FILE));
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(rolling::daily(log_dir, ERROR_LOG_FILE));

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stdout);

    let file_layer = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_ids(true)
        .json()
        .with_writer(file_writer);

    let error_layer = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .json()
        .with_writer(error_writer)
        .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(error_layer)
        .try_init()
        .map_err(|e| format!("install subscriber failed: {e}"))?;

    let _ = LOG_GUARDS.set(LoggerGuards {
        _file: file_guard,
        _error: error_guard,
    });

    std::panic::set_hook(Box::new(|panic_info| {
        let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "panic occurred".to_string()
        };
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(panic = %payload, location = %location, "panic");
    }));

    Ok(())
}

fn prune_logs(log_dir: &Path, keep_days: u64) {
    if keep_days == 0 {
        return;
    }
    let Some(cutoff) = retention_cutoff(SystemTime::now(), keep_days) else {
        return;
    };
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let stale = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);
        if stale {
            let _ = fs::remove_file(entry.path());
        }
    }
}

/// `None` when the window reaches back past what `SystemTime` can represent.
fn retention_cutoff(now: SystemTime, keep_days: u64) -> Option<SystemTime> {
    now.checked_sub(Duration::from_secs(keep_days.saturating_mul(24 * 3600)))
}

/// Accepts `"7d"` or a bare day count; anything else disables pruning.
fn parse_keep_days(value: &str) -> u64 {
    let raw = value.trim().to_lowercase();
    raw.strip_suffix('d')
        .unwrap_or(&raw)
        .parse::<u64>()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::{parse_keep_days, retention_cutoff, ERROR_LOG_FILE, SERVER_LOG_FILE};

    #[test]
    fn parses_keep_days_with_and_without_suffix() {
        assert_eq!(parse_keep_days("7d"), 7);
        assert_eq!(parse_keep_days(" 14D "), 14);
        assert_eq!(parse_keep_days("3"), 3);
        assert_eq!(parse_keep_days("10m"), 0);
        assert_eq!(parse_keep_days(""), 0);
    }

    #[test]
    fn log_files_use_server_and_error_names() {
        assert_eq!(SERVER_LOG_FILE, "server.log");
        assert_eq!(ERROR_LOG_FILE, "error.log");
    }

    #[test]
    fn retention_cutoff_handles_huge_day_counts() {
        let now = SystemTime::now();
        assert_eq!(
            retention_cutoff(now, 7),
            now.checked_sub(Duration::from_secs(7 * 24 * 3600))
        );
        assert_eq!(retention_cutoff(now, u64::MAX), None);
        assert_eq!(parse_keep_days("99999999999999999d"), 99_999_999_999_999_999);
        assert_eq!(retention_cutoff(now, 99_999_999_999_999_999), None);
    }
}
