use std::time::Duration;

use tracing::{error, info, warn};

pub fn truncate_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }

    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = value[..cut].to_string();
    out.push_str("...[truncated]");
    out
}

pub fn log_agent_begin(
    agent_id: &str,
    session_id: &str,
    url: &str,
    message_chars: usize,
    asset_count: usize,
) {
    info!(
        "[AGENT] begin: agent={}, session={}, url={}, messageChars={}, assets={}",
        agent_id, session_id, url, message_chars, asset_count
    );
}

pub fn log_agent_retry(reason: &str, attempt: u32, max_retries: u32, delay: Duration) {
    warn!(
        "[AGENT] {}. Retrying in {}ms... (attempt {}/{})",
        reason,
        delay.as_millis(),
        attempt + 1,
        max_retries
    );
}

pub fn log_agent_rejected(reason: &str) {
    warn!("[AGENT] rejected: {}", reason);
}

pub fn log_agent_failure(err: &str, raw: Option<&str>) {
    match raw {
        Some(body) => error!("[AGENT] error: {}; body={}", err, truncate_log(body, 1200)),
        None => error!("[AGENT] error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_log;

    #[test]
    fn truncate_log_adds_suffix_when_exceeding_limit() {
        assert_eq!(truncate_log("abcdefgh", 4), "abcd...[truncated]");
        assert_eq!(truncate_log("abc", 4), "abc");
    }

    #[test]
    fn truncate_log_respects_char_boundaries() {
        assert_eq!(truncate_log("héllo", 2), "h...[truncated]");
    }
}
