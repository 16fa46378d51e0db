/// Single-line, length-bounded rendering of an error message for logs and error payloads.
/// Transport errors from the RPC stack can carry entire response bodies and backtraces.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let raw = message
        .split_once("Stack backtrace:")
        .map(|(head, _)| head)
        .unwrap_or(message);

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    let mut kept = 0usize;
    let mut prev_ws = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !prev_ws && !compact.is_empty() {
                compact.push(' ');
                kept += 1;
            }
            prev_ws = true;
        } else {
            compact.push(ch);
            kept += 1;
            prev_ws = false;
        }
        if kept > max_len {
            break;
        }
    }
    let compact = compact.trim_end().to_string();
    if kept <= max_len {
        return compact;
    }
    let mut truncated: String = compact.chars().take(max_len).collect();
    truncated.push_str("...(truncated)");
    truncated
}

/// Pulls the human-readable reason out of a node's revert error, e.g.
/// `server returned an error response: error code 3: execution reverted: index out of bounds`.
pub fn extract_revert_reason(message: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    let start = lower.find("execution reverted")?;
    let tail = message[start + "execution reverted".len()..]
        .trim_start_matches(':')
        .trim();
    let reason = tail
        .split(", data:")
        .next()
        .unwrap_or(tail)
        .trim()
        .trim_matches('"');
    if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    }
}
