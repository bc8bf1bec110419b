//! Utility functions for zkelect

/// Normalize a node path: one leading slash, no empty segments, no trailing
/// slash. Returns `None` when nothing but slashes remain.
pub fn normalize_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/")))
}

/// Join a child path onto a root path (`/ROOT` + `/MASTER` = `/ROOT/MASTER`)
pub fn join_path(root: &str, child: &str) -> String {
    match (normalize_path(root), normalize_path(child)) {
        (Some(root), Some(child)) => format!("{}{}", root, child),
        (Some(path), None) | (None, Some(path)) => path,
        (None, None) => "/".to_string(),
    }
}

/// All proper ancestors of `path`, outermost first (`/a/b/c` → `/a`, `/a/b`)
pub fn ancestors(path: &str) -> Vec<String> {
    let Some(path) = normalize_path(path) else {
        return Vec::new();
    };
    path.match_indices('/')
        .skip(1)
        .map(|(idx, _)| path[..idx].to_string())
        .collect()
}

/// Parse duration string (e.g., "500ms", "3s", "5m", "1h")
pub fn parse_duration(s: &str) -> crate::Result<std::time::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else {
        let split = s.char_indices().last().map(|(idx, _)| idx).unwrap_or(0);
        s.split_at(split)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    let secs = |factor: u64| {
        num.checked_mul(factor)
            .map(std::time::Duration::from_secs)
            .ok_or_else(|| crate::Error::InvalidConfig(format!("duration too large: {}", s)))
    };

    match unit {
        "ms" => Ok(std::time::Duration::from_millis(num)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(3600),
        _ => Err(crate::Error::InvalidConfig(format!(
            "unknown duration unit: {}",
            unit
        ))),
    }
}

/// Whole milliseconds of `duration`, for the `*_ms` config fields
pub fn duration_millis(duration: std::time::Duration) -> crate::Result<u64> {
    u64::try_from(duration.as_millis()).map_err(|_| {
        crate::Error::InvalidConfig(format!("duration too large: {:?}", duration))
    })
}
