pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

/// Stable identity used as the persisted score key. Only a conservative
/// character set survives; anything else falls back to a generated id.
pub fn sanitize_participant_id(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return None;
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid || trimmed.starts_with(crate::constants::SURROGATE_ID_PREFIX) {
        return None;
    }
    Some(trimmed.to_string())
}

/// A seated participant can only be taken over by the connection holding the
/// token issued when they joined.
pub fn may_resume(issued: Option<&str>, presented: Option<&str>) -> bool {
    match (issued, presented.map(str::trim)) {
        (Some(issued), Some(presented)) => !issued.is_empty() && issued == presented,
        _ => false,
    }
}

pub fn is_supported_room(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            normalized == "main"
        }
    }
}

pub fn parse_port(raw: Option<&str>, fallback: u16) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(fallback)
}
