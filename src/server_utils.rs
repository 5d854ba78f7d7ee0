use crate::types::RoomId;

pub const MAX_NAME_CHARS: usize = 24;

pub fn sanitize_name(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

pub fn parse_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
}

pub fn parse_room(raw: &str) -> Option<RoomId> {
    RoomId::parse(&raw.trim().to_ascii_lowercase())
}

pub fn media_type(raw: Option<&str>) -> Option<String> {
    let value = raw?.split(';').next()?.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    Some(value)
}
