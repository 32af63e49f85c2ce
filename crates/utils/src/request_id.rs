//! Request and session identifiers

const ADJECTIVES: &[&str] = &[
    "amber", "brisk", "calm", "dusty", "eager", "fuzzy", "gentle", "hollow", "icy", "jolly",
    "keen", "lucky", "mellow", "noble", "odd", "plain", "quiet", "rapid", "shy", "tidy",
];

const NOUNS: &[&str] = &[
    "anchor", "badger", "cactus", "dune", "ember", "falcon", "garnet", "harbor", "island",
    "juniper", "kettle", "lantern", "meadow", "nutmeg", "orchid", "pebble", "quill", "river",
    "saddle", "thistle",
];

/// Generate a new request id such as `brisk-lantern-3fa2`
///
/// Ids are unique enough to correlate log lines and to seed a session id,
/// they are not secrets.
pub fn new_request_id() -> String {
    let adjective = ADJECTIVES[fastrand::usize(..ADJECTIVES.len())];
    let noun = NOUNS[fastrand::usize(..NOUNS.len())];
    format!("{adjective}-{noun}-{:04x}", fastrand::u16(..))
}

/// Generate a session id for a session started by `request_id`
///
/// The id is the request id followed by a random v4 UUID.
pub fn new_session_id(request_id: &str) -> String {
    format!("{request_id}-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_shape() {
        let id = new_request_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(NOUNS.contains(&parts[1]));
        assert_eq!(parts[2].len(), 4);
        assert!(u16::from_str_radix(parts[2], 16).is_ok());
    }

    #[test]
    fn test_session_ids_are_unique_per_request() {
        let request_id = "brisk-lantern-3fa2";
        let first = new_session_id(request_id);
        let second = new_session_id(request_id);

        assert_ne!(first, second);
        assert!(first.starts_with("brisk-lantern-3fa2-"));
        let suffix = &first[request_id.len() + 1..];
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
