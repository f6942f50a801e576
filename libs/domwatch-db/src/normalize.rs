/// Canonical form of a domain name as stored and looked up everywhere.
///
/// `HTTPS://Example.com/` and `example.com` must denote the same record,
/// so every entry point (registration, removal, lookup, on-demand check)
/// funnels through this.
pub fn normalize_domain(raw: &str) -> String {
    let mut value = raw.trim().to_lowercase();
    if let Some(rest) = value.strip_prefix("http://") {
        value = rest.to_string();
    } else if let Some(rest) = value.strip_prefix("https://") {
        value = rest.to_string();
    }
    value.trim_matches('/').to_string()
}
