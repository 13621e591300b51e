/// Hostname used to advertise the status endpoint.
///
/// Falls back to `localhost` when the name is unavailable or not valid UTF-8.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
