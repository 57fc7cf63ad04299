/// Checks if a host equals a whitelisted suffix or is a subdomain of it
///
/// # Arguments
///
/// * `suffix` - The whitelisted host suffix, e.g. "example.edu"
/// * `host` - The host to check, already lowercased
///
/// # Examples
///
/// ```
/// use hostfair_crawler::url::matches_host_suffix;
///
/// assert!(matches_host_suffix("example.edu", "example.edu"));
/// assert!(matches_host_suffix("example.edu", "www.cs.example.edu"));
/// assert!(!matches_host_suffix("example.edu", "badexample.edu"));
/// ```
pub fn matches_host_suffix(suffix: &str, host: &str) -> bool {
    host == suffix
        || host
            .strip_suffix(suffix)
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Checks if a path ends with one of the blacklisted file extensions
///
/// The path is compared in lowercase; extensions are expected in lowercase
/// with their leading dot, e.g. ".pdf".
pub fn has_blacklisted_extension<S: AsRef<str>>(path: &str, extensions: &[S]) -> bool {
    let path = path.to_lowercase();
    extensions
        .iter()
        .any(|extension| path.ends_with(extension.as_ref()))
}
