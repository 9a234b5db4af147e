//! User-agent classification for redirect analytics.
//!
//! Substring heuristics over the raw `User-Agent` header, good enough for
//! aggregate stats. Order matters: Chromium-family tokens embed `Safari/`,
//! and iOS agents embed `like Mac OS X`, so the more specific token wins.

/// Classified client information extracted from a user-agent string.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub browser: Option<String>,
    pub os: Option<String>,
    /// Coarse device class: `"mobile"`, `"tablet"`, or `"desktop"`.
    pub device: Option<String>,
    pub is_mobile: bool,
    pub is_tablet: bool,
}

/// Classifies a raw user-agent string.
pub fn classify(user_agent: &str) -> ClientInfo {
    let browser = detect_browser(user_agent);
    let os = detect_os(user_agent);

    let is_tablet = user_agent.contains("iPad")
        || (user_agent.contains("Android") && !user_agent.contains("Mobile"));
    let is_mobile = !is_tablet
        && (user_agent.contains("iPhone")
            || user_agent.contains("iPod")
            || user_agent.contains("Mobile"));

    let device = if is_tablet {
        "tablet"
    } else if is_mobile {
        "mobile"
    } else {
        "desktop"
    };

    ClientInfo {
        browser,
        os,
        device: Some(device.to_string()),
        is_mobile,
        is_tablet,
    }
}

fn detect_browser(ua: &str) -> Option<String> {
    let name = if ua.contains("Edg/") || ua.contains("Edge/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
        "Chrome"
    } else if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        "Firefox"
    } else if ua.contains("MSIE") || ua.contains("Trident/") {
        "Internet Explorer"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        return None;
    };

    Some(name.to_string())
}

fn detect_os(ua: &str) -> Option<String> {
    let name = if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        "iOS"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        return None;
    };

    Some(name.to_string())
}
