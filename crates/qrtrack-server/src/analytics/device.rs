/// Device class inferred from a User-Agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
    Unknown,
}

impl DeviceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::Bot => "bot",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const BOT_MARKERS: &[&str] = &["bot", "crawl", "spider", "slurp", "facebookexternalhit"];
const MOBILE_MARKERS: &[&str] = &["mobile", "iphone", "ipod", "windows phone", "blackberry"];
const DESKTOP_MARKERS: &[&str] = &["windows", "macintosh", "mac os x", "x11", "linux", "cros"];

/// Classify a User-Agent header. Empty or unrecognised input is `Unknown`.
pub fn detect(user_agent: &str) -> DeviceType {
    let ua = user_agent.trim().to_ascii_lowercase();
    if ua.is_empty() {
        return DeviceType::Unknown;
    }

    let has = |markers: &[&str]| markers.iter().any(|m| ua.contains(m));

    if has(BOT_MARKERS) {
        DeviceType::Bot
    } else if ua.contains("ipad")
        || ua.contains("tablet")
        || (ua.contains("android") && !ua.contains("mobile"))
    {
        // Android tablets omit the "Mobile" token.
        DeviceType::Tablet
    } else if has(MOBILE_MARKERS) || ua.contains("android") {
        DeviceType::Mobile
    } else if has(DESKTOP_MARKERS) {
        DeviceType::Desktop
    } else {
        DeviceType::Unknown
    }
}
