//! Browser Fingerprint Profiles
//!
//! Hosting pages and media CDNs frequently reject requests that do not look
//! like they come from a browser. Every upstream request starts from one of
//! these profiles; callers may override individual headers on top.

use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT,
};

/// Browser profile with realistic fingerprint
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
    pub sec_fetch_dest: String,
    pub sec_fetch_mode: String,
    pub sec_fetch_site: String,
}

/// Recent Chrome releases (major, full)
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.0.0"),
    ("130", "130.0.0.0"),
    ("129", "129.0.0.0"),
    ("128", "128.0.0.0"),
];

const FIREFOX_VERSIONS: &[&str] = &["133.0", "132.0", "131.0"];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.9,hi;q=0.8",
    "en-IN,en;q=0.9",
];

#[derive(Debug, Clone, Copy)]
enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    fn random() -> Self {
        // Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items[rand::thread_rng().gen_range(0..items.len())]
}

/// Generate a Chrome page-navigation profile
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let platform = Platform::random();
    let (major, full) = CHROME_VERSIONS[rand::thread_rng().gen_range(0..CHROME_VERSIONS.len())];

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
        accept_language: pick(ACCEPT_LANGUAGES).to_string(),
        sec_ch_ua: format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        ),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_platform: platform.sec_ch_platform().to_string(),
        sec_fetch_dest: "document".to_string(),
        sec_fetch_mode: "navigate".to_string(),
        sec_fetch_site: "none".to_string(),
    }
}

/// Generate a Firefox page-navigation profile
#[must_use]
pub fn firefox_profile() -> BrowserProfile {
    let platform = Platform::random();
    let version = pick(FIREFOX_VERSIONS);

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}; rv:{version}) Gecko/20100101 Firefox/{version}",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        accept_language: pick(ACCEPT_LANGUAGES).to_string(),
        // Firefox doesn't send client hints
        sec_ch_ua: String::new(),
        sec_ch_ua_mobile: String::new(),
        sec_ch_ua_platform: String::new(),
        sec_fetch_dest: "document".to_string(),
        sec_fetch_mode: "navigate".to_string(),
        sec_fetch_site: "none".to_string(),
    }
}

/// Random profile weighted by market share (Chrome 80%, Firefox 20%)
#[must_use]
pub fn random_profile() -> BrowserProfile {
    let roll: f32 = rand::thread_rng().gen();
    if roll < 0.8 {
        chrome_profile()
    } else {
        firefox_profile()
    }
}

impl BrowserProfile {
    /// Same browser, but fetching a media element instead of a page.
    #[must_use]
    pub fn for_media(mut self) -> Self {
        self.accept = "*/*".to_string();
        self.sec_fetch_dest = "video".to_string();
        self.sec_fetch_mode = "no-cors".to_string();
        self.sec_fetch_site = "cross-site".to_string();
        self
    }

    /// Convert profile to a reqwest `HeaderMap`.
    ///
    /// Values that are not valid header text are skipped.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let mut put = |name: HeaderName, value: &str| {
            if value.is_empty() {
                return;
            }
            if let Ok(v) = HeaderValue::from_str(value) {
                headers.insert(name, v);
            }
        };

        put(USER_AGENT, &self.user_agent);
        put(ACCEPT, &self.accept);
        put(ACCEPT_LANGUAGE, &self.accept_language);
        put(HeaderName::from_static("sec-ch-ua"), &self.sec_ch_ua);
        put(HeaderName::from_static("sec-ch-ua-mobile"), &self.sec_ch_ua_mobile);
        put(HeaderName::from_static("sec-ch-ua-platform"), &self.sec_ch_ua_platform);
        put(HeaderName::from_static("sec-fetch-dest"), &self.sec_fetch_dest);
        put(HeaderName::from_static("sec-fetch-mode"), &self.sec_fetch_mode);
        put(HeaderName::from_static("sec-fetch-site"), &self.sec_fetch_site);

        headers
    }
}
