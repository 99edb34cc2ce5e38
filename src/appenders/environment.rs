//! Host environment seen by the server stream

use std::sync::atomic::{AtomicBool, Ordering};

/// User agent reported when no host environment is configured.
pub const NO_WINDOW_USER_AGENT: &str = "no-window";

const BOT_MARKERS: [&str; 4] = ["bot", "crawler", "spider", "crawling"];

/// Connectivity and identity of the host the logger runs in.
pub trait Environment: Send + Sync {
    fn is_online(&self) -> bool;

    fn user_agent(&self) -> String;

    /// Current page or application location, if there is one.
    fn location(&self) -> Option<String>;
}

/// Case-insensitive match against known crawler user agents.
pub fn is_bot(user_agent: &str) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    BOT_MARKERS.iter().any(|marker| user_agent.contains(marker))
}

/// Fixed identity with a switchable online flag.
///
/// # Example
///
/// ```
/// use browser_bunyan::appenders::{Environment, StaticEnvironment};
///
/// let env = StaticEnvironment::new()
///     .with_user_agent("Mozilla/5.0")
///     .with_location("https://example.com/app");
/// env.set_online(false);
/// assert!(!env.is_online());
/// ```
#[derive(Debug)]
pub struct StaticEnvironment {
    online: AtomicBool,
    user_agent: String,
    location: Option<String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            user_agent: NO_WINDOW_USER_AGENT.to_string(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_online(self, online: bool) -> Self {
        self.set_online(online);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Default for StaticEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for StaticEnvironment {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn location(&self) -> Option<String> {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_bot() {
        assert!(is_bot("Googlebot/2.1 (+http://www.google.com/bot.html)"));
        assert!(is_bot("Some-Spider"));
        assert!(is_bot("CRAWLING agent"));
        assert!(!is_bot("Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0"));
        assert!(!is_bot(NO_WINDOW_USER_AGENT));
    }

    #[test]
    fn test_static_environment_defaults() {
        let env = StaticEnvironment::default();
        assert!(env.is_online());
        assert_eq!(env.user_agent(), NO_WINDOW_USER_AGENT);
        assert_eq!(env.location(), None);
    }
}
