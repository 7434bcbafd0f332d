//! Reveal probes for lazily rendered page regions.
//!
//! Some retailers only render their size list after the size dropdown is
//! opened. A [`RevealTrigger`] lets a host activate such a control and hand
//! back the markup that appeared. This is the only interaction any strategy
//! performs against the live page.

use std::time::Duration;

/// One reveal probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRequest {
    /// Ordered selectors for the control to activate.
    pub trigger: Vec<String>,
    /// Ordered selectors for the region expected to appear.
    pub targets: Vec<String>,
    /// Upper bound on the wait for `targets` to appear.
    pub timeout: Duration,
    /// Navigation handlers must be neutralized for the duration of the probe.
    pub block_navigation: bool,
    /// Form submission and cart handlers must be neutralized too.
    pub block_submit: bool,
}

impl RevealRequest {
    pub fn new(trigger: &[&str], targets: &[&str], timeout: Duration) -> Self {
        Self {
            trigger: trigger.iter().map(|s| s.to_string()).collect(),
            targets: targets.iter().map(|s| s.to_string()).collect(),
            timeout,
            block_navigation: true,
            block_submit: true,
        }
    }
}

/// Host hook that activates a control and returns the revealed markup.
///
/// Implementations return `None` when the trigger is missing or nothing
/// appeared before `request.timeout`.
pub trait RevealTrigger: Send + Sync {
    fn reveal(&self, request: &RevealRequest) -> Option<String>;
}

/// Never reveals anything; strategies keep whatever the markup already has.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReveal;

impl RevealTrigger for NoReveal {
    fn reveal(&self, _request: &RevealRequest) -> Option<String> {
        None
    }
}

/// Serves canned markup for every probe. Useful when the revealed region was
/// captured ahead of time.
#[derive(Debug, Clone)]
pub struct StaticReveal {
    markup: String,
}

impl StaticReveal {
    pub fn new(markup: impl Into<String>) -> Self {
        Self { markup: markup.into() }
    }
}

impl RevealTrigger for StaticReveal {
    fn reveal(&self, _request: &RevealRequest) -> Option<String> {
        Some(self.markup.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_always_blocks_side_effects() {
        let request = RevealRequest::new(&[".size-toggle"], &[".size-list"], Duration::from_millis(1500));
        assert!(request.block_navigation);
        assert!(request.block_submit);
        assert_eq!(request.trigger, vec![".size-toggle".to_string()]);
    }

    #[test]
    fn test_no_reveal() {
        let request = RevealRequest::new(&["x"], &["y"], Duration::ZERO);
        assert!(NoReveal.reveal(&request).is_none());
        assert_eq!(StaticReveal::new("<ul></ul>").reveal(&request).as_deref(), Some("<ul></ul>"));
    }
}
