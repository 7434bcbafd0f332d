//! Errors surfaced by the extraction pipeline.
//!
//! Selector and payload parse errors never show up here: they are recovered
//! where they happen. Only faults that abort a whole detection run do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid page URL \"{url}\": {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("page source unavailable: {0}")]
    Source(String),

    #[error("extraction fault on {url}: {reason}")]
    Fault { url: String, reason: String },
}

impl EngineError {
    /// Builds a fault from a caught panic payload.
    pub fn from_panic(url: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        EngineError::Fault { url: url.to_string(), reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_message() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = EngineError::InvalidUrl { url: "not a url".to_string(), source };
        assert!(err.to_string().contains("invalid page URL"));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_from_panic_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        let err = EngineError::from_panic("https://shop.test", payload.as_ref());
        assert!(err.to_string().contains("static message"));

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned message"));
        let err = EngineError::from_panic("https://shop.test", payload.as_ref());
        assert!(err.to_string().contains("owned message"));

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        let err = EngineError::from_panic("https://shop.test", payload.as_ref());
        assert!(err.to_string().contains("unknown panic"));
    }
}
