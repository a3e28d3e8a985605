//! Typed read-only access to path and query-string parameters.
//!
//! Path parameters shadow query parameters with the same key. Every typed
//! getter falls back to the type's zero value on a missing key or a parse
//! failure; nothing here fails visibly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameter parsing settings, handed to every [`Params`] at construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// `chrono` format string used by [`Params::get_date`].
    pub date_format: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Matched path segments plus the decoded query string of one request.
#[derive(Debug, Clone, Default)]
pub struct Params {
    path: Vec<(String, String)>,
    query: Vec<(String, String)>,
    config: ParamsConfig,
}

impl Params {
    pub fn new(path: Vec<(String, String)>, query: Option<&str>, config: ParamsConfig) -> Self {
        let query = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path,
            query,
            config,
        }
    }

    /// The value for `key`, if present.
    ///
    /// An empty path value is skipped so it does not shadow the query string;
    /// an empty query value is returned as `Some("")`.
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        let from_path = self
            .path
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str());

        from_path.or_else(|| {
            self.query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        })
    }

    /// The value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.get_opt(key).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i32 {
        self.get(key).parse().unwrap_or_default()
    }

    pub fn get_int64(&self, key: &str) -> i64 {
        self.get(key).parse().unwrap_or_default()
    }

    /// Parse the value with the configured date format.
    ///
    /// Returns `NaiveDate::default()` (1970-01-01) when missing or malformed.
    pub fn get_date(&self, key: &str) -> NaiveDate {
        NaiveDate::parse_from_str(self.get(key), &self.config.date_format).unwrap_or_default()
    }

    /// Matched path segments in pattern order.
    pub fn path_params(&self) -> &[(String, String)] {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(path: &[(&str, &str)], query: Option<&str>) -> Params {
        let path = path
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Params::new(path, query, ParamsConfig::default())
    }

    #[test]
    fn test_path_shadows_query() {
        let p = params(&[("id", "5")], Some("id=9&sort=asc"));
        assert_eq!(p.get("id"), "5");
        assert_eq!(p.get("sort"), "asc");
        assert_eq!(p.get("missing"), "");
    }

    #[test]
    fn test_first_query_value_wins() {
        let p = params(&[], Some("tag=a&tag=b"));
        assert_eq!(p.get("tag"), "a");
    }

    #[test]
    fn test_query_values_are_decoded() {
        let p = params(&[], Some("q=hello%20world&name=a+b"));
        assert_eq!(p.get("q"), "hello world");
        assert_eq!(p.get("name"), "a b");
    }

    #[test]
    fn test_integer_getters_default_to_zero() {
        let p = params(&[("page", "3")], Some("limit=abc&big=9000000000"));
        assert_eq!(p.get_int("page"), 3);
        assert_eq!(p.get_int("limit"), 0);
        assert_eq!(p.get_int64("missing"), 0);
        assert_eq!(p.get_int64("big"), 9_000_000_000);
        // Overflows i32
        assert_eq!(p.get_int("big"), 0);
    }

    #[test]
    fn test_get_date_uses_configured_format() {
        let p = params(&[], Some("from=2024-02-29&bad=29/02/2024"));
        assert_eq!(
            p.get_date("from"),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(p.get_date("bad"), NaiveDate::default());
        assert_eq!(p.get_date("missing"), NaiveDate::default());

        let config = ParamsConfig {
            date_format: "%d/%m/%Y".to_string(),
        };
        let p = Params::new(Vec::new(), Some("bad=29/02/2024"), config);
        assert_eq!(
            p.get_date("bad"),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_empty_values() {
        let p = params(&[("id", "")], Some("id=9&flag="));
        // Empty path value falls through to the query string
        assert_eq!(p.get_opt("id"), Some("9"));
        assert_eq!(p.get_opt("flag"), Some(""));
    }

    #[test]
    fn test_no_query_string() {
        let p = params(&[("id", "7")], None);
        assert_eq!(p.get("id"), "7");
        assert_eq!(p.get_opt("other"), None);
    }
}
