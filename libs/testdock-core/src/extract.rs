// Output extraction - locating where test runner output begins within the
// mixed install + test logs of a container run.

use regex::Regex;

use crate::errors::{Error, Result};

const PYTEST_BANNER_PATTERN: &str = r"(?i)={2,}[ \t]*test session starts[ \t]*={2,}";

/// Matcher for the delimiter line that marks the start of the test runner's
/// reporting section.
///
/// The default matches pytest's session banner; callers targeting a
/// different runner can supply their own pattern.
#[derive(Debug, Clone)]
pub struct OutputDelimiter {
    banner: Regex,
}

impl OutputDelimiter {
    /// The pytest banner: a row of '=' characters, the words
    /// "test session starts", another row of '='. Case and spacing tolerant.
    pub fn pytest() -> Self {
        Self {
            banner: Regex::new(PYTEST_BANNER_PATTERN).expect("static pattern compiles"),
        }
    }

    /// Build a matcher from a caller-supplied regex pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            banner: Regex::new(pattern)?,
        })
    }

    /// Return everything from the first banner match (inclusive, verbatim)
    /// to the end of the stream. Nothing precedes the banner in the result.
    pub fn extract<'a>(&self, output: &'a str) -> Result<&'a str> {
        let banner = self.banner.find(output).ok_or(Error::BannerNotFound)?;
        Ok(&output[banner.start()..])
    }
}

impl Default for OutputDelimiter {
    fn default() -> Self {
        Self::pytest()
    }
}
