//! printf-style message template.
//!
//! A template carries exactly three `%s` slots which are filled, in order,
//! with the test name, the derived failure message and the trace. `%%` is a
//! literal percent sign; any other `%` sequence is copied verbatim.

use serde::{de, Deserialize, Deserializer};
use std::fmt;

use crate::{Error, Result};

pub const DEFAULT_TEMPLATE: &str = "Test %s failed. \nMessage: %s.\nTrace: %s";

const SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: impl Into<String>) -> Result<Template> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.peek() {
                Some('s') => {
                    chars.next();
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot);
                }
                Some('%') => {
                    chars.next();
                    literal.push('%');
                }
                _ => literal.push('%'),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let slots = segments.iter().filter(|s| **s == Segment::Slot).count();
        if slots != SLOTS {
            return Err(Error::InvalidTemplate {
                template: source,
                slots,
            });
        }

        Ok(Template { source, segments })
    }

    /// Fill the slots with name, message and trace.
    pub fn render(&self, name: &str, message: &str, trace: &str) -> String {
        let mut values = [name, message, trace].into_iter();
        let mut out = String::with_capacity(
            self.source.len() + name.len() + message.len() + trace.len(),
        );
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Slot => out.push_str(values.next().unwrap_or_default()),
            }
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for Template {
    fn default() -> Self {
        Template::parse(DEFAULT_TEMPLATE)
            .unwrap_or_else(|_| unreachable!("default template has 3 slots"))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Template::parse(source).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn render_default() {
        let rendered = Template::default().render("LoginCest:testLogin", "X", "Y");
        assert_eq!(
            rendered,
            "Test LoginCest:testLogin failed. \nMessage: X.\nTrace: Y"
        );
    }

    #[test_case("%s|%s|%s", "a|b|c"; "slots only")]
    #[test_case("100%% of %s: %s (%s)", "100% of a: b (c)"; "escaped percent")]
    #[test_case("%d %s %s %s %", "%d a b c %"; "unknown sequences kept")]
    fn render(template: &str, expected: &str) -> eyre::Result<()> {
        assert_eq!(Template::parse(template)?.render("a", "b", "c"), expected);
        Ok(())
    }

    #[test_case("Test %s failed", 1; "too few")]
    #[test_case("%s %s %s %s", 4; "too many")]
    #[test_case("%%s %s %s", 2; "escaped slot")]
    fn reject_wrong_slot_count(template: &str, slots: usize) {
        match Template::parse(template) {
            Err(Error::InvalidTemplate { slots: found, .. }) => assert_eq!(found, slots),
            other => panic!("expected InvalidTemplate, got {other:?}"),
        }
    }

    #[test]
    fn deserialize_rejects_invalid() {
        #[derive(Debug, Deserialize)]
        struct Helper {
            #[allow(dead_code)]
            message: Template,
        }
        let err = toml::from_str::<Helper>("message = \"%s\"").unwrap_err();
        assert!(err.to_string().contains("3 \"%s\" slots"), "{err}");
    }
}
