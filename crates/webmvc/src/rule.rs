//! Pluggable rule checks for parameter values.

use crate::value::Value;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::RwLock;
use tracing::warn;

/// Evaluates a named rule expression against a bound value.
#[cfg_attr(test, mockall::automock)]
pub trait RuleChecker: Send + Sync {
    fn exec(&self, rule: &str, value: &Value) -> bool;
}

/// Treats every rule as a regular expression that must match the whole textual value.
///
/// Compiled expressions are cached by rule text. A rule that does not compile fails every check.
#[derive(Debug, Default)]
pub struct RegexRuleChecker {
    cache: RwLock<HashMap<String, Option<Regex>>>,
}

impl RegexRuleChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_regex<F: FnOnce(&Regex) -> bool>(&self, rule: &str, f: F) -> bool {
        if let Ok(cache) = self.cache.read()
            && let Some(compiled) = cache.get(rule)
        {
            return compiled.as_ref().is_some_and(f);
        }

        let compiled = match Regex::new(&format!("^(?:{rule})$")) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(rule, cause = %e, "invalid rule expression");
                None
            }
        };
        let matched = compiled.as_ref().is_some_and(f);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(rule.to_string(), compiled);
        }
        matched
    }
}

impl RuleChecker for RegexRuleChecker {
    fn exec(&self, rule: &str, value: &Value) -> bool {
        match value.to_text() {
            Some(text) => self.with_regex(rule, |regex| regex.is_match(&text)),
            None => false,
        }
    }
}

pub struct FnRuleChecker<F> {
    f: F,
}

impl<F> Debug for FnRuleChecker<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRuleChecker").finish_non_exhaustive()
    }
}

impl<F> RuleChecker for FnRuleChecker<F>
where
    F: Fn(&str, &Value) -> bool + Send + Sync,
{
    fn exec(&self, rule: &str, value: &Value) -> bool {
        (self.f)(rule, value)
    }
}

/// Adapts a closure into a [`RuleChecker`].
pub fn fn_rule<F>(f: F) -> FnRuleChecker<F>
where
    F: Fn(&str, &Value) -> bool + Send + Sync,
{
    FnRuleChecker { f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_must_match_whole_value() {
        let checker = RegexRuleChecker::new();
        assert!(checker.exec("[0-9]+", &Value::Str("2026".into())));
        assert!(!checker.exec("[0-9]+", &Value::Str("v2026".into())));
        assert!(checker.exec("a|b", &Value::Str("b".into())));
    }

    #[test]
    fn regex_checks_numbers_by_their_text() {
        let checker = RegexRuleChecker::new();
        assert!(checker.exec("\\d{2}", &Value::Int(42)));
        assert!(!checker.exec("\\d{2}", &Value::Int(420)));
    }

    #[test]
    fn invalid_regex_fails_the_check() {
        let checker = RegexRuleChecker::new();
        assert!(!checker.exec("(", &Value::Str("(".into())));
        // cached failure is stable
        assert!(!checker.exec("(", &Value::Str("(".into())));
    }

    #[test]
    fn values_without_text_fail() {
        let checker = RegexRuleChecker::new();
        assert!(!checker.exec(".*", &Value::List(vec![])));
    }

    #[test]
    fn closure_rules() {
        let checker = fn_rule(|rule, value| rule == "even" && value.as_i64().is_some_and(|n| n % 2 == 0));
        assert!(checker.exec("even", &Value::Int(4)));
        assert!(!checker.exec("even", &Value::Int(3)));
        assert!(!checker.exec("odd", &Value::Int(4)));
    }
}
