use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::parse_bool;
use crate::error::SqlKeywordError;

/// Arguments of one keyword call as the runner hands them over: all strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordArgs {
    pub positional: Vec<String>,
    pub named: BTreeMap<String, String>,
}

impl KeywordArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build positional-only arguments.
    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            named: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Match arguments against a keyword's parameter list.
    ///
    /// Positional values fill `params` in order; named values match a parameter when they are
    /// equal ignoring case and underscores (`db_prefix` binds `dbPrefix`). Surplus positional
    /// values go to `varargs` and unmatched named values to `kwargs`, when the signature takes
    /// them.
    ///
    /// # Errors
    /// Returns `SqlKeywordError::ParameterError` for surplus or duplicate arguments.
    pub fn bind(self, signature: &Signature) -> Result<BoundArgs, SqlKeywordError> {
        let mut values = BTreeMap::new();
        let mut positional = self.positional.into_iter();
        for param in signature.params {
            match positional.next() {
                Some(value) => {
                    values.insert(*param, value);
                }
                None => break,
            }
        }
        let varargs: Vec<String> = positional.collect();
        if !varargs.is_empty() && !signature.varargs {
            return Err(SqlKeywordError::ParameterError(format!(
                "{} expected at most {} positional argument(s), got {}",
                signature.keyword,
                signature.params.len(),
                signature.params.len() + varargs.len()
            )));
        }

        let mut kwargs = BTreeMap::new();
        for (name, value) in self.named {
            let key = param_key(&name);
            match signature.params.iter().find(|p| param_key(p) == key) {
                Some(param) if values.contains_key(param) => {
                    return Err(SqlKeywordError::ParameterError(format!(
                        "{} got multiple values for argument '{param}'",
                        signature.keyword
                    )));
                }
                Some(param) => {
                    values.insert(*param, value);
                }
                None if signature.kwargs => {
                    kwargs.insert(name, value);
                }
                None => {
                    return Err(SqlKeywordError::ParameterError(format!(
                        "{} got an unexpected argument '{name}'",
                        signature.keyword
                    )));
                }
            }
        }

        Ok(BoundArgs {
            keyword: signature.keyword,
            values,
            varargs,
            kwargs,
        })
    }
}

fn param_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parameter list of a keyword.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub keyword: &'static str,
    pub params: &'static [&'static str],
    pub varargs: bool,
    pub kwargs: bool,
}

/// Arguments matched to parameter names.
#[derive(Debug, Clone)]
pub struct BoundArgs {
    keyword: &'static str,
    values: BTreeMap<&'static str, String>,
    pub varargs: Vec<String>,
    pub kwargs: BTreeMap<String, String>,
}

impl BoundArgs {
    /// # Errors
    /// Returns `SqlKeywordError::ParameterError` when the argument is missing.
    pub fn required(&mut self, param: &str) -> Result<String, SqlKeywordError> {
        self.values.remove(param).ok_or_else(|| {
            SqlKeywordError::ParameterError(format!(
                "{} missing required argument '{param}'",
                self.keyword
            ))
        })
    }

    /// An optional argument; `None` (any case) counts as absent.
    pub fn optional(&mut self, param: &str) -> Option<String> {
        self.values
            .remove(param)
            .filter(|v| !v.eq_ignore_ascii_case("none"))
    }

    /// # Errors
    /// Returns `SqlKeywordError::ParameterError` when the value does not parse.
    pub fn optional_parsed<T>(&mut self, param: &str) -> Result<Option<T>, SqlKeywordError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(param)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    SqlKeywordError::ParameterError(format!(
                        "{} argument '{param}' = '{raw}': {e}",
                        self.keyword
                    ))
                })
            })
            .transpose()
    }

    /// # Errors
    /// Returns `SqlKeywordError::ParameterError` for a non-boolean value.
    pub fn flag(&mut self, param: &str, default: bool) -> Result<bool, SqlKeywordError> {
        self.optional(param)
            .map_or(Ok(default), |raw| parse_bool(&raw))
    }
}
