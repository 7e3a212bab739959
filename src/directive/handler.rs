//! Typed directive handlers and value conversions.
//!
//! A handler is a kind tag plus a typed setter. Dispatch converts the raw
//! literal according to the kind and hands the converted value to the
//! setter, which mutates the staged load. Direct field targets are plain
//! setters built with [`field`].

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::config::schema::ConfigRecord;
use crate::error::{ConfError, ConfResult};
use crate::lifecycle::StagedConfig;

/// Setter invoked with the converted value.
pub type Setter<T> = Arc<dyn Fn(&mut StagedConfig, T) -> ConfResult<()> + Send + Sync>;

/// Value kind a handler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Binary,
    Int,
    Size,
    Severity,
    Uid,
    Gid,
    Word,
    FileCreateMode,
    Custom,
    GoneAway,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerKind::Binary => "binary",
            HandlerKind::Int => "integer",
            HandlerKind::Size => "size",
            HandlerKind::Severity => "severity",
            HandlerKind::Uid => "uid",
            HandlerKind::Gid => "gid",
            HandlerKind::Word => "word",
            HandlerKind::FileCreateMode => "file-create-mode",
            HandlerKind::Custom => "custom",
            HandlerKind::GoneAway => "gone-away",
        };
        f.pad(name)
    }
}

/// Handler bound to a directive name.
#[derive(Clone)]
pub enum Handler {
    Binary(Setter<bool>),
    Int(Setter<i64>),
    Size(Setter<i64>),
    Severity(Setter<u8>),
    Uid(Setter<u32>),
    Gid(Setter<u32>),
    Word(Setter<String>),
    FileCreateMode(Setter<u32>),
    /// Receives the raw value; owns it from here on.
    Custom(Setter<String>),
    /// Retired directive: accepted with a warning, otherwise ignored.
    GoneAway,
}

impl Handler {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut StagedConfig, String) -> ConfResult<()> + Send + Sync + 'static,
    {
        Handler::Custom(Arc::new(f))
    }

    pub fn word<F>(f: F) -> Self
    where
        F: Fn(&mut StagedConfig, String) -> ConfResult<()> + Send + Sync + 'static,
    {
        Handler::Word(Arc::new(f))
    }

    pub fn int<F>(f: F) -> Self
    where
        F: Fn(&mut StagedConfig, i64) -> ConfResult<()> + Send + Sync + 'static,
    {
        Handler::Int(Arc::new(f))
    }

    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Binary(_) => HandlerKind::Binary,
            Handler::Int(_) => HandlerKind::Int,
            Handler::Size(_) => HandlerKind::Size,
            Handler::Severity(_) => HandlerKind::Severity,
            Handler::Uid(_) => HandlerKind::Uid,
            Handler::Gid(_) => HandlerKind::Gid,
            Handler::Word(_) => HandlerKind::Word,
            Handler::FileCreateMode(_) => HandlerKind::FileCreateMode,
            Handler::Custom(_) => HandlerKind::Custom,
            Handler::GoneAway => HandlerKind::GoneAway,
        }
    }

    /// Convert `raw` according to the handler kind and apply it.
    pub(crate) fn invoke(&self, staged: &mut StagedConfig, directive: &str, raw: String) -> ConfResult<()> {
        match self {
            Handler::Binary(set) => {
                let value = parse_binary(directive, &raw)?;
                set(staged, value)
            }
            Handler::Int(set) => {
                let value = parse_int(directive, &raw)?;
                set(staged, value)
            }
            Handler::Size(set) => {
                let value = parse_size(directive, &raw)?;
                set(staged, value)
            }
            Handler::Severity(set) => {
                let value = parse_severity(directive, &raw)?;
                set(staged, value)
            }
            Handler::Uid(set) => {
                let word = parse_word(directive, &raw)?;
                let uid = match word.parse::<u32>() {
                    Ok(uid) => uid,
                    Err(_) => staged
                        .process()
                        .lookup_user(word)
                        .ok_or_else(|| ConfError::conversion(directive, word, "unknown user"))?,
                };
                set(staged, uid)
            }
            Handler::Gid(set) => {
                let word = parse_word(directive, &raw)?;
                let gid = match word.parse::<u32>() {
                    Ok(gid) => gid,
                    Err(_) => staged
                        .process()
                        .lookup_group(word)
                        .ok_or_else(|| ConfError::conversion(directive, word, "unknown group"))?,
                };
                set(staged, gid)
            }
            Handler::Word(set) => {
                let word = parse_word(directive, &raw)?.to_string();
                set(staged, word)
            }
            Handler::FileCreateMode(set) => {
                let mode = parse_file_mode(directive, &raw)?;
                set(staged, mode)
            }
            Handler::Custom(set) => set(staged, raw),
            Handler::GoneAway => {
                warn!(
                    directive = %directive,
                    "directive is no longer supported and has been ignored"
                );
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}

/// Setter writing straight into a record field.
pub fn field<T>(accessor: fn(&mut ConfigRecord) -> &mut T) -> Setter<T>
where
    T: Send + 'static,
{
    Arc::new(move |staged: &mut StagedConfig, value: T| -> ConfResult<()> {
        *accessor(staged.record_mut()) = value;
        Ok(())
    })
}

/// Setter writing an optional record field.
pub fn optional_field<T>(accessor: fn(&mut ConfigRecord) -> &mut Option<T>) -> Setter<T>
where
    T: Send + 'static,
{
    Arc::new(move |staged: &mut StagedConfig, value: T| -> ConfResult<()> {
        *accessor(staged.record_mut()) = Some(value);
        Ok(())
    })
}

/// First whitespace-delimited word of the value.
pub fn parse_word<'a>(directive: &str, raw: &'a str) -> ConfResult<&'a str> {
    raw.split_whitespace()
        .next()
        .ok_or_else(|| ConfError::conversion(directive, raw, "a value is required"))
}

/// `on`/`off` (also `yes`/`no`), case-insensitive.
pub fn parse_binary(directive: &str, raw: &str) -> ConfResult<bool> {
    let word = parse_word(directive, raw)?;
    match word.to_ascii_lowercase().as_str() {
        "on" | "yes" => Ok(true),
        "off" | "no" => Ok(false),
        _ => Err(ConfError::conversion(directive, word, "expected 'on' or 'off'")),
    }
}

pub fn parse_int(directive: &str, raw: &str) -> ConfResult<i64> {
    let word = parse_word(directive, raw)?;
    word.parse::<i64>()
        .map_err(|e| ConfError::conversion(directive, word, e.to_string()))
}

/// Integer with an optional unit suffix: lower-case `k`/`m`/`g`/`t` are
/// decimal multiples, upper-case are binary multiples.
pub fn parse_size(directive: &str, raw: &str) -> ConfResult<i64> {
    let word = parse_word(directive, raw)?;
    let split = word
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(word.len());
    let (digits, suffix) = word.split_at(split);
    if digits.is_empty() {
        return Err(ConfError::conversion(directive, word, "expected a number"));
    }
    let base: i64 = digits
        .parse()
        .map_err(|_| ConfError::conversion(directive, word, "number out of range"))?;

    let multiplier: i64 = match suffix {
        "" => 1,
        "k" => 1_000,
        "K" => 1 << 10,
        "m" => 1_000_000,
        "M" => 1 << 20,
        "g" => 1_000_000_000,
        "G" => 1 << 30,
        "t" => 1_000_000_000_000,
        "T" => 1 << 40,
        _ => {
            return Err(ConfError::conversion(
                directive,
                word,
                format!("unknown size suffix '{suffix}'"),
            ))
        }
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| ConfError::conversion(directive, word, "size out of range"))
}

const SEVERITY_NAMES: &[(&str, u8)] = &[
    ("emerg", 0),
    ("panic", 0),
    ("alert", 1),
    ("crit", 2),
    ("err", 3),
    ("error", 3),
    ("warning", 4),
    ("warn", 4),
    ("notice", 5),
    ("info", 6),
    ("debug", 7),
];

/// Severity by name or as a number 0-7.
pub fn parse_severity(directive: &str, raw: &str) -> ConfResult<u8> {
    let word = parse_word(directive, raw)?;
    if let Ok(n) = word.parse::<u8>() {
        return if n <= 7 {
            Ok(n)
        } else {
            Err(ConfError::conversion(directive, word, "severity must be 0-7"))
        };
    }
    let lower = word.to_ascii_lowercase();
    SEVERITY_NAMES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, sev)| *sev)
        .ok_or_else(|| ConfError::conversion(directive, word, "unknown severity name"))
}

/// Four octal digits with a leading zero, e.g. `0644`.
pub fn parse_file_mode(directive: &str, raw: &str) -> ConfResult<u32> {
    let word = parse_word(directive, raw)?;
    let well_formed = word.len() == 4
        && word.starts_with('0')
        && word.bytes().all(|b| (b'0'..=b'7').contains(&b));
    if !well_formed {
        return Err(ConfError::conversion(
            directive,
            word,
            "file creation mode must be 4 octal digits with a leading 0",
        ));
    }
    u32::from_str_radix(word, 8).map_err(|e| ConfError::conversion(directive, word, e.to_string()))
}
