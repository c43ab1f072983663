//! String-keyed attribute table
//!
//! Maps attribute names (and aliases) to typed accessor pairs on
//! [`Animation`], so declarative layers can configure animations by name.
//! Names are matched after normalization: `frameCount`, `frame-count` and
//! `frame_count` are the same attribute.

use crate::animation::Animation;
use crate::config::duration_from_secs;
use crate::error::{AnimationError, Result};
use crate::value::AttrValue;
use std::time::Duration;

pub(crate) type Getter = fn(&Animation) -> AttrValue;
pub(crate) type Setter = fn(&Animation, &'static str, AttrValue) -> Result<()>;

pub(crate) struct Attribute {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub get: Getter,
    pub set: Setter,
}

static ATTRIBUTES: &[Attribute] = &[
    Attribute {
        name: "cycle",
        aliases: &[],
        get: get_cycle,
        set: set_cycle,
    },
    Attribute {
        name: "cycle_count",
        aliases: &[],
        get: get_cycle_count,
        set: set_cycle_count,
    },
    Attribute {
        name: "frame_count",
        aliases: &[],
        get: get_frame_count,
        set: set_frame_count,
    },
    Attribute {
        name: "duration_limit",
        aliases: &[],
        get: get_duration_limit,
        set: set_duration_limit,
    },
    Attribute {
        name: "frame_delay",
        aliases: &["every"],
        get: get_frame_delay,
        set: set_frame_delay,
    },
    Attribute {
        name: "started",
        aliases: &[],
        get: get_started,
        set: set_started,
    },
];

/// Canonical snake_case form of an attribute name
fn normalize(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len() + 4);
    for (i, c) in name.trim().chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                normalized.push('_');
            }
            normalized.push(c.to_ascii_lowercase());
        } else if c == '-' {
            normalized.push('_');
        } else {
            normalized.push(c);
        }
    }
    normalized
}

pub(crate) fn lookup(name: &str) -> Option<&'static Attribute> {
    let name = normalize(name);
    ATTRIBUTES
        .iter()
        .find(|attr| attr.name == name || attr.aliases.contains(&name.as_str()))
}

/// Canonical names of all attributes
pub fn attribute_names() -> Vec<&'static str> {
    ATTRIBUTES.iter().map(|attr| attr.name).collect()
}

fn invalid(name: &'static str, expected: &'static str, value: &AttrValue) -> AnimationError {
    AnimationError::InvalidAttribute {
        name: name.to_string(),
        expected,
        got: value.type_name(),
    }
}

fn optional_count(name: &'static str, value: AttrValue) -> Result<Option<u64>> {
    if value.is_nil() {
        return Ok(None);
    }
    value
        .as_count()
        .map(Some)
        .ok_or_else(|| invalid(name, "non-negative integer or nil", &value))
}

fn optional_seconds(name: &'static str, value: AttrValue) -> Result<Option<Duration>> {
    if value.is_nil() {
        return Ok(None);
    }
    let secs = value
        .as_f64()
        .ok_or_else(|| invalid(name, "seconds or nil", &value))?;
    duration_from_secs(name, secs).map(Some)
}

fn seconds_value(duration: Option<Duration>) -> AttrValue {
    duration
        .map(|d| AttrValue::Float(d.as_secs_f64()))
        .unwrap_or_default()
}

fn get_cycle(animation: &Animation) -> AttrValue {
    animation.cycle().map(AttrValue::List).unwrap_or_default()
}

fn set_cycle(animation: &Animation, _name: &'static str, value: AttrValue) -> Result<()> {
    animation.set_cycle(value.into_cycle());
    Ok(())
}

fn get_cycle_count(animation: &Animation) -> AttrValue {
    animation.cycle_count().into()
}

fn set_cycle_count(animation: &Animation, name: &'static str, value: AttrValue) -> Result<()> {
    animation.set_cycle_count(optional_count(name, value)?);
    Ok(())
}

fn get_frame_count(animation: &Animation) -> AttrValue {
    animation.frame_count().into()
}

fn set_frame_count(animation: &Animation, name: &'static str, value: AttrValue) -> Result<()> {
    animation.set_frame_count(optional_count(name, value)?);
    Ok(())
}

fn get_duration_limit(animation: &Animation) -> AttrValue {
    seconds_value(animation.duration_limit())
}

fn set_duration_limit(animation: &Animation, name: &'static str, value: AttrValue) -> Result<()> {
    animation.set_duration_limit(optional_seconds(name, value)?);
    Ok(())
}

fn get_frame_delay(animation: &Animation) -> AttrValue {
    seconds_value(animation.frame_delay())
}

fn set_frame_delay(animation: &Animation, name: &'static str, value: AttrValue) -> Result<()> {
    animation.set_frame_delay(optional_seconds(name, value)?);
    Ok(())
}

fn get_started(animation: &Animation) -> AttrValue {
    if animation.is_attached() {
        animation.is_started().into()
    } else {
        animation.autostart().into()
    }
}

fn set_started(animation: &Animation, name: &'static str, value: AttrValue) -> Result<()> {
    let started = value
        .as_bool()
        .ok_or_else(|| invalid(name, "bool", &value))?;
    animation.set_started(started)
}
