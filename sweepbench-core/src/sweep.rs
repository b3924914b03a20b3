//! Shape Sweep Enumeration
//!
//! Expands per-axis value lists into the full cross product of run
//! configurations. Enumeration is nested-loop order: the first axis varies
//! slowest, the last axis fastest.
//!
//! ```text
//! axes: [m: 1,2] [dtype: fp16,fp32]
//!
//!   (1, fp16) (1, fp32) (2, fp16) (2, fp32)
//! ```
//!
//! [`Sweep`] holds only axis lengths; every call to [`Sweep::iter`] starts a
//! fresh odometer, so re-enumerating always yields the same sequence.

use crate::error::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

/// Most values a single range may expand to
pub const MAX_RANGE_LEN: u64 = 1 << 16;
/// Most combinations a sweep may enumerate
pub const MAX_SWEEP_LEN: usize = 1 << 20;

/// One named sweep dimension with at least one value
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAxis<T> {
    name: String,
    values: Vec<T>,
}

impl<T> ShapeAxis<T> {
    /// Create an axis, rejecting empty value lists.
    pub fn new(name: impl Into<String>, values: Vec<T>) -> Result<Self, ConfigError> {
        let name = name.into();
        if values.is_empty() {
            return Err(ConfigError::EmptyAxis(name));
        }
        Ok(Self { name, values })
    }

    /// Axis name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axis values in sweep order
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of values (always >= 1)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for API symmetry with slices
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Cross product over a set of axis lengths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    lens: Vec<usize>,
}

impl Sweep {
    /// Build a sweep from axis lengths. Every axis must have at least one
    /// value and the product may not exceed [`MAX_SWEEP_LEN`].
    pub fn new(lens: Vec<usize>) -> Result<Self, ConfigError> {
        if let Some(pos) = lens.iter().position(|&len| len == 0) {
            return Err(ConfigError::EmptyAxis(format!("#{}", pos)));
        }
        match checked_product(&lens) {
            Some(len) if len <= MAX_SWEEP_LEN => Ok(Self { lens }),
            _ => Err(ConfigError::SweepTooLarge {
                limit: MAX_SWEEP_LEN,
            }),
        }
    }

    /// Build a sweep matching the shape of `axes`.
    pub fn from_axes<T>(axes: &[ShapeAxis<T>]) -> Self {
        Self {
            lens: axes.iter().map(ShapeAxis::len).collect(),
        }
    }

    /// Build a sweep from the lengths of already-validated [`ShapeAxis`] values.
    pub(crate) fn from_lens(lens: impl Into<Vec<usize>>) -> Self {
        let lens = lens.into();
        debug_assert!(lens.iter().all(|&len| len > 0));
        Self { lens }
    }

    /// Number of combinations (product of axis lengths), saturating at
    /// `usize::MAX`
    pub fn len(&self) -> usize {
        checked_product(&self.lens).unwrap_or(usize::MAX)
    }

    /// True only when the product is zero, which `new` rules out
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate index tuples in nested-loop order.
    pub fn iter(&self) -> SweepIter<'_> {
        SweepIter {
            lens: &self.lens,
            next: Some(vec![0; self.lens.len()]),
            remaining: self.len(),
        }
    }
}

/// Odometer over the index tuples of a [`Sweep`]
#[derive(Debug, Clone)]
pub struct SweepIter<'a> {
    lens: &'a [usize],
    next: Option<Vec<usize>>,
    remaining: usize,
}

impl Iterator for SweepIter<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.remaining -= 1;

        // Advance the last axis first, carrying into earlier axes
        let mut advanced = current.clone();
        let mut axis = advanced.len();
        loop {
            if axis == 0 {
                // Wrapped around the first axis: enumeration finished
                break;
            }
            axis -= 1;
            advanced[axis] += 1;
            if advanced[axis] < self.lens[axis] {
                self.next = Some(advanced);
                break;
            }
            advanced[axis] = 0;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SweepIter<'_> {}

fn checked_product(lens: &[usize]) -> Option<usize> {
    lens.iter().try_fold(1usize, |acc, &len| acc.checked_mul(len))
}

/// Enumerate the value tuples of homogeneous axes.
pub fn cross_product<T: Clone>(axes: &[ShapeAxis<T>]) -> Vec<Vec<T>> {
    Sweep::from_axes(axes)
        .iter()
        .map(|indices| {
            indices
                .iter()
                .zip(axes)
                .map(|(&i, axis)| axis.values[i].clone())
                .collect()
        })
        .collect()
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?::(\d+)(?::(\*)?(\d+))?)?$").expect("range pattern is valid")
    })
}

/// Expand a single-dimension value or range.
///
/// - `"4096"` → `[4096]`
/// - `"2:16"` → `[2, 4, 8, 16]` (default step doubles)
/// - `"2:8:*2"` → `[2, 4, 8]`
/// - `"1:4:1"` → `[1, 2, 3, 4]`
pub fn parse_range(value: &str) -> Result<Vec<u64>, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidRange {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let caps = range_pattern()
        .captures(trimmed)
        .ok_or_else(|| invalid("expected 'value' or 'start:end[:step]'"))?;

    let number = |idx: usize| -> Result<Option<u64>, ConfigError> {
        caps.get(idx)
            .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid("number out of range")))
            .transpose()
    };

    let start = number(1)?.ok_or_else(|| invalid("missing start"))?;
    let Some(end) = number(2)? else {
        return Ok(vec![start]);
    };
    if start > end {
        return Err(invalid("start is greater than end"));
    }

    let multiplicative = caps.get(4).is_none() || caps.get(3).is_some();
    let step = number(4)?.unwrap_or(2);

    let mut values = Vec::new();
    let mut current = start;
    if multiplicative {
        if start == 0 || step < 2 {
            return Err(invalid("multiplicative range needs start >= 1 and factor >= 2"));
        }
        while current <= end {
            values.push(current);
            current = match current.checked_mul(step) {
                Some(next) => next,
                None => break,
            };
        }
    } else {
        if step == 0 {
            return Err(invalid("step must be positive"));
        }
        if (end - start) / step >= MAX_RANGE_LEN {
            return Err(invalid(&format!(
                "expands to more than {} values",
                MAX_RANGE_LEN
            )));
        }
        while current <= end {
            values.push(current);
            current = match current.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    }
    Ok(values)
}
