use crate::error::SimError;
use anyhow::{Result, bail};
use std::{fmt::Debug, ops::RangeBounds};

/// Check that `value` is a probability, i.e. lies in `[0, 1]`.
pub fn check_prob(name: &'static str, value: f64) -> Result<f64, SimError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::InvalidProbability { name, value });
    }
    Ok(value)
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
