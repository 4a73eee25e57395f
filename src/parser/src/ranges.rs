use crate::ParserError;

use anyhow::Result;
use located_error::LocatedError;

/// Parse user range tokens (`"9-11"`, `"13"`) into a flat, sorted,
/// deduplicated index list.
///
/// # Errors
/// `InvalidRange` / `ReversedRange` on malformed tokens.
pub fn parse_ranges(tokens: &[String], arg: &'static str) -> Result<Vec<usize>> {
    let mut values = Vec::new();
    for (low, high) in parse_range_pairs(tokens, arg)? {
        values.extend(low..=high);
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

/// Parse user range tokens into `(low, high)` inclusive pairs; a bare index
/// becomes a one-element pair.
///
/// # Errors
/// `InvalidRange` / `ReversedRange` on malformed tokens.
pub fn parse_range_pairs(tokens: &[String], arg: &'static str) -> Result<Vec<(usize, usize)>> {
    let context = || format!("While parsing the --{arg} argument");
    let mut pairs = Vec::with_capacity(tokens.len());
    for token in tokens {
        let invalid = || ParserError::InvalidRange { arg, value: token.clone() };
        let pair = match token.split_once('-') {
            None => {
                let index: usize = token.trim().parse().map_err(|_| invalid()).with_loc(context)?;
                (index, index)
            }
            Some((low, high)) => {
                let low : usize = low.trim().parse().map_err(|_| invalid()).with_loc(context)?;
                let high: usize = high.trim().parse().map_err(|_| invalid()).with_loc(context)?;
                if high < low {
                    return Err(ParserError::ReversedRange(token.clone())).with_loc(context)
                }
                (low, high)
            }
        };
        pairs.push(pair);
    }
    Ok(pairs)
}
