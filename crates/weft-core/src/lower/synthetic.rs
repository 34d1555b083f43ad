//! Synthetic parameter calculator.
//!
//! Both the declaration rewriter and the call-site rewriter derive the
//! synthetic parameter group from these functions alone, so callers and
//! callees agree on word counts without sharing state.

use crate::ir::ParamOrigin;

/// Width of one change or default word.
pub const BITS_PER_WORD: usize = 32;

pub const COMPOSER_PARAM: &str = "$composer";
pub const CHANGED_PARAM: &str = "$changed";
pub const DEFAULT_PARAM: &str = "$default";

/// One synthetic parameter, in the order they are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticParam {
    Composer,
    /// Change word `i`.
    Changed(usize),
    /// Default-presence word `i`.
    Default(usize),
}

impl SyntheticParam {
    /// `$composer`, `$changed`, `$changed1`, `$default`, `$default1`, ...
    pub fn name(self) -> String {
        match self {
            SyntheticParam::Composer => COMPOSER_PARAM.to_string(),
            SyntheticParam::Changed(0) => CHANGED_PARAM.to_string(),
            SyntheticParam::Changed(i) => format!("{}{}", CHANGED_PARAM, i),
            SyntheticParam::Default(0) => DEFAULT_PARAM.to_string(),
            SyntheticParam::Default(i) => format!("{}{}", DEFAULT_PARAM, i),
        }
    }

    pub fn origin(self) -> ParamOrigin {
        match self {
            SyntheticParam::Composer => ParamOrigin::Composer,
            SyntheticParam::Changed(_) => ParamOrigin::Changed,
            SyntheticParam::Default(_) => ParamOrigin::DefaultMask,
        }
    }
}

fn words(bits: usize) -> usize {
    bits.div_ceil(BITS_PER_WORD)
}

/// Change words for `real` value parameters and `receivers` receiver slots.
/// Never zero.
pub fn changed_word_count(real: usize, receivers: usize) -> usize {
    words(real + receivers + 1)
}

/// Default-presence words for `real` value parameters.
pub fn default_word_count(real: usize) -> usize {
    words(real)
}

/// The ordered synthetic parameter group.
pub fn synthetic_params(real: usize, receivers: usize, has_defaults: bool) -> Vec<SyntheticParam> {
    let mut params = vec![SyntheticParam::Composer];
    params.extend((0..changed_word_count(real, receivers)).map(SyntheticParam::Changed));
    if has_defaults {
        params.extend((0..default_word_count(real)).map(SyntheticParam::Default));
    }
    params
}

pub fn synthetic_param_count(real: usize, receivers: usize, has_defaults: bool) -> usize {
    1 + changed_word_count(real, receivers)
        + if has_defaults {
            default_word_count(real)
        } else {
            0
        }
}

/// Pack up to [`BITS_PER_WORD`] flags into a word, flag `i` at bit `i`.
pub fn bit_mask(bits: &[bool]) -> i32 {
    debug_assert!(bits.len() <= BITS_PER_WORD);
    bits.iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .fold(0u32, |mask, (i, _)| mask | (1 << i)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_params_still_get_a_change_word() {
        assert_eq!(
            synthetic_params(0, 0, false),
            vec![SyntheticParam::Composer, SyntheticParam::Changed(0)]
        );
        assert_eq!(changed_word_count(0, 2), 1);
    }

    #[test]
    fn test_word_boundaries() {
        // 31 params + 1 = 32 bits: one word.
        assert_eq!(changed_word_count(31, 0), 1);
        // The receiver pushes it over.
        assert_eq!(changed_word_count(31, 1), 2);
        assert_eq!(default_word_count(32), 1);
        assert_eq!(default_word_count(33), 2);
        assert_eq!(synthetic_param_count(33, 0, true), 1 + 2 + 2);
    }

    #[test]
    fn test_count_matches_list() {
        for real in 0..70 {
            for receivers in 0..=2 {
                for defaults in [false, true] {
                    assert_eq!(
                        synthetic_params(real, receivers, defaults).len(),
                        synthetic_param_count(real, receivers, defaults)
                    );
                }
            }
        }
    }

    #[test]
    fn test_names() {
        let names: Vec<_> = synthetic_params(40, 0, true)
            .into_iter()
            .map(SyntheticParam::name)
            .collect();
        assert_eq!(
            names,
            vec!["$composer", "$changed", "$changed1", "$default", "$default1"]
        );
    }

    #[test]
    fn test_bit_mask() {
        assert_eq!(bit_mask(&[]), 0);
        assert_eq!(bit_mask(&[true, false, true]), 0b101);
        let mut high = vec![false; 32];
        high[31] = true;
        assert_eq!(bit_mask(&high), i32::MIN);
    }
}
