//! Rounding of byte counts to page boundaries.

/// Returns the smallest multiple of `multiple` that is greater than or equal to `value`.
///
/// Returns `value` unchanged if `multiple` is zero.
///
/// # Panics
///
/// Panics if the result does not fit in `usize`. Callers clamp their inputs to the reserved
/// address range first, which keeps the result in range.
#[must_use]
pub(crate) fn round_up_to_multiple(value: usize, multiple: usize) -> usize {
    let Some(remainder) = value.checked_rem(multiple) else {
        return value;
    };

    if remainder == 0 {
        return value;
    }

    value
        .checked_add(multiple.wrapping_sub(remainder))
        .expect("rounding up a clamped byte count cannot overflow")
}

/// Returns the largest multiple of `multiple` that is less than or equal to `value`.
///
/// Returns `value` unchanged if `multiple` is zero.
#[must_use]
pub(crate) fn round_down_to_multiple(value: usize, multiple: usize) -> usize {
    match value.checked_rem(multiple) {
        // Cannot underflow because the remainder is never greater than the value.
        Some(remainder) => value.wrapping_sub(remainder),
        None => value,
    }
}
