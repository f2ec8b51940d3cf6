use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Every resource
/// amount, capacity, credit balance, and price is stored in this type.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64, saturating at the type's range. NaN maps to
/// zero. Used for configuration rates, never for stored amounts.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    if v.is_nan() {
        Fixed64::ZERO
    } else {
        Fixed64::saturating_from_num(v)
    }
}

/// Convert Fixed64 to f64. Use only for display/telemetry, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Whole-number constant, usable in `const` items.
#[inline]
pub const fn fixed_int(v: i32) -> Fixed64 {
    Fixed64::from_bits((v as i64) << 32)
}

/// Exact-ratio constant `num / den`, truncated to the fixed-point grid.
#[inline]
pub const fn fixed_ratio(num: i32, den: i32) -> Fixed64 {
    Fixed64::from_bits(((num as i64) << 32) / den as i64)
}

/// Clamp a value to be non-negative.
#[inline]
pub fn non_negative(v: Fixed64) -> Fixed64 {
    v.max(Fixed64::ZERO)
}

/// Checked division for Fixed64 that returns None on zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}
