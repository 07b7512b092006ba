//! Extended precision add, subtract, multiply and divide.
//!
//! Finite operands are unpacked to an unbiased exponent and a normalised
//! 64-bit significand. Each result is formed exactly, or with a sticky bit,
//! in a `u128` and rounded once to nearest, ties to even.

use std::ops::{Add, Div, Mul, Sub};

use super::{EXTENDED_BIAS, EXTENDED_EXP_MAX, Extended, INTEGER_BIT};

const SIGN_BIT: u16 = 0x8000;
const QUIET_BIT: u64 = 1 << 62;

#[derive(Debug, Clone, Copy)]
enum Class {
    Zero,
    /// `sig / 2^63 * 2^exp`, with bit 63 of `sig` set.
    Finite { exp: i32, sig: u64 },
    Infinite,
    NaN,
}

fn classify(value: Extended) -> Class {
    if value.exponent() == EXTENDED_EXP_MAX {
        return if value.mantissa << 1 == 0 {
            Class::Infinite
        } else {
            Class::NaN
        };
    }
    if value.is_zero() {
        return Class::Zero;
    }
    // Denormals and unnormals are normalised here.
    let shift = value.mantissa.leading_zeros();
    Class::Finite {
        exp: value.exponent().max(1) as i32 - EXTENDED_BIAS - shift as i32,
        sig: value.mantissa << shift,
    }
}

fn sign_bits(negative: bool) -> u16 {
    if negative { SIGN_BIT } else { 0 }
}

fn zero(negative: bool) -> Extended {
    Extended::new(sign_bits(negative), 0)
}

fn infinity(negative: bool) -> Extended {
    Extended::new(sign_bits(negative) | EXTENDED_EXP_MAX, INTEGER_BIT)
}

/// The x87 default NaN, returned by invalid operations.
fn invalid() -> Extended {
    Extended::new(SIGN_BIT | EXTENDED_EXP_MAX, INTEGER_BIT | QUIET_BIT)
}

/// The first NaN operand, made quiet.
fn propagate(a: Extended, b: Extended) -> Extended {
    let nan = if a.is_nan() { a } else { b };
    Extended::new(nan.sign_exponent, nan.mantissa | INTEGER_BIT | QUIET_BIT)
}

/// Round `sig * 2^exp` to extended precision.
///
/// Any sticky bit must already be folded into bit 0 of `sig`, and must sit
/// below the rounding position once `sig` is normalised.
fn round(negative: bool, exp: i32, sig: u128) -> Extended {
    if sig == 0 {
        return zero(negative);
    }
    let shift = sig.leading_zeros();
    let sig = sig << shift;
    let biased = exp + 127 - shift as i32 + EXTENDED_BIAS;

    // Denormals keep fewer bits, with the exponent pinned at 1 - bias.
    let drop = if biased >= 1 { 64 } else { 65 - biased };
    let kept = match drop {
        129.. => 0,
        128 => u128::from(sig > 1 << 127),
        _ => {
            let kept = sig >> drop;
            let rest = sig & ((1u128 << drop) - 1);
            let half = 1u128 << (drop - 1);
            if rest > half || (rest == half && kept & 1 == 1) {
                kept + 1
            } else {
                kept
            }
        }
    };

    if biased >= 1 {
        let (mantissa, biased) = if kept >> 64 != 0 {
            (kept >> 1, biased + 1)
        } else {
            (kept, biased)
        };
        if biased >= EXTENDED_EXP_MAX as i32 {
            return infinity(negative);
        }
        Extended::new(sign_bits(negative) | biased as u16, mantissa as u64)
    } else {
        // A carry into the integer bit yields the smallest normal.
        let exponent = if kept >> 63 != 0 { 1 } else { 0 };
        Extended::new(sign_bits(negative) | exponent, kept as u64)
    }
}

fn add(a: Extended, b: Extended) -> Extended {
    let (a_neg, b_neg) = (a.is_negative(), b.is_negative());
    match (classify(a), classify(b)) {
        (Class::NaN, _) | (_, Class::NaN) => propagate(a, b),
        (Class::Infinite, Class::Infinite) if a_neg != b_neg => invalid(),
        (Class::Infinite, _) => infinity(a_neg),
        (_, Class::Infinite) => infinity(b_neg),
        (Class::Zero, Class::Zero) => zero(a_neg && b_neg),
        (Class::Zero, Class::Finite { exp, sig }) => round(b_neg, exp - 63, sig.into()),
        (Class::Finite { exp, sig }, Class::Zero) => round(a_neg, exp - 63, sig.into()),
        (Class::Finite { exp: a_exp, sig: a_sig }, Class::Finite { exp: b_exp, sig: b_sig }) => {
            add_finite((a_neg, a_exp, a_sig), (b_neg, b_exp, b_sig))
        }
    }
}

fn add_finite(a: (bool, i32, u64), b: (bool, i32, u64)) -> Extended {
    let (big, small) = if a.1 >= b.1 { (a, b) } else { (b, a) };

    // Leading bit at 125: one bit of headroom for the carry, 62 guard bits.
    let x = u128::from(big.2) << 62;
    let y = u128::from(small.2) << 62;
    let distance = (big.1 - small.1) as u32;
    let y = if distance >= 128 {
        1
    } else {
        let shifted = y >> distance;
        shifted | u128::from(shifted << distance != y)
    };
    let exp = big.1 - 125;

    if big.0 == small.0 {
        round(big.0, exp, x + y)
    } else if x == y {
        zero(false)
    } else if x > y {
        round(big.0, exp, x - y)
    } else {
        round(small.0, exp, y - x)
    }
}

fn mul(a: Extended, b: Extended) -> Extended {
    let negative = a.is_negative() != b.is_negative();
    match (classify(a), classify(b)) {
        (Class::NaN, _) | (_, Class::NaN) => propagate(a, b),
        (Class::Infinite, Class::Zero) | (Class::Zero, Class::Infinite) => invalid(),
        (Class::Infinite, _) | (_, Class::Infinite) => infinity(negative),
        (Class::Zero, _) | (_, Class::Zero) => zero(negative),
        (Class::Finite { exp: a_exp, sig: a_sig }, Class::Finite { exp: b_exp, sig: b_sig }) => {
            round(negative, a_exp + b_exp - 126, u128::from(a_sig) * u128::from(b_sig))
        }
    }
}

fn div(a: Extended, b: Extended) -> Extended {
    let negative = a.is_negative() != b.is_negative();
    match (classify(a), classify(b)) {
        (Class::NaN, _) | (_, Class::NaN) => propagate(a, b),
        (Class::Infinite, Class::Infinite) | (Class::Zero, Class::Zero) => invalid(),
        (Class::Infinite, _) | (_, Class::Zero) => infinity(negative),
        (_, Class::Infinite) | (Class::Zero, _) => zero(negative),
        (Class::Finite { exp: a_exp, sig: a_sig }, Class::Finite { exp: b_exp, sig: b_sig }) => {
            let divisor = u128::from(b_sig);
            let numerator = u128::from(a_sig) << 64;
            let (quotient, remainder) = (numerator / divisor, numerator % divisor);

            // Two more quotient bits, then the sticky bit.
            let remainder = remainder << 2;
            let quotient = (quotient << 2) | (remainder / divisor);
            let sticky = u128::from(remainder % divisor != 0);

            round(negative, a_exp - b_exp - 66, quotient | sticky)
        }
    }
}

impl Add for Extended {
    type Output = Extended;

    fn add(self, rhs: Extended) -> Extended {
        add(self, rhs)
    }
}

impl Sub for Extended {
    type Output = Extended;

    fn sub(self, rhs: Extended) -> Extended {
        if rhs.is_nan() {
            return propagate(self, rhs);
        }
        add(self, Extended::new(rhs.sign_exponent ^ SIGN_BIT, rhs.mantissa))
    }
}

impl Mul for Extended {
    type Output = Extended;

    fn mul(self, rhs: Extended) -> Extended {
        mul(self, rhs)
    }
}

impl Div for Extended {
    type Output = Extended;

    fn div(self, rhs: Extended) -> Extended {
        div(self, rhs)
    }
}
