//! Conversion between IEEE-754 half precision (binary16) and `f32`.
//!
//! Depth sensors hand us 16-bit floats and Rust has no stable `f16`, so the
//! bit twiddling lives here. Subnormal halves are deliberately collapsed to a
//! signed zero in both directions: the depth path never produces meaningful
//! values that small, and a zero depth is treated as "unmeasured" downstream.

const SIGN_MASK: u16 = 0x8000;
const EXP_MASK: u16 = 0x7C00;
const FRAC_MASK: u16 = 0x03FF;

const HALF_EXP_BIAS: i32 = 15;
const SINGLE_EXP_BIAS: i32 = 127;
const HALF_EXP_MAX: i32 = 0x1F;

/// The largest finite half precision value.
pub const HALF_MAX: f32 = 65504.0;

/// Decodes a half precision bit pattern into an `f32`.
///
/// Every normal half is represented exactly. Exponent `0` decodes to a zero
/// carrying the input's sign and exponent `0x1F` decodes to an infinity (zero
/// mantissa) or a NaN (non-zero mantissa).
pub fn decode(bits: u16) -> f32 {
    let sign = ((bits & SIGN_MASK) as u32) << 16;
    let exponent = ((bits & EXP_MASK) >> 10) as i32;
    let fraction = (bits & FRAC_MASK) as u32;

    let single = match exponent {
        0 => sign,
        HALF_EXP_MAX => sign | 0x7F80_0000 | (fraction << 13),
        _ => {
            let rebiased = (exponent - HALF_EXP_BIAS + SINGLE_EXP_BIAS) as u32;
            sign | (rebiased << 23) | (fraction << 13)
        }
    };

    f32::from_bits(single)
}

/// Encodes an `f32` into half precision, truncating the mantissa to 10 bits.
///
/// Magnitudes too large for a half saturate to infinity, magnitudes below
/// the smallest normal half become a signed zero, and NaN stays NaN.
pub fn encode(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) as u16) & SIGN_MASK;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x007F_FFFF;

    if exponent == 0xFF {
        if mantissa == 0 {
            return sign | EXP_MASK;
        }
        // keep the top payload bits and force the quiet bit so it stays NaN
        return sign | EXP_MASK | 0x0200 | (mantissa >> 13) as u16;
    }

    let rebiased = exponent - SINGLE_EXP_BIAS + HALF_EXP_BIAS;
    if rebiased >= HALF_EXP_MAX {
        sign | EXP_MASK
    } else if rebiased <= 0 {
        sign
    } else {
        sign | ((rebiased as u16) << 10) | (mantissa >> 13) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_values() {
        assert_eq!(decode(0x3C00), 1.0);
        assert_eq!(decode(0xC000), -2.0);
        assert_eq!(decode(0x3800), 0.5);
        assert_eq!(decode(0x4000), 2.0);
        assert_eq!(decode(0x7BFF), HALF_MAX);
        // 1 + 1/1024
        assert_eq!(decode(0x3C01), 1.0 + 1.0 / 1024.0);
    }

    #[test]
    fn every_normal_half_survives_a_round_trip() {
        for bits in 0..=u16::MAX {
            let exponent = (bits & EXP_MASK) >> 10;
            if exponent == 0 || exponent == 0x1F {
                continue;
            }
            assert_eq!(encode(decode(bits)), bits, "pattern {bits:#06x}");
        }
    }

    #[test]
    fn max_exponent_is_infinity_or_nan() {
        assert_eq!(decode(0x7C00), f32::INFINITY);
        assert_eq!(decode(0xFC00), f32::NEG_INFINITY);
        assert!(decode(0x7C01).is_nan());
        assert!(decode(0xFE00).is_nan());
        assert!(decode(0xFFFF).is_nan());
    }

    #[test]
    fn zero_exponent_is_signed_zero() {
        let positive = decode(0x0000);
        let negative = decode(0x8000);
        assert_eq!(positive, 0.0);
        assert!(positive.is_sign_positive());
        assert_eq!(negative, 0.0);
        assert!(negative.is_sign_negative());

        // subnormals collapse too
        let sub = decode(0x03FF);
        assert_eq!(sub, 0.0);
        assert!(decode(0x8001).is_sign_negative());
    }

    #[test]
    fn encode_truncates_instead_of_rounding() {
        // just below 1 + 1/1024 must truncate back down to 1.0
        let almost = 1.0 + 1.0 / 1024.0 - f32::EPSILON;
        assert_eq!(encode(almost), 0x3C00);
        assert_eq!(encode(1.0 + 1.0 / 1024.0), 0x3C01);
    }

    #[test]
    fn encode_saturates_and_flushes() {
        assert_eq!(encode(1.0e6), 0x7C00);
        assert_eq!(encode(-1.0e6), 0xFC00);
        assert_eq!(encode(f32::INFINITY), 0x7C00);
        assert_eq!(encode(1.0e-7), 0x0000);
        assert_eq!(encode(-1.0e-7), 0x8000);
        assert!(decode(encode(f32::NAN)).is_nan());
    }
}
