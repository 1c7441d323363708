//! Value decoding
//!
//! Turns a raw value token plus a signal descriptor into a typed
//! [`DecodedValue`]. Decoding is a pure function of (token, descriptor,
//! policy): it never touches shared state, so it can run anywhere in the
//! pipeline, including from worker threads.

use crate::signals::{Signal, SignalKind};
use crate::types::{DecodeReason, DecodedValue};
use serde::{Deserialize, Serialize};

/// Numeric interpretation for bit-vector signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericMode {
    /// Plain binary value in `[0, 2^W - 1]`
    #[default]
    Unsigned,
    /// Two's complement at the declared width, then sign-extended
    Signed,
}

/// What to do with values that carry `x`/`z` bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    /// First occurrence aborts the run
    Fail,
    /// Substitute 0 for the unknown bits and keep decoding
    Zero,
    /// Treat the whole value as unknown; the sample is dropped
    #[default]
    Skip,
}

/// Decode policy applied to watched signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodePolicy {
    /// Interpretation of bit vectors
    #[serde(default)]
    pub numeric: NumericMode,
    /// Unknown-bit handling
    #[serde(default)]
    pub unknown: UnknownPolicy,
    /// Target integer width for decoding, `1..=64`. Signals wider than this
    /// produce a per-event width error. The numeric value of a
    /// sign-extended vector does not depend on the target: replicating the
    /// sign bit further never changes it.
    #[serde(default = "default_integer_width")]
    pub integer_width: u32,
}

fn default_integer_width() -> u32 {
    64
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            numeric: NumericMode::default(),
            unknown: UnknownPolicy::default(),
            integer_width: default_integer_width(),
        }
    }
}

impl DecodePolicy {
    /// Lenient policy used for cache bookkeeping of unwatched signals:
    /// unknown bits stay unknown and never raise an error.
    pub(crate) fn lenient() -> Self {
        Self {
            numeric: NumericMode::Unsigned,
            unknown: UnknownPolicy::Skip,
            integer_width: 64,
        }
    }
}

/// Raw value payload of one change record
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    /// Single-bit change, e.g. `1!`
    Scalar(char),
    /// Bit string of a vector change, MSB first
    Vector(&'a str),
    /// Literal of a real change
    Real(&'a str),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Bit {
    Zero,
    One,
    Unknown,
}

fn classify(c: char) -> Option<Bit> {
    match c {
        '0' => Some(Bit::Zero),
        '1' => Some(Bit::One),
        'x' | 'X' | 'z' | 'Z' => Some(Bit::Unknown),
        _ => None,
    }
}

/// Decode one raw value against its signal descriptor
///
/// Errors are returned as bare [`DecodeReason`]s; the caller attaches line
/// and timestamp context and applies its fatality rules.
pub fn decode(
    raw: RawValue<'_>,
    signal: &Signal,
    policy: &DecodePolicy,
) -> Result<DecodedValue, DecodeReason> {
    match signal.kind {
        SignalKind::Real => decode_real(raw, signal),
        SignalKind::BitVector => decode_bits(raw, signal, policy),
    }
}

fn decode_real(raw: RawValue<'_>, signal: &Signal) -> Result<DecodedValue, DecodeReason> {
    match raw {
        RawValue::Real(literal) => literal
            .parse::<f64>()
            .map(DecodedValue::Real)
            .map_err(|_| DecodeReason::MalformedReal {
                name: signal.full_name(),
                literal: literal.to_string(),
            }),
        RawValue::Scalar(_) | RawValue::Vector(_) => {
            Err(DecodeReason::NotBitVector(signal.full_name()))
        }
    }
}

fn decode_bits(
    raw: RawValue<'_>,
    signal: &Signal,
    policy: &DecodePolicy,
) -> Result<DecodedValue, DecodeReason> {
    let mut scalar_buf = [0u8; 4];
    let bits: &str = match raw {
        RawValue::Scalar(c) => c.encode_utf8(&mut scalar_buf),
        RawValue::Vector(bits) => bits,
        RawValue::Real(_) => return Err(DecodeReason::NotReal(signal.full_name())),
    };

    let declared = signal.width as usize;
    let got = bits.chars().count();

    // a vector may be written wider than declared only with zero padding
    let bits = if got > declared {
        let (surplus, rest) = bits.split_at(got - declared);
        if surplus.chars().any(|c| c != '0') {
            return Err(DecodeReason::WidthMismatch {
                name: signal.full_name(),
                got,
                declared: signal.width,
            });
        }
        rest
    } else {
        bits
    };

    let mut parsed: Vec<Bit> = Vec::with_capacity(declared);
    for c in bits.chars() {
        match classify(c) {
            Some(bit) => parsed.push(bit),
            None => {
                return Err(DecodeReason::Malformed(format!(
                    "invalid bit `{}` in value for `{}`",
                    c,
                    signal.full_name()
                )))
            }
        }
    }

    // short vectors left-extend with 0, or with x/z when the leftmost bit
    // is x/z (IEEE 1364 rules)
    if parsed.len() < declared {
        let fill = match parsed.first() {
            Some(Bit::Unknown) => Bit::Unknown,
            _ => Bit::Zero,
        };
        let missing = declared - parsed.len();
        parsed.splice(0..0, std::iter::repeat(fill).take(missing));
    }

    if parsed.contains(&Bit::Unknown) {
        match policy.unknown {
            UnknownPolicy::Fail => {
                return Err(DecodeReason::UnknownBits(signal.full_name()));
            }
            UnknownPolicy::Skip => return Ok(DecodedValue::Unknown),
            UnknownPolicy::Zero => {
                for bit in parsed.iter_mut() {
                    if *bit == Bit::Unknown {
                        *bit = Bit::Zero;
                    }
                }
            }
        }
    }

    if signal.width > policy.integer_width.min(64) {
        return Err(DecodeReason::WidthExceedsTarget {
            name: signal.full_name(),
            width: signal.width,
            limit: policy.integer_width.min(64),
        });
    }

    let mut value: u64 = 0;
    for bit in &parsed {
        value = (value << 1) | u64::from(*bit == Bit::One);
    }

    match policy.numeric {
        NumericMode::Unsigned => i64::try_from(value)
            .map(DecodedValue::Integer)
            .map_err(|_| DecodeReason::Overflow(signal.full_name())),
        NumericMode::Signed => Ok(DecodedValue::Integer(sign_extend(value, signal.width))),
    }
}

/// Sign-extend a two's-complement value of `width` bits to 64 bits
///
/// If the value's MSB is set, the upper bits are filled with ones; widening
/// further by replicating the sign bit leaves the numeric value unchanged,
/// so the all-ones vector of any width decodes to -1.
fn sign_extend(value: u64, width: u32) -> i64 {
    if width >= 64 {
        return value as i64;
    }
    let sign_bit = 1u64 << (width - 1);
    if (value & sign_bit) != 0 {
        (value | (!0u64 << width)) as i64
    } else {
        value as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalId;

    fn bit_signal(width: u32) -> Signal {
        Signal {
            id: SignalId(0),
            code: "!".to_string(),
            name: "q".to_string(),
            path: vec!["top".to_string()],
            width,
            kind: SignalKind::BitVector,
            var_type: "reg".to_string(),
            scope: None,
        }
    }

    fn real_signal() -> Signal {
        Signal {
            id: SignalId(0),
            code: "!".to_string(),
            name: "ratio".to_string(),
            path: vec![],
            width: 64,
            kind: SignalKind::Real,
            var_type: "real".to_string(),
            scope: None,
        }
    }

    fn signed() -> DecodePolicy {
        DecodePolicy {
            numeric: NumericMode::Signed,
            ..DecodePolicy::default()
        }
    }

    #[test]
    fn test_unsigned_vector() {
        let signal = bit_signal(8);
        let value = decode(RawValue::Vector("11111111"), &signal, &DecodePolicy::default());
        assert_eq!(value, Ok(DecodedValue::Integer(255)));
    }

    #[test]
    fn test_signed_all_ones_is_minus_one() {
        for width in [1, 3, 8, 16, 63, 64] {
            let signal = bit_signal(width);
            let bits = "1".repeat(width as usize);
            let value = decode(RawValue::Vector(&bits), &signal, &signed());
            assert_eq!(value, Ok(DecodedValue::Integer(-1)), "width {}", width);
        }
    }

    #[test]
    fn test_signed_all_zeros_is_zero() {
        let signal = bit_signal(16);
        let value = decode(RawValue::Vector("0000000000000000"), &signal, &signed());
        assert_eq!(value, Ok(DecodedValue::Integer(0)));
    }

    #[test]
    fn test_sign_extension_is_width_invariant() {
        // 4-bit 1000 is -8 regardless of the integer target width
        let signal = bit_signal(4);
        for target in [8, 16, 32, 64] {
            let policy = DecodePolicy {
                integer_width: target,
                ..signed()
            };
            let value = decode(RawValue::Vector("1000"), &signal, &policy);
            assert_eq!(value, Ok(DecodedValue::Integer(-8)), "target {}", target);
        }
    }

    #[test]
    fn test_signed_msb_clear_stays_positive() {
        let signal = bit_signal(8);
        let value = decode(RawValue::Vector("01111111"), &signal, &signed());
        assert_eq!(value, Ok(DecodedValue::Integer(127)));
    }

    #[test]
    fn test_short_vector_zero_extends() {
        let signal = bit_signal(8);
        let value = decode(RawValue::Vector("1"), &signal, &DecodePolicy::default());
        assert_eq!(value, Ok(DecodedValue::Integer(1)));
    }

    #[test]
    fn test_short_vector_with_unknown_msb_extends_unknown() {
        let signal = bit_signal(8);
        let value = decode(RawValue::Vector("x0"), &signal, &DecodePolicy::default());
        assert_eq!(value, Ok(DecodedValue::Unknown));
    }

    #[test]
    fn test_scalar_change() {
        let signal = bit_signal(1);
        assert_eq!(
            decode(RawValue::Scalar('1'), &signal, &DecodePolicy::default()),
            Ok(DecodedValue::Integer(1))
        );
        // 1-bit two's complement: 1 is -1
        assert_eq!(
            decode(RawValue::Scalar('1'), &signal, &signed()),
            Ok(DecodedValue::Integer(-1))
        );
    }

    #[test]
    fn test_unknown_policy_skip() {
        let signal = bit_signal(3);
        let value = decode(RawValue::Vector("z00"), &signal, &DecodePolicy::default());
        assert_eq!(value, Ok(DecodedValue::Unknown));
    }

    #[test]
    fn test_unknown_policy_zero_substitutes() {
        let signal = bit_signal(3);
        let policy = DecodePolicy {
            unknown: UnknownPolicy::Zero,
            ..DecodePolicy::default()
        };
        assert_eq!(
            decode(RawValue::Vector("z00"), &signal, &policy),
            Ok(DecodedValue::Integer(0))
        );
        assert_eq!(
            decode(RawValue::Vector("x11"), &signal, &policy),
            Ok(DecodedValue::Integer(3))
        );
    }

    #[test]
    fn test_unknown_policy_fail_errors() {
        let signal = bit_signal(3);
        let policy = DecodePolicy {
            unknown: UnknownPolicy::Fail,
            ..DecodePolicy::default()
        };
        let err = decode(RawValue::Vector("x00"), &signal, &policy).unwrap_err();
        assert!(matches!(err, DecodeReason::UnknownBits(_)));
    }

    #[test]
    fn test_real_value() {
        let signal = real_signal();
        assert_eq!(
            decode(RawValue::Real("3.14"), &signal, &DecodePolicy::default()),
            Ok(DecodedValue::Real(3.14))
        );
    }

    #[test]
    fn test_malformed_real_errors() {
        let signal = real_signal();
        let err = decode(RawValue::Real("fast"), &signal, &DecodePolicy::default()).unwrap_err();
        assert!(matches!(err, DecodeReason::MalformedReal { .. }));
    }

    #[test]
    fn test_domain_mismatch_errors() {
        let err = decode(
            RawValue::Real("1.0"),
            &bit_signal(8),
            &DecodePolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeReason::NotReal(_)));

        let err = decode(
            RawValue::Vector("101"),
            &real_signal(),
            &DecodePolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeReason::NotBitVector(_)));
    }

    #[test]
    fn test_long_vector_needs_zero_padding() {
        let signal = bit_signal(4);
        assert_eq!(
            decode(RawValue::Vector("001010"), &signal, &DecodePolicy::default()),
            Ok(DecodedValue::Integer(10))
        );
        let err = decode(RawValue::Vector("101010"), &signal, &DecodePolicy::default())
            .unwrap_err();
        assert!(matches!(err, DecodeReason::WidthMismatch { .. }));
    }

    #[test]
    fn test_width_beyond_target_errors() {
        let signal = bit_signal(16);
        let policy = DecodePolicy {
            integer_width: 8,
            ..DecodePolicy::default()
        };
        let err = decode(
            RawValue::Vector("0000000000000001"),
            &signal,
            &policy,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeReason::WidthExceedsTarget { .. }));
    }

    #[test]
    fn test_unsigned_overflow_errors() {
        let signal = bit_signal(64);
        let bits = "1".repeat(64);
        let err = decode(RawValue::Vector(&bits), &signal, &DecodePolicy::default()).unwrap_err();
        assert!(matches!(err, DecodeReason::Overflow(_)));
    }

    #[test]
    fn test_invalid_bit_char_is_malformed() {
        let signal = bit_signal(4);
        let err = decode(RawValue::Vector("10w0"), &signal, &DecodePolicy::default()).unwrap_err();
        assert!(matches!(err, DecodeReason::Malformed(_)));
    }
}
