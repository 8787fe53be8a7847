//! 128-bit decimal with CLR `System.Decimal` semantics.
//!
//! A value is `mantissa / 10^scale` where `|mantissa| < 2^96` and
//! `scale <= 28`. Results that do not fit are rounded half-to-even by
//! dropping scale; results whose integral part does not fit overflow.
//! Trailing zeros are significant for display (`1.0m` prints as `1.0`)
//! but not for comparison.

use core::cmp::Ordering;
use core::fmt;

const MAX_MANTISSA: u128 = (1u128 << 96) - 1;
const MAX_SCALE: u32 = 28;

#[derive(Clone, Copy)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

/// Magnitude wider than 128 bits, used by multiplication and rescaling.
/// Little-endian 64-bit limbs.
#[derive(Clone, Copy)]
struct Wide([u64; 4]);

impl Wide {
    fn from_u128(v: u128) -> Self {
        Wide([v as u64, (v >> 64) as u64, 0, 0])
    }

    fn mul(a: u128, b: u128) -> Self {
        let a = [a as u64, (a >> 64) as u64];
        let b = [b as u64, (b >> 64) as u64];
        let mut out = [0u64; 4];
        for (i, &x) in a.iter().enumerate() {
            let mut carry: u128 = 0;
            for (j, &y) in b.iter().enumerate() {
                let cur = out[i + j] as u128 + (x as u128) * (y as u128) + carry;
                out[i + j] = cur as u64;
                carry = cur >> 64;
            }
            let mut k = i + b.len();
            while carry != 0 && k < 4 {
                let cur = out[k] as u128 + carry;
                out[k] = cur as u64;
                carry = cur >> 64;
                k += 1;
            }
        }
        Wide(out)
    }

    fn mul_small(self, m: u64) -> Option<Self> {
        let mut out = [0u64; 4];
        let mut carry: u128 = 0;
        for (i, limb) in self.0.iter().enumerate() {
            let cur = (*limb as u128) * (m as u128) + carry;
            out[i] = cur as u64;
            carry = cur >> 64;
        }
        (carry == 0).then_some(Wide(out))
    }

    fn div_rem_small(self, d: u64) -> (Self, u64) {
        let mut out = [0u64; 4];
        let mut rem: u128 = 0;
        for i in (0..4).rev() {
            let cur = (rem << 64) | self.0[i] as u128;
            out[i] = (cur / d as u128) as u64;
            rem = cur % d as u128;
        }
        (Wide(out), rem as u64)
    }

    fn to_u128(self) -> Option<u128> {
        (self.0[2] == 0 && self.0[3] == 0).then(|| self.0[0] as u128 | ((self.0[1] as u128) << 64))
    }

    fn is_odd(self) -> bool {
        self.0[0] & 1 == 1
    }
}

/// Drops decimal digits from `magnitude` until it fits 96 bits and the scale
/// is at most 28, rounding half to even. Returns `None` when the integral
/// part alone is too large.
fn fit(negative: bool, magnitude: Wide, scale: i64) -> Option<Decimal> {
    let mut value = magnitude;
    let mut scale = scale;
    let mut last_digit = 0u64;
    let mut sticky = false;
    let mut dropped = false;

    while scale > MAX_SCALE as i64 || value.to_u128().is_none_or(|v| v > MAX_MANTISSA) {
        if scale <= 0 {
            return None;
        }
        if dropped {
            sticky |= last_digit != 0;
        }
        let (q, r) = value.div_rem_small(10);
        value = q;
        last_digit = r;
        dropped = true;
        scale -= 1;
    }

    while scale < 0 {
        value = value.mul_small(10)?;
        scale += 1;
    }
    if value.to_u128().is_none_or(|v| v > MAX_MANTISSA) {
        return None;
    }

    if dropped && (last_digit > 5 || (last_digit == 5 && (sticky || value.is_odd()))) {
        let bumped = value.to_u128()? + 1;
        if bumped > MAX_MANTISSA {
            // Rounding carried into a new digit: drop one more.
            if scale == 0 {
                return None;
            }
            return fit(negative, Wide::from_u128(bumped), scale);
        }
        value = Wide::from_u128(bumped);
    }

    let magnitude = value.to_u128()? as i128;
    Some(Decimal {
        mantissa: if negative { -magnitude } else { magnitude },
        scale: scale as u8,
    })
}

fn pow10(exp: u32) -> u128 {
    10u128.pow(exp)
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { mantissa: 0, scale: 0 };
    pub const ONE: Decimal = Decimal { mantissa: 1, scale: 0 };
    pub const MAX: Decimal = Decimal {
        mantissa: MAX_MANTISSA as i128,
        scale: 0,
    };
    pub const MIN: Decimal = Decimal {
        mantissa: -(MAX_MANTISSA as i128),
        scale: 0,
    };

    /// Creates a decimal from a raw mantissa and scale, or `None` if either
    /// is out of range.
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        (mantissa.unsigned_abs() <= MAX_MANTISSA && scale as u32 <= MAX_SCALE)
            .then_some(Decimal { mantissa, scale })
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    pub fn from_i128(v: i128) -> Option<Self> {
        Self::new(v, 0)
    }

    pub fn from_i64(v: i64) -> Self {
        Decimal {
            mantissa: v as i128,
            scale: 0,
        }
    }

    pub fn from_u64(v: u64) -> Self {
        Decimal {
            mantissa: v as i128,
            scale: 0,
        }
    }

    /// Converts a double the way the CLR does: rounded to 15 significant
    /// digits, trailing zeros removed.
    pub fn from_f64(v: f64) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        if v == 0.0 {
            return Some(Self::ZERO);
        }
        let text = format!("{:.14e}", v);
        Self::parse(&text).map(|d| d.trim_trailing_zeros())
    }

    /// Converts a float, rounded to 7 significant digits.
    pub fn from_f32(v: f32) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        if v == 0.0 {
            return Some(Self::ZERO);
        }
        let text = format!("{:.6e}", v);
        Self::parse(&text).map(|d| d.trim_trailing_zeros())
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    pub fn to_f32(&self) -> f32 {
        self.to_f64() as f32
    }

    /// Integral part, truncated toward zero.
    pub fn trunc_to_i128(&self) -> i128 {
        self.mantissa / pow10(self.scale as u32) as i128
    }

    pub fn trunc(&self) -> Self {
        Decimal {
            mantissa: self.trunc_to_i128(),
            scale: 0,
        }
    }

    pub fn floor(&self) -> Self {
        let t = self.trunc();
        if self.is_negative() && t.cmp_value(self) != Ordering::Equal {
            Decimal {
                mantissa: t.mantissa - 1,
                scale: 0,
            }
        } else {
            t
        }
    }

    pub fn ceiling(&self) -> Self {
        let t = self.trunc();
        if !self.is_negative() && t.cmp_value(self) != Ordering::Equal {
            Decimal {
                mantissa: t.mantissa + 1,
                scale: 0,
            }
        } else {
            t
        }
    }

    /// Rounds half to even at `digits` fractional digits.
    pub fn round(&self, digits: u32) -> Self {
        if self.scale as u32 <= digits {
            return *self;
        }
        let drop = self.scale as u32 - digits;
        let divisor = pow10(drop) as i128;
        let q = self.mantissa / divisor;
        let r = (self.mantissa % divisor).abs();
        let half = divisor / 2;
        let away = r > half || (r == half && q % 2 != 0);
        let q = match (away, self.is_negative()) {
            (false, _) => q,
            (true, false) => q + 1,
            (true, true) => q - 1,
        };
        Decimal {
            mantissa: q,
            scale: digits as u8,
        }
    }

    pub fn neg(&self) -> Self {
        Decimal {
            mantissa: -self.mantissa,
            scale: self.scale,
        }
    }

    pub fn abs(&self) -> Self {
        Decimal {
            mantissa: self.mantissa.abs(),
            scale: self.scale,
        }
    }

    pub fn signum(&self) -> i32 {
        self.mantissa.signum() as i32
    }

    fn trim_trailing_zeros(mut self) -> Self {
        while self.scale > 0 && self.mantissa % 10 == 0 {
            self.mantissa /= 10;
            self.scale -= 1;
        }
        self
    }

    /// Brings both operands to a common scale, as wide magnitudes.
    fn aligned(a: &Decimal, b: &Decimal) -> (Wide, Wide, u32) {
        let scale = a.scale.max(b.scale) as u32;
        let up = |d: &Decimal| {
            let factor = pow10(scale - d.scale as u32);
            Wide::mul(d.mantissa.unsigned_abs(), factor)
        };
        (up(a), up(b), scale)
    }

    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        let (a, b, scale) = Self::aligned(&self, &other);
        let (a, b) = (a.to_u128()?, b.to_u128()?);
        // Aligned magnitudes are below 2^96 * 10^28 < 2^190; the common
        // case fits in u128, the rest is handled by rescaling first.
        let sa = if self.is_negative() { -(a as i128) } else { a as i128 };
        let sb = if other.is_negative() { -(b as i128) } else { b as i128 };
        let sum = sa.checked_add(sb)?;
        fit(sum < 0, Wide::from_u128(sum.unsigned_abs()), scale as i64)
    }

    pub fn checked_sub(self, other: Decimal) -> Option<Decimal> {
        self.checked_add(other.neg())
    }

    pub fn checked_mul(self, other: Decimal) -> Option<Decimal> {
        let negative = self.is_negative() != other.is_negative();
        let product = Wide::mul(self.mantissa.unsigned_abs(), other.mantissa.unsigned_abs());
        let scale = self.scale as i64 + other.scale as i64;
        let result = fit(negative, product, scale)?;
        Some(if result.is_zero() { Self::ZERO } else { result })
    }

    /// Division; `None` on overflow. The caller checks for a zero divisor.
    pub fn checked_div(self, other: Decimal) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        let negative = self.is_negative() != other.is_negative();
        let b = other.mantissa.unsigned_abs();
        let mut q = self.mantissa.unsigned_abs() / b;
        let mut r = self.mantissa.unsigned_abs() % b;
        let mut scale = self.scale as i64 - other.scale as i64;

        while (r != 0 && scale < MAX_SCALE as i64) || scale < 0 {
            if q > (MAX_MANTISSA - 9) / 10 {
                break;
            }
            let r10 = r * 10;
            q = q * 10 + r10 / b;
            r = r10 % b;
            scale += 1;
        }

        if r != 0 {
            let twice = r * 2;
            if twice > b || (twice == b && q % 2 == 1) {
                q += 1;
            }
        }

        let result = fit(negative, Wide::from_u128(q), scale)?;
        Some(if result.is_zero() { Self::ZERO } else { result })
    }

    /// Remainder with the sign of the dividend.
    pub fn checked_rem(self, other: Decimal) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        let (a, b, scale) = Self::aligned(&self, &other);
        match (a.to_u128(), b.to_u128()) {
            (Some(a), Some(b)) => {
                let r = a % b;
                fit(self.is_negative(), Wide::from_u128(r), scale as i64)
            }
            _ => {
                // Magnitudes too far apart to align: |self| < |other| only
                // when self has the larger scale.
                if self.abs().cmp_value(&other.abs()) == Ordering::Less {
                    Some(self)
                } else {
                    let q = self.checked_div(other)?.trunc();
                    self.checked_sub(q.checked_mul(other)?)
                }
            }
        }
    }

    /// Numeric comparison ignoring scale (`1.0m == 1m`).
    pub fn cmp_value(&self, other: &Decimal) -> Ordering {
        match (self.signum(), other.signum()) {
            (a, b) if a != b => a.cmp(&b),
            (0, 0) => Ordering::Equal,
            (sign, _) => {
                let (a, b, _) = Self::aligned(self, other);
                let ord = match (a.to_u128(), b.to_u128()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (None, None) => a.0.iter().rev().cmp(b.0.iter().rev()),
                };
                if sign < 0 { ord.reverse() } else { ord }
            }
        }
    }

    /// Parses `[-+]digits[.digits][e[-+]digits]`.
    pub fn parse(text: &str) -> Option<Decimal> {
        let text = text.trim();
        let (negative, rest) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (number, exponent) = match rest.find(['e', 'E']) {
            Some(pos) => (&rest[..pos], rest[pos + 1..].parse::<i64>().ok()?),
            None => (rest, 0),
        };
        let (int_part, frac_part) = match number.find('.') {
            Some(pos) => (&number[..pos], &number[pos + 1..]),
            None => (number, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let mut magnitude = Wide::from_u128(0);
        let scale: i64 = frac_part.len() as i64 - exponent;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10)? as u64;
            magnitude = magnitude.mul_small(10)?;
            let mut carry = d;
            for limb in magnitude.0.iter_mut() {
                let (sum, overflow) = limb.overflowing_add(carry);
                *limb = sum;
                carry = overflow as u64;
                if carry == 0 {
                    break;
                }
            }
            if carry != 0 {
                return None;
            }
        }
        let result = fit(negative, magnitude, scale)?;
        Some(if result.is_zero() { Decimal { mantissa: 0, scale: result.scale } } else { result })
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_value(other) == Ordering::Equal
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_value(other))
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        if self.is_negative() {
            f.write_str("-")?;
        }
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int, frac)
        } else {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display_keep_scale() {
        assert_eq!(d("1.0").to_string(), "1.0");
        assert_eq!(d("0.005").to_string(), "0.005");
        assert_eq!(d("-12.50").to_string(), "-12.50");
        assert_eq!(d("1e2").to_string(), "100");
        assert_eq!(d("15e-1").to_string(), "1.5");
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(d("1.0"), d("1"));
        assert!(d("1.01") > d("1.001"));
        assert!(d("-2") < d("-1.5"));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(d("1").checked_add(d("1")).unwrap().to_string(), "2");
        assert_eq!(d("0.1").checked_add(d("0.2")).unwrap().to_string(), "0.3");
        assert_eq!(d("1.5").checked_mul(d("2")).unwrap().to_string(), "3.0");
        assert_eq!(d("1").checked_div(d("4")).unwrap().to_string(), "0.25");
        assert_eq!(d("10").checked_div(d("2")).unwrap().to_string(), "5");
        assert_eq!(d("7").checked_rem(d("3")).unwrap().to_string(), "1");
        assert_eq!(d("-7").checked_rem(d("3")).unwrap().to_string(), "-1");
    }

    #[test]
    fn test_division_rounds_to_28_digits() {
        let third = d("1").checked_div(d("3")).unwrap();
        assert_eq!(third.to_string(), "0.3333333333333333333333333333");
        let two_thirds = d("2").checked_div(d("3")).unwrap();
        assert_eq!(two_thirds.to_string(), "0.6666666666666666666666666667");
    }

    #[test]
    fn test_overflow() {
        assert!(Decimal::MAX.checked_add(Decimal::ONE).is_none());
        assert!(Decimal::MAX.checked_mul(d("2")).is_none());
        assert!(Decimal::MAX.checked_div(d("0.1")).is_none());
    }

    #[test]
    fn test_from_f64_uses_15_digits() {
        assert_eq!(Decimal::from_f64(0.1).unwrap().to_string(), "0.1");
        assert_eq!(Decimal::from_f64(1.0 / 3.0).unwrap().to_string(), "0.333333333333333");
        assert!(Decimal::from_f64(f64::NAN).is_none());
        assert!(Decimal::from_f64(1e30).is_none());
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(d("2.5").round(0).to_string(), "2");
        assert_eq!(d("3.5").round(0).to_string(), "4");
        assert_eq!(d("-1.5").floor().to_string(), "-2");
        assert_eq!(d("1.2").ceiling().to_string(), "2");
        assert_eq!(d("-1.7").trunc().to_string(), "-1");
    }
}
