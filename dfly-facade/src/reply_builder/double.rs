//! Double-to-text conversion shared by RESP2 bulk and RESP3 double replies.
//!
//! Output follows the server's shortest round-trip format: the fewest digits that parse back to
//! the same `f64`, plain decimal notation while the decimal exponent stays within `[-6, 21)`,
//! scientific `d[.ddd]e±x` notation outside of it, a single `0` for both zeros, and the
//! `inf`/`-inf`/`nan` literals.

/// Capacity of the buffer accepted by [`format_double`].
pub const DOUBLE_BUF_LEN: usize = 64;

const DECIMAL_EXP_LOW: i32 = -6;
const DECIMAL_EXP_HIGH: i32 = 21;

/// Formats `value` into `dest` and returns the written text.
#[must_use]
pub fn format_double(value: f64, dest: &mut [u8; DOUBLE_BUF_LEN]) -> &str {
    let mut out = Cursor { dest, pos: 0 };
    if value.is_nan() {
        out.put(b"nan");
    } else if value.is_infinite() {
        out.put(if value.is_sign_positive() { b"inf" } else { b"-inf" });
    } else if value == 0.0 {
        out.put(b"0");
    } else {
        let mut shortest = ryu::Buffer::new();
        let text = shortest.format_finite(value);
        let decimal = Decimal::parse(text.as_bytes());
        decimal.write(&mut out);
    }
    out.finish()
}

struct Cursor<'a> {
    dest: &'a mut [u8; DOUBLE_BUF_LEN],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn put(&mut self, bytes: &[u8]) {
        self.dest[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn put_byte(&mut self, byte: u8) {
        self.dest[self.pos] = byte;
        self.pos += 1;
    }

    fn put_zeros(&mut self, count: usize) {
        self.dest[self.pos..self.pos + count].fill(b'0');
        self.pos += count;
    }

    fn finish(self) -> &'a str {
        let Cursor { dest, pos } = self;
        // Only ASCII digits, signs, '.', 'e' and literal words are ever written.
        std::str::from_utf8(&dest[..pos]).unwrap_or("nan")
    }
}

/// Shortest significant digits of a non-zero finite value.
///
/// The value equals `0.d1d2d3... * 10^point`, with no leading or trailing zero digits.
struct Decimal {
    negative: bool,
    digits: [u8; 20],
    len: usize,
    point: i32,
}

impl Decimal {
    /// Parses `ryu` output such as `1.0`, `0.001`, `-2.5e-7` or `1e21`.
    fn parse(text: &[u8]) -> Self {
        let (negative, text) = match text.split_first() {
            Some((b'-', rest)) => (true, rest),
            _ => (false, text),
        };
        let (mantissa, exponent) = match text.iter().position(|byte| *byte == b'e') {
            Some(index) => (&text[..index], parse_exponent(&text[index + 1..])),
            None => (text, 0),
        };

        let mut decimal = Self {
            negative,
            digits: [0; 20],
            len: 0,
            point: exponent,
        };
        let mut seen_dot = false;
        for &byte in mantissa {
            if byte == b'.' {
                seen_dot = true;
                continue;
            }
            if !seen_dot {
                decimal.point += 1;
            }
            if decimal.len == 0 && byte == b'0' {
                // Leading zero shifts the point instead of becoming a digit.
                decimal.point -= 1;
                continue;
            }
            if decimal.len < decimal.digits.len() {
                decimal.digits[decimal.len] = byte;
                decimal.len += 1;
            }
        }
        while decimal.len > 1 && decimal.digits[decimal.len - 1] == b'0' {
            decimal.len -= 1;
        }
        decimal
    }

    fn write(&self, out: &mut Cursor<'_>) {
        if self.negative {
            out.put_byte(b'-');
        }
        let digits = &self.digits[..self.len];
        let exponent = self.point - 1;
        if (DECIMAL_EXP_LOW..DECIMAL_EXP_HIGH).contains(&exponent) {
            if self.point <= 0 {
                out.put(b"0.");
                out.put_zeros(self.point.unsigned_abs() as usize);
                out.put(digits);
            } else {
                let point = self.point.unsigned_abs() as usize;
                if point >= digits.len() {
                    out.put(digits);
                    out.put_zeros(point - digits.len());
                } else {
                    out.put(&digits[..point]);
                    out.put_byte(b'.');
                    out.put(&digits[point..]);
                }
            }
            return;
        }

        out.put(&digits[..1]);
        if digits.len() > 1 {
            out.put_byte(b'.');
            out.put(&digits[1..]);
        }
        out.put_byte(b'e');
        out.put_byte(if exponent < 0 { b'-' } else { b'+' });
        let mut magnitude = itoa::Buffer::new();
        out.put(magnitude.format(exponent.unsigned_abs()).as_bytes());
    }
}

fn parse_exponent(text: &[u8]) -> i32 {
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, text),
    };
    let magnitude = digits
        .iter()
        .filter(|byte| byte.is_ascii_digit())
        .fold(0_i32, |acc, byte| acc * 10 + i32::from(byte - b'0'));
    if negative { -magnitude } else { magnitude }
}
