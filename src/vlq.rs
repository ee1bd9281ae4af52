//! Base64 VLQ encoding as used by the `mappings` field.
use crate::errors::{Error, Result};

const B64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const B64: [i8; 123] = [
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 62, -1, -1,
    -1, 63, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, -1, -1, -1, -1, -1, -1, -1, 0, 1, 2, 3, 4,
    5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, -1, -1, -1,
    -1, -1, -1, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45,
    46, 47, 48, 49, 50, 51,
];

fn digit_value(c: u8) -> Result<i64> {
    match B64.get(c as usize) {
        Some(&enc) if enc >= 0 => Ok(i64::from(enc)),
        _ => Err(Error::InvalidVlqDigit(c as char)),
    }
}

/// Parses a single VLQ segment into its signed values.
pub fn parse_vlq_segment(segment: &str) -> Result<Vec<i64>> {
    let mut rv = vec![];
    parse_vlq_segment_into(segment, &mut rv)?;
    Ok(rv)
}

/// Like `parse_vlq_segment` but reuses the output buffer.
pub(crate) fn parse_vlq_segment_into(segment: &str, rv: &mut Vec<i64>) -> Result<()> {
    rv.clear();

    let mut cur = 0i64;
    let mut shift = 0u32;

    for c in segment.bytes() {
        let enc = digit_value(c)?;
        let val = enc & 0b11111;
        let cont = enc >> 5;
        if shift > 58 {
            return Err(Error::VlqOverflow);
        }
        cur += val << shift;
        shift += 5;

        if cont == 0 {
            let sign = cur & 1;
            cur >>= 1;
            if sign != 0 {
                cur = -cur;
            }
            rv.push(cur);
            cur = 0;
            shift = 0;
        }
    }

    if cur != 0 || shift != 0 {
        Err(Error::VlqLeftover)
    } else if rv.is_empty() {
        Err(Error::VlqNoValues)
    } else {
        Ok(())
    }
}

/// Appends a single VLQ encoded value to `out`.
pub fn encode_vlq(out: &mut String, num: i64) {
    let mut num = if num < 0 { ((-num) << 1) + 1 } else { num << 1 };

    loop {
        let mut digit = num & 0b11111;
        num >>= 5;
        if num > 0 {
            digit |= 1 << 5;
        }
        out.push(B64_CHARS[digit as usize] as char);
        if num == 0 {
            break;
        }
    }
}

/// Encodes a whole segment.
pub fn generate_vlq_segment(nums: &[i64]) -> Result<String> {
    if nums.is_empty() {
        return Err(Error::VlqNoValues);
    }
    let mut rv = String::new();
    for &num in nums {
        encode_vlq(&mut rv, num);
    }
    Ok(rv)
}

#[test]
fn test_vlq_negative_values() {
    assert_eq!(parse_vlq_segment("D").unwrap(), vec![-1]);
    assert_eq!(generate_vlq_segment(&[-1, 16]).unwrap(), "DgB");
    assert_eq!(parse_vlq_segment("DgB").unwrap(), vec![-1, 16]);
}

#[test]
fn test_vlq_rejects_foreign_characters() {
    match parse_vlq_segment("AA!A") {
        Err(Error::InvalidVlqDigit('!')) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    match parse_vlq_segment("Aé") {
        Err(Error::InvalidVlqDigit(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}
