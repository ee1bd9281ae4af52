use sourcemap_verify::internals::{generate_vlq_segment, parse_vlq_segment};
use sourcemap_verify::{Error, ErrorCategory};

#[test]
fn test_vlq_decode() {
    let rv = parse_vlq_segment("AAAA").unwrap();
    assert_eq!(rv, vec![0, 0, 0, 0]);
    let rv = parse_vlq_segment("GAAIA").unwrap();
    assert_eq!(rv, vec![3, 0, 0, 4, 0]);
    let rv = parse_vlq_segment("DACD").unwrap();
    assert_eq!(rv, vec![-1, 0, 1, -1]);
}

#[test]
fn test_vlq_encode() {
    let rv = generate_vlq_segment(&[0, 0, 0, 0]).unwrap();
    assert_eq!(rv.as_str(), "AAAA");
    let rv = generate_vlq_segment(&[3, 0, 0, 4, 0]).unwrap();
    assert_eq!(rv.as_str(), "GAAIA");
    let rv = generate_vlq_segment(&[-1, 0, 1, -1]).unwrap();
    assert_eq!(rv.as_str(), "DACD");
}

#[test]
fn test_multi_digit_values() {
    let rv = generate_vlq_segment(&[1000, -1000]).unwrap();
    assert_eq!(parse_vlq_segment(&rv).unwrap(), vec![1000, -1000]);
}

#[test]
fn test_overflow() {
    match parse_vlq_segment("00000000000000") {
        Err(Error::VlqOverflow) => {}
        e => {
            panic!("Unexpeted result: {:?}", e);
        }
    }
}

#[test]
fn test_bad_input() {
    match parse_vlq_segment("AA!A") {
        Err(err @ Error::InvalidVlqDigit('!')) => {
            assert_eq!(err.category(), ErrorCategory::Encoding);
        }
        e => panic!("Unexpeted result: {:?}", e),
    }
    // a continuation bit without a following digit
    match parse_vlq_segment("g") {
        Err(Error::VlqLeftover) => {}
        e => panic!("Unexpeted result: {:?}", e),
    }
    match parse_vlq_segment("") {
        Err(Error::VlqNoValues) => {}
        e => panic!("Unexpeted result: {:?}", e),
    }
}
