use snip_core::ALPHABET;

const BASE: u64 = ALPHABET.len() as u64;

/// Reads `bytes` as a big-endian unsigned integer (`num = num * 256 + byte`).
pub fn accumulate(bytes: &[u8; 4]) -> u64 {
    bytes
        .iter()
        .fold(0_u64, |num, &byte| num * 256 + u64::from(byte))
}

/// Writes `num` as a base-62 numeral over [`ALPHABET`], without padding.
///
/// Zero encodes to `"0"`.
pub fn encode(mut num: u64) -> String {
    if num == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::new();
    while num > 0 {
        digits.push(ALPHABET[(num % BASE) as usize]);
        num /= BASE;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

/// Encodes four random bytes as a base-62 numeral.
pub fn encode_bytes(bytes: &[u8; 4]) -> String {
    encode(accumulate(bytes))
}
