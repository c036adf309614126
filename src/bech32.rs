//! Bech32 encoding/decoding as used by BOLT11 invoices.
//!
//! This differs from the BIP-173 flavor in two ways required by BOLT11:
//! strings may be longer than 90 characters, and input of any case (even
//! mixed) is accepted by lowercasing before decoding.

use core::fmt;

use crate::ParseError;

/// An unsigned 5-bit value, in the range 0 - 31, the basic data block in Bech32 encoding.
/// Internally a byte is stored, but the value is always in the 0--31 range.
/// The `u5` name is analogue to the `u8`, `u16` etc. base types.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[allow(non_camel_case_types)]
pub struct u5(u8);

impl u5 {
	const INNER_MAX: u8 = 31;
	const INNER_COUNT: u8 = 32;

	/// The zero value (character 'q')
	pub const ZERO: u5 = u5(0);

	/// The one value (character 'p')
	pub const ONE: u5 = u5(1);

	/// The maximum allowed numerical value, 31
	pub const MAX: u5 = u5(Self::INNER_MAX);

	/// Create from a u8 value, returns `None` for values larger than 31.
	pub fn try_from_u8(n: u8) -> Option<Self> {
		if n > Self::INNER_MAX {
			None
		} else {
			Some(Self(n))
		}
	}

	/// Create from a u8 value, without check. Higher bits are nulled.
	pub fn from_u8(n: u8) -> Self {
		Self(n % Self::INNER_COUNT)
	}

	/// Access as u8. The value is guaranteed to be in the 0 - 31 range.
	#[inline]
	pub fn as_u8(&self) -> u8 {
		self.0
	}

	/// Decode from a Bech32 character of either case.
	pub fn try_from_char(c: char) -> Option<u5> {
		let cascii = u32::from(c);
		if cascii <= 127 {
			let idx = CHARS_INV[cascii as usize];
			if idx >= 0 {
				return Some(u5::from_u8(idx as u8));
			}
		}
		None
	}

	/// Convert to a Bech32 character, lowercase.
	pub fn to_char(&self) -> char {
		CHARS_LOWER[(self.0 % Self::INNER_COUNT) as usize]
	}
}

impl From<u5> for u8 {
	fn from(v: u5) -> u8 { v.0 }
}

impl From<u5> for u64 {
	fn from(v: u5) -> u64 { u64::from(v.0) }
}

impl fmt::Display for u5 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Mapping from numeric value to bech32 character.
#[rustfmt::skip]
const CHARS_LOWER: [char; 32] = [
    'q', 'p', 'z', 'r', 'y', '9', 'x', '8', //  +0
    'g', 'f', '2', 't', 'v', 'd', 'w', '0', //  +8
    's', '3', 'j', 'n', '5', '4', 'k', 'h', // +16
    'c', 'e', '6', 'm', 'u', 'a', '7', 'l', // +24
];

/// Mapping from bech32 character (either case) to numeric value.
///
/// E.g., 'z' is `CHARS_LOWER[2]` and is ASCII value `122` so `CHARS_INV[122] == 2`
#[rustfmt::skip]
const CHARS_INV: [i8; 128] = [
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    15, -1, 10, 17, 21, 20, 26, 30,  7,  5, -1, -1, -1, -1, -1, -1,
    -1, 29, -1, 24, 13, 25,  9,  8, 23, -1, 18, 22, 31, 27, 19, -1,
    1,  0,  3, 16, 11, 28, 12, 14,  6,  4,  2, -1, -1, -1, -1, -1,
    -1, 29, -1, 24, 13, 25,  9,  8, 23, -1, 18, 22, 31, 27, 19, -1,
    1,  0,  3, 16, 11, 28, 12, 14,  6,  4,  2, -1, -1, -1, -1, -1,
];

/// Generator coefficients of the BCH code behind the bech32 checksum.
const GEN: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

/// One checksum state transition per 5-bit value.
fn polymod_step(pre: u32, value: u5) -> u32 {
	let top = pre >> 25;
	let mut chk = ((pre & 0x1ffffff) << 5) ^ u32::from(value.as_u8());
	for (i, gen) in GEN.iter().enumerate() {
		if (top >> i) & 1 != 0 {
			chk ^= gen;
		}
	}
	chk
}

fn polymod<'a, I: IntoIterator<Item = &'a u5>>(values: I) -> u32 {
	let mut chk = 1u32;
	for v in values {
		chk = polymod_step(chk, *v);
	}
	chk
}

/// Expand the human-readable part for checksum computation: the high bits of
/// each character, a zero separator, then the low bits of each character.
fn hrp_expand(hrp: &str) -> Vec<u5> {
	let mut expanded = Vec::with_capacity(hrp.len() * 2 + 1);
	for b in hrp.bytes() {
		expanded.push(u5::from_u8(b >> 5));
	}
	expanded.push(u5::ZERO);
	for b in hrp.bytes() {
		expanded.push(u5::from_u8(b & 31));
	}
	expanded
}

fn verify_checksum(hrp: &str, data: &[u5]) -> bool {
	polymod(hrp_expand(hrp).iter().chain(data.iter())) == 1
}

fn create_checksum(hrp: &str, data: &[u5]) -> [u5; 6] {
	let mut values = hrp_expand(hrp);
	values.extend_from_slice(data);
	values.extend_from_slice(&[u5::ZERO; 6]);
	let chk = polymod(&values) ^ 1;
	let mut checksum = [u5::ZERO; 6];
	for (i, word) in checksum.iter_mut().enumerate() {
		*word = u5::from_u8(((chk >> (5 * (5 - i))) & 0x1f) as u8);
	}
	checksum
}

/// Encode a lowercase bech32 string from an HRP and data words. No length
/// limit is applied, invoices regularly exceed the 90 characters allowed for
/// on-chain addresses.
pub fn encode(hrp: &str, data: &[u5]) -> String {
	let checksum = create_checksum(hrp, data);
	let mut encoded = String::with_capacity(hrp.len() + 1 + data.len() + 6);
	encoded.push_str(hrp);
	encoded.push('1');
	for word in data.iter().chain(checksum.iter()) {
		encoded.push(word.to_char());
	}
	encoded
}

/// Decode a bech32 string into its HRP and data words, verifying the
/// checksum. The input is lowercased first, so any casing (even mixed) is
/// accepted. The returned data excludes the six checksum words.
pub fn decode(s: &str) -> Result<(String, Vec<u5>), ParseError> {
	let s = s.to_lowercase();
	let separator = s.rfind('1').ok_or(ParseError::NoSeparator)?;
	if separator == 0 {
		return Err(ParseError::EmptyHrp);
	}
	let (hrp, data_part) = s.split_at(separator);
	let data_part = &data_part[1..];
	if data_part.len() < 6 {
		return Err(ParseError::TooShort);
	}

	let mut data = Vec::with_capacity(data_part.len());
	for c in data_part.chars() {
		data.push(u5::try_from_char(c).ok_or(ParseError::InvalidChar(c))?);
	}

	if !verify_checksum(hrp, &data) {
		return Err(ParseError::InvalidChecksum);
	}

	data.truncate(data.len() - 6);
	Ok((hrp.to_owned(), data))
}

/// Repack a byte sequence into 5-bit words. If the total number of bits is
/// not a multiple of 5, the final word is zero-extended on the right.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u5> {
	let mut words = Vec::with_capacity((bytes.len() * 8 + 4) / 5);
	let mut acc = 0u32;
	let mut bits = 0u32;
	for &byte in bytes {
		acc = (acc << 8) | u32::from(byte);
		bits += 8;
		while bits >= 5 {
			bits -= 5;
			words.push(u5::from_u8(((acc >> bits) & 0x1f) as u8));
		}
	}
	if bits > 0 {
		words.push(u5::from_u8(((acc << (5 - bits)) & 0x1f) as u8));
	}
	words
}

/// Repack 5-bit words into bytes. With `pad` set, trailing bits are emitted
/// as a final zero-padded byte (the form hashed for invoice signatures); with
/// `pad` unset they are dropped, recovering a byte sequence that was
/// byte-aligned before word encoding.
pub fn words_to_bytes(words: &[u5], pad: bool) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(words.len() * 5 / 8 + 1);
	let mut acc = 0u32;
	let mut bits = 0u32;
	for word in words {
		acc = (acc << 5) | u32::from(word.as_u8());
		bits += 5;
		while bits >= 8 {
			bits -= 8;
			bytes.push(((acc >> bits) & 0xff) as u8);
		}
	}
	if pad && bits > 0 {
		bytes.push(((acc << (8 - bits)) & 0xff) as u8);
	}
	bytes
}

#[cfg(test)]
mod test {
	use super::*;

	fn words(s: &str) -> Vec<u5> {
		s.chars().map(|c| u5::try_from_char(c).unwrap()).collect()
	}

	#[test]
	fn u5_from_u8() {
		for i in 0..=31 {
			assert_eq!(u5::from_u8(i).as_u8(), i);
			assert_eq!(u5::try_from_u8(i).unwrap().as_u8(), i);
		}
		assert_eq!(u5::from_u8(32).as_u8(), 0);
		assert_eq!(u5::from_u8(100).as_u8(), 4);
		assert_eq!(u5::try_from_u8(32), None);
	}

	#[test]
	fn char_round_trip() {
		for i in 0..=31 {
			let c = u5::from_u8(i).to_char();
			assert_eq!(u5::try_from_char(c).unwrap().as_u8(), i);
			assert_eq!(u5::try_from_char(c.to_ascii_uppercase()).unwrap().as_u8(), i);
		}
		assert_eq!(u5::try_from_char('b'), None);
		assert_eq!(u5::try_from_char('1'), None);
		assert_eq!(u5::try_from_char('ü'), None);
	}

	#[test]
	fn bytes_to_words_padding() {
		assert_eq!(bytes_to_words(&[]), vec![]);
		// 00000000 -> 00000 000(00)
		assert_eq!(bytes_to_words(&[0]), words("qq"));
		assert_eq!(bytes_to_words(&[255]), words("lu"));
		assert_eq!(bytes_to_words(&[0, 1, 2, 3, 4]), words("qqqsyqcy"));
		assert_eq!(bytes_to_words(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]), words("qqqsyqcyq5rqwzqf"));
		assert_eq!(
			bytes_to_words(&[255, 254, 253, 252, 251, 250, 249, 248, 247, 246]),
			words("lll0ml8mltul3alk")
		);
	}

	#[test]
	fn words_to_bytes_trim_and_pad() {
		// 00001 00010 00011: the trailing 1000011 is dropped when trimming and
		// zero-extended to 10000110 when padding
		assert_eq!(words_to_bytes(&words("pzr"), false), vec![8]);
		assert_eq!(words_to_bytes(&words("pzr"), true), vec![8, 0b1000_0110]);
		assert_eq!(words_to_bytes(&words("qqqsyqcyq5rqwzqf"), false), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
	}

	#[test]
	fn bit_pack_round_trip() {
		let bytes: Vec<u8> = (0u8..=255).collect();
		assert_eq!(words_to_bytes(&bytes_to_words(&bytes), false), bytes);
	}

	#[test]
	fn encode_decode_round_trip() {
		let data = bytes_to_words(&[0x00, 0x44, 0x21, 0xff]);
		let encoded = encode("lnbc", &data);
		let (hrp, decoded) = decode(&encoded).unwrap();
		assert_eq!(hrp, "lnbc");
		assert_eq!(decoded, data);
	}

	#[test]
	fn decode_accepts_any_case() {
		let data = bytes_to_words(&[1, 2, 3]);
		let encoded = encode("lnbc", &data);
		assert_eq!(decode(&encoded.to_uppercase()).unwrap(), decode(&encoded).unwrap());

		// even mixed case, since input is lowercased wholesale
		let mut mixed = String::new();
		for (i, c) in encoded.chars().enumerate() {
			mixed.push(if i % 2 == 0 { c.to_ascii_uppercase() } else { c });
		}
		assert_eq!(decode(&mixed).unwrap(), decode(&encoded).unwrap());
	}

	#[test]
	fn decode_errors() {
		assert_eq!(decode("qqqqqqqqq").unwrap_err(), ParseError::NoSeparator);
		assert_eq!(decode("1qqqqqqqqq").unwrap_err(), ParseError::EmptyHrp);
		assert_eq!(decode("ln1qqqqq").unwrap_err(), ParseError::TooShort);
		assert_eq!(decode("ln1bqqqqqq").unwrap_err(), ParseError::InvalidChar('b'));

		let mut corrupted = encode("lnbc", &bytes_to_words(&[1, 2, 3]));
		let last = if corrupted.ends_with('q') { 'p' } else { 'q' };
		corrupted.pop();
		corrupted.push(last);
		assert_eq!(decode(&corrupted).unwrap_err(), ParseError::InvalidChecksum);
	}

	#[test]
	fn no_length_cap() {
		// invoices exceed the 90-char cap BIP-173 puts on addresses
		let data = bytes_to_words(&[0x5a; 200]);
		let encoded = encode("lnbc", &data);
		assert!(encoded.len() > 90);
		assert_eq!(decode(&encoded).unwrap().1, data);
	}
}
