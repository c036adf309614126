//! Conversion of invoice fields into their 5-bit word wire form.

use crate::bech32::{self, u5};
use crate::{RouteHop, Tag};

/// Number of 5-bit words the timestamp occupies.
pub(crate) const TIMESTAMP_WORDS: usize = 7;

/// Construct the invoice's HRP and signatureless data into a preimage to be hashed.
/// The data words are padded with zero bits up to a byte boundary.
pub(crate) fn construct_invoice_preimage(hrp_bytes: &[u8], data_without_signature: &[u5]) -> Vec<u8> {
	let mut preimage = Vec::<u8>::from(hrp_bytes);
	preimage.extend(bech32::words_to_bytes(data_without_signature, true));
	preimage
}

/// The timestamp as 35 big-endian bits.
pub(crate) fn timestamp_words(timestamp: u64) -> [u5; TIMESTAMP_WORDS] {
	let mut words = [u5::ZERO; TIMESTAMP_WORDS];
	for i in 0..TIMESTAMP_WORDS {
		words[TIMESTAMP_WORDS - 1 - i] = u5::from_u8(((timestamp >> (5 * i)) & 0x1f) as u8);
	}
	words
}

/// Minimum-width big-endian base-32 representation of an integer. Zero still
/// takes one word.
pub(crate) fn encoded_int_be_base32(int: u64) -> Vec<u5> {
	let mut words = Vec::new();
	let mut rem = int;
	loop {
		words.push(u5::from_u8((rem % 32) as u8));
		rem /= 32;
		if rem == 0 {
			break;
		}
	}
	words.reverse();
	words
}

/// A complete tagged field: type word, two length words, payload.
pub(crate) fn tagged_field_words(tag: &Tag) -> Vec<u5> {
	let payload = tag_payload_words(tag);
	debug_assert!(payload.len() < 1024, "tag length checked at build time");
	let mut words = Vec::with_capacity(3 + payload.len());
	words.push(u5::from_u8(tag.type_code()));
	words.push(u5::from_u8((payload.len() >> 5) as u8));
	words.push(u5::from_u8((payload.len() & 0x1f) as u8));
	words.extend(payload);
	words
}

/// The payload words of a tagged field, without type and length.
pub(crate) fn tag_payload_words(tag: &Tag) -> Vec<u5> {
	match tag {
		Tag::PaymentHash(hash) | Tag::PurposeCommitHash(hash) => {
			bech32::bytes_to_words(&hash.0[..])
		},
		Tag::PaymentSecret(secret) => bech32::bytes_to_words(&secret.0),
		Tag::Description(description) => bech32::bytes_to_words(description.as_bytes()),
		Tag::Payee(key) => bech32::bytes_to_words(&key.serialize()),
		Tag::ExpireTime(seconds) => encoded_int_be_base32(*seconds),
		Tag::MinFinalCltvExpiry(delta) => encoded_int_be_base32(*delta),
		Tag::FallbackAddress(fallback) => {
			let mut words = Vec::with_capacity(1 + (fallback.program.len() * 8 + 4) / 5);
			words.push(fallback.version);
			words.extend(bech32::bytes_to_words(&fallback.program));
			words
		},
		Tag::RouteHint(hops) => bech32::bytes_to_words(&route_hint_bytes(hops)),
		Tag::Features(features) => features.to_words(),
		Tag::Metadata(bytes) => bech32::bytes_to_words(bytes),
	}
}

/// The fixed 51-byte-per-hop layout of a route hint.
fn route_hint_bytes(hops: &[RouteHop]) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(hops.len() * 51);
	for hop in hops {
		bytes.extend_from_slice(&hop.src_node_id.serialize());
		bytes.extend_from_slice(&hop.short_channel_id.to_be_bytes());
		bytes.extend_from_slice(&hop.fee_base_msat.to_be_bytes());
		bytes.extend_from_slice(&hop.fee_proportional_millionths.to_be_bytes());
		bytes.extend_from_slice(&hop.cltv_expiry_delta.to_be_bytes());
	}
	bytes
}
