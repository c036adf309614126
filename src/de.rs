//! Deserialization of bech32-encoded invoice strings.

use core::str::FromStr;

use bitcoin_hashes::{sha256, Hash};
use secp256k1::PublicKey;

use crate::bech32::{self, u5};
use crate::crypto::{self, CryptoProvider, Secp256k1Provider};
use crate::features::FeatureBits;
use crate::{
	constants, hrp, ser, FallbackAddress, Invoice, InvoiceSignature, ParseError, PaymentSecret,
	RouteHop, Sha256, Tag,
};

/// Words of the signature envelope: 103 words of compact signature plus the
/// recovery id word.
const SIGNATURE_WORDS: usize = 104;

impl FromStr for Invoice {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Invoice::decode(s)
	}
}

impl Invoice {
	/// Decodes a bech32 invoice string using the built-in secp256k1 backend.
	pub fn decode(s: &str) -> Result<Invoice, ParseError> {
		Self::decode_with(s, &Secp256k1Provider::new())
	}

	/// Decodes a bech32 invoice string, recovering the payee key through the
	/// given crypto provider.
	///
	/// The payee key is the `payee` tagged field when present, otherwise it
	/// is recovered from the signature. Recovery failure is not an error, it
	/// only leaves [`Invoice::payee_node_key`] unset.
	pub fn decode_with<C: CryptoProvider>(s: &str, crypto: &C) -> Result<Invoice, ParseError> {
		let (hrp_str, data) = bech32::decode(s)?;

		let prefix = hrp_str
			.strip_prefix("ln")
			.ok_or_else(|| ParseError::UnknownNetwork(hrp_str.clone()))?;
		let (network, amount_token) =
			hrp::split_hrp(prefix).ok_or_else(|| ParseError::UnknownNetwork(hrp_str.clone()))?;
		let millisatoshis = if amount_token.is_empty() {
			None
		} else {
			Some(hrp::hrp_to_msat(amount_token)?)
		};

		if data.len() < ser::TIMESTAMP_WORDS + SIGNATURE_WORDS {
			return Err(ParseError::TooShort);
		}

		let timestamp = parse_int_be(&data[..ser::TIMESTAMP_WORDS], 32)
			.expect("7 base-32 digits fit a u64");
		let (tag_part, signature_part) = data[ser::TIMESTAMP_WORDS..]
			.split_at(data.len() - ser::TIMESTAMP_WORDS - SIGNATURE_WORDS);

		let tags = parse_tagged_fields(tag_part)?;

		let mut signature = [0u8; 64];
		signature
			.copy_from_slice(&bech32::words_to_bytes(&signature_part[..SIGNATURE_WORDS - 1], false));
		let recovery_flag = signature_part[SIGNATURE_WORDS - 1].as_u8() & 3;

		let hash = crypto
			.sha256(&ser::construct_invoice_preimage(
				hrp_str.as_bytes(),
				&data[..data.len() - SIGNATURE_WORDS],
			));

		let payee_node_key = tags
			.iter()
			.rev()
			.find_map(|tag| match tag {
				Tag::Payee(key) => Some(*key),
				_ => None,
			})
			.or_else(|| recover_payee_node_key(crypto, &hash, &signature, recovery_flag));

		Ok(Invoice {
			network,
			millisatoshis,
			timestamp,
			tags,
			signature: Some(InvoiceSignature { signature, recovery_flag }),
			payee_node_key,
			payment_request: Some(s.to_lowercase()),
		})
	}
}

/// Recovery with high-S tolerance: providers enforcing canonical signatures
/// reject S above half the group order, in which case the canonical twin
/// (`order - S`, recovery id's low bit flipped) recovers the same key.
fn recover_payee_node_key<C: CryptoProvider>(
	crypto: &C, hash: &[u8; 32], signature: &[u8; 64], recovery_flag: u8,
) -> Option<PublicKey> {
	let recovered = crypto.recover(hash, signature, recovery_flag).or_else(|| {
		if crypto::is_high_s(signature) {
			crypto.recover(hash, &crypto::normalize_s(signature), recovery_flag ^ 1)
		} else {
			None
		}
	})?;
	PublicKey::from_slice(&recovered).ok()
}

/// Reads a big-endian integer out of digits of the given base, `None` on
/// overflow.
pub(crate) fn parse_int_be<U: Copy>(digits: &[U], base: u64) -> Option<u64>
where
	u64: From<U>,
{
	digits.iter().try_fold(0u64, |acc, &digit| {
		acc.checked_mul(base).and_then(|shifted| shifted.checked_add(u64::from(digit)))
	})
}

/// Walks the tagged fields sequentially. Unknown type codes and payloads that
/// fail a tag's constraints are skipped, only a length field running past the
/// end of the data is fatal.
fn parse_tagged_fields(mut words: &[u5]) -> Result<Vec<Tag>, ParseError> {
	let mut tags = Vec::new();
	while !words.is_empty() {
		if words.len() < 3 {
			return Err(ParseError::TagExtendsBeyondData);
		}
		let tag_type = words[0].as_u8();
		let length = usize::from(words[1].as_u8()) * 32 + usize::from(words[2].as_u8());
		if words.len() < 3 + length {
			return Err(ParseError::TagExtendsBeyondData);
		}
		if let Some(tag) = parse_tag(tag_type, &words[3..3 + length]) {
			tags.push(tag);
		}
		words = &words[3 + length..];
	}
	Ok(tags)
}

fn parse_tag(tag_type: u8, payload: &[u5]) -> Option<Tag> {
	match tag_type {
		constants::TAG_PAYMENT_HASH => parse_sha256(payload).map(Tag::PaymentHash),
		constants::TAG_PAYMENT_SECRET => parse_payment_secret(payload).map(Tag::PaymentSecret),
		constants::TAG_DESCRIPTION => {
			let bytes = bech32::words_to_bytes(payload, false);
			Some(Tag::Description(String::from_utf8_lossy(&bytes).into_owned()))
		},
		constants::TAG_PURPOSE_COMMIT_HASH => parse_sha256(payload).map(Tag::PurposeCommitHash),
		constants::TAG_PAYEE => parse_payee(payload).map(Tag::Payee),
		constants::TAG_EXPIRE_TIME => parse_int_be(payload, 32).map(Tag::ExpireTime),
		constants::TAG_MIN_FINAL_CLTV_EXPIRY => {
			parse_int_be(payload, 32).map(Tag::MinFinalCltvExpiry)
		},
		constants::TAG_FALLBACK_ADDRESS => parse_fallback(payload).map(Tag::FallbackAddress),
		constants::TAG_ROUTE_HINT => parse_route_hint(payload).map(Tag::RouteHint),
		constants::TAG_FEATURES => Some(Tag::Features(FeatureBits::from_words(payload))),
		constants::TAG_METADATA => Some(Tag::Metadata(bech32::words_to_bytes(payload, false))),
		_ => None,
	}
}

fn parse_sha256(payload: &[u5]) -> Option<Sha256> {
	if payload.len() != 52 {
		return None;
	}
	sha256::Hash::from_slice(&bech32::words_to_bytes(payload, false)).ok().map(Sha256)
}

fn parse_payment_secret(payload: &[u5]) -> Option<PaymentSecret> {
	if payload.len() != 52 {
		return None;
	}
	let bytes = bech32::words_to_bytes(payload, false);
	<[u8; 32]>::try_from(&bytes[..]).ok().map(PaymentSecret)
}

fn parse_payee(payload: &[u5]) -> Option<PublicKey> {
	if payload.len() != 53 {
		return None;
	}
	PublicKey::from_slice(&bech32::words_to_bytes(payload, false)).ok()
}

fn parse_fallback(payload: &[u5]) -> Option<FallbackAddress> {
	let (version, program) = payload.split_first()?;
	Some(FallbackAddress {
		version: *version,
		program: bech32::words_to_bytes(program, false),
	})
}

fn parse_route_hint(payload: &[u5]) -> Option<Vec<RouteHop>> {
	let bytes = bech32::words_to_bytes(payload, false);
	let mut hops = Vec::with_capacity(bytes.len() / 51);
	for hop in bytes.chunks_exact(51) {
		hops.push(RouteHop {
			src_node_id: PublicKey::from_slice(&hop[..33]).ok()?,
			short_channel_id: u64::from_be_bytes(hop[33..41].try_into().ok()?),
			fee_base_msat: u32::from_be_bytes(hop[41..45].try_into().ok()?),
			fee_proportional_millionths: u32::from_be_bytes(hop[45..49].try_into().ok()?),
			cltv_expiry_delta: u16::from_be_bytes(hop[49..51].try_into().ok()?),
		});
	}
	Some(hops)
}

#[cfg(test)]
mod test {
	use super::*;

	fn words(s: &str) -> Vec<u5> {
		s.chars().map(|c| u5::try_from_char(c).unwrap()).collect()
	}

	#[test]
	fn int_be_parsing() {
		assert_eq!(parse_int_be(&words("pvjluez"), 32), Some(1496314658));
		assert_eq!(parse_int_be(&words("xqzpu")[3..], 32), Some(60));
		assert_eq!(parse_int_be(&words("q"), 32), Some(0));
		assert_eq!(parse_int_be::<u8>(&[123; 8], 256), Some(0x7b7b7b7b7b7b7b7b));
		// 14 base-32 digits no longer fit a u64
		assert_eq!(parse_int_be(&words("llllllllllllll"), 32), None);
	}

	#[test]
	fn known_tag_parsing() {
		let fields = words("pp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypq");
		let tags = parse_tagged_fields(&fields).unwrap();
		assert_eq!(tags.len(), 1);
		match &tags[0] {
			Tag::PaymentHash(hash) => assert_eq!(
				format!("{}", hash.0),
				"0001020304050607080900010203040506070809000102030405060708090102"
			),
			other => panic!("unexpected tag {:?}", other),
		}
	}

	#[test]
	fn unknown_tags_are_skipped() {
		// type 2 is unassigned; a payment hash follows it
		let mut fields = words("zqpq");
		fields.extend(words("pp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypq"));
		let tags = parse_tagged_fields(&fields).unwrap();
		assert_eq!(tags.len(), 1);
		assert!(matches!(tags[0], Tag::PaymentHash(_)));
	}

	#[test]
	fn wrong_length_strict_tags_are_dropped() {
		// payment hash with a 51-word payload instead of 52
		let mut fields = words("ppn");
		fields.extend(std::iter::repeat(u5::ZERO).take(51));
		assert_eq!(parse_tagged_fields(&fields).unwrap(), vec![]);

		// payee key must be 53 words
		let mut fields = words("npj");
		fields.extend(std::iter::repeat(u5::ZERO).take(50));
		assert_eq!(parse_tagged_fields(&fields).unwrap(), vec![]);
	}

	#[test]
	fn truncated_tag_is_fatal() {
		// claims 4 payload words but only 2 follow
		let fields = words("pqyqq");
		assert_eq!(parse_tagged_fields(&fields).unwrap_err(), ParseError::TagExtendsBeyondData);
		// a dangling type word with no length
		assert_eq!(
			parse_tagged_fields(&words("p")).unwrap_err(),
			ParseError::TagExtendsBeyondData
		);
	}

	#[test]
	fn expiry_tag() {
		let tags = parse_tagged_fields(&words("xqzpu")).unwrap();
		assert_eq!(tags, vec![Tag::ExpireTime(60)]);
	}

	#[test]
	fn high_s_signature_recovers_payee() {
		use crate::InvoiceBuilder;

		let private_key = [0x21; 32];
		let signed = InvoiceBuilder::new(hrp::BITCOIN)
			.timestamp(1496314658)
			.payment_hash(sha256::Hash::hash(b"preimage"))
			.payment_secret(PaymentSecret([7; 32]))
			.description("high s".to_owned())
			.build()
			.unwrap()
			.sign(&private_key)
			.unwrap();

		// malleate the canonical signature into its high-S twin and re-encode
		let (hrp_part, data) = bech32::decode(signed.payment_request().unwrap()).unwrap();
		let signature_start = data.len() - SIGNATURE_WORDS;
		let mut signature = [0u8; 64];
		signature.copy_from_slice(&bech32::words_to_bytes(
			&data[signature_start..data.len() - 1],
			false,
		));
		let high = crypto::normalize_s(&signature);
		assert!(crypto::is_high_s(&high));
		let flipped_flag = data[data.len() - 1].as_u8() ^ 1;

		let mut malleated = data[..signature_start].to_vec();
		malleated.extend(bech32::bytes_to_words(&high));
		malleated.push(u5::from_u8(flipped_flag));
		let malleated = bech32::encode(&hrp_part, &malleated);

		let decoded = Invoice::decode(&malleated).unwrap();
		let provider = Secp256k1Provider::new();
		let expected =
			PublicKey::from_slice(&provider.public_key(&private_key).unwrap()).unwrap();
		assert_eq!(decoded.payee_node_key, Some(expected));
		assert_eq!(decoded.tags, signed.tags);
	}

	#[test]
	fn recovery_failure_is_not_fatal() {
		// an all-zero signature recovers no key but the invoice still decodes
		let mut data = ser::timestamp_words(1496314658).to_vec();
		data.extend(std::iter::repeat(u5::ZERO).take(SIGNATURE_WORDS));
		let encoded = bech32::encode("lnbc", &data);

		let decoded = Invoice::decode(&encoded).unwrap();
		assert_eq!(decoded.payee_node_key, None);
		assert_eq!(decoded.signature.as_ref().unwrap().signature, [0; 64]);
		assert!(decoded.is_complete());
	}
}
