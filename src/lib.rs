#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

#![deny(missing_docs)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#![cfg_attr(feature = "strict", deny(warnings))]

//! This crate provides data structures to represent
//! [lightning BOLT11](https://github.com/lightning/bolts/blob/master/11-payment-encoding.md)
//! invoices and functions to create, sign and decode these. If you just want to use the standard
//! en-/decoding functionality this should get you started:
//!
//!   * For parsing use `str::parse::<Invoice>(&self)` (see the docs of `impl FromStr for Invoice`)
//!   * For constructing invoices use the [`InvoiceBuilder`] and [`Invoice::sign`]
//!   * A signed or decoded invoice carries its string form in [`Invoice::payment_request()`]

pub mod bech32;
pub mod crypto;
pub mod features;
pub mod hrp;

mod de;
mod ser;

use core::fmt;
use core::fmt::{Display, Formatter};
use std::time::SystemTime;

use bitcoin_hashes::{sha256, Hash};
use chrono::{DateTime, SecondsFormat, Utc};
use secp256k1::PublicKey;

#[cfg(feature = "serde")]
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

use crate::bech32::u5;
use crate::crypto::{CryptoProvider, Secp256k1Provider};
use crate::features::FeatureBits;
pub use crate::hrp::{hrp_to_msat, hrp_to_sat, msat_to_hrp, msat_to_sat, sat_to_hrp};
pub use crate::hrp::{Network, NETWORKS};

/// The number of bits used to represent timestamps as defined in BOLT 11.
const TIMESTAMP_BITS: usize = 35;

/// The maximum timestamp in seconds since the Unix epoch allowed by [BOLT 11].
///
/// [BOLT 11]: https://github.com/lightning/bolts/blob/master/11-payment-encoding.md
pub const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Default expiry time as defined by [BOLT 11].
///
/// [BOLT 11]: https://github.com/lightning/bolts/blob/master/11-payment-encoding.md
pub const DEFAULT_EXPIRY_TIME: u64 = 3600;

/// Tag constants as specified in BOLT11
#[allow(missing_docs)]
pub mod constants {
	pub const TAG_PAYMENT_HASH: u8 = 1;
	pub const TAG_ROUTE_HINT: u8 = 3;
	pub const TAG_FEATURES: u8 = 5;
	pub const TAG_EXPIRE_TIME: u8 = 6;
	pub const TAG_FALLBACK_ADDRESS: u8 = 9;
	pub const TAG_DESCRIPTION: u8 = 13;
	pub const TAG_PAYMENT_SECRET: u8 = 16;
	pub const TAG_PAYEE: u8 = 19;
	pub const TAG_PURPOSE_COMMIT_HASH: u8 = 23;
	pub const TAG_MIN_FINAL_CLTV_EXPIRY: u8 = 24;
	pub const TAG_METADATA: u8 = 27;
}

/// SHA-256 hash
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Sha256(pub sha256::Hash);

/// The secret handed to the payer as part of the invoice, proving to the
/// payee that the payer saw the invoice.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct PaymentSecret(pub [u8; 32]);

/// Fallback on-chain address in case no LN payment is possible.
///
/// Version 17 is pay-to-pubkey-hash and 18 pay-to-script-hash; versions up to
/// 16 are segwit witness versions with `program` as the witness program.
/// Rendering a textual address out of this is up to the caller, using the
/// address version bytes its [`Network`] carries.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct FallbackAddress {
	/// Address version code as encoded on the wire
	pub version: u5,

	/// Raw hash or witness program
	pub program: Vec<u8>,
}

/// One hop of a private route hint, advising the payer how to reach the payee
/// over a channel not present in the public gossip.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct RouteHop {
	/// Node id of the channel's source
	pub src_node_id: PublicKey,

	/// Short channel id of the channel to route over
	pub short_channel_id: u64,

	/// Flat routing fee in millisatoshis
	pub fee_base_msat: u32,

	/// Liquidity-based routing fee in millionths of a routed amount
	pub fee_proportional_millionths: u32,

	/// CLTV delta the node will subtract from an incoming HTLC's expiry
	pub cltv_expiry_delta: u16,
}

/// Tagged field of an invoice, one variant per tag type assigned by BOLT11.
/// The variant payloads are the decoded wire values.
#[allow(missing_docs)]
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Tag {
	PaymentHash(Sha256),
	PaymentSecret(PaymentSecret),
	Description(String),
	PurposeCommitHash(Sha256),
	Payee(PublicKey),
	ExpireTime(u64),
	MinFinalCltvExpiry(u64),
	FallbackAddress(FallbackAddress),
	RouteHint(Vec<RouteHop>),
	Features(FeatureBits),
	Metadata(Vec<u8>),
}

impl Tag {
	/// Numeric representation of the field's tag
	pub fn type_code(&self) -> u8 {
		match *self {
			Tag::PaymentHash(_) => constants::TAG_PAYMENT_HASH,
			Tag::PaymentSecret(_) => constants::TAG_PAYMENT_SECRET,
			Tag::Description(_) => constants::TAG_DESCRIPTION,
			Tag::PurposeCommitHash(_) => constants::TAG_PURPOSE_COMMIT_HASH,
			Tag::Payee(_) => constants::TAG_PAYEE,
			Tag::ExpireTime(_) => constants::TAG_EXPIRE_TIME,
			Tag::MinFinalCltvExpiry(_) => constants::TAG_MIN_FINAL_CLTV_EXPIRY,
			Tag::FallbackAddress(_) => constants::TAG_FALLBACK_ADDRESS,
			Tag::RouteHint(_) => constants::TAG_ROUTE_HINT,
			Tag::Features(_) => constants::TAG_FEATURES,
			Tag::Metadata(_) => constants::TAG_METADATA,
		}
	}

	/// Canonical name of the field's tag
	pub fn name(&self) -> &'static str {
		match *self {
			Tag::PaymentHash(_) => "payment_hash",
			Tag::PaymentSecret(_) => "payment_secret",
			Tag::Description(_) => "description",
			Tag::PurposeCommitHash(_) => "purpose_commit_hash",
			Tag::Payee(_) => "payee",
			Tag::ExpireTime(_) => "expire_time",
			Tag::MinFinalCltvExpiry(_) => "min_final_cltv_expiry",
			Tag::FallbackAddress(_) => "fallback_address",
			Tag::RouteHint(_) => "route_hint",
			Tag::Features(_) => "feature_bits",
			Tag::Metadata(_) => "metadata",
		}
	}
}

/// Compact invoice signature: 64 bytes of R||S and the recovery id allowing
/// the payee key to be reconstructed from the signed data.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct InvoiceSignature {
	/// Compact R||S form, big-endian
	pub signature: [u8; 64],

	/// Recovery id, 0..=3
	pub recovery_flag: u8,
}

/// A BOLT11 invoice.
///
/// An invoice moves through three states:
///  1. *unsigned*, as produced by [`InvoiceBuilder::build`]: `signature` and
///     `payment_request` are unset,
///  2. *signed*, after [`Invoice::sign`]: `signature`, `payee_node_key` and
///     the serialized `payment_request` are populated,
///  3. *decoded*, from [`Invoice::decode`]: like signed, with
///     `payee_node_key` recovered from the signature (or taken from a `payee`
///     tagged field).
///
/// De- and encoding should not lead to information loss but may lead to
/// different strings since integers could have been encoded with leading
/// zeroes etc., which is why a decoded invoice keeps its original string.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Invoice {
	/// The network the invoice requests payment on
	pub network: Network,

	/// The amount to pay, or `None` for a donation invoice where the payer
	/// picks the amount
	pub millisatoshis: Option<u64>,

	/// Creation time as seconds since the Unix epoch
	pub timestamp: u64,

	/// Tagged fields in wire order, duplicates preserved
	pub tags: Vec<Tag>,

	/// The signature over HRP and data, once signed or decoded
	pub signature: Option<InvoiceSignature>,

	/// The payee's node key: derived while signing, recovered while decoding
	/// (`None` there if recovery failed)
	pub payee_node_key: Option<PublicKey>,

	/// The serialized bech32 form, once signed or decoded
	pub payment_request: Option<String>,
}

/// Finds the elements of the invoice's tag list matching a variant and
/// extracts their payloads through an iterator.
macro_rules! find_all_extract {
	($iter:expr, $enm:pat, $enm_var:ident) => {
		$iter.filter_map(|tag| match *tag {
			$enm => Some($enm_var),
			_ => None,
		})
	};
}

/// Extracts the payload of the *last* matching tag, the value a reader is
/// expected to honor when a field is duplicated.
macro_rules! find_extract {
	($iter:expr, $enm:pat, $enm_var:ident) => {
		find_all_extract!($iter, $enm, $enm_var).last()
	};
}

impl Invoice {
	/// The human readable part the invoice is (or will be) encoded under:
	/// `ln`, the network prefix and the amount token.
	pub fn hrp(&self) -> String {
		match self.millisatoshis {
			Some(msat) => format!("ln{}{}", self.network.bech32_prefix, hrp::msat_to_hrp(msat)),
			None => format!("ln{}", self.network.bech32_prefix),
		}
	}

	/// Whether the invoice carries a signature, i.e. was signed or decoded
	/// rather than freshly built.
	pub fn is_complete(&self) -> bool {
		self.signature.is_some()
	}

	/// The serialized invoice, present once signed or decoded.
	pub fn payment_request(&self) -> Option<&str> {
		self.payment_request.as_deref()
	}

	/// Timestamp and tagged fields as 5-bit words, the part of the data
	/// covered by the signature.
	fn data_words_without_signature(&self) -> Vec<u5> {
		let mut words = Vec::new();
		words.extend_from_slice(&ser::timestamp_words(self.timestamp));
		for tag in &self.tags {
			words.extend(ser::tagged_field_words(tag));
		}
		words
	}

	/// Calculate the hash of the encoded invoice which is (or was) signed:
	/// SHA-256 over the HRP bytes and the zero-padded data part.
	pub fn signable_hash(&self) -> [u8; 32] {
		let preimage = ser::construct_invoice_preimage(
			self.hrp().as_bytes(),
			&self.data_words_without_signature(),
		);
		sha256::Hash::hash(&preimage).into_inner()
	}

	/// Signs the invoice with the built-in secp256k1 backend. See
	/// [`Invoice::sign_with`].
	pub fn sign(self, private_key: &[u8; 32]) -> Result<Invoice, secp256k1::Error> {
		self.sign_with(private_key, &Secp256k1Provider::new())
	}

	/// Signs the invoice, populating [`Invoice::signature`],
	/// [`Invoice::payee_node_key`] and the serialized
	/// [`Invoice::payment_request()`]. Signing an already signed invoice
	/// replaces its signature.
	pub fn sign_with<C: CryptoProvider>(
		mut self, private_key: &[u8; 32], crypto: &C,
	) -> Result<Invoice, C::Error> {
		let hrp = self.hrp();
		let data = self.data_words_without_signature();
		let hash = crypto.sha256(&ser::construct_invoice_preimage(hrp.as_bytes(), &data));

		let (signature, recovery_flag) = crypto.sign_recoverable(&hash, private_key)?;
		let recovery_flag = recovery_flag & 3;
		let payee = crypto.public_key(private_key)?;

		let mut words = data;
		words.extend(bech32::bytes_to_words(&signature));
		words.push(u5::from_u8(recovery_flag));

		self.payment_request = Some(bech32::encode(&hrp, &words));
		self.signature = Some(InvoiceSignature { signature, recovery_flag });
		self.payee_node_key = PublicKey::from_slice(&payee).ok();
		Ok(self)
	}

	/// The payment hash (last occurrence, like all tag accessors)
	pub fn payment_hash(&self) -> Option<&Sha256> {
		find_extract!(self.tags.iter(), Tag::PaymentHash(ref x), x)
	}

	/// The payment secret
	pub fn payment_secret(&self) -> Option<&PaymentSecret> {
		find_extract!(self.tags.iter(), Tag::PaymentSecret(ref x), x)
	}

	/// The description of what is being paid for
	pub fn description(&self) -> Option<&str> {
		find_extract!(self.tags.iter(), Tag::Description(ref x), x).map(|d| d.as_str())
	}

	/// The commitment to a description provided out of band
	pub fn purpose_commit_hash(&self) -> Option<&Sha256> {
		find_extract!(self.tags.iter(), Tag::PurposeCommitHash(ref x), x)
	}

	/// The payee's node key as carried in a `payee` tagged field. For the
	/// derived key see [`Invoice::payee_node_key`].
	pub fn payee(&self) -> Option<&PublicKey> {
		find_extract!(self.tags.iter(), Tag::Payee(ref x), x)
	}

	/// Seconds after [`Invoice::timestamp`] at which the invoice expires
	pub fn expire_time(&self) -> Option<u64> {
		find_extract!(self.tags.iter(), Tag::ExpireTime(x), x)
	}

	/// `min_final_cltv_expiry` to use for the last HTLC in the route
	pub fn min_final_cltv_expiry(&self) -> Option<u64> {
		find_extract!(self.tags.iter(), Tag::MinFinalCltvExpiry(x), x)
	}

	/// The fallback on-chain address
	pub fn fallback_address(&self) -> Option<&FallbackAddress> {
		find_extract!(self.tags.iter(), Tag::FallbackAddress(ref x), x)
	}

	/// All route hints, in wire order
	pub fn route_hints(&self) -> Vec<&[RouteHop]> {
		find_all_extract!(self.tags.iter(), Tag::RouteHint(ref x), x).map(|hops| &hops[..]).collect()
	}

	/// The invoice's feature bits
	pub fn features(&self) -> Option<&FeatureBits> {
		find_extract!(self.tags.iter(), Tag::Features(ref x), x)
	}

	/// Opaque metadata to be reflected in the payment
	pub fn metadata(&self) -> Option<&[u8]> {
		find_extract!(self.tags.iter(), Tag::Metadata(ref x), x).map(|m| &m[..])
	}

	/// The amount in whole satoshis, `None` for donation invoices and for
	/// amounts with a fractional-satoshi part.
	pub fn satoshis(&self) -> Option<u64> {
		self.millisatoshis.and_then(hrp::msat_to_sat)
	}

	/// Creation time rendered as an ISO-8601 UTC string.
	pub fn timestamp_string(&self) -> String {
		// both decoding and building bound the timestamp to 35 bits
		iso8601(self.timestamp).expect("35-bit timestamps are within range")
	}

	/// The time at which the invoice expires, in seconds since the Unix
	/// epoch. Expiry defaults to [`DEFAULT_EXPIRY_TIME`] when no
	/// `expire_time` field is present.
	pub fn time_expire_date(&self) -> u64 {
		self.timestamp.saturating_add(self.expire_time().unwrap_or(DEFAULT_EXPIRY_TIME))
	}

	/// Expiry time rendered as an ISO-8601 UTC string, `None` if an absurd
	/// `expire_time` pushes it outside the representable range.
	pub fn time_expire_date_string(&self) -> Option<String> {
		iso8601(self.time_expire_date())
	}
}

fn iso8601(unix_seconds: u64) -> Option<String> {
	let timestamp = i64::try_from(unix_seconds).ok()?;
	let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
	Some(datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Builder for unsigned [`Invoice`]s.
///
/// ```
/// use bitcoin_hashes::{sha256, Hash};
/// use bolt11_invoice::{hrp, InvoiceBuilder, PaymentSecret};
///
/// let private_key = [
/// 	0xe1, 0x26, 0xf6, 0x8f, 0x7e, 0xaf, 0xcc, 0x8b, 0x74, 0xf5, 0x4d, 0x26, 0x9f,
/// 	0xe2, 0x06, 0xbe, 0x71, 0x50, 0x00, 0xf9, 0x4d, 0xac, 0x06, 0x7d, 0x1c, 0x04,
/// 	0xa8, 0xca, 0x3b, 0x2d, 0xb7, 0x34,
/// ];
///
/// let invoice = InvoiceBuilder::new(hrp::BITCOIN)
/// 	.description("Coins pls!".into())
/// 	.payment_hash(sha256::Hash::hash(&[0; 32][..]))
/// 	.payment_secret(PaymentSecret([42; 32]))
/// 	.current_timestamp()
/// 	.build()
/// 	.unwrap()
/// 	.sign(&private_key)
/// 	.unwrap();
///
/// assert!(invoice.payment_request().unwrap().starts_with("lnbc1"));
/// ```
#[derive(Clone, Debug)]
pub struct InvoiceBuilder {
	network: Network,
	millisatoshis: Option<u64>,
	timestamp: Option<u64>,
	tags: Vec<Tag>,
	error: Option<CreationError>,
}

impl InvoiceBuilder {
	/// Construct a new, empty builder for the given network.
	pub fn new(network: Network) -> Self {
		InvoiceBuilder {
			network,
			millisatoshis: None,
			timestamp: None,
			tags: Vec::new(),
			error: None,
		}
	}

	/// Sets the amount in millisatoshis.
	pub fn amount_milli_satoshis(mut self, amount_msat: u64) -> Self {
		self.millisatoshis = Some(amount_msat);
		self
	}

	/// Sets the amount in whole satoshis.
	pub fn amount_satoshis(mut self, amount_sat: u64) -> Self {
		match amount_sat.checked_mul(1000) {
			Some(msat) => self.millisatoshis = Some(msat),
			None => self.error = Some(CreationError::InvalidAmount),
		}
		self
	}

	/// Sets the creation time in seconds since the Unix epoch. When never
	/// called, [`InvoiceBuilder::build`] uses the current system time.
	pub fn timestamp(mut self, unix_seconds: u64) -> Self {
		self.timestamp = Some(unix_seconds);
		self
	}

	/// Sets the creation time to the current system time.
	pub fn current_timestamp(mut self) -> Self {
		let now = SystemTime::now()
			.duration_since(SystemTime::UNIX_EPOCH)
			.expect("for the foreseeable future this shouldn't happen");
		self.timestamp = Some(now.as_secs());
		self
	}

	/// Sets the payment hash.
	pub fn payment_hash(self, hash: sha256::Hash) -> Self {
		self.tag(Tag::PaymentHash(Sha256(hash)))
	}

	/// Sets the payment secret.
	pub fn payment_secret(self, payment_secret: PaymentSecret) -> Self {
		self.tag(Tag::PaymentSecret(payment_secret))
	}

	/// Sets the description.
	pub fn description(self, description: String) -> Self {
		self.tag(Tag::Description(description))
	}

	/// Sets the hash of a description provided out of band.
	pub fn purpose_commit_hash(self, hash: sha256::Hash) -> Self {
		self.tag(Tag::PurposeCommitHash(Sha256(hash)))
	}

	/// Sets the payee's public key.
	pub fn payee(self, pub_key: PublicKey) -> Self {
		self.tag(Tag::Payee(pub_key))
	}

	/// Sets the expiry time in seconds after the creation time.
	pub fn expire_time(self, seconds: u64) -> Self {
		self.tag(Tag::ExpireTime(seconds))
	}

	/// Sets `min_final_cltv_expiry`.
	pub fn min_final_cltv_expiry(self, delta: u64) -> Self {
		self.tag(Tag::MinFinalCltvExpiry(delta))
	}

	/// Adds a fallback address.
	pub fn fallback_address(self, fallback: FallbackAddress) -> Self {
		self.tag(Tag::FallbackAddress(fallback))
	}

	/// Adds a private route hint.
	pub fn route_hint(self, hops: Vec<RouteHop>) -> Self {
		self.tag(Tag::RouteHint(hops))
	}

	/// Sets the feature bits.
	pub fn features(self, features: FeatureBits) -> Self {
		self.tag(Tag::Features(features))
	}

	/// Sets opaque payment metadata.
	pub fn metadata(self, metadata: Vec<u8>) -> Self {
		self.tag(Tag::Metadata(metadata))
	}

	/// Appends any tagged field. Fields are encoded in the order they were
	/// added.
	pub fn tag(mut self, tag: Tag) -> Self {
		self.tags.push(tag);
		self
	}

	/// Builds an unsigned [`Invoice`] after checking that all required fields
	/// are present and encodable.
	pub fn build(self) -> Result<Invoice, CreationError> {
		// If an error occurred at any time before, return it now
		if let Some(error) = self.error {
			return Err(error);
		}

		let timestamp = match self.timestamp {
			Some(timestamp) => timestamp,
			None => SystemTime::now()
				.duration_since(SystemTime::UNIX_EPOCH)
				.expect("for the foreseeable future this shouldn't happen")
				.as_secs(),
		};
		if timestamp > MAX_TIMESTAMP {
			return Err(CreationError::TimestampOutOfBounds);
		}

		if !self.tags.iter().any(|tag| matches!(tag, Tag::PaymentHash(_))) {
			return Err(CreationError::MissingRequiredTag("payment_hash"));
		}
		if !self.tags.iter().any(|tag| matches!(tag, Tag::PaymentSecret(_))) {
			return Err(CreationError::MissingRequiredTag("payment_secret"));
		}
		let described = self
			.tags
			.iter()
			.any(|tag| matches!(tag, Tag::Description(_) | Tag::PurposeCommitHash(_)));
		if !described {
			return Err(CreationError::MissingRequiredTag("description"));
		}

		// a tag's length on the wire is two 5-bit words
		for tag in &self.tags {
			if ser::tag_payload_words(tag).len() > 1023 {
				return Err(CreationError::TagTooLong(tag.name()));
			}
		}

		Ok(Invoice {
			network: self.network,
			millisatoshis: self.millisatoshis,
			timestamp,
			tags: self.tags,
			signature: None,
			payee_node_key: None,
			payment_request: None,
		})
	}

	/// Builds and signs in one go using the built-in secp256k1 backend.
	pub fn build_signed(
		self, private_key: &[u8; 32],
	) -> Result<Invoice, SignOrCreationError<secp256k1::Error>> {
		self.build()
			.map_err(SignOrCreationError::CreationError)?
			.sign(private_key)
			.map_err(SignOrCreationError::SignError)
	}
}

/// Errors that indicate what is wrong with an invoice being decoded. They
/// have some granularity for debug reasons, but should generally result in an
/// "invalid BOLT11 invoice" message for the user.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum ParseError {
	NoSeparator,
	EmptyHrp,
	TooShort,
	InvalidChar(char),
	InvalidChecksum,
	UnknownNetwork(String),
	InvalidAmount(String),
	PicoNotMultipleOfTen,
	TagExtendsBeyondData,
}

impl Display for ParseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ParseError::NoSeparator => f.write_str("Invoice has no '1' separator"),
			ParseError::EmptyHrp => f.write_str("Invoice has an empty human readable part"),
			ParseError::TooShort => {
				f.write_str("Data part is shorter than timestamp plus signature")
			},
			ParseError::InvalidChar(c) => write!(f, "Invalid bech32 character ({})", c),
			ParseError::InvalidChecksum => f.write_str("Invalid bech32 checksum"),
			ParseError::UnknownNetwork(hrp) => {
				write!(f, "Human readable part {} names no known network", hrp)
			},
			ParseError::InvalidAmount(token) => write!(f, "Invalid amount token ({})", token),
			ParseError::PicoNotMultipleOfTen => {
				f.write_str("Pico-bitcoin amounts must be multiples of 10")
			},
			ParseError::TagExtendsBeyondData => {
				f.write_str("A tagged field's length extends past the data part")
			},
		}
	}
}

impl std::error::Error for ParseError {}

/// Errors that may occur when constructing a new unsigned invoice.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum CreationError {
	/// A field required by BOLT11 is missing; carries the tag's name
	MissingRequiredTag(&'static str),

	/// The Unix timestamp of the supplied date is greater than 35 bits
	TimestampOutOfBounds,

	/// The supplied amount cannot be represented
	InvalidAmount,

	/// The named tag's value exceeds the 1023 words its length field can
	/// describe
	TagTooLong(&'static str),
}

impl Display for CreationError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			CreationError::MissingRequiredTag(name) => {
				write!(f, "The invoice is missing the required {} field", name)
			},
			CreationError::TimestampOutOfBounds => {
				f.write_str("The Unix timestamp of the supplied date is greater than 35 bits")
			},
			CreationError::InvalidAmount => {
				f.write_str("The supplied amount cannot be represented")
			},
			CreationError::TagTooLong(name) => {
				write!(f, "The {} field is too long to be encoded", name)
			},
		}
	}
}

impl std::error::Error for CreationError {}

/// When signing using a fallible method either a provider `SignError` or a
/// `CreationError` may occur.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SignOrCreationError<S = ()> {
	/// An error occurred during signing
	SignError(S),

	/// An error occurred while building the invoice
	CreationError(CreationError),
}

impl<S> Display for SignOrCreationError<S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			SignOrCreationError::SignError(_) => f.write_str("An error occurred during signing"),
			SignOrCreationError::CreationError(err) => err.fmt(f),
		}
	}
}

#[cfg(feature = "serde")]
impl Serialize for Invoice {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let payment_request = self
			.payment_request()
			.ok_or_else(|| serde::ser::Error::custom("unsigned invoice has no string form"))?;
		serializer.serialize_str(payment_request)
	}
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Invoice {
	fn deserialize<D>(deserializer: D) -> Result<Invoice, D::Error>
	where
		D: Deserializer<'de>,
	{
		let bolt11 = String::deserialize(deserializer)?
			.parse::<Invoice>()
			.map_err(|e| D::Error::custom(format!("{:?}", e)))?;

		Ok(bolt11)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use bitcoin_hashes::hex::FromHex;

	fn unsigned_donation_invoice() -> Invoice {
		Invoice {
			network: hrp::BITCOIN,
			millisatoshis: None,
			timestamp: 1496314658,
			tags: vec![
				Tag::PaymentHash(Sha256(
					sha256::Hash::from_hex(
						"0001020304050607080900010203040506070809000102030405060708090102",
					)
					.unwrap(),
				)),
				Tag::Description("Please consider supporting this project".to_owned()),
			],
			signature: None,
			payee_node_key: None,
			payment_request: None,
		}
	}

	#[test]
	fn test_calc_invoice_hash() {
		let expected_hash = [
			0xc3, 0xd4, 0xe8, 0x3f, 0x64, 0x6f, 0xa7, 0x9a, 0x39, 0x3d, 0x75, 0x27, 0x7b, 0x1d,
			0x85, 0x8d, 0xb1, 0xd1, 0xf7, 0xab, 0x71, 0x37, 0xdc, 0xb7, 0x83, 0x5d, 0xb2, 0xec,
			0xd5, 0x18, 0xe1, 0xc9,
		];

		assert_eq!(unsigned_donation_invoice().signable_hash(), expected_hash)
	}

	#[test]
	fn test_sign_and_recover() {
		let private_key: [u8; 32] = [
			0xe1, 0x26, 0xf6, 0x8f, 0x7e, 0xaf, 0xcc, 0x8b, 0x74, 0xf5, 0x4d, 0x26, 0x9f, 0xe2,
			0x06, 0xbe, 0x71, 0x50, 0x00, 0xf9, 0x4d, 0xac, 0x06, 0x7d, 0x1c, 0x04, 0xa8, 0xca,
			0x3b, 0x2d, 0xb7, 0x34,
		];

		let invoice = unsigned_donation_invoice().sign(&private_key).unwrap();
		assert!(invoice.is_complete());
		let payee_node_key = invoice.payee_node_key.unwrap();

		let decoded = Invoice::decode(invoice.payment_request().unwrap()).unwrap();
		assert_eq!(decoded.payee_node_key, Some(payee_node_key));
		assert_eq!(decoded.signature, invoice.signature);
		assert_eq!(decoded.timestamp, 1496314658);
		assert_eq!(decoded.tags, invoice.tags);
	}

	#[test]
	fn test_builder_required_tags() {
		let hash = sha256::Hash::hash(&[0; 32][..]);

		let builder = InvoiceBuilder::new(hrp::BITCOIN).timestamp(1234567);
		assert_eq!(
			builder.clone().build().unwrap_err(),
			CreationError::MissingRequiredTag("payment_hash")
		);
		let builder = builder.payment_hash(hash);
		assert_eq!(
			builder.clone().build().unwrap_err(),
			CreationError::MissingRequiredTag("payment_secret")
		);
		let builder = builder.payment_secret(PaymentSecret([0; 32]));
		assert_eq!(
			builder.clone().build().unwrap_err(),
			CreationError::MissingRequiredTag("description")
		);

		// either a description or a commitment to one will do
		assert!(builder.clone().description("Test".into()).build().is_ok());
		assert!(builder.purpose_commit_hash(hash).build().is_ok());
	}

	#[test]
	fn test_builder_bounds() {
		let hash = sha256::Hash::hash(&[0; 32][..]);
		let builder = InvoiceBuilder::new(hrp::BITCOIN)
			.description("Test".into())
			.payment_hash(hash)
			.payment_secret(PaymentSecret([0; 32]));

		assert_eq!(
			builder.clone().timestamp(MAX_TIMESTAMP + 1).build().unwrap_err(),
			CreationError::TimestampOutOfBounds
		);
		assert_eq!(
			builder.clone().timestamp(MAX_TIMESTAMP).build().unwrap().timestamp,
			MAX_TIMESTAMP
		);

		assert_eq!(
			builder.clone().amount_satoshis(u64::max_value()).build().unwrap_err(),
			CreationError::InvalidAmount
		);
		assert_eq!(
			builder.clone().amount_satoshis(2500).build().unwrap().millisatoshis,
			Some(2_500_000)
		);

		// a description beyond 639 bytes does not fit the 10-bit tag length
		let overlong: String = std::iter::repeat('?').take(640).collect();
		assert_eq!(
			builder.clone().description(overlong).build().unwrap_err(),
			CreationError::TagTooLong("description")
		);

		let defaulted = builder.build().unwrap();
		assert!(defaulted.timestamp > 0 && defaulted.timestamp <= MAX_TIMESTAMP);
	}

	#[test]
	fn test_duplicate_tags_last_wins() {
		let mut invoice = unsigned_donation_invoice();
		invoice.tags.push(Tag::Description("but newer".to_owned()));
		invoice.tags.push(Tag::ExpireTime(60));

		assert_eq!(invoice.description(), Some("but newer"));
		assert_eq!(invoice.tags.iter().filter(|t| t.name() == "description").count(), 2);
		assert_eq!(invoice.expire_time(), Some(60));
		assert_eq!(invoice.min_final_cltv_expiry(), None);
	}

	#[test]
	fn test_hrp_construction() {
		let mut invoice = unsigned_donation_invoice();
		assert_eq!(invoice.hrp(), "lnbc");
		invoice.millisatoshis = Some(250_000_000);
		assert_eq!(invoice.hrp(), "lnbc2500u");
		invoice.network = hrp::TESTNET;
		assert_eq!(invoice.hrp(), "lntb2500u");
	}

	#[test]
	fn test_satoshi_amounts() {
		let mut invoice = unsigned_donation_invoice();
		assert_eq!(invoice.satoshis(), None);
		invoice.millisatoshis = Some(250_000_000);
		assert_eq!(invoice.satoshis(), Some(250_000));
		invoice.millisatoshis = Some(967_878_534);
		assert_eq!(invoice.satoshis(), None);
	}

	#[test]
	fn test_time_rendering() {
		let mut invoice = unsigned_donation_invoice();
		assert_eq!(invoice.timestamp_string(), "2017-06-01T10:57:38.000Z");
		assert_eq!(invoice.time_expire_date(), 1496314658 + DEFAULT_EXPIRY_TIME);

		invoice.tags.push(Tag::ExpireTime(60));
		assert_eq!(invoice.time_expire_date_string().unwrap(), "2017-06-01T10:58:38.000Z");
	}

	#[cfg(feature = "serde")]
	#[test]
	fn test_serde() {
		let invoice = unsigned_donation_invoice().sign(&[0x41; 32]).unwrap();

		let serialized = serde_json::to_string(&invoice).unwrap();
		let deserialized: Invoice = serde_json::from_str(&serialized).unwrap();
		assert_eq!(deserialized.payment_request(), invoice.payment_request());
		assert!(serde_json::to_string(&unsigned_donation_invoice()).is_err());
	}
}
