//! The cryptographic backend seam: SHA-256 and recoverable ECDSA over
//! secp256k1, expressed over raw byte arrays so that alternative providers
//! (hardware signers, remote signers) can be plugged in.

use bitcoin_hashes::{sha256, Hash};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

/// The group order of secp256k1, big-endian.
const CURVE_ORDER: [u8; 32] = [
	0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
	0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
	0x41, 0x41,
];

/// Half the group order, rounded down, big-endian. Signatures with S above
/// this are non-canonical.
const HALF_CURVE_ORDER: [u8; 32] = [
	0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
	0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
	0x20, 0xa0,
];

/// Cryptographic operations an invoice codec needs. Signing and decoding are
/// generic over this so that the secp256k1 binding can be swapped out; tests
/// use it to inject known signatures.
pub trait CryptoProvider {
	/// Error returned by the signing operations
	type Error: core::fmt::Debug;

	/// SHA-256 digest of `msg`
	fn sha256(&self, msg: &[u8]) -> [u8; 32];

	/// Produce a recoverable ECDSA signature over the given message hash as
	/// compact R||S bytes (canonical low-S form) and a recovery id in 0..=3.
	fn sign_recoverable(
		&self, msg_hash: &[u8; 32], private_key: &[u8; 32],
	) -> Result<([u8; 64], u8), Self::Error>;

	/// Recover the compressed public key that produced a compact signature
	/// over the given message hash, or `None` if recovery fails. Providers
	/// must accept canonical S; behaviour on non-canonical S is up to the
	/// provider, the decoder retries with a normalized signature either way.
	fn recover(
		&self, msg_hash: &[u8; 32], signature: &[u8; 64], recovery_flag: u8,
	) -> Option<[u8; 33]>;

	/// Compressed SEC1 public key for a private key
	fn public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33], Self::Error>;
}

/// Crypto provider backed by the `secp256k1` and `bitcoin_hashes` crates.
pub struct Secp256k1Provider {
	ctx: Secp256k1<All>,
}

impl Secp256k1Provider {
	/// Creates a provider with a fresh signing/verification context.
	pub fn new() -> Self {
		Secp256k1Provider { ctx: Secp256k1::new() }
	}
}

impl Default for Secp256k1Provider {
	fn default() -> Self {
		Self::new()
	}
}

impl CryptoProvider for Secp256k1Provider {
	type Error = secp256k1::Error;

	fn sha256(&self, msg: &[u8]) -> [u8; 32] {
		sha256::Hash::hash(msg).into_inner()
	}

	fn sign_recoverable(
		&self, msg_hash: &[u8; 32], private_key: &[u8; 32],
	) -> Result<([u8; 64], u8), Self::Error> {
		let key = SecretKey::from_slice(private_key)?;
		let msg = Message::from_slice(&msg_hash[..])
			.expect("Hash is 32 bytes long, same as MESSAGE_SIZE");
		let (recovery_id, compact) =
			self.ctx.sign_ecdsa_recoverable(&msg, &key).serialize_compact();
		Ok((compact, recovery_id.to_i32() as u8))
	}

	fn recover(
		&self, msg_hash: &[u8; 32], signature: &[u8; 64], recovery_flag: u8,
	) -> Option<[u8; 33]> {
		let recovery_id = RecoveryId::from_i32(i32::from(recovery_flag)).ok()?;
		let signature = RecoverableSignature::from_compact(&signature[..], recovery_id).ok()?;
		let msg = Message::from_slice(&msg_hash[..])
			.expect("Hash is 32 bytes long, same as MESSAGE_SIZE");
		self.ctx.recover_ecdsa(&msg, &signature).ok().map(|key| key.serialize())
	}

	fn public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33], Self::Error> {
		let key = SecretKey::from_slice(private_key)?;
		Ok(PublicKey::from_secret_key(&self.ctx, &key).serialize())
	}
}

/// Whether the S half of a compact signature exceeds half the group order.
pub(crate) fn is_high_s(signature: &[u8; 64]) -> bool {
	signature[32..] > HALF_CURVE_ORDER[..]
}

/// Replaces S with `order - S`, mapping a non-canonical signature to its
/// canonical twin (and vice versa). The recovery id's low bit has to be
/// flipped alongside.
pub(crate) fn normalize_s(signature: &[u8; 64]) -> [u8; 64] {
	let mut normalized = *signature;
	let mut borrow = 0u8;
	for i in (0..32).rev() {
		let diff = i32::from(CURVE_ORDER[i]) - i32::from(signature[32 + i]) - i32::from(borrow);
		if diff < 0 {
			normalized[32 + i] = (diff + 256) as u8;
			borrow = 1;
		} else {
			normalized[32 + i] = diff as u8;
			borrow = 0;
		}
	}
	normalized
}
