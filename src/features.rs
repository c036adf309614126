//! Feature flags carried in an invoice's `9` tagged field.
//!
//! Flags are a variable-width bitfield. Even bits mean the payer is required
//! to understand the feature, the paired odd bit means it is supported but
//! optional. Bit 0 is the least significant bit of the last wire word.

use crate::bech32::u5;

/// First bit position not covered by a named feature pair.
const EXTRA_BITS_START: usize = 20;

/// Feature bits of an invoice, with the wire word length preserved so that
/// re-encoding reproduces the original padding.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct FeatureBits {
	/// Little-endian bit order: bit `i` lives at `flags[i / 8] & (1 << (i % 8))`.
	flags: Vec<u8>,
	word_length: usize,
}

/// Feature bits at positions with no assigned meaning (20 and up).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtraBits {
	/// Set bit positions, ascending
	pub bits: Vec<usize>,

	/// Whether any even (required) unassigned bit is set
	pub has_required: bool,
}

macro_rules! define_feature {
	($even_bit: expr, $feature: expr, $set_optional: ident, $set_required: ident,
	 $supports: ident, $requires: ident) => {
		#[doc = concat!("Sets the `", $feature, "` feature as optional.")]
		pub fn $set_optional(&mut self) {
			self.set_bit($even_bit + 1);
		}

		#[doc = concat!("Sets the `", $feature, "` feature as required.")]
		pub fn $set_required(&mut self) {
			self.set_bit($even_bit);
		}

		#[doc = concat!("Whether the `", $feature, "` feature is supported (either bit of the pair).")]
		pub fn $supports(&self) -> bool {
			self.is_set($even_bit) || self.is_set($even_bit + 1)
		}

		#[doc = concat!("Whether the `", $feature, "` feature is required (the even bit).")]
		pub fn $requires(&self) -> bool {
			self.is_set($even_bit)
		}
	};
}

impl FeatureBits {
	/// Create a feature bitfield with no bits set.
	pub fn empty() -> Self {
		FeatureBits { flags: Vec::new(), word_length: 0 }
	}

	/// Create a feature bitfield from little-endian flag bytes. The word
	/// length is the minimum covering the highest set bit.
	pub fn from_le_bytes(flags: Vec<u8>) -> Self {
		let highest = flags
			.iter()
			.enumerate()
			.rev()
			.find(|(_, byte)| **byte != 0)
			.map(|(i, byte)| i * 8 + 7 - byte.leading_zeros() as usize);
		let mut features = Self::empty();
		features.flags = flags;
		match highest {
			Some(bit) => features.resize_for(bit),
			None => features.flags.clear(),
		}
		features
	}

	/// The little-endian flag bytes.
	pub fn le_flags(&self) -> &[u8] {
		&self.flags
	}

	/// Whether the given bit is set.
	pub fn is_set(&self, bit: usize) -> bool {
		self.flags.get(bit / 8).map_or(false, |byte| byte & (1 << (bit % 8)) != 0)
	}

	/// Sets the given bit, growing the word length if needed.
	pub fn set_bit(&mut self, bit: usize) {
		self.resize_for(bit);
		self.flags[bit / 8] |= 1 << (bit % 8);
	}

	/// The number of 5-bit words this bitfield occupies on the wire.
	pub fn word_length(&self) -> usize {
		self.word_length
	}

	fn resize_for(&mut self, bit: usize) {
		if bit >= self.word_length * 5 {
			self.word_length = bit / 5 + 1;
		}
		let bytes = (self.word_length * 5 + 7) / 8;
		self.flags.resize(bytes, 0);
	}

	/// Parses the big-endian wire words of a `9` tagged field, preserving
	/// their count.
	pub fn from_words(words: &[u5]) -> Self {
		let word_length = words.len();
		let mut features =
			FeatureBits { flags: vec![0; (word_length * 5 + 7) / 8], word_length };
		for (i, word) in words.iter().rev().enumerate() {
			for value_bit in 0..5 {
				if word.as_u8() & (1 << value_bit) != 0 {
					let bit = i * 5 + value_bit;
					features.flags[bit / 8] |= 1 << (bit % 8);
				}
			}
		}
		features
	}

	/// Serializes to big-endian wire words, `word_length` of them.
	pub fn to_words(&self) -> Vec<u5> {
		let mut words = vec![u5::ZERO; self.word_length];
		for (i, word) in words.iter_mut().rev().enumerate() {
			let mut value = 0u8;
			for value_bit in 0..5 {
				if self.is_set(i * 5 + value_bit) {
					value |= 1 << value_bit;
				}
			}
			*word = u5::from_u8(value);
		}
		words
	}

	/// Set bits outside the named pairs, together with whether any of them is
	/// at an even (required) position.
	pub fn extra_bits(&self) -> ExtraBits {
		let bits: Vec<usize> =
			(EXTRA_BITS_START..self.word_length * 5).filter(|bit| self.is_set(*bit)).collect();
		let has_required = bits.iter().any(|bit| bit % 2 == 0);
		ExtraBits { bits, has_required }
	}

	define_feature!(0, "option_data_loss_protect", set_data_loss_protect_optional,
		set_data_loss_protect_required, supports_data_loss_protect, requires_data_loss_protect);
	define_feature!(2, "initial_routing_sync", set_initial_routing_sync_optional,
		set_initial_routing_sync_required, supports_initial_routing_sync,
		requires_initial_routing_sync);
	define_feature!(4, "option_upfront_shutdown_script", set_upfront_shutdown_script_optional,
		set_upfront_shutdown_script_required, supports_upfront_shutdown_script,
		requires_upfront_shutdown_script);
	define_feature!(6, "gossip_queries", set_gossip_queries_optional, set_gossip_queries_required,
		supports_gossip_queries, requires_gossip_queries);
	define_feature!(8, "var_onion_optin", set_variable_length_onion_optional,
		set_variable_length_onion_required, supports_variable_length_onion,
		requires_variable_length_onion);
	define_feature!(10, "gossip_queries_ex", set_gossip_queries_ex_optional,
		set_gossip_queries_ex_required, supports_gossip_queries_ex, requires_gossip_queries_ex);
	define_feature!(12, "option_static_remotekey", set_static_remote_key_optional,
		set_static_remote_key_required, supports_static_remote_key, requires_static_remote_key);
	define_feature!(14, "payment_secret", set_payment_secret_optional,
		set_payment_secret_required, supports_payment_secret, requires_payment_secret);
	define_feature!(16, "basic_mpp", set_basic_mpp_optional, set_basic_mpp_required,
		supports_basic_mpp, requires_basic_mpp);
	define_feature!(18, "option_support_large_channel", set_wumbo_optional, set_wumbo_required,
		supports_wumbo, requires_wumbo);
}
