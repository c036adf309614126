//! Human-readable-part handling: the network prefix table and the amount
//! encoding with its `m`/`u`/`n`/`p` multipliers.

use crate::ParseError;

/// Multiplier of a whole-bitcoin amount, in millisatoshis: 1 BTC = 10^11 msat.
const MSAT_PER_BTC: u128 = 100_000_000_000;

/// Configuration of a chain an invoice can request payment on.
///
/// The address version bytes and valid witness versions are carried so that
/// callers can reconstruct a textual fallback address; this library itself
/// only surfaces the raw fallback version and program.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct Network {
	/// Prefix of the human readable part directly following `ln`
	pub bech32_prefix: &'static str,

	/// Base58 version byte of pay-to-pubkey-hash addresses
	pub pub_key_hash: u8,

	/// Base58 version byte of pay-to-script-hash addresses
	pub script_hash: u8,

	/// Segwit witness versions valid for fallback addresses on this chain
	pub valid_witness_versions: &'static [u8],
}

/// Bitcoin mainnet (`bc`)
pub const BITCOIN: Network = Network {
	bech32_prefix: "bc",
	pub_key_hash: 0x00,
	script_hash: 0x05,
	valid_witness_versions: &[0, 1],
};

/// Bitcoin testnet (`tb`)
pub const TESTNET: Network = Network {
	bech32_prefix: "tb",
	pub_key_hash: 0x6f,
	script_hash: 0xc4,
	valid_witness_versions: &[0, 1],
};

/// Bitcoin signet (`tbs`)
pub const SIGNET: Network = Network {
	bech32_prefix: "tbs",
	pub_key_hash: 0x6f,
	script_hash: 0xc4,
	valid_witness_versions: &[0, 1],
};

/// Bitcoin regtest (`bcrt`)
pub const REGTEST: Network = Network {
	bech32_prefix: "bcrt",
	pub_key_hash: 0x6f,
	script_hash: 0xc4,
	valid_witness_versions: &[0, 1],
};

/// Simnet (`sb`)
pub const SIMNET: Network = Network {
	bech32_prefix: "sb",
	pub_key_hash: 0x3f,
	script_hash: 0x7b,
	valid_witness_versions: &[0, 1],
};

/// All known networks, longest prefix first so that prefix matching finds
/// `bcrt` before `bc` and `tbs` before `tb`.
pub static NETWORKS: [Network; 5] = [REGTEST, SIGNET, TESTNET, SIMNET, BITCOIN];

impl Network {
	/// Looks up a network by the exact prefix following `ln` in the HRP.
	pub fn from_prefix(prefix: &str) -> Option<Network> {
		NETWORKS.iter().find(|n| n.bech32_prefix == prefix).copied()
	}
}

/// Splits the part of an HRP following `ln` into the longest matching known
/// network and the remaining (possibly empty) amount token.
pub(crate) fn split_hrp(hrp_suffix: &str) -> Option<(Network, &str)> {
	NETWORKS
		.iter()
		.find(|n| hrp_suffix.starts_with(n.bech32_prefix))
		.map(|n| (*n, &hrp_suffix[n.bech32_prefix.len()..]))
}

/// Millisatoshis represented by an amount token multiplier, or `None` for the
/// sub-millisatoshi `p` multiplier which needs its own divisibility rule.
fn multiplier_msat(suffix: char) -> Option<u128> {
	match suffix {
		'm' => Some(100_000_000),
		'u' => Some(100_000),
		'n' => Some(100),
		_ => None,
	}
}

/// Parses an HRP amount token into millisatoshis.
///
/// The token is `digits` followed by an optional multiplier out of `m`, `u`,
/// `n` and `p`. The digits must not carry a leading zero (unless the token is
/// the single digit `0`), and `p` amounts must be multiples of 10 since one
/// pico-bitcoin is a tenth of a millisatoshi.
pub fn hrp_to_msat(token: &str) -> Result<u64, ParseError> {
	let invalid = || ParseError::InvalidAmount(token.to_owned());

	let (digits, suffix) = match token.chars().last() {
		Some(c) if c.is_ascii_digit() => (token, None),
		Some(c) => (&token[..token.len() - c.len_utf8()], Some(c)),
		None => return Err(invalid()),
	};
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return Err(invalid());
	}
	if digits.len() > 1 && digits.starts_with('0') {
		return Err(invalid());
	}
	let value: u128 = digits.parse().map_err(|_| invalid())?;

	let msat = match suffix {
		None => value.checked_mul(MSAT_PER_BTC).ok_or_else(invalid)?,
		Some('p') => {
			if value % 10 != 0 {
				return Err(ParseError::PicoNotMultipleOfTen);
			}
			value / 10
		},
		Some(c) => {
			let multiplier = multiplier_msat(c).ok_or_else(invalid)?;
			value.checked_mul(multiplier).ok_or_else(invalid)?
		},
	};

	u64::try_from(msat).map_err(|_| invalid())
}

/// Parses an HRP amount token into whole satoshis, failing on amounts with a
/// fractional-satoshi part.
pub fn hrp_to_sat(token: &str) -> Result<u64, ParseError> {
	let msat = hrp_to_msat(token)?;
	msat_to_sat(msat).ok_or_else(|| ParseError::InvalidAmount(token.to_owned()))
}

/// Encodes millisatoshis as the shortest amount token: the first multiplier
/// out of `m`, `u` and `n` dividing the amount evenly, falling back to the
/// always-exact pico form.
pub fn msat_to_hrp(msat: u64) -> String {
	for (suffix, divisor) in [('m', 100_000_000u64), ('u', 100_000), ('n', 100)] {
		if msat >= divisor && msat % divisor == 0 {
			return format!("{}{}", msat / divisor, suffix);
		}
	}
	format!("{}p", u128::from(msat) * 10)
}

/// Encodes whole satoshis as the shortest amount token.
pub fn sat_to_hrp(sat: u64) -> String {
	msat_to_hrp(sat.saturating_mul(1000))
}

/// The whole-satoshi part of a millisatoshi amount, or `None` when the amount
/// is not a whole number of satoshis.
pub fn msat_to_sat(msat: u64) -> Option<u64> {
	if msat % 1000 == 0 {
		Some(msat / 1000)
	} else {
		None
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn network_prefix_matching() {
		assert_eq!(split_hrp("bc2500u").unwrap().0, BITCOIN);
		assert_eq!(split_hrp("bc2500u").unwrap().1, "2500u");
		assert_eq!(split_hrp("tb20m").unwrap().0, TESTNET);
		// longest prefix wins over its prefixes
		assert_eq!(split_hrp("bcrt1m").unwrap(), (REGTEST, "1m"));
		assert_eq!(split_hrp("tbs").unwrap(), (SIGNET, ""));
		assert_eq!(split_hrp("sb"), Some((SIMNET, "")));
		assert_eq!(split_hrp("xyz"), None);
	}

	#[test]
	fn amount_to_msat() {
		assert_eq!(hrp_to_msat("2500u").unwrap(), 250_000_000);
		assert_eq!(hrp_to_msat("20m").unwrap(), 2_000_000_000);
		assert_eq!(hrp_to_msat("25m").unwrap(), 2_500_000_000);
		assert_eq!(hrp_to_msat("9678785340p").unwrap(), 967_878_534);
		assert_eq!(hrp_to_msat("1").unwrap(), 100_000_000_000);
		assert_eq!(hrp_to_msat("0").unwrap(), 0);
		assert_eq!(hrp_to_msat("10n").unwrap(), 1000);
	}

	#[test]
	fn amount_syntax_errors() {
		assert_eq!(hrp_to_msat("2500x"), Err(ParseError::InvalidAmount("2500x".to_owned())));
		assert_eq!(hrp_to_msat(""), Err(ParseError::InvalidAmount("".to_owned())));
		assert_eq!(hrp_to_msat("u"), Err(ParseError::InvalidAmount("u".to_owned())));
		assert_eq!(hrp_to_msat("2 5m"), Err(ParseError::InvalidAmount("2 5m".to_owned())));
		// leading zeroes are not minimal
		assert_eq!(hrp_to_msat("0100u"), Err(ParseError::InvalidAmount("0100u".to_owned())));
		assert_eq!(hrp_to_msat("00"), Err(ParseError::InvalidAmount("00".to_owned())));
		// sub-millisatoshi precision does not exist
		assert_eq!(hrp_to_msat("1p"), Err(ParseError::PicoNotMultipleOfTen));
		assert_eq!(hrp_to_msat("9678785345p"), Err(ParseError::PicoNotMultipleOfTen));
		// larger than the total bitcoin supply, and than u64 msat
		assert!(hrp_to_msat("999999999999999999999").is_err());
	}

	#[test]
	fn amount_to_hrp_shortest_form() {
		assert_eq!(msat_to_hrp(250_000_000), "2500u");
		assert_eq!(msat_to_hrp(2_000_000_000), "20m");
		assert_eq!(msat_to_hrp(100_000_000_000), "1000m");
		assert_eq!(msat_to_hrp(967_878_534), "9678785340p");
		assert_eq!(msat_to_hrp(1000), "10n");
		assert_eq!(msat_to_hrp(1), "10p");
		assert_eq!(msat_to_hrp(0), "0p");
	}

	#[test]
	fn sat_round_trip() {
		for sat in [1u64, 9, 250_000, 2_000_000, 21_000_000 * 100_000_000] {
			assert_eq!(hrp_to_sat(&sat_to_hrp(sat)).unwrap(), sat);
		}
		// 0.1 sat cannot be expressed in whole satoshis
		assert!(hrp_to_sat("1p").is_err());
		assert!(hrp_to_sat("10p").is_err());
		assert_eq!(msat_to_sat(250_000_000), Some(250_000));
		assert_eq!(msat_to_sat(967_878_534), None);
	}
}
