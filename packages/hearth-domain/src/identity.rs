use uuid::Uuid;

/// Namespace for deriving stable owner ids from free-form handles.
pub const OWNER_NAMESPACE: Uuid = Uuid::from_u128(0x8f3c_1d52_7a9e_4b06_9c21_55e0_c74d_2a18);

/// Maps a raw owner handle to a stable owner id.
///
/// A handle that already parses as a UUID is used as-is, so externally issued
/// ids survive round trips. Anything else is hashed into [`OWNER_NAMESPACE`],
/// which keeps repeated calls with the same handle on the same owner row.
pub fn resolve(raw: &str) -> Uuid {
	let trimmed = raw.trim();

	Uuid::parse_str(trimmed).unwrap_or_else(|_| Uuid::new_v5(&OWNER_NAMESPACE, trimmed.as_bytes()))
}
