//! A wrapper type that prevents accidental logging of sensitive values.
//!
//! `Secret<T>` implements neither `Display` nor a useful `Debug` — both print
//! a fixed redaction marker instead of the wrapped value. Reach the real
//! value through [`Secret::expose`] at the single call site that actually
//! needs it (an SMTP login, an HMAC key), never further upstream.

use std::fmt;

use zeroize::Zeroize;

/// Placeholder string substituted for a secret's real value in any rendered
/// output.
pub const REDACTED: &str = "[redacted]";

/// A value that must never appear in logs, error messages, or `Debug` output.
#[derive(Clone)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
	pub fn new(value: T) -> Self {
		Self(value)
	}

	/// Returns the wrapped value. Named distinctly from `Deref`/`as_ref` so
	/// every access site reads as a deliberate exposure in a diff.
	pub fn expose(&self) -> &T {
		&self.0
	}

	pub fn into_inner(self) -> T {
		self.0
	}
}

impl<T> fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Secret({REDACTED})")
	}
}

impl<T> fmt::Display for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{REDACTED}")
	}
}

impl<T> From<T> for Secret<T> {
	fn from(value: T) -> Self {
		Self::new(value)
	}
}

impl<T: Zeroize> Drop for Secret<T> {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for Secret<T> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.0.serialize(serializer)
	}
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Secret<T> {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret)
	}
}

/// A secret `String`, the common case (passwords, tokens, webhook signing
/// keys).
pub type SecretString = Secret<String>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_and_display_are_redacted() {
		let s = SecretString::new("hunter2".to_string());
		assert_eq!(format!("{s:?}"), "Secret([redacted])");
		assert_eq!(format!("{s}"), "[redacted]");
	}

	#[test]
	fn expose_returns_the_value() {
		let s = SecretString::new("hunter2".to_string());
		assert_eq!(s.expose(), "hunter2");
	}

	#[cfg(feature = "serde")]
	#[test]
	fn serializes_as_the_inner_value() {
		let s = SecretString::new("hunter2".to_string());
		let json = serde_json::to_string(&s).unwrap();
		assert_eq!(json, "\"hunter2\"");
	}

	proptest::proptest! {
		#[test]
		fn never_leaks_through_debug(value in ".*") {
			let s = SecretString::new(value.clone());
			let rendered = format!("{s:?}");
			if !value.is_empty() {
				proptest::prop_assert!(!rendered.contains(&value));
			}
		}
	}
}
