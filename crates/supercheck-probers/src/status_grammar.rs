//! Parses the `expectedStatusCodes` grammar from §4.8: comma-separated
//! tokens, each an exact integer, a range `A-B`, or a class pattern `Nxx`.

/// Returns `true` iff `code` matches any comma-separated token in `grammar`.
/// An empty or all-whitespace grammar falls back to `200-299`.
pub fn matches(grammar: &str, code: u16) -> bool {
	let grammar = grammar.trim();
	let grammar = if grammar.is_empty() { "200-299" } else { grammar };

	grammar.split(',').map(str::trim).filter(|t| !t.is_empty()).any(|token| token_matches(token, code))
}

fn token_matches(token: &str, code: u16) -> bool {
	if let Some((lo, hi)) = token.split_once('-') {
		if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<u16>(), hi.trim().parse::<u16>()) {
			return (lo..=hi).contains(&code);
		}
		return false;
	}

	if token.len() == 3 && token.to_ascii_lowercase().ends_with("xx") {
		if let Some(class) = token.chars().next().and_then(|c| c.to_digit(10)) {
			return (code / 100) as u32 == class;
		}
		return false;
	}

	token.parse::<u16>().map(|n| n == code).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_grammar_defaults_to_200_299() {
		assert!(matches("", 200));
		assert!(matches("", 299));
		assert!(!matches("", 300));
	}

	#[test]
	fn exact_code_matches() {
		assert!(matches("404", 404));
		assert!(!matches("404", 403));
	}

	#[test]
	fn range_matches_inclusive() {
		assert!(matches("200-299", 200));
		assert!(matches("200-299", 299));
		assert!(!matches("200-299", 300));
	}

	#[test]
	fn class_pattern_matches_hundred_block() {
		assert!(matches("2xx", 200));
		assert!(matches("2xx", 250));
		assert!(!matches("2xx", 300));
	}

	#[test]
	fn comma_separated_tokens_combine() {
		assert!(matches("200-299,301", 301));
		assert!(matches("200-299,301", 250));
		assert!(!matches("200-299,301", 404));
	}

	#[test]
	fn whitespace_around_tokens_is_ignored() {
		assert!(matches(" 200 , 301 ", 301));
	}
}
