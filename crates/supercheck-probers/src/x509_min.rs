//! Minimal DER/ASN.1 reader over an already-negotiated leaf certificate.
//!
//! `TlsProber` only needs four fields out of a certificate —
//! `notBefore`/`notAfter`, the issuer/subject common name, the serial
//! number, and a fingerprint — so rather than pull in a full X.509 crate
//! this walks the handful of DER TLVs that lead to them.

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

const TAG_INTEGER: u8 = 0x02;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_SET: u8 = 0x31;
const TAG_OID: u8 = 0x06;
const TAG_UTC_TIME: u8 = 0x17;
const TAG_GENERALIZED_TIME: u8 = 0x18;
const CONTEXT_0_EXPLICIT: u8 = 0xA0;

/// Common Name OID `2.5.4.3`, DER-encoded as `55 04 03`.
const OID_COMMON_NAME: [u8; 3] = [0x55, 0x04, 0x03];

#[derive(Debug, Clone)]
pub struct CertSummary {
	pub valid_from: DateTime<Utc>,
	pub valid_to: DateTime<Utc>,
	pub issuer_cn: Option<String>,
	pub subject_cn: Option<String>,
	pub serial_number: String,
	pub fingerprint_sha256: String,
}

#[derive(Debug)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "certificate parse error: {}", self.0)
	}
}

impl std::error::Error for ParseError {}

/// One decoded TLV: its tag byte and content slice, plus the offset right
/// after it in the buffer it was read from.
struct Tlv<'a> {
	tag: u8,
	content: &'a [u8],
	next: usize,
}

fn read_tlv(buf: &[u8], pos: usize) -> Result<Tlv<'_>, ParseError> {
	if pos >= buf.len() {
		return Err(ParseError("unexpected end of buffer".into()));
	}
	let tag = buf[pos];
	let len_byte = *buf.get(pos + 1).ok_or_else(|| ParseError("truncated length".into()))?;

	let (len, header_len) = if len_byte & 0x80 == 0 {
		(len_byte as usize, 2)
	} else {
		let n_bytes = (len_byte & 0x7f) as usize;
		if n_bytes == 0 || n_bytes > 4 {
			return Err(ParseError("unsupported length encoding".into()));
		}
		let start = pos + 2;
		let end = start + n_bytes;
		let bytes = buf.get(start..end).ok_or_else(|| ParseError("truncated long-form length".into()))?;
		let mut len = 0usize;
		for b in bytes {
			len = (len << 8) | (*b as usize);
		}
		(len, 2 + n_bytes)
	};

	let content_start = pos + header_len;
	let content_end = content_start + len;
	let content = buf
		.get(content_start..content_end)
		.ok_or_else(|| ParseError("content runs past end of buffer".into()))?;

	Ok(Tlv { tag, content, next: content_end })
}

/// Iterates sibling TLVs inside a container's content bytes.
fn children(content: &[u8]) -> Vec<Tlv<'_>> {
	let mut out = Vec::new();
	let mut pos = 0;
	while pos < content.len() {
		match read_tlv(content, pos) {
			Ok(tlv) => {
				pos = tlv.next;
				out.push(tlv);
			}
			Err(_) => break,
		}
	}
	out
}

fn parse_time(tag: u8, content: &[u8]) -> Result<DateTime<Utc>, ParseError> {
	let s = std::str::from_utf8(content).map_err(|e| ParseError(e.to_string()))?;
	let s = s.trim_end_matches('Z');

	let (year, rest) = if tag == TAG_UTC_TIME {
		let (yy, rest) = s.split_at(2);
		let yy: i32 = yy.parse().map_err(|_| ParseError("bad UTCTime year".into()))?;
		(if yy < 50 { 2000 + yy } else { 1900 + yy }, rest)
	} else if tag == TAG_GENERALIZED_TIME {
		let (yyyy, rest) = s.split_at(4);
		(yyyy.parse().map_err(|_| ParseError("bad GeneralizedTime year".into()))?, rest)
	} else {
		return Err(ParseError("not a time value".into()));
	};

	let digits: Vec<u32> = rest
		.as_bytes()
		.chunks(2)
		.map(|c| std::str::from_utf8(c).ok().and_then(|s| s.parse().ok()).unwrap_or(0))
		.collect();
	let month = *digits.first().unwrap_or(&1);
	let day = *digits.get(1).unwrap_or(&1);
	let hour = *digits.get(2).unwrap_or(&0);
	let minute = *digits.get(3).unwrap_or(&0);
	let second = *digits.get(4).unwrap_or(&0);

	Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
		.single()
		.ok_or_else(|| ParseError("time fields out of range".into()))
}

/// Walks a `Name` (`SEQUENCE OF SET OF AttributeTypeAndValue`) looking for
/// the first `commonName` attribute's printable value.
fn extract_common_name(name_content: &[u8]) -> Option<String> {
	for rdn in children(name_content) {
		if rdn.tag != TAG_SET {
			continue;
		}
		for atv in children(rdn.content) {
			if atv.tag != TAG_SEQUENCE {
				continue;
			}
			let parts = children(atv.content);
			let oid = parts.first()?;
			if oid.tag != TAG_OID || oid.content != OID_COMMON_NAME {
				continue;
			}
			let value = parts.get(1)?;
			return std::str::from_utf8(value.content).ok().map(|s| s.to_string());
		}
	}
	None
}

fn to_hex(bytes: &[u8]) -> String {
	hex::encode(bytes)
}

/// Parses a DER-encoded leaf certificate (as returned by
/// `tokio-rustls`'s negotiated session) into the handful of fields
/// `TlsProber` reports.
pub fn parse_certificate(der: &[u8]) -> Result<CertSummary, ParseError> {
	let cert = read_tlv(der, 0)?;
	if cert.tag != TAG_SEQUENCE {
		return Err(ParseError("not a SEQUENCE at top level".into()));
	}

	let tbs = read_tlv(cert.content, 0)?;
	if tbs.tag != TAG_SEQUENCE {
		return Err(ParseError("tbsCertificate is not a SEQUENCE".into()));
	}

	let mut fields = children(tbs.content).into_iter();
	let mut next = fields.next().ok_or_else(|| ParseError("empty tbsCertificate".into()))?;

	// Optional `[0] EXPLICIT Version`.
	if next.tag == CONTEXT_0_EXPLICIT {
		next = fields.next().ok_or_else(|| ParseError("missing serialNumber".into()))?;
	}

	let serial = next;
	if serial.tag != TAG_INTEGER {
		return Err(ParseError("expected serialNumber INTEGER".into()));
	}
	let serial_number = to_hex(serial.content);

	let _signature_algorithm = fields.next().ok_or_else(|| ParseError("missing signature algorithm".into()))?;

	let issuer = fields.next().ok_or_else(|| ParseError("missing issuer".into()))?;
	let issuer_cn = extract_common_name(issuer.content);

	let validity = fields.next().ok_or_else(|| ParseError("missing validity".into()))?;
	if validity.tag != TAG_SEQUENCE {
		return Err(ParseError("validity is not a SEQUENCE".into()));
	}
	let mut validity_fields = children(validity.content).into_iter();
	let not_before = validity_fields.next().ok_or_else(|| ParseError("missing notBefore".into()))?;
	let not_after = validity_fields.next().ok_or_else(|| ParseError("missing notAfter".into()))?;
	let valid_from = parse_time(not_before.tag, not_before.content)?;
	let valid_to = parse_time(not_after.tag, not_after.content)?;

	let subject = fields.next().ok_or_else(|| ParseError("missing subject".into()))?;
	let subject_cn = extract_common_name(subject.content);

	let fingerprint_sha256 = to_hex(&Sha256::digest(der));

	Ok(CertSummary { valid_from, valid_to, issuer_cn, subject_cn, serial_number, fingerprint_sha256 })
}
