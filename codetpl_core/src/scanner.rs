use logos::Logos;

use crate::template::JoinSpec;

/// Raw markers produced by logos for flat scanning of residual template
/// text. Everything between markers is ordinary text and is skipped.
#[derive(Logos, Debug, PartialEq)]
enum RawMarker {
	#[regex(r"\$\{[^}\n]+\}")]
	Tag,
}

/// The distinct substitution tags found in a fragment of template text.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ScanResult {
	/// Plain `${name}` tags, in first-appearance order.
	pub tags: Vec<String>,
	/// `${join:name:glue}` specs.
	pub joins: Vec<JoinSpec>,
	/// `${json:name}` tag names.
	pub jsons: Vec<String>,
}

/// Scan a fragment of text for substitution tags.
///
/// Block markers (`${if:...}`, `${each:...}` and their closers) are the
/// parser's business and are never reported as tags; a tag appearing more
/// than once is reported once.
pub(crate) fn scan(text: &str) -> ScanResult {
	let mut result = ScanResult::default();

	for (token, span) in RawMarker::lexer(text).spanned() {
		let Ok(RawMarker::Tag) = token else {
			continue;
		};

		let raw = &text[span];
		let content = &raw[2..raw.len() - 1];

		if let Some(rest) = content.strip_prefix("join:") {
			// A join without a glue part matches nothing and is dropped.
			if let Some((name, glue)) = rest.split_once(':') {
				let spec = JoinSpec::new(name, glue);
				if !result.joins.contains(&spec) {
					result.joins.push(spec);
				}
			}
			continue;
		}

		if let Some(name) = content.strip_prefix("json:") {
			if !result.jsons.iter().any(|existing| existing == name) {
				result.jsons.push(name.to_string());
			}
			continue;
		}

		if is_block_marker(content) {
			continue;
		}

		if !result.tags.iter().any(|existing| existing == content) {
			result.tags.push(content.to_string());
		}
	}

	result
}

fn is_block_marker(content: &str) -> bool {
	content.starts_with("if:")
		|| content.starts_with("elseif:")
		|| content.starts_with("each:")
		|| content == "else"
		|| content == "fi"
		|| content == "done"
}

/// Decode the escape sequences allowed in join glue. Unknown escapes are
/// kept verbatim.
pub(crate) fn decode_escapes(raw: &str) -> String {
	let mut decoded = String::with_capacity(raw.len());
	let mut chars = raw.chars();

	while let Some(ch) = chars.next() {
		if ch != '\\' {
			decoded.push(ch);
			continue;
		}

		match chars.next() {
			Some('n') => decoded.push('\n'),
			Some('t') => decoded.push('\t'),
			Some('\\') => decoded.push('\\'),
			Some(other) => {
				decoded.push('\\');
				decoded.push(other);
			}
			None => decoded.push('\\'),
		}
	}

	decoded
}
