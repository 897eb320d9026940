use crate::TemplateResult;
use crate::block::EachBlock;
use crate::block::IfBlock;
use crate::scanner::decode_escapes;
use crate::value::ValueMap;

/// A `${join:name:glue}` substitution spec.
///
/// The glue is stored both as authored (for locating the tag in the
/// residual text) and decoded (`\n`, `\t` and `\\` escapes resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
	/// The name of the sequence value to join.
	pub name: String,
	/// The decoded glue inserted between elements.
	pub glue: String,
	pub(crate) raw_glue: String,
}

impl JoinSpec {
	pub(crate) fn new(name: &str, raw_glue: &str) -> Self {
		Self {
			name: name.to_string(),
			glue: decode_escapes(raw_glue),
			raw_glue: raw_glue.to_string(),
		}
	}

	/// The tag text as it appears in the template.
	pub(crate) fn marker(&self) -> String {
		format!("${{join:{}:{}}}", self.name, self.raw_glue)
	}
}

/// A parsed code template: the residual text with blocks reduced to
/// placeholders, plus everything the parser learned about it.
///
/// Templates are parsed once and are immutable afterwards;
/// [`for_values`](CodeTemplate::for_values) is pure and can be called any
/// number of times with different mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeTemplate {
	pub(crate) code: String,
	pub(crate) tags: Vec<String>,
	pub(crate) joins: Vec<JoinSpec>,
	pub(crate) jsons: Vec<String>,
	pub(crate) ifs: Vec<IfBlock>,
	pub(crate) eaches: Vec<EachBlock>,
}

impl CodeTemplate {
	/// The residual template text, with block placeholders in place of
	/// their original marker lines.
	pub fn code(&self) -> &str {
		&self.code
	}

	/// The distinct plain tag names, in first-appearance order.
	pub fn tags(&self) -> &[String] {
		&self.tags
	}

	/// The join specs found in the template.
	pub fn joins(&self) -> &[JoinSpec] {
		&self.joins
	}

	/// The `${json:name}` tag names found in the template.
	pub fn jsons(&self) -> &[String] {
		&self.jsons
	}

	/// The if blocks owned by this template level.
	pub fn ifs(&self) -> &[IfBlock] {
		&self.ifs
	}

	/// The each blocks owned by this template level.
	pub fn eaches(&self) -> &[EachBlock] {
		&self.eaches
	}

	pub(crate) fn trim_code(&mut self) {
		self.code = self.code.trim().to_string();
	}

	/// Substitute the given values into the template and return the
	/// resolved text.
	///
	/// Resolution order: if blocks, then each blocks, then joins, json
	/// tags and plain tags. Plain tags with no matching mapping entry are
	/// left verbatim so the output can go through another substitution
	/// pass later.
	pub fn for_values(&self, values: &ValueMap) -> TemplateResult<String> {
		let mut code = self.code.clone();

		for block in &self.ifs {
			let replacement = block.for_values(values)?;
			code = code.replace(&block.placeholder(), &replacement);
		}

		for block in &self.eaches {
			let replacement = block.for_values(values)?;
			code = code.replace(&block.placeholder(), &replacement);
		}

		for join in &self.joins {
			if let Some(value) = values.resolve(&join.name) {
				code = code.replace(&join.marker(), &value.join_with(&join.glue));
			}
		}

		for name in &self.jsons {
			if let Some(value) = values.resolve(name) {
				code = code.replace(&format!("${{json:{name}}}"), &value.json_wrapped());
			}
		}

		for tag in &self.tags {
			if let Some(value) = values.resolve(tag) {
				code = code.replace(&format!("${{{tag}}}"), &value.render());
			}
		}

		Ok(code)
	}
}
