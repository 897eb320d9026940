use float_cmp::approx_eq;

use crate::value::Value;
use crate::value::ValueMap;

/// The comparison form of a conditional expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Comparison {
	/// A bare name: satisfied only when the value is boolean `true`.
	Truthy,
	/// `name=value`: loose equality against the value's string form.
	Equals,
	/// `name>value`: numeric greater-than when both sides parse as
	/// numbers, lexical string comparison otherwise.
	GreaterThan,
}

/// A parsed conditional expression from an `${if:...}` or `${elseif:...}`
/// marker.
///
/// The expression string is parsed once at construction. `=` takes
/// precedence over `>` when both characters are present, so `a=b>c`
/// compares `a` against the literal `b>c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfExpression {
	/// The name of the value the expression tests. May be an indexed
	/// reference such as `alias[field]`.
	pub name: String,
	/// How the named value is compared.
	pub comparison: Comparison,
	/// The right-hand side for `=` and `>` forms.
	pub comparand: Option<String>,
}

impl IfExpression {
	/// Parse an expression string. Unrecognized forms fall back to a bare
	/// truthy test of the whole (trimmed) string.
	pub fn parse(expression: &str) -> Self {
		if let Some((name, value)) = expression.split_once('=') {
			return Self {
				name: name.trim().to_string(),
				comparison: Comparison::Equals,
				comparand: Some(value.trim().to_string()),
			};
		}

		if let Some((name, value)) = expression.split_once('>') {
			return Self {
				name: name.trim().to_string(),
				comparison: Comparison::GreaterThan,
				comparand: Some(value.trim().to_string()),
			};
		}

		Self {
			name: expression.trim().to_string(),
			comparison: Comparison::Truthy,
			comparand: None,
		}
	}

	/// Evaluate the expression against a substitution mapping.
	///
	/// Fails closed: an absent name is never satisfied.
	pub fn is_satisfied_by(&self, values: &ValueMap) -> bool {
		let Some(value) = values.resolve(&self.name) else {
			return false;
		};

		let comparand = self.comparand.as_deref().unwrap_or_default();
		match self.comparison {
			Comparison::Truthy => value.is_true(),
			Comparison::Equals => loosely_equal(value, comparand),
			Comparison::GreaterThan => loosely_greater(value, comparand),
		}
	}
}

/// Loose equality between a value and a comparand string: numeric when
/// both sides parse as numbers, string comparison of the rendered form
/// otherwise.
fn loosely_equal(value: &Value, comparand: &str) -> bool {
	let rendered = value.render();

	if let (Ok(left), Ok(right)) = (rendered.parse::<f64>(), comparand.parse::<f64>()) {
		return approx_eq!(f64, left, right, ulps = 2);
	}

	rendered == comparand
}

/// Greater-than with the same numeric-first rule; non-numeric operands
/// fall back to lexical comparison of the rendered form.
fn loosely_greater(value: &Value, comparand: &str) -> bool {
	let rendered = value.render();

	if let (Ok(left), Ok(right)) = (rendered.parse::<f64>(), comparand.parse::<f64>()) {
		return left > right;
	}

	rendered.as_str() > comparand
}
