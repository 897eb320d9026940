use std::collections::BTreeMap;

/// A substitution value supplied to a template.
///
/// Template data is dynamically shaped: a tag can be fed a string, a
/// boolean for a conditional test, a sequence for an each/join expansion,
/// or a record for indexed access (`${alias[field]}`). This enum makes
/// every accepted shape explicit so block resolution is a pattern match
/// rather than runtime type sniffing.
#[derive(Debug, Clone, PartialEq, Default)]
#[non_exhaustive]
pub enum Value {
	/// An explicitly empty value. An each block whose source is `Null`
	/// expands to nothing, which is distinct from the source being absent
	/// from the mapping (an error).
	#[default]
	Null,
	/// A boolean, e.g. for `${if:flag}` truthy tests.
	Bool(bool),
	/// An integer number.
	Int(i64),
	/// A floating point number.
	Float(f64),
	/// A plain string.
	String(String),
	/// An ordered sequence of values, iterated by each blocks and glued
	/// together by join tags.
	Sequence(Vec<Value>),
	/// A keyed record, accessed through `${alias[field]}` style references.
	Record(BTreeMap<String, Value>),
}

impl Value {
	/// The string form substituted for a plain tag.
	///
	/// Scalars render as themselves, `Null` renders as the empty string,
	/// and compound values render as their JSON text.
	pub fn render(&self) -> String {
		match self {
			Value::Null => String::new(),
			Value::Bool(value) => value.to_string(),
			Value::Int(value) => value.to_string(),
			Value::Float(value) => value.to_string(),
			Value::String(value) => value.clone(),
			Value::Sequence(_) | Value::Record(_) => self.to_json().to_string(),
		}
	}

	/// Whether this value satisfies a bare-name conditional expression.
	/// Only boolean `true` qualifies; the string `"true"` does not.
	pub fn is_true(&self) -> bool {
		matches!(self, Value::Bool(true))
	}

	/// View this value as a sequence of elements. Non-sequence values are
	/// a one-element sequence of themselves; `Null` is empty.
	pub fn as_elements(&self) -> &[Value] {
		match self {
			Value::Sequence(items) => items,
			Value::Null => &[],
			other => std::slice::from_ref(other),
		}
	}

	/// Look up a field on a record value.
	pub fn field(&self, name: &str) -> Option<&Value> {
		match self {
			Value::Record(fields) => fields.get(name),
			_ => None,
		}
	}

	/// Render the elements of this value joined with the given glue.
	pub fn join_with(&self, glue: &str) -> String {
		self.as_elements()
			.iter()
			.map(Value::render)
			.collect::<Vec<_>>()
			.join(glue)
	}

	/// Convert to a [`serde_json::Value`]. Non-finite floats become JSON
	/// null since JSON has no representation for them.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(value) => serde_json::Value::Bool(*value),
			Value::Int(value) => serde_json::Value::Number((*value).into()),
			Value::Float(value) => {
				serde_json::Number::from_f64(*value)
					.map_or(serde_json::Value::Null, serde_json::Value::Number)
			}
			Value::String(value) => serde_json::Value::String(value.clone()),
			Value::Sequence(items) => {
				serde_json::Value::Array(items.iter().map(Value::to_json).collect())
			}
			Value::Record(fields) => {
				serde_json::Value::Object(
					fields
						.iter()
						.map(|(key, value)| (key.clone(), value.to_json()))
						.collect(),
				)
			}
		}
	}

	/// The serialized form substituted for a `${json:name}` tag. Scalars
	/// are wrapped in a one-element array before serializing.
	pub(crate) fn json_wrapped(&self) -> String {
		let json = match self {
			Value::Sequence(_) | Value::Record(_) => self.to_json(),
			scalar => serde_json::Value::Array(vec![scalar.to_json()]),
		};
		json.to_string()
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(i64::from(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::Sequence(items)
	}
}

impl<V> FromIterator<V> for Value
where
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
		Value::Sequence(iter.into_iter().map(Into::into).collect())
	}
}

impl From<serde_json::Value> for Value {
	fn from(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(value) => Value::Bool(value),
			serde_json::Value::Number(number) => {
				number.as_i64().map_or_else(
					|| Value::Float(number.as_f64().unwrap_or_default()),
					Value::Int,
				)
			}
			serde_json::Value::String(value) => Value::String(value),
			serde_json::Value::Array(items) => {
				Value::Sequence(items.into_iter().map(Into::into).collect())
			}
			serde_json::Value::Object(fields) => {
				Value::Record(
					fields
						.into_iter()
						.map(|(key, value)| (key, value.into()))
						.collect(),
				)
			}
		}
	}
}

/// The substitution mapping supplied to [`CodeTemplate::for_values`].
///
/// Keys are tag names. Historically callers supplied the full tag text
/// (`${name}`) as the key; that form is still accepted and normalized to
/// the bare name on insert.
///
/// [`CodeTemplate::for_values`]: crate::CodeTemplate::for_values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
	entries: BTreeMap<String, Value>,
}

impl ValueMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value under the given tag name. A `${name}`-wrapped key is
	/// unwrapped before storage.
	pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
		self.entries
			.insert(normalize_key(name.as_ref()), value.into());
	}

	/// Look up a value by bare tag name.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.entries.get(name)
	}

	/// Whether the mapping has an entry for the given bare tag name.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	/// Resolve a tag reference, including indexed references of the form
	/// `name[field]` into record values.
	pub fn resolve(&self, reference: &str) -> Option<&Value> {
		match reference.split_once('[') {
			Some((base, rest)) => {
				let field = rest.strip_suffix(']')?;
				self.entries.get(base.trim())?.field(field.trim())
			}
			None => self.entries.get(reference),
		}
	}

	/// A copy of this mapping with one extra binding, used to scope an
	/// each-block alias to the current element.
	pub(crate) fn with(&self, name: &str, value: Value) -> Self {
		let mut scoped = self.clone();
		scoped.insert(name, value);
		scoped
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterate over the normalized entries in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}
}

impl<K, V> FromIterator<(K, V)> for ValueMap
where
	K: AsRef<str>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut map = Self::new();
		for (key, value) in iter {
			map.insert(key, value);
		}
		map
	}
}

impl From<serde_json::Map<String, serde_json::Value>> for ValueMap {
	fn from(fields: serde_json::Map<String, serde_json::Value>) -> Self {
		fields.into_iter().map(|(key, value)| (key, Value::from(value))).collect()
	}
}

/// Strip the `${...}` wrapper accepted for backwards compatibility.
fn normalize_key(key: &str) -> String {
	key
		.strip_prefix("${")
		.and_then(|inner| inner.strip_suffix('}'))
		.unwrap_or(key)
		.to_string()
}
