use std::path::Path;

use crate::Value;
use crate::ValueMap;

/// A template exercising only plain substitutions, ported from the
/// original loader test corpus.
pub const SIMPLE_TEMPLATE: &str = "This is a sample template with simple substitutions.\n\nThis \
                                   line contains an inline substitution: ${sub1}\nThis line \
                                   contains two substitutions: ${sub2} ${sub3}\nThe following \
                                   line contains a value on its own\n${sub1}\n";

pub const SIMPLE_EXPECTED: &str = "This is a sample template with simple substitutions.\n\nThis \
                                   line contains an inline substitution: val1\nThis line \
                                   contains two substitutions: val2 val3\nThe following line \
                                   contains a value on its own\nval1\n";

/// A template with one indented each block.
pub const EACH_TEMPLATE: &str = "This is a sample template that contains an each \
                                 substitution.\n\n  ${each:eached as e}\n    ${e}\n  ${done}\n";

pub const EACH_EXPECTED: &str = "This is a sample template that contains an each \
                                 substitution.\n\n  I am line #1\n  I am line #2\n  I am line \
                                 #3\n";

/// An each block over records, with indexed alias references and an
/// uppercase `AS` separator.
pub const INDEXED_EACH_TEMPLATE: &str = "This is a sample template that contains an each \
                                         substitution.\n\n  ${each:indexed AS indexable}\n    \
                                         ${indexable[id]}: ${indexable[val]}\n  ${done}\n";

pub const INDEXED_EACH_EXPECTED: &str = "This is a sample template that contains an each \
                                         substitution.\n\n  1: I am line #1\n  2: I am line \
                                         #2\n  3: I am line #3\n";

/// An if block nested inside an each body, testing element-scoped
/// conditions.
pub const NESTED_EACH_IF_TEMPLATE: &str =
	"${each:props as prop}\n  ${prop[id]}\n  ${if:prop[cond1]}\n  cond1 is set\n  ${fi}\n${done}";

/// An each block nested inside an if clause, both indented.
pub const NESTED_IF_EACH_TEMPLATE: &str =
	"  ${if:flag}\n    ${each:items as x}\n      - ${x}\n    ${done}\n  ${fi}";

pub fn values<const N: usize>(entries: [(&str, Value); N]) -> ValueMap {
	entries.into_iter().collect()
}

pub fn eached_lines() -> Value {
	Value::from_iter(["I am line #1", "I am line #2", "I am line #3"])
}

pub fn indexed_records() -> Value {
	Value::Sequence(
		[(1, "I am line #1"), (2, "I am line #2"), (3, "I am line #3")]
			.into_iter()
			.map(|(id, val)| {
				Value::Record(
					[
						("id".to_string(), Value::Int(id)),
						("val".to_string(), Value::from(val)),
					]
					.into_iter()
					.collect(),
				)
			})
			.collect(),
	)
}

pub fn write_template(dir: &Path, file_name: &str, contents: &str) -> std::io::Result<()> {
	std::fs::write(dir.join(file_name), contents)
}
