use crate::TemplateError;
use crate::TemplateResult;
use crate::expression::IfExpression;
use crate::template::CodeTemplate;
use crate::value::Value;
use crate::value::ValueMap;

/// Control characters bracketing block placeholders in residual template
/// text. Authored template text cannot contain them, so a placeholder can
/// never collide with a literal `${ifN}`-style tag someone typed.
pub(crate) const PLACEHOLDER_OPEN: char = '\u{1}';
pub(crate) const PLACEHOLDER_CLOSE: char = '\u{2}';

pub(crate) fn if_placeholder(id: usize) -> String {
	format!("{PLACEHOLDER_OPEN}if{id}{PLACEHOLDER_CLOSE}")
}

pub(crate) fn each_placeholder(id: usize) -> String {
	format!("{PLACEHOLDER_OPEN}each{id}{PLACEHOLDER_CLOSE}")
}

/// The literal body of one branch of a block.
///
/// Bodies are parsed at template-parse time, so nested blocks and tags
/// inside a clause are resolved through the clause's own sub-template and
/// substitution never re-parses text.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
	template: CodeTemplate,
}

impl Clause {
	pub(crate) fn new(template: CodeTemplate) -> Self {
		Self { template }
	}

	/// The stored body text, with nested blocks reduced to placeholders.
	pub fn code(&self) -> &str {
		self.template.code()
	}

	pub(crate) fn resolve(&self, values: &ValueMap) -> TemplateResult<String> {
		self.template.for_values(values)
	}
}

/// One conditional branch of an [`IfBlock`]: an expression and the body
/// emitted when it is satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalClause {
	pub expression: IfExpression,
	pub body: Clause,
}

/// An `${if:expr}` ... `${elseif:expr}` ... `${else}` ... `${fi}` block.
///
/// Exactly one clause (or none) is emitted per substitution call: the if
/// clause when its expression is satisfied, otherwise the first satisfied
/// elseif in declaration order, otherwise the else clause when present.
#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
	id: usize,
	indent: String,
	if_clause: ConditionalClause,
	elseif_clauses: Vec<ConditionalClause>,
	else_clause: Option<Clause>,
}

impl IfBlock {
	pub(crate) fn new(
		id: usize,
		indent: String,
		if_clause: ConditionalClause,
		elseif_clauses: Vec<ConditionalClause>,
		else_clause: Option<Clause>,
	) -> Self {
		Self {
			id,
			indent,
			if_clause,
			elseif_clauses,
			else_clause,
		}
	}

	/// The block id, unique within one parse session.
	pub fn id(&self) -> usize {
		self.id
	}

	pub(crate) fn placeholder(&self) -> String {
		if_placeholder(self.id)
	}

	/// The text substituted for this block's placeholder under the given
	/// values: the first satisfied clause's body, re-indented to the
	/// block's authored column, or the empty string when nothing matches.
	pub fn for_values(&self, values: &ValueMap) -> TemplateResult<String> {
		if self.if_clause.expression.is_satisfied_by(values) {
			return Ok(reindent(&self.if_clause.body.resolve(values)?, &self.indent));
		}

		for clause in &self.elseif_clauses {
			if clause.expression.is_satisfied_by(values) {
				return Ok(reindent(&clause.body.resolve(values)?, &self.indent));
			}
		}

		if let Some(clause) = &self.else_clause {
			return Ok(reindent(&clause.resolve(values)?, &self.indent));
		}

		Ok(String::new())
	}
}

/// An `${each:name as alias}` ... `${done}` block.
///
/// The named value is expanded element by element, with the alias bound
/// to the current element while the body resolves. A missing source name
/// is an error; a `Null` source expands to nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct EachBlock {
	id: usize,
	indent: String,
	name: String,
	alias: String,
	body: Clause,
}

impl EachBlock {
	pub(crate) fn new(id: usize, indent: String, name: String, alias: String, body: Clause) -> Self {
		Self {
			id,
			indent,
			name,
			alias,
			body,
		}
	}

	/// The block id, unique within one parse session.
	pub fn id(&self) -> usize {
		self.id
	}

	/// The name of the substitution value this block iterates.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The local name bound to each element inside the body.
	pub fn alias(&self) -> &str {
		&self.alias
	}

	pub(crate) fn placeholder(&self) -> String {
		each_placeholder(self.id)
	}

	/// The text substituted for this block's placeholder under the given
	/// values.
	pub fn for_values(&self, values: &ValueMap) -> TemplateResult<String> {
		let Some(value) = values.resolve(&self.name) else {
			return Err(TemplateError::MissingSubstitutionValue(self.name.clone()));
		};

		if matches!(value, Value::Null) {
			return Ok(String::new());
		}

		let elements = value.as_elements().to_vec();
		let mut parts = Vec::with_capacity(elements.len());
		for element in elements {
			let scoped = values.with(&self.alias, element);
			parts.push(self.body.resolve(&scoped)?);
		}

		Ok(indent_following_lines(&parts.join("\n"), &self.indent))
	}
}

/// Re-indent a resolved clause body to the block's authored column: trim
/// it, then reset the leading whitespace of every following line to the
/// block's indentation prefix.
pub(crate) fn reindent(code: &str, indent: &str) -> String {
	let trimmed = code.trim();
	let mut lines = trimmed.lines();
	let mut out = String::from(lines.next().unwrap_or_default());

	for line in lines {
		out.push('\n');
		out.push_str(indent);
		out.push_str(line.trim_start_matches([' ', '\t']));
	}

	out
}

/// Prepend `indent` after every interior newline. The first line inherits
/// the indentation of the residual line holding the placeholder.
pub(crate) fn indent_following_lines(code: &str, indent: &str) -> String {
	if indent.is_empty() {
		return code.to_string();
	}

	code.replace('\n', &format!("\n{indent}"))
}
