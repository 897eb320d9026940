use crate::TemplateError;
use crate::TemplateResult;
use crate::block::Clause;
use crate::block::ConditionalClause;
use crate::block::EachBlock;
use crate::block::IfBlock;
use crate::block::each_placeholder;
use crate::block::if_placeholder;
use crate::expression::IfExpression;
use crate::scanner;
use crate::template::CodeTemplate;

/// Recursive line-oriented parser for code templates.
///
/// The parser walks the text line by line. A line opening a block starts
/// body collection; the matching close marker ends it, at which point the
/// collected body is parsed recursively into the clause's sub-template.
/// Each recognized block leaves a single placeholder in the residual
/// text, and the flattened residual is finally scanned for plain, join
/// and json tags.
///
/// Block ids are monotonic within one parse session (one top-level
/// [`parse`](CodeTemplateParser::parse) call), including every nested
/// fragment parsed during it.
#[derive(Debug, Default)]
pub struct CodeTemplateParser {
	next_if_id: usize,
	next_each_id: usize,
}

impl CodeTemplateParser {
	/// Parse template text into a [`CodeTemplate`].
	pub fn parse(code: &str) -> TemplateResult<CodeTemplate> {
		let mut parser = Self::default();
		let template = parser.parse_fragment(code)?;
		tracing::debug!(
			ifs = parser.next_if_id,
			eaches = parser.next_each_id,
			tags = template.tags().len(),
			"parsed template"
		);
		Ok(template)
	}

	fn parse_fragment(&mut self, code: &str) -> TemplateResult<CodeTemplate> {
		let mut template = CodeTemplate::default();
		let mut residual: Vec<String> = Vec::new();
		let mut collector: Option<BlockCollector> = None;

		for (index, line) in code.split('\n').enumerate() {
			let line_number = index + 1;

			let outcome = collector.as_mut().map(|active| active.feed(line));
			match outcome {
				Some(FeedOutcome::Consumed) => {}
				Some(FeedOutcome::Close) => {
					let Some(active) = collector.take() else {
						continue;
					};
					match active {
						BlockCollector::If(state) => {
							let placeholder_line = format!("{}{}", state.indent, if_placeholder(state.id));
							let block = state
								.finish(self)
								.map_err(|error| wrap_line(line_number, line, error))?;
							template.ifs.push(block);
							residual.push(placeholder_line);
						}
						BlockCollector::Each(state) => {
							let placeholder_line =
								format!("{}{}{}", state.indent, each_placeholder(state.id), state.rest);
							let block = state
								.finish(self)
								.map_err(|error| wrap_line(line_number, line, error))?;
							template.eaches.push(block);
							residual.push(placeholder_line);
						}
					}
				}
				None => {
					match classify_line(line) {
						Some(LineMarker::IfOpen { indent, expression }) => {
							self.next_if_id += 1;
							collector = Some(BlockCollector::If(IfCollector::open(
								self.next_if_id,
								indent,
								expression,
							)));
						}
						Some(LineMarker::EachOpen {
							indent,
							expression,
							rest,
						}) => {
							self.next_each_id += 1;
							let (name, alias) = split_each_expression(expression)
								.map_err(|error| wrap_line(line_number, line, error))?;
							collector = Some(BlockCollector::Each(EachCollector::open(
								self.next_each_id,
								indent,
								name,
								alias,
								rest,
							)));
						}
						// Stray branch and close markers outside any block are
						// kept as ordinary text, like any other unmatched line.
						_ => residual.push(line.to_string()),
					}
				}
			}
		}

		if let Some(active) = collector {
			return Err(active.unclosed_error());
		}

		let residual_text = residual.join("\n");
		let scan = scanner::scan(&residual_text);
		template.tags = scan.tags;
		template.joins = scan.joins;
		template.jsons = scan.jsons;
		template.code = residual_text;

		Ok(template)
	}

	/// Parse a conditional clause body. The body is parsed as-is and its
	/// residual text trimmed, since if clauses are re-indented wholesale at
	/// substitution time.
	fn parse_clause(&mut self, lines: &[String]) -> TemplateResult<Clause> {
		let mut template = self.parse_fragment(&lines.join("\n"))?;
		template.trim_code();
		Ok(Clause::new(template))
	}

	/// Parse an each body. The common leading indentation is stripped
	/// first so the body composes with the each tag's own column no matter
	/// where it was authored.
	fn parse_each_body(&mut self, lines: &[String]) -> TemplateResult<Clause> {
		let normalized = normalize_indentation(lines);
		Ok(Clause::new(self.parse_fragment(&normalized)?))
	}
}

/// A block marker recognized on a single line.
#[derive(Debug, PartialEq, Eq)]
enum LineMarker<'a> {
	IfOpen {
		indent: &'a str,
		expression: &'a str,
	},
	ElseIf {
		expression: &'a str,
	},
	Else,
	Fi,
	EachOpen {
		indent: &'a str,
		expression: &'a str,
		rest: &'a str,
	},
	Done,
}

/// Classify a line against the block marker grammar.
///
/// `${if:...}`, `${elseif:...}`, `${else}` and `${fi}` must be alone on
/// their line (trailing whitespace aside). `${each:...}` and `${done}`
/// match by prefix; text after an each marker is preserved on the
/// placeholder line.
fn classify_line(line: &str) -> Option<LineMarker<'_>> {
	let without_indent = line.trim_start_matches([' ', '\t']);
	let indent = &line[..line.len() - without_indent.len()];

	if let Some(after) = without_indent.strip_prefix("${if:") {
		let (expression, tail) = after.split_once('}')?;
		if !expression.is_empty() && tail.trim_end_matches(['\r', ' ', '\t']).is_empty() {
			return Some(LineMarker::IfOpen { indent, expression });
		}
		return None;
	}

	if let Some(after) = without_indent.strip_prefix("${elseif:") {
		let (expression, tail) = after.split_once('}')?;
		if !expression.is_empty() && tail.trim_end_matches(['\r', ' ', '\t']).is_empty() {
			return Some(LineMarker::ElseIf { expression });
		}
		return None;
	}

	if let Some(tail) = without_indent.strip_prefix("${else}") {
		if tail.trim_end_matches(['\r', ' ', '\t']).is_empty() {
			return Some(LineMarker::Else);
		}
		return None;
	}

	if let Some(tail) = without_indent.strip_prefix("${fi}") {
		if tail.trim_end_matches(['\r', ' ', '\t']).is_empty() {
			return Some(LineMarker::Fi);
		}
		return None;
	}

	if let Some(after) = without_indent.strip_prefix("${each:") {
		let (expression, rest) = after.split_once('}')?;
		if !expression.is_empty() {
			return Some(LineMarker::EachOpen {
				indent,
				expression,
				rest,
			});
		}
		return None;
	}

	if without_indent.strip_prefix("${done}").is_some() {
		return Some(LineMarker::Done);
	}

	None
}

/// Split an each expression into its source name and alias. The `as`
/// separator is matched case-insensitively.
fn split_each_expression(expression: &str) -> TemplateResult<(String, String)> {
	let lowered = expression.to_ascii_lowercase();
	let Some(position) = lowered.find(" as ") else {
		return Err(TemplateError::MalformedBlockExpression(
			expression.to_string(),
		));
	};

	let name = expression[..position].trim();
	let alias = expression[position + 4..].trim();
	if name.is_empty() || alias.is_empty() {
		return Err(TemplateError::MalformedBlockExpression(
			expression.to_string(),
		));
	}

	Ok((name.to_string(), alias.to_string()))
}

fn wrap_line(line: usize, text: &str, source: TemplateError) -> TemplateError {
	TemplateError::ParseLine {
		line,
		text: text.to_string(),
		source: Box::new(source),
	}
}

enum FeedOutcome {
	Consumed,
	Close,
}

enum BlockCollector {
	If(IfCollector),
	Each(EachCollector),
}

impl BlockCollector {
	fn feed(&mut self, line: &str) -> FeedOutcome {
		match self {
			BlockCollector::If(state) => state.feed(line),
			BlockCollector::Each(state) => state.feed(line),
		}
	}

	fn unclosed_error(&self) -> TemplateError {
		match self {
			BlockCollector::If(state) => {
				TemplateError::UnclosedBlock {
					open: state.open_marker.clone(),
					close: "${fi}".to_string(),
				}
			}
			BlockCollector::Each(state) => {
				TemplateError::UnclosedBlock {
					open: state.open_marker.clone(),
					close: "${done}".to_string(),
				}
			}
		}
	}
}

/// Collects the body of an if block until its matching `${fi}`.
///
/// Same-kind blocks opened inside the body bump `depth` so their close
/// and branch markers are accumulated as body text instead of acting on
/// this block.
struct IfCollector {
	id: usize,
	indent: String,
	open_marker: String,
	if_expression: IfExpression,
	if_lines: Vec<String>,
	later: Vec<BranchDraft>,
	depth: usize,
}

struct BranchDraft {
	/// `None` marks an else branch.
	expression: Option<IfExpression>,
	lines: Vec<String>,
}

impl IfCollector {
	fn open(id: usize, indent: &str, expression: &str) -> Self {
		Self {
			id,
			indent: indent.to_string(),
			open_marker: format!("${{if:{expression}}}"),
			if_expression: IfExpression::parse(expression),
			if_lines: Vec::new(),
			later: Vec::new(),
			depth: 0,
		}
	}

	fn feed(&mut self, line: &str) -> FeedOutcome {
		match classify_line(line) {
			Some(LineMarker::IfOpen { .. }) => {
				self.depth += 1;
				self.push_line(line);
			}
			Some(LineMarker::Fi) => {
				if self.depth == 0 {
					return FeedOutcome::Close;
				}
				self.depth -= 1;
				self.push_line(line);
			}
			Some(LineMarker::ElseIf { expression }) if self.depth == 0 => {
				self.later.push(BranchDraft {
					expression: Some(IfExpression::parse(expression)),
					lines: Vec::new(),
				});
			}
			Some(LineMarker::Else) if self.depth == 0 => {
				self.later.push(BranchDraft {
					expression: None,
					lines: Vec::new(),
				});
			}
			_ => self.push_line(line),
		}

		FeedOutcome::Consumed
	}

	fn push_line(&mut self, line: &str) {
		match self.later.last_mut() {
			Some(branch) => branch.lines.push(line.to_string()),
			None => self.if_lines.push(line.to_string()),
		}
	}

	fn finish(self, parser: &mut CodeTemplateParser) -> TemplateResult<IfBlock> {
		let if_clause = ConditionalClause {
			expression: self.if_expression,
			body: parser.parse_clause(&self.if_lines)?,
		};

		let mut elseif_clauses = Vec::new();
		let mut else_clause = None;
		for branch in self.later {
			let body = parser.parse_clause(&branch.lines)?;
			match branch.expression {
				Some(expression) => elseif_clauses.push(ConditionalClause { expression, body }),
				None => else_clause = Some(body),
			}
		}

		Ok(IfBlock::new(
			self.id,
			self.indent,
			if_clause,
			elseif_clauses,
			else_clause,
		))
	}
}

/// Collects the body of an each block until its matching `${done}`.
struct EachCollector {
	id: usize,
	indent: String,
	open_marker: String,
	name: String,
	alias: String,
	rest: String,
	lines: Vec<String>,
	depth: usize,
}

impl EachCollector {
	fn open(id: usize, indent: &str, name: String, alias: String, rest: &str) -> Self {
		Self {
			id,
			indent: indent.to_string(),
			open_marker: format!("${{each:{name} as {alias}}}"),
			name,
			alias,
			rest: rest.to_string(),
			lines: Vec::new(),
			depth: 0,
		}
	}

	fn feed(&mut self, line: &str) -> FeedOutcome {
		match classify_line(line) {
			Some(LineMarker::EachOpen { .. }) => {
				self.depth += 1;
				self.lines.push(line.to_string());
			}
			Some(LineMarker::Done) => {
				if self.depth == 0 {
					return FeedOutcome::Close;
				}
				self.depth -= 1;
				self.lines.push(line.to_string());
			}
			_ => self.lines.push(line.to_string()),
		}

		FeedOutcome::Consumed
	}

	fn finish(self, parser: &mut CodeTemplateParser) -> TemplateResult<EachBlock> {
		let body = parser.parse_each_body(&self.lines)?;
		Ok(EachBlock::new(self.id, self.indent, self.name, self.alias, body))
	}
}

/// Strip surrounding blank lines and the common leading indentation from
/// a collected each body.
fn normalize_indentation(lines: &[String]) -> String {
	let Some(start) = lines.iter().position(|line| !line.trim().is_empty()) else {
		return String::new();
	};
	let end = lines
		.iter()
		.rposition(|line| !line.trim().is_empty())
		.unwrap_or(start);
	let window = &lines[start..=end];

	let common = window
		.iter()
		.filter(|line| !line.trim().is_empty())
		.map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
		.min()
		.unwrap_or(0);

	window
		.iter()
		.map(|line| {
			if line.trim().is_empty() {
				String::new()
			} else {
				line[common..].to_string()
			}
		})
		.collect::<Vec<_>>()
		.join("\n")
}
