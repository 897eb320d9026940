use std::sync::Arc;

use rstest::rstest;
use similar_asserts::assert_eq;

use super::__fixtures::*;
use super::*;
use crate::scanner;

// --- Plain substitution ---

#[test]
fn scenario_plain_substitution() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("Hello ${name}!")?;
	let resolved = template.for_values(&values([("name", Value::from("World"))]))?;
	assert_eq!(resolved, "Hello World!");

	Ok(())
}

#[test]
fn plain_substitution_is_idempotent() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(SIMPLE_TEMPLATE)?;
	let mapping = values([
		("sub1", Value::from("val1")),
		("sub2", Value::from("val2")),
		("sub3", Value::from("val3")),
	]);

	let first = template.for_values(&mapping)?;
	let second = template.for_values(&mapping)?;
	assert_eq!(first, SIMPLE_EXPECTED);
	assert_eq!(first, second);

	Ok(())
}

#[test]
fn wrapped_mapping_keys_are_accepted() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("Hello ${name}!")?;
	let resolved = template.for_values(&values([("${name}", Value::from("World"))]))?;
	assert_eq!(resolved, "Hello World!");

	Ok(())
}

#[test]
fn unresolved_tags_are_left_verbatim() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("Hello ${name}, meet ${other}.")?;
	let resolved = template.for_values(&values([("name", Value::from("World"))]))?;
	assert_eq!(resolved, "Hello World, meet ${other}.");

	Ok(())
}

#[test]
fn repeated_tag_is_recorded_once() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${a} ${join:b:,} ${json:c} ${a} ${b}")?;
	assert_eq!(template.tags(), ["a", "b"]);
	assert_eq!(template.joins().len(), 1);
	assert_eq!(template.joins()[0].name, "b");
	assert_eq!(template.jsons(), ["c"]);

	Ok(())
}

// --- Join substitution ---

#[test]
fn scenario_join() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${join:tags:,}")?;
	let resolved = template.for_values(&values([(
		"tags",
		Value::from_iter(["x", "y", "z"]),
	)]))?;
	assert_eq!(resolved, "x,y,z");

	Ok(())
}

#[test]
fn join_treats_scalar_as_single_element() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${join:tags:,}")?;
	let resolved = template.for_values(&values([("tags", Value::from("solo"))]))?;
	assert_eq!(resolved, "solo");

	Ok(())
}

#[rstest]
#[case::newline(r"${join:lines:\n}", "a\nb")]
#[case::tab(r"${join:lines:\t}", "a\tb")]
#[case::with_space("${join:lines:, }", "a, b")]
fn join_glue_escapes(#[case] template: &str, #[case] expected: &str) -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(template)?;
	let resolved = template.for_values(&values([("lines", Value::from_iter(["a", "b"]))]))?;
	assert_eq!(resolved, expected);

	Ok(())
}

// --- Json substitution ---

#[test]
fn json_wraps_scalars_in_a_sequence() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("items: ${json:items}")?;
	let resolved = template.for_values(&values([("items", Value::from("a"))]))?;
	assert_eq!(resolved, r#"items: ["a"]"#);

	Ok(())
}

#[test]
fn json_serializes_sequences_as_is() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${json:items}")?;
	let resolved = template.for_values(&values([(
		"items",
		Value::from_iter([Value::Int(1), Value::Int(2)]),
	)]))?;
	assert_eq!(resolved, "[1,2]");

	Ok(())
}

#[test]
fn json_serializes_records_as_is() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${json:cfg}")?;
	let resolved = template.for_values(&values([(
		"cfg",
		Value::Record([("k".to_string(), Value::from("v"))].into_iter().collect()),
	)]))?;
	assert_eq!(resolved, r#"{"k":"v"}"#);

	Ok(())
}

// --- If blocks ---

#[rstest]
#[case::if_branch(true, "yes")]
#[case::else_branch(false, "no")]
fn scenario_boolean_if(#[case] flag: bool, #[case] expected: &str) -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${if:flag}\n  yes\n${else}\n  no\n${fi}")?;
	let resolved = template.for_values(&values([("flag", Value::Bool(flag))]))?;
	assert_eq!(resolved, expected);

	Ok(())
}

#[rstest]
#[case::first(1, "one")]
#[case::second(2, "two")]
#[case::fallback(9, "fallback")]
fn if_resolves_exactly_one_branch(
	#[case] level: i64,
	#[case] expected: &str,
) -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(
		"${if:level=1}\none\n${elseif:level=2}\ntwo\n${else}\nfallback\n${fi}",
	)?;
	let resolved = template.for_values(&values([("level", Value::Int(level))]))?;
	assert_eq!(resolved, expected);

	Ok(())
}

#[test]
fn if_without_else_resolves_to_empty() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${if:flag}\nyes\n${fi}")?;
	let resolved = template.for_values(&ValueMap::new())?;
	assert_eq!(resolved, "");

	Ok(())
}

#[test]
fn string_true_does_not_satisfy_a_truthy_test() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${if:flag}\nyes\n${fi}")?;
	let resolved = template.for_values(&values([("flag", Value::from("true"))]))?;
	assert_eq!(resolved, "");

	Ok(())
}

#[test]
fn if_body_lines_are_reindented_to_the_marker_column() -> TemplateResult<()> {
	let template =
		CodeTemplateParser::parse("  ${if:flag}\n    line1\n      line2\n  ${fi}")?;
	let resolved = template.for_values(&values([("flag", Value::Bool(true))]))?;
	assert_eq!(resolved, "  line1\n  line2");

	Ok(())
}

#[test]
fn nested_if_blocks_close_independently() -> TemplateResult<()> {
	let template =
		CodeTemplateParser::parse("${if:outer}\n${if:inner}\nboth\n${fi}\nafter\n${fi}")?;

	let resolved = template.for_values(&values([
		("outer", Value::Bool(true)),
		("inner", Value::Bool(true)),
	]))?;
	assert_eq!(resolved, "both\nafter");

	let resolved = template.for_values(&values([("outer", Value::Bool(true))]))?;
	assert_eq!(resolved, "after");

	Ok(())
}

#[test]
fn if_blocks_leave_top_level_tags_untouched() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${if:flag}\nx ${name}\n${fi}")?;
	assert!(template.tags().is_empty());
	assert_eq!(template.ifs().len(), 1);

	Ok(())
}

// --- Each blocks ---

#[test]
fn scenario_each() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${each:items as x}\n  - ${x}\n${done}")?;
	let resolved = template.for_values(&values([(
		"items",
		Value::from_iter(["a", "b", "c"]),
	)]))?;
	assert_eq!(resolved, "- a\n- b\n- c");

	Ok(())
}

#[test]
fn each_preserves_marker_indentation() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(EACH_TEMPLATE)?;
	let resolved = template.for_values(&values([("eached", eached_lines())]))?;
	assert_eq!(resolved, EACH_EXPECTED);

	Ok(())
}

#[test]
fn each_null_source_resolves_to_empty() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${each:items as x}\n- ${x}\n${done}")?;
	let resolved = template.for_values(&values([("items", Value::Null)]))?;
	assert_eq!(resolved, "");

	Ok(())
}

#[test]
fn each_absent_source_is_an_error() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${each:items as x}\n- ${x}\n${done}")?;
	let error = template.for_values(&ValueMap::new()).unwrap_err();
	assert!(matches!(
		error,
		TemplateError::MissingSubstitutionValue(name) if name == "items"
	));

	Ok(())
}

#[test]
fn each_treats_scalar_as_single_element() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${each:items as x}\n- ${x}\n${done}")?;
	let resolved = template.for_values(&values([("items", Value::from("only"))]))?;
	assert_eq!(resolved, "- only");

	Ok(())
}

#[test]
fn each_resolves_indexed_references() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(INDEXED_EACH_TEMPLATE)?;
	let resolved = template.for_values(&values([("indexed", indexed_records())]))?;
	assert_eq!(resolved, INDEXED_EACH_EXPECTED);

	Ok(())
}

#[test]
fn each_body_keeps_relative_indentation() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse("${each:items as x}\n  name: ${x}\n    deep\n${done}")?;
	let resolved = template.for_values(&values([("items", Value::from("a"))]))?;
	assert_eq!(resolved, "name: a\n  deep");

	Ok(())
}

// --- Nested blocks ---

#[test]
fn if_inside_each_tests_element_fields() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(NESTED_EACH_IF_TEMPLATE)?;

	let props = Value::Sequence(vec![
		Value::Record(
			[
				("id".to_string(), Value::from("one")),
				("cond1".to_string(), Value::Bool(true)),
			]
			.into_iter()
			.collect(),
		),
		Value::Record([("id".to_string(), Value::from("two"))].into_iter().collect()),
	]);

	let resolved = template.for_values(&values([("props", props)]))?;
	assert_eq!(resolved, "one\ncond1 is set\ntwo\n");

	Ok(())
}

#[test]
fn each_inside_if_reindents_to_the_if_column() -> TemplateResult<()> {
	let template = CodeTemplateParser::parse(NESTED_IF_EACH_TEMPLATE)?;
	let resolved = template.for_values(&values([
		("flag", Value::Bool(true)),
		("items", Value::from_iter(["a", "b"])),
	]))?;
	assert_eq!(resolved, "  - a\n  - b");

	Ok(())
}

// --- Parse errors ---

#[test]
fn unclosed_if_block_fails_to_parse() {
	let error = CodeTemplateParser::parse("${if:x}\nbody").unwrap_err();
	assert!(matches!(
		error,
		TemplateError::UnclosedBlock { ref open, ref close }
			if open == "${if:x}" && close == "${fi}"
	));
}

#[test]
fn unclosed_each_block_fails_to_parse() {
	let error = CodeTemplateParser::parse("${each:xs as x}\nbody").unwrap_err();
	assert!(matches!(
		error,
		TemplateError::UnclosedBlock { ref close, .. } if close == "${done}"
	));
}

#[test]
fn malformed_each_expression_reports_the_line() {
	let error = CodeTemplateParser::parse("line one\n\n${each:nope}\n${done}").unwrap_err();
	let TemplateError::ParseLine { line, text, source } = error else {
		panic!("expected a ParseLine error");
	};
	assert_eq!(line, 3);
	assert_eq!(text, "${each:nope}");
	assert!(matches!(
		*source,
		TemplateError::MalformedBlockExpression(expression) if expression == "nope"
	));
}

// --- Expressions ---

#[rstest]
#[case::bare("flag", Comparison::Truthy, None)]
#[case::equals("name=value", Comparison::Equals, Some("value"))]
#[case::equals_trimmed(" name = value ", Comparison::Equals, Some("value"))]
#[case::equals_wins_over_greater("a=b>c", Comparison::Equals, Some("b>c"))]
#[case::greater("n>5", Comparison::GreaterThan, Some("5"))]
fn expression_parsing(
	#[case] expression: &str,
	#[case] comparison: Comparison,
	#[case] comparand: Option<&str>,
) {
	let parsed = IfExpression::parse(expression);
	assert_eq!(parsed.comparison, comparison);
	assert_eq!(parsed.comparand.as_deref(), comparand);
}

#[rstest]
#[case::truthy_bool("flag", values([("flag", Value::Bool(true))]), true)]
#[case::truthy_false("flag", values([("flag", Value::Bool(false))]), false)]
#[case::truthy_string("flag", values([("flag", Value::from("true"))]), false)]
#[case::absent_fails_closed("flag", ValueMap::new(), false)]
#[case::equals_string("s=abc", values([("s", Value::from("abc"))]), true)]
#[case::equals_numeric("n=5.0", values([("n", Value::Int(5))]), true)]
#[case::equals_bool("b=true", values([("b", Value::Bool(true))]), true)]
#[case::equals_mismatch("s=abc", values([("s", Value::from("abcd"))]), false)]
#[case::greater_numeric("n>9", values([("n", Value::Int(10))]), true)]
#[case::greater_numeric_equal("n>10", values([("n", Value::Int(10))]), false)]
#[case::greater_prefers_numeric("v>10", values([("v", Value::from("2"))]), false)]
#[case::greater_lexical("s>alpha", values([("s", Value::from("beta"))]), true)]
#[case::indexed_reference(
	"rec[flag]",
	values([("rec", Value::Record([("flag".to_string(), Value::Bool(true))].into_iter().collect()))]),
	true
)]
fn expression_satisfaction(
	#[case] expression: &str,
	#[case] mapping: ValueMap,
	#[case] expected: bool,
) {
	let parsed = IfExpression::parse(expression);
	assert_eq!(parsed.is_satisfied_by(&mapping), expected);
}

// --- Scanner ---

#[test]
fn scan_classifies_tag_kinds() {
	let result = scanner::scan("${a} ${join:b:, } ${json:c} ${a}");
	assert_eq!(result.tags, ["a"]);
	assert_eq!(result.joins.len(), 1);
	assert_eq!(result.joins[0].name, "b");
	assert_eq!(result.joins[0].glue, ", ");
	assert_eq!(result.jsons, ["c"]);
}

#[test]
fn scan_skips_block_markers() {
	let result = scanner::scan("${if:x} ${each:y as z} ${elseif:w} ${else} ${fi} ${done}");
	assert!(result.tags.is_empty());
	assert!(result.joins.is_empty());
	assert!(result.jsons.is_empty());
}

#[test]
fn scan_drops_malformed_joins() {
	let result = scanner::scan("${join:noglue}");
	assert!(result.tags.is_empty());
	assert!(result.joins.is_empty());
}

#[rstest]
#[case::newline(r"a\nb", "a\nb")]
#[case::tab(r"a\tb", "a\tb")]
#[case::backslash(r"a\\b", r"a\b")]
#[case::unknown_kept(r"a\xb", r"a\xb")]
#[case::trailing(r"a\", r"a\")]
fn glue_escape_decoding(#[case] raw: &str, #[case] expected: &str) {
	assert_eq!(scanner::decode_escapes(raw), expected);
}

// --- Values ---

#[test]
fn value_render_forms() {
	assert_eq!(Value::Null.render(), "");
	assert_eq!(Value::Bool(true).render(), "true");
	assert_eq!(Value::Int(3).render(), "3");
	assert_eq!(Value::Float(2.5).render(), "2.5");
	assert_eq!(Value::from("text").render(), "text");
	assert_eq!(Value::from_iter(["a", "b"]).render(), r#"["a","b"]"#);
}

#[test]
fn value_elements_coercion() {
	assert_eq!(Value::Null.as_elements().len(), 0);
	assert_eq!(Value::from("x").as_elements().len(), 1);
	assert_eq!(Value::from_iter(["a", "b"]).as_elements().len(), 2);
}

#[test]
fn value_map_resolves_indexed_references() {
	let mapping = values([(
		"rec",
		Value::Record([("field".to_string(), Value::from("v"))].into_iter().collect()),
	)]);
	assert_eq!(mapping.resolve("rec[field]"), Some(&Value::from("v")));
	assert_eq!(mapping.resolve("rec[missing]"), None);
	assert_eq!(mapping.resolve("other[field]"), None);
}

#[test]
fn value_from_json() {
	let json = serde_json::json!({
		"name": "a",
		"count": 2,
		"flag": true,
		"items": ["x", "y"],
		"nothing": null,
	});
	let value = Value::from(json);
	assert_eq!(value.field("name"), Some(&Value::from("a")));
	assert_eq!(value.field("count"), Some(&Value::Int(2)));
	assert_eq!(value.field("flag"), Some(&Value::Bool(true)));
	assert_eq!(value.field("items"), Some(&Value::from_iter(["x", "y"])));
	assert_eq!(value.field("nothing"), Some(&Value::Null));
}

// --- Loader ---

#[test]
fn loader_resolves_a_simple_template() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	write_template(tmp.path(), "simple.template", SIMPLE_TEMPLATE)?;

	let loader = TemplateLoader::new(tmp.path());
	let resolved = loader.load(
		"simple",
		&values([
			("${sub1}", Value::from("val1")),
			("${sub2}", Value::from("val2")),
			("${sub3}", Value::from("val3")),
		]),
	)?;
	assert_eq!(resolved, SIMPLE_EXPECTED);

	Ok(())
}

#[test]
fn loader_caches_parsed_templates() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	write_template(tmp.path(), "greeting.template", "Hello ${name}!")?;

	let loader = TemplateLoader::new(tmp.path());
	let first = loader.load("greeting", &values([("name", Value::from("World"))]))?;
	assert_eq!(first, "Hello World!");

	// The second load must not re-read the file.
	std::fs::remove_file(tmp.path().join("greeting.template"))?;
	let second = loader.load("greeting", &values([("name", Value::from("Rust"))]))?;
	assert_eq!(second, "Hello Rust!");

	Ok(())
}

#[test]
fn loader_reports_missing_templates() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	let loader = TemplateLoader::new(tmp.path());

	let error = loader.load("missing", &ValueMap::new()).unwrap_err();
	assert!(matches!(error, TemplateError::TemplateNotFound { .. }));

	Ok(())
}

#[test]
fn loader_keeps_explicit_extensions() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	write_template(tmp.path(), "raw.txt", "plain ${x}")?;

	let loader = TemplateLoader::new(tmp.path());
	let resolved = loader.load("raw.txt", &values([("x", Value::Int(1))]))?;
	assert_eq!(resolved, "plain 1");

	Ok(())
}

#[test]
fn loader_supports_a_custom_default_extension() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	write_template(tmp.path(), "page.tpl", "v=${v}")?;

	let loader = TemplateLoader::with_extension(tmp.path(), "tpl");
	let resolved = loader.load("page", &values([("v", Value::from("1"))]))?;
	assert_eq!(resolved, "v=1");

	Ok(())
}

#[test]
fn registry_caches_loaders_per_directory() -> TemplateResult<()> {
	let tmp_a = tempfile::tempdir()?;
	let tmp_b = tempfile::tempdir()?;
	let registry = LoaderRegistry::new();

	let first = registry.get(tmp_a.path());
	let again = registry.get(tmp_a.path());
	let other = registry.get(tmp_b.path());

	assert!(Arc::ptr_eq(&first, &again));
	assert!(!Arc::ptr_eq(&first, &other));

	Ok(())
}

// --- Config ---

#[test]
fn config_discovery_finds_the_first_candidate() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("codetpl.toml"),
		"[templates]\ndir = \"tpl\"\nextension = \"tmpl\"\n",
	)?;
	std::fs::write(tmp.path().join(".codetpl.toml"), "[templates]\ndir = \"other\"\n")?;

	let Some((path, config)) = config::discover_config(tmp.path())? else {
		panic!("expected a config file to be discovered");
	};
	assert_eq!(path, tmp.path().join("codetpl.toml"));
	assert_eq!(config.templates.dir, std::path::PathBuf::from("tpl"));
	assert_eq!(config.templates.extension, "tmpl");

	Ok(())
}

#[test]
fn config_discovery_returns_none_without_a_file() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	assert!(config::discover_config(tmp.path())?.is_none());

	Ok(())
}

#[test]
fn config_defaults_apply_to_an_empty_file() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("codetpl.toml"), "")?;

	let Some((_, config)) = config::discover_config(tmp.path())? else {
		panic!("expected a config file to be discovered");
	};
	assert_eq!(config.templates.dir, std::path::PathBuf::from("."));
	assert_eq!(config.templates.extension, "template");

	Ok(())
}

#[test]
fn invalid_config_is_a_parse_error() -> TemplateResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("codetpl.toml"), "not [valid toml")?;

	let error = config::discover_config(tmp.path()).unwrap_err();
	assert!(matches!(error, TemplateError::ConfigParse(_)));

	Ok(())
}
