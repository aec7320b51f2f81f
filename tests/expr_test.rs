use schemagen::error::Error;
use schemagen::{AttributeMap, SchemaParser};

fn env(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn expand(template: &str, attribs: &AttributeMap) -> Result<String, Error> {
    let mut parser = SchemaParser::new();
    parser.load_buffer(template);
    parser.expand(attribs)
}

#[test]
fn test_truthy_attribute_selects_if_branch() {
    let template = "%if {a} %then [x] %else [y] %end";
    assert_eq!(expand(template, &env(&[("a", "1")])).unwrap(), "x");
}

#[test]
fn test_falsy_attribute_selects_else_branch() {
    let template = "%if {a} %then [x] %else [y] %end";
    assert_eq!(expand(template, &env(&[("a", "")])).unwrap(), "y");
}

#[test]
fn test_and_needs_both_operands() {
    let template = "%if {a} %and {b} %then [ok] %end";
    assert_eq!(expand(template, &env(&[("a", "1"), ("b", "")])).unwrap(), "");
    assert_eq!(
        expand(template, &env(&[("a", "1"), ("b", "1")])).unwrap(),
        "ok"
    );
}

#[test]
fn test_or_needs_one_operand() {
    let template = "%if {a} %or {b} %then [ok] %else [no] %end";
    assert_eq!(
        expand(template, &env(&[("a", ""), ("b", "1")])).unwrap(),
        "ok"
    );
    assert_eq!(
        expand(template, &env(&[("a", ""), ("b", "")])).unwrap(),
        "no"
    );
}

#[test]
fn test_not_negates_truthiness() {
    let template = "%if %not {a} %then [absent] %else [present] %end";
    assert_eq!(expand(template, &env(&[("a", "")])).unwrap(), "absent");
    assert_eq!(expand(template, &env(&[("a", "1")])).unwrap(), "present");
}

#[test]
fn test_fold_is_left_to_right_without_precedence() {
    // (a or b) and c, not a or (b and c)
    let template = "%if {a} %or {b} %and {c} %then [t] %else [f] %end";
    assert_eq!(
        expand(template, &env(&[("a", "1"), ("b", ""), ("c", "")])).unwrap(),
        "f"
    );
    assert_eq!(
        expand(template, &env(&[("a", "1"), ("b", ""), ("c", "1")])).unwrap(),
        "t"
    );
}

#[test]
fn test_expression_spans_lines() {
    let template = "%if {a}\n%and {b} %then [ok] %end";
    assert_eq!(
        expand(template, &env(&[("a", "1"), ("b", "1")])).unwrap(),
        "ok"
    );
}

#[test]
fn test_integer_comparison() {
    let template = "%if ({n} >=i \"3\") %then [big] %else [small] %end";
    assert_eq!(expand(template, &env(&[("n", "5")])).unwrap(), "big");
    assert_eq!(expand(template, &env(&[("n", "2")])).unwrap(), "small");
}

#[test]
fn test_float_comparison() {
    let template = "%if ({v} >f \"2.49\") %then [above] %else [below] %end";
    assert_eq!(expand(template, &env(&[("v", "2.5")])).unwrap(), "above");
    assert_eq!(expand(template, &env(&[("v", "2.4")])).unwrap(), "below");
}

#[test]
fn test_string_comparison_is_lexicographic() {
    let template = "%if ({v} < \"b\") %then [lt] %else [ge] %end";
    assert_eq!(expand(template, &env(&[("v", "a")])).unwrap(), "lt");
    assert_eq!(expand(template, &env(&[("v", "c")])).unwrap(), "ge");
}

#[test]
fn test_equality_and_inequality() {
    let template = "%if ({v} == \"abc\") %then [eq] %else [ne] %end";
    assert_eq!(expand(template, &env(&[("v", "abc")])).unwrap(), "eq");
    assert_eq!(expand(template, &env(&[("v", "abd")])).unwrap(), "ne");

    let template = "%if ({v} != \"abc\") %then [ne] %else [eq] %end";
    assert_eq!(expand(template, &env(&[("v", "abd")])).unwrap(), "ne");
}

#[test]
fn test_unparseable_number_coerces_to_zero() {
    let template = "%if ({n} ==i \"0\") %then [zero] %else [nonzero] %end";
    assert_eq!(expand(template, &env(&[("n", "oops")])).unwrap(), "zero");
}

#[test]
fn test_not_applies_to_comparison() {
    let template = "%if %not ({n} ==i \"5\") %then [ne] %else [eq] %end";
    assert_eq!(expand(template, &env(&[("n", "5")])).unwrap(), "eq");
    assert_eq!(expand(template, &env(&[("n", "6")])).unwrap(), "ne");
}

#[test]
fn test_comparison_composes_with_attributes() {
    let template = "%if {enabled} %and ({n} >i \"0\") %then [on] %else [off] %end";
    assert_eq!(
        expand(template, &env(&[("enabled", "1"), ("n", "2")])).unwrap(),
        "on"
    );
    assert_eq!(
        expand(template, &env(&[("enabled", ""), ("n", "2")])).unwrap(),
        "off"
    );
}

#[test]
fn test_then_without_operand() {
    let result = expand("%if %then [x] %end", &AttributeMap::new());
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_repeated_binary_token() {
    let result = expand("%if {a} %or %or {b} %then [x] %end", &env(&[("a", "1"), ("b", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_mixed_adjacent_binary_tokens() {
    let result = expand("%if {a} %and %or {b} %then [x] %end", &env(&[("a", "1"), ("b", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_binary_token_without_left_operand() {
    let result = expand("%if %and {a} %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_then_after_not() {
    let result = expand("%if {a} %not %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_adjacent_operands_without_binary() {
    let result = expand("%if {a} {b} %then [x] %end", &env(&[("a", "1"), ("b", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_dangling_binary_before_then() {
    let result = expand("%if {a} %and %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_expression_past_end_of_buffer() {
    let result = expand("%if {a}", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_word_inside_expression() {
    let result = expand("%if word %then [x] %end", &AttributeMap::new());
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_unknown_attribute_in_expression() {
    let result = expand("%if {ghost} %then [x] %end", &AttributeMap::new());
    assert!(matches!(result, Err(Error::UnknownAttribute { .. })));
}

#[test]
fn test_ignored_unknown_attribute_is_falsy() {
    let mut parser = SchemaParser::new();
    parser.load_buffer("%if {ghost} %then [x] %else [y] %end");
    parser.ignore_unknown_attributes(true);
    assert_eq!(parser.expand(&AttributeMap::new()).unwrap(), "y");
}

#[test]
fn test_comparison_must_sit_on_one_line() {
    let result = expand("%if ({a}\n== \"1\") %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_comparison_missing_elements() {
    let result = expand("%if ({a}) %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));

    let result = expand("%if ({a} ==) %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_unrecognized_operator() {
    let result = expand("%if ({a} =! \"x\") %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidOperator { .. })));
}

#[test]
fn test_operator_with_invalid_character() {
    let result = expand("%if ({a} ==? \"x\") %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidSyntax { .. })));
}

#[test]
fn test_operator_longer_than_three_characters() {
    let result = expand("%if ({a} >=fi \"1\") %then [x] %end", &env(&[("a", "1")]));
    assert!(matches!(result, Err(Error::InvalidOperator { .. })));
}

#[test]
fn test_unknown_attribute_in_comparison() {
    let result = expand("%if ({ghost} == \"x\") %then [x] %end", &AttributeMap::new());
    assert!(matches!(result, Err(Error::UnknownAttribute { .. })));
}
