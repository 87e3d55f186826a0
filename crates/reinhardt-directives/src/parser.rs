//! Markup parsing using nom parser combinators
//!
//! The input is split into tokens (open tags, close tags, comments, text) by
//! nom parsers, and a small stack machine assembles them into a [`Node`]
//! tree. Void elements never take children; `<tag/>` closes immediately.
//!
//! A `<` that does not start a recognizable tag is kept as text, so
//! `a < b` parses as a single text node.

use std::borrow::Cow;

use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, take_until, take_while, take_while1},
	character::complete::{alpha1, char, multispace0, multispace1},
	combinator::{map, opt, recognize},
	multi::many0,
	sequence::{delimited, pair, preceded},
};

use crate::dom::{Node, is_void_element};
use crate::error::ParseError;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
	Open {
		tag: &'a str,
		attrs: Vec<(&'a str, Option<&'a str>)>,
		self_closing: bool,
	},
	Close(&'a str),
	Comment(&'a str),
	Text(&'a str),
}

fn tag_name(input: &str) -> IResult<&str, &str> {
	recognize(pair(
		alpha1,
		take_while(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')),
	))
	.parse(input)
}

fn attr_name(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| !c.is_whitespace() && !matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
		.parse(input)
}

fn attr_value(input: &str) -> IResult<&str, &str> {
	alt((
		delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
		delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
		take_while1(|c: char| !c.is_whitespace() && !matches!(c, '"' | '\'' | '<' | '>' | '=' | '`')),
	))
	.parse(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, Option<&str>)> {
	pair(
		attr_name,
		opt(preceded((multispace0, char('='), multispace0), attr_value)),
	)
	.parse(input)
}

fn open_tag(input: &str) -> IResult<&str, Token<'_>> {
	map(
		(
			char('<'),
			tag_name,
			many0(preceded(multispace1, attribute)),
			multispace0,
			opt(char('/')),
			char('>'),
		),
		|(_, tag, attrs, _, slash, _)| Token::Open {
			tag,
			attrs,
			self_closing: slash.is_some(),
		},
	)
	.parse(input)
}

fn close_tag(input: &str) -> IResult<&str, Token<'_>> {
	map(
		delimited(tag("</"), tag_name, (multispace0, char('>'))),
		Token::Close,
	)
	.parse(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
	map(
		delimited(tag("<!--"), take_until("-->"), tag("-->")),
		Token::Comment,
	)
	.parse(input)
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
	map(take_while1(|c: char| c != '<'), Token::Text).parse(input)
}

fn stray_angle(input: &str) -> IResult<&str, Token<'_>> {
	map(tag("<"), Token::Text).parse(input)
}

fn next_token(input: &str) -> IResult<&str, Token<'_>> {
	alt((comment, close_tag, open_tag, text, stray_angle)).parse(input)
}

// ============================================================================
// Tree building
// ============================================================================

/// Parses markup into a fragment node.
///
/// # Errors
///
/// Fails on a closing tag that does not match the innermost open element and
/// on elements still open at the end of the input.
pub fn parse_fragment(input: &str) -> Result<Node, ParseError> {
	let root = Node::fragment();
	let mut open: Vec<(String, Node)> = Vec::new();
	let mut rest = input;

	while !rest.is_empty() {
		let offset = input.len() - rest.len();
		let current = open.last().map_or(&root, |(_, node)| node);

		let Ok((remaining, token)) = next_token(rest) else {
			append_text(current, rest);
			break;
		};
		rest = remaining;

		match token {
			Token::Open {
				tag,
				attrs,
				self_closing,
			} => {
				let tag = tag.to_ascii_lowercase();
				let element = Node::element(tag.as_str());
				for (name, value) in attrs {
					element.set_attr(name, decode_entities(value.unwrap_or_default()));
				}
				current.append_child(&element);
				if !self_closing && !is_void_element(&tag) {
					open.push((tag, element));
				}
			}
			Token::Close(tag) => {
				let tag = tag.to_ascii_lowercase();
				if is_void_element(&tag) {
					continue;
				}
				let Some((expected, _)) = open.last() else {
					return Err(ParseError::UnexpectedClose { tag, offset });
				};
				if *expected != tag {
					return Err(ParseError::MismatchedClose {
						expected: expected.clone(),
						found: tag,
						offset,
					});
				}
				open.pop();
			}
			Token::Comment(data) => current.append_child(&Node::comment(data)),
			Token::Text(data) => append_text(current, data),
		}
	}

	match open.pop() {
		Some((tag, _)) => Err(ParseError::Unclosed(tag)),
		None => Ok(root),
	}
}

/// Appends text, merging with a preceding text node.
fn append_text(parent: &Node, raw: &str) {
	let decoded = decode_entities(raw);
	match parent.last_child() {
		Some(last) if last.is_text() => {
			let mut data = last.data().unwrap_or_default();
			data.push_str(&decoded);
			last.set_data(data);
		}
		_ => parent.append_child(&Node::text(decoded)),
	}
}

/// Decodes character references in text and attribute values: the full
/// HTML named set plus decimal and hexadecimal numeric references. Anything
/// that is not a valid reference is kept literally.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
	html_escape::decode_html_entities(raw)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::NodeType;
	use rstest::rstest;

	#[rstest]
	fn test_open_tag_attributes() {
		let (rest, token) = open_tag(r#"<input v-model="name" disabled data-x='1' size=3 />tail"#).unwrap();
		assert_eq!(rest, "tail");
		assert_eq!(
			token,
			Token::Open {
				tag: "input",
				attrs: vec![
					("v-model", Some("name")),
					("disabled", None),
					("data-x", Some("1")),
					("size", Some("3")),
				],
				self_closing: true,
			}
		);
	}

	#[rstest]
	fn test_directive_attribute_names() {
		let (_, (name, value)) = attribute(r#"v-on:click = "inc""#).unwrap();
		assert_eq!(name, "v-on:click");
		assert_eq!(value, Some("inc"));
	}

	#[rstest]
	#[case("<p>Hello</p>")]
	#[case(r#"<div id="app"><p class="x y">a &amp; b</p><input value="1"><!-- c --></div>"#)]
	#[case("<ul><li>one</li><li>two</li></ul>\n  <br>")]
	#[case("plain text only")]
	#[case("")]
	fn test_canonical_round_trip(#[case] markup: &str) {
		let fragment = parse_fragment(markup).unwrap();
		assert_eq!(fragment.inner_html(), markup);
	}

	#[rstest]
	fn test_text_with_stray_angle_is_one_node() {
		let fragment = parse_fragment("a < b").unwrap();
		let children = fragment.children();
		assert_eq!(children.len(), 1);
		assert_eq!(children[0].data().as_deref(), Some("a < b"));
	}

	#[rstest]
	fn test_self_closing_and_void() {
		let fragment = parse_fragment("<div/><br><span>x</span>").unwrap();
		let kinds: Vec<_> = fragment
			.children()
			.iter()
			.map(|n| n.tag_name().unwrap())
			.collect();
		assert_eq!(kinds, vec!["div", "br", "span"]);
	}

	#[rstest]
	fn test_entities_are_decoded() {
		let fragment = parse_fragment(r#"<a title="&quot;q&quot;">&lt;tag&gt; &#39;s&#x27; &unknown;</a>"#).unwrap();
		let link = fragment.children()[0].clone();
		assert_eq!(link.attr("title").as_deref(), Some("\"q\""));
		assert_eq!(link.text_content(), "<tag> 's' &unknown;");
	}

	#[rstest]
	#[case("a&nbsp;b", "a\u{a0}b")]
	#[case("&copy; &#169; &#xA9;", "\u{a9} \u{a9} \u{a9}")]
	#[case("&hellip;&mdash;&euro;", "\u{2026}\u{2014}\u{20ac}")]
	#[case("&amp;lt;", "&lt;")]
	fn test_named_and_numeric_references(#[case] raw: &str, #[case] expected: &str) {
		assert_eq!(decode_entities(raw), expected);
	}

	#[rstest]
	fn test_references_survive_reserialization() {
		let fragment = parse_fragment("<p>a&nbsp;b &copy; &#169; &amp;nbsp;</p>").unwrap();
		let html = fragment.children()[0].to_html();
		assert_eq!(html, "<p>a\u{a0}b \u{a9} \u{a9} &amp;nbsp;</p>");

		let reparsed = parse_fragment(&html).unwrap();
		assert_eq!(reparsed.children()[0].to_html(), html);
		assert_eq!(reparsed.text_content(), "a\u{a0}b \u{a9} \u{a9} &nbsp;");
	}

	#[rstest]
	fn test_comment_node() {
		let fragment = parse_fragment("<!-- {{ not compiled }} -->").unwrap();
		assert_eq!(fragment.children()[0].node_type(), NodeType::Comment);
	}

	#[rstest]
	#[case("<div><span></div>", ParseError::MismatchedClose { expected: "span".into(), found: "div".into(), offset: 11 })]
	#[case("text</p>", ParseError::UnexpectedClose { tag: "p".into(), offset: 4 })]
	#[case("<section><p>open", ParseError::Unclosed("p".into()))]
	fn test_structural_errors(#[case] markup: &str, #[case] expected: ParseError) {
		assert_eq!(parse_fragment(markup).unwrap_err(), expected);
	}
}
