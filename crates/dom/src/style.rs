//! Minimal cascade for hide-related properties
//!
//! Only `display` and `visibility` are evaluated, from `<style>` elements
//! and inline styles. Enough to answer "is this element hidden right now",
//! which is all the hide engine needs to observe.

use cssparser::{Delimiter, ParseError, Parser, ParserInput, SourcePosition, ToCss, Token};

use crate::arena::DomArena;
use crate::selector::{parse_selector_list, SelectorList};
use crate::types::{NodeId, Visibility};

#[derive(Debug)]
struct StyleRule {
    selectors: SelectorList,
    declarations: Vec<Declaration>,
}

#[derive(Debug)]
struct Declaration {
    property: String,
    value: String,
    important: bool,
}

impl DomArena {
    /// Evaluate `display` / `visibility` for one element
    pub fn computed_visibility(&self, node_id: NodeId) -> Visibility {
        let rules = self.collect_rules();
        let chain: Vec<NodeId> = self.inclusive_ancestors(node_id).collect();

        let hidden_box = chain.iter().any(|&id| {
            self.cascaded_value(id, &rules, "display")
                .is_some_and(|v| v == "none")
        });
        if hidden_box {
            return Visibility::NotRendered;
        }

        // visibility inherits: nearest declaration wins
        for &id in &chain {
            if let Some(value) = self.cascaded_value(id, &rules, "visibility") {
                return match value.as_str() {
                    "hidden" | "collapse" => Visibility::Invisible,
                    _ => Visibility::Rendered,
                };
            }
        }
        Visibility::Rendered
    }

    /// Important rules beat inline styles, which beat normal rules; later wins
    fn cascaded_value(&self, node_id: NodeId, rules: &[StyleRule], property: &str) -> Option<String> {
        let mut important = None;
        let mut normal = None;

        for rule in rules {
            if !self.matches_list(node_id, &rule.selectors) {
                continue;
            }
            for declaration in rule.declarations.iter().filter(|d| d.property == property) {
                if declaration.important {
                    important = Some(declaration.value.clone());
                } else {
                    normal = Some(declaration.value.clone());
                }
            }
        }

        important
            .or_else(|| self.style(node_id, property).map(str::to_ascii_lowercase))
            .or(normal)
    }

    fn collect_rules(&self) -> Vec<StyleRule> {
        self.find_by_tag("style")
            .into_iter()
            .filter_map(|id| self.text_content(id).ok())
            .flat_map(|text| parse_rules(&text))
            .collect()
    }
}

/// Split stylesheet text into rules; rules with invalid selectors are dropped
fn parse_rules(text: &str) -> Vec<StyleRule> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut rules = Vec::new();

    loop {
        parser.skip_whitespace();
        let start = parser.position();
        let Some(end) = prelude_end(&mut parser) else {
            break;
        };
        let prelude = parser.slice(start..end).trim().to_string();
        let declarations = parser
            .parse_nested_block(declaration_block)
            .unwrap_or_default();

        if let Ok(selectors) = parse_selector_list(&prelude) {
            rules.push(StyleRule {
                selectors,
                declarations,
            });
        }
    }

    rules
}

/// Advance to the next `{`; strings and bracket blocks in between are
/// skipped whole by the tokenizer
fn prelude_end(parser: &mut Parser<'_, '_>) -> Option<SourcePosition> {
    loop {
        let before = parser.position();
        match parser.next() {
            Ok(Token::CurlyBracketBlock) => return Some(before),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

fn declaration_block<'i>(
    block: &mut Parser<'i, '_>,
) -> Result<Vec<Declaration>, ParseError<'i, ()>> {
    let mut declarations = Vec::new();
    while !block.is_exhausted() {
        if let Ok(parsed) = block.parse_until_after(Delimiter::Semicolon, declaration) {
            declarations.push(parsed);
        }
    }
    Ok(declarations)
}

/// `property: value [!important]`
fn declaration<'i>(parser: &mut Parser<'i, '_>) -> Result<Declaration, ParseError<'i, ()>> {
    let property = parser.expect_ident()?.to_ascii_lowercase();
    parser.expect_colon()?;

    let mut words = Vec::new();
    let mut important = false;
    while let Ok(token) = parser.next().cloned() {
        if token == Token::Delim('!') {
            important = parser
                .try_parse(|p| p.expect_ident_matching("important"))
                .is_ok();
        } else {
            words.push(token.to_css_string().to_ascii_lowercase());
        }
    }

    Ok(Declaration {
        property,
        value: words.join(" "),
        important,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_style(css: &str) -> (DomArena, NodeId, NodeId) {
        let mut arena = DomArena::new_document();
        let body = arena.body().unwrap();
        let outer = arena.create_element("div");
        arena.set_attribute(outer, "class", "outer").unwrap();
        let inner = arena.create_element("a");
        arena.set_attribute(inner, "href", "/x{y}").unwrap();
        arena.append_child(body, outer).unwrap();
        arena.append_child(outer, inner).unwrap();

        let style = arena.create_element("style");
        arena.set_text_content(style, css).unwrap();
        let html = arena.document_element().unwrap();
        arena.append_child(html, style).unwrap();
        (arena, outer, inner)
    }

    #[test]
    fn test_display_none_hides_descendants() {
        let (arena, outer, inner) = page_with_style(".outer { display: none !important; }");
        assert_eq!(arena.computed_visibility(outer), Visibility::NotRendered);
        assert_eq!(arena.computed_visibility(inner), Visibility::NotRendered);
    }

    #[test]
    fn test_visibility_inherits_and_can_be_overridden() {
        let (mut arena, outer, inner) =
            page_with_style(".outer { visibility: hidden !important; }");
        assert_eq!(arena.computed_visibility(inner), Visibility::Invisible);

        arena.set_style(inner, "visibility", Some("visible")).unwrap();
        assert_eq!(arena.computed_visibility(inner), Visibility::Rendered);
        assert_eq!(arena.computed_visibility(outer), Visibility::Invisible);
    }

    #[test]
    fn test_braces_inside_quoted_selectors() {
        let (arena, outer, inner) = page_with_style("a[href=\"/x{y}\"] { display: none }");
        assert_eq!(arena.computed_visibility(inner), Visibility::NotRendered);
        assert_eq!(arena.computed_visibility(outer), Visibility::Rendered);
    }

    #[test]
    fn test_invalid_rule_dropped_others_apply() {
        let (arena, outer, _) =
            page_with_style("#1bad { display: none }\n.outer { visibility: hidden }");
        assert_eq!(arena.computed_visibility(outer), Visibility::Invisible);
    }

    #[test]
    fn test_comments_at_rules_and_quoted_braces() {
        let (arena, outer, inner) = page_with_style(
            "/* hide */ .outer { visibility: hidden }\n\
             @media print { .outer { display: none } }\n\
             a { content: \"}\"; display : NONE }",
        );
        assert_eq!(arena.computed_visibility(outer), Visibility::Invisible);
        assert_eq!(arena.computed_visibility(inner), Visibility::NotRendered);
    }

    #[test]
    fn test_inline_beats_normal_rule() {
        let (mut arena, outer, _) = page_with_style(".outer { display: none }");
        arena.set_style(outer, "display", Some("block")).unwrap();
        assert_eq!(arena.computed_visibility(outer), Visibility::Rendered);
    }
}
