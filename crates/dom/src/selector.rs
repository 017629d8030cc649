//! CSS selector parsing
//!
//! Supports the subset a hide stylesheet and the selector resolver need:
//! type/universal, `#id`, `.class`, attribute selectors, the four
//! combinators, selector lists, and `:has()`, `:not()`, `:is()`/`:where()`,
//! `:first-child`, `:last-child`, `:only-child`. CSS escapes are decoded in
//! identifiers and strings. Anything outside the subset is an
//! `InvalidSelector` error, the same way a browser's `querySelectorAll`
//! throws on unknown syntax.

use crate::error::{DomError, Result};

/// Comma-separated list of complex selectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

impl SelectorList {
    /// `#foo` and nothing else
    pub fn id_only(&self) -> Option<&str> {
        let [complex] = self.0.as_slice() else {
            return None;
        };
        let [part] = complex.parts.as_slice() else {
            return None;
        };
        let c = &part.compound;
        if c.tag.is_none()
            && !c.universal
            && c.ids.len() == 1
            && c.classes.is_empty()
            && c.attributes.is_empty()
            && c.pseudo_classes.is_empty()
        {
            c.ids.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// Compound selectors joined by combinators, left to right
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<SelectorPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPart {
    pub compound: CompoundSelector,
    /// Relation to the part on the left; `None` for the leftmost part
    pub combinator: Option<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Lowercase tag name
    pub tag: Option<String>,
    pub universal: bool,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Lowercase attribute name
    pub name: String,
    pub matcher: Option<(AttrOperator, String)>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Has(Vec<RelativeSelector>),
    Not(SelectorList),
    Is(SelectorList),
    FirstChild,
    LastChild,
    OnlyChild,
}

/// Argument of `:has()`: a complex selector anchored at the subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeSelector {
    pub combinator: Combinator,
    pub selector: ComplexSelector,
}

/// Parse a full selector list, rejecting trailing garbage
pub fn parse_selector_list(source: &str) -> Result<SelectorList> {
    let mut parser = Parser::new(source);
    let list = parser.selector_list(false)?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(list)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// Returns whether anything was skipped
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_whitespace(c)) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::invalid_selector(
            self.source,
            format!("{} at offset {}", reason.into(), self.pos),
        )
    }

    fn selector_list(&mut self, nested: bool) -> Result<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.complex_selector()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') if nested => break,
                None if !nested => break,
                None => return Err(self.error("unclosed parenthesis")),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
        Ok(SelectorList(selectors))
    }

    fn relative_selector_list(&mut self) -> Result<Vec<RelativeSelector>> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            let combinator = match self.explicit_combinator() {
                Some(combinator) => {
                    self.skip_whitespace();
                    combinator
                }
                None => Combinator::Descendant,
            };
            let selector = self.complex_selector()?;
            selectors.push(RelativeSelector {
                combinator,
                selector,
            });
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => break,
                None => return Err(self.error("unclosed :has(")),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
        Ok(selectors)
    }

    /// Consume `>`, `+` or `~` if next
    fn explicit_combinator(&mut self) -> Option<Combinator> {
        let combinator = match self.peek()? {
            '>' => Combinator::Child,
            '+' => Combinator::NextSibling,
            '~' => Combinator::SubsequentSibling,
            _ => return None,
        };
        self.pos += 1;
        Some(combinator)
    }

    fn complex_selector(&mut self) -> Result<ComplexSelector> {
        let mut parts = Vec::new();
        let mut combinator = None;
        loop {
            let compound = self.compound_selector()?;
            parts.push(SelectorPart {
                compound,
                combinator: combinator.take(),
            });

            let had_space = self.skip_whitespace();
            if let Some(explicit) = self.explicit_combinator() {
                combinator = Some(explicit);
                self.skip_whitespace();
                continue;
            }
            match self.peek() {
                None | Some(',') | Some(')') => break,
                Some(_) if had_space => combinator = Some(Combinator::Descendant),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
        Ok(ComplexSelector { parts })
    }

    fn compound_selector(&mut self) -> Result<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        let mut empty = true;

        // Type or universal selector can only come first
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.universal = true;
            empty = false;
        } else if self.starts_ident() {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
            empty = false;
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    if !self.starts_ident() {
                        return Err(self.error("expected id"));
                    }
                    let id = self.ident()?;
                    compound.ids.push(id);
                }
                Some('.') => {
                    self.pos += 1;
                    if !self.starts_ident() {
                        return Err(self.error("expected class name"));
                    }
                    let class_name = self.ident()?;
                    compound.classes.push(class_name);
                }
                Some('[') => {
                    let attribute = self.attribute_selector()?;
                    compound.attributes.push(attribute);
                }
                Some(':') => {
                    let pseudo = self.pseudo_class()?;
                    compound.pseudo_classes.push(pseudo);
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(self.error("expected selector"));
        }
        Ok(compound)
    }

    fn attribute_selector(&mut self) -> Result<AttributeSelector> {
        self.pos += 1; // '['
        self.skip_whitespace();
        if !self.starts_ident() {
            return Err(self.error("expected attribute name"));
        }
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let operator = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    matcher: None,
                    case_insensitive: false,
                });
            }
            (Some('='), _) => {
                self.pos += 1;
                AttrOperator::Equals
            }
            (Some(op), Some('=')) => {
                let operator = match op {
                    '~' => AttrOperator::Includes,
                    '|' => AttrOperator::DashMatch,
                    '^' => AttrOperator::Prefix,
                    '$' => AttrOperator::Suffix,
                    '*' => AttrOperator::Substring,
                    _ => return Err(self.error("expected attribute operator")),
                };
                self.pos += 2;
                operator
            }
            _ => return Err(self.error("expected attribute operator")),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.string(quote)?
            }
            _ if self.starts_ident() => self.ident()?,
            _ => return Err(self.error("expected attribute value")),
        };

        self.skip_whitespace();
        let mut case_insensitive = false;
        match self.peek() {
            Some('i' | 'I') => {
                self.pos += 1;
                case_insensitive = true;
                self.skip_whitespace();
            }
            Some('s' | 'S') => {
                self.pos += 1;
                self.skip_whitespace();
            }
            _ => {}
        }

        if self.bump() != Some(']') {
            return Err(self.error("unclosed attribute selector"));
        }

        Ok(AttributeSelector {
            name,
            matcher: Some((operator, value)),
            case_insensitive,
        })
    }

    fn pseudo_class(&mut self) -> Result<PseudoClass> {
        self.pos += 1; // ':'
        if self.peek() == Some(':') {
            return Err(self.error("pseudo-elements are not supported"));
        }
        if !self.starts_ident() {
            return Err(self.error("expected pseudo-class name"));
        }
        let name = self.ident()?.to_ascii_lowercase();

        if self.peek() == Some('(') {
            self.pos += 1;
            let pseudo = match name.as_str() {
                "has" => PseudoClass::Has(self.relative_selector_list()?),
                "not" => PseudoClass::Not(self.selector_list(true)?),
                "is" | "where" => PseudoClass::Is(self.selector_list(true)?),
                other => return Err(self.error(format!("unsupported pseudo-class :{other}()"))),
            };
            if self.bump() != Some(')') {
                return Err(self.error("expected ')'"));
            }
            return Ok(pseudo);
        }

        match name.as_str() {
            "first-child" => Ok(PseudoClass::FirstChild),
            "last-child" => Ok(PseudoClass::LastChild),
            "only-child" => Ok(PseudoClass::OnlyChild),
            other => Err(self.error(format!("unsupported pseudo-class :{other}"))),
        }
    }

    /// The next code points would start an identifier
    fn starts_ident(&self) -> bool {
        match self.peek() {
            Some('-') => {
                matches!(self.peek_at(1), Some(c) if is_name_start(c) || c == '-')
                    || self.escape_at(1)
            }
            Some('\\') => self.escape_at(0),
            Some(c) => is_name_start(c),
            None => false,
        }
    }

    /// A valid escape begins at `pos + offset`
    fn escape_at(&self, offset: usize) -> bool {
        self.peek_at(offset) == Some('\\')
            && !matches!(self.peek_at(offset + 1), None | Some('\n' | '\r' | '\x0C'))
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.peek() {
                Some(c) if is_name_char(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                Some('\\') if self.escape_at(0) => {
                    self.pos += 1;
                    out.push(self.escape()?);
                }
                _ => break,
            }
        }
        Ok(out)
    }

    /// Decode an escape; the backslash is already consumed
    fn escape(&mut self) -> Result<char> {
        let start = self.pos;
        while self.pos - start < 6 && matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.pos += 1;
        }

        if self.pos == start {
            return self.bump().ok_or_else(|| self.error("unterminated escape"));
        }

        let hex: String = self.chars[start..self.pos].iter().collect();
        // One whitespace terminates a hex escape
        if matches!(self.peek(), Some(c) if is_whitespace(c)) {
            self.pos += 1;
        }

        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        Ok(match char::from_u32(code) {
            Some(c) if code != 0 => c,
            _ => '\u{FFFD}',
        })
    }

    /// Quoted string body; the opening quote is already consumed
    fn string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\n') => return Err(self.error("newline in string")),
                Some('\\') => match self.peek() {
                    None => return Err(self.error("unterminated string")),
                    // Escaped newline is a line continuation
                    Some('\n') => self.pos += 1,
                    Some(_) => out.push(self.escape()?),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::css_escape;

    fn single_compound(source: &str) -> CompoundSelector {
        let list = parse_selector_list(source).unwrap();
        assert_eq!(list.0.len(), 1);
        assert_eq!(list.0[0].parts.len(), 1);
        list.0[0].parts[0].compound.clone()
    }

    #[test]
    fn test_compound_parts() {
        let c = single_compound(r#"A.card.wide[href="/x"]"#);
        assert_eq!(c.tag.as_deref(), Some("a"));
        assert_eq!(c.classes, vec!["card", "wide"]);
        assert_eq!(
            c.attributes[0].matcher,
            Some((AttrOperator::Equals, "/x".to_string()))
        );
    }

    #[test]
    fn test_combinators() {
        let list = parse_selector_list("main > div.a  span + b ~ i").unwrap();
        let combinators: Vec<_> = list.0[0].parts.iter().map(|p| p.combinator).collect();
        assert_eq!(
            combinators,
            vec![
                None,
                Some(Combinator::Child),
                Some(Combinator::Descendant),
                Some(Combinator::NextSibling),
                Some(Combinator::SubsequentSibling),
            ]
        );
    }

    #[test]
    fn test_selector_list_with_newlines() {
        let list = parse_selector_list("#a,\n.b .c,\ndiv").unwrap();
        assert_eq!(list.0.len(), 3);
    }

    #[test]
    fn test_has_relative_selectors() {
        let c = single_compound("div.card:has(> span#badge, .x .y)");
        let PseudoClass::Has(relatives) = &c.pseudo_classes[0] else {
            panic!("expected :has");
        };
        assert_eq!(relatives.len(), 2);
        assert_eq!(relatives[0].combinator, Combinator::Child);
        assert_eq!(relatives[1].combinator, Combinator::Descendant);
        assert_eq!(relatives[1].selector.parts.len(), 2);
    }

    #[test]
    fn test_escapes_round_trip() {
        for raw in ["1st-item", "w-1/2", "a.b:c", "日本", "-9", "with space", "q\"uote"] {
            let source = format!("#{}", css_escape(raw));
            let c = single_compound(&source);
            assert_eq!(c.ids, vec![raw.to_string()], "source {source}");
        }
    }

    #[test]
    fn test_quoted_attribute_escapes() {
        let c = single_compound(r#"a[href="C:\\dir\"x\""]"#);
        assert_eq!(
            c.attributes[0].matcher.as_ref().map(|(_, v)| v.as_str()),
            Some(r#"C:\dir"x""#)
        );
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in [
            "", "#", "#1abc", ".", "div >", "div,", "a[href", "a[href=]", ":hover", "::before",
            "div:has(span", "div)", "a..b", "[x=\"unterminated]", "div:nth-child(2)",
        ] {
            assert!(
                matches!(parse_selector_list(bad), Err(DomError::InvalidSelector { .. })),
                "expected error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_id_only() {
        assert_eq!(parse_selector_list("#x").unwrap().id_only(), Some("x"));
        assert_eq!(parse_selector_list("div#x").unwrap().id_only(), None);
        assert_eq!(parse_selector_list("#x, #y").unwrap().id_only(), None);
    }
}
