use crate::{Error, Result};

/// Operator joining two compound selectors within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

/// One node of a parsed selector chain, in source order.
///
/// `Attribute` and `Pseudo` carry the exact fragment of the original selector
/// text that produced them (leading `[` or `:` included), so a native matcher
/// can be re-invoked with a self-contained selector later on. The fragment is
/// sliced once at parse time and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorNode {
    Tag(String),
    Id(String),
    Class(String),
    Universal,
    Attribute { source: String },
    Pseudo { source: String },
    Combinator(Combinator),
}

/// A single comma-free selector: simple-selector nodes interleaved with
/// combinators, e.g. `div.foo > span[bar]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorChain {
    pub nodes: Vec<SelectorNode>,
}

/// A full selector: one or more comma-separated alternative chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub chains: Vec<SelectorChain>,
}

pub fn parse(selector: &str) -> Result<SelectorList> {
    let groups = split_selector_groups(selector)?;
    let mut chains = Vec::with_capacity(groups.len());
    for group in groups {
        chains.push(parse_chain(&group)?);
    }
    Ok(SelectorList { chains })
}

fn parse_chain(selector: &str) -> Result<SelectorChain> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Error::InvalidSelector(selector.into()));
    }

    let tokens = tokenize_selector(selector)?;
    let mut nodes = Vec::new();
    let mut pending_combinator: Option<Combinator> = None;

    for token in tokens {
        if token == ">" || token == "+" || token == "~" {
            if pending_combinator.is_some() || nodes.is_empty() {
                return Err(Error::InvalidSelector(selector.into()));
            }
            pending_combinator = Some(match token.as_str() {
                ">" => Combinator::Child,
                "+" => Combinator::NextSibling,
                "~" => Combinator::SubsequentSibling,
                _ => unreachable!(),
            });
            continue;
        }

        if !nodes.is_empty() {
            nodes.push(SelectorNode::Combinator(
                pending_combinator.take().unwrap_or(Combinator::Descendant),
            ));
        }
        parse_compound(&token, &mut nodes)?;
    }

    if nodes.is_empty() || pending_combinator.is_some() {
        return Err(Error::InvalidSelector(selector.into()));
    }

    Ok(SelectorChain { nodes })
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = NestingDepth::default();

    for ch in selector.chars() {
        if depth.step_quoted(ch) {
            current.push(ch);
            continue;
        }
        match ch {
            '[' | ']' | '(' | ')' | '\'' | '"' => {
                depth.step_delimiter(ch, selector)?;
                current.push(ch);
            }
            ',' if depth.is_top_level() => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(Error::InvalidSelector(selector.into()));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    depth.finish(selector)?;

    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidSelector(selector.into()));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = NestingDepth::default();

    for ch in selector.chars() {
        if depth.step_quoted(ch) {
            current.push(ch);
            continue;
        }
        match ch {
            '[' | ']' | '(' | ')' | '\'' | '"' => {
                depth.step_delimiter(ch, selector)?;
                current.push(ch);
            }
            '>' | '+' | '~' if depth.is_top_level() => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(ch.to_string());
            }
            ch if ch.is_ascii_whitespace() && depth.is_top_level() => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    depth.finish(selector)?;

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    Ok(tokens)
}

/// Bracket, paren, and quote state of a left-to-right selector scan.
/// Combinator and comma splitting only applies at top level, and quoted
/// content never affects the bracket or paren depth.
#[derive(Default)]
struct NestingDepth {
    brackets: usize,
    parens: usize,
    quote: Option<char>,
    escaped: bool,
}

impl NestingDepth {
    /// Consume `ch` while inside a quoted run. True if it was consumed.
    fn step_quoted(&mut self, ch: char) -> bool {
        let Some(quote) = self.quote else {
            return false;
        };
        if self.escaped {
            self.escaped = false;
        } else if ch == '\\' {
            self.escaped = true;
        } else if ch == quote {
            self.quote = None;
        }
        true
    }

    fn step_delimiter(&mut self, ch: char, selector: &str) -> Result<()> {
        match ch {
            '[' => self.brackets += 1,
            ']' => {
                self.brackets = self
                    .brackets
                    .checked_sub(1)
                    .ok_or_else(|| Error::InvalidSelector(selector.into()))?;
            }
            '(' => self.parens += 1,
            ')' => {
                self.parens = self
                    .parens
                    .checked_sub(1)
                    .ok_or_else(|| Error::InvalidSelector(selector.into()))?;
            }
            '\'' | '"' => self.quote = Some(ch),
            _ => {}
        }
        Ok(())
    }

    fn is_top_level(&self) -> bool {
        self.brackets == 0 && self.parens == 0
    }

    fn finish(&self, selector: &str) -> Result<()> {
        if self.brackets != 0 || self.parens != 0 || self.quote.is_some() {
            return Err(Error::InvalidSelector(selector.into()));
        }
        Ok(())
    }
}

fn parse_compound(part: &str, nodes: &mut Vec<SelectorNode>) -> Result<()> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let start_len = nodes.len();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                nodes.push(SelectorNode::Universal);
                i += 1;
            }
            b'#' => {
                let Some((id, next)) = parse_ident(part, i + 1) else {
                    return Err(Error::InvalidSelector(part.into()));
                };
                nodes.push(SelectorNode::Id(id));
                i = next;
            }
            b'.' => {
                let Some((class_name, next)) = parse_ident(part, i + 1) else {
                    return Err(Error::InvalidSelector(part.into()));
                };
                nodes.push(SelectorNode::Class(class_name));
                i = next;
            }
            b'[' => {
                let end = find_closing_bracket(part, i)
                    .ok_or_else(|| Error::InvalidSelector(part.into()))?;
                nodes.push(SelectorNode::Attribute {
                    source: part[i..=end].to_string(),
                });
                i = end + 1;
            }
            b':' => {
                let end = pseudo_end(part, i)?;
                nodes.push(SelectorNode::Pseudo {
                    source: part[i..end].to_string(),
                });
                i = end;
            }
            _ => {
                // a tag name may only open the compound
                if nodes.len() != start_len {
                    return Err(Error::InvalidSelector(part.into()));
                }
                let Some((tag, next)) = parse_ident(part, i) else {
                    return Err(Error::InvalidSelector(part.into()));
                };
                nodes.push(SelectorNode::Tag(tag));
                i = next;
            }
        }
    }

    if nodes.len() == start_len {
        return Err(Error::InvalidSelector(part.into()));
    }
    Ok(())
}

/// End (exclusive) of the pseudo fragment starting at `start` (a `:`), i.e.
/// `:` or `::`, a name, and an optional balanced parenthesized argument.
fn pseudo_end(part: &str, start: usize) -> Result<usize> {
    let bytes = part.as_bytes();
    let mut i = start + 1;
    if bytes.get(i) == Some(&b':') {
        i += 1;
    }
    let Some((_, after_name)) = parse_ident(part, i) else {
        return Err(Error::InvalidSelector(part.into()));
    };
    i = after_name;
    if bytes.get(i) == Some(&b'(') {
        let close = find_matching_paren(&part[i + 1..])
            .ok_or_else(|| Error::InvalidSelector(part.into()))?;
        i = i + 1 + close + 1;
    }
    Ok(i)
}

fn find_closing_bracket(src: &str, open_bracket: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (idx, b) in src.bytes().enumerate().skip(open_bracket + 1) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
                continue;
            }
            if b == b'\\' {
                escaped = true;
                continue;
            }
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b']' => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Index of the `)` that closes an already-open paren, relative to `body`.
pub(crate) fn find_matching_paren(body: &str) -> Option<usize> {
    let mut paren_depth = 1usize;
    let mut bracket_depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (idx, b) in body.bytes().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
                continue;
            }
            if b == b'\\' {
                escaped = true;
                continue;
            }
            if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'\'' | b'"' => quote = Some(b),
            b'[' => {
                bracket_depth += 1;
            }
            b']' => {
                if bracket_depth == 0 {
                    return None;
                }
                bracket_depth -= 1;
            }
            b'(' if bracket_depth == 0 => {
                paren_depth += 1;
            }
            b')' if bracket_depth == 0 => {
                paren_depth = paren_depth.checked_sub(1)?;
                if paren_depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_ident_char(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(selector: &str) -> Vec<SelectorNode> {
        let list = parse(selector).expect("selector should parse");
        assert_eq!(list.chains.len(), 1);
        list.chains.into_iter().next().unwrap().nodes
    }

    #[test]
    fn parses_compound_selector_in_source_order() {
        assert_eq!(
            chain("div.foo#bar"),
            vec![
                SelectorNode::Tag("div".into()),
                SelectorNode::Class("foo".into()),
                SelectorNode::Id("bar".into()),
            ]
        );
    }

    #[test]
    fn parses_combinators_with_and_without_whitespace() {
        let expected = vec![
            SelectorNode::Tag("a".into()),
            SelectorNode::Combinator(Combinator::Child),
            SelectorNode::Tag("b".into()),
            SelectorNode::Combinator(Combinator::Descendant),
            SelectorNode::Tag("c".into()),
            SelectorNode::Combinator(Combinator::NextSibling),
            SelectorNode::Tag("d".into()),
            SelectorNode::Combinator(Combinator::SubsequentSibling),
            SelectorNode::Tag("e".into()),
        ];
        assert_eq!(chain("a > b c + d ~ e"), expected);
        assert_eq!(chain("a>b c+d~e"), expected);
    }

    #[test]
    fn comma_separates_alternative_chains() {
        let list = parse(" .a ,\tdiv.b ").expect("selector should parse");
        assert_eq!(list.chains.len(), 2);
        assert_eq!(list.chains[0].nodes, vec![SelectorNode::Class("a".into())]);
        assert_eq!(
            list.chains[1].nodes,
            vec![
                SelectorNode::Tag("div".into()),
                SelectorNode::Class("b".into())
            ]
        );
    }

    #[test]
    fn attribute_node_keeps_exact_source_fragment() {
        assert_eq!(
            chain(r#"input[type = "text a"]"#),
            vec![
                SelectorNode::Tag("input".into()),
                SelectorNode::Attribute {
                    source: r#"[type = "text a"]"#.into()
                },
            ]
        );
    }

    #[test]
    fn pseudo_node_keeps_leading_colon_and_arguments() {
        assert_eq!(
            chain("li:nth-child(2n + 1)"),
            vec![
                SelectorNode::Tag("li".into()),
                SelectorNode::Pseudo {
                    source: ":nth-child(2n + 1)".into()
                },
            ]
        );
        assert_eq!(
            chain("p::first-line"),
            vec![
                SelectorNode::Tag("p".into()),
                SelectorNode::Pseudo {
                    source: "::first-line".into()
                },
            ]
        );
    }

    #[test]
    fn quoted_bracket_content_does_not_end_attribute() {
        assert_eq!(
            chain(r#"[title="a]b"]"#),
            vec![SelectorNode::Attribute {
                source: r#"[title="a]b"]"#.into()
            }]
        );
    }

    #[test]
    fn comma_inside_pseudo_arguments_is_not_a_group_split() {
        let list = parse(":is(.a, .b)").expect("selector should parse");
        assert_eq!(list.chains.len(), 1);
        assert_eq!(
            list.chains[0].nodes,
            vec![SelectorNode::Pseudo {
                source: ":is(.a, .b)".into()
            }]
        );
    }

    #[test]
    fn universal_selector_parses() {
        assert_eq!(chain("*"), vec![SelectorNode::Universal]);
    }

    #[test]
    fn rejects_malformed_selectors() {
        for bad in ["", "   ", "div >", "> div", "a,,b", "a,", "[foo", ":", "div~", "a..b"] {
            assert!(parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_tag_after_other_simple_selectors() {
        assert!(parse(".foo div").is_ok());
        assert!(parse(".foodiv").is_ok()); // single class, not a tag
        assert!(parse("div.foo").is_ok());
        assert!(parse("[a]div").is_err());
    }
}
