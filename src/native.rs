use crate::composed::TreeView;
use crate::matcher::NativeMatcher;
use crate::selector::{SelectorNode, find_matching_paren, parse, parse_ident};
use crate::{Error, Result};

/// Native matcher for hosts without one of their own: evaluates a single
/// attribute clause or structural pseudo-class against the literal tree,
/// generically over any `TreeView`.
///
/// Supported pseudo-classes are the structural set (`first-child`,
/// `nth-of-type`, `empty`, ...) plus `not`/`is`/`where` with compound-only
/// inner selectors. Anything else (state-dependent pseudo-classes,
/// pseudo-elements) is reported as an `Err`, which the engine reads as a
/// non-match.
pub struct StructuralMatcher;

impl<T: TreeView> NativeMatcher<T> for StructuralMatcher {
    fn test(&self, view: &T, element: T::Node, fragment: &str) -> Result<bool> {
        match fragment.as_bytes().first() {
            Some(b'[') => {
                let condition = parse_attr_condition(fragment)?;
                Ok(eval_attr(view, element, &condition))
            }
            Some(b':') => {
                let pseudo = parse_pseudo(fragment)?;
                self.eval_pseudo(view, element, &pseudo)
            }
            _ => Err(Error::InvalidSelector(fragment.into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Nth {
    Exact(usize),
    Odd,
    Even,
    AnPlusB(i64, i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Empty,
    Not(Vec<Vec<SelectorNode>>),
    Is(Vec<Vec<SelectorNode>>),
    Where(Vec<Vec<SelectorNode>>),
}

impl StructuralMatcher {
    fn eval_pseudo<T: TreeView>(
        &self,
        view: &T,
        element: T::Node,
        pseudo: &PseudoClass,
    ) -> Result<bool> {
        let matched = match pseudo {
            PseudoClass::FirstChild => view.previous_sibling_element(element).is_none(),
            PseudoClass::LastChild => view.next_sibling_element(element).is_none(),
            PseudoClass::OnlyChild => {
                view.previous_sibling_element(element).is_none()
                    && view.next_sibling_element(element).is_none()
            }
            PseudoClass::FirstOfType => of_type_index(view, element) == 1,
            PseudoClass::LastOfType => of_type_index_from_last(view, element) == 1,
            PseudoClass::OnlyOfType => {
                of_type_index(view, element) == 1 && of_type_index_from_last(view, element) == 1
            }
            PseudoClass::NthChild(nth) => is_nth_index(element_index(view, element), nth),
            PseudoClass::NthLastChild(nth) => {
                is_nth_index(element_index_from_last(view, element), nth)
            }
            PseudoClass::NthOfType(nth) => is_nth_index(of_type_index(view, element), nth),
            PseudoClass::NthLastOfType(nth) => {
                is_nth_index(of_type_index_from_last(view, element), nth)
            }
            PseudoClass::Empty => view.child_elements(element).is_empty(),
            PseudoClass::Not(inners) => {
                let mut any = false;
                for inner in inners {
                    if self.eval_compound(view, element, inner)? {
                        any = true;
                        break;
                    }
                }
                !any
            }
            PseudoClass::Is(inners) | PseudoClass::Where(inners) => {
                let mut any = false;
                for inner in inners {
                    if self.eval_compound(view, element, inner)? {
                        any = true;
                        break;
                    }
                }
                any
            }
        };
        Ok(matched)
    }

    fn eval_compound<T: TreeView>(
        &self,
        view: &T,
        element: T::Node,
        nodes: &[SelectorNode],
    ) -> Result<bool> {
        for node in nodes {
            let matched = match node {
                SelectorNode::Universal => true,
                SelectorNode::Tag(name) => view.tag_name(element).eq_ignore_ascii_case(name),
                SelectorNode::Id(id) => view.element_id(element).as_deref() == Some(id.as_str()),
                SelectorNode::Class(class_name) => view.has_class(element, class_name),
                SelectorNode::Attribute { source } | SelectorNode::Pseudo { source } => {
                    self.test(view, element, source)?
                }
                SelectorNode::Combinator(_) => {
                    return Err(Error::InvalidSelector("combinator in fragment".into()));
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn eval_attr<T: TreeView>(view: &T, element: T::Node, condition: &AttrCondition) -> bool {
    match condition {
        AttrCondition::Exists { key } => view.attr(element, key).is_some(),
        AttrCondition::Eq { key, value } => view.attr(element, key).as_deref() == Some(value),
        AttrCondition::StartsWith { key, value } => view
            .attr(element, key)
            .is_some_and(|attr| attr.starts_with(value)),
        AttrCondition::EndsWith { key, value } => view
            .attr(element, key)
            .is_some_and(|attr| attr.ends_with(value)),
        AttrCondition::Contains { key, value } => view
            .attr(element, key)
            .is_some_and(|attr| attr.contains(value)),
        AttrCondition::Includes { key, value } => view.attr(element, key).is_some_and(|attr| {
            attr.split_ascii_whitespace().any(|token| token == value)
        }),
        AttrCondition::DashMatch { key, value } => view.attr(element, key).is_some_and(|attr| {
            attr == *value || attr.starts_with(&format!("{value}-"))
        }),
    }
}

fn element_index<T: TreeView>(view: &T, element: T::Node) -> usize {
    let mut index = 1usize;
    let mut cursor = view.previous_sibling_element(element);
    while let Some(sibling) = cursor {
        index += 1;
        cursor = view.previous_sibling_element(sibling);
    }
    index
}

fn element_index_from_last<T: TreeView>(view: &T, element: T::Node) -> usize {
    let mut index = 1usize;
    let mut cursor = view.next_sibling_element(element);
    while let Some(sibling) = cursor {
        index += 1;
        cursor = view.next_sibling_element(sibling);
    }
    index
}

fn of_type_index<T: TreeView>(view: &T, element: T::Node) -> usize {
    let tag_name = view.tag_name(element);
    let mut index = 1usize;
    let mut cursor = view.previous_sibling_element(element);
    while let Some(sibling) = cursor {
        if view.tag_name(sibling) == tag_name {
            index += 1;
        }
        cursor = view.previous_sibling_element(sibling);
    }
    index
}

fn of_type_index_from_last<T: TreeView>(view: &T, element: T::Node) -> usize {
    let tag_name = view.tag_name(element);
    let mut index = 1usize;
    let mut cursor = view.next_sibling_element(element);
    while let Some(sibling) = cursor {
        if view.tag_name(sibling) == tag_name {
            index += 1;
        }
        cursor = view.next_sibling_element(sibling);
    }
    index
}

fn is_nth_index(index: usize, nth: &Nth) -> bool {
    match nth {
        Nth::Exact(expected) => index == *expected,
        Nth::Odd => index % 2 == 1,
        Nth::Even => index % 2 == 0,
        Nth::AnPlusB(a, b) => {
            let index = index as i64;
            let diff = index - *b;
            if *a == 0 {
                return diff == 0;
            }
            diff % *a == 0 && (diff / *a) >= 0
        }
    }
}

fn parse_pseudo(fragment: &str) -> Result<PseudoClass> {
    let invalid = || Error::InvalidSelector(fragment.into());
    let rest = fragment.strip_prefix(':').ok_or_else(invalid)?;
    if rest.starts_with(':') {
        // pseudo-elements never match as pseudo-classes
        return Err(invalid());
    }

    let (name, after_name) = parse_ident(rest, 0).ok_or_else(invalid)?;
    let body = if rest.as_bytes().get(after_name) == Some(&b'(') {
        let close = find_matching_paren(&rest[after_name + 1..]).ok_or_else(invalid)?;
        if after_name + 1 + close + 1 != rest.len() {
            return Err(invalid());
        }
        Some(rest[after_name + 1..after_name + 1 + close].trim())
    } else if after_name != rest.len() {
        return Err(invalid());
    } else {
        None
    };

    match (name.as_str(), body) {
        ("first-child", None) => Ok(PseudoClass::FirstChild),
        ("last-child", None) => Ok(PseudoClass::LastChild),
        ("only-child", None) => Ok(PseudoClass::OnlyChild),
        ("first-of-type", None) => Ok(PseudoClass::FirstOfType),
        ("last-of-type", None) => Ok(PseudoClass::LastOfType),
        ("only-of-type", None) => Ok(PseudoClass::OnlyOfType),
        ("empty", None) => Ok(PseudoClass::Empty),
        ("nth-child", Some(raw)) => parse_nth(raw).map(PseudoClass::NthChild).ok_or_else(invalid),
        ("nth-last-child", Some(raw)) => parse_nth(raw)
            .map(PseudoClass::NthLastChild)
            .ok_or_else(invalid),
        ("nth-of-type", Some(raw)) => parse_nth(raw)
            .map(PseudoClass::NthOfType)
            .ok_or_else(invalid),
        ("nth-last-of-type", Some(raw)) => parse_nth(raw)
            .map(PseudoClass::NthLastOfType)
            .ok_or_else(invalid),
        ("not", Some(raw)) => parse_compound_list(raw).map(PseudoClass::Not),
        ("is", Some(raw)) => parse_compound_list(raw).map(PseudoClass::Is),
        ("where", Some(raw)) => parse_compound_list(raw).map(PseudoClass::Where),
        _ => Err(invalid()),
    }
}

/// Inner selector list for `not`/`is`/`where`: comma-separated compounds,
/// combinators rejected.
fn parse_compound_list(raw: &str) -> Result<Vec<Vec<SelectorNode>>> {
    let list = parse(raw)?;
    let mut compounds = Vec::with_capacity(list.chains.len());
    for chain in list.chains {
        if chain
            .nodes
            .iter()
            .any(|node| matches!(node, SelectorNode::Combinator(_)))
        {
            return Err(Error::InvalidSelector(raw.into()));
        }
        compounds.push(chain.nodes);
    }
    Ok(compounds)
}

fn parse_nth(raw: &str) -> Option<Nth> {
    let compact = raw
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if compact.is_empty() {
        return None;
    }

    match compact.as_str() {
        "odd" => Some(Nth::Odd),
        "even" => Some(Nth::Even),
        other => {
            if other.contains('n') {
                parse_nth_expression(other)
            } else if other.starts_with('+') || other.starts_with('-') {
                None
            } else {
                let value = other.parse::<usize>().ok()?;
                if value == 0 { None } else { Some(Nth::Exact(value)) }
            }
        }
    }
}

fn parse_nth_expression(expr: &str) -> Option<Nth> {
    if expr.matches('n').count() != 1 {
        return None;
    }

    let n_pos = expr.find('n')?;
    let (a_part, rest) = expr.split_at(n_pos);
    let b_part = &rest[1..];

    let a = match a_part {
        "" => 1,
        "-" => -1,
        "+" => return None,
        _ => a_part.parse::<i64>().ok()?,
    };

    if b_part.is_empty() {
        return Some(Nth::AnPlusB(a, 0));
    }

    let mut sign = 1;
    let raw_b = if let Some(rest) = b_part.strip_prefix('+') {
        rest
    } else if let Some(rest) = b_part.strip_prefix('-') {
        sign = -1;
        rest
    } else {
        return None;
    };
    if raw_b.is_empty() {
        return None;
    }
    let b = raw_b.parse::<i64>().ok()?;
    Some(Nth::AnPlusB(a, b * sign))
}

fn parse_attr_condition(fragment: &str) -> Result<AttrCondition> {
    let invalid = || Error::InvalidSelector(fragment.into());
    let bytes = fragment.as_bytes();
    if bytes.first() != Some(&b'[') {
        return Err(invalid());
    }

    let mut i = 1usize;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let key_start = i;
    while i < bytes.len() && is_attr_name_char(bytes[i]) {
        i += 1;
    }
    if key_start == i {
        return Err(invalid());
    }
    let key = fragment
        .get(key_start..i)
        .ok_or_else(invalid)?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    if bytes.get(i) == Some(&b']') {
        if i + 1 != bytes.len() {
            return Err(invalid());
        }
        return Ok(AttrCondition::Exists { key });
    }

    let (op, after_op): (fn(String, String) -> AttrCondition, usize) = match bytes.get(i) {
        Some(b'=') => (|key, value| AttrCondition::Eq { key, value }, i + 1),
        Some(b'^') if bytes.get(i + 1) == Some(&b'=') => {
            (|key, value| AttrCondition::StartsWith { key, value }, i + 2)
        }
        Some(b'$') if bytes.get(i + 1) == Some(&b'=') => {
            (|key, value| AttrCondition::EndsWith { key, value }, i + 2)
        }
        Some(b'*') if bytes.get(i + 1) == Some(&b'=') => {
            (|key, value| AttrCondition::Contains { key, value }, i + 2)
        }
        Some(b'~') if bytes.get(i + 1) == Some(&b'=') => {
            (|key, value| AttrCondition::Includes { key, value }, i + 2)
        }
        Some(b'|') if bytes.get(i + 1) == Some(&b'=') => {
            (|key, value| AttrCondition::DashMatch { key, value }, i + 2)
        }
        _ => return Err(invalid()),
    };

    i = after_op;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let (value, after_value) = parse_attr_value(fragment, i)?;
    i = after_value;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b']') || i + 1 != bytes.len() {
        return Err(invalid());
    }

    Ok(op(key, value))
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

fn parse_attr_value(src: &str, start: usize) -> Result<(String, usize)> {
    let invalid = || Error::InvalidSelector(src.into());
    let bytes = src.as_bytes();
    if start >= bytes.len() {
        return Err(invalid());
    }

    if bytes[start] == b'"' || bytes[start] == b'\'' {
        let quote = bytes[start];
        let mut i = start + 1;
        while i < bytes.len() {
            if bytes[i] == b'\\' {
                i = (i + 2).min(bytes.len());
                continue;
            }
            if bytes[i] == quote {
                let raw = src.get(start + 1..i).ok_or_else(invalid)?;
                return Ok((unescape_value(raw), i + 1));
            }
            i += 1;
        }
        return Err(invalid());
    }

    let mut i = start;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() || bytes[i] == b']' {
            break;
        }
        if bytes[i] == b'\\' {
            i = (i + 2).min(bytes.len());
            continue;
        }
        i += 1;
    }
    let raw = src.get(start..i).ok_or_else(invalid)?;
    Ok((unescape_value(raw), i))
}

fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut escaped = false;
    for ch in raw.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    out
}
