//! Selectors understood by the in-memory view.
//!
//! Supported forms:
//! - type (`button`) and universal (`*`)
//! - class (`.stepable`) and id (`#next`)
//! - attributes: `[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`
//! - pseudo-classes: `:not(..)`, `:is(..)`, `:where(..)`, `:first-child`,
//!   `:last-child`, `:only-child`, `:nth-child(an+b)`, `:nth-last-child(an+b)`
//! - combinators: descendant (` `), child (`>`), next sibling (`+`) and
//!   subsequent sibling (`~`)
//! - selector groups (`.a, .b`)

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value, verify},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::ViewError;

/// Element information the matcher needs
pub trait Selectable: Sized {
    fn local_name(&self) -> String;
    fn element_id(&self) -> Option<String>;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<String>;
    fn parent_element(&self) -> Option<Self>;
    fn previous_sibling_element(&self) -> Option<Self>;
    fn next_sibling_element(&self) -> Option<Self>;
}

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOperator {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl AttributeOperator {
    fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            AttributeOperator::Equals => actual == expected,
            AttributeOperator::Includes => {
                !expected.is_empty() && actual.split_whitespace().any(|word| word == expected)
            }
            AttributeOperator::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttributeOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttributeOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttributeOperator::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute {
        name: String,
        test: Option<(AttributeOperator, String)>,
    },
    Not(Vec<Complex>),
    Is(Vec<Complex>),
    OnlyChild,
    /// 1-based position `a*n + b` for some `n >= 0`, counted from the end
    /// when `from_end` is set
    Nth { a: i64, b: i64, from_end: bool },
}

impl Simple {
    fn matches<T: Selectable>(&self, element: &T) -> bool {
        match self {
            Simple::Universal => true,
            Simple::Type(name) => element.local_name().eq_ignore_ascii_case(name),
            Simple::Id(id) => element.element_id().as_deref() == Some(id.as_str()),
            Simple::Class(class) => element.has_class(class),
            Simple::Attribute { name, test } => match (element.attribute(name), test) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some((operator, expected))) => operator.test(&actual, expected),
            },
            Simple::Not(list) => !list.iter().any(|c| c.matches(element)),
            Simple::Is(list) => list.iter().any(|c| c.matches(element)),
            Simple::OnlyChild => {
                element.parent_element().is_some()
                    && element.previous_sibling_element().is_none()
                    && element.next_sibling_element().is_none()
            }
            Simple::Nth { a, b, from_end } => {
                if element.parent_element().is_none() {
                    return false;
                }
                let position = sibling_position(element, *from_end);
                nth_matches(*a, *b, position)
            }
        }
    }
}

fn sibling_position<T: Selectable>(element: &T, from_end: bool) -> i64 {
    let step = |e: &T| {
        if from_end {
            e.next_sibling_element()
        } else {
            e.previous_sibling_element()
        }
    };
    let mut position = 1;
    let mut current = step(element);
    while let Some(sibling) = current {
        position += 1;
        current = step(&sibling);
    }
    position
}

fn nth_matches(a: i64, b: i64, position: i64) -> bool {
    if a == 0 {
        return position == b;
    }
    let offset = position - b;
    offset % a == 0 && offset / a >= 0
}

/// Compound selector: every part must match the same element
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound(Vec<Simple>);

impl Compound {
    fn matches<T: Selectable>(&self, element: &T) -> bool {
        self.0.iter().all(|simple| simple.matches(element))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

/// A chain of compounds joined by combinators, e.g. `form > .step + .step`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// `combinators[i]` joins `compounds[i]` to `compounds[i + 1]`
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches<T: Selectable>(&self, element: &T) -> bool {
        self.matches_at(element, self.compounds.len() - 1)
    }

    fn matches_at<T: Selectable>(&self, element: &T, index: usize) -> bool {
        if !self.compounds[index].matches(element) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let next = |e: &T| self.matches_at(e, index - 1);
        match self.combinators[index - 1] {
            Combinator::Child => element.parent_element().is_some_and(|p| next(&p)),
            Combinator::NextSibling => element.previous_sibling_element().is_some_and(|s| next(&s)),
            Combinator::Descendant => any_along(element.parent_element(), T::parent_element, next),
            Combinator::SubsequentSibling => any_along(
                element.previous_sibling_element(),
                T::previous_sibling_element,
                next,
            ),
        }
    }
}

fn any_along<T>(start: Option<T>, step: impl Fn(&T) -> Option<T>, test: impl Fn(&T) -> bool) -> bool {
    let mut current = start;
    while let Some(element) = current {
        if test(&element) {
            return true;
        }
        current = step(&element);
    }
    false
}

/// Parsed selector group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, ViewError> {
        match all_consuming(selector_list)(source) {
            Ok((_, alternatives)) => Ok(Selector {
                source: source.to_string(),
                alternatives,
            }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(ViewError::invalid_selector(source, describe_error(source, &e)))
            }
            Err(nom::Err::Incomplete(_)) => {
                Err(ViewError::invalid_selector(source, "incomplete selector"))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `element` matches any selector in the group
    pub fn matches<T: Selectable>(&self, element: &T) -> bool {
        self.alternatives.iter().any(|c| c.matches(element))
    }
}

fn describe_error(source: &str, error: &VerboseError<&str>) -> String {
    let label = error.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(label) => Some(*label),
        _ => None,
    });
    let rest = error.errors.first().map_or("", |(rest, _)| *rest);
    let offset = source.len() - rest.len();
    match (label, rest.chars().next()) {
        (Some(label), Some(c)) => format!("invalid {label}: unexpected '{c}' at offset {offset}"),
        (Some(label), None) => format!("invalid {label}: unexpected end of input"),
        (None, Some(c)) => format!("unexpected '{c}' at offset {offset}"),
        (None, None) => "unexpected end of input".to_string(),
    }
}

// ─── Grammar ─────────────────────────────────────────────────────────────────

fn selector_list(input: &str) -> ParseResult<'_, Vec<Complex>> {
    delimited(
        multispace0,
        separated_list1(tuple((multispace0, char(','), multispace0)), complex),
        multispace0,
    )(input)
}

fn complex(input: &str) -> ParseResult<'_, Complex> {
    let (input, first) = compound(input)?;
    let (input, rest) = many0(pair(combinator, compound))(input)?;
    let mut compounds = vec![first];
    let mut combinators = Vec::with_capacity(rest.len());
    for (combinator, compound) in rest {
        combinators.push(combinator);
        compounds.push(compound);
    }
    Ok((
        input,
        Complex {
            compounds,
            combinators,
        },
    ))
}

fn combinator(input: &str) -> ParseResult<'_, Combinator> {
    alt((
        map(
            delimited(multispace0, one_of(">+~"), multispace0),
            |c| match c {
                '>' => Combinator::Child,
                '+' => Combinator::NextSibling,
                _ => Combinator::SubsequentSibling,
            },
        ),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

fn compound(input: &str) -> ParseResult<'_, Compound> {
    context(
        "compound selector",
        map(
            verify(
                pair(opt(type_selector), many0(subclass)),
                |(head, rest): &(Option<Simple>, Vec<Simple>)| head.is_some() || !rest.is_empty(),
            ),
            |(head, rest)| Compound(head.into_iter().chain(rest).collect()),
        ),
    )(input)
}

fn type_selector(input: &str) -> ParseResult<'_, Simple> {
    alt((
        value(Simple::Universal, char('*')),
        map(ident, |name| Simple::Type(name.to_ascii_lowercase())),
    ))(input)
}

fn subclass(input: &str) -> ParseResult<'_, Simple> {
    alt((
        map(preceded(char('#'), ident), |id| Simple::Id(id.to_string())),
        map(preceded(char('.'), ident), |class| {
            Simple::Class(class.to_string())
        }),
        attribute,
        pseudo_class,
    ))(input)
}

fn attribute(input: &str) -> ParseResult<'_, Simple> {
    context(
        "attribute selector",
        map(
            delimited(
                pair(char('['), multispace0),
                pair(
                    ident,
                    opt(pair(
                        delimited(multispace0, attribute_operator, multispace0),
                        attribute_value,
                    )),
                ),
                pair(multispace0, char(']')),
            ),
            |(name, test)| Simple::Attribute {
                name: name.to_string(),
                test: test.map(|(operator, expected)| (operator, expected.to_string())),
            },
        ),
    )(input)
}

fn attribute_operator(input: &str) -> ParseResult<'_, AttributeOperator> {
    alt((
        value(AttributeOperator::Equals, tag("=")),
        value(AttributeOperator::Includes, tag("~=")),
        value(AttributeOperator::DashMatch, tag("|=")),
        value(AttributeOperator::Prefix, tag("^=")),
        value(AttributeOperator::Suffix, tag("$=")),
        value(AttributeOperator::Substring, tag("*=")),
    ))(input)
}

fn attribute_value(input: &str) -> ParseResult<'_, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        ident,
    ))(input)
}

fn pseudo_class(input: &str) -> ParseResult<'_, Simple> {
    context(
        "pseudo-class",
        preceded(
            char(':'),
            alt((
                map(|i| functional("not", i), Simple::Not),
                map(|i| functional("is", i), Simple::Is),
                map(|i| functional("where", i), Simple::Is),
                map(|i| nth_function("nth-child", i), |(a, b)| Simple::Nth {
                    a,
                    b,
                    from_end: false,
                }),
                map(|i| nth_function("nth-last-child", i), |(a, b)| Simple::Nth {
                    a,
                    b,
                    from_end: true,
                }),
                value(
                    Simple::Nth {
                        a: 0,
                        b: 1,
                        from_end: false,
                    },
                    tag_no_case("first-child"),
                ),
                value(
                    Simple::Nth {
                        a: 0,
                        b: 1,
                        from_end: true,
                    },
                    tag_no_case("last-child"),
                ),
                value(Simple::OnlyChild, tag_no_case("only-child")),
            )),
        ),
    )(input)
}

/// `name(<selector list>)`
fn functional<'a>(name: &'static str, input: &'a str) -> ParseResult<'a, Vec<Complex>> {
    delimited(
        pair(tag_no_case(name), char('(')),
        selector_list,
        char(')'),
    )(input)
}

/// `name(<an+b>)`
fn nth_function<'a>(name: &'static str, input: &'a str) -> ParseResult<'a, (i64, i64)> {
    delimited(
        tuple((tag_no_case(name), char('('), multispace0)),
        nth_expression,
        pair(multispace0, char(')')),
    )(input)
}

fn nth_expression(input: &str) -> ParseResult<'_, (i64, i64)> {
    alt((
        value((2, 1), tag_no_case("odd")),
        value((2, 0), tag_no_case("even")),
        pair(
            terminated(coefficient, tag_no_case("n")),
            map(
                opt(tuple((multispace0, one_of("+-"), multispace0, integer))),
                |offset| match offset {
                    Some((_, '-', _, b)) => -b,
                    Some((_, _, _, b)) => b,
                    None => 0,
                },
            ),
        ),
        map(signed_integer, |b| (0, b)),
    ))(input)
}

/// The `a` in `an+b`: empty or `+` is 1, `-` is -1
fn coefficient(input: &str) -> ParseResult<'_, i64> {
    map_res(
        recognize(pair(opt(one_of("+-")), opt(digit1))),
        |raw: &str| match raw {
            "" | "+" => Ok(1),
            "-" => Ok(-1),
            _ => raw.parse::<i64>(),
        },
    )(input)
}

fn integer(input: &str) -> ParseResult<'_, i64> {
    map_res(digit1, str::parse::<i64>)(input)
}

fn signed_integer(input: &str) -> ParseResult<'_, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse::<i64>)(input)
}

fn ident(input: &str) -> ParseResult<'_, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}
