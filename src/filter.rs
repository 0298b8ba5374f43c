//! Filter expressions for the VNDB query language.
//!
//! A [`Filter`] is a tree of comparisons combined with `and`/`or`. It is
//! only ever produced by the builder functions in this module, which check
//! their input and never emit a combinator with a single child:
//!
//! ```
//! use vndb_kana::filter;
//! use serde_json::json;
//!
//! let f = filter::and([
//!     filter::language("en")?,
//!     filter::rating_between(80..=95)?,
//! ])?;
//!
//! assert_eq!(
//!     f.to_json(),
//!     json!(["and", ["lang", "=", "en"], ["and", ["rating", ">=", 80], ["rating", "<=", 95]]])
//! );
//! # Ok::<(), vndb_kana::Error>(())
//! ```
//!
//! Filters serialize to the nested array form the API expects:
//! `[field, operator, value]` for a comparison and `["and", ...]` /
//! `["or", ...]` for combinators.

use crate::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::str::FromStr;

/// Comparison operators understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl Operator {
    /// All six operators.
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Ge,
        Operator::Lt,
        Operator::Le,
    ];

    /// The operator's symbol as it appears in a serialized filter.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                Error::validation(format!(
                    "unsupported operator '{}', expected one of = != > >= < <=",
                    s
                ))
            })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single literal value inside a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// JSON `null`
    Null,
    /// A boolean
    Bool(bool),
    /// An integer
    Int(i64),
    /// A floating point number; must be finite
    Float(f64),
    /// A string
    String(String),
}

impl Scalar {
    fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) | Scalar::Float(_) => "number",
            Scalar::String(_) => "string",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => json!(i),
            Scalar::Float(f) => json!(f),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

/// A tag or trait reference with spoiler and level bounds, serialized as
/// `[id, max_spoiler, min_level]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagLevel {
    /// Tag (`g…`) or trait (`i…`) id
    pub id: String,
    /// Highest spoiler level to include, 0 to 2
    pub max_spoiler: u8,
    /// Lowest tag/trait level to match, 0 to 3
    pub min_level: f64,
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single literal.
    Scalar(Scalar),
    /// Literals of one kind.
    List(Vec<Scalar>),
    /// A filter applied to a related entity, e.g. a VN's developer.
    Nested(Box<Filter>),
    /// A tag/trait with spoiler and level bounds.
    Level(TagLevel),
}

impl FilterValue {
    fn to_json(&self) -> Value {
        match self {
            FilterValue::Scalar(scalar) => scalar.to_json(),
            FilterValue::List(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
            FilterValue::Nested(filter) => filter.to_json(),
            FilterValue::Level(level) => json!([level.id, level.max_spoiler, level.min_level]),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            FilterValue::Scalar(scalar) => validate_scalar(scalar),
            FilterValue::List(items) => {
                for item in items {
                    validate_scalar(item)?;
                }
                if let Some(first) = items.first() {
                    if let Some(other) = items.iter().find(|item| item.kind() != first.kind()) {
                        return Err(Error::validation(format!(
                            "list values must share one type, found {} and {}",
                            first.kind(),
                            other.kind()
                        )));
                    }
                }
                Ok(())
            }
            FilterValue::Nested(_) => Ok(()),
            FilterValue::Level(level) => {
                if level.id.trim().is_empty() {
                    return Err(Error::validation("tag/trait id must not be empty"));
                }
                if level.max_spoiler > 2 {
                    return Err(Error::validation(format!(
                        "max spoiler level must be 0, 1 or 2, got {}",
                        level.max_spoiler
                    )));
                }
                if !(0.0..=3.0).contains(&level.min_level) {
                    return Err(Error::validation(format!(
                        "minimum level must be between 0 and 3, got {}",
                        level.min_level
                    )));
                }
                Ok(())
            }
        }
    }
}

fn validate_scalar(scalar: &Scalar) -> Result<()> {
    match scalar {
        Scalar::Float(f) if !f.is_finite() => Err(Error::validation(format!(
            "filter values must be finite numbers, got {}",
            f
        ))),
        _ => Ok(()),
    }
}

macro_rules! impl_scalar_from {
    ($($ty:ty => |$v:ident| $expr:expr),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from($v: $ty) -> Self {
                    $expr
                }
            }

            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

impl_scalar_from! {
    bool => |v| Scalar::Bool(v),
    u8 => |v| Scalar::Int(i64::from(v)),
    u16 => |v| Scalar::Int(i64::from(v)),
    u32 => |v| Scalar::Int(i64::from(v)),
    i32 => |v| Scalar::Int(i64::from(v)),
    i64 => |v| Scalar::Int(v),
    f32 => |v| Scalar::Float(f64::from(v)),
    f64 => |v| Scalar::Float(v),
    &str => |v| Scalar::String(v.to_string()),
    String => |v| Scalar::String(v),
    &String => |v| Scalar::String(v.clone()),
    () => |_v| Scalar::Null,
}

impl From<Scalar> for FilterValue {
    fn from(scalar: Scalar) -> Self {
        FilterValue::Scalar(scalar)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Filter> for FilterValue {
    fn from(filter: Filter) -> Self {
        FilterValue::Nested(Box::new(filter))
    }
}

impl From<TagLevel> for FilterValue {
    fn from(level: TagLevel) -> Self {
        FilterValue::Level(level)
    }
}

/// A validated filter expression.
///
/// Build one with the functions in this module; inspect it with
/// [`Filter::kind`]. Filters compare by structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    node: Node,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Comparison {
        field: String,
        operator: Operator,
        value: FilterValue,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// A borrowed view of a filter's top-level shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind<'a> {
    /// `[field, operator, value]`
    Comparison {
        /// The field being compared
        field: &'a str,
        /// The comparison operator
        operator: Operator,
        /// The right-hand side
        value: &'a FilterValue,
    },
    /// `["and", ...]`, always at least two children
    And(&'a [Filter]),
    /// `["or", ...]`, always at least two children
    Or(&'a [Filter]),
}

impl Filter {
    /// Returns the filter's top-level shape.
    pub fn kind(&self) -> FilterKind<'_> {
        match &self.node {
            Node::Comparison {
                field,
                operator,
                value,
            } => FilterKind::Comparison {
                field,
                operator: *operator,
                value,
            },
            Node::And(children) => FilterKind::And(children),
            Node::Or(children) => FilterKind::Or(children),
        }
    }

    /// Converts the filter into the nested JSON array form sent to the API.
    pub fn to_json(&self) -> Value {
        match &self.node {
            Node::Comparison {
                field,
                operator,
                value,
            } => json!([field, operator.as_str(), value.to_json()]),
            Node::And(children) => combinator_json("and", children),
            Node::Or(children) => combinator_json("or", children),
        }
    }
}

fn combinator_json(tag: &str, children: &[Filter]) -> Value {
    let mut items = Vec::with_capacity(children.len() + 1);
    items.push(Value::String(tag.to_string()));
    items.extend(children.iter().map(Filter::to_json));
    Value::Array(items)
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Builds a comparison from an operator symbol.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `field` is blank, `operator` is not one
/// of `= != > >= < <=`, or the value is malformed (mixed-type list,
/// non-finite number, out-of-range tag level).
///
/// # Examples
///
/// ```
/// use vndb_kana::filter::comparison;
/// use serde_json::json;
///
/// let f = comparison("votecount", ">=", 100)?;
/// assert_eq!(f.to_json(), json!(["votecount", ">=", 100]));
///
/// assert!(comparison("votecount", "=>", 100).is_err());
/// # Ok::<(), vndb_kana::Error>(())
/// ```
pub fn comparison(
    field: impl Into<String>,
    operator: &str,
    value: impl Into<FilterValue>,
) -> Result<Filter> {
    compare(field, operator.parse()?, value)
}

/// Builds a comparison from a typed [`Operator`].
pub fn compare(
    field: impl Into<String>,
    operator: Operator,
    value: impl Into<FilterValue>,
) -> Result<Filter> {
    let field = field.into();
    if field.trim().is_empty() {
        return Err(Error::validation("filter field must not be empty"));
    }

    let value = value.into();
    value.validate()?;

    Ok(Filter {
        node: Node::Comparison {
            field,
            operator,
            value,
        },
    })
}

/// `[field, "=", value]`
pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Result<Filter> {
    compare(field, Operator::Eq, value)
}

/// `[field, "!=", value]`
pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Result<Filter> {
    compare(field, Operator::Ne, value)
}

/// `[field, ">", value]`
pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Result<Filter> {
    compare(field, Operator::Gt, value)
}

/// `[field, ">=", value]`
pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Result<Filter> {
    compare(field, Operator::Ge, value)
}

/// `[field, "<", value]`
pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Result<Filter> {
    compare(field, Operator::Lt, value)
}

/// `[field, "<=", value]`
pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Result<Filter> {
    compare(field, Operator::Le, value)
}

/// Combines filters so that all must match.
///
/// A single filter is returned unchanged; two or more are wrapped in
/// `["and", ...]` in the order given.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `children` is empty.
pub fn and(children: impl IntoIterator<Item = Filter>) -> Result<Filter> {
    combine("and", children, Node::And)
}

/// Combines filters so that any may match.
///
/// A single filter is returned unchanged; two or more are wrapped in
/// `["or", ...]` in the order given.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `children` is empty.
pub fn or(children: impl IntoIterator<Item = Filter>) -> Result<Filter> {
    combine("or", children, Node::Or)
}

fn combine(
    tag: &str,
    children: impl IntoIterator<Item = Filter>,
    wrap: fn(Vec<Filter>) -> Node,
) -> Result<Filter> {
    let mut children: Vec<Filter> = children.into_iter().collect();
    match children.len() {
        0 => Err(Error::validation(format!(
            "'{}' needs at least one filter",
            tag
        ))),
        1 => Ok(children.remove(0)),
        _ => Ok(Filter {
            node: wrap(children),
        }),
    }
}

/// Matches any of `values` on `field`, as an `or` of equality comparisons.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `values` is empty.
pub fn any_of<I, V>(field: &str, values: I) -> Result<Filter>
where
    I: IntoIterator<Item = V>,
    V: Into<FilterValue>,
{
    let comparisons = values
        .into_iter()
        .map(|value| eq(field, value))
        .collect::<Result<Vec<_>>>()?;
    if comparisons.is_empty() {
        return Err(Error::validation(format!(
            "no values given for '{}'",
            field
        )));
    }
    or(comparisons)
}

/// Matches one entity by id: `["id", "=", id]`.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `id` is blank.
pub fn by_id(id: impl Into<String>) -> Result<Filter> {
    let id = id.into();
    if id.trim().is_empty() {
        return Err(Error::validation("id must not be empty"));
    }
    eq("id", id)
}

/// Matches any of several ids.
///
/// One id gives the same filter as [`by_id`]; more give an `or` of id
/// comparisons in input order.
///
/// # Errors
///
/// Returns [`Error::Validation`] when no ids are given or any id is blank.
///
/// # Examples
///
/// ```
/// use vndb_kana::filter::by_ids;
/// use serde_json::json;
///
/// let f = by_ids(["v17", "v11"])?;
/// assert_eq!(f.to_json(), json!(["or", ["id", "=", "v17"], ["id", "=", "v11"]]));
/// # Ok::<(), vndb_kana::Error>(())
/// ```
pub fn by_ids<I, S>(ids: I) -> Result<Filter>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let filters = ids
        .into_iter()
        .map(by_id)
        .collect::<Result<Vec<_>>>()?;
    if filters.is_empty() {
        return Err(Error::validation("at least one id is required"));
    }
    or(filters)
}

/// Bounds `field` by a Rust range.
///
/// Inclusive ends become `>=`/`<=`, exclusive ends `>`/`<`, and missing ends
/// are left out. A range with a single bound yields a bare comparison.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unbounded range (`..`).
///
/// # Examples
///
/// ```
/// use vndb_kana::filter::by_range;
/// use serde_json::json;
///
/// let f = by_range("rating", 80..=95)?;
/// assert_eq!(f.to_json(), json!(["and", ["rating", ">=", 80], ["rating", "<=", 95]]));
///
/// let f = by_range("rating", 80..)?;
/// assert_eq!(f.to_json(), json!(["rating", ">=", 80]));
/// # Ok::<(), vndb_kana::Error>(())
/// ```
pub fn by_range<T, R>(field: &str, range: R) -> Result<Filter>
where
    T: Clone + Into<Scalar>,
    R: RangeBounds<T>,
{
    let mut bounds = Vec::with_capacity(2);

    match range.start_bound() {
        Bound::Included(min) => bounds.push(compare(field, Operator::Ge, scalar(min))?),
        Bound::Excluded(min) => bounds.push(compare(field, Operator::Gt, scalar(min))?),
        Bound::Unbounded => {}
    }
    match range.end_bound() {
        Bound::Included(max) => bounds.push(compare(field, Operator::Le, scalar(max))?),
        Bound::Excluded(max) => bounds.push(compare(field, Operator::Lt, scalar(max))?),
        Bound::Unbounded => {}
    }

    if bounds.is_empty() {
        return Err(Error::validation(format!(
            "range on '{}' needs a lower or upper bound",
            field
        )));
    }
    and(bounds)
}

fn scalar<T: Clone + Into<Scalar>>(value: &T) -> Scalar {
    value.clone().into()
}

/// Full-text search: `["search", "=", query]`.
pub fn search(query: &str) -> Result<Filter> {
    if query.trim().is_empty() {
        return Err(Error::validation("search query must not be empty"));
    }
    eq("search", query)
}

/// Available in a language, e.g. `"en"`.
pub fn language(lang: &str) -> Result<Filter> {
    eq("lang", lang)
}

/// Originally written in a language, e.g. `"ja"`.
pub fn original_language(lang: &str) -> Result<Filter> {
    eq("olang", lang)
}

/// Available on a platform, e.g. `"win"`.
pub fn platform(platform: &str) -> Result<Filter> {
    eq("platform", platform)
}

/// Has a tag, e.g. `"g505"`.
pub fn tag(id: &str) -> Result<Filter> {
    eq("tag", id)
}

/// Has a tag at or above `min_level`, counting spoilers up to `max_spoiler`.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `max_spoiler > 2` or `min_level` is
/// outside `0.0..=3.0`.
pub fn tag_at_level(id: &str, max_spoiler: u8, min_level: f64) -> Result<Filter> {
    eq("tag", level(id, max_spoiler, min_level))
}

/// Has a character trait, e.g. `"i35"`.
pub fn has_trait(id: &str) -> Result<Filter> {
    eq("trait", id)
}

/// Has a character trait, with spoiler and level bounds like [`tag_at_level`].
pub fn trait_at_level(id: &str, max_spoiler: u8, min_level: f64) -> Result<Filter> {
    eq("trait", level(id, max_spoiler, min_level))
}

fn level(id: &str, max_spoiler: u8, min_level: f64) -> TagLevel {
    TagLevel {
        id: id.to_string(),
        max_spoiler,
        min_level,
    }
}

/// Developed by a producer matching `producer`.
///
/// ```
/// use vndb_kana::filter::{developer, search};
/// use serde_json::json;
///
/// let f = developer(search("key")?)?;
/// assert_eq!(f.to_json(), json!(["developer", "=", ["search", "=", "key"]]));
/// # Ok::<(), vndb_kana::Error>(())
/// ```
pub fn developer(producer: Filter) -> Result<Filter> {
    eq("developer", producer)
}

/// Released within a date range; dates use the API's `YYYY-MM-DD` form.
pub fn released_between<'a, R>(range: R) -> Result<Filter>
where
    R: RangeBounds<&'a str>,
{
    by_range("released", range)
}

/// Bayesian rating within a range, on the API's 10–100 scale.
pub fn rating_between<R>(range: R) -> Result<Filter>
where
    R: RangeBounds<u32>,
{
    by_range("rating", range)
}

/// Length category, 1 (very short) to 5 (very long).
pub fn length(category: u8) -> Result<Filter> {
    if !(1..=5).contains(&category) {
        return Err(Error::validation(format!(
            "length category must be between 1 and 5, got {}",
            category
        )));
    }
    eq("length", category)
}

/// Picks a random entry; only meaningful on the quote endpoint.
pub fn random() -> Result<Filter> {
    eq("random", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vn(id: &str) -> Filter {
        by_id(id).unwrap()
    }

    #[test]
    fn test_comparison_serializes_as_triple() {
        let f = comparison("lang", "=", "en").unwrap();
        assert_eq!(f.to_json(), json!(["lang", "=", "en"]));

        let f = comparison("has_description", "=", true).unwrap();
        assert_eq!(f.to_json(), json!(["has_description", "=", true]));

        let f = comparison("minage", "=", ()).unwrap();
        assert_eq!(f.to_json(), json!(["minage", "=", null]));
    }

    #[test]
    fn test_comparison_rejects_bad_input() {
        assert!(matches!(comparison("", "=", 1), Err(Error::Validation(_))));
        assert!(matches!(comparison("   ", "=", 1), Err(Error::Validation(_))));
        assert!(matches!(comparison("id", "==", 1), Err(Error::Validation(_))));
        assert!(matches!(comparison("id", "~", 1), Err(Error::Validation(_))));
        assert!(matches!(
            comparison("rating", ">", f64::NAN),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_every_operator_round_trips_through_str() {
        for op in Operator::ALL {
            let f = comparison("votecount", op.as_str(), 10).unwrap();
            assert!(matches!(f.kind(), FilterKind::Comparison { operator, .. } if operator == op));
        }
    }

    #[test]
    fn test_list_values_must_be_homogeneous() {
        let f = comparison("id", "=", vec!["v1", "v2"]).unwrap();
        assert_eq!(f.to_json(), json!(["id", "=", ["v1", "v2"]]));

        // Integers and floats are both numbers.
        let mixed_numbers = FilterValue::List(vec![Scalar::Int(1), Scalar::Float(1.5)]);
        assert!(comparison("rating", "=", mixed_numbers).is_ok());

        let mixed = FilterValue::List(vec![Scalar::from("v1"), Scalar::from(2)]);
        assert!(matches!(comparison("id", "=", mixed), Err(Error::Validation(_))));
    }

    #[test]
    fn test_combinators_keep_input_order() {
        let children = vec![vn("v3"), vn("v1"), vn("v2")];
        let f = and(children.clone()).unwrap();

        match f.kind() {
            FilterKind::And(got) => assert_eq!(got, children.as_slice()),
            other => panic!("expected and, got {:?}", other),
        }

        let f = or(children.clone()).unwrap();
        assert_eq!(
            f.to_json(),
            json!(["or", ["id", "=", "v3"], ["id", "=", "v1"], ["id", "=", "v2"]])
        );
    }

    #[test]
    fn test_single_child_collapses() {
        assert_eq!(and([vn("v17")]).unwrap(), vn("v17"));
        assert_eq!(or([vn("v17")]).unwrap(), vn("v17"));
    }

    #[test]
    fn test_empty_combinators_fail() {
        assert!(matches!(and(Vec::new()), Err(Error::Validation(_))));
        assert!(matches!(or(Vec::new()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_nested_combinators() {
        let f = and([
            or([language("en").unwrap(), language("de").unwrap()]).unwrap(),
            platform("win").unwrap(),
        ])
        .unwrap();
        assert_eq!(
            f.to_json(),
            json!(["and", ["or", ["lang", "=", "en"], ["lang", "=", "de"]], ["platform", "=", "win"]])
        );
    }

    #[test]
    fn test_by_id_and_by_ids() {
        assert_eq!(by_id("v17").unwrap().to_json(), json!(["id", "=", "v17"]));
        assert_eq!(by_ids(["v17"]).unwrap(), by_id("v17").unwrap());
        assert_eq!(
            by_ids(vec!["v17".to_string(), "v11".to_string()])
                .unwrap()
                .to_json(),
            json!(["or", ["id", "=", "v17"], ["id", "=", "v11"]])
        );

        assert!(matches!(by_ids(Vec::<String>::new()), Err(Error::Validation(_))));
        assert!(matches!(by_id(""), Err(Error::Validation(_))));
        assert!(matches!(by_ids(["v1", ""]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_by_range_bounds() {
        assert_eq!(
            by_range("rating", 80..=95).unwrap().to_json(),
            json!(["and", ["rating", ">=", 80], ["rating", "<=", 95]])
        );
        assert_eq!(
            by_range("rating", 80..).unwrap().to_json(),
            json!(["rating", ">=", 80])
        );
        assert_eq!(
            by_range("rating", ..=95).unwrap().to_json(),
            json!(["rating", "<=", 95])
        );
        assert_eq!(
            by_range("votecount", 10..20).unwrap().to_json(),
            json!(["and", ["votecount", ">=", 10], ["votecount", "<", 20]])
        );
        assert!(matches!(
            by_range::<i64, _>("rating", ..),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_released_between_uses_dates() {
        let f = released_between("2020-01-01".."2021-01-01").unwrap();
        assert_eq!(
            f.to_json(),
            json!(["and", ["released", ">=", "2020-01-01"], ["released", "<", "2021-01-01"]])
        );
    }

    #[test]
    fn test_tag_levels() {
        assert_eq!(
            tag_at_level("g505", 0, 1.2).unwrap().to_json(),
            json!(["tag", "=", ["g505", 0, 1.2]])
        );
        assert_eq!(
            trait_at_level("i35", 2, 0.0).unwrap().to_json(),
            json!(["trait", "=", ["i35", 2, 0.0]])
        );
        assert!(tag_at_level("g505", 3, 1.0).is_err());
        assert!(tag_at_level("g505", 0, 3.5).is_err());
        assert!(tag_at_level("", 0, 1.0).is_err());
    }

    #[test]
    fn test_convenience_builders() {
        assert_eq!(search("steins").unwrap().to_json(), json!(["search", "=", "steins"]));
        assert!(search("  ").is_err());
        assert_eq!(original_language("ja").unwrap().to_json(), json!(["olang", "=", "ja"]));
        assert_eq!(tag("g505").unwrap().to_json(), json!(["tag", "=", "g505"]));
        assert_eq!(has_trait("i35").unwrap().to_json(), json!(["trait", "=", "i35"]));
        assert_eq!(length(3).unwrap().to_json(), json!(["length", "=", 3]));
        assert!(length(0).is_err());
        assert!(length(6).is_err());
        assert_eq!(random().unwrap().to_json(), json!(["random", "=", 1]));
        assert_eq!(
            any_of("platform", ["win", "lin"]).unwrap().to_json(),
            json!(["or", ["platform", "=", "win"], ["platform", "=", "lin"]])
        );
        assert!(any_of("platform", Vec::<&str>::new()).is_err());
    }

    #[test]
    fn test_builders_are_deterministic() {
        let build = || {
            and([
                developer(search("key").unwrap()).unwrap(),
                rating_between(70..).unwrap(),
            ])
            .unwrap()
        };
        assert_eq!(build(), build());
        assert_eq!(build().to_string(), build().to_string());
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let f = and([vn("v1"), language("en").unwrap()]).unwrap();
        assert_eq!(serde_json::to_value(&f).unwrap(), f.to_json());
        assert_eq!(
            f.to_string(),
            r#"["and",["id","=","v1"],["lang","=","en"]]"#
        );
    }
}
