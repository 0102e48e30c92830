//! The slice of OData `$filter` / `$top` the goal service understands.
//!
//! Supported clauses, joined with `and`:
//!
//! - `field eq 'v'`, `field ne 'v'`
//! - `substringof('v',field)` (v2) or `contains(field,'v')` (v4)
//! - `startswith(field,'v')`
//!
//! over the fields `userId`, `category`, `name` and `state`. Clauses may be
//! grouped in parentheses. String literals use OData quoting (`''` for an
//! embedded quote).

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{alpha1, alphanumeric1, char, multispace0, multispace1, none_of},
    combinator::{all_consuming, map, recognize, value},
    multi::{fold_many0, many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};

use crate::error::{Result, SignupError};
use crate::types::Goal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalField {
    UserId,
    Category,
    Name,
    State,
}

impl GoalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserId => "userId",
            Self::Category => "category",
            Self::Name => "name",
            Self::State => "state",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "userId" => Ok(Self::UserId),
            "category" => Ok(Self::Category),
            "name" => Ok(Self::Name),
            "state" => Ok(Self::State),
            other => Err(SignupError::InvalidInput(format!(
                "unsupported filter field '{other}'"
            ))),
        }
    }

    fn value<'g>(&self, goal: &'g Goal) -> &'g str {
        match self {
            Self::UserId => &goal.user_id,
            Self::Category => &goal.category,
            Self::Name => &goal.name,
            Self::State => &goal.state,
        }
    }
}

impl fmt::Display for GoalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalFilter {
    Eq(GoalField, String),
    Ne(GoalField, String),
    Contains(GoalField, String),
    StartsWith(GoalField, String),
}

impl GoalFilter {
    pub fn eq(field: GoalField, value: impl Into<String>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn ne(field: GoalField, value: impl Into<String>) -> Self {
        Self::Ne(field, value.into())
    }

    pub fn contains(field: GoalField, value: impl Into<String>) -> Self {
        Self::Contains(field, value.into())
    }

    pub fn starts_with(field: GoalField, value: impl Into<String>) -> Self {
        Self::StartsWith(field, value.into())
    }

    pub fn matches(&self, goal: &Goal) -> bool {
        match self {
            Self::Eq(field, v) => field.value(goal) == v,
            Self::Ne(field, v) => field.value(goal) != v,
            Self::Contains(field, v) => field.value(goal).contains(v.as_str()),
            Self::StartsWith(field, v) => field.value(goal).starts_with(v.as_str()),
        }
    }

    fn to_odata(&self) -> String {
        match self {
            Self::Eq(field, v) => format!("{field} eq {}", quote(v)),
            Self::Ne(field, v) => format!("{field} ne {}", quote(v)),
            Self::Contains(field, v) => format!("substringof({},{field})", quote(v)),
            Self::StartsWith(field, v) => format!("startswith({field},{})", quote(v)),
        }
    }
}

/// A goal list request: conjunctive filters plus a page size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalQuery {
    pub filters: Vec<GoalFilter>,
    pub top: Option<usize>,
}

impl GoalQuery {
    /// Page size when the request gives none.
    pub const DEFAULT_TOP: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self::new().filter(GoalFilter::eq(GoalField::UserId, user_id))
    }

    pub fn filter(mut self, filter: GoalFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn limit(&self) -> usize {
        self.top.unwrap_or(Self::DEFAULT_TOP)
    }

    /// The user an `userId eq` clause pins the query to, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.filters.iter().find_map(|f| match f {
            GoalFilter::Eq(GoalField::UserId, v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn matches(&self, goal: &Goal) -> bool {
        self.filters.iter().all(|f| f.matches(goal))
    }

    /// `$filter` value, or `None` when the query has no filters.
    pub fn to_odata_filter(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self.filters.iter().map(GoalFilter::to_odata).collect();
        Some(clauses.join(" and "))
    }

    /// Build a query from raw `$filter` / `$top` values.
    pub fn from_odata(filter: Option<&str>, top: Option<&str>) -> Result<Self> {
        let filters = match filter.map(str::trim) {
            Some(f) if !f.is_empty() => parse_filter(f)?,
            _ => Vec::new(),
        };
        let top = top
            .map(|t| {
                t.trim()
                    .parse::<usize>()
                    .map_err(|_| SignupError::InvalidInput(format!("invalid $top '{t}'")))
            })
            .transpose()?;
        Ok(Self { filters, top })
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// ── $filter grammar ───────────────────────────────────────────
//
//   conjunction = term *( "and" term )
//   term        = "(" conjunction ")" / call / comparison
//   call        = "substringof(" literal "," field ")"
//               / ( "contains" / "startswith" ) "(" field "," literal ")"
//   comparison  = field ( "eq" / "ne" ) literal
//
// Only conjunctions exist, so groups flatten into one clause list.

type Parsed<'a, T> = IResult<&'a str, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Contains,
    StartsWith,
}

/// A clause whose field name has not been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause<'a> {
    op: Op,
    field: &'a str,
    value: String,
}

impl Clause<'_> {
    fn into_filter(self) -> Result<GoalFilter> {
        let field = GoalField::parse(self.field)?;
        Ok(match self.op {
            Op::Eq => GoalFilter::Eq(field, self.value),
            Op::Ne => GoalFilter::Ne(field, self.value),
            Op::Contains => GoalFilter::Contains(field, self.value),
            Op::StartsWith => GoalFilter::StartsWith(field, self.value),
        })
    }
}

fn parse_filter(filter: &str) -> Result<Vec<GoalFilter>> {
    let (_, clauses) = all_consuming(delimited(multispace0, conjunction, multispace0))(filter)
        .map_err(|err| {
            let near = match &err {
                nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
                nom::Err::Incomplete(_) => "",
            };
            SignupError::InvalidInput(format!("unsupported $filter '{filter}' near '{near}'"))
        })?;
    clauses.into_iter().map(Clause::into_filter).collect()
}

fn conjunction(input: &str) -> Parsed<'_, Vec<Clause<'_>>> {
    map(
        separated_list1(delimited(multispace1, tag_no_case("and"), multispace1), term),
        |groups| groups.into_iter().flatten().collect::<Vec<_>>(),
    )(input)
}

fn term(input: &str) -> Parsed<'_, Vec<Clause<'_>>> {
    alt((
        delimited(
            pair(char('('), multispace0),
            conjunction,
            pair(multispace0, char(')')),
        ),
        map(alt((call, comparison)), |clause| vec![clause]),
    ))(input)
}

fn call(input: &str) -> Parsed<'_, Clause<'_>> {
    alt((
        map(
            preceded(tag("substringof"), args(literal, field)),
            |(value, field)| Clause {
                op: Op::Contains,
                field,
                value,
            },
        ),
        map(
            preceded(tag("contains"), args(field, literal)),
            |(field, value)| Clause {
                op: Op::Contains,
                field,
                value,
            },
        ),
        map(
            preceded(tag("startswith"), args(field, literal)),
            |(field, value)| Clause {
                op: Op::StartsWith,
                field,
                value,
            },
        ),
    ))(input)
}

fn comparison(input: &str) -> Parsed<'_, Clause<'_>> {
    map(
        tuple((
            field,
            delimited(
                multispace1,
                alt((value(Op::Eq, tag("eq")), value(Op::Ne, tag("ne")))),
                multispace1,
            ),
            literal,
        )),
        |(field, op, value)| Clause { op, field, value },
    )(input)
}

/// `( first , second )`
fn args<'a, A, B>(
    first: impl FnMut(&'a str) -> Parsed<'a, A>,
    second: impl FnMut(&'a str) -> Parsed<'a, B>,
) -> impl FnMut(&'a str) -> Parsed<'a, (A, B)> {
    delimited(
        tuple((multispace0, char('('), multispace0)),
        separated_pair(first, tuple((multispace0, char(','), multispace0)), second),
        pair(multispace0, char(')')),
    )
}

fn field(input: &str) -> Parsed<'_, &str> {
    recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_"))))))(input)
}

/// `'...'`, with `''` standing for one quote.
fn literal(input: &str) -> Parsed<'_, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((none_of("'"), value('\'', tag("''")))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('\''),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GoalPermission, Results, LEARNING_CATEGORY, STATE_COMPLETED, STATE_ON_TRACK};

    fn goal(name: &str, category: &str, state: &str) -> Goal {
        Goal {
            id: 1,
            user_id: "alice".into(),
            name: name.into(),
            metric: None,
            category: category.into(),
            kind: None,
            flag: 0,
            weight: 0.0,
            done: 0.0,
            state: state.into(),
            start: None,
            due: None,
            permission_nav: GoalPermission { view: true },
            tasks: Results::default(),
        }
    }

    fn learning_query() -> GoalQuery {
        GoalQuery::for_user("alice")
            .filter(GoalFilter::eq(GoalField::Category, LEARNING_CATEGORY))
            .filter(GoalFilter::contains(GoalField::Name, "Learn something"))
            .filter(GoalFilter::ne(GoalField::State, STATE_COMPLETED))
    }

    #[test]
    fn renders_v2_syntax() {
        let q = GoalQuery::for_user("alice")
            .filter(GoalFilter::contains(GoalField::Name, "TechEd"))
            .filter(GoalFilter::starts_with(GoalField::Name, "ID00"));
        assert_eq!(
            q.to_odata_filter().unwrap(),
            "userId eq 'alice' and substringof('TechEd',name) and startswith(name,'ID00')"
        );
    }

    #[test]
    fn parses_what_it_renders() {
        let q = learning_query();
        let parsed = GoalQuery::from_odata(q.to_odata_filter().as_deref(), None).unwrap();
        assert_eq!(parsed, q);
    }

    #[test]
    fn and_inside_literal_is_not_a_separator() {
        let q = GoalQuery::from_odata(Some("category eq 'Learning and Growth'"), None).unwrap();
        assert_eq!(
            q.filters,
            vec![GoalFilter::eq(GoalField::Category, "Learning and Growth")]
        );
    }

    #[test]
    fn escaped_quote_round_trips() {
        let q = GoalQuery::for_user("o'brien");
        let rendered = q.to_odata_filter().unwrap();
        assert_eq!(rendered, "userId eq 'o''brien'");
        let parsed = GoalQuery::from_odata(Some(&rendered), None).unwrap();
        assert_eq!(parsed.user_id(), Some("o'brien"));
    }

    #[test]
    fn accepts_v4_contains() {
        let q = GoalQuery::from_odata(Some("contains(name,'Learn')"), Some("5")).unwrap();
        assert_eq!(q.filters, vec![GoalFilter::contains(GoalField::Name, "Learn")]);
        assert_eq!(q.limit(), 5);
    }

    #[test]
    fn accepts_parenthesized_clauses() {
        let q = GoalQuery::from_odata(
            Some("(userId eq 'alice') and (state ne 'Completed')"),
            None,
        )
        .unwrap();
        assert_eq!(
            q.filters,
            vec![
                GoalFilter::eq(GoalField::UserId, "alice"),
                GoalFilter::ne(GoalField::State, STATE_COMPLETED),
            ]
        );
    }

    #[test]
    fn nested_groups_flatten() {
        let q = GoalQuery::from_odata(
            Some(" ( ( userId eq 'alice' and startswith(name, 'ID00') ) AND substringof('Learn',name) ) "),
            None,
        )
        .unwrap();
        assert_eq!(
            q.filters,
            vec![
                GoalFilter::eq(GoalField::UserId, "alice"),
                GoalFilter::starts_with(GoalField::Name, "ID00"),
                GoalFilter::contains(GoalField::Name, "Learn"),
            ]
        );
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        assert!(GoalQuery::from_odata(Some("(userId eq 'alice'"), None).is_err());
        assert!(GoalQuery::from_odata(Some("userId eq 'alice')"), None).is_err());
    }

    #[test]
    fn empty_and_quote_only_literals() {
        let q = GoalQuery::from_odata(Some("name eq '' and userId eq ''''"), None).unwrap();
        assert_eq!(
            q.filters,
            vec![
                GoalFilter::eq(GoalField::Name, ""),
                GoalFilter::eq(GoalField::UserId, "'"),
            ]
        );
    }

    #[test]
    fn rejects_dangling_and() {
        assert!(GoalQuery::from_odata(Some("userId eq 'alice' and"), None).is_err());
    }

    #[test]
    fn default_top_is_100() {
        assert_eq!(GoalQuery::from_odata(None, None).unwrap().limit(), 100);
    }

    #[test]
    fn rejects_unknown_field() {
        let err = GoalQuery::from_odata(Some("owner eq 'x'"), None).unwrap_err();
        assert!(matches!(err, SignupError::InvalidInput(_)));
    }

    #[test]
    fn rejects_unquoted_literal() {
        assert!(GoalQuery::from_odata(Some("userId eq alice"), None).is_err());
    }

    #[test]
    fn rejects_bad_top() {
        assert!(GoalQuery::from_odata(None, Some("ten")).is_err());
    }

    #[test]
    fn matching_excludes_completed_and_other_categories() {
        let q = learning_query();
        assert!(q.matches(&goal("ID00: Learn something at TechEd 2023", LEARNING_CATEGORY, STATE_ON_TRACK)));
        assert!(!q.matches(&goal("ID00: Learn something at TechEd 2023", LEARNING_CATEGORY, STATE_COMPLETED)));
        assert!(!q.matches(&goal("ID00: Learn something at TechEd 2023", "Sales", STATE_ON_TRACK)));
        assert!(!q.matches(&goal("Something else", LEARNING_CATEGORY, STATE_ON_TRACK)));
    }
}
