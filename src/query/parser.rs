//! Filter Expression Parser
//!
//! Parses the compact filter syntax typed into a search box or passed on the
//! command line into a [`FilterSpec`] and optional [`SortSpec`].
//!
//! # Supported Syntax
//!
//! ```text
//! status:<value>            priority:<value>
//! min:<n>  max:<n>          amount:<min>..<max>   (either side may be empty)
//! date:<from>..<to>         dates are YYYY-MM-DD, now, or now-<n>d|w|m
//! sort:<field>  sort:-<field>
//! "quoted text"  bare words (joined into the text search)
//! ```
//!
//! # Examples
//!
//! ```text
//! status:pending priority:high
//! amount:100..500 sort:-total
//! date:now-30d..now "jane cooper"
//! ```

use chrono::{Days, NaiveDate, Utc};
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, verify},
    multi::many0,
    sequence::{delimited, preceded, separated_pair},
    IResult,
};
use regex::Regex;

use super::error::{QueryError, QueryResult};
use super::filter::{DateRange, FilterSpec};
use super::sort::SortSpec;

/// A parsed filter expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    pub filter: FilterSpec,
    pub sort: Option<SortSpec>,
}

/// One whitespace-separated term
#[derive(Debug, Clone, PartialEq)]
enum Term<'a> {
    Keyed(&'a str, &'a str),
    Text(&'a str),
}

/// Parse a filter expression relative to today's date
pub fn parse_filter_expression(input: &str) -> QueryResult<FilterQuery> {
    parse_filter_expression_at(input, Utc::now().date_naive())
}

/// Parse a filter expression with an explicit "today" for relative dates
pub fn parse_filter_expression_at(input: &str, today: NaiveDate) -> QueryResult<FilterQuery> {
    let terms = match parse_terms(input) {
        Ok((remaining, terms)) => {
            if !remaining.trim().is_empty() {
                return Err(QueryError::Parse(format!(
                    "Unexpected input: '{}'",
                    remaining.trim()
                )));
            }
            terms
        }
        Err(e) => return Err(QueryError::Parse(format!("{:?}", e))),
    };

    let mut query = FilterQuery::default();
    let mut search = Vec::new();

    for term in terms {
        match term {
            Term::Text(text) => search.push(text),
            Term::Keyed(key, value) => apply_keyed(&mut query, key, value, today)?,
        }
    }

    let search = search.join(" ");
    if !search.trim().is_empty() {
        query.filter.search = Some(search.trim().to_string());
    }

    Ok(query)
}

fn apply_keyed(query: &mut FilterQuery, key: &str, value: &str, today: NaiveDate) -> QueryResult<()> {
    let key = key.to_lowercase();
    match key.as_str() {
        "status" => query.filter.status = Some(value.to_lowercase()),
        "priority" => query.filter.priority = Some(value.to_lowercase()),
        "min" => query.filter.min_amount = Some(parse_number(&key, value)?),
        "max" => query.filter.max_amount = Some(parse_number(&key, value)?),
        "amount" => {
            let (min, max) = split_range(&key, value)?;
            if !min.is_empty() {
                query.filter.min_amount = Some(parse_number(&key, min)?);
            }
            if !max.is_empty() {
                query.filter.max_amount = Some(parse_number(&key, max)?);
            }
        }
        "date" => {
            let (start, end) = split_range(&key, value)?;
            query.filter.date_range = DateRange::new(
                parse_date_bound(start, today)?,
                parse_date_bound(end, today)?,
            );
        }
        "sort" => {
            query.sort = Some(match value.strip_prefix('-') {
                Some(field) if !field.is_empty() => SortSpec::desc(field),
                None if !value.is_empty() => SortSpec::asc(value),
                _ => {
                    return Err(QueryError::InvalidValue {
                        key: key.clone(),
                        value: value.to_string(),
                    })
                }
            });
        }
        _ => return Err(QueryError::Parse(format!("Unknown filter key: {}", key))),
    }
    Ok(())
}

fn parse_number(key: &str, value: &str) -> QueryResult<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| QueryError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn split_range<'a>(key: &str, value: &'a str) -> QueryResult<(&'a str, &'a str)> {
    value.split_once("..").ok_or_else(|| QueryError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse `YYYY-MM-DD`, `now` or `now-<n><d|w|m>`
fn parse_date_bound(s: &str, today: NaiveDate) -> QueryResult<NaiveDate> {
    if s.eq_ignore_ascii_case("now") || s.eq_ignore_ascii_case("today") {
        return Ok(today);
    }

    let re = Regex::new(r"^now-(\d+)([dwm])$")
        .map_err(|e| QueryError::Parse(format!("Regex error: {}", e)))?;

    if let Some(caps) = re.captures(&s.to_lowercase()) {
        let invalid = || QueryError::InvalidDate(s.to_string());
        let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
        let days = match &caps[2] {
            "d" => Some(amount),
            "w" => amount.checked_mul(7),
            "m" => amount.checked_mul(30),
            _ => None,
        };
        return days
            .and_then(|days| today.checked_sub_days(Days::new(days)))
            .ok_or_else(invalid);
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| QueryError::InvalidDate(s.to_string()))
}

/// Parse every term of the expression
fn parse_terms(input: &str) -> IResult<&str, Vec<Term<'_>>> {
    let (input, terms) = many0(preceded(multispace0, parse_term))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, terms))
}

fn parse_term(input: &str) -> IResult<&str, Term<'_>> {
    alt((parse_keyed_term, parse_quoted_term, parse_bare_term))(input)
}

/// Parse `key:value` for a known key
fn parse_keyed_term(input: &str) -> IResult<&str, Term<'_>> {
    map(
        separated_pair(
            alt((
                tag_no_case("status"),
                tag_no_case("priority"),
                tag_no_case("min"),
                tag_no_case("max"),
                tag_no_case("amount"),
                tag_no_case("date"),
                tag_no_case("sort"),
            )),
            char(':'),
            take_while1(|c: char| !c.is_whitespace()),
        ),
        |(key, value)| Term::Keyed(key, value),
    )(input)
}

/// Parse `"quoted text"`
fn parse_quoted_term(input: &str) -> IResult<&str, Term<'_>> {
    map(
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        Term::Text,
    )(input)
}

/// Parse a bare word; a lone opening quote is not a word
fn parse_bare_term(input: &str) -> IResult<&str, Term<'_>> {
    map(
        verify(take_while1(|c: char| !c.is_whitespace()), |s: &str| {
            !s.starts_with('"')
        }),
        Term::Text,
    )(input)
}
