//! Query shape checks
//!
//! A base query must be a plain SELECT query: an optional prologue, the SELECT
//! clause, optional dataset clauses and exactly one group pattern with nothing
//! after it. Solution modifiers on the outer query would clash with the
//! modifiers added for pagination, so they are rejected here rather than
//! producing a broken rewritten query later.

use std::ops::Range;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending, one_of, satisfy},
    combinator::{map, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use super::errors::QueryError;

/// The SELECT projection of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `select *`
    All,
    /// Projected variable names, without sigil
    Variables(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShape {
    pub distinct: bool,
    pub projection: Projection,
    /// Variables of the outer group pattern in first-appearance order
    pub pattern_variables: Vec<String>,
    /// Byte range from the SELECT keyword to the end of the projection
    pub select_clause: Range<usize>,
    /// Byte offset just past the closing brace of the outer group pattern
    pub pattern_end: usize,
}

impl QueryShape {
    /// Variables the query returns; for `select *` the pattern variables.
    pub fn projected_variables(&self) -> &[String] {
        match &self.projection {
            Projection::All => &self.pattern_variables,
            Projection::Variables(variables) => variables,
        }
    }

    /// `query` cut after its outer group pattern, dropping trailing comments
    /// and whitespace. `query` must be the text this shape was parsed from.
    pub fn up_to_pattern_end<'q>(&self, query: &'q str) -> &'q str {
        &query[..self.pattern_end]
    }
}

/// Parse `query` and reject shapes that cannot be paginated.
pub fn check_query(query: &str) -> Result<QueryShape, QueryError> {
    let shape = parse_query_shape(query)?;
    log::debug!(
        "Query passed shape check; projection: {:?}",
        shape.projected_variables()
    );
    Ok(shape)
}

/// Ordered variable names the query projects.
pub fn get_query_projection(query: &str) -> Result<Vec<String>, QueryError> {
    Ok(parse_query_shape(query)?.projected_variables().to_vec())
}

pub fn parse_query_shape(query: &str) -> Result<QueryShape, QueryError> {
    let offset = |rest: &str| query.len() - rest.len();

    let (rest, _) = prologue(query).map_err(|e| parse_error(e, "prologue"))?;
    let (rest, _) = skip(rest).map_err(|e| parse_error(e, "SELECT"))?;
    let select_start = offset(rest);

    let rest = match keyword("SELECT").parse(rest) {
        Ok((rest, _)) => rest,
        Err(_) => return Err(unsupported_form(rest)),
    };

    let (rest, modifier) = opt(preceded(skip, alt((keyword("DISTINCT"), keyword("REDUCED")))))
        .parse(rest)
        .map_err(|e| parse_error(e, "SELECT modifier"))?;

    let (rest, projection) = preceded(skip, projection)
        .parse(rest)
        .map_err(|e| parse_error(e, "projection"))?;
    let select_end = offset(rest);

    let (rest, _) = many0(ws(dataset_clause))
        .parse(rest)
        .map_err(|e| parse_error(e, "dataset clause"))?;

    let (rest, _) = opt(ws(keyword("WHERE")))
        .parse(rest)
        .map_err(|e| parse_error(e, "WHERE"))?;

    let (rest, body) = group_pattern(rest).map_err(|e| parse_error(e, "group pattern"))?;
    let pattern_end = offset(rest);

    let (rest, _) = skip(rest).map_err(|e| parse_error(e, "end of query"))?;
    if !rest.is_empty() {
        return Err(match solution_modifier(rest) {
            Ok((_, modifier)) => QueryError::unsupported(format!(
                "solution modifiers are not supported, found {}",
                modifier
            )),
            Err(_) => QueryError::Parse {
                message: format!("unexpected input after group pattern: '{}'", snippet(rest)),
            },
        });
    }

    Ok(QueryShape {
        distinct: modifier.is_some_and(|m| m.eq_ignore_ascii_case("DISTINCT")),
        projection,
        pattern_variables: pattern_variables(body),
        select_clause: select_start..select_end,
        pattern_end,
    })
}

fn parse_error(err: nom::Err<Error<&str>>, expected: &str) -> QueryError {
    let near = match &err {
        nom::Err::Error(e) | nom::Err::Failure(e) => snippet(e.input),
        nom::Err::Incomplete(_) => "",
    };
    QueryError::Parse {
        message: format!("expected {} near '{}'", expected, near),
    }
}

fn unsupported_form(input: &str) -> QueryError {
    let form = skip(input)
        .ok()
        .map(|(rest, _)| rest.split_whitespace().next().unwrap_or_default())
        .unwrap_or_default();

    match form.to_ascii_uppercase().as_str() {
        "" => QueryError::Parse {
            message: "query is empty".to_string(),
        },
        other @ ("ASK" | "CONSTRUCT" | "DESCRIBE" | "INSERT" | "DELETE" | "LOAD" | "CLEAR"
        | "DROP" | "CREATE" | "WITH") => {
            QueryError::unsupported(format!("only SELECT queries are applicable, got {}", other))
        }
        _ => QueryError::Parse {
            message: format!("expected SELECT near '{}'", snippet(input.trim_start())),
        },
    }
}

fn snippet(input: &str) -> &str {
    match input.char_indices().nth(40) {
        Some((end, _)) => &input[..end],
        None => input,
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whitespace and `#` comments.
fn skip(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((
        multispace1,
        recognize(pair(char('#'), not_line_ending)),
    ))))
    .parse(input)
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(skip, inner, skip)
}

/// Case-insensitive keyword not followed by a name character.
fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(tag_no_case(kw), not(satisfy(is_name_char)))
}

fn iri(input: &str) -> IResult<&str, &str> {
    delimited(
        char('<'),
        take_while(|c: char| c != '>' && !c.is_whitespace()),
        char('>'),
    )
    .parse(input)
}

fn prefix_decl(input: &str) -> IResult<&str, ()> {
    let pname_ns = recognize(pair(
        take_while(|c: char| is_name_char(c) || c == '-' || c == '.'),
        char(':'),
    ));
    value((), (keyword("PREFIX"), ws(pname_ns), iri)).parse(input)
}

fn base_decl(input: &str) -> IResult<&str, ()> {
    value((), pair(keyword("BASE"), ws(iri))).parse(input)
}

fn prologue(input: &str) -> IResult<&str, Vec<()>> {
    many0(ws(alt((prefix_decl, base_decl)))).parse(input)
}

fn variable(input: &str) -> IResult<&str, &str> {
    preceded(one_of("?$"), take_while1(is_name_char)).parse(input)
}

/// `(expression AS ?alias)`, yielding the alias.
fn aliased_expression(input: &str) -> IResult<&str, String> {
    let (rest, _) = char('(').parse(input)?;
    let end = balanced(rest, b'(', b')')
        .ok_or_else(|| nom::Err::Error(Error::new(input, ErrorKind::Char)))?;
    let inner = &rest[..end];

    let tokens: Vec<&str> = inner.split_whitespace().collect();
    match tokens.as_slice() {
        [.., as_kw, alias] if as_kw.eq_ignore_ascii_case("AS") => match variable(alias) {
            Ok(("", name)) => Ok((&rest[end + 1..], name.to_string())),
            _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
        },
        _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
    }
}

fn projection(input: &str) -> IResult<&str, Projection> {
    alt((
        value(Projection::All, char('*')),
        map(
            // leaves whitespace after the last item unconsumed
            many1(preceded(
                skip,
                alt((map(variable, str::to_string), aliased_expression)),
            )),
            Projection::Variables,
        ),
    ))
    .parse(input)
}

fn dataset_clause(input: &str) -> IResult<&str, &str> {
    preceded(pair(keyword("FROM"), opt(ws(keyword("NAMED")))), ws(iri)).parse(input)
}

/// `{ ... }`, yielding the text between the braces.
fn group_pattern(input: &str) -> IResult<&str, &str> {
    let (rest, _) = char('{').parse(input)?;
    match balanced(rest, b'{', b'}') {
        Some(end) => Ok((&rest[end + 1..], &rest[..end])),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Char))),
    }
}

fn solution_modifier(input: &str) -> IResult<&str, &'static str> {
    alt((
        value("GROUP BY", pair(keyword("GROUP"), ws(keyword("BY")))),
        value("HAVING", keyword("HAVING")),
        value("ORDER BY", pair(keyword("ORDER"), ws(keyword("BY")))),
        value("LIMIT", keyword("LIMIT")),
        value("OFFSET", keyword("OFFSET")),
        value("VALUES", keyword("VALUES")),
    ))
    .parse(input)
}

/// Byte length of a string literal, comment or IRI starting at `bytes[0]`.
///
/// All delimiters are ASCII, so byte offsets always fall on char boundaries.
fn opaque_len(bytes: &[u8]) -> Option<usize> {
    match bytes.first()? {
        quote @ (b'"' | b'\'') => {
            let mut i = 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    c if c == *quote => return Some(i + 1),
                    _ => i += 1,
                }
            }
            Some(bytes.len())
        }
        b'#' => Some(
            bytes
                .iter()
                .position(|&b| b == b'\n')
                .unwrap_or(bytes.len()),
        ),
        // an IRI has no whitespace before its '>', otherwise '<' is a comparison
        b'<' => bytes[1..]
            .iter()
            .position(|&b| b == b'>' || b == b'<' || b.is_ascii_whitespace())
            .filter(|&end| bytes[end + 1] == b'>')
            .map(|end| end + 2),
        _ => None,
    }
}

/// Offset of the `close` byte matching an already consumed `open`.
fn balanced(input: &str, open: u8, close: u8) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(len) = opaque_len(&bytes[i..]) {
            i += len;
            continue;
        }
        if bytes[i] == open {
            depth += 1;
        } else if bytes[i] == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }

    None
}

/// Variables appearing in a group pattern, in first-appearance order.
fn pattern_variables(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut variables: Vec<String> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if let Some(len) = opaque_len(&bytes[i..]) {
            i += len;
            continue;
        }
        if bytes[i] == b'?' || bytes[i] == b'$' {
            if let Ok((rest, name)) = variable(&body[i..]) {
                if !variables.iter().any(|v| v == name) {
                    variables.push(name.to_string());
                }
                i = body.len() - rest.len();
                continue;
            }
        }
        i += 1;
    }

    variables
}
