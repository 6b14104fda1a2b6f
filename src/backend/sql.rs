//! SQL `WHERE`-clause rendering of backend predicates.

use super::dialect::Dialect;
use super::error::{PredicateError, PredicateResult};
use super::predicate::Predicate;
use super::token::{Token, TokenStream};

impl Predicate {
    /// Render as a SQL boolean expression for `dialect`.
    ///
    /// `Empty` renders as the dialect's always-true predicate and an empty
    /// `IN` list as always-false. `Native` predicates have no SQL form.
    pub fn to_sql(&self, dialect: Dialect) -> PredicateResult<String> {
        Ok(self.to_tokens()?.serialize(dialect))
    }

    /// Convert this predicate to a token stream (dialect-agnostic).
    pub fn to_tokens(&self) -> PredicateResult<TokenStream> {
        let mut ts = TokenStream::new();

        match self {
            Predicate::Empty => {
                ts.push(Token::True);
            }

            Predicate::Selector { dimension, value } => {
                ts.push(Token::Ident(dimension.clone()))
                    .space()
                    .push(Token::Eq)
                    .space()
                    .push(Token::LitString(value.clone()));
            }

            Predicate::In { dimension, values } => {
                if values.is_empty() {
                    ts.push(Token::False);
                } else {
                    ts.push(Token::Ident(dimension.clone()))
                        .space()
                        .push(Token::In)
                        .space()
                        .lparen()
                        .separated(values, Token::Comma, |ts, value| {
                            ts.push(Token::LitString(value.clone()));
                        })
                        .rparen();
                }
            }

            Predicate::And(fields) => {
                emit_junction(&mut ts, fields, Token::And, Token::True)?;
            }

            Predicate::Or(fields) => {
                emit_junction(&mut ts, fields, Token::Or, Token::False)?;
            }

            Predicate::Not(field) => {
                ts.push(Token::Not).space().lparen();
                ts.append(&field.to_tokens()?);
                ts.rparen();
            }

            Predicate::Native(value) => {
                let kind = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("untyped")
                    .to_string();
                return Err(PredicateError::UnsupportedNative { kind });
            }
        }

        Ok(ts)
    }

    /// Whether this renders as a bare `a AND b` / `a OR b` sequence and so
    /// needs parentheses inside another junction. Single-child junctions
    /// render as their child, so look through them.
    fn is_junction(&self) -> bool {
        match self {
            Predicate::And(fields) | Predicate::Or(fields) => {
                let mut live = fields.iter().filter(|f| !f.is_empty());
                match (live.next(), live.next()) {
                    (Some(only), None) => only.is_junction(),
                    (Some(_), Some(_)) => true,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

fn emit_junction(
    ts: &mut TokenStream,
    fields: &[Predicate],
    op: Token,
    neutral: Token,
) -> PredicateResult<()> {
    let fields: Vec<&Predicate> = fields.iter().filter(|f| !f.is_empty()).collect();

    match fields.as_slice() {
        [] => {
            ts.push(neutral);
        }
        [only] => {
            ts.append(&only.to_tokens()?);
        }
        _ => {
            let rendered = fields
                .iter()
                .map(|field| Ok((field.is_junction(), field.to_tokens()?)))
                .collect::<PredicateResult<Vec<_>>>()?;
            ts.separated(rendered, op, |ts, (grouped, inner)| {
                if grouped {
                    ts.lparen().append(&inner).rparen();
                } else {
                    ts.append(&inner);
                }
            });
        }
    }

    Ok(())
}
