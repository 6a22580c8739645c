//! A small predicate tree for range extraction ahead of partition pruning.
//!
//! `extract_time_range` only needs to know the tightest bound an AND'd set
//! of comparisons puts on one column; it does not need to *evaluate* the
//! tree (row-level filtering after pruning is the caller's own predicate
//! closure passed to `PartitionManager::query`).

#[derive(Debug, Clone)]
pub enum WhereExpr {
    Eq(String, i64),
    Lt(String, i64),
    Le(String, i64),
    Gt(String, i64),
    Ge(String, i64),
    And(Vec<WhereExpr>),
    Or(Vec<WhereExpr>),
    Not(Box<WhereExpr>),
}

const FULL_RANGE: (i64, i64) = (i64::MIN, i64::MAX);

/// Walks a tree of AND'd predicates and collects the tightest `[min, max]`
/// bound on `time_column`. Any `Or`/`Not` node yields a null range (`None`),
/// telling the caller to scan every partition; an `Eq` contributes
/// `min = max = value`; comparisons on other columns don't narrow the
/// range but also don't kill it.
pub fn extract_time_range(expr: &WhereExpr, time_column: &str) -> Option<(i64, i64)> {
    match expr {
        WhereExpr::Eq(col, v) if col == time_column => Some((*v, *v)),
        WhereExpr::Ge(col, v) if col == time_column => Some((*v, i64::MAX)),
        WhereExpr::Gt(col, v) if col == time_column => Some((v.saturating_add(1), i64::MAX)),
        WhereExpr::Le(col, v) if col == time_column => Some((i64::MIN, *v)),
        WhereExpr::Lt(col, v) if col == time_column => Some((i64::MIN, v.saturating_sub(1))),
        WhereExpr::Eq(..) | WhereExpr::Ge(..) | WhereExpr::Gt(..) | WhereExpr::Le(..) | WhereExpr::Lt(..) => {
            Some(FULL_RANGE)
        }
        WhereExpr::And(children) => {
            let mut acc = FULL_RANGE;
            for child in children {
                let (lo, hi) = extract_time_range(child, time_column)?;
                acc = (acc.0.max(lo), acc.1.min(hi));
            }
            Some(acc)
        }
        WhereExpr::Or(_) | WhereExpr::Not(_) => None,
    }
}
