//! Column-filter query construction.
//!
//! A [`Filter`] describes a paginated, sorted, column-filtered listing
//! the way request handlers express it: a list of (column, operator,
//! value) conditions chained with AND/OR. Identifiers are validated
//! before being interpolated into SQL; values are always bound
//! parameters.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use guildhall_core::types::Timestamp;

use crate::error::DbError;
use crate::DbPool;

/// Default page size when a filter does not specify one.
pub const DEFAULT_LIMIT: i64 = 20;

/// Hard ceiling on page size. Scans that want "effectively all" rows (the
/// statistics engine) use exactly this bound; nothing pages unbounded.
pub const MAX_LIMIT: i64 = 10_000;

/// Comparison operator for one column condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Op {
    fn sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }
}

/// How a condition chains to the condition after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Logic {
    #[default]
    And,
    Or,
}

/// A bindable filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Time(Timestamp),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

/// One column condition.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    pub name: String,
    pub op: Op,
    /// `None` only for [`Op::IsNull`] / [`Op::IsNotNull`].
    pub value: Option<FilterValue>,
    /// Chains this condition to the NEXT one; ignored on the last.
    pub logic: Logic,
}

/// Sort key.
#[derive(Debug, Clone)]
pub struct SortField {
    pub column: String,
    pub descending: bool,
}

/// Paginated, column-filtered listing parameters.
///
/// `page` starts at 0; `limit` falls back to [`DEFAULT_LIMIT`] and is
/// clamped to [`MAX_LIMIT`]. An empty `sort` orders by `id DESC`. Turning
/// `count` off skips the total-count query for callers that do not
/// paginate.
#[derive(Debug, Clone)]
pub struct Filter {
    pub page: i64,
    pub limit: i64,
    pub sort: Vec<SortField>,
    pub count: bool,
    pub columns: Vec<ColumnFilter>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            page: 0,
            limit: DEFAULT_LIMIT,
            sort: Vec::new(),
            count: true,
            columns: Vec::new(),
        }
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Skip the total-count query.
    pub fn skip_count(mut self) -> Self {
        self.count = false;
        self
    }

    pub fn sort_asc(mut self, column: &str) -> Self {
        self.sort.push(SortField {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn sort_desc(mut self, column: &str) -> Self {
        self.sort.push(SortField {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    /// Add an equality condition, AND-chained.
    pub fn eq(self, column: &str, value: FilterValue) -> Self {
        self.cond(column, Op::Eq, Some(value))
    }

    /// Add an `IS NOT NULL` condition, AND-chained.
    pub fn is_not_null(self, column: &str) -> Self {
        self.cond(column, Op::IsNotNull, None)
    }

    /// Add an arbitrary condition, AND-chained.
    pub fn cond(mut self, column: &str, op: Op, value: Option<FilterValue>) -> Self {
        self.columns.push(ColumnFilter {
            name: column.to_string(),
            op,
            value,
            logic: Logic::And,
        });
        self
    }

    /// Flip the chaining of the most recently added condition to OR.
    pub fn or(mut self) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.logic = Logic::Or;
        }
        self
    }
}

/// Accept only plain lowercase snake-case identifiers. Everything else is
/// rejected before it can reach the SQL text.
fn check_ident(name: &str) -> Result<(), DbError> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if head_ok && tail_ok {
        Ok(())
    } else {
        Err(DbError::BadFilter(format!("invalid identifier {name:?}")))
    }
}

fn push_scalar(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => {
            builder.push_bind(*v);
        }
        FilterValue::Float(v) => {
            builder.push_bind(*v);
        }
        FilterValue::Bool(v) => {
            builder.push_bind(*v);
        }
        FilterValue::Text(v) => {
            builder.push_bind(v.clone());
        }
        FilterValue::Time(v) => {
            builder.push_bind(*v);
        }
        // Lists are routed to the IN/NOT IN arm before this is reached.
        FilterValue::IntList(_) | FilterValue::TextList(_) => {}
    }
}

fn push_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &Filter,
) -> Result<(), DbError> {
    if filter.columns.is_empty() {
        return Ok(());
    }
    builder.push(" WHERE ");

    for (i, cond) in filter.columns.iter().enumerate() {
        if i > 0 {
            builder.push(match filter.columns[i - 1].logic {
                Logic::And => " AND ",
                Logic::Or => " OR ",
            });
        }
        check_ident(&cond.name)?;
        builder.push(&cond.name);

        match cond.op {
            Op::IsNull | Op::IsNotNull => {
                builder.push(" ");
                builder.push(cond.op.sql());
            }
            Op::In | Op::NotIn => {
                builder.push(" ");
                builder.push(cond.op.sql());
                builder.push(" (");
                match &cond.value {
                    Some(FilterValue::IntList(values)) if !values.is_empty() => {
                        let mut args = builder.separated(", ");
                        for v in values {
                            args.push_bind(*v);
                        }
                    }
                    Some(FilterValue::TextList(values)) if !values.is_empty() => {
                        let mut args = builder.separated(", ");
                        for v in values {
                            args.push_bind(v.clone());
                        }
                    }
                    _ => {
                        return Err(DbError::BadFilter(format!(
                            "operator {:?} on column {} requires a non-empty list value",
                            cond.op, cond.name
                        )))
                    }
                }
                builder.push(")");
            }
            _ => match &cond.value {
                Some(value @ (FilterValue::IntList(_) | FilterValue::TextList(_))) => {
                    return Err(DbError::BadFilter(format!(
                        "operator {:?} on column {} cannot take a list value {value:?}",
                        cond.op, cond.name
                    )))
                }
                Some(value) => {
                    builder.push(" ");
                    builder.push(cond.op.sql());
                    builder.push(" ");
                    push_scalar(builder, value);
                }
                None => {
                    return Err(DbError::BadFilter(format!(
                        "operator {:?} on column {} requires a value",
                        cond.op, cond.name
                    )))
                }
            },
        }
    }
    Ok(())
}

fn push_order_and_page(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &Filter,
) -> Result<(), DbError> {
    builder.push(" ORDER BY ");
    if filter.sort.is_empty() {
        builder.push("id DESC");
    } else {
        for (i, sort) in filter.sort.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            check_ident(&sort.column)?;
            builder.push(&sort.column);
            builder.push(if sort.descending { " DESC" } else { " ASC" });
        }
    }

    let limit = clamp_limit(filter.limit);
    let offset = filter.page.max(0) * limit;
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);
    Ok(())
}

fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIMIT
    } else {
        limit.min(MAX_LIMIT)
    }
}

/// Run a filtered listing against the pool.
///
/// The total is computed first (and short-circuits an empty result) when
/// `filter.count` is on; otherwise it is reported as 0. `table` and
/// `columns` are trusted constants owned by the entity stores, never user
/// input.
pub(crate) async fn fetch_filtered<T>(
    pool: &DbPool,
    table: &str,
    columns: &str,
    filter: &Filter,
) -> Result<(Vec<T>, i64), DbError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let total = if filter.count {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table}"));
        push_conditions(&mut builder, filter)?;
        let total: i64 = builder.build_query_scalar().fetch_one(pool).await?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }
        total
    } else {
        0
    };

    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {table}"));
    push_conditions(&mut builder, filter)?;
    push_order_and_page(&mut builder, filter)?;
    let records = builder.build_query_as::<T>().fetch_all(pool).await?;
    Ok((records, total))
}

/// Same listing through an externally-managed transaction connection.
/// No count: transactional scans page without totals.
pub(crate) async fn fetch_filtered_in<T>(
    conn: &mut PgConnection,
    table: &str,
    columns: &str,
    filter: &Filter,
) -> Result<Vec<T>, DbError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {table}"));
    push_conditions(&mut builder, filter)?;
    push_order_and_page(&mut builder, filter)?;
    let records = builder.build_query_as::<T>().fetch_all(&mut *conn).await?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn render(filter: &Filter) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM teams");
        push_conditions(&mut builder, filter).unwrap();
        push_order_and_page(&mut builder, filter).unwrap();
        builder.sql().to_string()
    }

    #[test]
    fn empty_filter_defaults_to_id_desc_paging() {
        let sql = render(&Filter::new());
        assert_eq!(sql, "SELECT id FROM teams ORDER BY id DESC LIMIT $1 OFFSET $2");
    }

    #[test]
    fn conditions_chain_with_and_by_default() {
        let filter = Filter::new()
            .eq("guild_id", FilterValue::Int(7))
            .eq("dungeon_name", FilterValue::Text("Vault".to_string()))
            .is_not_null("close_time");
        let sql = render(&filter);
        assert_eq!(
            sql,
            "SELECT id FROM teams WHERE guild_id = $1 AND dungeon_name = $2 \
             AND close_time IS NOT NULL ORDER BY id DESC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn or_flips_the_chain_to_the_next_condition() {
        let filter = Filter::new()
            .eq("is_hidden", FilterValue::Bool(false))
            .or()
            .eq("creator_id", FilterValue::Int(3));
        let sql = render(&filter);
        assert!(sql.contains("is_hidden = $1 OR creator_id = $2"), "{sql}");
    }

    #[test]
    fn in_lists_bind_each_member() {
        let filter = Filter::new().cond(
            "id",
            Op::In,
            Some(FilterValue::IntList(vec![1, 2, 3])),
        );
        let sql = render(&filter);
        assert!(sql.contains("id IN ($1, $2, $3)"), "{sql}");
    }

    #[test]
    fn sort_fields_render_in_order() {
        let filter = Filter::new().sort_asc("dungeon_name").sort_desc("updated_at");
        let sql = render(&filter);
        assert!(
            sql.contains("ORDER BY dungeon_name ASC, updated_at DESC"),
            "{sql}"
        );
    }

    #[test]
    fn hostile_identifiers_are_rejected() {
        let filter = Filter::new().eq("id; DROP TABLE teams", FilterValue::Int(1));
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM teams");
        assert_matches!(
            push_conditions(&mut builder, &filter),
            Err(DbError::BadFilter(_))
        );

        let filter = Filter::new().sort_asc("id--");
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM teams");
        assert_matches!(
            push_order_and_page(&mut builder, &filter),
            Err(DbError::BadFilter(_))
        );
    }

    #[test]
    fn scalar_operator_rejects_list_and_missing_values() {
        let filter = Filter::new().cond("id", Op::Gt, None);
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM teams");
        assert_matches!(
            push_conditions(&mut builder, &filter),
            Err(DbError::BadFilter(_))
        );

        let filter = Filter::new().cond("id", Op::In, Some(FilterValue::IntList(Vec::new())));
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM teams");
        assert_matches!(
            push_conditions(&mut builder, &filter),
            Err(DbError::BadFilter(_))
        );
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(0), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(-5), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(1_000_000), MAX_LIMIT);
    }
}
