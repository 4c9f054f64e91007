use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlparser::ast::{
    self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value,
    ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::{PaymentMethod, ReservationStatus, VoucherStatus};

/// Parsed command from SQL input. The dialect maps the engine's logical
/// operations onto a handful of tables: `items`, `promos`, `reservations`,
/// `vouchers`, plus the read-only `quote`, `availability`, `discounts` and
/// `loyalty` views.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertItem {
        id: Ulid,
        name: String,
        daily_rate: Decimal,
        active: bool,
    },
    UpdateItem {
        id: Ulid,
        name: Option<String>,
        daily_rate: Option<Decimal>,
        active: Option<bool>,
    },
    InsertPromo {
        code: String,
        discount_percent: u8,
        starts_at: Option<NaiveDate>,
        expires_at: Option<NaiveDate>,
        active: bool,
    },
    UpdatePromo {
        code: String,
        discount_percent: Option<u8>,
        starts_at: Option<Option<NaiveDate>>,
        expires_at: Option<Option<NaiveDate>>,
        active: Option<bool>,
    },
    SelectItems {
        id: Option<Ulid>,
    },
    InsertReservation {
        id: Ulid,
        customer_id: Ulid,
        item_id: Ulid,
        date_from: NaiveDate,
        date_to: NaiveDate,
        discount_code: Option<String>,
        shipping_ref: String,
        payment_method: PaymentMethod,
        /// `INSERT ... RETURNING *` hands the price snapshot back as a row.
        returning: bool,
    },
    /// `UPDATE reservations SET status = '...' WHERE id = '...'`
    TransitionReservation {
        id: Ulid,
        status: ReservationStatus,
    },
    /// `UPDATE reservations SET payment_status = 'paid' WHERE id = '...'`
    MarkReservationPaid {
        id: Ulid,
    },
    /// `DELETE FROM reservations WHERE id = '...' AND customer_id = '...'`
    /// — the customer-facing cancel, not a physical delete.
    CancelReservation {
        id: Ulid,
        customer_id: Ulid,
    },
    SelectReservations {
        id: Option<Ulid>,
        status: Option<ReservationStatus>,
        customer_id: Option<Ulid>,
        item_id: Option<Ulid>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        text: Option<String>,
    },
    SelectQuote {
        item_id: Ulid,
        date_from: NaiveDate,
        date_to: NaiveDate,
        customer_id: Option<Ulid>,
        discount_code: Option<String>,
    },
    SelectAvailability {
        item_id: Ulid,
        date_from: NaiveDate,
        date_to: NaiveDate,
        exclude: Option<Ulid>,
    },
    SelectDiscount {
        code: String,
        customer_id: Option<Ulid>,
    },
    SelectLoyalty {
        customer_id: Ulid,
    },
    SelectVouchers {
        customer_id: Ulid,
        status: Option<VoucherStatus>,
    },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

// ── INSERT ────────────────────────────────────────────────────

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "items" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("items", 3, values.len()));
            }
            Ok(Command::InsertItem {
                id: parse_ulid(&values[0])?,
                name: parse_string(&values[1])?,
                daily_rate: parse_decimal(&values[2])?,
                active: if values.len() >= 4 {
                    parse_bool(&values[3])?
                } else {
                    true
                },
            })
        }
        "promos" => {
            if values.len() < 2 {
                return Err(SqlError::WrongArity("promos", 2, values.len()));
            }
            Ok(Command::InsertPromo {
                code: parse_string(&values[0])?,
                discount_percent: parse_percent(&values[1])?,
                starts_at: if values.len() >= 3 {
                    parse_date_or_null(&values[2])?
                } else {
                    None
                },
                expires_at: if values.len() >= 4 {
                    parse_date_or_null(&values[3])?
                } else {
                    None
                },
                active: if values.len() >= 5 {
                    parse_bool(&values[4])?
                } else {
                    true
                },
            })
        }
        "reservations" => {
            if values.len() < 8 {
                return Err(SqlError::WrongArity("reservations", 8, values.len()));
            }
            let method_str = parse_string(&values[7])?;
            let payment_method = PaymentMethod::parse(&method_str)
                .ok_or_else(|| SqlError::Parse(format!("bad payment method: {method_str}")))?;
            Ok(Command::InsertReservation {
                id: parse_ulid(&values[0])?,
                customer_id: parse_ulid(&values[1])?,
                item_id: parse_ulid(&values[2])?,
                date_from: parse_date(&values[3])?,
                date_to: parse_date(&values[4])?,
                discount_code: parse_string_or_null(&values[5])?,
                shipping_ref: parse_string(&values[6])?,
                payment_method,
                returning: insert.returning.is_some(),
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── UPDATE ────────────────────────────────────────────────────

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    match table.as_str() {
        "items" => {
            let id = extract_where_ulid(selection, "id")?;
            let mut name = None;
            let mut daily_rate = None;
            let mut active = None;
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "name" => name = Some(parse_string(&a.value)?),
                    "daily_rate" => daily_rate = Some(parse_decimal(&a.value)?),
                    "active" => active = Some(parse_bool(&a.value)?),
                    col => return Err(SqlError::UnknownColumn("items", col.to_string())),
                }
            }
            Ok(Command::UpdateItem { id, name, daily_rate, active })
        }
        "promos" => {
            let code = extract_where_string(selection, "code")?;
            let mut discount_percent = None;
            let mut starts_at = None;
            let mut expires_at = None;
            let mut active = None;
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "discount_percent" => discount_percent = Some(parse_percent(&a.value)?),
                    "starts_at" => starts_at = Some(parse_date_or_null(&a.value)?),
                    "expires_at" => expires_at = Some(parse_date_or_null(&a.value)?),
                    "active" => active = Some(parse_bool(&a.value)?),
                    col => return Err(SqlError::UnknownColumn("promos", col.to_string())),
                }
            }
            Ok(Command::UpdatePromo { code, discount_percent, starts_at, expires_at, active })
        }
        "reservations" => {
            let id = extract_where_ulid(selection, "id")?;
            if assignments.len() != 1 {
                return Err(SqlError::Unsupported(
                    "reservations accept exactly one SET column".into(),
                ));
            }
            let a = &assignments[0];
            match assignment_column(a)?.as_str() {
                "status" => {
                    let status_str = parse_string(&a.value)?;
                    let status = ReservationStatus::parse(&status_str)
                        .ok_or_else(|| SqlError::Parse(format!("bad status: {status_str}")))?;
                    Ok(Command::TransitionReservation { id, status })
                }
                "payment_status" => {
                    let s = parse_string(&a.value)?;
                    if s != "paid" {
                        return Err(SqlError::Parse(format!(
                            "payment_status can only be set to 'paid', got {s}"
                        )));
                    }
                    Ok(Command::MarkReservationPaid { id })
                }
                col => Err(SqlError::UnknownColumn("reservations", col.to_string())),
            }
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── DELETE ────────────────────────────────────────────────────

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }
    let filters = collect_filters(delete.selection.as_ref())?;
    Ok(Command::CancelReservation {
        id: filters.require_ulid("id")?,
        customer_id: filters.require_ulid("customer_id")?,
    })
}

// ── SELECT ────────────────────────────────────────────────────

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };
    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;
    let filters = collect_filters(select.selection.as_ref())?;

    match table.as_str() {
        "items" => Ok(Command::SelectItems {
            id: filters.optional_ulid("id")?,
        }),
        "reservations" => Ok(Command::SelectReservations {
            id: filters.optional_ulid("id")?,
            status: filters.optional_status()?,
            customer_id: filters.optional_ulid("customer_id")?,
            item_id: filters.optional_ulid("item_id")?,
            date_from: filters.optional_date_gte("date_from")?,
            date_to: filters.optional_date_lte("date_to")?,
            text: filters.optional_string("q")?,
        }),
        "quote" => Ok(Command::SelectQuote {
            item_id: filters.require_ulid("item_id")?,
            date_from: filters.require_date("date_from")?,
            date_to: filters.require_date("date_to")?,
            customer_id: filters.optional_ulid("customer_id")?,
            discount_code: filters.optional_string("discount_code")?,
        }),
        "availability" => Ok(Command::SelectAvailability {
            item_id: filters.require_ulid("item_id")?,
            date_from: filters.require_date("date_from")?,
            date_to: filters.require_date("date_to")?,
            exclude: filters.optional_ulid("exclude")?,
        }),
        "discounts" => Ok(Command::SelectDiscount {
            code: filters.require_string("code")?,
            customer_id: filters.optional_ulid("customer_id")?,
        }),
        "loyalty" => Ok(Command::SelectLoyalty {
            customer_id: filters.require_ulid("customer_id")?,
        }),
        "vouchers" => {
            let status = match filters.optional_string("status")?.as_deref() {
                None => None,
                Some("available") => Some(VoucherStatus::Available),
                Some("used") => Some(VoucherStatus::Used),
                Some(other) => {
                    return Err(SqlError::Parse(format!("bad voucher status: {other}")));
                }
            };
            Ok(Command::SelectVouchers {
                customer_id: filters.require_ulid("customer_id")?,
                status,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── WHERE-clause walking ──────────────────────────────────────

/// Flattened `WHERE` conjunction: `col = v`, `col >= v`, `col <= v` triples.
/// Anything else in the clause is rejected so typos fail loudly instead of
/// silently widening a filter.
#[derive(Default)]
struct Filters {
    eq: Vec<(String, Expr)>,
    gte: Vec<(String, Expr)>,
    lte: Vec<(String, Expr)>,
}

fn collect_filters(selection: Option<&Expr>) -> Result<Filters, SqlError> {
    let mut filters = Filters::default();
    if let Some(expr) = selection {
        walk_filters(expr, &mut filters)?;
    }
    Ok(filters)
}

fn walk_filters(expr: &Expr, filters: &mut Filters) -> Result<(), SqlError> {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::And => {
                walk_filters(left, filters)?;
                walk_filters(right, filters)
            }
            ast::BinaryOperator::Eq => {
                let col = expr_column_name(left)
                    .ok_or_else(|| SqlError::Parse(format!("expected column, got {left}")))?;
                filters.eq.push((col, (**right).clone()));
                Ok(())
            }
            ast::BinaryOperator::GtEq => {
                let col = expr_column_name(left)
                    .ok_or_else(|| SqlError::Parse(format!("expected column, got {left}")))?;
                filters.gte.push((col, (**right).clone()));
                Ok(())
            }
            ast::BinaryOperator::LtEq => {
                let col = expr_column_name(left)
                    .ok_or_else(|| SqlError::Parse(format!("expected column, got {left}")))?;
                filters.lte.push((col, (**right).clone()));
                Ok(())
            }
            other => Err(SqlError::Unsupported(format!("operator {other}"))),
        },
        Expr::Nested(inner) => walk_filters(inner, filters),
        other => Err(SqlError::Unsupported(format!("filter {other}"))),
    }
}

impl Filters {
    fn eq_expr(&self, col: &str) -> Option<&Expr> {
        self.eq.iter().find(|(c, _)| c == col).map(|(_, e)| e)
    }

    fn require_ulid(&self, col: &'static str) -> Result<Ulid, SqlError> {
        self.eq_expr(col)
            .ok_or(SqlError::MissingFilter(col))
            .and_then(parse_ulid)
    }

    fn optional_ulid(&self, col: &str) -> Result<Option<Ulid>, SqlError> {
        self.eq_expr(col).map(parse_ulid).transpose()
    }

    fn require_string(&self, col: &'static str) -> Result<String, SqlError> {
        self.eq_expr(col)
            .ok_or(SqlError::MissingFilter(col))
            .and_then(parse_string)
    }

    fn optional_string(&self, col: &str) -> Result<Option<String>, SqlError> {
        self.eq_expr(col).map(parse_string).transpose()
    }

    fn require_date(&self, col: &'static str) -> Result<NaiveDate, SqlError> {
        self.eq_expr(col)
            .ok_or(SqlError::MissingFilter(col))
            .and_then(parse_date)
    }

    fn optional_status(&self) -> Result<Option<ReservationStatus>, SqlError> {
        let Some(expr) = self.eq_expr("status") else {
            return Ok(None);
        };
        let s = parse_string(expr)?;
        ReservationStatus::parse(&s)
            .map(Some)
            .ok_or_else(|| SqlError::Parse(format!("bad status: {s}")))
    }

    fn optional_date_gte(&self, col: &str) -> Result<Option<NaiveDate>, SqlError> {
        self.gte
            .iter()
            .find(|(c, _)| c == col)
            .map(|(_, e)| parse_date(e))
            .transpose()
    }

    fn optional_date_lte(&self, col: &str) -> Result<Option<NaiveDate>, SqlError> {
        self.lte
            .iter()
            .find(|(c, _)| c == col)
            .map(|(_, e)| parse_date(e))
            .transpose()
    }
}

// ── AST helpers ───────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn assignment_column(a: &ast::Assignment) -> Result<String, SqlError> {
    match &a.target {
        ast::AssignmentTarget::ColumnName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))
        }
        _ => Err(SqlError::Parse("unsupported assignment target".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_ulid(selection: &Option<Expr>, col: &'static str) -> Result<Ulid, SqlError> {
    collect_filters(selection.as_ref())?.require_ulid(col)
}

fn extract_where_string(selection: &Option<Expr>, col: &'static str) -> Result<String, SqlError> {
    collect_filters(selection.as_ref())?.require_string(col)
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

// ── Value parsers ─────────────────────────────────────────────

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s) | Value::Number(s, _)) => {
            Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
        }
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => parse_string(expr).map(Some),
    }
}

fn parse_decimal(expr: &Expr) -> Result<Decimal, SqlError> {
    match extract_value(expr) {
        Some(Value::Number(s, _) | Value::SingleQuotedString(s)) => s
            .parse()
            .map_err(|e| SqlError::Parse(format!("bad decimal: {e}"))),
        Some(value) => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_percent(expr: &Expr) -> Result<u8, SqlError> {
    let v: i64 = match extract_value(expr) {
        Some(Value::Number(s, _) | Value::SingleQuotedString(s)) => s
            .parse()
            .map_err(|e| SqlError::Parse(format!("bad percent: {e}")))?,
        _ => return Err(SqlError::Parse(format!("expected number, got {expr:?}"))),
    };
    u8::try_from(v)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(SqlError::Parse(format!("percent out of range: {v}")))
}

fn parse_date(expr: &Expr) -> Result<NaiveDate, SqlError> {
    let s = parse_string(expr)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|_| SqlError::Parse(format!("bad date (want YYYY-MM-DD): {s}")))
}

fn parse_date_or_null(expr: &Expr) -> Result<Option<NaiveDate>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => parse_date(expr).map(Some),
    }
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    match extract_value(expr) {
        Some(Value::Boolean(b)) => Ok(*b),
        Some(Value::SingleQuotedString(s)) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
        },
        Some(Value::Number(n, _)) => Ok(n != "0"),
        Some(value) => Err(SqlError::Parse(format!("expected bool, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(&'static str, String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(t, c) => write!(f, "unknown column on {t}: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
