use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::Sink;
use futures::stream;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::engine::{Engine, EngineError, ReservationFilter, Resolution};
use crate::model::*;
use crate::sql::{self, Command};

pub struct CastellanHandler {
    engine: Arc<Engine>,
    query_parser: Arc<CastellanQueryParser>,
}

impl CastellanHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(CastellanQueryParser),
        }
    }

    async fn run(&self, query: &str) -> PgWireResult<Vec<Response>> {
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        let label = crate::observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            crate::observability::QUERIES_TOTAL,
            "command" => label, "status" => status
        )
        .increment(1);
        metrics::histogram!(
            crate::observability::QUERY_DURATION_SECONDS,
            "command" => label
        )
        .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Vec<Response>> {
        let engine = &self.engine;
        let today = crate::local_today();
        match cmd {
            Command::InsertItem { id, name, daily_rate, active } => {
                engine
                    .create_item(id, name, daily_rate, active)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateItem { id, name, daily_rate, active } => {
                let current = engine
                    .get_item(id)
                    .await
                    .ok_or_else(|| engine_err(EngineError::NotFound(id)))?;
                engine
                    .update_item(
                        id,
                        name.unwrap_or(current.name),
                        daily_rate.unwrap_or(current.daily_rate),
                        active.unwrap_or(current.active),
                    )
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertPromo { code, discount_percent, starts_at, expires_at, active } => {
                engine
                    .create_promo(code, discount_percent, starts_at, expires_at, active)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdatePromo { code, discount_percent, starts_at, expires_at, active } => {
                let current = engine
                    .get_promo(&code)
                    .await
                    .ok_or_else(|| engine_err(EngineError::CodeNotFound(code.clone())))?;
                engine
                    .update_promo(
                        current.code.clone(),
                        discount_percent.unwrap_or(current.discount_percent),
                        starts_at.unwrap_or(current.starts_at),
                        expires_at.unwrap_or(current.expires_at),
                        active.unwrap_or(current.active),
                    )
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertReservation {
                id,
                customer_id,
                item_id,
                date_from,
                date_to,
                discount_code,
                shipping_ref,
                payment_method,
                returning,
            } => {
                if date_to < date_from {
                    return Err(engine_err(EngineError::Validation(
                        "date_to precedes date_from",
                    )));
                }
                let created = engine
                    .create_reservation(
                        crate::engine::NewReservation {
                            id,
                            customer_id,
                            item_id,
                            range: DayRange::new(date_from, date_to),
                            discount_code,
                            shipping_ref,
                            payment_method,
                        },
                        today,
                    )
                    .await
                    .map_err(engine_err)?;

                if returning {
                    let schema = Arc::new(created_schema());
                    let mut encoder = DataRowEncoder::new(schema.clone());
                    encoder.encode_field(&created.id.to_string())?;
                    encoder.encode_field(&i32::from(created.discount_percent))?;
                    encoder.encode_field(&created.final_price.to_string())?;
                    encoder.encode_field(&created.payment_status.as_str())?;
                    encoder.encode_field(&created.applied_voucher)?;
                    let row: PgWireResult<_> = Ok(encoder.take_row());
                    Ok(vec![Response::Query(QueryResponse::new(
                        schema,
                        stream::iter(vec![row]),
                    ))])
                } else {
                    Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
                }
            }
            Command::TransitionReservation { id, status } => {
                engine
                    .admin_transition(id, status, today)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::MarkReservationPaid { id } => {
                engine.mark_paid(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::CancelReservation { id, customer_id } => {
                engine
                    .cancel_reservation(customer_id, id, today)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::SelectItems { id } => {
                let items = engine.list_items().await;
                let schema = Arc::new(items_schema());
                let rows: Vec<PgWireResult<_>> = items
                    .into_iter()
                    .filter(|item| id.is_none_or(|wanted| item.id == wanted))
                    .map(|item| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&item.id.to_string())?;
                        encoder.encode_field(&item.name)?;
                        encoder.encode_field(&item.daily_rate.to_string())?;
                        encoder.encode_field(&item.active)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectReservations {
                id,
                status,
                customer_id,
                item_id,
                date_from,
                date_to,
                text,
            } => {
                // Materialize expired statuses before answering, so listings
                // never show a pending/confirmed row that time has passed by.
                engine.sweep(today).await;
                let filter = ReservationFilter {
                    id,
                    status,
                    customer_id,
                    item_id,
                    from: date_from,
                    to: date_to,
                    text,
                };
                let rows = engine.list_reservations(&filter).await;
                let schema = Arc::new(reservations_schema());
                let encoded: Vec<PgWireResult<_>> = rows
                    .into_iter()
                    .map(|row| encode_reservation_row(&schema, &row))
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(encoded),
                ))])
            }
            Command::SelectQuote { item_id, date_from, date_to, customer_id, discount_code } => {
                if date_to < date_from {
                    return Err(engine_err(EngineError::Validation(
                        "date_to precedes date_from",
                    )));
                }
                let quote = engine
                    .quote(
                        item_id,
                        DayRange::new(date_from, date_to),
                        customer_id,
                        discount_code.as_deref(),
                        today,
                    )
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(quote_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&quote.days)?;
                encoder.encode_field(&quote.unit_rate.to_string())?;
                encoder.encode_field(&quote.subtotal.to_string())?;
                encoder.encode_field(&i32::from(quote.discount_percent))?;
                encoder.encode_field(&quote.discount_amount.to_string())?;
                encoder.encode_field(&quote.total.to_string())?;
                let row: PgWireResult<_> = Ok(encoder.take_row());
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(vec![row]),
                ))])
            }
            Command::SelectAvailability { item_id, date_from, date_to, exclude } => {
                if date_to < date_from {
                    return Err(engine_err(EngineError::Validation(
                        "date_to precedes date_from",
                    )));
                }
                let available = engine
                    .is_available(item_id, DayRange::new(date_from, date_to), exclude)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(availability_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&item_id.to_string())?;
                encoder.encode_field(&date_from.to_string())?;
                encoder.encode_field(&date_to.to_string())?;
                encoder.encode_field(&available)?;
                let row: PgWireResult<_> = Ok(encoder.take_row());
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(vec![row]),
                ))])
            }
            Command::SelectDiscount { code, customer_id } => {
                let resolution = engine.resolve_discount(customer_id, &code, today).await;
                let (valid, kind, percent, reason) = match &resolution {
                    Resolution::Applied(r) => {
                        (true, Some(r.kind.as_str()), i32::from(r.discount_percent), None)
                    }
                    Resolution::Rejected(reason) => (false, None, 0, Some(reason.as_str())),
                    // resolve_discount collapses these on the read path
                    Resolution::None | Resolution::VoucherSpent(_) => {
                        (false, None, 0, Some("not_found"))
                    }
                };
                let schema = Arc::new(discounts_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&code)?;
                encoder.encode_field(&valid)?;
                encoder.encode_field(&kind)?;
                encoder.encode_field(&percent)?;
                encoder.encode_field(&reason)?;
                let row: PgWireResult<_> = Ok(encoder.take_row());
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(vec![row]),
                ))])
            }
            Command::SelectLoyalty { customer_id } => {
                let summary = engine.loyalty_summary(customer_id).await;
                let schema = Arc::new(loyalty_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&customer_id.to_string())?;
                encoder.encode_field(&(summary.completed as i64))?;
                encoder.encode_field(&(summary.earned as i64))?;
                encoder.encode_field(&(summary.used as i64))?;
                encoder.encode_field(&(summary.available as i64))?;
                encoder.encode_field(&(summary.progress_in_cycle as i64))?;
                encoder.encode_field(&(summary.remaining_to_next as i64))?;
                encoder.encode_field(&i32::from(summary.discount_percent))?;
                let row: PgWireResult<_> = Ok(encoder.take_row());
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(vec![row]),
                ))])
            }
            Command::SelectVouchers { customer_id, status } => {
                let vouchers = engine.list_vouchers(customer_id).await;
                let schema = Arc::new(vouchers_schema());
                let rows: Vec<PgWireResult<_>> = vouchers
                    .into_iter()
                    .filter(|v| status.is_none_or(|s| v.status == s))
                    .map(|v| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&v.id.to_string())?;
                        encoder.encode_field(&v.code)?;
                        encoder.encode_field(&i32::from(v.discount_percent))?;
                        encoder.encode_field(&v.status.as_str())?;
                        encoder.encode_field(&v.created_at.to_rfc3339())?;
                        encoder.encode_field(&v.expires_at.map(|d| d.to_string()))?;
                        encoder.encode_field(&v.used_at.map(|t| t.to_rfc3339()))?;
                        encoder.encode_field(&v.used_reservation_id.map(|id| id.to_string()))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
        }
    }
}

fn encode_reservation_row(
    schema: &Arc<Vec<FieldInfo>>,
    row: &ReservationRow,
) -> PgWireResult<pgwire::messages::data::DataRow> {
    let r = &row.reservation;
    let mut encoder = DataRowEncoder::new(schema.clone());
    encoder.encode_field(&r.id.to_string())?;
    encoder.encode_field(&r.customer_id.to_string())?;
    encoder.encode_field(&r.item_id.to_string())?;
    encoder.encode_field(&row.item_name)?;
    encoder.encode_field(&r.range.from.to_string())?;
    encoder.encode_field(&r.range.to.to_string())?;
    encoder.encode_field(&r.status.as_str())?;
    encoder.encode_field(&r.discount_code)?;
    encoder.encode_field(&i32::from(r.discount_percent))?;
    encoder.encode_field(&r.unit_rate.to_string())?;
    encoder.encode_field(&r.final_price.to_string())?;
    encoder.encode_field(&r.shipping_ref)?;
    encoder.encode_field(&r.payment_method.as_str())?;
    encoder.encode_field(&r.payment_status.as_str())?;
    encoder.encode_field(&r.created_at.to_rfc3339())?;
    encoder.encode_field(&r.updated_at.to_rfc3339())?;
    Ok(encoder.take_row())
}

// ── Row schemas ──────────────────────────────────────────────────

fn varchar(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int8(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn int4(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT4, FieldFormat::Text)
}

fn boolean(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::BOOL, FieldFormat::Text)
}

fn items_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        varchar("name"),
        varchar("daily_rate"),
        boolean("active"),
    ]
}

fn reservations_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        varchar("customer_id"),
        varchar("item_id"),
        varchar("item_name"),
        varchar("date_from"),
        varchar("date_to"),
        varchar("status"),
        varchar("discount_code"),
        int4("discount_percent"),
        varchar("unit_rate"),
        varchar("final_price"),
        varchar("shipping_ref"),
        varchar("payment_method"),
        varchar("payment_status"),
        varchar("created_at"),
        varchar("updated_at"),
    ]
}

fn created_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        int4("discount_percent"),
        varchar("final_price"),
        varchar("payment_status"),
        boolean("applied_voucher"),
    ]
}

fn quote_schema() -> Vec<FieldInfo> {
    vec![
        int8("days"),
        varchar("unit_rate"),
        varchar("subtotal"),
        int4("discount_percent"),
        varchar("discount_amount"),
        varchar("total"),
    ]
}

fn availability_schema() -> Vec<FieldInfo> {
    vec![
        varchar("item_id"),
        varchar("date_from"),
        varchar("date_to"),
        boolean("available"),
    ]
}

fn discounts_schema() -> Vec<FieldInfo> {
    vec![
        varchar("code"),
        boolean("valid"),
        varchar("kind"),
        int4("discount_percent"),
        varchar("reason"),
    ]
}

fn loyalty_schema() -> Vec<FieldInfo> {
    vec![
        varchar("customer_id"),
        int8("completed"),
        int8("earned"),
        int8("used"),
        int8("available"),
        int8("progress_in_cycle"),
        int8("remaining_to_next"),
        int4("discount_percent"),
    ]
}

fn vouchers_schema() -> Vec<FieldInfo> {
    vec![
        varchar("id"),
        varchar("code"),
        int4("discount_percent"),
        varchar("status"),
        varchar("created_at"),
        varchar("expires_at"),
        varchar("used_at"),
        varchar("used_reservation_id"),
    ]
}

/// Result schema advertised for a statement during describe, before any
/// execution. Keyed off the dialect's table names.
fn schema_for_statement(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.trim().to_uppercase();
    if upper.starts_with("INSERT") {
        if upper.contains("RETURNING") && upper.contains("RESERVATIONS") {
            return created_schema();
        }
        return vec![];
    }
    if !upper.contains("SELECT") {
        return vec![];
    }
    if upper.contains("FROM QUOTE") {
        quote_schema()
    } else if upper.contains("FROM AVAILABILITY") {
        availability_schema()
    } else if upper.contains("FROM DISCOUNTS") {
        discounts_schema()
    } else if upper.contains("FROM LOYALTY") {
        loyalty_schema()
    } else if upper.contains("FROM VOUCHERS") {
        vouchers_schema()
    } else if upper.contains("FROM ITEMS") {
        items_schema()
    } else if upper.contains("FROM RESERVATIONS") {
        reservations_schema()
    } else {
        vec![]
    }
}

// ── Simple Query Protocol ────────────────────────────────────────

#[async_trait]
impl SimpleQueryHandler for CastellanHandler {
    async fn do_query<C>(&self, _client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        self.run(query).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct CastellanQueryParser;

#[async_trait]
impl QueryParser for CastellanQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(schema_for_statement(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for CastellanHandler {
    type Statement = String;
    type QueryParser = CastellanQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        let mut responses = self.run(&sql).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            schema_for_statement(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(schema_for_statement(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
                && n > max
            {
                max = n;
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct CastellanFactory {
    handler: Arc<CastellanHandler>,
    auth_handler: Arc<
        CleartextPasswordAuthStartupHandler<
            crate::auth::CastellanAuthSource,
            DefaultServerParameterProvider,
        >,
    >,
    noop: Arc<NoopHandler>,
}

impl CastellanFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = crate::auth::CastellanAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(CastellanHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for CastellanFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one TCP connection to completion.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> Result<(), std::io::Error> {
    let factory = CastellanFactory::new(engine, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Error mapping ────────────────────────────────────────────────

/// Engine errors keep their machine-readable reason token at the front of
/// the message; the SQLSTATE groups them by failure class.
fn engine_err(e: EngineError) -> PgWireError {
    let code = match &e {
        EngineError::Validation(_) => "22023",
        EngineError::NotFound(_) | EngineError::CodeNotFound(_) => "P0002",
        EngineError::AlreadyExists(_) => "23505",
        EngineError::Unavailable { .. }
        | EngineError::InvalidDiscount(_)
        | EngineError::DiscountAlreadyUsed(_)
        | EngineError::IllegalTransition { .. } => "P0001",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "XX000",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
