//! Common test utilities for E2E tests
//!
//! `TestServer` binds an in-process fake of the REST data service: in-memory
//! tables with filter operators, embedded selects, ordering, item ranges,
//! unique favorites and foreign-key checks, plus a request log.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use autolote::auth::session::{TokenClaims, encode_unsigned_token};
use autolote::{Marketplace, config};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

type Row = Map<String, Value>;

// =============================================================================
// Schema
// =============================================================================

const PRIMARY_KEYS: &[(&str, &str)] = &[
    ("cars", "id_cars"),
    ("cars_images", "id_cars_images"),
    ("images", "id_images"),
    ("audit", "id_audit"),
    ("users", "id_user"),
    ("wishlist", "id_wishlist"),
    ("brands", "id_brands"),
    ("models", "id_models"),
    ("styles", "id_styles"),
    ("transmissions", "id_transmissions"),
    ("displacements", "id_displacements"),
    ("fuel", "id_fuel"),
    ("years", "id_years"),
];

/// (table, column, referenced table)
const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("cars", "id_audit", "audit"),
    ("cars", "id_users", "users"),
    ("cars_images", "id_cars", "cars"),
    ("cars_images", "id_images", "images"),
    ("wishlist", "id_cars", "cars"),
    ("wishlist", "id_users", "users"),
    ("images", "id_audit", "audit"),
    ("users", "id_audit", "audit"),
    ("users", "id_images", "images"),
];

/// To-one embeds: (table, relation, local column)
const TO_ONE: &[(&str, &str, &str)] = &[
    ("cars", "brands", "id_brands"),
    ("cars", "models", "id_models"),
    ("cars", "styles", "id_styles"),
    ("cars", "transmissions", "id_transmission"),
    ("cars", "displacements", "id_displacement"),
    ("cars", "fuel", "id_fuel"),
    ("cars", "years", "id_year"),
    ("cars", "audit", "id_audit"),
    ("cars", "users", "id_users"),
    ("cars_images", "images", "id_images"),
    ("users", "audit", "id_audit"),
    ("users", "images", "id_images"),
    ("images", "audit", "id_audit"),
];

/// To-many embeds: (table, relation, column in the relation)
const TO_MANY: &[(&str, &str, &str)] = &[("cars", "cars_images", "id_cars")];

/// Column sets that must be unique per table
const UNIQUE: &[(&str, &[&str])] = &[("wishlist", &["id_users", "id_cars"])];

fn primary_key(table: &str) -> &'static str {
    PRIMARY_KEYS
        .iter()
        .find(|(name, _)| *name == table)
        .map_or("id", |(_, pk)| pk)
}

// =============================================================================
// Query parsing and matching
// =============================================================================

#[derive(Debug, Clone)]
struct Filter {
    column: String,
    op: String,
    value: String,
}

#[derive(Debug, Clone)]
enum SelectItem {
    Star,
    Column(String),
    Embed {
        relation: String,
        inner_join: bool,
        items: Vec<SelectItem>,
    },
}

fn split_top_level(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (index, c) in raw.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn parse_select(raw: &str) -> Vec<SelectItem> {
    split_top_level(raw)
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part == "*" {
                SelectItem::Star
            } else if let Some(open) = part.find('(') {
                let (relation, hint) = part[..open].split_once('!').unwrap_or((&part[..open], ""));
                let inner = &part[open + 1..part.len() - 1];
                SelectItem::Embed {
                    relation: relation.to_string(),
                    inner_join: hint == "inner",
                    items: parse_select(inner),
                }
            } else {
                SelectItem::Column(part.to_string())
            }
        })
        .collect()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn compare(value: &Value, raw: &str) -> Option<Ordering> {
    if value.is_null() {
        return None;
    }
    match (value.as_f64(), raw.parse::<f64>().ok()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(scalar_text(value).as_str().cmp(raw)),
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let Some(mut rest) = text.strip_prefix(parts[0]) else {
        return false;
    };
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(parts[parts.len() - 1])
}

fn matches(row: &Row, filter: &Filter) -> bool {
    let value = row.get(&filter.column).unwrap_or(&Value::Null);
    match filter.op.as_str() {
        "eq" => !value.is_null() && scalar_text(value) == filter.value,
        "neq" => !value.is_null() && scalar_text(value) != filter.value,
        "gte" => compare(value, &filter.value).is_some_and(|o| o != Ordering::Less),
        "lte" => compare(value, &filter.value).is_some_and(|o| o != Ordering::Greater),
        "ilike" => {
            !value.is_null()
                && glob_match(
                    &filter.value.to_lowercase(),
                    &scalar_text(value).to_lowercase(),
                )
        }
        "in" => {
            let list = filter.value.trim_start_matches('(').trim_end_matches(')');
            let text = scalar_text(value);
            list.split(',').any(|item| item.trim() == text)
        }
        "is" => match filter.value.as_str() {
            "null" => value.is_null(),
            "true" => *value == Value::Bool(true),
            "false" => *value == Value::Bool(false),
            _ => false,
        },
        _ => false,
    }
}

// =============================================================================
// Fake database
// =============================================================================

/// One request as the fake service received it
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: Method,
    pub resource: String,
    pub query: Vec<(String, String)>,
    pub range: Option<String>,
    pub prefer: Option<String>,
}

impl RequestRecord {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct ApiFailure {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.code,
            "message": self.message,
            "details": null,
            "hint": null,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

/// In-memory tables behind the fake service
pub struct FakeDb {
    tables: HashMap<String, Vec<Row>>,
    next_id: HashMap<String, i64>,
    requests: Vec<RequestRecord>,
    failures: Vec<(Method, String)>,
}

impl FakeDb {
    fn new() -> Self {
        Self {
            tables: PRIMARY_KEYS
                .iter()
                .map(|(table, _)| (table.to_string(), Vec::new()))
                .collect(),
            next_id: HashMap::new(),
            requests: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    fn exists(&self, table: &str, key: &Value) -> bool {
        let pk = primary_key(table);
        self.rows(table).iter().any(|row| row.get(pk) == Some(key))
    }

    fn check_references(&self, table: &str, row: &Row) -> Result<(), ApiFailure> {
        for (child, column, parent) in FOREIGN_KEYS {
            if *child != table {
                continue;
            }
            match row.get(*column) {
                None | Some(Value::Null) => {}
                Some(key) if self.exists(parent, key) => {}
                Some(key) => {
                    return Err(ApiFailure::new(
                        StatusCode::CONFLICT,
                        "23503",
                        format!("insert or update on table \"{table}\" violates foreign key constraint: {column}={key} not present in \"{parent}\""),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_unique(&self, table: &str, row: &Row, ignore: Option<&Value>) -> Result<(), ApiFailure> {
        let pk = primary_key(table);
        for (name, columns) in UNIQUE {
            if *name != table {
                continue;
            }
            let duplicate = self.rows(table).iter().any(|existing| {
                existing.get(pk) != ignore
                    && columns.iter().all(|column| existing.get(*column) == row.get(*column))
            });
            if duplicate {
                return Err(ApiFailure::new(
                    StatusCode::CONFLICT,
                    "23505",
                    format!("duplicate key value violates unique constraint \"{table}_unique\""),
                ));
            }
        }
        Ok(())
    }

    fn insert(&mut self, table: &str, mut row: Row) -> Result<Row, ApiFailure> {
        let pk = primary_key(table);
        let next = self.next_id.entry(table.to_string()).or_insert(1);
        match row.get(pk).and_then(Value::as_i64) {
            Some(id) => *next = (*next).max(id + 1),
            None => {
                row.insert(pk.to_string(), json!(*next));
                *next += 1;
            }
        }

        if table == "audit" {
            let now = chrono::Utc::now().to_rfc3339();
            for column in ["created_at", "updated_at"] {
                if row.get(column).is_none_or(Value::is_null) {
                    row.insert(column.to_string(), json!(now));
                }
            }
        }

        self.check_references(table, &row)?;
        self.check_unique(table, &row, None)?;
        self.tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    fn render(&self, table: &str, row: &Row, items: &[SelectItem]) -> Row {
        let mut out = Row::new();
        for item in items {
            match item {
                SelectItem::Star => {
                    for (key, value) in row {
                        out.insert(key.clone(), value.clone());
                    }
                }
                SelectItem::Column(column) => {
                    out.insert(column.clone(), row.get(column).cloned().unwrap_or(Value::Null));
                }
                SelectItem::Embed { relation, items, .. } => {
                    out.insert(relation.clone(), self.embed(table, row, relation, items));
                }
            }
        }
        out
    }

    fn embed(&self, table: &str, row: &Row, relation: &str, items: &[SelectItem]) -> Value {
        if let Some((_, _, column)) = TO_ONE
            .iter()
            .find(|(t, r, _)| *t == table && *r == relation)
        {
            let key = row.get(*column).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                return Value::Null;
            }
            let pk = primary_key(relation);
            return self
                .rows(relation)
                .iter()
                .find(|target| target.get(pk) == Some(&key))
                .map_or(Value::Null, |target| {
                    Value::Object(self.render(relation, target, items))
                });
        }

        if let Some((_, _, column)) = TO_MANY
            .iter()
            .find(|(t, r, _)| *t == table && *r == relation)
        {
            let key = row.get(primary_key(table));
            return Value::Array(
                self.rows(relation)
                    .iter()
                    .filter(|child| child.get(*column) == key)
                    .map(|child| Value::Object(self.render(relation, child, items)))
                    .collect(),
            );
        }

        Value::Null
    }

    fn matching_keys(&self, table: &str, filters: &[Filter]) -> Vec<Value> {
        let pk = primary_key(table);
        self.rows(table)
            .iter()
            .filter(|row| filters.iter().all(|filter| matches(row, filter)))
            .filter_map(|row| row.get(pk).cloned())
            .collect()
    }

    fn handle_get(
        &self,
        table: &str,
        filters: &[Filter],
        select: &[SelectItem],
        order: Option<&str>,
        headers: &HeaderMap,
    ) -> Response {
        let (embedded, direct): (Vec<&Filter>, Vec<&Filter>) =
            filters.iter().partition(|f| f.column.contains('.'));

        let mut rows: Vec<&Row> = self
            .rows(table)
            .iter()
            .filter(|row| direct.iter().all(|filter| matches(row, filter)))
            .collect();

        if let Some(order) = order {
            let (column, direction) = order.split_once('.').unwrap_or((order, "asc"));
            rows.sort_by(|a, b| {
                let a = a.get(column).unwrap_or(&Value::Null);
                let b = b.get(column).unwrap_or(&Value::Null);
                let ordering = compare(a, &scalar_text(b)).unwrap_or(Ordering::Equal);
                if direction == "desc" { ordering.reverse() } else { ordering }
            });
        }

        let mut rendered: Vec<Row> = rows
            .iter()
            .map(|row| self.render(table, row, select))
            .collect();

        // An embedded filter blanks the relation; !inner then drops the row.
        for filter in embedded {
            let (relation, column) = filter.column.split_once('.').unwrap_or_default();
            let inner = Filter {
                column: column.to_string(),
                op: filter.op.clone(),
                value: filter.value.clone(),
            };
            for row in &mut rendered {
                if let Some(Value::Object(target)) = row.get(relation) {
                    if !matches(target, &inner) {
                        row.insert(relation.to_string(), Value::Null);
                    }
                }
            }
        }

        let inner_joins: Vec<&str> = select
            .iter()
            .filter_map(|item| match item {
                SelectItem::Embed { relation, inner_join: true, .. } => Some(relation.as_str()),
                _ => None,
            })
            .collect();
        rendered.retain(|row| {
            inner_joins
                .iter()
                .all(|relation| row.get(*relation).is_some_and(|value| !value.is_null()))
        });

        let total = rendered.len();
        let counted = headers
            .get("prefer")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("count=exact"));
        let total_label = if counted { total.to_string() } else { "*".to_string() };

        let range = headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split_once('-'))
            .and_then(|(a, b)| Some((a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?)));

        let (status, items, content_range) = match range {
            None if total == 0 => (StatusCode::OK, Vec::new(), format!("*/{total_label}")),
            None => (StatusCode::OK, rendered, format!("0-{}/{total_label}", total - 1)),
            Some(_) if total == 0 => (StatusCode::OK, Vec::new(), format!("*/{total_label}")),
            Some((start, _)) if start >= total => {
                let mut response = ApiFailure::new(
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    "PGRST103",
                    "Requested range not satisfiable",
                )
                .into_response();
                set_content_range(&mut response, &format!("*/{total}"));
                return response;
            }
            Some((start, end)) => {
                let end = end.min(total - 1);
                let status = if end - start + 1 < total {
                    StatusCode::PARTIAL_CONTENT
                } else {
                    StatusCode::OK
                };
                let items = rendered[start..=end].to_vec();
                (status, items, format!("{start}-{end}/{total_label}"))
            }
        };

        let body = Value::Array(items.into_iter().map(Value::Object).collect());
        let mut response = (status, axum::Json(body)).into_response();
        set_content_range(&mut response, &content_range);
        response
    }

    fn handle_post(&mut self, table: &str, body: Value, representation: bool) -> Response {
        let rows = match body {
            Value::Array(rows) => rows,
            other => vec![other],
        };

        let mut created = Vec::new();
        for row in rows {
            let Value::Object(row) = row else {
                return ApiFailure::new(StatusCode::BAD_REQUEST, "PGRST102", "expected an object")
                    .into_response();
            };
            match self.insert(table, row) {
                Ok(row) => created.push(Value::Object(row)),
                Err(failure) => return failure.into_response(),
            }
        }

        if representation {
            (StatusCode::CREATED, axum::Json(Value::Array(created))).into_response()
        } else {
            StatusCode::CREATED.into_response()
        }
    }

    fn handle_patch(
        &mut self,
        table: &str,
        filters: &[Filter],
        body: Value,
        representation: bool,
    ) -> Response {
        let Value::Object(changes) = body else {
            return ApiFailure::new(StatusCode::BAD_REQUEST, "PGRST102", "expected an object")
                .into_response();
        };

        let pk = primary_key(table);
        let keys = self.matching_keys(table, filters);
        let mut updated = Vec::new();
        for key in &keys {
            let Some(current) = self.rows(table).iter().find(|row| row.get(pk) == Some(key)) else {
                continue;
            };
            let mut patched = current.clone();
            for (column, value) in &changes {
                patched.insert(column.clone(), value.clone());
            }
            if let Err(failure) = self.check_references(table, &patched) {
                return failure.into_response();
            }
            if let Err(failure) = self.check_unique(table, &patched, Some(key)) {
                return failure.into_response();
            }
            updated.push(patched);
        }

        if let Some(rows) = self.tables.get_mut(table) {
            for patched in &updated {
                if let Some(row) = rows.iter_mut().find(|row| row.get(pk) == patched.get(pk)) {
                    *row = patched.clone();
                }
            }
        }

        if representation {
            let body = Value::Array(updated.into_iter().map(Value::Object).collect());
            (StatusCode::OK, axum::Json(body)).into_response()
        } else {
            StatusCode::NO_CONTENT.into_response()
        }
    }

    fn handle_delete(&mut self, table: &str, filters: &[Filter]) -> Response {
        let pk = primary_key(table);
        let keys: HashSet<String> = self
            .matching_keys(table, filters)
            .iter()
            .map(scalar_text)
            .collect();

        for (child, column, parent) in FOREIGN_KEYS {
            if *parent != table {
                continue;
            }
            let referenced = self.rows(child).iter().any(|row| {
                row.get(*column)
                    .filter(|value| !value.is_null())
                    .is_some_and(|value| keys.contains(&scalar_text(value)))
            });
            if referenced {
                return ApiFailure::new(
                    StatusCode::CONFLICT,
                    "23503",
                    format!("update or delete on table \"{table}\" violates foreign key constraint on table \"{child}\""),
                )
                .into_response();
            }
        }

        if let Some(rows) = self.tables.get_mut(table) {
            rows.retain(|row| {
                row.get(pk)
                    .is_none_or(|value| !keys.contains(&scalar_text(value)))
            });
        }
        StatusCode::NO_CONTENT.into_response()
    }
}

fn set_content_range(response: &mut Response, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert("content-range", value);
    }
}

type SharedDb = Arc<Mutex<FakeDb>>;

async fn handle(
    State(db): State<SharedDb>,
    method: Method,
    Path(resource): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let pairs: Vec<(String, String)> =
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let mut db = db.lock().unwrap();
    db.requests.push(RequestRecord {
        method: method.clone(),
        resource: resource.clone(),
        query: pairs.clone(),
        range: header("range"),
        prefer: header("prefer"),
    });

    if let Some(index) = db
        .failures
        .iter()
        .position(|(m, table)| *m == method && *table == resource)
    {
        db.failures.remove(index);
        return ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "XX000", "injected failure")
            .into_response();
    }

    if !db.tables.contains_key(&resource) {
        return ApiFailure::new(
            StatusCode::NOT_FOUND,
            "PGRST205",
            format!("Could not find the table 'public.{resource}'"),
        )
        .into_response();
    }

    let mut select = vec![SelectItem::Star];
    let mut order = None;
    let mut filters = Vec::new();
    for (key, value) in &pairs {
        match key.as_str() {
            "select" => select = parse_select(value),
            "order" => order = Some(value.clone()),
            _ => {
                let (op, operand) = value.split_once('.').unwrap_or((value.as_str(), ""));
                filters.push(Filter {
                    column: key.clone(),
                    op: op.to_string(),
                    value: operand.to_string(),
                });
            }
        }
    }

    let representation = header("prefer").is_some_and(|v| v.contains("return=representation"));
    let body = || serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

    match method {
        Method::GET => db.handle_get(&resource, &filters, &select, order.as_deref(), &headers),
        Method::POST => db.handle_post(&resource, body(), representation),
        Method::PATCH => db.handle_patch(&resource, &filters, body(), representation),
        Method::DELETE => db.handle_delete(&resource, &filters),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

// =============================================================================
// Test server
// =============================================================================

/// Listing attributes for seeding
#[derive(Debug, Clone)]
pub struct ListingSeed {
    pub owner: i64,
    pub brand: i64,
    pub model: i64,
    pub style: i64,
    pub year: i64,
    pub price: i64,
    pub doors: i32,
    pub exterior_color: &'static str,
    pub sold: bool,
    pub images: usize,
}

impl Default for ListingSeed {
    fn default() -> Self {
        Self {
            owner: 0,
            brand: 1,
            model: 1,
            style: 1,
            year: 3,
            price: 5_000_000,
            doors: 4,
            exterior_color: "Blanco",
            sold: false,
            images: 1,
        }
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub db: SharedDb,
    pub market: Marketplace,
    pub _temp_dir: TempDir,
}

impl TestServer {
    /// Start a fake data service and a marketplace pointed at it
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db: SharedDb = Arc::new(Mutex::new(FakeDb::new()));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let app = Router::new()
            .route("/:resource", any(handle))
            .with_state(db.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = config::AppConfig::for_base_url(addr.clone(), temp_dir.path());
        let market = Marketplace::new(config).unwrap();

        Self {
            addr,
            db,
            market,
            _temp_dir: temp_dir,
        }
    }

    /// Insert a row directly, returning its primary key
    pub fn insert(&self, table: &str, row: Value) -> i64 {
        let Value::Object(row) = row else {
            panic!("rows are objects");
        };
        let mut db = self.db.lock().unwrap();
        let row = db
            .insert(table, row)
            .unwrap_or_else(|failure| panic!("seed insert into {table} failed: {}", failure.message));
        row[primary_key(table)].as_i64().unwrap()
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        let db = self.db.lock().unwrap();
        db.rows(table).iter().cloned().map(Value::Object).collect()
    }

    pub fn count(&self, table: &str) -> usize {
        self.db.lock().unwrap().rows(table).len()
    }

    pub fn find(&self, table: &str, id: i64) -> Option<Value> {
        let pk = primary_key(table);
        self.rows(table)
            .into_iter()
            .find(|row| row[pk].as_i64() == Some(id))
    }

    pub fn requests(&self) -> Vec<RequestRecord> {
        self.db.lock().unwrap().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.db.lock().unwrap().requests.clear();
    }

    /// Make the next `method` request on `table` fail with a 500
    pub fn fail_next(&self, method: Method, table: &str) {
        self.db
            .lock()
            .unwrap()
            .failures
            .push((method, table.to_string()));
    }

    /// Brands, models, styles, transmissions, displacements, fuel and years 2018-2024
    pub fn seed_catalog(&self) {
        for (id, desc) in [(1, "Toyota"), (2, "Honda"), (3, "Hyundai")] {
            self.insert("brands", json!({"id_brands": id, "desc": desc}));
        }
        for (id, desc) in [(1, "Corolla"), (2, "Civic"), (3, "Tucson"), (4, "Yaris"), (5, "Hilux")] {
            self.insert("models", json!({"id_models": id, "desc": desc}));
        }
        for (id, desc) in [(1, "Sedán"), (2, "SUV"), (3, "Pickup")] {
            self.insert("styles", json!({"id_styles": id, "desc": desc}));
        }
        for (id, desc) in [(1, "Manual"), (2, "Automática")] {
            self.insert("transmissions", json!({"id_transmissions": id, "desc": desc}));
        }
        for (id, desc) in [(1, 1500), (2, 2000)] {
            self.insert("displacements", json!({"id_displacements": id, "desc": desc}));
        }
        for (id, desc) in [(1, "Gasolina"), (2, "Diésel")] {
            self.insert("fuel", json!({"id_fuel": id, "desc": desc}));
        }
        for (id, year) in (1..=7).zip(2018..=2024) {
            self.insert("years", json!({"id_years": id, "desc": year.to_string()}));
        }
    }

    fn seed_audit(&self) -> i64 {
        self.insert(
            "audit",
            json!({"created_at": "2024-01-01T00:00:00+00:00", "updated_at": "2024-01-01T00:00:00+00:00"}),
        )
    }

    /// User with an audit row and a profile picture
    pub fn seed_user(&self, name: &str) -> i64 {
        let user_audit = self.seed_audit();
        let image_audit = self.seed_audit();
        let image = self.insert(
            "images",
            json!({"image": png_data_url([0, 120, 200]), "id_audit": image_audit}),
        );
        self.insert(
            "users",
            json!({
                "name": name,
                "last_name": "Prueba",
                "email": format!("{}@example.com", name.to_lowercase()),
                "phone": "88887777",
                "idcard": "1-0000-0000",
                "age": 30,
                "rol": 2,
                "id_audit": user_audit,
                "id_images": image,
            }),
        )
    }

    /// Listing with its audit row, pictures and join rows
    pub fn seed_listing(&self, seed: ListingSeed) -> i64 {
        let audit = self.seed_audit();
        let id = self.insert(
            "cars",
            json!({
                "id_brands": seed.brand,
                "id_models": seed.model,
                "id_styles": seed.style,
                "exterior_color": seed.exterior_color,
                "interior_color": "Negro",
                "id_transmission": 1,
                "id_displacement": 1,
                "id_fuel": 1,
                "receives": false,
                "negotiable": true,
                "number_of_doors": seed.doors,
                "id_year": seed.year,
                "price": seed.price,
                "id_audit": audit,
                "sold": seed.sold,
                "id_users": seed.owner,
            }),
        );
        for index in 0..seed.images {
            let shade = (index * 40 % 255) as u8;
            let image = self.insert("images", json!({"image": png_data_url([shade, 80, 40])}));
            self.insert("cars_images", json!({"id_cars": id, "id_images": image}));
        }
        id
    }

    pub fn seed_favorite(&self, user: i64, listing: i64) -> i64 {
        self.insert("wishlist", json!({"id_users": user, "id_cars": listing}))
    }

    /// Store a session token for `user_id`
    pub fn login_as(&self, user_id: i64) {
        let claims = TokenClaims {
            id_user: user_id,
            rol: Some(2),
            name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            email: Some("test@example.com".to_string()),
            idcard: None,
            age: None,
            id_audit: None,
            iat: Some(chrono::Utc::now().timestamp()),
        };
        let token = encode_unsigned_token(&claims).unwrap();
        self.market.tokens.save(&token).unwrap();
    }
}

/// Encoded bytes of a small solid-color PNG
pub fn png_bytes(rgb: [u8; 3]) -> Vec<u8> {
    let picture = image::RgbImage::from_pixel(16, 12, image::Rgb(rgb));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(picture)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Small solid-color PNG as a `data:` URL
pub fn png_data_url(rgb: [u8; 3]) -> String {
    use base64::Engine as _;

    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(rgb))
    )
}
