use std::fmt;
use std::sync::Arc;

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use cursor_api::{
    ArrayValue, BackendReader, ComplexKind, ComplexValue, CursorError, FeatureFlags, MapValue,
    MetadataProvider, PrimitiveKind, RawValue, Result, Scalar, StatementType, StructValue,
};

use crate::convert::{coerce, convert, convert_json, convert_primitive};
use crate::grammar::descriptor_kind;

/// Column holding per-row affected counts in DML results.
pub const AFFECTED_ROWS_COLUMN: &str = "num_affected_rows";

/// Column addressed by 1-based index or by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column<'a> {
    Index(usize),
    Label(&'a str),
}

impl From<usize> for Column<'_> {
    fn from(index: usize) -> Self {
        Column::Index(index)
    }
}

impl<'a> From<&'a str> for Column<'a> {
    fn from(label: &'a str) -> Self {
        Column::Label(label)
    }
}

impl<'a> From<&'a String> for Column<'a> {
    fn from(label: &'a String) -> Self {
        Column::Label(label)
    }
}

impl fmt::Display for Column<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Index(i) => write!(f, "#{i}"),
            Column::Label(l) => write!(f, "'{l}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Before the first `advance`.
    Created,
    /// On a row; 0-based index.
    Positioned(i64),
    Exhausted,
    Closed,
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// Forward-only, read-only row cursor over a backend reader.
///
/// Accessors address columns by 1-based index or label. A NULL cell yields the
/// accessor's default (`0`, `false`, `None`) and sets [`was_null`](Self::was_null).
pub struct ResultCursor {
    reader: Option<Box<dyn BackendReader>>,
    metadata: Arc<dyn MetadataProvider>,
    statement_type: StatementType,
    flags: Arc<dyn FeatureFlags>,
    state: CursorState,
    highest_visited: i64,
    was_null: bool,
    update_count: Option<i64>,
    on_close: Option<CloseHook>,
}

impl ResultCursor {
    pub fn new(
        reader: Box<dyn BackendReader>,
        metadata: Arc<dyn MetadataProvider>,
        statement_type: StatementType,
        flags: Arc<dyn FeatureFlags>,
    ) -> Self {
        Self {
            reader: Some(reader),
            metadata,
            statement_type,
            flags,
            state: CursorState::Created,
            highest_visited: -1,
            was_null: false,
            update_count: None,
            on_close: None,
        }
    }

    /// Run `hook` once when the cursor closes, e.g. so a statement can forget it.
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    pub fn metadata(&self) -> &dyn MetadataProvider {
        self.metadata.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() { Err(CursorError::Closed) } else { Ok(()) }
    }

    fn reader_mut(&mut self) -> Result<&mut Box<dyn BackendReader>> {
        self.reader.as_mut().ok_or(CursorError::Closed)
    }

    // ═══════════════════════════════════════════════════════════════
    //  Movement
    // ═══════════════════════════════════════════════════════════════

    /// Move to the next row. Returns `false` once the rows are exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        self.check_open()?;
        if self.state == CursorState::Exhausted {
            return Ok(false);
        }
        let reader = self.reader_mut()?;
        if reader.advance()? {
            let row = reader.current_row_index();
            self.state = CursorState::Positioned(row);
            self.highest_visited = self.highest_visited.max(row);
            Ok(true)
        } else {
            tracing::trace!(rows = self.highest_visited + 1, "cursor exhausted");
            self.state = CursorState::Exhausted;
            Ok(false)
        }
    }

    /// Advance until the 1-based row `row` is current.
    ///
    /// Only rows past the furthest one already visited can be reached, and
    /// `row` must be positive. Returns `false` if the result has fewer than
    /// `row` rows.
    pub fn seek_absolute(&mut self, row: i64) -> Result<bool> {
        self.check_open()?;
        if row < 1 {
            return Err(CursorError::unsupported(format!(
                "moving to row {row}; a forward-only cursor only seeks to positive rows"
            )));
        }
        let target = row - 1;
        if target <= self.highest_visited {
            return Err(CursorError::unsupported(format!(
                "moving to row {row} after visiting row {} on a forward-only cursor",
                self.highest_visited + 1
            )));
        }
        while self.advance()? {
            if self.state == CursorState::Positioned(target) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn relative(&mut self, _rows: i64) -> Result<bool> {
        self.forward_only("relative")
    }

    pub fn previous(&mut self) -> Result<bool> {
        self.forward_only("previous")
    }

    pub fn first(&mut self) -> Result<bool> {
        self.forward_only("first")
    }

    pub fn last(&mut self) -> Result<bool> {
        self.forward_only("last")
    }

    pub fn before_first(&mut self) -> Result<()> {
        self.forward_only("before_first").map(|_| ())
    }

    pub fn after_last(&mut self) -> Result<()> {
        self.forward_only("after_last").map(|_| ())
    }

    fn forward_only(&self, operation: &str) -> Result<bool> {
        self.check_open()?;
        Err(CursorError::unsupported(format!("{operation} on a forward-only cursor")))
    }

    /// 1-based current row, `0` when not on a row.
    pub fn row(&self) -> Result<i64> {
        self.check_open()?;
        Ok(match self.state {
            CursorState::Positioned(row) => row + 1,
            _ => 0,
        })
    }

    pub fn is_before_first(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.state == CursorState::Created)
    }

    pub fn is_after_last(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.state == CursorState::Exhausted && self.highest_visited >= 0)
    }

    pub fn is_first(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.state == CursorState::Positioned(0))
    }

    pub fn is_last(&self) -> Result<bool> {
        self.check_open()?;
        let on_row = matches!(self.state, CursorState::Positioned(_));
        Ok(on_row && self.reader.as_ref().is_some_and(|r| !r.has_next()))
    }

    // ═══════════════════════════════════════════════════════════════
    //  Column access
    // ═══════════════════════════════════════════════════════════════

    /// Whether the last value read was SQL NULL.
    pub fn was_null(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.was_null)
    }

    /// 1-based index of the first column whose label matches, ignoring case.
    pub fn find_column(&self, label: &str) -> Result<usize> {
        self.check_open()?;
        self.metadata
            .resolve_label(label)
            .ok_or_else(|| CursorError::LabelNotFound(label.to_string()))
    }

    fn column_index(&self, column: Column<'_>) -> Result<usize> {
        match column {
            Column::Index(index) if index < 1 => {
                Err(CursorError::InvalidColumn { index, count: self.metadata.column_count() })
            }
            Column::Index(index) => Ok(index),
            Column::Label(label) => self.find_column(label),
        }
    }

    /// Raw cell of the current row; records the null flag.
    fn read_raw(&mut self, column: Column<'_>) -> Result<(usize, RawValue)> {
        self.check_open()?;
        let index = self.column_index(column)?;
        match self.state {
            CursorState::Created => {
                return Err(CursorError::InvalidState("cursor is before the first row".into()));
            }
            CursorState::Exhausted => {
                return Err(CursorError::InvalidState("cursor is after the last row".into()));
            }
            CursorState::Positioned(_) | CursorState::Closed => {}
        }
        let raw = self.reader_mut()?.raw_value(index - 1)?;
        self.was_null = raw.is_null();
        Ok((index, raw))
    }

    /// Current cell converted to the column's primitive type.
    ///
    /// Complex columns read as their text form.
    fn read_scalar(&mut self, column: Column<'_>) -> Result<Option<(usize, Scalar)>> {
        let (index, raw) = self.read_raw(column)?;
        if raw.is_null() {
            return Ok(None);
        }
        let type_text = self.metadata.column_type_text(index)?;
        let scalar = match self.metadata.column_sql_type(index)?.complex_kind() {
            Some(_) => Scalar::String(complex_text(&raw, type_text)),
            None => convert_primitive(&raw, PrimitiveKind::of(type_text))
                .map_err(|e| e.with_context(format!("column {index}")))?,
        };
        Ok(Some((index, scalar)))
    }

    fn read_or<'a, T>(
        &mut self,
        column: impl Into<Column<'a>>,
        default: T,
        f: impl FnOnce(&Scalar) -> Result<T>,
    ) -> Result<T> {
        match self.read_scalar(column.into())? {
            Some((_, scalar)) => f(&scalar),
            None => Ok(default),
        }
    }

    fn read_opt<'a, T>(
        &mut self,
        column: impl Into<Column<'a>>,
        f: impl FnOnce(&Scalar) -> Result<T>,
    ) -> Result<Option<T>> {
        self.read_scalar(column.into())?.map(|(_, scalar)| f(&scalar)).transpose()
    }

    pub fn get_bool<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<bool> {
        self.read_or(column, false, coerce::to_bool)
    }

    pub fn get_byte<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<i8> {
        self.read_or(column, 0, coerce::to_i8)
    }

    pub fn get_short<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<i16> {
        self.read_or(column, 0, coerce::to_i16)
    }

    pub fn get_int<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<i32> {
        self.read_or(column, 0, coerce::to_i32)
    }

    pub fn get_long<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<i64> {
        self.read_or(column, 0, coerce::to_i64)
    }

    pub fn get_float<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<f32> {
        self.read_or(column, 0.0, coerce::to_f32)
    }

    pub fn get_double<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<f64> {
        self.read_or(column, 0.0, coerce::to_f64)
    }

    /// Decimal at the column's declared scale, rounded half away from zero.
    ///
    /// FLOAT and DOUBLE columns keep the value's own scale.
    pub fn get_decimal<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<BigDecimal>> {
        let Some((index, scalar)) = self.read_scalar(column.into())? else {
            return Ok(None);
        };
        let value = coerce::to_decimal(&scalar)?;
        if self.metadata.column_sql_type(index)?.is_floating() {
            return Ok(Some(value));
        }
        Ok(Some(match self.metadata.column_scale(index)? {
            Some(scale) => with_scale(value, scale),
            None => value,
        }))
    }

    pub fn get_decimal_with_scale<'a>(
        &mut self,
        column: impl Into<Column<'a>>,
        scale: u32,
    ) -> Result<Option<BigDecimal>> {
        self.read_opt(column, |s| coerce::to_decimal(s).map(|d| with_scale(d, scale)))
    }

    pub fn get_string<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<String>> {
        self.read_opt(column, |s| Ok(coerce::to_string(s)))
    }

    pub fn get_bytes<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<Vec<u8>>> {
        self.read_opt(column, coerce::to_bytes)
    }

    pub fn get_date<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<NaiveDate>> {
        self.read_opt(column, coerce::to_date)
    }

    /// Time of day; timestamp cells keep only their time component.
    pub fn get_time<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<NaiveTime>> {
        self.read_opt(column, coerce::to_time)
    }

    pub fn get_timestamp<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<NaiveDateTime>> {
        self.read_opt(column, coerce::to_timestamp)
    }

    /// Midnight of the stored date, read as wall-clock time in `tz`.
    pub fn get_date_in<'a, Tz: TimeZone>(
        &mut self,
        column: impl Into<Column<'a>>,
        tz: &Tz,
    ) -> Result<Option<DateTime<Tz>>> {
        self.get_date(column)?
            .map(|date| in_zone(date.and_time(NaiveTime::MIN), tz))
            .transpose()
    }

    /// Stored time of day on 1970-01-01, read as wall-clock time in `tz`.
    pub fn get_time_in<'a, Tz: TimeZone>(
        &mut self,
        column: impl Into<Column<'a>>,
        tz: &Tz,
    ) -> Result<Option<DateTime<Tz>>> {
        self.get_time(column)?
            .map(|time| in_zone(DateTime::<Utc>::UNIX_EPOCH.date_naive().and_time(time), tz))
            .transpose()
    }

    /// Stored wall-clock fields reinterpreted in `tz` (not converted).
    pub fn get_timestamp_in<'a, Tz: TimeZone>(
        &mut self,
        column: impl Into<Column<'a>>,
        tz: &Tz,
    ) -> Result<Option<DateTime<Tz>>> {
        self.get_timestamp(column)?.map(|ts| in_zone(ts, tz)).transpose()
    }

    /// Cell as a value tree.
    ///
    /// Complex columns decode fully when complex type support is on, and
    /// otherwise come back as their canonical text in a STRING scalar.
    pub fn get_object<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<ComplexValue>> {
        let (index, raw) = self.read_raw(column.into())?;
        if raw.is_null() {
            return Ok(None);
        }
        let type_text = self.metadata.column_type_text(index)?.to_string();
        let value = match self.metadata.column_sql_type(index)?.complex_kind() {
            Some(_) if self.flags.complex_types_enabled() => decode_complex(index, &raw, &type_text)?,
            Some(_) => ComplexValue::Scalar(Scalar::String(complex_text(&raw, &type_text))),
            None => ComplexValue::Scalar(
                convert_primitive(&raw, PrimitiveKind::of(&type_text))
                    .map_err(|e| e.with_context(format!("column {index}")))?,
            ),
        };
        Ok(Some(value))
    }

    pub fn get_array<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<ArrayValue>> {
        match self.read_complex(column.into(), ComplexKind::Array)? {
            None => Ok(None),
            Some((type_text, ComplexValue::Array(items))) => Ok(Some(ArrayValue::new(type_text, items))),
            Some((type_text, other)) => Err(unexpected_shape(&type_text, &other)),
        }
    }

    pub fn get_struct<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<StructValue>> {
        match self.read_complex(column.into(), ComplexKind::Struct)? {
            None => Ok(None),
            Some((type_text, ComplexValue::Struct(fields))) => Ok(Some(StructValue::new(type_text, fields))),
            Some((type_text, other)) => Err(unexpected_shape(&type_text, &other)),
        }
    }

    pub fn get_map<'a>(&mut self, column: impl Into<Column<'a>>) -> Result<Option<MapValue>> {
        match self.read_complex(column.into(), ComplexKind::Map)? {
            None => Ok(None),
            Some((type_text, ComplexValue::Map(entries))) => Ok(Some(MapValue::new(type_text, entries))),
            Some((type_text, other)) => Err(unexpected_shape(&type_text, &other)),
        }
    }

    /// Shared gate for the complex accessors: closed, then feature flag, then
    /// declared column type.
    fn read_complex(&mut self, column: Column<'_>, kind: ComplexKind) -> Result<Option<(String, ComplexValue)>> {
        self.check_open()?;
        if !self.flags.complex_types_enabled() {
            tracing::debug!(%column, kind = %kind, "complex datatype support is disabled");
            return Err(CursorError::ComplexTypeDisabled(kind));
        }
        let index = self.column_index(column)?;
        let type_text = self.metadata.column_type_text(index)?.to_string();
        let declared = self.metadata.column_sql_type(index)?;
        if declared.complex_kind() != Some(kind) || descriptor_kind(&type_text) != Some(kind) {
            return Err(CursorError::ColumnTypeMismatch { column: index, expected: kind, actual: type_text });
        }
        let (_, raw) = self.read_raw(Column::Index(index))?;
        if raw.is_null() {
            return Ok(None);
        }
        let value = decode_complex(index, &raw, &type_text)?;
        Ok(Some((type_text, value)))
    }

    // ═══════════════════════════════════════════════════════════════
    //  Update count
    // ═══════════════════════════════════════════════════════════════

    /// Whether this result reports affected rows.
    pub fn has_update_count(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.reports_update_count())
    }

    fn reports_update_count(&self) -> bool {
        match self.statement_type {
            StatementType::Update => true,
            StatementType::Query | StatementType::Metadata => false,
            StatementType::None | StatementType::Sql => {
                let total = self
                    .metadata
                    .total_rows()
                    .or_else(|| self.reader.as_ref().and_then(|r| r.row_count()));
                self.metadata.resolve_label(AFFECTED_ROWS_COLUMN).is_some() && total == Some(1)
            }
        }
    }

    /// Rows affected by the statement.
    ///
    /// Query and metadata results report `0`. Otherwise every remaining row's
    /// affected count is summed, advancing the cursor to the end. The total is
    /// cached.
    pub fn get_update_count(&mut self) -> Result<i64> {
        self.check_open()?;
        if let Some(count) = self.update_count {
            return Ok(count);
        }
        let count = if self.reports_update_count() {
            let column = self.metadata.resolve_label(AFFECTED_ROWS_COLUMN).unwrap_or(1);
            let mut total: i64 = 0;
            while self.advance()? {
                total = total.saturating_add(self.get_long(column)?);
            }
            total
        } else {
            0
        };
        tracing::debug!(statement = ?self.statement_type, count, "computed update count");
        self.update_count = Some(count);
        Ok(count)
    }

    // ═══════════════════════════════════════════════════════════════
    //  Lifecycle
    // ═══════════════════════════════════════════════════════════════

    /// Release the backend reader. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = CursorState::Closed;
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
        if let Some(hook) = self.on_close.take() {
            hook();
        }
        tracing::debug!(rows_visited = self.highest_visited + 1, "cursor closed");
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        self.close();
    }
}

fn unexpected_shape(type_text: &str, value: &ComplexValue) -> CursorError {
    CursorError::InvalidState(format!("{type_text} column decoded to a {} value", value.kind_name()))
}

/// Round half away from zero, padding with trailing zeros up to `scale`.
fn with_scale(value: BigDecimal, scale: u32) -> BigDecimal {
    value.with_scale_round(i64::from(scale), RoundingMode::HalfUp)
}

fn in_zone<Tz: TimeZone>(local: NaiveDateTime, tz: &Tz) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| CursorError::conversion(local, "TIMESTAMP", "local time does not exist in the requested zone"))
}

/// Complex cells arrive as JSON text from inline results and as decoded
/// trees from columnar chunks.
fn decode_complex(index: usize, raw: &RawValue, type_text: &str) -> Result<ComplexValue> {
    let result = match raw {
        RawValue::Text(text) => convert_json(text, type_text),
        other => convert(other, type_text),
    };
    result.map_err(|e| {
        tracing::error!(column = index, type_text, error = %e, "failed to convert complex value");
        e.with_context(format!("column {index}"))
    })
}

/// Canonical text of a complex cell; undecodable text is returned as-is.
fn complex_text(raw: &RawValue, type_text: &str) -> String {
    match raw {
        RawValue::Text(text) => match convert_json(text, type_text) {
            Ok(value) => value.to_string(),
            Err(_) => text.clone(),
        },
        other => match convert(other, type_text) {
            Ok(value) => value.to_string(),
            Err(_) => other.leaf_text().unwrap_or_default(),
        },
    }
}

impl fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor")
            .field("state", &self.state)
            .field("statement_type", &self.statement_type)
            .field("was_null", &self.was_null)
            .field("update_count", &self.update_count)
            .finish_non_exhaustive()
    }
}
