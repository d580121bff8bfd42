use chrono::{DateTime, Local};
use google_sheets4::api::{
    BasicFilter, BatchUpdateSpreadsheetRequest, GridProperties, GridRange, Request,
    SetBasicFilterRequest, Sheet, SheetProperties, Spreadsheet, SpreadsheetProperties,
    UpdateSheetPropertiesRequest, ValueRange,
};
use google_sheets4::{hyper, hyper_rustls, FieldMask, Sheets};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, RemoteStep};
use crate::resolve::ResolvedParams;

pub type HttpsConnector = hyper_rustls::HttpsConnector<hyper::client::HttpConnector>;

/// Title of the single sheet in every created document.
pub const SHEET_TITLE: &str = "Sheet1";

const TITLE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TITLE_SUFFIX: &str = "+gs";
const FROZEN_FIELDS: &str = "gridProperties.frozenRowCount,gridProperties.frozenColumnCount";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSpreadsheet {
    pub spreadsheet_id: String,
    pub sheet_id: i32,
}

/// Half-open cell rectangle, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: i32,
    pub end_row: i32,
    pub start_col: i32,
    pub end_col: i32,
}

/// The remote calls needed to produce one spreadsheet.
pub trait SpreadsheetBackend {
    /// Creates a document holding one sheet named [`SHEET_TITLE`].
    async fn create_spreadsheet(&self, title: &str) -> AppResult<CreatedSpreadsheet>;

    async fn write_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>]) -> AppResult<()>;

    async fn freeze_panes(&self, spreadsheet_id: &str, sheet_id: i32, rows: i32, cols: i32) -> AppResult<()>;

    async fn set_basic_filter(&self, spreadsheet_id: &str, sheet_id: i32, range: CellRange) -> AppResult<()>;
}

impl<T: SpreadsheetBackend> SpreadsheetBackend for &T {
    async fn create_spreadsheet(&self, title: &str) -> AppResult<CreatedSpreadsheet> {
        (**self).create_spreadsheet(title).await
    }

    async fn write_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>]) -> AppResult<()> {
        (**self).write_values(spreadsheet_id, range, rows).await
    }

    async fn freeze_panes(&self, spreadsheet_id: &str, sheet_id: i32, rows: i32, cols: i32) -> AppResult<()> {
        (**self).freeze_panes(spreadsheet_id, sheet_id, rows, cols).await
    }

    async fn set_basic_filter(&self, spreadsheet_id: &str, sheet_id: i32, range: CellRange) -> AppResult<()> {
        (**self).set_basic_filter(spreadsheet_id, sheet_id, range).await
    }
}

/// Sheets v4 through the generated `google-sheets4` client.
pub struct GoogleSheets {
    hub: Sheets<HttpsConnector>,
}

impl GoogleSheets {
    /// The hub uses `access_token` as is for every call. Fails when the
    /// platform certificate store cannot be loaded.
    pub fn new(access_token: String) -> AppResult<Self> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        let client = hyper::Client::builder().build::<_, hyper::Body>(https);
        Ok(Self {
            hub: Sheets::new(client, access_token),
        })
    }

    async fn batch_update(&self, spreadsheet_id: &str, request: Request, step: RemoteStep) -> AppResult<()> {
        let req = BatchUpdateSpreadsheetRequest {
            requests: Some(vec![request]),
            ..Default::default()
        };
        self.hub
            .spreadsheets()
            .batch_update(req, spreadsheet_id)
            .doit()
            .await
            .map_err(|e| AppError::remote(step, e))?;
        Ok(())
    }
}

impl SpreadsheetBackend for GoogleSheets {
    async fn create_spreadsheet(&self, title: &str) -> AppResult<CreatedSpreadsheet> {
        let step = RemoteStep::CreateSpreadsheet;
        let req = Spreadsheet {
            properties: Some(SpreadsheetProperties {
                title: Some(title.to_string()),
                ..Default::default()
            }),
            sheets: Some(vec![Sheet {
                properties: Some(SheetProperties {
                    title: Some(SHEET_TITLE.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let (_, created) = self
            .hub
            .spreadsheets()
            .create(req)
            .doit()
            .await
            .map_err(|e| AppError::remote(step, e))?;

        let spreadsheet_id = created
            .spreadsheet_id
            .ok_or_else(|| AppError::remote(step, "response has no spreadsheet id"))?;
        let sheet_id = created
            .sheets
            .as_ref()
            .and_then(|sheets| sheets.first())
            .and_then(|sheet| sheet.properties.as_ref())
            .and_then(|props| props.sheet_id)
            .unwrap_or(0);

        Ok(CreatedSpreadsheet {
            spreadsheet_id,
            sheet_id,
        })
    }

    async fn write_values(&self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>]) -> AppResult<()> {
        let values = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| serde_json::Value::String(cell.clone()))
                    .collect()
            })
            .collect();
        let req = ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_string()),
            values: Some(values),
            ..Default::default()
        };

        self.hub
            .spreadsheets()
            .values_update(req, spreadsheet_id, range)
            .value_input_option("RAW")
            .doit()
            .await
            .map_err(|e| AppError::remote(RemoteStep::WriteValues, e))?;
        Ok(())
    }

    async fn freeze_panes(&self, spreadsheet_id: &str, sheet_id: i32, rows: i32, cols: i32) -> AppResult<()> {
        let step = RemoteStep::FreezePanes;
        let fields = FROZEN_FIELDS
            .parse::<FieldMask>()
            .map_err(|e| AppError::remote(step, e))?;
        let request = Request {
            update_sheet_properties: Some(UpdateSheetPropertiesRequest {
                properties: Some(SheetProperties {
                    sheet_id: Some(sheet_id),
                    grid_properties: Some(GridProperties {
                        frozen_row_count: Some(rows),
                        frozen_column_count: Some(cols),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                fields: Some(fields),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.batch_update(spreadsheet_id, request, step).await
    }

    async fn set_basic_filter(&self, spreadsheet_id: &str, sheet_id: i32, range: CellRange) -> AppResult<()> {
        let request = Request {
            set_basic_filter: Some(SetBasicFilterRequest {
                filter: Some(BasicFilter {
                    range: Some(GridRange {
                        sheet_id: Some(sheet_id),
                        start_row_index: Some(range.start_row),
                        end_row_index: Some(range.end_row),
                        start_column_index: Some(range.start_col),
                        end_column_index: Some(range.end_col),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.batch_update(spreadsheet_id, request, RemoteStep::BasicFilter)
            .await
    }
}

/// `YYYYMMDDHHMMSS+gs` for the given moment.
pub fn default_title(now: DateTime<Local>) -> String {
    format!("{}{}", now.format(TITLE_TIMESTAMP_FORMAT), TITLE_SUFFIX)
}

pub fn spreadsheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}/edit", spreadsheet_id)
}

/// Creates a populated spreadsheet and returns its edit URL.
///
/// Calls are issued in order (create, write, freeze, filter) and the first
/// failure aborts the rest. A document created before the failure is left as is.
pub async fn write_spreadsheet<B: SpreadsheetBackend>(
    backend: &B,
    title: &str,
    rows: &[Vec<String>],
    params: &ResolvedParams,
) -> AppResult<String> {
    let freeze_rows = to_api_int("freeze-rows", params.freeze_rows)?;
    let freeze_cols = to_api_int("freeze-cols", params.freeze_cols)?;
    let filter_header_row = to_api_int("filter-header-row", params.filter_header_row)?;
    let row_count = to_api_int("row count", rows.len() as i64)?;
    let col_count = to_api_int(
        "column count",
        rows.iter().map(Vec::len).max().unwrap_or(0) as i64,
    )?;
    if filter_header_row > row_count {
        return Err(AppError::invalid_parameter(
            "filter-header-row",
            format!("row {} is past the last data row ({})", filter_header_row, row_count),
        ));
    }

    let title = if title.is_empty() {
        default_title(Local::now())
    } else {
        title.to_string()
    };

    info!("Creating spreadsheet {:?}", title);
    let created = backend.create_spreadsheet(&title).await?;
    debug!("Created spreadsheet {}", created.spreadsheet_id);

    if !rows.is_empty() {
        let range = format!("{}!A1", SHEET_TITLE);
        backend
            .write_values(&created.spreadsheet_id, &range, rows)
            .await?;
        info!("Wrote {} rows to {}", rows.len(), range);
    }

    if freeze_rows > 0 || freeze_cols > 0 {
        backend
            .freeze_panes(&created.spreadsheet_id, created.sheet_id, freeze_rows, freeze_cols)
            .await?;
        info!("Froze {} rows and {} columns", freeze_rows, freeze_cols);
    }

    if filter_header_row > 0 {
        let range = CellRange {
            start_row: filter_header_row - 1,
            end_row: row_count,
            start_col: 0,
            end_col: col_count,
        };
        backend
            .set_basic_filter(&created.spreadsheet_id, created.sheet_id, range)
            .await?;
        info!("Set basic filter over {:?}", range);
    }

    Ok(spreadsheet_url(&created.spreadsheet_id))
}

fn to_api_int(name: &str, value: i64) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|_| AppError::invalid_parameter(name, format!("{} is out of range", value)))
}
