use crate::converter::convert_workbook;
use crate::converter::has_excel_extension;
use crate::converter::ConversionResult;
use crate::converter::ConvertError;
use crate::error::ExcelSchemaError;
use crate::server::error::ApiError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::Multipart;
use axum::Json;
use serde_json::json;
use serde_json::Value;
use tracing::info;

/// Multipart field that carries the workbook.
const FILE_FIELD: &str = "file";

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Excel to SQL Converter API" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/upload`: converts the uploaded workbook into table schemas.
pub async fn upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Json<ConversionResult>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field.bytes().await?;
            upload = Some((file_name, bytes));
            break;
        }
    }
    let (file_name, bytes) = upload.ok_or_else(|| ApiError::unprocessable("Field 'file' is required"))?;

    if !has_excel_extension(&file_name) {
        Err(ExcelSchemaError::from(ConvertError::InvalidFileExtensionError))?
    }
    info!(file = %file_name, size = bytes.len(), "received upload");

    let name = file_name.clone();
    let result = tokio::task::spawn_blocking(move || convert_workbook(&name, bytes.to_vec()))
        .await
        .map_err(ApiError::internal)??;
    info!(file = %file_name, tables = result.tables.len(), "converted upload");
    Ok(Json(result))
}
