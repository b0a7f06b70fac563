use std::collections::BTreeMap;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use divvy_core::{split_items, split_total, ExpenseItem, Money};
use divvy_ocr::PipelineError;
use divvy_storage::ReceiptRecord;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

// ── DTOs ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ItemDto {
    pub item: String,
    pub amount: f64,
    pub category: String,
}

impl From<ExpenseItem> for ItemDto {
    fn from(item: ExpenseItem) -> Self {
        ItemDto {
            item: item.item,
            amount: item.amount.to_f64(),
            category: item.category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub raw_text: String,
    pub total_amount: f64,
    pub items: Vec<ItemDto>,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub people: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SplitResponse {
    pub split: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReceiptRequest {
    pub title: String,
    pub total_amount: f64,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub people: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptDto {
    pub id: String,
    pub title: String,
    pub total_amount: f64,
    pub raw_text: String,
    pub split_between_people: Value,
    pub created_at: String,
}

impl From<ReceiptRecord> for ReceiptDto {
    fn from(record: ReceiptRecord) -> Self {
        let split = serde_json::from_str(&record.split_between_people)
            .unwrap_or_else(|_| Value::Object(Default::default()));
        ReceiptDto {
            total_amount: record.total_amount().to_f64(),
            id: record.id,
            title: record.title,
            raw_text: record.raw_text,
            split_between_people: split,
            created_at: record.created_at,
        }
    }
}

fn to_float_map(shares: BTreeMap<String, Money>) -> BTreeMap<String, f64> {
    shares.into_iter().map(|(k, v)| (k, v.to_f64())).collect()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /upload — multipart `file` field holding image or PDF bytes.
pub async fn upload_receipt(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut upload: Option<(Vec<u8>, Option<String>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            upload = Some((bytes.to_vec(), filename));
            break;
        }
    }
    let (bytes, filename) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    // The pipeline is pure CPU work; keep it off the async workers.
    let pipeline = state.pipeline.clone();
    let result =
        tokio::task::spawn_blocking(move || pipeline.process(&bytes, filename.as_deref()))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

    let response = match result {
        Ok(parsed) => UploadResponse {
            raw_text: parsed.raw_text,
            total_amount: parsed.total_amount.to_f64(),
            items: parsed.items.into_iter().map(Into::into).collect(),
        },
        // An OCR engine failure is fatal to this upload but not to the
        // request: the caller gets a structured response describing it.
        Err(PipelineError::Ocr(e)) => {
            tracing::warn!("OCR failed for upload: {e}");
            UploadResponse {
                raw_text: format!("Error processing receipt: {e}"),
                total_amount: 0.0,
                items: Vec::new(),
            }
        }
        Err(e) => return Err(ApiError::UnreadableUpload(e.to_string())),
    };

    Ok(Json(response))
}

/// POST /split — divide itemized amounts across people.
pub async fn split_expense(
    Json(request): Json<SplitRequest>,
) -> ApiResult<Json<SplitResponse>> {
    let shares = split_items(&request.items, &request.people)?;
    Ok(Json(SplitResponse { split: to_float_map(shares) }))
}

/// POST /receipts — confirm an upload: compute the split and persist it.
pub async fn create_receipt(
    State(state): State<AppState>,
    Json(request): Json<CreateReceiptRequest>,
) -> ApiResult<(StatusCode, Json<ReceiptDto>)> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title cannot be empty".to_string()));
    }
    let total = Money::from_f64(request.total_amount)
        .ok_or_else(|| ApiError::BadRequest("Invalid total amount".to_string()))?;
    if total < Money::zero() {
        return Err(ApiError::BadRequest("Total amount cannot be negative".to_string()));
    }

    let shares = split_total(total, &request.people)?;
    let split_json = serde_json::to_string(&to_float_map(shares))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let record = divvy_storage::insert_receipt(
        &state.db,
        request.title.trim(),
        total.to_cents(),
        &request.raw_text,
        &split_json,
    )
    .await?;

    tracing::info!(id = %record.id, total = %record.total_amount(), "receipt stored");
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /receipts — stored receipts, newest first.
pub async fn list_receipts(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ReceiptDto>>> {
    let receipts = divvy_storage::get_all_receipts(&state.db).await?;
    Ok(Json(receipts.into_iter().map(Into::into).collect()))
}

/// GET /receipts/{id}
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReceiptDto>> {
    let receipt = divvy_storage::get_receipt_by_id(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(receipt.into()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
