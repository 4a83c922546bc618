use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    middleware::auth::AuthenticatedClient,
    models::domain::{
        AddDomainRequest, DnsRecord, DnsRecordPatch, NameserversRequest, PurchaseRequest,
        TransferRequest,
    },
    services::{
        dns::{format_dns_record, is_valid_domain},
        domains::{DomainApiError, VercelClient},
    },
    AppState,
};

type ApiError = (StatusCode, Json<Value>);

fn registrar(state: &AppState) -> Result<&VercelClient, ApiError> {
    state.domains.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "Domain management is not configured" })),
    ))
}

fn validated(name: &str) -> Result<String, ApiError> {
    let name = name.trim().to_lowercase();
    if !is_valid_domain(&name) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid domain name: {name}") })),
        ));
    }
    Ok(name)
}

fn upstream(e: DomainApiError) -> ApiError {
    let code = match e.status() {
        Some(StatusCode::NOT_FOUND) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    (code, Json(json!({ "error": e.to_string() })))
}

/// GET /domains
pub async fn list_domains(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
) -> Result<Json<Value>, ApiError> {
    let domains = registrar(&state)?.list_domains().await.map_err(upstream)?;
    Ok(Json(json!({ "domains": domains })))
}

/// GET /domains/{name}
pub async fn get_domain(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    let domain = registrar(&state)?.get_domain(&name).await.map_err(upstream)?;
    Ok(Json(json!({ "domain": domain })))
}

/// GET /domains/{name}/availability
pub async fn check_availability(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    let availability = registrar(&state)?
        .check_availability(&name)
        .await
        .map_err(upstream)?;
    Ok(Json(json!(availability)))
}

/// POST /domains/purchase
pub async fn purchase_domain(
    State(state): State<AppState>,
    AuthenticatedClient(client): AuthenticatedClient,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&body.name)?;
    let purchase = registrar(&state)?
        .purchase_domain(&name, body.years)
        .await
        .map_err(upstream)?;
    tracing::info!("Client {} purchased {}", client.id, name);
    Ok(Json(json!(purchase)))
}

/// POST /projects/{project_id}/domains
pub async fn add_domain(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(project_id): Path<String>,
    Json(body): Json<AddDomainRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&body.name)?;
    let ack = registrar(&state)?
        .add_domain(&project_id, &name)
        .await
        .map_err(upstream)?;
    Ok(Json(json!(ack)))
}

/// GET /domains/{name}/records
pub async fn list_records(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    let records = registrar(&state)?
        .get_dns_records(&name)
        .await
        .map_err(upstream)?;
    let display: Vec<String> = records.iter().map(format_dns_record).collect();
    Ok(Json(json!({ "records": records, "display": display })))
}

/// POST /domains/{name}/records
pub async fn create_record(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
    Json(record): Json<DnsRecord>,
) -> Result<(StatusCode, Json<DnsRecord>), ApiError> {
    let name = validated(&name)?;
    let created = registrar(&state)?
        .create_dns_record(&name, &record)
        .await
        .map_err(upstream)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /domains/{name}/records/{record_id}
pub async fn update_record(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path((name, record_id)): Path<(String, String)>,
    Json(patch): Json<DnsRecordPatch>,
) -> Result<Json<DnsRecord>, ApiError> {
    let name = validated(&name)?;
    let updated = registrar(&state)?
        .update_dns_record(&name, &record_id, &patch)
        .await
        .map_err(upstream)?;
    Ok(Json(updated))
}

/// DELETE /domains/{name}/records/{record_id}
pub async fn delete_record(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path((name, record_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    let deleted = registrar(&state)?
        .delete_dns_record(&name, &record_id)
        .await
        .map_err(upstream)?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// POST /domains/{name}/transfer
pub async fn transfer_domain(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    let ack = registrar(&state)?
        .transfer_domain(&name, &body.auth_code)
        .await
        .map_err(upstream)?;
    Ok(Json(json!(ack)))
}

/// PUT /domains/{name}/nameservers
pub async fn update_nameservers(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
    Json(body): Json<NameserversRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    if let Some(bad) = body.nameservers.iter().find(|ns| !is_valid_domain(ns)) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid nameserver: {bad}") })),
        ));
    }
    let updated = registrar(&state)?
        .update_nameservers(&name, &body.nameservers)
        .await
        .map_err(upstream)?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /domains/{name}/verify
pub async fn verify_domain(
    State(state): State<AppState>,
    AuthenticatedClient(_client): AuthenticatedClient,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let name = validated(&name)?;
    let verification = registrar(&state)?
        .verify_domain(&name)
        .await
        .map_err(upstream)?;
    Ok(Json(json!(verification)))
}
