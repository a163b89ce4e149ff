use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::language::display_name;
use crate::database::models::{Device, NewDevice, User};
use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::services::{PreferenceService, ServiceError};

const INVALID_REQUEST: &str = "invalid request";
const FORBIDDEN: &str = "forbidden";
const NOT_FOUND: &str = "not found";

/// Request body: `{"operation": "<name>", "variables": {...}}`.
#[derive(Debug, Deserialize)]
struct QueryRequest {
    operation: String,
    #[serde(default)]
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct LanguageVariables {
    language: String,
}

#[derive(Debug, Deserialize)]
struct DeviceVariables {
    device: NewDevice,
}

#[derive(Debug, Deserialize)]
struct DeleteUserVariables {
    id: UserId,
}

/// User ids arrive as strings (the id scalar) but plain numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserId {
    Number(i64),
    Text(String),
}

impl UserId {
    fn parse(self) -> Result<i64, String> {
        match self {
            UserId::Number(id) => Ok(id),
            UserId::Text(text) => text
                .parse()
                .map_err(|_| format!("invalid user id: {:?}", text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CurrentUser,
    SetLanguageForCurrentUser { language: String },
    AddDeviceForCurrentUser { device: NewDevice },
    Users,
    DeleteUser { id: i64 },
}

impl Operation {
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        let request: QueryRequest = serde_json::from_slice(body).map_err(|e| e.to_string())?;
        let variables = request.variables;

        let operation = match request.operation.as_str() {
            "currentUser" => Operation::CurrentUser,
            "users" => Operation::Users,
            "setLanguageForCurrentUser" => {
                let vars: LanguageVariables = from_variables(variables)?;
                Operation::SetLanguageForCurrentUser {
                    language: vars.language,
                }
            }
            "addDeviceForCurrentUser" => {
                let vars: DeviceVariables = from_variables(variables)?;
                Operation::AddDeviceForCurrentUser {
                    device: vars.device,
                }
            }
            "deleteUser" => {
                let vars: DeleteUserVariables = from_variables(variables)?;
                Operation::DeleteUser {
                    id: vars.id.parse()?,
                }
            }
            other => return Err(format!("unknown operation: {:?}", other)),
        };

        Ok(operation)
    }

    /// Name of the response field the result is written under.
    pub fn field(&self) -> &'static str {
        match self {
            Operation::CurrentUser => "currentUser",
            Operation::SetLanguageForCurrentUser { .. } => "setLanguageForCurrentUser",
            Operation::AddDeviceForCurrentUser { .. } => "addDeviceForCurrentUser",
            Operation::Users => "users",
            Operation::DeleteUser { .. } => "deleteUser",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Operation::Users | Operation::DeleteUser { .. })
    }
}

fn from_variables<T: for<'de> Deserialize<'de>>(variables: Value) -> Result<T, String> {
    serde_json::from_value(variables).map_err(|e| format!("invalid variables: {}", e))
}

/// POST /query - resolve one operation for the authenticated principal
pub async fn query(
    State(service): State<PreferenceService>,
    ctx: RequestContext,
    body: Bytes,
) -> Response {
    match resolve(&service, &ctx, &body).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => err.respond(ctx.span()),
    }
}

async fn resolve(
    service: &PreferenceService,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Value, ApiError> {
    let principal = ctx.authenticated()?;
    let operation =
        Operation::parse(body).map_err(|e| ApiError::bad_request(INVALID_REQUEST).caused_by(e))?;

    if operation.requires_admin() && !principal.is_admin {
        return Err(ApiError::forbidden(FORBIDDEN));
    }

    let field = operation.field();
    match operation {
        Operation::CurrentUser => {
            let outcome = service.get_user(principal.user_id).await;
            field_result(field, outcome.map(|user| user_json(&user)), Value::Null)
        }
        Operation::SetLanguageForCurrentUser { language } => {
            let outcome = set_language(service, principal.user_id, language).await;
            field_result(field, outcome.map(|user| user_json(&user)), Value::Null)
        }
        Operation::AddDeviceForCurrentUser { device } => {
            let outcome = service.add_device(principal.user_id, device).await;
            field_result(field, outcome.map(|device| device_json(&device)), Value::Null)
        }
        Operation::Users => {
            let outcome = service.get_users().await;
            let users = outcome.map(|users| Value::Array(users.iter().map(user_json).collect()));
            field_result(field, users, Value::Array(Vec::new()))
        }
        Operation::DeleteUser { id } => {
            let outcome = service.delete_user(id).await;
            field_result(field, outcome.map(|()| Value::Bool(true)), Value::Bool(false))
        }
    }
}

async fn set_language(
    service: &PreferenceService,
    user_id: i64,
    language: String,
) -> Result<User, ServiceError> {
    service.upsert_user(&User::new(user_id, language)).await?;
    service.get_user(user_id).await
}

/// Wrap a resolver outcome into `{"data": {field: ...}}`. NotFound becomes
/// `missing` plus an `errors` entry; anything else is an internal failure.
fn field_result(
    field: &'static str,
    outcome: Result<Value, ServiceError>,
    missing: Value,
) -> Result<Value, ApiError> {
    let mut data = Map::new();
    match outcome {
        Ok(value) => {
            data.insert(field.to_string(), value);
            Ok(json!({ "data": data }))
        }
        Err(err) if err.is_not_found() => {
            data.insert(field.to_string(), missing);
            Ok(json!({
                "data": data,
                "errors": [{ "message": NOT_FOUND, "path": [field] }],
            }))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn user_json(user: &User) -> Value {
    json!({
        "id": user.id.to_string(),
        "settings": {
            "language": {
                "code": user.language,
                "name": display_name(&user.language),
            }
        },
        "devices": user.devices.iter().map(device_json).collect::<Vec<_>>(),
    })
}

pub fn device_json(device: &Device) -> Value {
    json!({
        "id": device.id,
        "name": device.name,
        "settings": {
            "frequency": device.settings.frequency,
            "priceChanged": device.settings.price_changed,
        }
    })
}
