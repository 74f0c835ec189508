use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    dto::{double_option, pages::PageResponse},
    models::qrs::Qr,
    usecases::ownership::{NewQrInput, QrPatch},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQrRequest {
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub src: Option<String>,
    pub page_name: Option<String>,
}

impl From<CreateQrRequest> for NewQrInput {
    fn from(req: CreateQrRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            link: req.link.filter(|link| !link.trim().is_empty()),
            src: req.src,
            page_name: req.page_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQrRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub src: Option<String>,
    pub link: Option<String>,
}

impl From<UpdateQrRequest> for QrPatch {
    fn from(req: UpdateQrRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            src: req.src,
            link: req.link,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelinkQrRequest {
    pub page_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QrResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub src: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Qr> for QrResponse {
    fn from(qr: Qr) -> Self {
        Self {
            id: qr.id,
            user_id: qr.user_id,
            name: qr.name,
            description: qr.description,
            link: qr.link,
            src: qr.src,
            created_at: qr.created_at,
            updated_at: qr.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateQrResponse {
    pub qr: QrResponse,
    /// The page provisioned for a QR created without an external link.
    pub page: Option<PageResponse>,
}
