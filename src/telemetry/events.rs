use serde::Serialize;
use tracing::info;

/// Domain events written to the `business_events` log target as one JSON line each.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum BusinessEvent {
    UserRegistered {
        user_id: i64,
        email_redacted: String,
    },
    UserLoggedIn {
        user_id: i64,
    },
    LoginFailed {
        email_redacted: String,
        reason: String,
    },
    UserDeleted {
        user_id: i64,
        qrs_deleted: u64,
        pages_deleted: u64,
    },
    QrCreated {
        qr_id: i64,
        user_id: i64,
        provisioned_page_id: Option<i64>,
    },
    QrUpdated {
        qr_id: i64,
        user_id: i64,
        fields: Vec<String>,
    },
    QrRelinked {
        qr_id: i64,
        page_id: i64,
        user_id: i64,
    },
    QrDeleted {
        qr_id: i64,
        user_id: i64,
        detached_page_id: Option<i64>,
    },
    PageCreated {
        page_id: i64,
        user_id: i64,
        qr_id: Option<i64>,
        element_count: usize,
    },
    PageUpdated {
        page_id: i64,
        user_id: i64,
        fields: Vec<String>,
    },
    PageDeleted {
        page_id: i64,
        user_id: i64,
    },
    FilesAttached {
        page_id: i64,
        user_id: i64,
        count: usize,
        bytes: u64,
    },
    FileDetached {
        page_id: i64,
        user_id: i64,
    },
}

pub fn redact_email(email: &str) -> String {
    let trimmed = email.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return "***".to_string();
    };
    match local.chars().next() {
        Some(first_char) if !domain.is_empty() => format!("{first_char}***@{domain}"),
        _ => "***".to_string(),
    }
}

impl BusinessEvent {
    pub fn log(&self) {
        let event_json = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        info!(
            target: "business_events",
            event = %event_json,
            "Business event occurred"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_valid_email() {
        assert_eq!(redact_email("alice@example.com"), "a***@example.com");
    }

    #[test]
    fn redacts_malformed_values() {
        assert_eq!(redact_email("invalid"), "***");
        assert_eq!(redact_email("@example.com"), "***");
        assert_eq!(redact_email("alice@"), "***");
        assert_eq!(redact_email(""), "***");
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = BusinessEvent::QrCreated {
            qr_id: 7,
            user_id: 1,
            provisioned_page_id: Some(3),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "QrCreated");
        assert_eq!(value["provisioned_page_id"], 3);
    }
}
