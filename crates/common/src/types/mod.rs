use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Success envelope shared by every JSON endpoint.
///
/// `count` is only emitted for collection responses and `message` only for
/// mutations, so a single read serializes as `{"success":true,"data":...}`.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, count: None, message: None, data }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, count: None, message: Some(message.into()), data }
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        Self { success: true, count: Some(items.len()), message: None, data: items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_counts_items() {
        let env = Envelope::list(vec![1, 2, 3]);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 3);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn single_envelope_omits_count() {
        let json = serde_json::to_value(Envelope::with_message("saved", "x")).unwrap();
        assert!(json.get("count").is_none());
        assert_eq!(json["message"], "saved");
        assert_eq!(json["data"], "x");
    }
}
