use serde::{Deserialize, Serialize};

/// One normalized headline returned by `GET /fetch_news`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub source_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FetchNewsParams {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub content: String,
}

impl SummarizeRequest {
    /// Returns the content to summarize, rejecting blank input.
    pub fn validated_content(&self) -> crate::error::Result<&str> {
        if self.content.trim().is_empty() {
            return Err(crate::error::AppError::Validation(
                "Content cannot be empty.".to_string(),
            ));
        }
        Ok(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_rejected() {
        let req = SummarizeRequest { content: " \n\t ".into() };
        assert!(req.validated_content().is_err());
    }

    #[test]
    fn absent_optional_fields_serialize_as_null() {
        let article = Article {
            title: "t".into(),
            url: "https://example.com".into(),
            description: None,
            source_name: None,
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["source_name"], serde_json::Value::Null);
    }
}
