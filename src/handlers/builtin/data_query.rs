//! Data lookup handler used to feed context into prompts.

use serde_json::Value;
use tracing::debug;

use crate::error::RpcResult;
use crate::handlers::{Handler, HandlerParams};

/// Known questions and their canned answers.
const KNOWN_ANSWERS: &[(&str, &str)] = &[
    ("北京的常住人口有多少？", "北京的常住人口有2亿人"),
    (
        "幸福无限有限公司的年收入是多少？",
        "幸福无限有限公司的年收入是10000亿",
    ),
];

const FALLBACK_ANSWER: &str = "sample data";

/// Answers `{"query": string}` with `{"result": string}`.
pub struct DataQueryHandler;

impl DataQueryHandler {
    /// Look up the answer for a query.
    pub fn lookup(query: &str) -> &'static str {
        KNOWN_ANSWERS
            .iter()
            .find(|(question, _)| *question == query)
            .map(|(_, answer)| *answer)
            .unwrap_or(FALLBACK_ANSWER)
    }
}

impl Handler for DataQueryHandler {
    fn request_type(&self) -> &str {
        "data_query"
    }

    fn validate(&self, params: &HandlerParams) -> RpcResult<()> {
        params.require_string("query")
    }

    fn handle(&self, params: HandlerParams) -> RpcResult<Value> {
        let query = params.get_string("query")?;
        debug!(query = %query, "Data query");
        Ok(serde_json::json!({ "result": Self::lookup(&query) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_question() {
        let result = DataQueryHandler
            .handle(HandlerParams::new(json!({"query": "北京的常住人口有多少？"})))
            .unwrap();
        assert_eq!(result["result"], "北京的常住人口有2亿人");
    }

    #[test]
    fn test_unknown_question_falls_back() {
        let result = DataQueryHandler
            .handle(HandlerParams::new(json!({"query": "sample_filter"})))
            .unwrap();
        assert_eq!(result, json!({"result": "sample data"}));
    }

    #[test]
    fn test_query_required() {
        assert!(DataQueryHandler
            .validate(&HandlerParams::new(json!({"q": "typo"})))
            .is_err());
    }
}
