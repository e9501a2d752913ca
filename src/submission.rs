//! Optional result submission: best-effort POST of a published record to
//! an external HTTP endpoint. Failures are logged and ignored; they
//! never affect whether the record is written locally. A successful
//! response may carry back an `evaluation` object, which the Session
//! Controller merges into the already-written JSONL line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload<'a> {
    pub session_id: &'a str,
    pub student_id: &'a str,
    pub video_id: &'a str,
    pub transcript: &'a str,
    pub confidence: f32,
    pub audio_file_path: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationData {
    #[serde(default)]
    pub similarity: f64,
    #[serde(default)]
    pub wer: f64,
    #[serde(default)]
    pub matched_ground_truth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionResponse {
    pub evaluation: Option<EvaluationData>,
}

/// POSTs `payload` to `endpoint` and returns the server's evaluation, if
/// any, to be merged into the JSONL record. Any failure (network,
/// non-2xx status, unparsable body) is logged at `warn!` and treated as
/// "no evaluation", never as fatal.
pub async fn submit(
    client: &reqwest::Client,
    endpoint: &str,
    payload: &SubmissionPayload<'_>,
) -> Option<EvaluationData> {
    let response = match client.post(endpoint).json(payload).send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(error = %err, "result submission failed, continuing without it");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "result submission rejected by endpoint");
        return None;
    }

    match response.json::<SubmissionResponse>().await {
        Ok(body) => body.evaluation,
        Err(err) => {
            tracing::warn!(error = %err, "result submission returned an unparsable body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_response_without_evaluation_field_parses_as_none() {
        let parsed: SubmissionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.evaluation.is_none());
    }

    #[test]
    fn evaluation_response_with_evaluation_field_parses() {
        let parsed: SubmissionResponse = serde_json::from_str(
            r#"{"evaluation": {"similarity": 0.9, "wer": 0.1, "matched_ground_truth": "cessna 481 ready"}}"#,
        )
        .unwrap();
        let eval = parsed.evaluation.unwrap();
        assert_eq!(eval.similarity, 0.9);
        assert_eq!(eval.matched_ground_truth, "cessna 481 ready");
    }
}
