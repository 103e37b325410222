// src/storage/table.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::AppError,
    models::exam_result::{AnswerDetail, ExamResult, StoredResult, StoredResultDetail},
    storage::{ResultStore, check_counts},
};

const API_VERSION: &str = "2019-02-02";
const NO_METADATA: &str = "application/json;odata=nometadata";
const CONTINUATION_PARTITION: &str = "x-ms-continuation-NextPartitionKey";
const CONTINUATION_ROW: &str = "x-ms-continuation-NextRowKey";

/// One exam result as an Azure Table entity.
///
/// Results are partitioned by user so listing a user's results is a
/// single-partition query. The answer log travels in the same entity as a
/// JSON string, which keeps the write atomic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultEntity {
    partition_key: String,
    row_key: String,
    #[serde(rename = "UserID")]
    user_id: i64,
    subject: String,
    score: f64,
    grade: String,
    status: String,
    total_questions: u32,
    gradeable_questions: u32,
    correct_answers: u32,
    submitted_at: String,
    #[serde(default)]
    answers: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntityPage {
    value: Vec<ResultEntity>,
}

impl ResultEntity {
    fn new(row_key: String, result: &ExamResult, details: &[AnswerDetail]) -> Result<Self, AppError> {
        let answers = serde_json::to_string(details)
            .map_err(|e| AppError::StorageError(format!("failed to encode answers: {}", e)))?;

        Ok(Self {
            partition_key: result.user_id.to_string(),
            row_key,
            user_id: result.user_id,
            subject: result.subject.clone(),
            score: result.score,
            grade: result.grade.as_str().to_string(),
            status: result.status.as_str().to_string(),
            total_questions: result.total_questions,
            gradeable_questions: result.gradeable_questions,
            correct_answers: result.correct_answers,
            submitted_at: result.timestamp.to_rfc3339(),
            answers: Some(answers),
        })
    }

    fn into_stored(self) -> Result<StoredResultDetail, AppError> {
        let corrupt = |e: String| {
            AppError::InternalServerError(format!("entity {}: {}", self.row_key, e))
        };

        let timestamp = DateTime::parse_from_rfc3339(&self.submitted_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);
        let answers: Vec<AnswerDetail> = match self.answers.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(|e| corrupt(e.to_string()))?,
            None => Vec::new(),
        };

        Ok(StoredResultDetail {
            summary: StoredResult {
                id: self.row_key.clone(),
                result: ExamResult {
                    user_id: self.user_id,
                    subject: self.subject.clone(),
                    total_questions: self.total_questions,
                    gradeable_questions: self.gradeable_questions,
                    correct_answers: self.correct_answers,
                    score: self.score,
                    grade: self.grade.parse().map_err(corrupt)?,
                    status: self.status.parse().map_err(corrupt)?,
                    timestamp,
                },
            },
            answers,
        })
    }
}

/// Results stored as entities of an Azure Storage table, authorized by a SAS token.
#[derive(Debug, Clone)]
pub struct TableResultStore {
    client: Client,
    endpoint: Url,
    table_name: String,
    sas_pairs: Vec<(String, String)>,
}

impl TableResultStore {
    pub fn new(endpoint: &str, sas_token: &str, table_name: &str) -> Result<Self, AppError> {
        // A trailing slash makes `Url::join` append instead of replacing the
        // last segment (Azurite endpoints carry the account name in the path).
        let endpoint = Url::parse(&format!("{}/", endpoint.trim_end_matches('/')))
            .map_err(|e| AppError::InternalServerError(format!("invalid table endpoint: {}", e)))?;
        let sas_pairs = url::form_urlencoded::parse(sas_token.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect();

        Ok(Self {
            client: Client::new(),
            endpoint,
            table_name: table_name.to_string(),
            sas_pairs,
        })
    }

    fn url(&self, resource: &str) -> Result<Url, AppError> {
        let mut url = self
            .endpoint
            .join(resource)
            .map_err(|e| AppError::InternalServerError(format!("invalid table url: {}", e)))?;
        url.query_pairs_mut().extend_pairs(&self.sas_pairs);
        Ok(url)
    }

    fn entity_url(&self, partition_key: &str, row_key: &str) -> Result<Url, AppError> {
        self.url(&format!(
            "{}(PartitionKey='{}',RowKey='{}')",
            self.table_name,
            escape_key(partition_key),
            escape_key(row_key)
        ))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("x-ms-version", API_VERSION)
            .header("DataServiceVersion", "3.0")
            .header(header::ACCEPT, NO_METADATA)
    }

    /// Creates the table; an existing table is not an error.
    pub async fn ensure_table(&self) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::POST, self.url("Tables")?)
            .json(&serde_json::json!({ "TableName": self.table_name }))
            .send()
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        match response.status() {
            StatusCode::CREATED | StatusCode::NO_CONTENT => {
                tracing::info!(table = %self.table_name, "Table created");
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::info!(table = %self.table_name, "Table already exists");
                Ok(())
            }
            _ => Err(failure(response).await),
        }
    }
}

#[async_trait]
impl ResultStore for TableResultStore {
    async fn store_result(
        &self,
        result: &ExamResult,
        details: &[AnswerDetail],
    ) -> Result<String, AppError> {
        check_counts(result)?;

        let row_key = uuid::Uuid::new_v4().simple().to_string();
        let entity = ResultEntity::new(row_key.clone(), result, details)?;

        // Insert Or Replace: a single request, applied entirely or not at all.
        let response = self
            .request(
                reqwest::Method::PUT,
                self.entity_url(&entity.partition_key, &row_key)?,
            )
            .json(&entity)
            .send()
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        tracing::info!(row_key = %row_key, user_id = result.user_id, "Exam result saved to table");
        Ok(row_key)
    }

    async fn list_results(&self, user_id: i64) -> Result<Vec<StoredResult>, AppError> {
        let filter = format!("PartitionKey eq '{}'", user_id);
        let mut continuation: Option<(String, Option<String>)> = None;
        let mut results = Vec::new();

        loop {
            let mut url = self.url(&format!("{}()", self.table_name))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("$filter", &filter);
                if let Some((partition, row)) = &continuation {
                    query.append_pair("NextPartitionKey", partition);
                    if let Some(row) = row {
                        query.append_pair("NextRowKey", row);
                    }
                }
            }

            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            if !response.status().is_success() {
                return Err(read_failure(response).await);
            }

            continuation = continuation_of(&response);
            let page: EntityPage = response
                .json()
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;

            for entity in page.value {
                results.push(entity.into_stored()?.summary);
            }

            if continuation.is_none() {
                break;
            }
        }

        results.sort_by(|a, b| b.result.timestamp.cmp(&a.result.timestamp));
        Ok(results)
    }

    async fn get_result(
        &self,
        user_id: i64,
        result_id: &str,
    ) -> Result<Option<StoredResultDetail>, AppError> {
        // Row keys are simple UUIDs; anything else cannot exist.
        if result_id.is_empty() || !result_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(None);
        }

        let response = self
            .request(
                reqwest::Method::GET,
                self.entity_url(&user_id.to_string(), result_id)?,
            )
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let entity: ResultEntity = response
                    .json()
                    .await
                    .map_err(|e| AppError::InternalServerError(e.to_string()))?;
                entity.into_stored().map(Some)
            }
            _ => Err(read_failure(response).await),
        }
    }
}

/// Single quotes inside OData key literals are doubled.
fn escape_key(key: &str) -> String {
    key.replace('\'', "''")
}

fn continuation_of(response: &Response) -> Option<(String, Option<String>)> {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Some((header(CONTINUATION_PARTITION)?, header(CONTINUATION_ROW)))
}

async fn describe(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("table service returned {}: {}", status, body)
}

async fn failure(response: Response) -> AppError {
    AppError::StorageError(describe(response).await)
}

async fn read_failure(response: Response) -> AppError {
    AppError::InternalServerError(describe(response).await)
}
