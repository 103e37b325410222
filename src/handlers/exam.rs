// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::{DEFAULT_GENERATED_QUESTIONS, MAX_GENERATED_QUESTIONS},
    error::AppError,
    grading::{grade_submission, summarize},
    models::{
        exam_result::{SubmitExamRequest, SubmitExamResponse},
        question::{GenerateQuestionsParams, GeneratedQuestionsResponse, GenerationRequest},
    },
    state::AppState,
    utils::jwt::Claims,
};

const DEFAULT_SUBJECT: &str = "General";

/// Generates a fresh set of exam questions with the LLM.
///
/// Requires `technology`, `difficulty` and `type`; `count` defaults to 5.
/// The questions include their correct answers, and the client sends them
/// back unchanged on submit.
pub async fn generate_questions(
    State(state): State<AppState>,
    Query(params): Query<GenerateQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (Some(technology), Some(difficulty), Some(question_type)) =
        (params.technology, params.difficulty, params.question_type)
    else {
        return Err(AppError::BadRequest(
            "Missing required parameters: technology, difficulty, or type".to_string(),
        ));
    };

    let count = params.count.unwrap_or(DEFAULT_GENERATED_QUESTIONS);
    if count == 0 || count > MAX_GENERATED_QUESTIONS {
        return Err(AppError::BadRequest(format!(
            "count must be between 1 and {}",
            MAX_GENERATED_QUESTIONS
        )));
    }

    let generator = state.generator.as_ref().ok_or_else(|| {
        AppError::UpstreamError("Question generation is not configured".to_string())
    })?;

    let request = GenerationRequest {
        technology,
        difficulty,
        question_type,
        count,
    };
    let questions = generator.generate(&request).await?;

    Ok(Json(GeneratedQuestionsResponse {
        difficulty: request.difficulty,
        technology: request.technology,
        question_type: request.question_type,
        questions,
    }))
}

/// Grades a submission and stores the result.
///
/// * Rejects requests missing `questions` or `answers` before grading.
/// * Grades every question; answers for unknown question ids are skipped.
/// * Persists summary and answer log together; if that fails, nothing is
///   returned but the error.
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (Some(questions), Some(answers)) = (req.questions, req.answers) else {
        return Err(AppError::BadRequest(
            "Invalid request. Expected 'answers' and 'questions' in JSON.".to_string(),
        ));
    };
    if questions.is_empty() {
        return Err(AppError::BadRequest("No questions submitted".to_string()));
    }

    let user_id = claims.user_id()?;
    let subject = req
        .subject
        .or_else(|| questions.iter().find_map(|q| q.subject.clone()))
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    let evaluator = if req.evaluate_open_ended {
        state.evaluator.as_deref()
    } else {
        None
    };

    let graded = grade_submission(&questions, &answers, &req.time_taken, evaluator).await;
    let result = summarize(user_id, subject, &graded.outcomes);

    tracing::info!(
        user_id,
        score = result.score,
        grade = %result.grade,
        gradeable = result.gradeable_questions,
        "Exam graded"
    );

    let result_id = state.results.store_result(&result, &graded.details).await?;

    Ok(Json(SubmitExamResponse {
        result_id,
        result,
        validation: graded.details,
        ignored_answers: graded.ignored_answers,
    }))
}

/// Lists the current user's exam results, newest first.
pub async fn list_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let results = state.results.list_results(user_id).await?;

    Ok(Json(results))
}

/// Returns one of the current user's results with its answer log.
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let result = state
        .results
        .get_result(user_id, &id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(Json(result))
}
