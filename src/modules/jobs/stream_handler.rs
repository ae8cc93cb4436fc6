use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use crate::common::response::ApiError;
use crate::modules::jobs::model::JobStatus;
use crate::state::AppState;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Streams a finished clip, forwarding Range requests to the artifact store.
#[utoipa::path(
    get,
    path = "/api/jobs/{id}/short",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Clip content", content_type = "video/mp4"),
        (status = 206, description = "Partial Content", content_type = "video/mp4"),
        (status = 404, description = "Job or clip not found"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Jobs"
)]
pub async fn stream_short(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let job = match state.jobs.find_by_id(id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return ApiError("Job not found".to_string(), StatusCode::NOT_FOUND).into_response();
        }
        Err(e) => {
            tracing::error!("Database Error: {}", e);
            return ApiError(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response();
        }
    };

    let location = match (job.status, job.short_video_location) {
        (JobStatus::Completed, Some(location)) => location,
        _ => return clip_not_available(),
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let object = match state.artifacts.open(&location, range).await {
        Ok(o) => o,
        Err(e) => {
            tracing::error!("Artifact Error: {}", e);
            return clip_not_available();
        }
    };

    let mut builder = Response::builder().header(header::CONTENT_TYPE, &object.content_type);

    if let Some(len) = object.content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder = match object.content_range {
        Some(range) => builder
            .header(header::CONTENT_RANGE, range)
            .status(StatusCode::PARTIAL_CONTENT),
        None => builder
            .header(header::ACCEPT_RANGES, "bytes")
            .status(StatusCode::OK),
    };

    if let Some(tag) = object.e_tag {
        builder = builder.header(header::ETAG, tag);
    }

    let body = Body::from_stream(ReaderStream::new(object.reader));
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn clip_not_available() -> Response {
    ApiError("Clip not available".to_string(), StatusCode::NOT_FOUND).into_response()
}

#[cfg(test)]
mod tests {
    use crate::testing::{Harness, TestStages};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn completed_clip_is_streamed() {
        let harness = Harness::new(TestStages::new(300));
        let job = harness
            .runner
            .start("https://example.com/v".to_string())
            .await
            .unwrap();
        harness.wait_for_terminal(job.id).await;

        let app = crate::app::create_app(harness.state()).await;
        let res = app
            .oneshot(get(&format!("/api/jobs/{}/short", job.id)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "video/mp4");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"fake clip");
    }

    #[tokio::test]
    async fn failed_job_has_no_clip() {
        let harness = Harness::new(TestStages::new(30).failing_transcriber("down"));
        let job = harness
            .runner
            .start("https://example.com/v".to_string())
            .await
            .unwrap();
        harness.wait_for_terminal(job.id).await;

        let app = crate::app::create_app(harness.state()).await;
        let res = app
            .clone()
            .oneshot(get(&format!("/api/jobs/{}/short", job.id)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .oneshot(get(&format!("/api/jobs/{}/short", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
