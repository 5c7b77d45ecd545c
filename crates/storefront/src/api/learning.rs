//! Terms acceptance, course progress and course access requests.

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use tracing::instrument;

use diag_wheels_core::{CourseRequestId, UserType};

use super::types::{
    ApproveCourseRequest, CourseProgress, CourseRequest, CreateCourseRequest, EnrolledCourse,
    TermsStatus,
};
use super::{ApiClient, ApiError, Body};

impl ApiClient {
    // =========================================================================
    // Terms
    // =========================================================================

    /// Which terms the user has accepted, and their account type.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn terms_status(&self, token: &SecretString) -> Result<TermsStatus, ApiError> {
        self.get("terms/status", &[], Some(token)).await
    }

    /// Choose student or business owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn set_user_type(&self, token: &SecretString, user_type: UserType) -> Result<(), ApiError> {
        self.acknowledge(
            Method::POST,
            "terms/user-type",
            Body::json(&json!({ "user_type": user_type }))?,
            Some(token),
        )
        .await
        .map(|_| ())
    }

    /// Accept the course terms and conditions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all)]
    pub async fn accept_course_terms(&self, token: &SecretString) -> Result<(), ApiError> {
        self.acknowledge(Method::POST, "terms/course/accept", Body::json(&json!({}))?, Some(token))
            .await
            .map(|_| ())
    }

    /// Accept the product terms and conditions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip_all)]
    pub async fn accept_product_terms(&self, token: &SecretString) -> Result<(), ApiError> {
        self.acknowledge(Method::POST, "terms/product/accept", Body::json(&json!({}))?, Some(token))
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Record that a video was watched to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses (e.g. video still locked).
    #[instrument(skip(self, token))]
    pub async fn mark_video_watched(&self, token: &SecretString, video_id: &str) -> Result<(), ApiError> {
        let path = format!("progress/videos/{}/watch", urlencoding::encode(video_id));
        self.acknowledge(Method::POST, &path, Body::json(&json!({}))?, Some(token))
            .await
            .map(|_| ())
    }

    /// Unlock the video after `video_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn unlock_next_video(&self, token: &SecretString, video_id: &str) -> Result<(), ApiError> {
        let path = format!("progress/videos/{}/unlock-next", urlencoding::encode(video_id));
        self.acknowledge(Method::POST, &path, Body::json(&json!({}))?, Some(token))
            .await
            .map(|_| ())
    }

    /// Per-video progress for one course.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn course_progress(
        &self,
        token: &SecretString,
        course_id: &str,
    ) -> Result<CourseProgress, ApiError> {
        let path = format!("progress/courses/{}", urlencoding::encode(course_id));
        self.get(&path, &[], Some(token)).await
    }

    /// Courses the user is enrolled in.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn my_courses(&self, token: &SecretString) -> Result<Vec<EnrolledCourse>, ApiError> {
        self.get("users/courses", &[], Some(token)).await
    }

    // =========================================================================
    // Course requests
    // =========================================================================

    /// Ask for access to a course.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] if a request is already pending.
    #[instrument(skip_all, fields(course = %request.course_id))]
    pub async fn create_course_request(
        &self,
        token: &SecretString,
        request: &CreateCourseRequest<'_>,
    ) -> Result<CourseRequest, ApiError> {
        self.post_json("course-requests", request, Some(token)).await
    }

    /// The user's own requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn my_course_requests(&self, token: &SecretString) -> Result<Vec<CourseRequest>, ApiError> {
        self.get("course-requests", &[], Some(token)).await
    }

    /// Every request, for admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn admin_all_course_requests(
        &self,
        token: &SecretString,
    ) -> Result<Vec<CourseRequest>, ApiError> {
        self.get("course-requests/admin/all", &[], Some(token)).await
    }

    /// Grant access.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token, approval))]
    pub async fn approve_course_request(
        &self,
        token: &SecretString,
        id: &CourseRequestId,
        approval: &ApproveCourseRequest,
    ) -> Result<CourseRequest, ApiError> {
        let path = format!("course-requests/{id}/approve");
        self.put_json(&path, approval, Some(token)).await
    }

    /// Refuse access.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses.
    #[instrument(skip(self, token))]
    pub async fn reject_course_request(
        &self,
        token: &SecretString,
        id: &CourseRequestId,
    ) -> Result<CourseRequest, ApiError> {
        let path = format!("course-requests/{id}/reject");
        self.put_json(&path, &json!({}), Some(token)).await
    }
}
