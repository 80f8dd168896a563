//! Write-through report submission. There is no read path in this layer;
//! moderation consumes the reports elsewhere.

use chrono::Utc;
use uuid::Uuid;

use orbit_store::Store;
use orbit_types::models::{Report, ReportTarget};

use crate::error::AppError;
use crate::session::ViewerSession;

pub async fn submit_report<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    target_type: ReportTarget,
    target_id: Uuid,
    reason: &str,
) -> Result<(), AppError> {
    let reporter_id = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    if reason.trim().is_empty() {
        return Err(AppError::Validation("report reason cannot be empty".into()));
    }

    store
        .insert_report(&Report {
            id: Uuid::new_v4(),
            target_type,
            target_id,
            reporter_id,
            reason: reason.to_string(),
            created_at: Utc::now(),
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Anonymous, SignedIn};
    use crate::testutil;

    #[tokio::test]
    async fn reports_require_a_viewer_and_a_reason() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "sketchy").await;

        let err = submit_report(&db, &Anonymous, ReportTarget::Post, post.id, "spam")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated));

        let err = submit_report(&db, &SignedIn(ada), ReportTarget::Post, post.id, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        submit_report(&db, &SignedIn(ada), ReportTarget::Post, post.id, "spam")
            .await
            .unwrap();
    }
}
