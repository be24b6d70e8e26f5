use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/upload", upload_routes())
        .nest("/videos", video_routes())
        .nest("/webhooks", webhook_routes())
}

fn upload_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::signature::issue_upload_signature))
}

fn video_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::video::list_videos,
            handlers::video::create_video
        ))
        .routes(routes!(handlers::transcode::trigger_transcode))
        .routes(routes!(handlers::video::get_video))
        .routes(routes!(handlers::video::get_video_status))
}

fn webhook_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::webhook::handle_transcode_notification))
}
