use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(ToSchema)]
pub struct UserDoc {
    pub name: String,
    pub email: String,
}

#[derive(ToSchema)]
pub struct UserInputDoc {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(ToSchema)]
pub struct CreatedUserDoc {
    pub id: u64,
    pub user: UserDoc,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::users::list_users,
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
    ),
    components(
        schemas(
            HealthResponse,
            UserDoc,
            UserInputDoc,
            CreatedUserDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "users")
    )
)]
pub struct ApiDoc;
