use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::employee::Employee;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jane.doe")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 900)]
    pub expires_in: usize,
    pub employee: Employee,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// username
    pub sub: String,
    pub employee_id: u64,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,
}
