use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    dtos::RequestQueryDto,
    models::usermodel::{Profile, UserRole},
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub full_name: Option<String>,

    #[validate(length(min = 8, max = 20, message = "Phone must be between 8 and 20 characters"))]
    pub phone: Option<String>,

    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRoleDto {
    pub role: UserRole,
}

#[derive(Validate, Debug, Default, Serialize, Deserialize)]
pub struct UserListQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u32>,
    pub role: Option<UserRole>,
}

impl UserListQueryDto {
    pub fn paging(&self) -> RequestQueryDto {
        RequestQueryDto {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnsureProfileResponseDto {
    pub profile: Profile,
    pub created: bool,
}
