//! 사용자 조회 RPC.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::error;

use super::proto::account_service_server::AccountService;
use super::proto::{GetUserRequest, GetUserResponse};
use crate::services::{AccountError, AccountService as Accounts};

/// `AccountService` 구현.
pub struct AccountRpc {
    accounts: Arc<Accounts>,
}

impl AccountRpc {
    pub fn new(accounts: Arc<Accounts>) -> Self {
        Self { accounts }
    }
}

#[tonic::async_trait]
impl AccountService for AccountRpc {
    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        let id = request.into_inner().id;
        if id.trim().is_empty() {
            return Err(Status::invalid_argument("user ID cannot be empty"));
        }

        let user = self.accounts.get(&id).await.map_err(|e| match e {
            AccountError::InvalidId => Status::invalid_argument("invalid user ID format"),
            AccountError::NotFound => Status::not_found("user not found"),
            other => {
                error!(error = %other, "GetUser failed");
                Status::internal("failed to get user")
            }
        })?;

        Ok(Response::new(GetUserResponse {
            id: user.id.to_string(),
            name: user.name,
            username: user.username,
            email: user.email,
            phone_number: user.phone_number,
            address: user.address,
        }))
    }
}
