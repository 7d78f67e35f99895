//! The WAF Web ACL API surface.
//!
//! Backends implement [`WafApi`]; orchestrators are generic over it so
//! they can run against the real service, the in-memory backend, or a test
//! double.

use std::fmt;
use std::sync::Arc;

use waf_types::{ChangeToken, TokenScope};

use crate::error::WafResult;
use crate::types::{
    CreateWebAclInput, CreateWebAclOutput, DeleteWebAclInput, UpdateWebAclInput, WebAcl,
};

/// Web ACL operations exposed by a WAF endpoint.
///
/// Every mutating call requires a change token obtained from
/// [`get_change_token`](WafApi::get_change_token) for the endpoint's scope.
/// Calls are blocking.
pub trait WafApi {
    /// Issues a new change token for the given scope.
    fn get_change_token(&self, scope: &TokenScope) -> WafResult<ChangeToken>;

    /// Creates an empty Web ACL.
    fn create_web_acl(&self, input: CreateWebAclInput) -> WafResult<CreateWebAclOutput>;

    /// Fetches a Web ACL by ID.
    ///
    /// Fails with `NonexistentItem` if the ACL does not exist.
    fn get_web_acl(&self, web_acl_id: &str) -> WafResult<WebAcl>;

    /// Applies rule inserts/deletes and an optional default action change.
    fn update_web_acl(&self, input: UpdateWebAclInput) -> WafResult<ChangeToken>;

    /// Deletes a Web ACL. The ACL must not contain any rules.
    fn delete_web_acl(&self, input: DeleteWebAclInput) -> WafResult<ChangeToken>;
}

impl<T: WafApi + ?Sized> WafApi for Arc<T> {
    fn get_change_token(&self, scope: &TokenScope) -> WafResult<ChangeToken> {
        (**self).get_change_token(scope)
    }

    fn create_web_acl(&self, input: CreateWebAclInput) -> WafResult<CreateWebAclOutput> {
        (**self).create_web_acl(input)
    }

    fn get_web_acl(&self, web_acl_id: &str) -> WafResult<WebAcl> {
        (**self).get_web_acl(web_acl_id)
    }

    fn update_web_acl(&self, input: UpdateWebAclInput) -> WafResult<ChangeToken> {
        (**self).update_web_acl(input)
    }

    fn delete_web_acl(&self, input: DeleteWebAclInput) -> WafResult<ChangeToken> {
        (**self).delete_web_acl(input)
    }
}

impl<T: WafApi + ?Sized> WafApi for &T {
    fn get_change_token(&self, scope: &TokenScope) -> WafResult<ChangeToken> {
        (**self).get_change_token(scope)
    }

    fn create_web_acl(&self, input: CreateWebAclInput) -> WafResult<CreateWebAclOutput> {
        (**self).create_web_acl(input)
    }

    fn get_web_acl(&self, web_acl_id: &str) -> WafResult<WebAcl> {
        (**self).get_web_acl(web_acl_id)
    }

    fn update_web_acl(&self, input: UpdateWebAclInput) -> WafResult<ChangeToken> {
        (**self).update_web_acl(input)
    }

    fn delete_web_acl(&self, input: DeleteWebAclInput) -> WafResult<ChangeToken> {
        (**self).delete_web_acl(input)
    }
}

/// Identifies an API operation (for call logs and fault injection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    GetChangeToken,
    CreateWebAcl,
    GetWebAcl,
    UpdateWebAcl,
    DeleteWebAcl,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GetChangeToken => "GetChangeToken",
            Self::CreateWebAcl => "CreateWebACL",
            Self::GetWebAcl => "GetWebACL",
            Self::UpdateWebAcl => "UpdateWebACL",
            Self::DeleteWebAcl => "DeleteWebACL",
        };
        f.write_str(s)
    }
}
