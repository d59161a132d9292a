//! GraphQL API Routes
//!
//! The query-execution boundary of the gateway. Resolvers reach the
//! batching-eligible record families (users, friend adjacency) only through
//! the request's loaders; mutations call the services directly.
//!
//! Endpoints:
//! - POST /query - Execute GraphQL queries/mutations
//! - GET / - GraphiQL playground

use async_graphql::{
    http::GraphiQLSource, ComplexObject, Context, EmptySubscription, InputObject, Object,
    Result as GqlResult, Schema, SimpleObject, ID,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use futures_util::future;
use std::sync::Arc;

use kindred_core::{User, UserId};

use crate::auth::{generate_jwt_token, AuthConfig, AuthContext};
use crate::loaders::RequestLoaders;
use crate::middleware::{AuthExtractor, LoaderExtractor};
use crate::services::Services;

// ============================================================================
// GRAPHQL TYPES
// ============================================================================

/// GraphQL user object.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex, name = "User")]
pub struct GqlUser {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
    #[graphql(skip)]
    user_id: UserId,
}

impl From<User> for GqlUser {
    fn from(user: User) -> Self {
        Self {
            id: ID(user.user_id.to_string()),
            name: user.name,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
            user_id: user.user_id,
        }
    }
}

#[ComplexObject]
impl GqlUser {
    /// The user's friends. Resolved through the request's loaders, so
    /// sibling resolutions collapse into batched fetches.
    async fn friends(&self, ctx: &Context<'_>) -> GqlResult<Vec<GqlUser>> {
        let loaders = ctx.data::<RequestLoaders>()?;

        let friend_ids = loaders
            .friends
            .load(self.user_id)
            .await
            .map_err(gql_err)?
            .map(|set| set.friend_ids)
            .unwrap_or_default();

        load_users(loaders, friend_ids).await
    }
}

/// Input for creating a user.
#[derive(Debug, Clone, InputObject)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    /// When present, a credential is registered alongside the profile.
    pub password: Option<String>,
}

/// Input for updating a user.
#[derive(Debug, Clone, InputObject)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

// ============================================================================
// QUERY ROOT
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get a user by ID.
    async fn user(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<GqlUser>> {
        let loaders = ctx.data::<RequestLoaders>()?;
        let user_id = parse_user_id(&id)?;

        Ok(loaders
            .users
            .load(user_id)
            .await
            .map_err(gql_err)?
            .map(Into::into))
    }

    /// Get several users by ID. Unknown ids are skipped.
    async fn users(&self, ctx: &Context<'_>, ids: Vec<ID>) -> GqlResult<Vec<GqlUser>> {
        let loaders = ctx.data::<RequestLoaders>()?;
        let user_ids = ids
            .iter()
            .map(parse_user_id)
            .collect::<GqlResult<Vec<_>>>()?;

        load_users(loaders, user_ids).await
    }

    /// The authenticated user, when the credential identifies one.
    async fn viewer(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlUser>> {
        let auth = ctx.data::<AuthContext>()?;
        let Some(user_id) = auth.user_id else {
            return Ok(None);
        };

        let loaders = ctx.data::<RequestLoaders>()?;
        Ok(loaders
            .users
            .load(user_id)
            .await
            .map_err(gql_err)?
            .map(Into::into))
    }
}

// ============================================================================
// MUTATION ROOT
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create a new user, optionally registering a credential.
    async fn create_user(&self, ctx: &Context<'_>, input: CreateUserInput) -> GqlResult<GqlUser> {
        let services = ctx.data::<Arc<Services>>()?;

        let user = services
            .users
            .create_user(&input.name, &input.email)
            .await
            .map_err(gql_err)?;

        if let Some(password) = input.password {
            services
                .auth
                .register_credential(user.user_id, &password)
                .await
                .map_err(gql_err)?;
        }

        Ok(user.into())
    }

    /// Update a user's profile.
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateUserInput,
    ) -> GqlResult<GqlUser> {
        let services = ctx.data::<Arc<Services>>()?;
        let user_id = parse_user_id(&id)?;

        let user = services
            .users
            .update_user(user_id, input.name.as_deref(), input.email.as_deref())
            .await
            .map_err(gql_err)?;
        Ok(user.into())
    }

    /// Delete a user, their credential, and their friendship edges.
    async fn delete_user(&self, ctx: &Context<'_>, id: ID) -> GqlResult<bool> {
        let services = ctx.data::<Arc<Services>>()?;
        let user_id = parse_user_id(&id)?;

        let existed = services.users.delete_user(user_id).await.map_err(gql_err)?;
        services
            .auth
            .remove_credential(user_id)
            .await
            .map_err(gql_err)?;
        services
            .friends
            .detach_all(user_id)
            .await
            .map_err(gql_err)?;
        Ok(existed)
    }

    /// Verify a credential and return a signed session token.
    async fn sign_in(&self, ctx: &Context<'_>, user_id: ID, password: String) -> GqlResult<String> {
        let services = ctx.data::<Arc<Services>>()?;
        let auth_config = ctx.data::<Arc<AuthConfig>>()?;
        let user_id = parse_user_id(&user_id)?;

        let verified = services
            .auth
            .verify_credential(user_id, &password)
            .await
            .map_err(gql_err)?;
        if !verified {
            return Err(async_graphql::Error::new("Invalid credentials"));
        }

        generate_jwt_token(auth_config, user_id).map_err(gql_err)
    }

    /// Create a symmetric friendship edge.
    async fn add_friend(&self, ctx: &Context<'_>, user_id: ID, friend_id: ID) -> GqlResult<bool> {
        let services = ctx.data::<Arc<Services>>()?;
        services
            .friends
            .add_friend(parse_user_id(&user_id)?, parse_user_id(&friend_id)?)
            .await
            .map_err(gql_err)?;
        Ok(true)
    }

    /// Remove a friendship edge. Returns whether one existed.
    async fn remove_friend(&self, ctx: &Context<'_>, user_id: ID, friend_id: ID) -> GqlResult<bool> {
        let services = ctx.data::<Arc<Services>>()?;
        services
            .friends
            .remove_friend(parse_user_id(&user_id)?, parse_user_id(&friend_id)?)
            .await
            .map_err(gql_err)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn gql_err(err: impl std::fmt::Display) -> async_graphql::Error {
    async_graphql::Error::new(err.to_string())
}

fn parse_user_id(id: &ID) -> GqlResult<UserId> {
    id.0.parse::<UserId>()
        .map_err(|_| async_graphql::Error::new("Invalid user id"))
}

/// Load a set of users concurrently through the loader; the loads land in
/// one batching window. Unknown ids resolve to nothing and are skipped.
async fn load_users(loaders: &RequestLoaders, ids: Vec<UserId>) -> GqlResult<Vec<GqlUser>> {
    let results = future::join_all(ids.into_iter().map(|id| loaders.users.load(id))).await;

    let mut users = Vec::new();
    for result in results {
        if let Some(user) = result.map_err(gql_err)? {
            users.push(user.into());
        }
    }
    Ok(users)
}

// ============================================================================
// SCHEMA & HANDLERS
// ============================================================================

/// The GraphQL schema type.
pub type KindredSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Create the GraphQL schema with its process-wide data.
pub fn create_schema(services: Arc<Services>, auth_config: Arc<AuthConfig>) -> KindredSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(services)
        .data(auth_config)
        .finish()
}

/// Handler for GraphQL requests. Terminal handler of the middleware chain:
/// it hands the request-scoped auth verdict and loaders to the executor.
pub async fn graphql_handler(
    State(schema): State<KindredSchema>,
    AuthExtractor(auth): AuthExtractor,
    LoaderExtractor(loaders): LoaderExtractor,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request = req.into_inner().data(auth).data(loaders);
    schema.execute(request).await.into()
}

/// Handler for the GraphiQL playground.
pub async fn graphiql_handler() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/query").finish())
}

// ============================================================================
// TESTS
// ============================================================================
