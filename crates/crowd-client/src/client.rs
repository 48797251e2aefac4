//! Asynchronous Crowd user management client.

use crate::models::{
    Attributes, Group, GroupList, ListingOptions, Membership, MembershipKind, MembershipList,
    PasswordCredential, User, UserList,
};
use crate::Result;
use crowd_core::client::{ClientConfig, Expect, Scope, ServiceClient, ServiceClientBuilder};
use crowd_core::config::CrowdConfig;
use crowd_core::query::QueryParams;
use crowd_core::transport::Transport;
use reqwest::Method;
use std::sync::Arc;
use tracing::debug;

const API_PREFIX: &str = "rest/usermanagement/1/";

/// Builder for [`CrowdClient`].
#[derive(Debug)]
pub struct CrowdClientBuilder {
    inner: ServiceClientBuilder,
}

impl CrowdClientBuilder {
    /// Create a builder for the Crowd base URL and application credentials.
    pub fn new(
        url: impl Into<String>,
        app_name: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Self {
        Self {
            inner: ServiceClientBuilder::new(url, app_name, app_password),
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Include the calling application's name and version in the user agent.
    #[must_use]
    pub fn with_application(mut self, app: &str, version: &str) -> Self {
        self.inner = self.inner.with_application(app, version);
        self
    }

    /// Replace the default HTTP transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.inner = self.inner.with_transport(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty URL, application or password.
    pub fn build(self) -> Result<CrowdClient> {
        let inner = self.inner.build()?;
        Ok(CrowdClient { inner })
    }
}

/// Asynchronous Crowd client.
///
/// Cheap to clone; clones share the connection pool and the user agent.
#[derive(Debug, Clone)]
pub struct CrowdClient {
    inner: ServiceClient,
}

impl CrowdClient {
    /// Construct a client from the base URL and application credentials.
    ///
    /// # Errors
    ///
    /// Returns [`crowd_core::Error::EmptyUrl`], [`crowd_core::Error::EmptyApplication`] or
    /// [`crowd_core::Error::EmptyPassword`] for a missing input.
    pub fn new(
        url: impl Into<String>,
        app_name: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Result<Self> {
        CrowdClientBuilder::new(url, app_name, app_password).build()
    }

    /// Construct a client from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns the first failing configuration check.
    pub fn from_config(config: &CrowdConfig) -> Result<Self> {
        let inner = config.builder()?.build()?;
        Ok(Self { inner })
    }

    /// Start a builder.
    pub fn builder(
        url: impl Into<String>,
        app_name: impl Into<String>,
        app_password: impl Into<String>,
    ) -> CrowdClientBuilder {
        CrowdClientBuilder::new(url, app_name, app_password)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    /// Return the current user agent.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.inner.user_agent()
    }

    /// Configure the user agent from the calling application's name and version.
    ///
    /// Applies to requests issued after this call returns.
    pub fn set_user_agent(&self, app: &str, version: &str) {
        self.inner.set_user_agent(app, version);
    }

    /// Fetch a user by exact username, optionally with attributes inlined.
    pub async fn get_user(&self, username: &str, with_attributes: bool) -> Result<User> {
        let mut query = QueryParams::new().with("username", username);
        if with_attributes {
            query.push("expand", "attributes");
        }

        self.inner
            .fetch(&resource("user", &query), Scope::Unscoped)
            .await
    }

    /// Authenticate a user and return their profile.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let query = QueryParams::new().with("username", username);
        debug!(username, "Authenticating Crowd user");

        self.inner
            .exchange(
                Method::POST,
                &resource("authentication", &query),
                &PasswordCredential { value: password },
                Scope::Unscoped,
            )
            .await
    }

    /// Create a user. The directory must answer with `201 Created`.
    pub async fn create_user(&self, user: &User) -> Result<()> {
        self.inner
            .submit(
                Method::POST,
                &format!("{API_PREFIX}user"),
                Some(user),
                Scope::Unscoped,
                Expect::Created,
            )
            .await
    }

    /// List a user's attributes.
    pub async fn get_user_attributes(&self, username: &str) -> Result<Attributes> {
        let query = QueryParams::new().with("username", username);
        self.inner
            .fetch(&resource("user/attribute", &query), Scope::User)
            .await
    }

    /// Store a full attribute collection for an existing user.
    pub async fn set_user_attributes(&self, username: &str, attributes: &Attributes) -> Result<()> {
        let query = QueryParams::new().with("username", username);
        self.inner
            .submit(
                Method::POST,
                &resource("user/attribute", &query),
                Some(attributes),
                Scope::User,
                Expect::NoContent,
            )
            .await
    }

    /// Delete one attribute from a user.
    pub async fn delete_user_attribute(&self, username: &str, attribute: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("username", username)
            .with("attributename", attribute);
        self.inner
            .submit::<()>(
                Method::DELETE,
                &resource("user/attribute", &query),
                None,
                Scope::User,
                Expect::NoContent,
            )
            .await
    }

    /// List the groups a user belongs to.
    pub async fn get_user_groups(
        &self,
        username: &str,
        kind: MembershipKind,
        options: &ListingOptions,
    ) -> Result<Vec<Group>> {
        let query = QueryParams::new()
            .with("expand", "group")
            .with("username", username);
        let path = resource(&format!("user/group/{kind}"), &query) + &options.encode();

        let list: GroupList = self.inner.fetch(&path, Scope::Unscoped).await?;
        Ok(list.groups)
    }

    /// List the groups a user is a direct member of.
    pub async fn get_user_direct_groups(
        &self,
        username: &str,
        options: &ListingOptions,
    ) -> Result<Vec<Group>> {
        self.get_user_groups(username, MembershipKind::Direct, options)
            .await
    }

    /// List the groups a user is a nested member of.
    pub async fn get_user_nested_groups(
        &self,
        username: &str,
        options: &ListingOptions,
    ) -> Result<Vec<Group>> {
        self.get_user_groups(username, MembershipKind::Nested, options)
            .await
    }

    /// Fetch a group by name, optionally with attributes inlined.
    pub async fn get_group(&self, group_name: &str, with_attributes: bool) -> Result<Group> {
        let mut query = QueryParams::new().with("groupname", group_name);
        if with_attributes {
            query.push("expand", "attributes");
        }

        self.inner
            .fetch(&resource("group", &query), Scope::Unscoped)
            .await
    }

    /// List a group's attributes.
    pub async fn get_group_attributes(&self, group_name: &str) -> Result<Attributes> {
        let query = QueryParams::new().with("groupname", group_name);
        self.inner
            .fetch(&resource("group/attribute", &query), Scope::Group)
            .await
    }

    /// Store a full attribute collection for a group.
    pub async fn set_group_attributes(
        &self,
        group_name: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        let query = QueryParams::new().with("groupname", group_name);
        self.inner
            .submit(
                Method::POST,
                &resource("group/attribute", &query),
                Some(attributes),
                Scope::Group,
                Expect::NoContent,
            )
            .await
    }

    /// Delete one attribute from a group.
    pub async fn delete_group_attribute(&self, group_name: &str, attribute: &str) -> Result<()> {
        let query = QueryParams::new()
            .with("groupname", group_name)
            .with("attributename", attribute);
        self.inner
            .submit::<()>(
                Method::DELETE,
                &resource("group/attribute", &query),
                None,
                Scope::Group,
                Expect::NoContent,
            )
            .await
    }

    /// List the users that are members of a group.
    pub async fn get_group_users(
        &self,
        group_name: &str,
        kind: MembershipKind,
        options: &ListingOptions,
    ) -> Result<Vec<User>> {
        let query = QueryParams::new()
            .with("expand", "user")
            .with("groupname", group_name);
        let path = resource(&format!("group/user/{kind}"), &query) + &options.encode();

        let list: UserList = self.inner.fetch(&path, Scope::Unscoped).await?;
        Ok(list.users)
    }

    /// List the direct members of a group.
    pub async fn get_group_direct_users(
        &self,
        group_name: &str,
        options: &ListingOptions,
    ) -> Result<Vec<User>> {
        self.get_group_users(group_name, MembershipKind::Direct, options)
            .await
    }

    /// List the nested members of a group.
    pub async fn get_group_nested_users(
        &self,
        group_name: &str,
        options: &ListingOptions,
    ) -> Result<Vec<User>> {
        self.get_group_users(group_name, MembershipKind::Nested, options)
            .await
    }

    /// Dump every group together with its member users.
    pub async fn get_memberships(&self) -> Result<Vec<Membership>> {
        let list: MembershipList = self
            .inner
            .fetch(&format!("{API_PREFIX}group/membership"), Scope::Unscoped)
            .await?;
        Ok(list.memberships)
    }

    /// Search users with a query-language restriction.
    pub async fn search_users(
        &self,
        restriction: &str,
        options: &ListingOptions,
    ) -> Result<Vec<User>> {
        let path = search_path("user", restriction, options);
        let list: UserList = self.inner.fetch(&path, Scope::Unscoped).await?;
        Ok(list.users)
    }

    /// Search groups with a query-language restriction.
    pub async fn search_groups(
        &self,
        restriction: &str,
        options: &ListingOptions,
    ) -> Result<Vec<Group>> {
        let path = search_path("group", restriction, options);
        let list: GroupList = self.inner.fetch(&path, Scope::Unscoped).await?;
        Ok(list.groups)
    }
}

fn resource(path: &str, query: &QueryParams) -> String {
    format!("{API_PREFIX}{path}?{}", query.encode())
}

fn search_path(entity: &'static str, restriction: &str, options: &ListingOptions) -> String {
    let query = QueryParams::new()
        .with("entity-type", entity)
        .with("expand", entity)
        .with("restriction", restriction);
    resource("search", &query) + &options.encode()
}
