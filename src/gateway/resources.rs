//! Endpoint wrappers for the back-office resources.
//!
//! Payloads are opaque to this crate: callers pick the request and response
//! types. Every mutation drops cached reads under the resource's base path.

use percent_encoding::utf8_percent_encode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::client::ApiClient;
use super::error::ClientError;
use super::query::{COMPONENT, ListQuery, PagedList};

pub const LANDLORDS: &str = "/api/landlord";
pub const PROPERTIES: &str = "/api/properties";
pub const TENANTS: &str = "/api/tenant";
pub const TENANCIES: &str = "/api/tenancy";
pub const RENT_CHARGES: &str = "/api/rentcharge";
pub const CURRENT_USER: &str = "/api/user";

/// Percent-encode `id` as a single path segment (unreserved characters kept).
pub fn encode_segment(id: &str) -> String {
    utf8_percent_encode(id, COMPONENT).to_string()
}

/// CRUD endpoints rooted at one base path.
pub struct Resource<'a> {
    client: &'a ApiClient,
    base: &'static str,
}

impl<'a> Resource<'a> {
    pub fn new(client: &'a ApiClient, base: &'static str) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &'static str {
        self.base
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.base, encode_segment(id))
    }

    fn sub_path(&self, id: &str, action: &str) -> String {
        format!("{}/{}", self.item_path(id), action)
    }

    fn invalidate(&self) {
        self.client.cache().invalidate_prefix(self.base);
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        query: &ListQuery,
    ) -> Result<PagedList<T>, ClientError> {
        self.client.get_json_with_query(self.base, query).await
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T, ClientError> {
        self.client.get_cached(&self.item_path(id)).await
    }

    pub async fn create<B, T>(&self, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let created = self.client.post_json(self.base, body).await;
        self.invalidate();
        created
    }

    pub async fn update<B, T>(&self, id: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let updated = self.client.patch_json(&self.item_path(id), body).await;
        self.invalidate();
        updated
    }

    pub async fn remove(&self, id: &str) -> Result<(), ClientError> {
        let removed = self.client.delete(&self.item_path(id)).await;
        self.invalidate();
        removed
    }

    async fn patch_action<B: Serialize + ?Sized>(
        &self,
        id: &str,
        action: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        let result: Result<serde_json::Value, _> =
            self.client.patch_json(&self.sub_path(id, action), body).await;
        self.invalidate();
        result.map(drop)
    }
}

/// Tenancy lifecycle endpoints beyond plain CRUD.
pub struct Tenancies<'a>(Resource<'a>);

impl<'a> std::ops::Deref for Tenancies<'a> {
    type Target = Resource<'a>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Tenancies<'_> {
    pub async fn update_status<B: Serialize + ?Sized>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.0.patch_action(id, "status", body).await
    }

    pub async fn update_billing<B: Serialize + ?Sized>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.0.patch_action(id, "billing-schedule", body).await
    }

    pub async fn set_next_charge_date<B: Serialize + ?Sized>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.0.patch_action(id, "next-charge-date", body).await
    }

    pub async fn replace_occupants<B: Serialize>(
        &self,
        id: &str,
        occupants: &[B],
    ) -> Result<(), ClientError> {
        let result: Result<serde_json::Value, _> = self
            .0
            .client
            .put_json(&self.0.sub_path(id, "occupants"), occupants)
            .await;
        self.0.invalidate();
        result.map(drop)
    }

    /// Single-commit onboarding: tenant, occupants and tenancy in one call.
    pub async fn start_onboarding<B, T>(&self, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let path = format!("{}/onboarding", self.0.base);
        let started = self.0.client.post_json(&path, body).await;
        self.0.invalidate();
        started
    }
}

/// The signed-in user's own account.
pub struct CurrentUser<'a> {
    client: &'a ApiClient,
}

impl CurrentUser<'_> {
    pub async fn me<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        self.client.get_cached(CURRENT_USER).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, body: &B) -> Result<(), ClientError> {
        let result: Result<serde_json::Value, _> = self.client.patch_json(CURRENT_USER, body).await;
        self.client.cache().invalidate_prefix(CURRENT_USER);
        result.map(drop)
    }

    pub async fn change_password<B: Serialize + ?Sized>(&self, body: &B) -> Result<(), ClientError> {
        let path = format!("{CURRENT_USER}/password");
        let result: Result<serde_json::Value, _> = self.client.put_json(&path, body).await;
        result.map(drop)
    }

    pub async fn delete(&self) -> Result<(), ClientError> {
        let result = self.client.delete(CURRENT_USER).await;
        self.client.cache().clear();
        result
    }
}

impl ApiClient {
    pub fn landlords(&self) -> Resource<'_> {
        Resource::new(self, LANDLORDS)
    }

    pub fn properties(&self) -> Resource<'_> {
        Resource::new(self, PROPERTIES)
    }

    pub fn tenants(&self) -> Resource<'_> {
        Resource::new(self, TENANTS)
    }

    pub fn tenancies(&self) -> Tenancies<'_> {
        Tenancies(Resource::new(self, TENANCIES))
    }

    pub fn rent_charges(&self) -> Resource<'_> {
        Resource::new(self, RENT_CHARGES)
    }

    pub fn current_user(&self) -> CurrentUser<'_> {
        CurrentUser { client: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("abc-123_x.y~z"), "abc-123_x.y~z");
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_segment("£"), "%C2%A3");
        assert_eq!(encode_segment("50%+?#"), "50%25%2B%3F%23");
    }
}
